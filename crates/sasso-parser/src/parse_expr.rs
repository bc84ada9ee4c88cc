//! SassScript expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 9. `,` (comma list)
//! 8. juxtaposition (space list)
//! 7. `or`
//! 6. `and`
//! 5. `==`, `!=`
//! 4. `<`, `>`, `<=`, `>=`
//! 3. `+`, `-`
//! 2. `*`, `/`, `%`
//! 1. unary `-`, `+`, `not`

use sasso_lexer::{Lexer, Token, TokenKind};
use sasso_types::ast::*;
use sasso_types::{CompileError, CompileErrors, ErrorCode, Span};

/// Deepest allowed nesting of parentheses, brackets and calls.
const MAX_NESTING: u32 = 64;

/// Token-level parser for SassScript values.
pub struct ExprParser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    file: &'a str,
    depth: u32,
    errors: CompileErrors,
}

/// A value followed by trailing `!flags`, as in `$x: 1 !default !global`.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedValue {
    pub value: Expr,
    /// Lowercase flag names without `!`; `!important` reports as `important`.
    pub flags: Vec<String>,
}

impl FlaggedValue {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

type ParseOutcome<T> = Result<T, CompileErrors>;

impl<'a> ExprParser<'a> {
    pub fn new(tokens: Vec<Token>, file: &'a str) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            depth: 0,
            errors: CompileErrors::empty(),
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Entry Points
    // ══════════════════════════════════════════════════════════════════════════

    fn lex(text: &str, file: &'a str, origin: Span) -> ParseOutcome<Vec<Token>> {
        let result = Lexer::with_origin(text, file, origin).lex();
        if result.errors.has_errors() {
            return Err(result.errors);
        }
        Ok(result.tokens)
    }

    /// Parse `text` as one complete expression.
    pub fn parse_text(text: &str, file: &'a str, origin: Span) -> ParseOutcome<Expr> {
        let tokens = Self::lex(text, file, origin)?;
        let mut parser = Self::new(tokens, file);
        let expr = parser.parse_expression();
        parser.finish(expr)
    }

    /// Parse `text` as an expression followed by any number of `!flags`.
    pub fn parse_flagged_text(text: &str, file: &'a str, origin: Span) -> ParseOutcome<FlaggedValue> {
        let mut tokens = Self::lex(text, file, origin)?;
        let mut flags = Vec::new();
        // Flags are stripped from the end; the Eof token stays last.
        while tokens.len() >= 2 {
            let index = tokens.len() - 2;
            match &tokens[index].kind {
                TokenKind::Flag(name) => flags.push(name.clone()),
                TokenKind::Important => flags.push("important".to_string()),
                _ => break,
            }
            tokens.remove(index);
        }
        flags.reverse();
        let mut parser = Self::new(tokens, file);
        let expr = parser.parse_expression();
        let value = parser.finish(expr)?;
        Ok(FlaggedValue { value, flags })
    }

    /// Parse `text` (the inside of a call's parentheses) as an argument list.
    pub fn parse_args_text(text: &str, file: &'a str, origin: Span) -> ParseOutcome<Vec<Arg>> {
        let tokens = Self::lex(text, file, origin)?;
        let mut parser = Self::new(tokens, file);
        let args = parser.parse_arg_items(&TokenKind::Eof);
        parser.finish(args)
    }

    /// Parse `text` (the inside of a definition's parentheses) as parameters.
    pub fn parse_params_text(text: &str, file: &'a str, origin: Span) -> ParseOutcome<Vec<Param>> {
        let tokens = Self::lex(text, file, origin)?;
        let mut parser = Self::new(tokens, file);
        let params = parser.parse_param_items();
        parser.finish(params)
    }

    /// Parse the inside of `with (...)` as configuration entries.
    pub fn parse_config_text(
        text: &str,
        file: &'a str,
        origin: Span,
    ) -> ParseOutcome<Vec<ConfigEntry>> {
        let tokens = Self::lex(text, file, origin)?;
        let mut parser = Self::new(tokens, file);
        let config = parser.parse_config_items();
        parser.finish(config)
    }

    fn finish<T>(mut self, value: Option<T>) -> ParseOutcome<T> {
        if let Some(value) = value {
            if self.at_end() {
                if !self.errors.has_errors() {
                    return Ok(value);
                }
            } else {
                let found = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Unexpected '{found}' in expression"),
                );
            }
        }
        if !self.errors.has_errors() {
            self.error_at_current(ErrorCode::EXPECTED_EXPRESSION, "Expected expression");
        }
        Err(self.errors)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Token Cursor
    // ══════════════════════════════════════════════════════════════════════════

    fn peek(&self) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_nth(&self, n: usize) -> &Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            let found = self.peek_kind().to_string();
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Expected '{kind}', found '{found}'"),
            );
            None
        }
    }

    fn previous_span(&self) -> Span {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.peek().span;
        self.errors
            .push_error(CompileError::new(self.file, code, message, span, ""));
    }

    fn enter(&mut self) -> Option<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Expressions nest deeper than {MAX_NESTING} levels"),
            );
            return None;
        }
        Some(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Lists
    // ══════════════════════════════════════════════════════════════════════════

    /// `Expression = SpaceList { "," SpaceList } [ "," ]`
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        let first = self.parse_space_list()?;
        if !self.check(&TokenKind::Comma) {
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !self.starts_operand() {
                break;
            }
            items.push(self.parse_space_list()?);
        }
        Some(Self::list(items, ListSeparator::Comma, false))
    }

    /// `SpaceList = OrExpr { OrExpr }`
    fn parse_space_list(&mut self) -> Option<Expr> {
        let first = self.parse_or()?;
        if !self.starts_operand() {
            return Some(first);
        }
        let mut items = vec![first];
        while self.starts_operand() {
            items.push(self.parse_or()?);
        }
        Some(Self::list(items, ListSeparator::Space, false))
    }

    fn list(items: Vec<Expr>, separator: ListSeparator, bracketed: bool) -> Expr {
        let span = match (items.first(), items.last()) {
            (Some(first), Some(last)) => first.span.merge(last.span),
            _ => Span::default(),
        };
        Expr::new(
            ExprKind::List {
                items,
                separator,
                bracketed,
            },
            span,
        )
    }

    /// Whether the current token can begin another space-list item.
    fn starts_operand(&self) -> bool {
        match self.peek_kind() {
            TokenKind::Number { .. }
            | TokenKind::QuotedString(_)
            | TokenKind::Variable(_)
            | TokenKind::Color(_)
            | TokenKind::Url(_)
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::Ampersand
            | TokenKind::Important => true,
            TokenKind::Ident(name) => name != "and" && name != "or",
            // `a -$b`: a sign separated from the left side but glued to its operand.
            TokenKind::Minus | TokenKind::Plus => self.is_detached_sign(),
            _ => false,
        }
    }

    fn is_detached_sign(&self) -> bool {
        let sign = self.peek();
        let next = self.peek_nth(1);
        sign.ws_before && !next.ws_before && !matches!(next.kind, TokenKind::Eof)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    fn binary(left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = left.span.merge(right.span);
        Expr::new(
            ExprKind::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            },
            span,
        )
    }

    /// `OrExpr = AndExpr { "or" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.peek_kind().is_word("or") {
            self.advance();
            let right = self.parse_and()?;
            left = Self::binary(left, BinOp::Or, right);
        }
        Some(left)
    }

    /// `AndExpr = EqualityExpr { "and" EqualityExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_equality()?;
        while self.peek_kind().is_word("and") {
            self.advance();
            let right = self.parse_equality()?;
            left = Self::binary(left, BinOp::And, right);
        }
        Some(left)
    }

    /// `EqualityExpr = RelationalExpr { ("==" | "!=") RelationalExpr }`
    fn parse_equality(&mut self) -> Option<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `RelationalExpr = AddExpr { ("<" | ">" | "<=" | ">=") AddExpr }`
    fn parse_relational(&mut self) -> Option<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinOp::Lt,
                TokenKind::Greater => BinOp::Gt,
                TokenKind::LessEq => BinOp::LtEq,
                TokenKind::GreaterEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    ///
    /// A sign with space before it but none after starts a new list item
    /// instead (`1px -$x` is a two-element list).
    fn parse_additive(&mut self) -> Option<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            if self.is_detached_sign() {
                break;
            }
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_multiplicative(&mut self) -> Option<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Self::binary(left, op, right);
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "+" | "not") UnaryExpr | Primary`
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Ident(name) if name == "not" => Some(UnaryOp::Not),
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_primary();
        };
        let start = self.advance().span;
        self.enter()?;
        let operand = self.parse_unary();
        self.leave();
        let operand = operand?;
        let span = start.merge(operand.span);
        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Number { value, unit } => {
                self.advance();
                Some(Expr::new(ExprKind::Number { value, unit }, token.span))
            }
            TokenKind::QuotedString(text) => {
                self.advance();
                Some(Expr::new(ExprKind::String { text, quoted: true }, token.span))
            }
            TokenKind::Color(hex) => {
                self.advance();
                Some(Expr::new(ExprKind::Color(hex), token.span))
            }
            TokenKind::Variable(name) => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Variable {
                        namespace: None,
                        name,
                    },
                    token.span,
                ))
            }
            TokenKind::Url(raw) => {
                self.advance();
                Some(Expr::new(
                    ExprKind::Call {
                        namespace: None,
                        name: "url".to_string(),
                        args: vec![Arg::positional(Expr::unquoted(raw, token.span))],
                    },
                    token.span,
                ))
            }
            TokenKind::Important => {
                self.advance();
                Some(Expr::unquoted("!important", token.span))
            }
            TokenKind::Ampersand => {
                self.advance();
                Some(Expr::new(ExprKind::ParentSelector, token.span))
            }
            TokenKind::Ident(name) => self.parse_ident(name, token.span),
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBracket => self.parse_bracketed(),
            _ => {
                let found = token.kind.to_string();
                self.error_at_current(
                    ErrorCode::EXPECTED_EXPRESSION,
                    format!("Expected expression, found '{found}'"),
                );
                None
            }
        }
    }

    /// Identifiers: literals, calls, `ns.$var`, `ns.fn()` or bare words.
    fn parse_ident(&mut self, name: String, span: Span) -> Option<Expr> {
        self.advance();
        match name.as_str() {
            "true" => return Some(Expr::new(ExprKind::Bool(true), span)),
            "false" => return Some(Expr::new(ExprKind::Bool(false), span)),
            "null" => return Some(Expr::new(ExprKind::Null, span)),
            _ => {}
        }

        let next = self.peek().clone();
        if matches!(next.kind, TokenKind::LParen) && !next.ws_before {
            return self.parse_call(None, name, span);
        }

        if matches!(next.kind, TokenKind::Dot) && !next.ws_before {
            let member = self.peek_nth(1).clone();
            if !member.ws_before {
                match member.kind {
                    TokenKind::Variable(var) => {
                        self.advance();
                        self.advance();
                        return Some(Expr::new(
                            ExprKind::Variable {
                                namespace: Some(name),
                                name: var,
                            },
                            span.merge(member.span),
                        ));
                    }
                    TokenKind::Ident(function) => {
                        let paren = self.peek_nth(2).clone();
                        if matches!(paren.kind, TokenKind::LParen) && !paren.ws_before {
                            self.advance();
                            self.advance();
                            return self.parse_call(Some(name), function, span);
                        }
                    }
                    _ => {}
                }
            }
        }

        Some(Expr::unquoted(name, span))
    }

    /// `Call = Ident "(" [ ArgList ] ")"`; the cursor is on `(`.
    fn parse_call(&mut self, namespace: Option<String>, name: String, start: Span) -> Option<Expr> {
        self.expect(&TokenKind::LParen)?;
        self.enter()?;
        let args = self.parse_arg_items(&TokenKind::RParen);
        self.leave();
        let args = args?;
        self.expect(&TokenKind::RParen)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::Call {
                namespace,
                name,
                args,
            },
            span,
        ))
    }

    /// `( ... )`: empty list, parenthesized expression, comma list or map.
    fn parse_paren(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        if self.eat(&TokenKind::RParen) {
            let span = start.merge(self.previous_span());
            return Some(Expr::new(
                ExprKind::List {
                    items: Vec::new(),
                    separator: ListSeparator::Space,
                    bracketed: false,
                },
                span,
            ));
        }

        self.enter()?;
        let inner = self.parse_paren_contents();
        self.leave();
        let inner = inner?;
        self.expect(&TokenKind::RParen)?;
        let span = start.merge(self.previous_span());
        match inner.kind {
            ExprKind::Map(_) => Some(Expr::new(inner.kind, span)),
            _ => Some(Expr::new(ExprKind::Paren(Box::new(inner)), span)),
        }
    }

    fn parse_paren_contents(&mut self) -> Option<Expr> {
        let first = self.parse_space_list()?;
        if self.check(&TokenKind::Colon) {
            return self.parse_map(first);
        }
        if !self.check(&TokenKind::Comma) {
            return Some(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.check(&TokenKind::RParen) {
                break;
            }
            items.push(self.parse_space_list()?);
        }
        Some(Self::list(items, ListSeparator::Comma, false))
    }

    /// `Map = Key ":" Value { "," Key ":" Value } [ "," ]`; `first_key` is parsed.
    fn parse_map(&mut self, first_key: Expr) -> Option<Expr> {
        let span = first_key.span;
        let mut entries = Vec::new();
        let mut key = first_key;
        loop {
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_space_list()?;
            entries.push((key, value));
            if !self.eat(&TokenKind::Comma) || self.check(&TokenKind::RParen) {
                break;
            }
            key = self.parse_space_list()?;
        }
        Some(Expr::new(ExprKind::Map(entries), span))
    }

    /// `[ ... ]`: a bracketed list, possibly empty.
    fn parse_bracketed(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        let mut items = Vec::new();
        let mut separator = ListSeparator::Space;
        if !self.check(&TokenKind::RBracket) {
            self.enter()?;
            let inner = self.parse_expression();
            self.leave();
            match inner? {
                Expr {
                    kind:
                        ExprKind::List {
                            items: inner_items,
                            separator: inner_sep,
                            bracketed: false,
                        },
                    ..
                } => {
                    items = inner_items;
                    separator = inner_sep;
                }
                other => items.push(other),
            }
        }
        self.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.previous_span());
        Some(Expr::new(
            ExprKind::List {
                items,
                separator,
                bracketed: true,
            },
            span,
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Arguments, Parameters, Configuration
    // ══════════════════════════════════════════════════════════════════════════

    /// `ArgList = Arg { "," Arg } [ "," ]` up to (not including) `close`.
    /// `Arg = [ Variable ":" ] SpaceList [ "..." ]`
    fn parse_arg_items(&mut self, close: &TokenKind) -> Option<Vec<Arg>> {
        let mut args = Vec::new();
        while !self.check(close) && !self.at_end() {
            let name = self.named_prefix();
            let value = self.parse_space_list()?;
            let spread = self.eat(&TokenKind::Ellipsis);
            args.push(Arg {
                name,
                value,
                spread,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(args)
    }

    /// Consume `$name:` if present and return the name.
    fn named_prefix(&mut self) -> Option<String> {
        if let TokenKind::Variable(name) = self.peek_kind() {
            if matches!(self.peek_nth(1).kind, TokenKind::Colon) {
                let name = name.clone();
                self.advance();
                self.advance();
                return Some(name);
            }
        }
        None
    }

    /// `ParamList = Param { "," Param } [ "," ]`
    /// `Param = Variable [ ":" SpaceList ] | Variable "..."`
    fn parse_param_items(&mut self) -> Option<Vec<Param>> {
        let mut params = Vec::new();
        while !self.at_end() {
            let token = self.peek().clone();
            let TokenKind::Variable(name) = token.kind else {
                let found = token.kind.to_string();
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Expected parameter name, found '{found}'"),
                );
                return None;
            };
            self.advance();
            let mut param = Param {
                name,
                default: None,
                arbitrary: false,
                span: token.span,
            };
            if self.eat(&TokenKind::Colon) {
                param.default = Some(self.parse_space_list()?);
            } else if self.eat(&TokenKind::Ellipsis) {
                param.arbitrary = true;
            }
            params.push(param);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(params)
    }

    /// `Config = Variable ":" SpaceList [ "!default" ] { "," ... }`
    fn parse_config_items(&mut self) -> Option<Vec<ConfigEntry>> {
        let mut entries = Vec::new();
        while !self.at_end() {
            let Some(name) = self.named_prefix() else {
                let found = self.peek_kind().to_string();
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Expected '$name:' in configuration, found '{found}'"),
                );
                return None;
            };
            let value = self.parse_space_list()?;
            let default = matches!(self.peek_kind(), TokenKind::Flag(f) if f == "default");
            if default {
                self.advance();
            }
            entries.push(ConfigEntry {
                name,
                value,
                default,
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        Some(entries)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Expr {
        ExprParser::parse_text(src, "test.scss", Span::point(1, 1)).expect("should parse")
    }

    fn number(value: f64, unit: Option<&str>) -> ExprKind {
        ExprKind::Number {
            value,
            unit: unit.map(str::to_string),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = parse("1 + 2 * 3");
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_space_list_with_detached_sign() {
        let expr = parse("1px -$x");
        let ExprKind::List { items, separator, .. } = expr.kind else {
            panic!("expected list");
        };
        assert_eq!(separator, ListSeparator::Space);
        assert_eq!(items.len(), 2);
        assert!(matches!(items[1].kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
    }

    #[test]
    fn test_spaced_minus_is_subtraction() {
        let expr = parse("10px - 5px");
        assert!(matches!(expr.kind, ExprKind::Binary { op: BinOp::Sub, .. }));
    }

    #[test]
    fn test_comma_list_of_space_lists() {
        let expr = parse("1px solid red, 2px dashed blue");
        let ExprKind::List { items, separator, .. } = expr.kind else {
            panic!("expected list");
        };
        assert_eq!(separator, ListSeparator::Comma);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_map_literal() {
        let expr = parse("(primary: #333, 'accent': blue,)");
        let ExprKind::Map(entries) = expr.kind else {
            panic!("expected map");
        };
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.kind, ExprKind::String { text: "primary".into(), quoted: false });
    }

    #[test]
    fn test_empty_parens_are_empty_list() {
        let expr = parse("()");
        assert!(matches!(expr.kind, ExprKind::List { ref items, .. } if items.is_empty()));
    }

    #[test]
    fn test_namespaced_call_and_variable() {
        let expr = parse("math.div($a, 2) + math.$pi");
        let ExprKind::Binary { left, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert!(matches!(
            left.kind,
            ExprKind::Call { namespace: Some(ref ns), ref name, .. } if ns == "math" && name == "div"
        ));
        assert!(matches!(
            right.kind,
            ExprKind::Variable { namespace: Some(ref ns), ref name } if ns == "math" && name == "pi"
        ));
    }

    #[test]
    fn test_named_and_spread_args() {
        let args = ExprParser::parse_args_text("$a, $size: 10px, $rest...", "t", Span::point(1, 1))
            .expect("args");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1].name.as_deref(), Some("size"));
        assert!(args[2].spread);
    }

    #[test]
    fn test_params_with_defaults() {
        let params =
            ExprParser::parse_params_text("$a, $b: 2px, $c...", "t", Span::point(1, 1)).expect("params");
        assert_eq!(params.len(), 3);
        assert_eq!(params[1].default.as_ref().map(|e| e.kind.clone()), Some(number(2.0, Some("px"))));
        assert!(params[2].arbitrary);
    }

    #[test]
    fn test_flags_are_stripped() {
        let flagged =
            ExprParser::parse_flagged_text("10px !default !global", "t", Span::point(1, 1)).expect("value");
        assert_eq!(flagged.value.kind, number(10.0, Some("px")));
        assert!(flagged.has_flag("default"));
        assert!(flagged.has_flag("global"));
    }

    #[test]
    fn test_url_becomes_call() {
        let expr = parse("url(img/a.png)");
        assert!(matches!(expr.kind, ExprKind::Call { ref name, .. } if name == "url"));
    }

    #[test]
    fn test_bracketed_list() {
        let expr = parse("[a b]");
        assert!(matches!(expr.kind, ExprKind::List { bracketed: true, ref items, .. } if items.len() == 2));
    }

    #[test]
    fn test_unclosed_paren_is_error() {
        let result = ExprParser::parse_text("(1 + 2", "t", Span::point(1, 1));
        assert!(result.is_err());
    }
}
