//! Statement parsing: blocks, style rules, declarations and variables.

use sasso_types::ast::*;
use sasso_types::{ErrorCode, Span};

use crate::parse_expr::ExprParser;
use crate::parser::{Parser, RawText};

impl<'src> Parser<'src> {
    /// Parse statements until `}` (when `in_block`) or end of input.
    /// The closing `}` is consumed.
    pub(crate) fn parse_statements(&mut self, in_block: bool) -> Vec<Stmt> {
        let mut nodes = Vec::new();
        loop {
            if self.too_many_errors() {
                break;
            }
            self.skip_whitespace();
            match self.peek() {
                None => {
                    if in_block {
                        self.error_at_current(ErrorCode::UNCLOSED_BLOCK, "Expected '}'");
                    }
                    break;
                }
                Some(b'}') => {
                    self.advance();
                    if in_block {
                        break;
                    }
                    self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Unexpected '}'");
                }
                Some(b';') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.current_span();
                    let text = self.read_block_comment();
                    let span = self.span_from(start);
                    nodes.push(Stmt::Comment(Comment { text, span }));
                }
                Some(b'@') => {
                    if let Some(stmt) = self.parse_at_rule() {
                        nodes.push(stmt);
                    }
                }
                Some(b'$') => {
                    if let Some(stmt) = self.parse_variable(None) {
                        nodes.push(Stmt::Variable(stmt));
                    }
                }
                Some(_) => {
                    if let Some(namespace) = self.namespaced_variable_prefix() {
                        if let Some(stmt) = self.parse_variable(Some(namespace)) {
                            nodes.push(Stmt::Variable(stmt));
                        }
                    } else if let Some(stmt) = self.parse_rule_or_declaration() {
                        nodes.push(stmt);
                    }
                }
            }
        }
        nodes
    }

    /// `Block = "{" { Statement } "}"`
    pub(crate) fn parse_block(&mut self) -> Vec<Stmt> {
        self.skip_trivia();
        if self.peek() == Some(b'{') {
            self.advance();
            self.parse_statements(true)
        } else {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected '{'");
            self.synchronize();
            Vec::new()
        }
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    /// Detect `ns.$name:` and consume `ns.` when present.
    fn namespaced_variable_prefix(&mut self) -> Option<String> {
        let start = self.pos;
        let mut end = start;
        while self.bytes.get(end).copied().is_some_and(Self::is_name_char) {
            end += 1;
        }
        if end == start
            || self.bytes.get(end) != Some(&b'.')
            || self.bytes.get(end + 1) != Some(&b'$')
        {
            return None;
        }
        let namespace = self.read_name();
        self.advance();
        Some(namespace)
    }

    /// `Variable = "$" Name ":" Expression { Flag } ";"`
    fn parse_variable(&mut self, namespace: Option<String>) -> Option<VariableDecl> {
        let start = self.current_span();
        self.advance();
        let name = self.read_name();
        if name.is_empty() {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected variable name after '$'");
            self.synchronize();
            return None;
        }
        self.skip_whitespace();
        if self.peek() != Some(b':') {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Expected ':' after '${name}'"),
            );
            self.synchronize();
            return None;
        }
        self.advance();

        let raw = self.scan_raw(b";}");
        self.eat_semicolon(&raw);
        let span = self.span_from(start);
        if raw.text.is_empty() {
            self.error_at(ErrorCode::EXPECTED_EXPRESSION, "Expected expression", span);
            return None;
        }

        let flagged = match ExprParser::parse_flagged_text(&raw.text, &self.source_file.name, raw.span)
        {
            Ok(flagged) => flagged,
            Err(errors) => {
                self.push_errors(errors);
                return None;
            }
        };
        for flag in &flagged.flags {
            if flag != "default" && flag != "global" {
                self.error_at(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Invalid flag '!{flag}' on variable declaration"),
                    span,
                );
            }
        }

        Some(VariableDecl {
            namespace,
            name,
            default: flagged.has_flag("default"),
            global: flagged.has_flag("global"),
            value: flagged.value,
            span,
        })
    }

    pub(crate) fn eat_semicolon(&mut self, raw: &RawText) {
        if raw.stop == Some(b';') {
            self.advance();
        }
    }

    // ── Rules & Declarations ──────────────────────────────────────────────────

    /// Decide between `selector { ... }` and `property: value;`.
    fn parse_rule_or_declaration(&mut self) -> Option<Stmt> {
        match self.peek_stop(b"{;}") {
            Some(b'{') if !self.looks_like_nested_property() => self.parse_style_rule(),
            _ => self.parse_declaration(),
        }
    }

    /// `font: { ... }` or `font: 12px { ... }`: a plain name, a colon and
    /// then whitespace or `{`. `a:hover { }` has no space after the colon.
    fn looks_like_nested_property(&self) -> bool {
        let rest = &self.text[self.pos..];
        let name_len = rest
            .bytes()
            .take_while(|&c| Self::is_name_char(c))
            .count();
        if name_len == 0 || rest.starts_with("--") {
            return false;
        }
        let after = rest[name_len..].trim_start_matches([' ', '\t']);
        let Some(value) = after.strip_prefix(':') else {
            return false;
        };
        value.starts_with(['{', ' ', '\t', '\n', '\r'])
    }

    /// `StyleRule = Selector Block`
    fn parse_style_rule(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let raw = self.scan_raw(b"{");
        if raw.text.is_empty() {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected selector before '{'");
        }
        self.advance();
        let body = self.parse_statements(true);
        let span = self.span_from(start);
        Some(Stmt::Rule(StyleRule {
            selector: collapse_whitespace(&raw.text),
            body,
            span,
        }))
    }

    /// `Declaration = Property ":" [ Value ] [ "!important" ] ( ";" | Block )`
    fn parse_declaration(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        let name = self.scan_raw(b":;{}");
        if name.stop != Some(b':') || name.text.is_empty() {
            let span = self.span_from(start);
            self.error_at(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("Expected ':' in declaration '{}'", name.text),
                span,
            );
            self.synchronize();
            return None;
        }
        self.advance();
        let property = name.text;

        if property.starts_with("--") {
            return Some(self.parse_custom_property(property, start));
        }

        self.skip_whitespace();
        if self.peek() == Some(b'{') {
            self.advance();
            let children = self.parse_statements(true);
            return Some(Stmt::Declaration(Declaration {
                property,
                value: None,
                important: false,
                children,
                span: self.span_from(start),
            }));
        }

        let raw = self.scan_raw(b";{}");
        if raw.text.is_empty() {
            let span = self.span_from(start);
            self.error_at(
                ErrorCode::EXPECTED_EXPRESSION,
                format!("Expected value for property '{property}'"),
                span,
            );
            self.eat_semicolon(&raw);
            return None;
        }
        let (value, important) = self.parse_declaration_value(&raw);

        let children = if raw.stop == Some(b'{') {
            self.advance();
            self.parse_statements(true)
        } else {
            self.eat_semicolon(&raw);
            Vec::new()
        };

        Some(Stmt::Declaration(Declaration {
            property,
            value: Some(value),
            important,
            children,
            span: self.span_from(start),
        }))
    }

    /// Parse a property value. Text the expression grammar rejects is kept
    /// verbatim as an unquoted string.
    fn parse_declaration_value(&mut self, raw: &RawText) -> (Expr, bool) {
        if let Ok(flagged) =
            ExprParser::parse_flagged_text(&raw.text, &self.source_file.name, raw.span)
        {
            if flagged.flags.iter().all(|f| f == "important") {
                let important = flagged.has_flag("important");
                return (flagged.value, important);
            }
        }
        let text = raw.text.as_str();
        let lowered = text.to_ascii_lowercase();
        match lowered.strip_suffix("!important") {
            Some(rest) => (
                Expr::unquoted(text[..rest.len()].trim_end(), raw.span),
                true,
            ),
            None => (self.parse_value_text(raw), false),
        }
    }

    /// `--name: anything;` keeps the value as written.
    fn parse_custom_property(&mut self, property: String, start: Span) -> Stmt {
        let value_start = self.pos;
        let raw = self.scan_raw(b";}");
        let value = self.text[value_start..self.pos].trim().to_string();
        let value = if value.is_empty() { raw.text.clone() } else { value };
        self.eat_semicolon(&raw);
        Stmt::CustomProperty(CustomProperty {
            property,
            value,
            span: self.span_from(start),
        })
    }
}

/// Collapse runs of whitespace (including newlines) to single spaces.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
