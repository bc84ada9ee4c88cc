//! At-rule parsing: modules, callables, control flow and plain CSS at-rules.

use sasso_types::ast::*;
use sasso_types::{ErrorCode, Span};

use crate::parse_expr::ExprParser;
use crate::parse_stmt::collapse_whitespace;
use crate::parser::{Parser, RawText};

/// Trailing clauses of `@use` / `@forward`.
#[derive(Default)]
struct ModuleClauses {
    alias: Option<String>,
    filter: Option<ForwardFilter>,
    config: Vec<ConfigEntry>,
}

impl<'src> Parser<'src> {
    /// Parse an at-rule; the cursor is on `@`.
    pub(crate) fn parse_at_rule(&mut self) -> Option<Stmt> {
        let start = self.current_span();
        self.advance();
        let name = self.read_name();
        match name.as_str() {
            "use" => self.parse_use(start),
            "forward" => self.parse_forward(start),
            "import" => self.parse_import(start),
            "mixin" => self.parse_callable(start).map(Stmt::MixinDef),
            "function" => self.parse_callable(start).map(Stmt::FunctionDef),
            "include" => self.parse_include(start),
            "content" => self.parse_content(start),
            "return" => self.parse_return(start),
            "if" => self.parse_if(start),
            "each" => self.parse_each(start),
            "for" => self.parse_for(start),
            "while" => self.parse_while(start),
            "extend" => self.parse_extend(start),
            "error" => self.parse_message(MessageLevel::Error, start),
            "warn" => self.parse_message(MessageLevel::Warn, start),
            "debug" => self.parse_message(MessageLevel::Debug, start),
            "at-root" => self.parse_at_root(start),
            "else" | "elseif" => {
                self.error_at(
                    ErrorCode::INVALID_AT_RULE,
                    format!("@{name} must follow an @if block"),
                    start,
                );
                self.synchronize();
                None
            }
            "" => {
                self.error_at(ErrorCode::INVALID_AT_RULE, "Expected at-rule name after '@'", start);
                self.synchronize();
                None
            }
            _ => self.parse_generic_at_rule(name, start),
        }
    }

    // ── Small Helpers ─────────────────────────────────────────────────────────

    fn save(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.col)
    }

    fn restore(&mut self, state: (usize, u32, u32)) {
        (self.pos, self.line, self.col) = state;
    }

    /// Consume `word` when it appears as a whole word.
    fn eat_word(&mut self, word: &str) -> bool {
        let rest = &self.text[self.pos..];
        if rest.starts_with(word)
            && !rest[word.len()..]
                .bytes()
                .next()
                .is_some_and(Self::is_name_char)
        {
            self.eat_str(word)
        } else {
            false
        }
    }

    /// Read a quoted string and return its contents.
    fn read_quoted(&mut self) -> Option<String> {
        self.skip_trivia();
        let quote = match self.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => {
                self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected quoted string");
                self.synchronize();
                return None;
            }
        };
        let start = self.pos + 1;
        self.skip_string(quote);
        let end = self.pos.saturating_sub(1).max(start);
        Some(self.text[start..end].to_string())
    }

    /// Read `( ... )` and return the text between the parentheses.
    fn read_paren_group(&mut self) -> RawText {
        self.advance();
        let raw = self.scan_raw(b")");
        if raw.stop == Some(b')') {
            self.advance();
        } else {
            self.error_at_current(ErrorCode::UNCLOSED_BLOCK, "Expected ')'");
        }
        raw
    }

    /// Span of the byte `offset` inside `raw`, for errors in sub-expressions.
    fn sub_span(raw: &RawText, offset: usize) -> Span {
        let before = &raw.text[..offset.min(raw.text.len())];
        match before.rfind('\n') {
            Some(newline) => {
                let line = raw.span.start_line + before.matches('\n').count() as u32;
                Span::point(line, (before.len() - newline) as u32)
            }
            None => Span::point(
                raw.span.start_line,
                raw.span.start_col + before.chars().count() as u32,
            ),
        }
    }

    fn expr_at(&mut self, raw: &RawText, offset: usize, text: &str) -> Option<Expr> {
        let span = Self::sub_span(raw, offset);
        if text.trim().is_empty() {
            self.error_at(ErrorCode::EXPECTED_EXPRESSION, "Expected expression", span);
            return None;
        }
        self.parse_expr_text(&RawText {
            text: text.to_string(),
            span,
            stop: raw.stop,
        })
    }

    /// Read the rest of a statement up to `;` (consumed) or `}`.
    fn statement_tail(&mut self) -> RawText {
        let raw = self.scan_raw(b";}");
        self.eat_semicolon(&raw);
        raw
    }

    // ── Modules ───────────────────────────────────────────────────────────────

    /// `@use "url" [as name | as *] [with (config)];`
    fn parse_use(&mut self, start: Span) -> Option<Stmt> {
        let url = self.read_quoted()?;
        let tail = self.statement_tail();
        let clauses = self.parse_module_clauses(&tail, false);
        Some(Stmt::Use(UseRule {
            url,
            namespace: clauses.alias,
            config: clauses.config,
            span: self.span_from(start),
        }))
    }

    /// `@forward "url" [as prefix-*] [show ... | hide ...] [with (config)];`
    fn parse_forward(&mut self, start: Span) -> Option<Stmt> {
        let url = self.read_quoted()?;
        let tail = self.statement_tail();
        let clauses = self.parse_module_clauses(&tail, true);
        let prefix = match clauses.alias {
            Some(alias) => match alias.strip_suffix('*') {
                Some(prefix) => Some(prefix.to_string()),
                None => {
                    self.error_at(
                        ErrorCode::INVALID_AT_RULE,
                        format!("@forward prefix must end in '*', found '{alias}'"),
                        tail.span,
                    );
                    None
                }
            },
            None => None,
        };
        Some(Stmt::Forward(ForwardRule {
            url,
            prefix,
            filter: clauses.filter,
            config: clauses.config,
            span: self.span_from(start),
        }))
    }

    fn parse_module_clauses(&mut self, tail: &RawText, allow_filter: bool) -> ModuleClauses {
        let mut clauses = ModuleClauses::default();
        let text = tail.text.as_str();
        let (head, with) = match find_word(text, "with") {
            Some(index) => (&text[..index], Some(index)),
            None => (text, None),
        };

        let mut words = head.split_whitespace();
        while let Some(word) = words.next() {
            match word {
                "as" => match words.next() {
                    Some(alias) => clauses.alias = Some(alias.to_string()),
                    None => self.error_at(ErrorCode::INVALID_AT_RULE, "Expected name after 'as'", tail.span),
                },
                "show" | "hide" if allow_filter => {
                    let members: Vec<String> = words
                        .by_ref()
                        .flat_map(|w| w.split(','))
                        .map(str::trim)
                        .filter(|w| !w.is_empty())
                        .map(str::to_string)
                        .collect();
                    clauses.filter = Some(if word == "show" {
                        ForwardFilter::Show(members)
                    } else {
                        ForwardFilter::Hide(members)
                    });
                }
                other => self.error_at(
                    ErrorCode::INVALID_AT_RULE,
                    format!("Unexpected '{other}' in module rule"),
                    tail.span,
                ),
            }
        }

        if let Some(index) = with {
            let rest = text[index + "with".len()..].trim();
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'));
            match inner {
                Some(inner) => {
                    let offset = index + text[index..].find('(').map_or(0, |p| p + 1);
                    let span = Self::sub_span(tail, offset);
                    match ExprParser::parse_config_text(inner, &self.source_file.name, span) {
                        Ok(config) => clauses.config = config,
                        Err(errors) => self.push_errors(errors),
                    }
                }
                None => self.error_at(
                    ErrorCode::INVALID_AT_RULE,
                    "Expected '(' after 'with'",
                    tail.span,
                ),
            }
        }
        clauses
    }

    /// `@import "a", "b" , url(c.css);`
    fn parse_import(&mut self, start: Span) -> Option<Stmt> {
        let tail = self.statement_tail();
        let mut targets = Vec::new();
        for item in split_top_level(&tail.text, b',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }
            targets.push(classify_import(item));
        }
        if targets.is_empty() {
            self.error_at(ErrorCode::INVALID_AT_RULE, "Expected import target", start);
            return None;
        }
        Some(Stmt::Import(ImportRule {
            targets,
            span: self.span_from(start),
        }))
    }

    // ── Callables ─────────────────────────────────────────────────────────────

    /// `@mixin name[(params)] { body }` / `@function name(params) { body }`
    fn parse_callable(&mut self, start: Span) -> Option<Callable> {
        self.skip_trivia();
        let name = self.read_name();
        if name.is_empty() {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected name");
            self.synchronize();
            return None;
        }
        self.skip_trivia();
        let mut params = Vec::new();
        if self.peek() == Some(b'(') {
            let raw = self.read_paren_group();
            match ExprParser::parse_params_text(&raw.text, &self.source_file.name, raw.span) {
                Ok(parsed) => params = parsed,
                Err(errors) => self.push_errors(errors),
            }
        }
        let body = self.parse_block();
        Some(Callable {
            name,
            params,
            body,
            span: self.span_from(start),
        })
    }

    /// `@include [ns.]name[(args)] [using (...)] [{ content }];`
    fn parse_include(&mut self, start: Span) -> Option<Stmt> {
        self.skip_trivia();
        let mut name = self.read_name();
        let mut namespace = None;
        if self.peek() == Some(b'.') {
            self.advance();
            namespace = Some(name);
            name = self.read_name();
        }
        if name.is_empty() {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "Expected mixin name");
            self.synchronize();
            return None;
        }
        self.skip_trivia();
        let mut args = Vec::new();
        if self.peek() == Some(b'(') {
            let raw = self.read_paren_group();
            match ExprParser::parse_args_text(&raw.text, &self.source_file.name, raw.span) {
                Ok(parsed) => args = parsed,
                Err(errors) => self.push_errors(errors),
            }
            self.skip_trivia();
        }
        if self.eat_word("using") {
            self.skip_trivia();
            if self.peek() == Some(b'(') {
                self.read_paren_group();
            }
            self.skip_trivia();
        }
        let content = match self.peek() {
            Some(b'{') => {
                self.advance();
                Some(self.parse_statements(true))
            }
            Some(b';') => {
                self.advance();
                None
            }
            _ => None,
        };
        Some(Stmt::Include(Include {
            namespace,
            name,
            args,
            content,
            span: self.span_from(start),
        }))
    }

    /// `@content;`; content arguments are accepted and ignored.
    fn parse_content(&mut self, start: Span) -> Option<Stmt> {
        self.statement_tail();
        Some(Stmt::Content(self.span_from(start)))
    }

    /// `@return expr;`
    fn parse_return(&mut self, start: Span) -> Option<Stmt> {
        let tail = self.statement_tail();
        let value = self.expr_at(&tail, 0, &tail.text)?;
        Some(Stmt::Return(ReturnRule {
            value,
            span: self.span_from(start),
        }))
    }

    // ── Control Flow ──────────────────────────────────────────────────────────

    /// `@if cond { } [@else if cond { }]* [@else { }]`
    fn parse_if(&mut self, start: Span) -> Option<Stmt> {
        let mut clauses = Vec::new();
        let mut else_body = None;

        let header = self.scan_raw(b"{;}");
        let condition = self.expr_at(&header, 0, &header.text);
        let body = self.parse_block();
        if let Some(condition) = condition {
            clauses.push(IfClause { condition, body });
        }

        loop {
            let saved = self.save();
            self.skip_trivia();
            let else_if = if self.eat_str("@elseif") {
                true
            } else if self.eat_word("@else") {
                self.skip_trivia();
                self.eat_word("if")
            } else {
                self.restore(saved);
                break;
            };
            if else_if {
                let header = self.scan_raw(b"{;}");
                let condition = self.expr_at(&header, 0, &header.text);
                let body = self.parse_block();
                if let Some(condition) = condition {
                    clauses.push(IfClause { condition, body });
                }
            } else {
                else_body = Some(self.parse_block());
                break;
            }
        }

        if clauses.is_empty() {
            return None;
        }
        Some(Stmt::If(IfRule {
            clauses,
            else_body,
            span: self.span_from(start),
        }))
    }

    /// `@each $a[, $b...] in expr { }`
    fn parse_each(&mut self, start: Span) -> Option<Stmt> {
        let header = self.scan_raw(b"{;}");
        let text = header.text.clone();
        let Some(in_at) = find_word(&text, "in") else {
            self.error_at(ErrorCode::INVALID_AT_RULE, "Expected 'in' in @each", start);
            self.parse_block();
            return None;
        };
        let variables: Vec<String> = text[..in_at]
            .split(',')
            .map(|v| v.trim().trim_start_matches('$').to_string())
            .filter(|v| !v.is_empty())
            .collect();
        if variables.is_empty() {
            self.error_at(ErrorCode::INVALID_AT_RULE, "Expected variable in @each", start);
        }
        let iterable = self.expr_at(&header, in_at + 2, &text[in_at + 2..]);
        let body = self.parse_block();
        Some(Stmt::Each(EachRule {
            variables,
            iterable: iterable?,
            body,
            span: self.span_from(start),
        }))
    }

    /// `@for $i from a (through | to) b { }`
    fn parse_for(&mut self, start: Span) -> Option<Stmt> {
        let header = self.scan_raw(b"{;}");
        let text = header.text.clone();
        let from_at = find_word(&text, "from");
        let (to_at, inclusive, keyword_len) = match find_word(&text, "through") {
            Some(at) => (Some(at), true, "through".len()),
            None => (find_word(&text, "to"), false, "to".len()),
        };
        let (Some(from_at), Some(to_at)) = (from_at, to_at) else {
            self.error_at(
                ErrorCode::INVALID_AT_RULE,
                "Expected '$var from <start> through|to <end>' in @for",
                start,
            );
            self.parse_block();
            return None;
        };
        let variable = text[..from_at].trim().trim_start_matches('$').to_string();
        let from_offset = from_at + "from".len();
        let from = self.expr_at(&header, from_offset, &text[from_offset..to_at]);
        let to_offset = to_at + keyword_len;
        let to = self.expr_at(&header, to_offset, &text[to_offset..]);
        let body = self.parse_block();
        Some(Stmt::For(ForRule {
            variable,
            from: from?,
            to: to?,
            inclusive,
            body,
            span: self.span_from(start),
        }))
    }

    /// `@while cond { }`
    fn parse_while(&mut self, start: Span) -> Option<Stmt> {
        let header = self.scan_raw(b"{;}");
        let condition = self.expr_at(&header, 0, &header.text);
        let body = self.parse_block();
        Some(Stmt::While(WhileRule {
            condition: condition?,
            body,
            span: self.span_from(start),
        }))
    }

    // ── Misc ──────────────────────────────────────────────────────────────────

    /// `@extend selector [!optional];`
    fn parse_extend(&mut self, start: Span) -> Option<Stmt> {
        let tail = self.statement_tail();
        let mut selector = tail.text.as_str();
        let mut optional = false;
        if let Some(rest) = selector.strip_suffix("!optional") {
            selector = rest.trim_end();
            optional = true;
        }
        if selector.is_empty() {
            self.error_at(ErrorCode::INVALID_AT_RULE, "Expected selector after @extend", start);
            return None;
        }
        Some(Stmt::Extend(ExtendRule {
            selector: collapse_whitespace(selector),
            optional,
            span: self.span_from(start),
        }))
    }

    /// `@error expr;`, `@warn expr;`, `@debug expr;`
    fn parse_message(&mut self, level: MessageLevel, start: Span) -> Option<Stmt> {
        let tail = self.statement_tail();
        let value = self.expr_at(&tail, 0, &tail.text)?;
        Some(Stmt::Message(MessageRule {
            level,
            value,
            span: self.span_from(start),
        }))
    }

    /// `@at-root [selector] { body }`; `(with: ...)` queries are ignored.
    fn parse_at_root(&mut self, start: Span) -> Option<Stmt> {
        let header = self.scan_raw(b"{;}");
        let selector = if header.text.is_empty() || header.text.starts_with('(') {
            None
        } else {
            Some(collapse_whitespace(&header.text))
        };
        let body = self.parse_block();
        Some(Stmt::AtRoot(AtRootRule {
            selector,
            body,
            span: self.span_from(start),
        }))
    }

    /// `@media`, `@supports`, `@keyframes`, `@font-face`, `@charset`, ...
    fn parse_generic_at_rule(&mut self, name: String, start: Span) -> Option<Stmt> {
        let header = self.scan_raw(b"{;}");
        let body = match header.stop {
            Some(b'{') => {
                self.advance();
                Some(self.parse_statements(true))
            }
            Some(b';') => {
                self.advance();
                None
            }
            _ => None,
        };
        Some(Stmt::AtRule(AtRule {
            name,
            params: collapse_whitespace(&header.text),
            body,
            span: self.span_from(start),
        }))
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Text Helpers
// ══════════════════════════════════════════════════════════════════════════════

/// Byte offset of `word` surrounded by whitespace, outside quotes and parens.
fn find_word(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0u32;
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            _ if depth == 0 && bytes[i..].starts_with(word.as_bytes()) => {
                let before_ok = i == 0 || bytes[i - 1].is_ascii_whitespace();
                let after = bytes.get(i + word.len());
                let after_ok = after.is_some_and(|c| c.is_ascii_whitespace() || *c == b'(');
                if before_ok && after_ok {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on `sep` outside quotes and parentheses.
fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0u32;
    let mut quote: Option<u8> = None;
    let mut last = 0;
    for (i, &b) in text.as_bytes().iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if b == sep && depth == 0 => {
                parts.push(&text[last..i]);
                last = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[last..]);
    parts
}

/// Plain CSS imports stay in the output; everything else is inlined.
fn classify_import(item: &str) -> ImportTarget {
    let is_quoted = item.starts_with('"') || item.starts_with('\'');
    if !is_quoted {
        return ImportTarget::Css(item.to_string());
    }
    let quote = item.as_bytes()[0] as char;
    let Some(close) = item[1..].find(quote).map(|i| i + 1) else {
        return ImportTarget::Css(item.to_string());
    };
    let url = &item[1..close];
    let has_media = !item[close + 1..].trim().is_empty();
    let is_css = url.ends_with(".css")
        || url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("//");
    if is_css || has_media {
        ImportTarget::Css(item.to_string())
    } else {
        ImportTarget::Sass(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_word_skips_substrings() {
        assert_eq!(find_word("$item in $items", "in"), Some(6));
        assert_eq!(find_word("$index in $list", "in"), Some(7));
        assert_eq!(find_word("$i from 1 through 3", "to"), None);
    }

    #[test]
    fn test_split_top_level_respects_parens() {
        let parts = split_top_level("\"a\", url(b,c), 'd'", b',');
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1].trim(), "url(b,c)");
    }

    #[test]
    fn test_classify_import() {
        assert_eq!(classify_import("\"theme\""), ImportTarget::Sass("theme".into()));
        assert_eq!(
            classify_import("\"reset.css\""),
            ImportTarget::Css("\"reset.css\"".into())
        );
        assert_eq!(
            classify_import("url(foo.css)"),
            ImportTarget::Css("url(foo.css)".into())
        );
        assert_eq!(
            classify_import("\"print\" screen"),
            ImportTarget::Css("\"print\" screen".into())
        );
    }
}
