//! Core parser infrastructure: character cursor, raw-text scanning, error
//! reporting and the stylesheet entry point.
//!
//! The statement level of SCSS is context sensitive (selectors, property
//! names and at-rule preludes are free-form text), so the parser walks the
//! source character by character and hands value text to [`ExprParser`].

use sasso_types::ast::{Expr, Stylesheet};
use sasso_types::{CompileError, CompileErrors, ErrorCode, SourceFile, Span, MAX_ERRORS};

use crate::parse_expr::ExprParser;

/// The SCSS stylesheet parser.
pub struct Parser<'src> {
    pub(crate) source_file: &'src SourceFile,
    pub(crate) text: &'src str,
    pub(crate) bytes: &'src [u8],
    pub(crate) pos: usize,
    pub(crate) line: u32,
    pub(crate) col: u32,
    pub(crate) errors: CompileErrors,
}

/// Result of parsing: the stylesheet plus any errors collected.
pub struct ParseResult {
    pub stylesheet: Stylesheet,
    pub errors: CompileErrors,
}

/// Raw text read up to a stop character, with the location it started at.
#[derive(Debug, Clone)]
pub(crate) struct RawText {
    pub text: String,
    pub span: Span,
    /// The stop character that ended the scan (`None` at end of input).
    pub stop: Option<u8>,
}

impl<'src> Parser<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source_file,
            text: &source_file.source,
            bytes: source_file.source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Parse the whole file into a [`Stylesheet`].
    pub fn parse(mut self) -> ParseResult {
        let nodes = self.parse_statements(false);
        let span = Span::new(1, 1, self.line, self.col);
        ParseResult {
            stylesheet: Stylesheet { nodes, span },
            errors: self.errors,
        }
    }

    // ── Character Cursor ──────────────────────────────────────────────────────

    pub(crate) fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    pub(crate) fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            self.col += 1;
        }
        Some(ch)
    }

    pub(crate) fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    pub(crate) fn span_from(&self, start: Span) -> Span {
        Span::new(
            start.start_line,
            start.start_col,
            self.line,
            self.col.saturating_sub(1).max(1),
        )
    }

    /// If the input continues with `word`, consume it and return `true`.
    pub(crate) fn eat_str(&mut self, word: &str) -> bool {
        if self.text[self.pos..].starts_with(word) {
            for _ in 0..word.len() {
                self.advance();
            }
            true
        } else {
            false
        }
    }

    pub(crate) fn is_name_char(ch: u8) -> bool {
        ch.is_ascii_alphanumeric() || ch == b'-' || ch == b'_' || ch >= 0x80
    }

    /// Read a run of name characters (`[A-Za-z0-9_-]`).
    pub(crate) fn read_name(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(Self::is_name_char) {
            self.advance();
        }
        self.text[start..self.pos].to_string()
    }

    // ── Whitespace & Comments ─────────────────────────────────────────────────

    /// Skip whitespace and `//` comments. Loud `/* */` comments are left in
    /// place so statement parsing can preserve them.
    pub(crate) fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b'\x0c') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                _ => return,
            }
        }
    }

    /// Skip whitespace and every kind of comment.
    pub(crate) fn skip_trivia(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                self.read_block_comment();
            } else {
                return;
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == b'\n' {
                break;
            }
            self.advance();
        }
    }

    /// Consume a `/* ... */` comment and return its full text.
    pub(crate) fn read_block_comment(&mut self) -> String {
        let start = self.pos;
        let start_span = self.current_span();
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start_span);
                    self.error_at(ErrorCode::UNCLOSED_BLOCK, "Unterminated comment", span);
                    break;
                }
                Some(b'*') if self.peek_at(1) == Some(b'/') => {
                    self.advance();
                    self.advance();
                    break;
                }
                _ => {
                    self.advance();
                }
            }
        }
        self.text[start..self.pos].to_string()
    }

    // ── Raw Text Scanning ─────────────────────────────────────────────────────

    /// Read raw text until one of `stops` appears outside of strings,
    /// parentheses, brackets and `#{...}`. Comments are dropped from the
    /// returned text; `url(...)` contents are copied untouched. The stop
    /// character itself is not consumed.
    pub(crate) fn scan_raw(&mut self, stops: &[u8]) -> RawText {
        self.skip_whitespace();
        let span = self.current_span();
        let mut out = String::new();
        let mut depth = 0u32;
        let mut stop = None;

        while let Some(ch) = self.peek() {
            if depth == 0 && stops.contains(&ch) {
                stop = Some(ch);
                break;
            }
            match ch {
                b'"' | b'\'' => {
                    let start = self.pos;
                    self.skip_string(ch);
                    out.push_str(&self.text[start..self.pos]);
                }
                b'#' if self.peek_at(1) == Some(b'{') => {
                    let start = self.pos;
                    self.skip_interpolation();
                    out.push_str(&self.text[start..self.pos]);
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line_comment(),
                b'/' if self.peek_at(1) == Some(b'*') => {
                    self.read_block_comment();
                    out.push(' ');
                }
                b'(' | b'[' => {
                    if ch == b'(' && self.is_raw_url_start() {
                        let start = self.pos;
                        self.skip_raw_url();
                        out.push_str(&self.text[start..self.pos]);
                        continue;
                    }
                    depth += 1;
                    out.push(ch as char);
                    self.advance();
                }
                b')' | b']' => {
                    depth = depth.saturating_sub(1);
                    out.push(ch as char);
                    self.advance();
                }
                _ => {
                    let start = self.pos;
                    self.advance();
                    while self.peek().is_some_and(|c| c & 0xC0 == 0x80) {
                        self.advance();
                    }
                    out.push_str(&self.text[start..self.pos]);
                }
            }
        }

        RawText {
            text: out.trim().to_string(),
            span,
            stop,
        }
    }

    /// Look ahead (without consuming) for the first of `stops` at depth 0.
    pub(crate) fn peek_stop(&self, stops: &[u8]) -> Option<u8> {
        let mut lookahead = Parser {
            source_file: self.source_file,
            text: self.text,
            bytes: self.bytes,
            pos: self.pos,
            line: self.line,
            col: self.col,
            errors: CompileErrors::empty(),
        };
        lookahead.scan_raw(stops).stop
    }

    pub(crate) fn skip_string(&mut self, quote: u8) {
        self.advance();
        while let Some(ch) = self.peek() {
            match ch {
                b'\\' => {
                    self.advance();
                    self.advance();
                }
                b'#' if self.peek_at(1) == Some(b'{') => self.skip_interpolation(),
                b'\n' => return,
                c if c == quote => {
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    pub(crate) fn skip_interpolation(&mut self) {
        self.advance();
        self.advance();
        let mut depth = 1u32;
        while let Some(ch) = self.peek() {
            match ch {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return;
                    }
                }
                b'"' | b'\'' => {
                    self.skip_string(ch);
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// `(` preceded by `url` (case-insensitive) and not followed by a quote.
    fn is_raw_url_start(&self) -> bool {
        if self.pos < 3 || !self.text[self.pos - 3..self.pos].eq_ignore_ascii_case("url") {
            return false;
        }
        if self.pos >= 4 && Self::is_name_char(self.bytes[self.pos - 4]) {
            return false;
        }
        let rest = self.text[self.pos + 1..].trim_start();
        !(rest.starts_with('"') || rest.starts_with('\'') || rest.starts_with('$'))
    }

    fn skip_raw_url(&mut self) {
        let mut depth = 0u32;
        while let Some(ch) = self.advance() {
            match ch {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return;
                    }
                }
                _ => {}
            }
        }
    }

    // ── Expressions ───────────────────────────────────────────────────────────

    /// Parse `raw` as an expression, recording any errors.
    pub(crate) fn parse_expr_text(&mut self, raw: &RawText) -> Option<Expr> {
        match ExprParser::parse_text(&raw.text, &self.source_file.name, raw.span) {
            Ok(expr) => Some(expr),
            Err(errors) => {
                self.push_errors(errors);
                None
            }
        }
    }

    /// Parse `raw` as an expression; on failure keep the text as an
    /// unquoted string so unknown CSS syntax passes through.
    pub(crate) fn parse_value_text(&mut self, raw: &RawText) -> Expr {
        ExprParser::parse_text(&raw.text, &self.source_file.name, raw.span)
            .unwrap_or_else(|_| Expr::unquoted(raw.text.clone(), raw.span))
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        let error = CompileError::new(&self.source_file.name, code, message, span, source_line);
        self.push_error(error);
    }

    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    fn push_error(&mut self, mut error: CompileError) {
        error.source_line = self
            .source_file
            .line(error.span.start_line)
            .unwrap_or("")
            .to_string();
        self.errors.push_error(error);
    }

    pub(crate) fn push_errors(&mut self, errors: CompileErrors) {
        for error in errors.errors {
            self.push_error(error);
        }
    }

    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= MAX_ERRORS
    }

    /// Skip to just past the next `;` or to the next `}` at depth 0.
    pub(crate) fn synchronize(&mut self) {
        let raw = self.scan_raw(b";{}");
        match raw.stop {
            Some(b';') => {
                self.advance();
            }
            Some(b'{') => {
                self.advance();
                self.skip_block_contents();
            }
            _ => {}
        }
    }

    /// Skip a block body after its `{`, through the matching `}`.
    fn skip_block_contents(&mut self) {
        loop {
            let raw = self.scan_raw(b"{}");
            match raw.stop {
                Some(b'{') => {
                    self.advance();
                    self.skip_block_contents();
                }
                Some(_) => {
                    self.advance();
                    return;
                }
                None => return,
            }
        }
    }
}
