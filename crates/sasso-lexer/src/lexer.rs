//! SCSS expression lexer: converts value text to a token stream.
//!
//! Features:
//! - Numbers with units (`10px`, `.5em`, `50%`) and signed literals
//! - Quoted strings with escapes kept verbatim
//! - Identifiers with embedded `#{...}` interpolation
//! - Raw `url(...)` contents
//! - Whitespace tracking per token, so the parser can tell `a -b` from `a - b`
//! - Error recovery: collects up to [`MAX_ERRORS`] errors

use sasso_types::{CompileError, CompileErrors, ErrorCode, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The SCSS expression lexer.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    file_name: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based).
    col: u32,
    errors: CompileErrors,
    /// Line the input starts on in the enclosing file.
    origin_line: u32,
    /// Whether the last emitted token can end an operand.
    prev_ends_operand: bool,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Lex `source` with positions starting at 1:1.
    pub fn new(source: &'src str, file_name: &'src str) -> Self {
        Self::with_origin(source, file_name, Span::point(1, 1))
    }

    /// Lex `source`, reporting positions as if it started at `origin` in
    /// the enclosing file.
    pub fn with_origin(source: &'src str, file_name: &'src str, origin: Span) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            file_name,
            pos: 0,
            line: origin.start_line,
            col: origin.start_col,
            errors: CompileErrors::empty(),
            origin_line: origin.start_line,
            prev_ends_operand: false,
        }
    }

    /// Lex the entire input into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();
        loop {
            if self.errors.total_errors >= MAX_ERRORS {
                break;
            }
            let ws_before = self.skip_trivia();
            if self.at_end() {
                break;
            }
            if let Some(token) = self.scan_token(ws_before) {
                self.prev_ends_operand = token.kind.ends_operand();
                tokens.push(token);
            }
        }
        tokens.push(Token::new(TokenKind::Eof, self.current_span(), true));
        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else if ch & 0xC0 != 0x80 {
            // Continuation bytes of a UTF-8 sequence share the column.
            self.col += 1;
        }
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn current_span(&self) -> Span {
        Span::point(self.line, self.col)
    }

    fn span_from(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(
            start_line,
            start_col,
            self.line,
            self.col.saturating_sub(1).max(start_col),
        )
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let index = span.start_line.saturating_sub(self.origin_line) as usize;
        let source_line = self.source.lines().nth(index).unwrap_or("");
        let err = CompileError::new(self.file_name, code, message, span, source_line);
        self.errors.push_error(err);
    }

    fn is_ident_start(ch: u8) -> bool {
        ch.is_ascii_alphabetic() || ch == b'_' || ch >= 0x80 || ch == b'\\'
    }

    fn is_ident_char(ch: u8) -> bool {
        Self::is_ident_start(ch) || ch.is_ascii_digit() || ch == b'-'
    }

    fn starts_interpolation(&self, offset: usize) -> bool {
        self.peek_at(offset) == Some(b'#') && self.peek_at(offset + 1) == Some(b'{')
    }

    fn starts_number(&self, offset: usize) -> bool {
        match self.peek_at(offset) {
            Some(b'0'..=b'9') => true,
            Some(b'.') => matches!(self.peek_at(offset + 1), Some(b'0'..=b'9')),
            _ => false,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace and comments; returns `true` if anything was skipped.
    fn skip_trivia(&mut self) -> bool {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n' | b'\x0c') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let (line, col) = (self.line, self.col);
                    self.advance();
                    self.advance();
                    let mut closed = false;
                    while !self.at_end() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        let span = self.span_from(line, col);
                        self.emit_error(ErrorCode::UNCLOSED_BLOCK, "Unterminated comment", span);
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
        self.pos > start || self.pos == 0
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    fn scan_token(&mut self, ws_before: bool) -> Option<Token> {
        let (line, col) = (self.line, self.col);
        let ch = self.peek()?;

        let kind = match ch {
            b'0'..=b'9' => self.scan_number(false),
            b'.' if self.starts_number(0) => self.scan_number(false),
            b'.' => {
                if self.peek_at(1) == Some(b'.') && self.peek_at(2) == Some(b'.') {
                    self.advance();
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    self.advance();
                    TokenKind::Dot
                }
            }
            b'-' => {
                let glued_to_operand = self.prev_ends_operand && !ws_before;
                if self.starts_number(1) && !glued_to_operand {
                    self.advance();
                    self.scan_number(true)
                } else if !glued_to_operand
                    && (self.peek_at(1).is_some_and(|c| Self::is_ident_start(c) || c == b'-')
                        || self.starts_interpolation(1))
                {
                    self.scan_ident()
                } else {
                    self.advance();
                    TokenKind::Minus
                }
            }
            b'+' => {
                self.advance();
                TokenKind::Plus
            }
            b'*' => {
                self.advance();
                TokenKind::Star
            }
            b'/' => {
                self.advance();
                TokenKind::Slash
            }
            b'%' => {
                self.advance();
                TokenKind::Percent
            }
            b'$' => {
                self.advance();
                let start = self.pos;
                while self.peek().is_some_and(Self::is_ident_char) {
                    self.advance();
                }
                if self.pos == start {
                    let span = self.span_from(line, col);
                    self.emit_error(
                        ErrorCode::UNEXPECTED_TOKEN,
                        "Expected variable name after '$'",
                        span,
                    );
                    return None;
                }
                TokenKind::Variable(self.source[start..self.pos].to_string())
            }
            b'"' | b'\'' => self.scan_string(ch, line, col)?,
            b'#' if self.starts_interpolation(0) => self.scan_ident(),
            b'#' => self.scan_hash(),
            b'!' => self.scan_bang(line, col)?,
            b'=' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Eq
                }
            }
            b'<' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::LessEq
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::GreaterEq
                } else {
                    TokenKind::Greater
                }
            }
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            b'[' => {
                self.advance();
                TokenKind::LBracket
            }
            b']' => {
                self.advance();
                TokenKind::RBracket
            }
            b',' => {
                self.advance();
                TokenKind::Comma
            }
            b':' => {
                self.advance();
                TokenKind::Colon
            }
            b'&' => {
                self.advance();
                TokenKind::Ampersand
            }
            c if Self::is_ident_start(c) => {
                let ident = self.scan_ident();
                if let TokenKind::Ident(name) = &ident {
                    if name.eq_ignore_ascii_case("url") && self.peek() == Some(b'(') {
                        if let Some(raw) = self.scan_raw_url() {
                            return Some(Token::new(
                                TokenKind::Url(raw),
                                self.span_from(line, col),
                                ws_before,
                            ));
                        }
                    }
                }
                ident
            }
            other => {
                self.advance();
                let span = self.span_from(line, col);
                self.emit_error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("Unexpected character '{}'", other as char),
                    span,
                );
                return None;
            }
        };
        Some(Token::new(kind, self.span_from(line, col), ws_before))
    }

    /// Scan a number with an optional unit. The sign, if any, was consumed.
    fn scan_number(&mut self, negative: bool) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        // Exponent only when digits follow, so `1em` keeps its unit.
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digits_at = if matches!(self.peek_at(1), Some(b'+' | b'-')) { 2 } else { 1 };
            if matches!(self.peek_at(digits_at), Some(b'0'..=b'9')) {
                for _ in 0..=digits_at {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let digits = &self.source[start..self.pos];
        let magnitude: f64 = digits.parse().unwrap_or(0.0);
        let value = if negative { -magnitude } else { magnitude };

        let unit = if self.peek() == Some(b'%') {
            self.advance();
            Some("%".to_string())
        } else if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) && !self.starts_interpolation(0) {
            let unit_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                self.advance();
            }
            Some(self.source[unit_start..self.pos].to_string())
        } else {
            None
        };
        TokenKind::Number { value, unit }
    }

    /// Scan identifier text, including escapes and `#{...}` segments.
    fn scan_ident(&mut self) -> TokenKind {
        let start = self.pos;
        loop {
            if self.starts_interpolation(0) {
                self.skip_interpolation();
                continue;
            }
            match self.peek() {
                Some(b'\\') => {
                    self.advance();
                    self.advance();
                }
                Some(c) if Self::is_ident_char(c) => {
                    self.advance();
                }
                _ => break,
            }
        }
        TokenKind::Ident(self.source[start..self.pos].to_string())
    }

    /// Consume a balanced `#{...}` segment, strings inside included.
    fn skip_interpolation(&mut self) {
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
                    self.advance();
                    while let Some(c) = self.advance() {
                        if c == b'\\' {
                            self.advance();
                        } else if c == ch {
                            break;
                        }
                    }
                    continue;
                }
                _ => {}
            }
            self.advance();
        }
        let span = self.current_span();
        self.emit_error(ErrorCode::UNCLOSED_BLOCK, "Unterminated interpolation", span);
    }

    /// Scan `#abc` as a color when it is valid hex, else as an identifier.
    fn scan_hash(&mut self) -> TokenKind {
        let start = self.pos;
        self.advance();
        let mut len = 0;
        while self.peek_at(len).is_some_and(|c| c.is_ascii_hexdigit()) {
            len += 1;
        }
        let followed_by_ident = self.peek_at(len).is_some_and(Self::is_ident_char);
        if matches!(len, 3 | 4 | 6 | 8) && !followed_by_ident {
            for _ in 0..len {
                self.advance();
            }
            return TokenKind::Color(self.source[start..self.pos].to_string());
        }
        while self.peek().is_some_and(Self::is_ident_char) || self.starts_interpolation(0) {
            if self.starts_interpolation(0) {
                self.skip_interpolation();
            } else {
                self.advance();
            }
        }
        TokenKind::Ident(self.source[start..self.pos].to_string())
    }

    fn scan_string(&mut self, quote: u8, line: u32, col: u32) -> Option<TokenKind> {
        self.advance();
        let start = self.pos;
        loop {
            match self.peek() {
                None | Some(b'\n') => {
                    let span = self.span_from(line, col);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                    );
                    return None;
                }
                Some(b'\\') => {
                    self.advance();
                    self.advance();
                }
                Some(_) if self.starts_interpolation(0) => self.skip_interpolation(),
                Some(c) if c == quote => break,
                Some(_) => {
                    self.advance();
                }
            }
        }
        let text = self.source[start..self.pos].to_string();
        self.advance();
        Some(TokenKind::QuotedString(text))
    }

    fn scan_bang(&mut self, line: u32, col: u32) -> Option<TokenKind> {
        self.advance();
        if self.peek() == Some(b'=') {
            self.advance();
            return Some(TokenKind::BangEq);
        }
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.advance();
        }
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.advance();
        }
        let word = self.source[start..self.pos].to_ascii_lowercase();
        match word.as_str() {
            "important" => Some(TokenKind::Important),
            "" => {
                let span = self.span_from(line, col);
                self.emit_error(ErrorCode::UNEXPECTED_TOKEN, "Expected flag after '!'", span);
                None
            }
            _ => Some(TokenKind::Flag(word)),
        }
    }

    /// After `url`, scan `(raw)` when the argument is not a quoted string.
    /// Leaves the cursor untouched and returns `None` otherwise.
    fn scan_raw_url(&mut self) -> Option<String> {
        let mut offset = 1;
        while matches!(self.peek_at(offset), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            offset += 1;
        }
        if matches!(self.peek_at(offset), Some(b'"' | b'\'') | None) {
            return None;
        }
        // Variables and calls inside url() are ordinary expressions.
        if self.peek_at(offset) == Some(b'$') {
            return None;
        }
        let mut end = self.pos + offset;
        let mut depth = 0u32;
        while let Some(&c) = self.bytes.get(end) {
            match c {
                b'(' => depth += 1,
                b')' if depth == 0 => break,
                b')' => depth -= 1,
                b'"' | b'\'' => return None,
                _ => {}
            }
            end += 1;
        }
        if end >= self.bytes.len() {
            return None;
        }
        let raw = self.source[self.pos + 1..end].trim().to_string();
        while self.pos <= end {
            self.advance();
        }
        Some(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let result = Lexer::new(src, "test.scss").lex();
        assert!(!result.errors.has_errors(), "unexpected lex errors for {src:?}");
        result.tokens.into_iter().map(|t| t.kind).collect()
    }

    fn num(value: f64, unit: Option<&str>) -> TokenKind {
        TokenKind::Number {
            value,
            unit: unit.map(String::from),
        }
    }

    #[test]
    fn test_number_units() {
        assert_eq!(
            kinds("10px .5em 50%"),
            vec![
                num(10.0, Some("px")),
                num(0.5, Some("em")),
                num(50.0, Some("%")),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_scientific_notation() {
        assert_eq!(
            kinds("1e3 2.5E-1px 4e+2% 1em 3e"),
            vec![
                num(1000.0, None),
                num(0.25, Some("px")),
                num(400.0, Some("%")),
                num(1.0, Some("em")),
                num(3.0, Some("e")),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_minus_disambiguation() {
        assert_eq!(
            kinds("$a - 1"),
            vec![
                TokenKind::Variable("a".into()),
                TokenKind::Minus,
                num(1.0, None),
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds("1px -2px"),
            vec![num(1.0, Some("px")), num(-2.0, Some("px")), TokenKind::Eof]
        );
        assert_eq!(
            kinds("10px-5px"),
            vec![
                num(10.0, Some("px")),
                TokenKind::Minus,
                num(5.0, Some("px")),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_hyphenated_identifiers() {
        assert_eq!(
            kinds("-webkit-box $font-size"),
            vec![
                TokenKind::Ident("-webkit-box".into()),
                TokenKind::Variable("font-size".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_interpolated_identifier() {
        assert_eq!(
            kinds("col-#{$i + 1}-x"),
            vec![TokenKind::Ident("col-#{$i + 1}-x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_colors_and_hash_idents() {
        assert_eq!(
            kinds("#fff #ff000080 #abcz"),
            vec![
                TokenKind::Color("#fff".into()),
                TokenKind::Color("#ff000080".into()),
                TokenKind::Ident("#abcz".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_strings_keep_escapes() {
        assert_eq!(
            kinds(r#""\f101" 'a#{"}"}b'"#),
            vec![
                TokenKind::QuotedString(r"\f101".into()),
                TokenKind::QuotedString(r#"a#{"}"}b"#.into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_raw_url() {
        assert_eq!(
            kinds("url(http://x.com/a.png) url(\"b.png\")"),
            vec![
                TokenKind::Url("http://x.com/a.png".into()),
                TokenKind::Ident("url".into()),
                TokenKind::LParen,
                TokenKind::QuotedString("b.png".into()),
                TokenKind::RParen,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(
            kinds("red !important 1 ! default != 2"),
            vec![
                TokenKind::Ident("red".into()),
                TokenKind::Important,
                num(1.0, None),
                TokenKind::Flag("default".into()),
                TokenKind::BangEq,
                num(2.0, None),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_whitespace_tracking() {
        let tokens = Lexer::new("a(b) c", "t.scss").lex().tokens;
        let ws: Vec<bool> = tokens.iter().map(|t| t.ws_before).collect();
        assert_eq!(ws, vec![true, false, false, false, true, true]);
    }

    #[test]
    fn test_comments_are_trivia() {
        assert_eq!(
            kinds("1 /* two */ 3 // four"),
            vec![num(1.0, None), num(3.0, None), TokenKind::Eof]
        );
    }

    #[test]
    fn test_unterminated_string_reports_error() {
        let result = Lexer::new("\"abc", "t.scss").lex();
        assert!(result.errors.has_errors());
        assert_eq!(
            result.errors.errors[0].code,
            ErrorCode::UNTERMINATED_STRING
        );
    }

    #[test]
    fn test_origin_offsets_spans() {
        let tokens = Lexer::with_origin("a b", "t.scss", Span::point(5, 10))
            .lex()
            .tokens;
        assert_eq!(tokens[0].span.start_line, 5);
        assert_eq!(tokens[0].span.start_col, 10);
        assert_eq!(tokens[1].span.start_col, 12);
    }
}
