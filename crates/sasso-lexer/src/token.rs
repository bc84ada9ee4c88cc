//! Token types for SCSS expressions.

use sasso_types::Span;
use std::fmt;

/// A single token with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whether whitespace (or a comment) separated this token from the
    /// previous one. Space-separated lists and unary minus depend on it.
    pub ws_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, ws_before: bool) -> Self {
        Self {
            kind,
            span,
            ws_before,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    /// `10`, `-2.5em`, `50%`
    Number { value: f64, unit: Option<String> },
    /// `"text"` / `'text'`, escapes kept verbatim.
    QuotedString(String),
    /// Identifier-like text, possibly with embedded `#{...}`: `solid`,
    /// `-webkit-box`, `col-#{$i}`, `--gap`.
    Ident(String),
    /// `$name`
    Variable(String),
    /// `#fff`
    Color(String),
    /// Unquoted contents of `url(...)`.
    Url(String),
    /// `!important`
    Important,
    /// `!default`, `!global`, `!optional`
    Flag(String),

    // ── Operators ─────────────────────────────────────────────
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    /// Single `=`, only meaningful inside legacy IE filters.
    Eq,

    // ── Punctuation ───────────────────────────────────────────
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,
    Ellipsis,
    Ampersand,

    Eof,
}

impl TokenKind {
    /// Tokens that can end an operand; a `-` right after one of these
    /// without whitespace is a binary minus.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number { .. }
                | TokenKind::QuotedString(_)
                | TokenKind::Ident(_)
                | TokenKind::Variable(_)
                | TokenKind::Color(_)
                | TokenKind::Url(_)
                | TokenKind::RParen
                | TokenKind::RBracket
        )
    }

    /// `true` for an identifier equal to `word` (case-sensitive).
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, TokenKind::Ident(name) if name == word)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number { value, unit } => {
                write!(f, "{value}{}", unit.as_deref().unwrap_or(""))
            }
            TokenKind::QuotedString(s) => write!(f, "\"{s}\""),
            TokenKind::Ident(s) => f.write_str(s),
            TokenKind::Variable(s) => write!(f, "${s}"),
            TokenKind::Color(s) => f.write_str(s),
            TokenKind::Url(s) => write!(f, "url({s})"),
            TokenKind::Important => f.write_str("!important"),
            TokenKind::Flag(s) => write!(f, "!{s}"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::BangEq => f.write_str("!="),
            TokenKind::Less => f.write_str("<"),
            TokenKind::Greater => f.write_str(">"),
            TokenKind::LessEq => f.write_str("<="),
            TokenKind::GreaterEq => f.write_str(">="),
            TokenKind::Eq => f.write_str("="),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBracket => f.write_str("["),
            TokenKind::RBracket => f.write_str("]"),
            TokenKind::Comma => f.write_str(","),
            TokenKind::Colon => f.write_str(":"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Ellipsis => f.write_str("..."),
            TokenKind::Ampersand => f.write_str("&"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}
