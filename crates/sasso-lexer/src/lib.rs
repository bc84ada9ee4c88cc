//! Sasso lexer: converts SCSS expression text into a token stream.
//!
//! Statement structure (selectors, blocks, at-rule preludes) is handled by
//! the parser directly; this crate tokenizes the value side of the language.

pub mod lexer;
pub mod token;

pub use lexer::{LexResult, Lexer};
pub use token::{Token, TokenKind};
