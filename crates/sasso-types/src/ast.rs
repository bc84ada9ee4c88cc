//! AST node types for SCSS stylesheets.
//!
//! Every statement and expression carries a [`Span`]. Text that is
//! interpolated at evaluation time (selectors, property names, at-rule
//! parameters, string contents) is kept verbatim, `#{...}` included.

use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed stylesheet: the ordered list of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Stylesheet {
    pub nodes: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `$name: value [!default] [!global];`
    Variable(VariableDecl),
    /// `selector { body }`
    Rule(StyleRule),
    /// `property: value [!important];` optionally with a nested block.
    Declaration(Declaration),
    /// `--name: raw value;`
    CustomProperty(CustomProperty),
    /// `@mixin name(params) { body }`
    MixinDef(Callable),
    /// `@function name(params) { body }`
    FunctionDef(Callable),
    /// `@include name(args) [{ content }];`
    Include(Include),
    /// `@content;`
    Content(Span),
    /// `@return value;`
    Return(ReturnRule),
    /// `@use "url" [as ns] [with (...)];`
    Use(UseRule),
    /// `@forward "url" [as prefix-*] [show|hide ...] [with (...)];`
    Forward(ForwardRule),
    /// `@import "a", "b";`
    Import(ImportRule),
    /// `@if cond { } @else if cond { } @else { }`
    If(IfRule),
    /// `@each $a, $b in list { }`
    Each(EachRule),
    /// `@for $i from a through|to b { }`
    For(ForRule),
    /// `@while cond { }`
    While(WhileRule),
    /// `@extend selector [!optional];`
    Extend(ExtendRule),
    /// Any other at-rule: `@media`, `@supports`, `@keyframes`, `@font-face`, ...
    AtRule(AtRule),
    /// `@at-root [selector] { body }`
    AtRoot(AtRootRule),
    /// `@error`, `@warn`, `@debug`
    Message(MessageRule),
    /// A preserved `/* ... */` comment.
    Comment(Comment),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Variable(n) => n.span,
            Stmt::Rule(n) => n.span,
            Stmt::Declaration(n) => n.span,
            Stmt::CustomProperty(n) => n.span,
            Stmt::MixinDef(n) | Stmt::FunctionDef(n) => n.span,
            Stmt::Include(n) => n.span,
            Stmt::Content(span) => *span,
            Stmt::Return(n) => n.span,
            Stmt::Use(n) => n.span,
            Stmt::Forward(n) => n.span,
            Stmt::Import(n) => n.span,
            Stmt::If(n) => n.span,
            Stmt::Each(n) => n.span,
            Stmt::For(n) => n.span,
            Stmt::While(n) => n.span,
            Stmt::Extend(n) => n.span,
            Stmt::AtRule(n) => n.span,
            Stmt::AtRoot(n) => n.span,
            Stmt::Message(n) => n.span,
            Stmt::Comment(n) => n.span,
        }
    }

    /// Short human-readable name of the statement kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Stmt::Variable(_) => "variable declaration",
            Stmt::Rule(_) => "style rule",
            Stmt::Declaration(_) => "declaration",
            Stmt::CustomProperty(_) => "custom property",
            Stmt::MixinDef(_) => "@mixin",
            Stmt::FunctionDef(_) => "@function",
            Stmt::Include(_) => "@include",
            Stmt::Content(_) => "@content",
            Stmt::Return(_) => "@return",
            Stmt::Use(_) => "@use",
            Stmt::Forward(_) => "@forward",
            Stmt::Import(_) => "@import",
            Stmt::If(_) => "@if",
            Stmt::Each(_) => "@each",
            Stmt::For(_) => "@for",
            Stmt::While(_) => "@while",
            Stmt::Extend(_) => "@extend",
            Stmt::AtRule(_) => "at-rule",
            Stmt::AtRoot(_) => "@at-root",
            Stmt::Message(m) => match m.level {
                MessageLevel::Error => "@error",
                MessageLevel::Warn => "@warn",
                MessageLevel::Debug => "@debug",
            },
            Stmt::Comment(_) => "comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    /// `ns` in `ns.$name: value`.
    pub namespace: Option<String>,
    /// Name without the leading `$`.
    pub name: String,
    pub value: Expr,
    pub default: bool,
    pub global: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Raw selector text, may contain `&` and `#{...}`.
    pub selector: String,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Raw property name, may contain `#{...}`.
    pub property: String,
    /// `None` for a bare nested-property block (`font: { ... }`).
    pub value: Option<Expr>,
    pub important: bool,
    /// Nested properties, prefixed with `property-` when compiled.
    pub children: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomProperty {
    pub property: String,
    /// Raw value text; only `#{...}` is evaluated.
    pub value: String,
    pub span: Span,
}

/// A mixin or function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A declared parameter: `$name`, `$name: default` or `$name...`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub default: Option<Expr>,
    pub arbitrary: bool,
    pub span: Span,
}

/// A call-site argument: positional, named (`$name: value`) or spread (`value...`).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub value: Expr,
    pub spread: bool,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self {
            name: None,
            value,
            spread: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Include {
    pub namespace: Option<String>,
    pub name: String,
    pub args: Vec<Arg>,
    pub content: Option<Vec<Stmt>>,
    pub span: Span,
}

impl Include {
    /// `ns.name` or `name`.
    pub fn qualified_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnRule {
    pub value: Expr,
    pub span: Span,
}

/// `$name: value [!default]` inside `with (...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Expr,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseRule {
    pub url: String,
    /// Explicit `as` alias; `Some("*")` merges members globally.
    pub namespace: Option<String>,
    pub config: Vec<ConfigEntry>,
    pub span: Span,
}

/// A member listed in `show`/`hide`: variables keep their `$`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardFilter {
    Show(Vec<String>),
    Hide(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRule {
    pub url: String,
    /// `prefix-` from `as prefix-*`.
    pub prefix: Option<String>,
    pub filter: Option<ForwardFilter>,
    pub config: Vec<ConfigEntry>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportTarget {
    /// A Sass file to inline.
    Sass(String),
    /// A plain CSS import, emitted as written (`url(...)`, `.css`, media queries).
    Css(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportRule {
    pub targets: Vec<ImportTarget>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfRule {
    /// `@if` followed by every `@else if`, in order.
    pub clauses: Vec<IfClause>,
    pub else_body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EachRule {
    /// Names without `$`.
    pub variables: Vec<String>,
    pub iterable: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForRule {
    pub variable: String,
    pub from: Expr,
    pub to: Expr,
    /// `through` (true) or `to` (false).
    pub inclusive: bool,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileRule {
    pub condition: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendRule {
    pub selector: String,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRule {
    /// Name without `@`, e.g. `media`.
    pub name: String,
    /// Raw parameter text, interpolated at evaluation time.
    pub params: String,
    /// `None` for statement at-rules such as `@charset "utf-8";`.
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtRootRule {
    pub selector: Option<String>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Error,
    Warn,
    Debug,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRule {
    pub level: MessageLevel,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Full comment text including `/*` and `*/`.
    pub text: String,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// An unquoted string expression, used for raw fallbacks.
    pub fn unquoted(text: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::String {
                text: text.into(),
                quoted: false,
            },
            span,
        )
    }

    pub fn is_number_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Number { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `10`, `1.5em`, `50%`
    Number { value: f64, unit: Option<String> },
    /// Quoted or unquoted string; `text` may contain `#{...}`.
    String { text: String, quoted: bool },
    /// `#fff`, `#ff000080`, kept as written.
    Color(String),
    Bool(bool),
    Null,
    /// `$name` or `ns.$name`.
    Variable {
        namespace: Option<String>,
        name: String,
    },
    List {
        items: Vec<Expr>,
        separator: ListSeparator,
        bracketed: bool,
    },
    /// `(key: value, ...)`
    Map(Vec<(Expr, Expr)>),
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `name(args)` or `ns.name(args)`.
    Call {
        namespace: Option<String>,
        name: String,
        args: Vec<Arg>,
    },
    Paren(Box<Expr>),
    /// `&` used as a value.
    ParentSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListSeparator {
    Comma,
    Space,
    Slash,
}

impl ListSeparator {
    /// Separator as written between items in CSS output.
    pub fn as_css(self) -> &'static str {
        match self {
            ListSeparator::Comma => ", ",
            ListSeparator::Space => " ",
            ListSeparator::Slash => "/",
        }
    }

    /// Name reported by `list.separator()`.
    pub fn name(self) -> &'static str {
        match self {
            ListSeparator::Comma => "comma",
            ListSeparator::Space => "space",
            ListSeparator::Slash => "slash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    And,
    Or,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::LtEq => "<=",
            BinOp::GtEq => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq
        )
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "not ",
        }
    }
}
