//! Runtime values for SassScript evaluation.

mod color;
mod map;
mod number;

pub use color::Color;
pub use map::SassMap;
pub use number::{format_number, SassNumber};
pub use sasso_types::ast::ListSeparator;

use crate::format::ValueFormatter;

/// A list value.
#[derive(Debug, Clone, PartialEq)]
pub struct SassList {
    pub items: Vec<Value>,
    pub separator: ListSeparator,
    pub bracketed: bool,
}

impl SassList {
    pub fn new(items: Vec<Value>, separator: ListSeparator) -> Self {
        Self {
            items,
            separator,
            bracketed: false,
        }
    }
}

/// A SassScript value.
#[derive(Debug, Clone)]
pub enum Value {
    Number(SassNumber),
    Str { content: String, quoted: bool },
    Bool(bool),
    Null,
    List(SassList),
    Map(SassMap),
    Color(Color),
    /// Returned by `meta.get-mixin()`.
    MixinRef(String),
    /// Returned by `meta.get-function()`.
    FunctionRef(String),
}

impl Value {
    // ── Constructors ──────────────────────────────────────────────────────────

    pub fn number(value: f64) -> Self {
        Value::Number(SassNumber::unitless(value))
    }

    pub fn with_unit(value: f64, unit: &str) -> Self {
        Value::Number(SassNumber::with_unit(value, unit))
    }

    pub fn unquoted(content: impl Into<String>) -> Self {
        Value::Str {
            content: content.into(),
            quoted: false,
        }
    }

    pub fn quoted(content: impl Into<String>) -> Self {
        Value::Str {
            content: content.into(),
            quoted: true,
        }
    }

    pub fn list(items: Vec<Value>, separator: ListSeparator) -> Self {
        Value::List(SassList::new(items, separator))
    }

    pub fn empty_list() -> Self {
        Value::list(Vec::new(), ListSeparator::Space)
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Name reported by `meta.type-of()`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Str { .. } => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Color(_) => "color",
            Value::MixinRef(_) => "mixin",
            Value::FunctionRef(_) => "function",
        }
    }

    /// Truthiness for `@if`, `@while` and `if()`: only `false` and `null`
    /// are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Null)
    }

    /// Truthiness for `and`, `or` and `not`: `false`, `null`, `0` and the
    /// empty string are falsy.
    pub fn is_operation_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Null => false,
            Value::Number(n) => n.value != 0.0,
            Value::Str { content, .. } => !content.is_empty(),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, or an unquoted string that renders as nothing.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Str {
                content,
                quoted: false,
            } => content.trim().is_empty(),
            Value::List(list) => !list.bracketed && list.items.iter().all(Value::is_blank),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<&SassNumber> {
        match self {
            Value::Number(n) => Some(n),
            _ => None,
        }
    }

    /// String contents regardless of quoting.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str { content, .. } => Some(content),
            _ => None,
        }
    }

    /// The value viewed as a list: lists yield their items, maps yield
    /// `key value` pairs, everything else is a one-element list.
    pub fn to_items(&self) -> Vec<Value> {
        match self {
            Value::List(list) => list.items.clone(),
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| Value::list(vec![k.clone(), v.clone()], ListSeparator::Space))
                .collect(),
            other => vec![other.clone()],
        }
    }

    /// Separator reported by `list.separator()`.
    pub fn separator(&self) -> ListSeparator {
        match self {
            Value::List(list) => list.separator,
            Value::Map(map) if !map.is_empty() => ListSeparator::Comma,
            _ => ListSeparator::Space,
        }
    }

    /// Drop the slash origin of a number, e.g. after parentheses.
    pub fn without_slash(self) -> Self {
        match self {
            Value::Number(n) if n.as_slash.is_some() => Value::Number(n.without_slash()),
            other => other,
        }
    }

    /// Canonical text used for map keys and `@each` identity.
    pub fn key(&self) -> String {
        match self {
            Value::Str { content, .. } => content.clone(),
            other => ValueFormatter::inspect(other),
        }
    }

    /// CSS text of the value.
    pub fn to_css(&self) -> String {
        ValueFormatter::format(self)
    }

    /// Text with string quotes removed, used for interpolation.
    pub fn to_css_unquoted(&self) -> String {
        match self {
            Value::Str { content, .. } => content.clone(),
            other => ValueFormatter::format(other),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => numbers_equal(a, b),
            (Value::Str { content: a, .. }, Value::Str { content: b, .. }) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::List(a), Value::List(b)) => {
                if a.items.is_empty() && b.items.is_empty() {
                    return a.bracketed == b.bracketed;
                }
                a.separator == b.separator && a.bracketed == b.bracketed && a.items == b.items
            }
            (Value::List(list), Value::Map(map)) | (Value::Map(map), Value::List(list)) => {
                list.items.is_empty() && map.is_empty()
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Color(a), Value::Color(b)) => a.same_as(b),
            (Value::MixinRef(a), Value::MixinRef(b)) => a == b,
            (Value::FunctionRef(a), Value::FunctionRef(b)) => a == b,
            _ => false,
        }
    }
}

/// Equal when the values match after unit conversion. A unitless number
/// never equals a number with a unit.
fn numbers_equal(a: &SassNumber, b: &SassNumber) -> bool {
    match (&a.unit, &b.unit) {
        (None, None) => (a.value - b.value).abs() < 1e-10,
        (Some(_), None) | (None, Some(_)) => false,
        (Some(_), Some(unit)) => a
            .value_in(unit)
            .is_some_and(|v| (v - b.value).abs() < 1e-10),
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<SassNumber> for Value {
    fn from(n: SassNumber) -> Self {
        Value::Number(n)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<SassMap> for Value {
    fn from(m: SassMap) -> Self {
        Value::Map(m)
    }
}
