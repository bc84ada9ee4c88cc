//! Value formatting: CSS output text and `meta.inspect()` text.

use crate::value::{format_number, ListSeparator, SassList, SassNumber, Value};

/// Renders values as text.
pub struct ValueFormatter;

impl ValueFormatter {
    /// CSS text for a value. `null` renders as nothing and null list items
    /// are skipped.
    pub fn format(value: &Value) -> String {
        match value {
            Value::Number(n) => format_sass_number(n),
            Value::Str { content, quoted } => {
                if *quoted {
                    quote(content)
                } else {
                    content.clone()
                }
            }
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::List(list) => format_list(list),
            Value::Map(_) => Self::inspect(value),
            Value::Color(c) => c.to_css(),
            Value::MixinRef(name) => format!("get-mixin(\"{name}\")"),
            Value::FunctionRef(name) => format!("get-function(\"{name}\")"),
        }
    }

    /// Debug text, as returned by `meta.inspect()` and printed by `@debug`.
    pub fn inspect(value: &Value) -> String {
        match value {
            Value::Null => "null".to_string(),
            Value::List(list) => inspect_list(list),
            Value::Map(map) => {
                if map.is_empty() {
                    return "()".to_string();
                }
                let entries: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("{}: {}", inspect_nested(k, true), inspect_nested(v, true)))
                    .collect();
                format!("({})", entries.join(", "))
            }
            other => Self::format(other),
        }
    }
}

fn format_sass_number(n: &SassNumber) -> String {
    if let Some(slash) = &n.as_slash {
        return format!("{}/{}", format_sass_number(&slash.0), format_sass_number(&slash.1));
    }
    format!("{}{}", format_number(n.value), n.unit_str())
}

fn format_list(list: &SassList) -> String {
    let parts: Vec<String> = list
        .items
        .iter()
        .filter(|item| !item.is_null())
        .map(ValueFormatter::format)
        .filter(|text| !text.is_empty())
        .collect();
    let joined = parts.join(list.separator.as_css());
    if list.bracketed {
        format!("[{joined}]")
    } else {
        joined
    }
}

fn inspect_list(list: &SassList) -> String {
    if list.items.is_empty() {
        return if list.bracketed { "[]" } else { "()" }.to_string();
    }
    let parts: Vec<String> = list
        .items
        .iter()
        .map(|item| inspect_nested(item, needs_parens(item, list.separator)))
        .collect();
    let mut joined = parts.join(list.separator.as_css());
    if list.items.len() == 1 && list.separator == ListSeparator::Comma {
        joined.push(',');
    }
    if list.bracketed {
        format!("[{joined}]")
    } else if list.items.len() == 1 && list.separator == ListSeparator::Comma {
        format!("({joined})")
    } else {
        joined
    }
}

/// Whether a nested list must be parenthesized inside a list using `outer`.
fn needs_parens(item: &Value, outer: ListSeparator) -> bool {
    match item {
        Value::List(inner) if !inner.bracketed && inner.items.len() > 1 => match outer {
            ListSeparator::Comma => inner.separator == ListSeparator::Comma,
            ListSeparator::Space => inner.separator != ListSeparator::Slash,
            ListSeparator::Slash => true,
        },
        _ => false,
    }
}

fn inspect_nested(value: &Value, parens: bool) -> String {
    let text = ValueFormatter::inspect(value);
    match value {
        Value::List(list) if parens && !list.bracketed && list.items.len() > 1 => format!("({text})"),
        _ => text,
    }
}

/// Quote a string for output, preferring double quotes.
pub fn quote(content: &str) -> String {
    if content.contains('"') && !content.contains('\'') {
        format!("'{content}'")
    } else {
        format!("\"{}\"", content.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SassMap;

    #[test]
    fn test_number_with_unit() {
        assert_eq!(ValueFormatter::format(&Value::with_unit(6.0, "px")), "6px");
    }

    #[test]
    fn test_slash_number_prints_as_written() {
        let mut n = SassNumber::unitless(8.0);
        n.as_slash = Some(Box::new((SassNumber::with_unit(12.0, "px"), SassNumber::unitless(1.5))));
        assert_eq!(ValueFormatter::format(&Value::Number(n)), "12px/1.5");
    }

    #[test]
    fn test_null_items_skipped() {
        let list = Value::list(
            vec![Value::unquoted("a"), Value::Null, Value::unquoted("b")],
            ListSeparator::Space,
        );
        assert_eq!(ValueFormatter::format(&list), "a b");
        assert_eq!(ValueFormatter::inspect(&list), "a null b");
    }

    #[test]
    fn test_inspect_nested_lists_and_maps() {
        let inner = Value::list(vec![Value::number(1.0), Value::number(2.0)], ListSeparator::Space);
        let outer = Value::list(vec![inner, Value::number(3.0)], ListSeparator::Space);
        assert_eq!(ValueFormatter::inspect(&outer), "(1 2) 3");

        let map: SassMap = [(Value::unquoted("a"), Value::quoted("x"))].into_iter().collect();
        assert_eq!(ValueFormatter::inspect(&Value::Map(map)), "(a: \"x\")");
        assert_eq!(ValueFormatter::inspect(&Value::empty_list()), "()");
    }

    #[test]
    fn test_quote_prefers_double() {
        assert_eq!(quote("a"), "\"a\"");
        assert_eq!(quote("say \"hi\""), "'say \"hi\"'");
    }
}
