//! `sass:selector`.
//!
//! Selector values are comma lists of space lists of unquoted compounds,
//! the shape `selector.parse()` returns.

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::selector::{resolve, split_list};
use crate::value::{ListSeparator, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "nest" => {
            let selectors = selector_args(args)?;
            let mut current: Vec<String> = Vec::new();
            for (i, selector) in selectors.iter().enumerate() {
                current = if i == 0 {
                    resolve(&[], selector)?
                } else {
                    resolve(&current, selector)?
                };
            }
            Ok(to_value(&current))
        }
        "append" => {
            let selectors = selector_args(args)?;
            let mut current: Vec<String> = Vec::new();
            for (i, selector) in selectors.iter().enumerate() {
                let parts = split_list(selector);
                if i == 0 {
                    current = parts;
                    continue;
                }
                let mut appended = Vec::with_capacity(current.len() * parts.len());
                for parent in &current {
                    for part in &parts {
                        if part.starts_with(['>', '+', '~']) {
                            return Err(EvalError::InvalidSelector(format!(
                                "Can't append {part} to {parent}."
                            )));
                        }
                        appended.push(format!("{parent}{part}"));
                    }
                }
                current = appended;
            }
            Ok(to_value(&current))
        }
        "parse" => {
            args.check_max(1)?;
            let text = selector_text(args.required(0, "selector")?)?;
            Ok(to_value(&split_list(&text)))
        }
        _ => Err(EvalError::UndefinedFunction(format!("selector.{name}"))),
    }
}

fn selector_args(args: &Args) -> EvalResult<Vec<String>> {
    if args.positional.is_empty() {
        return Err(EvalError::WrongArgCount(
            "$selectors: At least one selector must be passed.".to_string(),
        ));
    }
    args.positional.iter().map(selector_text).collect()
}

/// Selector text of a string or of a list in selector shape.
fn selector_text(value: &Value) -> EvalResult<String> {
    match value {
        Value::Str { content, .. } => Ok(content.clone()),
        Value::List(list) => {
            let parts = list
                .items
                .iter()
                .map(selector_text)
                .collect::<EvalResult<Vec<_>>>()?;
            let separator = match list.separator {
                ListSeparator::Comma => ", ",
                _ => " ",
            };
            Ok(parts.join(separator))
        }
        other => Err(EvalError::TypeMismatch(format!(
            "{} is not a valid selector: it must be a string or a list of strings.",
            ValueFormatter::inspect(other)
        ))),
    }
}

fn to_value(selectors: &[String]) -> Value {
    let complex = selectors
        .iter()
        .map(|selector| {
            let compounds = selector
                .split_whitespace()
                .map(Value::unquoted)
                .collect();
            Value::list(compounds, ListSeparator::Space)
        })
        .collect();
    Value::list(complex, ListSeparator::Comma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn run(name: &'static str, positional: Vec<Value>) -> EvalResult<Value> {
        call(name, &Args::new(name, positional, IndexMap::new()))
    }

    #[test]
    fn test_nest_resolves_parent() {
        let nested = run("nest", vec![Value::quoted(".a, .b"), Value::quoted("&:hover .c")]).unwrap();
        assert_eq!(nested.to_css(), ".a:hover .c, .b:hover .c");
    }

    #[test]
    fn test_append_glues_compounds() {
        let appended = run("append", vec![Value::quoted(".a"), Value::quoted(".b, -x")]).unwrap();
        assert_eq!(appended.to_css(), ".a.b, .a-x");
        assert!(run("append", vec![Value::quoted(".a"), Value::quoted("> .b")]).is_err());
    }

    #[test]
    fn test_parse_shape() {
        let parsed = run("parse", vec![Value::quoted(".a .b, .c")]).unwrap();
        let items = parsed.to_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_items().len(), 2);
    }

    #[test]
    fn test_nest_rejects_leading_parent() {
        assert!(run("nest", vec![Value::quoted("&.a")]).is_err());
    }
}
