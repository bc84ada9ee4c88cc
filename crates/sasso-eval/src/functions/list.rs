//! `sass:list`.

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::value::{ListSeparator, SassList, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "length" => {
            args.check_max(1)?;
            let list = args.required(0, "list")?;
            Ok(Value::number(list.to_items().len() as f64))
        }
        "nth" => {
            args.check_max(2)?;
            let items = args.required(0, "list")?.to_items();
            let index = resolve_index(args, &items, 1, "n")?;
            Ok(items[index].clone())
        }
        "set-nth" => {
            args.check_max(3)?;
            let list = args.required(0, "list")?.clone();
            let mut items = list.to_items();
            let index = resolve_index(args, &items, 1, "n")?;
            items[index] = args.required(2, "value")?.clone();
            Ok(rebuild(&list, items))
        }
        "join" => {
            args.check_max(4)?;
            let first = args.required(0, "list1")?;
            let second = args.required(1, "list2")?;
            let separator = match separator_arg(args, 2)? {
                Some(sep) => sep,
                None => default_separator(first, second),
            };
            let bracketed = match args.get(3, "bracketed") {
                None => is_bracketed(first),
                Some(Value::Str { content, .. }) if content == "auto" => is_bracketed(first),
                Some(value) => value.is_truthy(),
            };
            let mut items = first.to_items();
            items.extend(second.to_items());
            Ok(Value::List(SassList {
                items,
                separator,
                bracketed,
            }))
        }
        "append" => {
            args.check_max(3)?;
            let list = args.required(0, "list")?;
            let value = args.required(1, "val")?.clone();
            let separator = match separator_arg(args, 2)? {
                Some(sep) => sep,
                None => match list {
                    Value::List(l) if l.items.len() > 1 || l.separator != ListSeparator::Space => {
                        l.separator
                    }
                    Value::Map(m) if !m.is_empty() => ListSeparator::Comma,
                    _ => ListSeparator::Space,
                },
            };
            let mut items = list.to_items();
            items.push(value);
            Ok(Value::List(SassList {
                items,
                separator,
                bracketed: is_bracketed(list),
            }))
        }
        "zip" => {
            let lists: Vec<Vec<Value>> = args.positional.iter().map(Value::to_items).collect();
            let shortest = lists.iter().map(Vec::len).min().unwrap_or(0);
            let items = (0..shortest)
                .map(|i| {
                    Value::list(
                        lists.iter().map(|l| l[i].clone()).collect(),
                        ListSeparator::Space,
                    )
                })
                .collect();
            Ok(Value::list(items, ListSeparator::Comma))
        }
        "index" => {
            args.check_max(2)?;
            let items = args.required(0, "list")?.to_items();
            let needle = args.required(1, "value")?;
            Ok(items
                .iter()
                .position(|item| item == needle)
                .map(|i| Value::number((i + 1) as f64))
                .unwrap_or(Value::Null))
        }
        "separator" => {
            args.check_max(1)?;
            let list = args.required(0, "list")?;
            Ok(Value::unquoted(list.separator().name()))
        }
        "is-bracketed" => {
            args.check_max(1)?;
            Ok(Value::Bool(is_bracketed(args.required(0, "list")?)))
        }
        "slash" => {
            if args.positional.len() < 2 {
                return Err(EvalError::WrongArgCount(
                    "At least two elements are required.".to_string(),
                ));
            }
            Ok(Value::list(args.positional.clone(), ListSeparator::Slash))
        }
        _ => Err(EvalError::UndefinedFunction(format!("list.{name}"))),
    }
}

fn is_bracketed(value: &Value) -> bool {
    matches!(value, Value::List(l) if l.bracketed)
}

/// Separator for `join()` without an explicit one: the first list's, unless
/// it has fewer than two items.
fn default_separator(first: &Value, second: &Value) -> ListSeparator {
    let explicit = |v: &Value| match v {
        Value::List(l) if l.items.len() > 1 => Some(l.separator),
        Value::Map(m) if !m.is_empty() => Some(ListSeparator::Comma),
        _ => None,
    };
    explicit(first)
        .or_else(|| explicit(second))
        .unwrap_or(ListSeparator::Space)
}

fn separator_arg(args: &Args, index: usize) -> EvalResult<Option<ListSeparator>> {
    match args.get(index, "separator") {
        None => Ok(None),
        Some(Value::Str { content, .. }) => match content.as_str() {
            "auto" => Ok(None),
            "comma" => Ok(Some(ListSeparator::Comma)),
            "space" => Ok(Some(ListSeparator::Space)),
            "slash" => Ok(Some(ListSeparator::Slash)),
            other => Err(EvalError::InvalidArgument(format!(
                "$separator: Must be \"space\", \"comma\", \"slash\", or \"auto\", was \"{other}\"."
            ))),
        },
        Some(other) => Err(EvalError::TypeMismatch(format!(
            "$separator: {} is not a string.",
            ValueFormatter::inspect(other)
        ))),
    }
}

/// A 1-based (or negative, end-relative) index into `items`.
fn resolve_index(args: &Args, items: &[Value], position: usize, name: &str) -> EvalResult<usize> {
    let n = args.int(position, name)?;
    let len = items.len() as i64;
    if n == 0 || n.abs() > len {
        return Err(EvalError::InvalidArgument(format!(
            "${name}: Invalid index {n} for a list with {len} elements."
        )));
    }
    Ok(if n > 0 { n - 1 } else { len + n } as usize)
}

/// Same list shape as `original` with new items.
fn rebuild(original: &Value, items: Vec<Value>) -> Value {
    match original {
        Value::List(l) => Value::List(SassList {
            items,
            separator: l.separator,
            bracketed: l.bracketed,
        }),
        Value::Map(_) => Value::list(items, ListSeparator::Comma),
        _ => Value::list(items, ListSeparator::Space),
    }
}
