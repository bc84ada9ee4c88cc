//! `sass:string`.
//!
//! Indexes are 1-based and count characters; negative indexes count from
//! the end.

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::value::{ListSeparator, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "length" => {
            args.check_max(1)?;
            let text = args.string(0, "string")?;
            Ok(Value::number(text.chars().count() as f64))
        }
        "index" => {
            args.check_max(2)?;
            let text = args.string(0, "string")?;
            let needle = args.string(1, "substring")?;
            Ok(match text.find(needle) {
                Some(byte) => Value::number((text[..byte].chars().count() + 1) as f64),
                None => Value::Null,
            })
        }
        "insert" => {
            args.check_max(3)?;
            let (content, quoted) = string_parts(args)?;
            let insert = args.string(1, "insert")?;
            let index = args.int(2, "index")?;
            let chars: Vec<char> = content.chars().collect();
            let len = chars.len() as i64;
            let at = if index < 0 {
                (len + index + 1).max(0)
            } else {
                (index - 1).clamp(0, len)
            } as usize;
            let mut result: String = chars[..at.min(chars.len())].iter().collect();
            result.push_str(insert);
            result.extend(&chars[at.min(chars.len())..]);
            Ok(Value::Str {
                content: result,
                quoted,
            })
        }
        "slice" => {
            args.check_max(3)?;
            let (content, quoted) = string_parts(args)?;
            let start = args.int(1, "start-at")?;
            let end = match args.get(2, "end-at") {
                Some(Value::Null) | None => -1,
                Some(_) => args.int(2, "end-at")?,
            };
            Ok(Value::Str {
                content: slice(&content, start, end),
                quoted,
            })
        }
        "to-upper-case" => {
            args.check_max(1)?;
            let (content, quoted) = string_parts(args)?;
            Ok(Value::Str {
                content: content.to_ascii_uppercase(),
                quoted,
            })
        }
        "to-lower-case" => {
            args.check_max(1)?;
            let (content, quoted) = string_parts(args)?;
            Ok(Value::Str {
                content: content.to_ascii_lowercase(),
                quoted,
            })
        }
        "quote" => {
            args.check_max(1)?;
            Ok(Value::quoted(args.string(0, "string")?))
        }
        "unquote" => {
            args.check_max(1)?;
            Ok(Value::unquoted(args.string(0, "string")?))
        }
        "split" => {
            args.check_max(3)?;
            let (content, quoted) = string_parts(args)?;
            let separator = args.string(1, "separator")?;
            let limit = match args.get(2, "limit") {
                Some(Value::Null) | None => None,
                Some(_) => Some(args.int(2, "limit")?),
            };
            if let Some(limit) = limit.filter(|l| *l < 1) {
                return Err(EvalError::InvalidArgument(format!(
                    "$limit: Must be 1 or greater, was {limit}."
                )));
            }
            let pieces: Vec<String> = match (separator.is_empty(), limit) {
                (true, _) => content.chars().map(String::from).collect(),
                (false, Some(limit)) => content
                    .splitn(limit as usize + 1, separator)
                    .map(String::from)
                    .collect(),
                (false, None) => content.split(separator).map(String::from).collect(),
            };
            let items = pieces
                .into_iter()
                .map(|content| Value::Str { content, quoted })
                .collect();
            let mut list = crate::value::SassList::new(items, ListSeparator::Comma);
            list.bracketed = true;
            Ok(Value::List(list))
        }
        _ => Err(EvalError::UndefinedFunction(format!("string.{name}"))),
    }
}

fn string_parts(args: &Args) -> EvalResult<(String, bool)> {
    match args.required(0, "string")? {
        Value::Str { content, quoted } => Ok((content.clone(), *quoted)),
        other => Err(EvalError::TypeMismatch(format!(
            "$string: {} is not a string.",
            crate::format::ValueFormatter::inspect(other)
        ))),
    }
}

/// Characters `start..=end` with 1-based, end-relative-when-negative indexes.
fn slice(text: &str, start: i64, end: i64) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len() as i64;
    let normalize = |i: i64| if i < 0 { len + i + 1 } else { i };
    let start = normalize(start).max(1);
    let end = normalize(end).min(len);
    if start > end {
        return String::new();
    }
    chars[(start - 1) as usize..end as usize].iter().collect()
}
