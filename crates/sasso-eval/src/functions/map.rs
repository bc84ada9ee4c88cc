//! `sass:map`.

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::value::{ListSeparator, SassMap, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "get" => {
            let map = args.map(0, "map")?;
            let keys = key_path(args, 1)?;
            let mut current = Value::Map(map);
            for key in &keys {
                current = match &current {
                    Value::Map(m) => match m.get(key) {
                        Some(v) => v.clone(),
                        None => return Ok(Value::Null),
                    },
                    _ => return Ok(Value::Null),
                };
            }
            Ok(current)
        }
        "has-key" => {
            let map = args.map(0, "map")?;
            let keys = key_path(args, 1)?;
            let mut current = map;
            for (i, key) in keys.iter().enumerate() {
                match current.get(key) {
                    None => return Ok(Value::Bool(false)),
                    Some(_) if i + 1 == keys.len() => return Ok(Value::Bool(true)),
                    Some(Value::Map(inner)) => current = inner.clone(),
                    Some(_) => return Ok(Value::Bool(false)),
                }
            }
            Ok(Value::Bool(false))
        }
        "merge" => {
            let map1 = args.map(0, "map1")?;
            if args.positional.len() <= 2 {
                args.check_max(2)?;
                let map2 = args.map(1, "map2")?;
                return Ok(Value::Map(map1.merged(&map2)));
            }
            // merge($map1, $keys..., $map2)
            let last = args.positional.len() - 1;
            let map2 = args.map(last, "map2")?;
            let keys: Vec<Value> = args.positional[1..last].to_vec();
            Ok(Value::Map(update_nested(&map1, &keys, &|inner| {
                Value::Map(inner.merged(&map2))
            })))
        }
        "deep-merge" => {
            args.check_max(2)?;
            let map1 = args.map(0, "map1")?;
            let map2 = args.map(1, "map2")?;
            Ok(Value::Map(map1.deep_merged(&map2)))
        }
        "remove" => {
            let mut map = args.map(0, "map")?;
            for key in args.rest(1) {
                map.remove(&key);
            }
            Ok(Value::Map(map))
        }
        "set" => {
            let map = args.map(0, "map")?;
            let len = args.positional.len();
            if len < 3 {
                return Err(EvalError::WrongArgCount(
                    "Expected $args to contain a key and a value.".to_string(),
                ));
            }
            let value = args.positional[len - 1].clone();
            let keys: Vec<Value> = args.positional[1..len - 2].to_vec();
            let last_key = args.positional[len - 2].clone();
            Ok(Value::Map(update_nested(&map, &keys, &|mut inner| {
                inner.insert(last_key.clone(), value.clone());
                Value::Map(inner)
            })))
        }
        "keys" => {
            args.check_max(1)?;
            let map = args.map(0, "map")?;
            Ok(Value::list(map.keys().cloned().collect(), ListSeparator::Comma))
        }
        "values" => {
            args.check_max(1)?;
            let map = args.map(0, "map")?;
            Ok(Value::list(map.values().cloned().collect(), ListSeparator::Comma))
        }
        _ => Err(EvalError::UndefinedFunction(format!("map.{name}"))),
    }
}

/// Keys from position `from` on; at least one is required.
fn key_path(args: &Args, from: usize) -> EvalResult<Vec<Value>> {
    let mut keys = args.rest(from);
    if keys.is_empty() {
        keys.push(args.required(from, "key")?.clone());
    }
    Ok(keys)
}

/// Apply `update` to the map found by following `keys`, creating empty
/// maps along the way.
fn update_nested(map: &SassMap, keys: &[Value], update: &dyn Fn(SassMap) -> Value) -> SassMap {
    let Some((first, rest)) = keys.split_first() else {
        return match update(map.clone()) {
            Value::Map(m) => m,
            _ => map.clone(),
        };
    };
    let inner = match map.get(first) {
        Some(Value::Map(m)) => m.clone(),
        _ => SassMap::new(),
    };
    let mut result = map.clone();
    result.insert(first.clone(), Value::Map(update_nested(&inner, rest, update)));
    result
}
