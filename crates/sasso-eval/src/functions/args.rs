//! Argument access for built-in functions.

use crate::env::normalize;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::value::{Color, SassMap, SassNumber, Value};
use indexmap::IndexMap;

/// Evaluated arguments of one built-in call. Each parameter is read by
/// position or, failing that, by keyword.
#[derive(Debug, Clone)]
pub struct Args {
    pub positional: Vec<Value>,
    pub named: IndexMap<String, Value>,
    function: &'static str,
}

impl Args {
    pub fn new(function: &'static str, positional: Vec<Value>, named: IndexMap<String, Value>) -> Self {
        Self {
            positional,
            named,
            function,
        }
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    /// Number of arguments passed, positional and keyword.
    pub fn len(&self) -> usize {
        self.positional.len() + self.named.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parameter `index`, or the keyword argument `$name`.
    pub fn get(&self, index: usize, name: &str) -> Option<&Value> {
        self.positional
            .get(index)
            .or_else(|| self.named.get(&normalize(name)))
    }

    /// Keyword argument only.
    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.named.get(&normalize(name))
    }

    pub fn required(&self, index: usize, name: &str) -> EvalResult<&Value> {
        self.get(index, name)
            .ok_or_else(|| EvalError::WrongArgCount(format!("Missing argument ${name}.")))
    }

    pub fn number(&self, index: usize, name: &str) -> EvalResult<&SassNumber> {
        match self.required(index, name)? {
            Value::Number(n) => Ok(n),
            other => Err(self.type_error(name, other, "a number")),
        }
    }

    /// Optional numeric parameter.
    pub fn opt_number(&self, index: usize, name: &str) -> EvalResult<Option<&SassNumber>> {
        match self.get(index, name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(Some(n)),
            Some(other) => Err(self.type_error(name, other, "a number")),
        }
    }

    pub fn string(&self, index: usize, name: &str) -> EvalResult<&str> {
        match self.required(index, name)? {
            Value::Str { content, .. } => Ok(content),
            other => Err(self.type_error(name, other, "a string")),
        }
    }

    /// A color argument; unquoted color keywords are accepted.
    pub fn color(&self, index: usize, name: &str) -> EvalResult<Color> {
        match self.required(index, name)? {
            Value::Color(c) => Ok(c.clone()),
            Value::Str {
                content,
                quoted: false,
            } => Color::from_name(content)
                .or_else(|| Color::from_hex(content))
                .ok_or_else(|| self.type_error(name, &Value::unquoted(content.clone()), "a color")),
            other => Err(self.type_error(name, other, "a color")),
        }
    }

    /// A map argument; the empty list counts as an empty map.
    pub fn map(&self, index: usize, name: &str) -> EvalResult<SassMap> {
        match self.required(index, name)? {
            Value::Map(m) => Ok(m.clone()),
            Value::List(list) if list.items.is_empty() => Ok(SassMap::new()),
            other => Err(self.type_error(name, other, "a map")),
        }
    }

    /// A whole number.
    pub fn int(&self, index: usize, name: &str) -> EvalResult<i64> {
        let number = self.number(index, name)?;
        number.as_integer().ok_or_else(|| {
            EvalError::InvalidArgument(format!(
                "${name}: {} is not an int.",
                ValueFormatter::inspect(&Value::Number(number.clone()))
            ))
        })
    }

    /// Positional arguments from `from` on.
    pub fn rest(&self, from: usize) -> Vec<Value> {
        self.positional.iter().skip(from).cloned().collect()
    }

    /// Fail when more than `max` arguments were passed.
    pub fn check_max(&self, max: usize) -> EvalResult<()> {
        if self.len() > max {
            return Err(EvalError::WrongArgCount(format!(
                "Only {max} argument{} allowed, but {} were passed to {}().",
                if max == 1 { "" } else { "s" },
                self.len(),
                self.function
            )));
        }
        Ok(())
    }

    fn type_error(&self, name: &str, value: &Value, expected: &str) -> EvalError {
        EvalError::TypeMismatch(format!(
            "${name}: {} is not {expected}.",
            ValueFormatter::inspect(value)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(positional: Vec<Value>, named: &[(&str, Value)]) -> Args {
        let named = named
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Args::new("test", positional, named)
    }

    #[test]
    fn test_positional_then_keyword() {
        let a = args(vec![Value::number(1.0)], &[("amount", Value::number(2.0))]);
        assert_eq!(a.number(0, "x").unwrap().value, 1.0);
        assert_eq!(a.number(1, "amount").unwrap().value, 2.0);
    }

    #[test]
    fn test_missing_and_mistyped() {
        let a = args(vec![Value::quoted("s")], &[]);
        assert!(matches!(a.number(0, "n"), Err(EvalError::TypeMismatch(_))));
        assert!(matches!(a.required(1, "m"), Err(EvalError::WrongArgCount(_))));
    }

    #[test]
    fn test_named_color_accepted() {
        let a = args(vec![Value::unquoted("red")], &[]);
        assert_eq!(a.color(0, "color").unwrap().red, 255.0);
    }

    #[test]
    fn test_empty_list_is_empty_map() {
        let a = args(vec![Value::empty_list()], &[]);
        assert!(a.map(0, "map").unwrap().is_empty());
    }

    #[test]
    fn test_check_max() {
        let a = args(vec![Value::Null, Value::Null], &[]);
        assert!(a.check_max(2).is_ok());
        assert!(a.check_max(1).is_err());
    }
}
