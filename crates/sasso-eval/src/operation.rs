//! Binary operations on evaluated values.

use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::value::{SassNumber, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use sasso_types::ast::BinOp;

/// Text that looks like a CSS function call, e.g. `var(--gap)`.
static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[A-Za-z_][\w-]*\(.*\)$").expect("valid regex"));

/// Apply a binary operator to two evaluated operands. `and`/`or` here do
/// not short-circuit; the expression evaluator handles that.
pub fn evaluate(left: &Value, op: BinOp, right: &Value) -> EvalResult<Value> {
    match op {
        BinOp::And => Ok(if left.is_operation_truthy() {
            right.clone()
        } else {
            left.clone()
        }),
        BinOp::Or => Ok(if left.is_operation_truthy() {
            left.clone()
        } else {
            right.clone()
        }),
        BinOp::Eq => Ok(Value::Bool(left == right)),
        BinOp::NotEq => Ok(Value::Bool(left != right)),
        BinOp::Lt | BinOp::Gt | BinOp::LtEq | BinOp::GtEq => compare(left, op, right),
        BinOp::Add => add(left, right),
        BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => arithmetic(left, op, right),
    }
}

fn add(left: &Value, right: &Value) -> EvalResult<Value> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => additive(a, BinOp::Add, b),
        (Value::Str { .. }, _) | (_, Value::Str { .. }) => {
            let l = left.to_css_unquoted();
            let r = right.to_css_unquoted();
            if let (Ok(a), Ok(b)) = (l.trim().parse::<f64>(), r.trim().parse::<f64>()) {
                return Ok(Value::number(a + b));
            }
            let quoted = matches!(left, Value::Str { quoted: true, .. });
            Ok(Value::Str {
                content: format!("{l}{r}"),
                quoted,
            })
        }
        (Value::Null, other) | (other, Value::Null) if !matches!(other, Value::Number(_)) => {
            Ok(Value::unquoted(other.to_css_unquoted()))
        }
        _ => non_numeric(left, BinOp::Add, right),
    }
}

fn arithmetic(left: &Value, op: BinOp, right: &Value) -> EvalResult<Value> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return non_numeric(left, op, right);
    };
    match op {
        BinOp::Sub | BinOp::Mod => additive(a, op, b),
        BinOp::Mul => multiply(a, b),
        _ => divide(a, b),
    }
}

/// `+`, `-` and `%`: units must be equal, or one side unitless.
fn additive(a: &SassNumber, op: BinOp, b: &SassNumber) -> EvalResult<Value> {
    let unit = match (&a.unit, &b.unit) {
        (None, None) => None,
        (Some(u), None) | (None, Some(u)) => Some(u.clone()),
        (Some(x), Some(y)) if x == y => Some(x.clone()),
        (Some(x), Some(y)) => {
            return Err(EvalError::IncompatibleUnits {
                left: x.clone(),
                right: y.clone(),
            })
        }
    };
    let value = match op {
        BinOp::Add => a.value + b.value,
        BinOp::Sub => a.value - b.value,
        _ => {
            if b.value == 0.0 {
                return Err(EvalError::DivisionByZero);
            }
            a.value - b.value * (a.value / b.value).floor()
        }
    };
    Ok(Value::Number(SassNumber::new(value, unit)))
}

fn multiply(a: &SassNumber, b: &SassNumber) -> EvalResult<Value> {
    let unit = match (&a.unit, &b.unit) {
        (None, None) => None,
        (Some(u), None) | (None, Some(u)) => Some(u.clone()),
        (Some(x), Some(y)) => {
            return Err(EvalError::UndefinedOperation(format!(
                "{}{x} * {}{y} isn't a valid CSS value.",
                crate::value::format_number(a.value),
                crate::value::format_number(b.value)
            )))
        }
    };
    Ok(Value::Number(SassNumber::new(a.value * b.value, unit)))
}

/// Divide two numbers. Identical or convertible units cancel.
pub fn divide(a: &SassNumber, b: &SassNumber) -> EvalResult<Value> {
    if b.value == 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    match (&a.unit, &b.unit) {
        (None, None) => Ok(Value::number(a.value / b.value)),
        (Some(u), None) | (None, Some(u)) => Ok(Value::with_unit(a.value / b.value, u)),
        (Some(x), Some(y)) => match b.value_in(x) {
            Some(converted) => Ok(Value::number(a.value / converted)),
            None => Err(EvalError::UndefinedOperation(format!(
                "{}{x} / {}{y} isn't a valid CSS value.",
                crate::value::format_number(a.value),
                crate::value::format_number(b.value)
            ))),
        },
    }
}

fn compare(left: &Value, op: BinOp, right: &Value) -> EvalResult<Value> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(EvalError::UndefinedOperation(format!(
            "{} {op} {}",
            ValueFormatter::inspect(left),
            ValueFormatter::inspect(right)
        )));
    };
    let rhs = match (&a.unit, &b.unit) {
        (Some(x), Some(y)) => b.value_in(x).ok_or_else(|| EvalError::IncompatibleUnits {
            left: x.clone(),
            right: y.clone(),
        })?,
        _ => b.value,
    };
    let lhs = a.value;
    let result = match op {
        BinOp::Lt => lhs < rhs,
        BinOp::Gt => lhs > rhs,
        BinOp::LtEq => lhs <= rhs,
        _ => lhs >= rhs,
    };
    Ok(Value::Bool(result))
}

/// Arithmetic on something that is not a number. Function-call text such
/// as `var(--x)` becomes a literal `calc()`; anything else is an error.
fn non_numeric(left: &Value, op: BinOp, right: &Value) -> EvalResult<Value> {
    let l = left.to_css();
    let r = right.to_css();
    let is_call = |v: &Value, text: &str| {
        matches!(v, Value::Str { quoted: false, .. }) && FUNCTION_CALL.is_match(text)
    };
    let operand_ok = |v: &Value, text: &str| matches!(v, Value::Number(_)) || is_call(v, text);
    if (is_call(left, &l) || is_call(right, &r)) && operand_ok(left, &l) && operand_ok(right, &r) {
        return Ok(Value::unquoted(format!("calc({l} {op} {r})")));
    }
    Err(EvalError::UndefinedOperation(format!(
        "{} {op} {}",
        ValueFormatter::inspect(left),
        ValueFormatter::inspect(right)
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(n: f64) -> Value {
        Value::with_unit(n, "px")
    }

    #[test]
    fn test_add_same_units() {
        assert_eq!(evaluate(&px(10.0), BinOp::Add, &px(5.0)).unwrap(), px(15.0));
    }

    #[test]
    fn test_unitless_inherits_unit() {
        let result = evaluate(&px(10.0), BinOp::Add, &Value::number(5.0)).unwrap();
        assert_eq!(result.to_css(), "15px");
        let product = evaluate(&Value::number(2.0), BinOp::Mul, &px(3.0)).unwrap();
        assert_eq!(product.to_css(), "6px");
    }

    #[test]
    fn test_add_convertible_units_is_error() {
        let err = evaluate(&px(10.0), BinOp::Add, &Value::with_unit(1.0, "in")).unwrap_err();
        assert!(matches!(err, EvalError::IncompatibleUnits { .. }));
    }

    #[test]
    fn test_convertible_division_cancels() {
        let result = evaluate(&px(96.0), BinOp::Div, &Value::with_unit(1.0, "in")).unwrap();
        assert_eq!(result, Value::number(1.0));
    }

    #[test]
    fn test_division_and_modulo_by_zero() {
        assert!(matches!(
            evaluate(&px(1.0), BinOp::Div, &Value::number(0.0)),
            Err(EvalError::DivisionByZero)
        ));
        assert!(matches!(
            evaluate(&Value::number(1.0), BinOp::Mod, &Value::number(0.0)),
            Err(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn test_multiplying_two_units_is_error() {
        assert!(matches!(
            evaluate(&px(2.0), BinOp::Mul, &px(3.0)),
            Err(EvalError::UndefinedOperation(_))
        ));
    }

    #[test]
    fn test_string_concatenation_quoting() {
        let quoted = evaluate(&Value::quoted("a"), BinOp::Add, &Value::unquoted("b")).unwrap();
        assert!(matches!(quoted, Value::Str { ref content, quoted: true } if content == "ab"));
        let unquoted = evaluate(&Value::unquoted("a"), BinOp::Add, &Value::quoted("b")).unwrap();
        assert!(matches!(unquoted, Value::Str { quoted: false, .. }));
    }

    #[test]
    fn test_numeric_strings_add_numerically() {
        let result = evaluate(&Value::quoted("1"), BinOp::Add, &Value::quoted("2")).unwrap();
        assert_eq!(result, Value::number(3.0));
    }

    #[test]
    fn test_bare_word_arithmetic_is_error() {
        assert!(matches!(
            evaluate(&Value::unquoted("auto"), BinOp::Sub, &px(1.0)),
            Err(EvalError::UndefinedOperation(_))
        ));
    }

    #[test]
    fn test_function_text_becomes_calc() {
        let result = evaluate(&Value::unquoted("var(--gap)"), BinOp::Mul, &Value::number(2.0)).unwrap();
        assert_eq!(result.to_css(), "calc(var(--gap) * 2)");
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(evaluate(&px(1.0), BinOp::Lt, &px(2.0)).unwrap(), Value::Bool(true));
        assert_eq!(
            evaluate(&Value::with_unit(1.0, "in"), BinOp::Gt, &px(90.0)).unwrap(),
            Value::Bool(true)
        );
        assert!(evaluate(&px(1.0), BinOp::Lt, &Value::with_unit(1.0, "s")).is_err());
        assert_eq!(
            evaluate(&px(1.0), BinOp::Eq, &Value::with_unit(1.0, "s")).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_and_or_return_deciding_operand() {
        assert_eq!(
            evaluate(&Value::number(0.0), BinOp::Or, &Value::unquoted("x")).unwrap(),
            Value::unquoted("x")
        );
        assert_eq!(
            evaluate(&Value::number(0.0), BinOp::And, &Value::unquoted("x")).unwrap(),
            Value::number(0.0)
        );
    }

    #[test]
    fn test_sass_modulo_sign_follows_divisor() {
        let result = evaluate(&Value::number(-5.0), BinOp::Mod, &Value::number(3.0)).unwrap();
        assert_eq!(result, Value::number(1.0));
    }
}
