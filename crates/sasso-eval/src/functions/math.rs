//! `sass:math`.

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::operation;
use crate::value::{SassNumber, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "div" => {
            args.check_max(2)?;
            operation::divide(args.number(0, "number1")?, args.number(1, "number2")?)
        }
        "abs" => round_like(args, f64::abs),
        "ceil" => round_like(args, f64::ceil),
        "floor" => round_like(args, f64::floor),
        "round" => round_like(args, f64::round),
        "max" => extreme(args, |candidate, best| candidate > best),
        "min" => extreme(args, |candidate, best| candidate < best),
        "clamp" => {
            args.check_max(3)?;
            let min = args.number(0, "min")?;
            let number = args.number(1, "number")?;
            let max = args.number(2, "max")?;
            let value = converted(number, min)?;
            let max_value = converted(max, min)?;
            let result = if value < min.value {
                min
            } else if value > max_value {
                max
            } else {
                number
            };
            Ok(Value::Number(result.without_slash()))
        }
        "percentage" => {
            args.check_max(1)?;
            let number = unitless(args, 0, "number")?;
            Ok(Value::with_unit(number * 100.0, "%"))
        }
        "sqrt" => {
            args.check_max(1)?;
            Ok(Value::number(unitless(args, 0, "number")?.sqrt()))
        }
        "pow" => {
            args.check_max(2)?;
            let base = unitless(args, 0, "base")?;
            let exponent = unitless(args, 1, "exponent")?;
            Ok(Value::number(base.powf(exponent)))
        }
        "log" => {
            args.check_max(2)?;
            let number = unitless(args, 0, "number")?;
            let result = match args.opt_number(1, "base")? {
                Some(base) => number.ln() / base.value.ln(),
                None => number.ln(),
            };
            Ok(Value::number(result))
        }
        "sin" => trig(args, f64::sin),
        "cos" => trig(args, f64::cos),
        "tan" => trig(args, f64::tan),
        "hypot" => {
            let numbers = args
                .positional
                .iter()
                .map(|v| match v {
                    Value::Number(n) => Ok(n.clone()),
                    other => Err(EvalError::TypeMismatch(format!(
                        "{} is not a number.",
                        ValueFormatter::inspect(other)
                    ))),
                })
                .collect::<EvalResult<Vec<_>>>()?;
            let Some(first) = numbers.first() else {
                return Err(EvalError::WrongArgCount(
                    "At least one argument must be passed.".to_string(),
                ));
            };
            let mut sum = 0.0;
            for n in &numbers {
                let v = converted(n, first)?;
                sum += v * v;
            }
            Ok(Value::Number(first.with_value(sum.sqrt()).without_slash()))
        }
        "unit" => {
            args.check_max(1)?;
            Ok(Value::quoted(args.number(0, "number")?.unit_str()))
        }
        "is-unitless" => {
            args.check_max(1)?;
            Ok(Value::Bool(args.number(0, "number")?.is_unitless()))
        }
        "compatible" => {
            args.check_max(2)?;
            let a = args.number(0, "number1")?;
            let b = args.number(1, "number2")?;
            Ok(Value::Bool(a.is_comparable_to(b)))
        }
        _ => Err(EvalError::UndefinedFunction(format!("math.{name}"))),
    }
}

fn round_like(args: &Args, f: fn(f64) -> f64) -> EvalResult<Value> {
    args.check_max(1)?;
    let number = args.number(0, "number")?;
    Ok(Value::Number(number.with_value(f(number.value))))
}

fn extreme(args: &Args, better: fn(f64, f64) -> bool) -> EvalResult<Value> {
    let mut best: Option<SassNumber> = None;
    for value in &args.positional {
        let Value::Number(n) = value else {
            return Err(EvalError::TypeMismatch(format!(
                "{} is not a number.",
                ValueFormatter::inspect(value)
            )));
        };
        best = match best {
            None => Some(n.clone()),
            Some(current) => {
                let candidate = converted(n, &current)?;
                if better(candidate, current.value) {
                    Some(n.clone())
                } else {
                    Some(current)
                }
            }
        };
    }
    best.map(|n| Value::Number(n.without_slash()))
        .ok_or_else(|| EvalError::WrongArgCount("At least one argument must be passed.".to_string()))
}

/// `n`'s value in `reference`'s unit; unitless numbers pass through.
fn converted(n: &SassNumber, reference: &SassNumber) -> EvalResult<f64> {
    match (&n.unit, &reference.unit) {
        (Some(from), Some(to)) => n.value_in(to).ok_or_else(|| EvalError::IncompatibleUnits {
            left: to.clone(),
            right: from.clone(),
        }),
        _ => Ok(n.value),
    }
}

fn unitless(args: &Args, index: usize, name: &str) -> EvalResult<f64> {
    let number = args.number(index, name)?;
    if !number.is_unitless() {
        return Err(EvalError::InvalidArgument(format!(
            "${name}: Expected {} to have no units.",
            ValueFormatter::inspect(&Value::Number(number.clone()))
        )));
    }
    Ok(number.value)
}

/// Trigonometry takes radians; angle units are converted.
fn trig(args: &Args, f: fn(f64) -> f64) -> EvalResult<Value> {
    args.check_max(1)?;
    let number = args.number(0, "number")?;
    let radians = match &number.unit {
        None => number.value,
        Some(_) => number.value_in("rad").ok_or_else(|| {
            EvalError::InvalidArgument(format!(
                "$number: Expected {} to be an angle.",
                ValueFormatter::inspect(&Value::Number(number.clone()))
            ))
        })?,
    };
    Ok(Value::number(f(radians)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn run(name: &'static str, positional: Vec<Value>) -> EvalResult<Value> {
        call(name, &Args::new(name, positional, IndexMap::new()))
    }

    fn px(n: f64) -> Value {
        Value::with_unit(n, "px")
    }

    #[test]
    fn test_div_cancels_units() {
        assert_eq!(run("div", vec![px(10.0), px(4.0)]).unwrap(), Value::number(2.5));
    }

    #[test]
    fn test_rounding_keeps_unit() {
        assert_eq!(run("round", vec![px(2.5)]).unwrap().to_css(), "3px");
        assert_eq!(run("floor", vec![px(2.7)]).unwrap().to_css(), "2px");
        assert_eq!(run("abs", vec![px(-3.0)]).unwrap().to_css(), "3px");
    }

    #[test]
    fn test_max_converts_units() {
        let result = run("max", vec![px(90.0), Value::with_unit(1.0, "in")]).unwrap();
        assert_eq!(result.to_css(), "1in");
        assert!(run("min", vec![px(1.0), Value::with_unit(1.0, "s")]).is_err());
    }

    #[test]
    fn test_clamp() {
        let result = run("clamp", vec![px(10.0), px(50.0), px(20.0)]).unwrap();
        assert_eq!(result, px(20.0));
    }

    #[test]
    fn test_percentage_requires_unitless() {
        assert_eq!(run("percentage", vec![Value::number(0.25)]).unwrap().to_css(), "25%");
        assert!(run("percentage", vec![px(1.0)]).is_err());
    }

    #[test]
    fn test_pow_sqrt_hypot() {
        assert_eq!(run("pow", vec![Value::number(2.0), Value::number(10.0)]).unwrap(), Value::number(1024.0));
        assert_eq!(run("sqrt", vec![Value::number(16.0)]).unwrap(), Value::number(4.0));
        assert_eq!(run("hypot", vec![px(3.0), px(4.0)]).unwrap(), px(5.0));
    }

    #[test]
    fn test_trig_accepts_degrees() {
        let result = run("sin", vec![Value::with_unit(90.0, "deg")]).unwrap();
        assert_eq!(result, Value::number(1.0));
    }

    #[test]
    fn test_unit_introspection() {
        assert_eq!(run("unit", vec![px(1.0)]).unwrap().to_css(), "\"px\"");
        assert_eq!(run("is-unitless", vec![Value::number(1.0)]).unwrap(), Value::Bool(true));
        assert_eq!(
            run("compatible", vec![px(1.0), Value::with_unit(1.0, "cm")]).unwrap(),
            Value::Bool(true)
        );
    }
}
