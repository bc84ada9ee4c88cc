//! `calc()`, and `min()`/`max()`/`clamp()` when they are CSS math
//! functions rather than Sass ones.

use crate::engine::Evaluator;
use crate::error::{EvalError, EvalResult};
use crate::functions::BuiltinModule;
use crate::operation::divide;
use crate::value::{SassNumber, Value};
use sasso_types::ast::{Arg, BinOp, Expr, ExprKind};

/// A calculation operand: a number, or CSS text that cannot be reduced.
#[derive(Debug, Clone)]
enum Term {
    Number(SassNumber),
    Raw(String),
}

impl Term {
    fn text(&self) -> String {
        match self {
            Term::Number(n) => Value::Number(n.clone()).to_css(),
            Term::Raw(text) => text.clone(),
        }
    }
}

/// Evaluate `calc(<expr>)`. Returns a number when every operand reduces,
/// otherwise the unquoted `calc(...)` text with the reducible parts folded.
pub(crate) fn evaluate_calc(ev: &mut Evaluator, args: &[Arg]) -> EvalResult<Value> {
    let [arg] = args else {
        let (positional, _) = ev.eval_args(args)?;
        return Ok(crate::functions::literal_call("calc", &positional));
    };
    Ok(match term(ev, &arg.value)? {
        Term::Number(n) => Value::Number(n),
        Term::Raw(text) => Value::unquoted(format!("calc({})", strip_parens(&text))),
    })
}

/// `min()`, `max()` and `clamp()`. Comparable numbers go to the Sass
/// function; anything else is kept as a CSS math function. `None` leaves
/// calls with keyword or spread arguments to the regular call path.
pub(crate) fn evaluate_min_max(
    ev: &mut Evaluator,
    name: &str,
    args: &[Arg],
) -> EvalResult<Option<Value>> {
    if args.is_empty() || args.iter().any(|a| a.name.is_some() || a.spread) {
        return Ok(None);
    }
    let terms = args
        .iter()
        .map(|a| term(ev, &a.value))
        .collect::<EvalResult<Vec<_>>>()?;
    let numbers: Vec<&SassNumber> = terms
        .iter()
        .filter_map(|t| match t {
            Term::Number(n) => Some(n),
            Term::Raw(_) => None,
        })
        .collect();
    if numbers.len() == terms.len()
        && numbers.iter().all(|n| n.is_comparable_to(numbers[0]))
    {
        let values = numbers.into_iter().map(|n| Value::Number(n.clone())).collect();
        let handler = ev
            .functions
            .in_module(BuiltinModule::Math, name)
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))?;
        return ev.call_builtin(handler, values, Default::default()).map(Some);
    }
    let rendered: Vec<String> = terms.iter().map(Term::text).collect();
    Ok(Some(Value::unquoted(format!("{name}({})", rendered.join(", ")))))
}

fn term(ev: &mut Evaluator, expr: &Expr) -> EvalResult<Term> {
    match &expr.kind {
        ExprKind::Number { value, unit } => Ok(Term::Number(SassNumber::new(*value, unit.clone()))),
        ExprKind::Binary { left, op, right }
            if matches!(op, BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div) =>
        {
            let left = term(ev, left)?;
            let right = term(ev, right)?;
            simplify(left, *op, right)
        }
        ExprKind::Paren(inner) => Ok(match term(ev, inner)? {
            Term::Raw(text) => Term::Raw(format!("({})", strip_parens(&text))),
            number => number,
        }),
        _ => Ok(match ev.eval_expr(expr)? {
            Value::Number(n) => Term::Number(n.without_slash()),
            other => Term::Raw(other.to_css()),
        }),
    }
}

fn simplify(left: Term, op: BinOp, right: Term) -> EvalResult<Term> {
    let (Term::Number(a), Term::Number(b)) = (&left, &right) else {
        return Ok(symbolic(&left, op, &right));
    };
    match op {
        BinOp::Add | BinOp::Sub => {
            let rhs = match (&a.unit, &b.unit) {
                (None, None) => Some(b.value),
                (Some(unit), Some(_)) => b.value_in(unit),
                _ => None,
            };
            Ok(match rhs {
                Some(rhs) => {
                    let value = if op == BinOp::Add { a.value + rhs } else { a.value - rhs };
                    Term::Number(a.with_value(value))
                }
                None => symbolic(&left, op, &right),
            })
        }
        BinOp::Mul => Ok(match (&a.unit, &b.unit) {
            (Some(_), Some(_)) => symbolic(&left, op, &right),
            (None, unit) | (unit, None) => {
                Term::Number(SassNumber::new(a.value * b.value, unit.clone()))
            }
        }),
        _ => {
            if b.is_unitless() || (a.unit.is_some() && a.is_comparable_to(b)) {
                match divide(a, b)? {
                    Value::Number(n) => Ok(Term::Number(n)),
                    other => Ok(Term::Raw(other.to_css())),
                }
            } else {
                Ok(symbolic(&left, op, &right))
            }
        }
    }
}

fn symbolic(left: &Term, op: BinOp, right: &Term) -> Term {
    Term::Raw(format!("{} {} {}", left.text(), op.symbol(), right.text()))
}

/// `(a + b)` as the whole body of `calc()` prints without the parentheses.
fn strip_parens(text: &str) -> &str {
    let Some(inner) = text.strip_prefix('(').and_then(|t| t.strip_suffix(')')) else {
        return text;
    };
    let mut depth = 0i32;
    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return text;
                }
            }
            _ => {}
        }
    }
    inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::modules::MemoryLoader;
    use sasso_parser::parse_expression;
    use sasso_types::Span;
    use std::rc::Rc;

    fn calc(text: &str) -> String {
        let mut ev = Evaluator::new(EngineConfig::default(), Rc::new(MemoryLoader::new()));
        let expr = parse_expression(text, "t.scss", Span::point(1, 1)).unwrap();
        evaluate_calc(&mut ev, &[Arg::positional(expr)]).unwrap().to_css()
    }

    #[test]
    fn test_compatible_terms_reduce_to_number() {
        assert_eq!(calc("1px + 2px"), "3px");
        assert_eq!(calc("1in - 48px"), "0.5in");
        assert_eq!(calc("2 * 3em"), "6em");
        assert_eq!(calc("10px / 2"), "5px");
    }

    #[test]
    fn test_mixed_units_stay_symbolic() {
        assert_eq!(calc("100% - 10px"), "calc(100% - 10px)");
        assert_eq!(calc("100% - (2px + 3px)"), "calc(100% - 5px)");
        assert_eq!(calc("(100% - 10px) / 3"), "calc((100% - 10px) / 3)");
    }

    #[test]
    fn test_min_with_incompatible_units_is_css() {
        let mut ev = Evaluator::new(EngineConfig::default(), Rc::new(MemoryLoader::new()));
        let args: Vec<Arg> = ["10px", "5vw"]
            .iter()
            .map(|t| Arg::positional(parse_expression(t, "t.scss", Span::point(1, 1)).unwrap()))
            .collect();
        let css = evaluate_min_max(&mut ev, "min", &args).unwrap().unwrap();
        assert_eq!(css.to_css(), "min(10px, 5vw)");

        let args: Vec<Arg> = ["10px", "1in"]
            .iter()
            .map(|t| Arg::positional(parse_expression(t, "t.scss", Span::point(1, 1)).unwrap()))
            .collect();
        let sass = evaluate_min_max(&mut ev, "max", &args).unwrap().unwrap();
        assert_eq!(sass.to_css(), "1in");
    }

    #[test]
    fn test_strip_parens_only_when_wrapping() {
        assert_eq!(strip_parens("(a + b)"), "a + b");
        assert_eq!(strip_parens("(a) + (b)"), "(a) + (b)");
    }
}
