//! SassScript expression evaluation.

use crate::engine::Evaluator;
use crate::error::{EvalError, EvalResult};
use crate::operation;
use crate::value::{Color, ListSeparator, SassList, SassMap, SassNumber, Value};
use sasso_types::ast::{BinOp, Expr, ExprKind, UnaryOp};

impl Evaluator {
    /// Evaluate an expression to a value.
    pub(crate) fn eval_expr(&mut self, expr: &Expr) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Number { value, unit } => {
                Ok(Value::Number(SassNumber::new(*value, unit.clone())))
            }
            ExprKind::String { text, quoted: true } => {
                let content = if text.contains("#{") {
                    self.interpolate_hash(text)?
                } else {
                    text.clone()
                };
                Ok(Value::quoted(content))
            }
            ExprKind::String { text, quoted: false } => {
                if text.contains("#{") || text.contains('$') {
                    return Ok(Value::unquoted(self.interpolate(text)?));
                }
                Ok(match Color::from_name(text) {
                    Some(color) => Value::Color(color),
                    None => Value::unquoted(text.clone()),
                })
            }
            ExprKind::Color(hex) => Color::from_hex(hex)
                .map(Value::Color)
                .ok_or_else(|| EvalError::InvalidArgument(format!("Invalid color: {hex}"))),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Variable { namespace, name } => self.eval_variable(namespace.as_deref(), name),
            ExprKind::List {
                items,
                separator,
                bracketed,
            } => {
                let items = items
                    .iter()
                    .map(|item| self.eval_expr(item))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::List(SassList {
                    items,
                    separator: *separator,
                    bracketed: *bracketed,
                }))
            }
            ExprKind::Map(entries) => {
                let mut map = SassMap::new();
                for (key, value) in entries {
                    let key = self.eval_expr(key)?;
                    let value = self.eval_expr(value)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            ExprKind::Binary { left, op, right } => self.eval_binary(left, *op, right),
            ExprKind::Unary { op, operand } => self.eval_unary(*op, operand),
            ExprKind::Call {
                namespace,
                name,
                args,
            } => self.eval_call(namespace.as_deref(), name, args),
            ExprKind::Paren(inner) => Ok(self.eval_expr(inner)?.without_slash()),
            ExprKind::ParentSelector => {
                if self.selectors.is_empty() {
                    return Ok(Value::Null);
                }
                let selectors = self
                    .selectors
                    .iter()
                    .map(|s| Value::unquoted(s.clone()))
                    .collect();
                Ok(Value::list(selectors, ListSeparator::Comma))
            }
        }
    }

    /// `$name`, or `ns.$name`. A namespaced name the module does not
    /// provide falls back to a plain lookup of `name`.
    fn eval_variable(&mut self, namespace: Option<&str>, name: &str) -> EvalResult<Value> {
        match self.lookup_variable(namespace, name) {
            Err(error @ (EvalError::PropertyNotFound { .. } | EvalError::InvalidModuleReference(_)))
                if namespace.is_some() =>
            {
                self.lookup_variable(None, name).map_err(|_| error)
            }
            result => result,
        }
    }

    fn eval_binary(&mut self, left: &Expr, op: BinOp, right: &Expr) -> EvalResult<Value> {
        match op {
            BinOp::And => {
                let lhs = self.eval_expr(left)?;
                if !lhs.is_operation_truthy() {
                    return Ok(lhs);
                }
                self.eval_expr(right)
            }
            BinOp::Or => {
                let lhs = self.eval_expr(left)?;
                if lhs.is_operation_truthy() {
                    return Ok(lhs);
                }
                self.eval_expr(right)
            }
            BinOp::Div if left.is_number_literal() && right.is_number_literal() => {
                let lhs = self.eval_expr(left)?;
                let rhs = self.eval_expr(right)?;
                let result = operation::evaluate(&lhs, op, &rhs)?;
                Ok(match (result, lhs, rhs) {
                    (Value::Number(mut quotient), Value::Number(a), Value::Number(b)) => {
                        quotient.as_slash = Some(Box::new((a, b)));
                        Value::Number(quotient)
                    }
                    (other, _, _) => other,
                })
            }
            _ => {
                let lhs = self.eval_expr(left)?.without_slash();
                let rhs = self.eval_expr(right)?.without_slash();
                operation::evaluate(&lhs, op, &rhs)
            }
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr) -> EvalResult<Value> {
        let value = self.eval_expr(operand)?;
        match (op, value) {
            (UnaryOp::Not, value) => Ok(Value::Bool(!value.is_operation_truthy())),
            (UnaryOp::Neg, Value::Number(n)) => Ok(Value::Number(n.with_value(-n.value))),
            (UnaryOp::Plus, Value::Number(n)) => Ok(Value::Number(n.without_slash())),
            (op, other) => Ok(Value::unquoted(format!("{}{}", op.symbol(), other.to_css()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{EngineConfig, Evaluator};
    use crate::modules::MemoryLoader;
    use crate::value::Value;
    use sasso_parser::parse_expression;
    use sasso_types::Span;
    use std::rc::Rc;

    fn eval(ev: &mut Evaluator, text: &str) -> Value {
        let expr = parse_expression(text, "t.scss", Span::point(1, 1)).unwrap();
        ev.eval_expr(&expr).unwrap()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(EngineConfig::default(), Rc::new(MemoryLoader::new()))
    }

    #[test]
    fn test_arithmetic_keeps_units() {
        let mut ev = evaluator();
        assert_eq!(eval(&mut ev, "2 * 3px").to_css(), "6px");
        assert_eq!(eval(&mut ev, "10px + 5").to_css(), "15px");
        assert_eq!(eval(&mut ev, "96px / 1in == 1"), Value::Bool(true));
    }

    #[test]
    fn test_literal_slash_prints_as_written() {
        let mut ev = evaluator();
        assert_eq!(eval(&mut ev, "12px/1.5").to_css(), "12px/1.5");
        assert_eq!(eval(&mut ev, "(12px/2)").to_css(), "6px");
    }

    #[test]
    fn test_and_or_return_deciding_operand() {
        let mut ev = evaluator();
        assert_eq!(eval(&mut ev, "0 or 5"), Value::number(5.0));
        assert_eq!(eval(&mut ev, "\"\" and 5"), Value::quoted(""));
        assert_eq!(eval(&mut ev, "not 0"), Value::Bool(true));
        assert_eq!(eval(&mut ev, "null or \"\" or 3"), Value::number(3.0));
    }

    #[test]
    fn test_and_short_circuits() {
        let mut ev = evaluator();
        // The right side would fail on an undefined variable.
        assert_eq!(eval(&mut ev, "false and $missing"), Value::Bool(false));
    }

    #[test]
    fn test_color_keywords_become_colors() {
        let mut ev = evaluator();
        assert!(matches!(eval(&mut ev, "red"), Value::Color(_)));
        assert_eq!(eval(&mut ev, "red").to_css(), "red");
        assert!(matches!(eval(&mut ev, "solid"), Value::Str { .. }));
    }

    #[test]
    fn test_namespaced_variable_falls_back_to_plain_lookup() {
        let mut ev = evaluator();
        ev.env.define("gap", Value::with_unit(2.0, "px"), false, false);
        assert_eq!(eval(&mut ev, "theme.$gap").to_css(), "2px");
    }
}
