//! Control flow shared by style bodies and function bodies: `@if`,
//! `@each`, `@for`, `@while`, variable statements and messages.
//!
//! Each construct runs in one flow frame; loop variables are redefined in
//! it on every pass. The body itself is compiled by a caller-supplied
//! runner, so the same loops drive CSS output and `@function` execution.

use crate::engine::{Evaluator, MAX_WHILE_ITERATIONS};
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::value::{SassNumber, Value};
use sasso_types::ast::{
    EachRule, ForRule, IfRule, MessageLevel, MessageRule, Stmt, VariableDecl, WhileRule,
};
use tracing::debug;

/// Outcome of running a body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Flow {
    Next,
    /// An `@return` ran; stop and hand the value to the function call.
    Return(Value),
}

/// Runs the statements of a flow body.
pub(crate) type Body<'a> = dyn FnMut(&mut Evaluator, &[Stmt]) -> EvalResult<Flow> + 'a;

impl Evaluator {
    fn in_flow_scope(&mut self, run: impl FnOnce(&mut Self) -> EvalResult<Flow>) -> EvalResult<Flow> {
        self.env.enter_flow_scope();
        let result = run(self);
        self.env.exit_scope();
        result
    }

    /// `@if`/`@else if`/`@else`: the first clause whose condition is truthy.
    pub(crate) fn exec_if(&mut self, rule: &IfRule, body: &mut Body) -> EvalResult<Flow> {
        for clause in &rule.clauses {
            if self.eval_expr(&clause.condition)?.is_truthy() {
                return self.in_flow_scope(|ev| body(ev, &clause.body));
            }
        }
        match &rule.else_body {
            Some(else_body) => self.in_flow_scope(|ev| body(ev, else_body)),
            None => Ok(Flow::Next),
        }
    }

    /// `@each $a[, $b] in <expr>`. Maps iterate as `key value` pairs; with
    /// two variables each item is destructured.
    pub(crate) fn exec_each(&mut self, rule: &EachRule, body: &mut Body) -> EvalResult<Flow> {
        if rule.variables.len() > 2 {
            return Err(EvalError::TooManyLoopVariables(rule.variables.len()));
        }
        let items = self.eval_expr(&rule.iterable)?.to_items();
        self.in_flow_scope(|ev| {
            for item in items {
                match rule.variables.as_slice() {
                    [single] => ev.env.define(single, item, false, false),
                    [first, second] => {
                        let mut parts = item.to_items().into_iter();
                        let key = parts.next().unwrap_or(Value::Null);
                        let value = parts.next().unwrap_or(Value::Null);
                        ev.env.define(first, key, false, false);
                        ev.env.define(second, value, false, false);
                    }
                    _ => {}
                }
                if let Flow::Return(value) = body(ev, &rule.body)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Next)
        })
    }

    /// `@for $i from <a> through|to <b>`, counting up or down. The loop
    /// variable carries the unit of `<a>`.
    pub(crate) fn exec_for(&mut self, rule: &ForRule, body: &mut Body) -> EvalResult<Flow> {
        let from = self.loop_bound(&rule.from)?;
        let to = self.loop_bound(&rule.to)?;
        let start = whole(&from)?;
        let end = match (&from.unit, &to.unit) {
            (Some(unit), Some(_)) => {
                let converted = to.value_in(unit).ok_or_else(|| EvalError::IncompatibleUnits {
                    left: unit.clone(),
                    right: to.unit_str().to_string(),
                })?;
                whole(&SassNumber::unitless(converted))?
            }
            _ => whole(&to)?,
        };
        let step: i64 = if start <= end { 1 } else { -1 };
        debug!(variable = %rule.variable, start, end, "@for");
        self.in_flow_scope(|ev| {
            // `i` only moves toward `end`, so stepping never overflows.
            let mut i = start;
            loop {
                if i == end && !rule.inclusive {
                    break;
                }
                ev.env.define(
                    &rule.variable,
                    Value::Number(SassNumber::new(i as f64, from.unit.clone())),
                    false,
                    false,
                );
                if let Flow::Return(value) = body(ev, &rule.body)? {
                    return Ok(Flow::Return(value));
                }
                if i == end {
                    break;
                }
                i += step;
            }
            Ok(Flow::Next)
        })
    }

    fn loop_bound(&mut self, expr: &sasso_types::ast::Expr) -> EvalResult<SassNumber> {
        match self.eval_expr(expr)? {
            Value::Number(n) => Ok(n.without_slash()),
            other => Err(EvalError::TypeMismatch(format!(
                "{} is not a number.",
                ValueFormatter::inspect(&other)
            ))),
        }
    }

    /// `@while <cond>`. Fails once the body has run
    /// [`MAX_WHILE_ITERATIONS`] times and the condition is still true.
    pub(crate) fn exec_while(&mut self, rule: &WhileRule, body: &mut Body) -> EvalResult<Flow> {
        self.in_flow_scope(|ev| {
            let mut iterations = 0usize;
            while ev.eval_expr(&rule.condition)?.is_truthy() {
                if iterations >= MAX_WHILE_ITERATIONS {
                    return Err(EvalError::LoopLimit(MAX_WHILE_ITERATIONS));
                }
                iterations += 1;
                if let Flow::Return(value) = body(ev, &rule.body)? {
                    return Ok(Flow::Return(value));
                }
            }
            Ok(Flow::Next)
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Statements valid everywhere
    // ══════════════════════════════════════════════════════════════════════

    /// `$name: value [!default] [!global]` and `ns.$name: value`.
    pub(crate) fn exec_variable(&mut self, decl: &VariableDecl) -> EvalResult<()> {
        if let Some(namespace) = &decl.namespace {
            if decl.default
                && self
                    .lookup_variable(Some(namespace), &decl.name)
                    .is_ok_and(|v| !v.is_null())
            {
                return Ok(());
            }
            let value = self.eval_expr(&decl.value)?;
            return self.set_module_variable(namespace, &decl.name, value);
        }

        if decl.default {
            let existing = if decl.global {
                self.env.is_global_defined(&decl.name)
                    && self.env.lookup(&decl.name).is_some_and(|v| !v.is_null())
            } else {
                self.lookup_variable(None, &decl.name)
                    .is_ok_and(|v| !v.is_null())
            };
            if existing {
                return Ok(());
            }
        }
        let value = self.eval_expr(&decl.value)?;
        if decl.global {
            self.env.define(&decl.name, value, true, false);
        } else {
            self.env.assign(&decl.name, value);
        }
        Ok(())
    }

    /// `@error`, `@warn` and `@debug`.
    pub(crate) fn exec_message(&mut self, rule: &MessageRule) -> EvalResult<()> {
        let value = self.eval_expr(&rule.value)?;
        let text = match &value {
            Value::Str { content, .. } => content.clone(),
            other => ValueFormatter::inspect(other),
        };
        let location = format!("{}:{}", self.current_file, rule.span.start_line);
        match rule.level {
            MessageLevel::Error => Err(EvalError::User(text)),
            MessageLevel::Warn => {
                self.warn(format!("{text}\n    {location}"));
                Ok(())
            }
            MessageLevel::Debug => {
                let message = format!("{location} DEBUG: {text}");
                debug!(target: "sasso::debug", "{message}");
                self.debug_messages.push(message);
                Ok(())
            }
        }
    }
}

/// An integer loop bound.
fn whole(number: &SassNumber) -> EvalResult<i64> {
    number.as_integer().ok_or_else(|| {
        EvalError::TypeMismatch(format!(
            "{} is not an int.",
            ValueFormatter::inspect(&Value::Number(number.clone()))
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_rejects_fractions() {
        assert_eq!(whole(&SassNumber::unitless(3.0)).unwrap(), 3);
        assert!(whole(&SassNumber::unitless(1.5)).is_err());
    }
}
