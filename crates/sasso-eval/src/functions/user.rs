//! User-defined `@function` calls and the parameter binding shared with
//! mixins.

use super::arglist;
use crate::engine::{Evaluator, MAX_CALL_DEPTH};
use crate::env::normalize;
use crate::error::{EvalError, EvalResult};
use crate::flow::Flow;
use crate::modules::UserCallable;
use crate::value::Value;
use indexmap::IndexMap;
use sasso_types::ast::{Callable, Stmt};
use std::rc::Rc;
use tracing::trace;

impl Evaluator {
    /// Run a user function with evaluated arguments. The body sees its own
    /// parameters and its module's globals, never the caller's locals.
    pub(crate) fn call_user_function(
        &mut self,
        function: &Rc<UserCallable>,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
    ) -> EvalResult<Value> {
        self.enter_call()?;
        trace!(function = %function.def.name, depth = self.call_depth, "calling @function");
        let context = self.env.enter_context(&function.module);
        let file = std::mem::replace(&mut self.current_file, Rc::clone(&function.file));
        self.env.enter_scope();

        let result = self
            .bind_params(&function.def, positional, named)
            .and_then(|()| self.exec_function_body(&function.def.body));

        self.env.leave_context(context);
        self.current_file = file;
        self.leave_call();

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Err(EvalError::InvalidContext(format!(
                "Function {} finished without @return.",
                function.def.name
            ))),
        }
    }

    pub(crate) fn enter_call(&mut self) -> EvalResult<()> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepth(MAX_CALL_DEPTH));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub(crate) fn leave_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    /// Bind arguments to a callable's parameters in the innermost frame:
    /// positional first, then by keyword, then defaults. Defaults are
    /// evaluated after the earlier parameters are bound, so they may refer
    /// to them. An arbitrary parameter collects the remaining positional
    /// arguments.
    pub(crate) fn bind_params(
        &mut self,
        def: &Callable,
        positional: Vec<Value>,
        mut named: IndexMap<String, Value>,
    ) -> EvalResult<()> {
        let arbitrary = def.params.last().is_some_and(|p| p.arbitrary);
        let fixed = def.params.len() - usize::from(arbitrary);
        if !arbitrary && positional.len() > fixed {
            return Err(EvalError::WrongArgCount(format!(
                "Only {fixed} argument{} allowed, but {} {} passed.",
                if fixed == 1 { "" } else { "s" },
                positional.len(),
                if positional.len() == 1 { "was" } else { "were" },
            )));
        }

        let mut positional = positional.into_iter();
        for param in &def.params {
            let key = normalize(&param.name);
            if param.arbitrary {
                let rest: Vec<Value> = positional.by_ref().collect();
                self.env.define(&key, arglist(rest), false, false);
                continue;
            }
            let value = match positional.next() {
                Some(value) => {
                    if named.contains_key(&key) {
                        return Err(EvalError::WrongArgCount(format!(
                            "Argument ${} was passed both by position and by name.",
                            param.name
                        )));
                    }
                    value
                }
                None => match named.shift_remove(&key) {
                    Some(value) => value,
                    None => match &param.default {
                        Some(default) => self.eval_expr(default)?,
                        None => {
                            return Err(EvalError::WrongArgCount(format!(
                                "Missing argument ${}.",
                                param.name
                            )))
                        }
                    },
                },
            };
            self.env.define(&key, value, false, false);
        }

        if !arbitrary {
            if let Some(unknown) = named.keys().next() {
                return Err(EvalError::WrongArgCount(format!("No argument named ${unknown}.")));
            }
        }
        Ok(())
    }

    /// Run a function body until `@return`. Only statements that compute
    /// values are allowed.
    pub(crate) fn exec_function_body(&mut self, body: &[Stmt]) -> EvalResult<Flow> {
        for stmt in body {
            self.span = stmt.span();
            let flow = self
                .exec_function_stmt(stmt)
                .map_err(|e| e.at(&self.current_file, stmt.span()))?;
            if let Flow::Return(_) = flow {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn exec_function_stmt(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        let mut body = |ev: &mut Evaluator, stmts: &[Stmt]| ev.exec_function_body(stmts);
        match stmt {
            Stmt::Variable(decl) => self.exec_variable(decl).map(|()| Flow::Next),
            Stmt::Return(rule) => Ok(Flow::Return(self.eval_expr(&rule.value)?)),
            Stmt::If(rule) => self.exec_if(rule, &mut body),
            Stmt::Each(rule) => self.exec_each(rule, &mut body),
            Stmt::For(rule) => self.exec_for(rule, &mut body),
            Stmt::While(rule) => self.exec_while(rule, &mut body),
            Stmt::Message(rule) => self.exec_message(rule).map(|()| Flow::Next),
            Stmt::Comment(_) => Ok(Flow::Next),
            other => Err(EvalError::InvalidContext(format!(
                "{} is not allowed in a @function body.",
                other.kind_name()
            ))),
        }
    }
}
