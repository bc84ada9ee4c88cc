//! `sass:meta`. These functions inspect evaluator state, so they are
//! methods on [`Evaluator`] rather than free functions.

use super::Args;
use crate::engine::Evaluator;
use crate::env::normalize;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::modules::{is_private, Namespace};
use crate::value::{SassMap, Value};

/// Language features `feature-exists()` reports as supported.
const FEATURES: &[&str] = &[
    "global-variable-shadowing",
    "extend-selector-pseudoclass",
    "units-level-3",
    "at-error",
    "custom-property",
];

impl Evaluator {
    pub(crate) fn call_meta(&mut self, name: &str, args: &Args) -> EvalResult<Value> {
        match name {
            "type-of" => {
                args.check_max(1)?;
                Ok(Value::unquoted(args.required(0, "value")?.type_name()))
            }
            "inspect" => {
                args.check_max(1)?;
                Ok(Value::unquoted(ValueFormatter::inspect(args.required(0, "value")?)))
            }
            "variable-exists" => {
                args.check_max(1)?;
                let name = args.string(0, "name")?;
                Ok(Value::Bool(self.lookup_variable(None, name).is_ok()))
            }
            "global-variable-exists" => {
                args.check_max(2)?;
                let name = args.string(0, "name")?;
                let exists = match module_arg(args)? {
                    Some(module) => self.lookup_variable(Some(&module), name).is_ok(),
                    None => {
                        self.env.is_global_defined(name)
                            || self
                                .modules
                                .star(self.env.active_module())
                                .is_some_and(|s| s.variables.contains_key(&normalize(name)))
                    }
                };
                Ok(Value::Bool(exists))
            }
            "function-exists" => {
                args.check_max(2)?;
                let name = args.string(0, "name")?.to_string();
                let module = module_arg(args)?;
                Ok(Value::Bool(self.function_exists(&name, module.as_deref())?))
            }
            "mixin-exists" => {
                args.check_max(2)?;
                let name = args.string(0, "name")?.to_string();
                let module = module_arg(args)?;
                Ok(Value::Bool(self.mixin_exists(&name, module.as_deref())?))
            }
            "content-exists" => {
                args.check_max(0)?;
                match self.content_stack.last() {
                    Some(content) => Ok(Value::Bool(content.is_some())),
                    None => Err(EvalError::InvalidContext(
                        "content-exists() may only be called within a mixin.".to_string(),
                    )),
                }
            }
            "feature-exists" => {
                args.check_max(1)?;
                let feature = args.string(0, "feature")?;
                Ok(Value::Bool(FEATURES.contains(&feature)))
            }
            "get-function" => {
                args.check_max(3)?;
                let name = args.string(0, "name")?.to_string();
                let css = args.get(1, "css").is_some_and(Value::is_truthy);
                let module = module_arg_at(args, 2)?;
                if css {
                    return Ok(Value::FunctionRef(name));
                }
                if !self.function_exists(&name, module.as_deref())? {
                    return Err(EvalError::UndefinedFunction(qualified(module.as_deref(), &name)));
                }
                Ok(Value::FunctionRef(qualified(module.as_deref(), &name)))
            }
            "get-mixin" => {
                args.check_max(2)?;
                let name = args.string(0, "name")?.to_string();
                let module = module_arg(args)?;
                if !self.mixin_exists(&name, module.as_deref())? {
                    return Err(EvalError::UndefinedMixin(qualified(module.as_deref(), &name)));
                }
                Ok(Value::MixinRef(qualified(module.as_deref(), &name)))
            }
            "call" => {
                let function = match args.required(0, "function")? {
                    Value::FunctionRef(name) => name.clone(),
                    Value::Str { content, .. } => content.clone(),
                    other => {
                        return Err(EvalError::TypeMismatch(format!(
                            "$function: {} is not a function reference.",
                            ValueFormatter::inspect(other)
                        )))
                    }
                };
                let positional = args.rest(1);
                let mut named = args.named.clone();
                named.shift_remove("function");
                self.call_by_name(&function, positional, named)
            }
            "module-variables" => {
                args.check_max(1)?;
                let namespace = args.string(0, "module")?.to_string();
                let map: SassMap = match self.resolve_namespace(&namespace)? {
                    Namespace::Builtin(module) => module
                        .constants()
                        .into_iter()
                        .map(|(name, value)| (Value::quoted(name), value))
                        .collect(),
                    Namespace::User(path) => self
                        .exported_members(&path)
                        .variables
                        .into_iter()
                        .map(|(name, value)| (Value::quoted(name), value))
                        .collect(),
                };
                Ok(Value::Map(map))
            }
            "module-functions" => {
                args.check_max(1)?;
                let namespace = args.string(0, "module")?.to_string();
                let names: Vec<String> = match self.resolve_namespace(&namespace)? {
                    Namespace::Builtin(module) => {
                        module.functions().iter().map(|n| n.to_string()).collect()
                    }
                    Namespace::User(path) => {
                        self.exported_members(&path).functions.into_keys().collect()
                    }
                };
                let map: SassMap = names
                    .into_iter()
                    .map(|name| {
                        let reference = Value::FunctionRef(format!("{namespace}.{name}"));
                        (Value::quoted(name), reference)
                    })
                    .collect();
                Ok(Value::Map(map))
            }
            _ => Err(EvalError::UndefinedFunction(format!("meta.{name}"))),
        }
    }

    fn function_exists(&self, name: &str, module: Option<&str>) -> EvalResult<bool> {
        let Some(namespace) = module else {
            return Ok(self.modules.function(self.env.active_module(), name).is_some()
                || self.custom_functions.contains_key(&normalize(name))
                || self.functions.route(name).is_some_and(|_| !name.contains('.')));
        };
        Ok(match self.resolve_namespace(namespace)? {
            Namespace::Builtin(module) => module.has_function(&normalize(name)),
            Namespace::User(path) => {
                !is_private(name) && self.exported_members(&path).functions.contains_key(&normalize(name))
            }
        })
    }

    fn mixin_exists(&self, name: &str, module: Option<&str>) -> EvalResult<bool> {
        let Some(namespace) = module else {
            return Ok(self.modules.mixin(self.env.active_module(), name).is_some());
        };
        Ok(match self.resolve_namespace(namespace)? {
            Namespace::Builtin(_) => false,
            Namespace::User(path) => {
                !is_private(name) && self.exported_members(&path).mixins.contains_key(&normalize(name))
            }
        })
    }
}

/// The optional `$module` argument, second position.
fn module_arg(args: &Args) -> EvalResult<Option<String>> {
    module_arg_at(args, 1)
}

fn module_arg_at(args: &Args, index: usize) -> EvalResult<Option<String>> {
    match args.get(index, "module") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Str { content, .. }) => Ok(Some(content.clone())),
        Some(other) => Err(EvalError::TypeMismatch(format!(
            "$module: {} is not a string.",
            ValueFormatter::inspect(other)
        ))),
    }
}

fn qualified(module: Option<&str>, name: &str) -> String {
    match module {
        Some(module) => format!("{module}.{name}"),
        None => name.to_string(),
    }
}
