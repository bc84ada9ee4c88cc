//! Function dispatch: built-in modules, the function registry and the
//! call path shared by plain, namespaced and host-provided functions.

mod args;
mod color;
mod list;
mod map;
mod math;
mod meta;
mod selector;
mod string;
mod user;

pub use args::Args;

use crate::calc;
use crate::engine::{CustomFunction, Evaluator};
use crate::env::normalize;
use crate::error::{EvalError, EvalResult};
use crate::modules::{is_private, Namespace};
use crate::value::{ListSeparator, Value};
use indexmap::IndexMap;
use sasso_types::ast::{Arg, Expr, ExprKind};
use tracing::trace;

// ══════════════════════════════════════════════════════════════════════════════
// Built-in modules
// ══════════════════════════════════════════════════════════════════════════════

/// A `sass:*` module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinModule {
    Math,
    String,
    List,
    Map,
    Color,
    Selector,
    Meta,
}

impl BuiltinModule {
    pub const ALL: [BuiltinModule; 7] = [
        BuiltinModule::Math,
        BuiltinModule::String,
        BuiltinModule::List,
        BuiltinModule::Map,
        BuiltinModule::Color,
        BuiltinModule::Selector,
        BuiltinModule::Meta,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinModule::Math => "math",
            BuiltinModule::String => "string",
            BuiltinModule::List => "list",
            BuiltinModule::Map => "map",
            BuiltinModule::Color => "color",
            BuiltinModule::Selector => "selector",
            BuiltinModule::Meta => "meta",
        }
    }

    /// Functions reachable as `module.name(...)`.
    pub fn functions(self) -> &'static [&'static str] {
        match self {
            BuiltinModule::Math => &[
                "div", "abs", "ceil", "floor", "round", "max", "min", "clamp", "percentage", "sqrt",
                "pow", "log", "sin", "cos", "tan", "hypot", "unit", "is-unitless", "compatible",
            ],
            BuiltinModule::String => &[
                "length", "index", "insert", "slice", "to-upper-case", "to-lower-case", "quote",
                "unquote", "unique-id", "split",
            ],
            BuiltinModule::List => &[
                "length", "nth", "set-nth", "join", "append", "zip", "index", "separator",
                "is-bracketed", "slash",
            ],
            BuiltinModule::Map => &[
                "get", "merge", "remove", "keys", "values", "has-key", "deep-merge", "set",
            ],
            BuiltinModule::Color => &[
                "red", "green", "blue", "alpha", "hue", "saturation", "lightness", "mix", "adjust",
                "scale", "change", "invert", "grayscale", "complement", "ie-hex-str",
            ],
            BuiltinModule::Selector => &["nest", "append", "parse"],
            BuiltinModule::Meta => &[
                "type-of", "inspect", "variable-exists", "global-variable-exists",
                "function-exists", "mixin-exists", "content-exists", "feature-exists",
                "get-function", "get-mixin", "call", "module-variables", "module-functions",
            ],
        }
    }

    pub fn has_function(self, name: &str) -> bool {
        self.functions().contains(&name)
    }

    /// Module constants such as `math.$pi`.
    pub fn constant(self, name: &str) -> Option<Value> {
        if self != BuiltinModule::Math {
            return None;
        }
        let value = match normalize(name).as_str() {
            "pi" => std::f64::consts::PI,
            "e" => std::f64::consts::E,
            "epsilon" => f64::EPSILON,
            "max-safe-integer" => 9_007_199_254_740_991.0,
            "min-safe-integer" => -9_007_199_254_740_991.0,
            _ => return None,
        };
        Some(Value::number(value))
    }

    /// Names and values of the module's constants, for `module-variables()`.
    pub fn constants(self) -> Vec<(&'static str, Value)> {
        ["pi", "e", "epsilon", "max-safe-integer", "min-safe-integer"]
            .into_iter()
            .filter_map(|name| self.constant(name).map(|v| (name, v)))
            .collect()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// How a handler receives its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStyle {
    /// Arguments are evaluated before the call.
    Eager,
    /// The handler receives the raw argument expressions.
    Lazy,
}

/// Call style of a global function name. `if()` must not evaluate the
/// branch it does not take.
pub fn call_style(name: &str) -> CallStyle {
    match name {
        "if" => CallStyle::Lazy,
        _ => CallStyle::Eager,
    }
}

/// A registered built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handler {
    pub module: BuiltinModule,
    /// Name inside the module.
    pub name: &'static str,
}

/// Global names that route to a module function under another name.
const GLOBAL_ALIASES: &[(&str, BuiltinModule, &str)] = &[
    // math
    ("abs", BuiltinModule::Math, "abs"),
    ("ceil", BuiltinModule::Math, "ceil"),
    ("floor", BuiltinModule::Math, "floor"),
    ("round", BuiltinModule::Math, "round"),
    ("max", BuiltinModule::Math, "max"),
    ("min", BuiltinModule::Math, "min"),
    ("percentage", BuiltinModule::Math, "percentage"),
    ("unit", BuiltinModule::Math, "unit"),
    ("unitless", BuiltinModule::Math, "is-unitless"),
    ("comparable", BuiltinModule::Math, "compatible"),
    // string
    ("str-length", BuiltinModule::String, "length"),
    ("str-index", BuiltinModule::String, "index"),
    ("str-insert", BuiltinModule::String, "insert"),
    ("str-slice", BuiltinModule::String, "slice"),
    ("to-upper-case", BuiltinModule::String, "to-upper-case"),
    ("to-lower-case", BuiltinModule::String, "to-lower-case"),
    ("quote", BuiltinModule::String, "quote"),
    ("unquote", BuiltinModule::String, "unquote"),
    ("unique-id", BuiltinModule::String, "unique-id"),
    // list
    ("length", BuiltinModule::List, "length"),
    ("nth", BuiltinModule::List, "nth"),
    ("set-nth", BuiltinModule::List, "set-nth"),
    ("join", BuiltinModule::List, "join"),
    ("append", BuiltinModule::List, "append"),
    ("zip", BuiltinModule::List, "zip"),
    ("index", BuiltinModule::List, "index"),
    ("list-separator", BuiltinModule::List, "separator"),
    ("is-bracketed", BuiltinModule::List, "is-bracketed"),
    // map
    ("map-get", BuiltinModule::Map, "get"),
    ("map-merge", BuiltinModule::Map, "merge"),
    ("map-remove", BuiltinModule::Map, "remove"),
    ("map-keys", BuiltinModule::Map, "keys"),
    ("map-values", BuiltinModule::Map, "values"),
    ("map-has-key", BuiltinModule::Map, "has-key"),
    // color
    ("red", BuiltinModule::Color, "red"),
    ("green", BuiltinModule::Color, "green"),
    ("blue", BuiltinModule::Color, "blue"),
    ("alpha", BuiltinModule::Color, "alpha"),
    ("opacity", BuiltinModule::Color, "alpha"),
    ("hue", BuiltinModule::Color, "hue"),
    ("saturation", BuiltinModule::Color, "saturation"),
    ("lightness", BuiltinModule::Color, "lightness"),
    ("mix", BuiltinModule::Color, "mix"),
    ("adjust-color", BuiltinModule::Color, "adjust"),
    ("scale-color", BuiltinModule::Color, "scale"),
    ("change-color", BuiltinModule::Color, "change"),
    ("invert", BuiltinModule::Color, "invert"),
    ("grayscale", BuiltinModule::Color, "grayscale"),
    ("complement", BuiltinModule::Color, "complement"),
    ("ie-hex-str", BuiltinModule::Color, "ie-hex-str"),
    ("fade-in", BuiltinModule::Color, "opacify"),
    ("fade-out", BuiltinModule::Color, "transparentize"),
    // selector
    ("selector-nest", BuiltinModule::Selector, "nest"),
    ("selector-append", BuiltinModule::Selector, "append"),
    ("selector-parse", BuiltinModule::Selector, "parse"),
    // meta
    ("type-of", BuiltinModule::Meta, "type-of"),
    ("inspect", BuiltinModule::Meta, "inspect"),
    ("variable-exists", BuiltinModule::Meta, "variable-exists"),
    ("global-variable-exists", BuiltinModule::Meta, "global-variable-exists"),
    ("function-exists", BuiltinModule::Meta, "function-exists"),
    ("mixin-exists", BuiltinModule::Meta, "mixin-exists"),
    ("content-exists", BuiltinModule::Meta, "content-exists"),
    ("feature-exists", BuiltinModule::Meta, "feature-exists"),
    ("get-function", BuiltinModule::Meta, "get-function"),
    ("call", BuiltinModule::Meta, "call"),
];

/// Global-only color helpers that `color.*` does not expose.
const GLOBAL_ONLY: &[&str] = &[
    "rgb", "rgba", "hsl", "hsla", "lighten", "darken", "saturate", "desaturate", "adjust-hue",
    "opacify", "transparentize",
];

/// Index of built-in handlers by `module.name` and by global alias.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    handlers: IndexMap<String, Handler>,
}

impl FunctionRegistry {
    /// Registry with every built-in module and global alias.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: IndexMap::new(),
        };
        for module in BuiltinModule::ALL {
            for name in module.functions() {
                registry.register(module, name, None);
            }
        }
        for name in GLOBAL_ONLY {
            registry.register(BuiltinModule::Color, name, Some(name));
        }
        for (alias, module, name) in GLOBAL_ALIASES {
            registry.register(*module, name, Some(alias));
        }
        registry
    }

    /// Index a handler under `module.name` and, if given, a bare global
    /// alias. Later registrations win.
    pub fn register(&mut self, module: BuiltinModule, name: &'static str, alias: Option<&str>) {
        let handler = Handler { module, name };
        self.handlers
            .insert(format!("{}.{name}", module.name()), handler);
        if let Some(alias) = alias {
            self.handlers.insert(alias.to_string(), handler);
        }
    }

    /// Find a handler by full name, else by the short name after the last `.`.
    pub fn route(&self, name: &str) -> Option<Handler> {
        let name = normalize(name);
        if let Some(handler) = self.handlers.get(&name) {
            return Some(*handler);
        }
        name.rsplit_once('.')
            .and_then(|(_, short)| self.handlers.get(short))
            .copied()
    }

    /// Handler of `module.name`, without global fallback.
    pub fn in_module(&self, module: BuiltinModule, name: &str) -> Option<Handler> {
        self.handlers
            .get(&format!("{}.{}", module.name(), normalize(name)))
            .copied()
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// CSS functions whose arguments are passed through rather than evaluated
/// as Sass when they hold CSS-only syntax.
fn is_css_passthrough(args: &[Value]) -> bool {
    args.iter().any(|arg| {
        let text = arg.to_css_unquoted();
        matches!(arg, Value::Str { quoted: false, .. })
            && ["var(", "calc(", "env(", "attr("]
                .iter()
                .any(|prefix| text.contains(prefix))
    })
}

/// Invoke a host function. Host functions only take positional arguments.
fn call_custom(
    name: &str,
    custom: &CustomFunction,
    positional: &[Value],
    named: &IndexMap<String, Value>,
) -> EvalResult<Value> {
    if let Some(keyword) = named.keys().next() {
        return Err(EvalError::WrongArgCount(format!(
            "Host function {name}() doesn't accept keyword arguments, got ${keyword}."
        )));
    }
    trace!(function = %name, "calling host function");
    custom(positional).map_err(EvalError::InvalidArgument)
}

/// Render `name(arg, arg)` as a plain CSS function call.
pub fn literal_call(name: &str, args: &[Value]) -> Value {
    let rendered: Vec<String> = args.iter().map(Value::to_css).collect();
    Value::unquoted(format!("{name}({})", rendered.join(", ")))
}

// ══════════════════════════════════════════════════════════════════════════════
// Call path
// ══════════════════════════════════════════════════════════════════════════════

impl Evaluator {
    /// Evaluate a function call expression.
    pub(crate) fn eval_call(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        args: &[Arg],
    ) -> EvalResult<Value> {
        if let Some(namespace) = namespace {
            return self.eval_namespaced_call(namespace, name, args);
        }
        if name.contains('.') {
            return Err(EvalError::InvalidModuleReference(name.to_string()));
        }

        if let Some(function) = self
            .modules
            .function(self.env.active_module(), name)
        {
            let (positional, named) = self.eval_args(args)?;
            return self.call_user_function(&function, positional, named);
        }

        let key = normalize(name);
        if let Some(custom) = self.custom_functions.get(&key).cloned() {
            let (positional, named) = self.eval_args(args)?;
            return call_custom(&key, &custom, &positional, &named);
        }

        if call_style(&key) == CallStyle::Lazy {
            return self.eval_if_function(args);
        }
        match key.as_str() {
            "calc" => return calc::evaluate_calc(self, args),
            "min" | "max" | "clamp" => {
                if let Some(value) = calc::evaluate_min_max(self, &key, args)? {
                    return Ok(value);
                }
            }
            "url" => return self.eval_url(args),
            _ => {}
        }

        let (positional, named) = self.eval_args(args)?;
        self.call_global(name, positional, named)
    }

    /// Call a function by name with evaluated arguments, as `meta.call()`
    /// does. `ns.name` resolves through the module registry.
    pub(crate) fn call_by_name(
        &mut self,
        name: &str,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
    ) -> EvalResult<Value> {
        if let Some((namespace, short)) = name.split_once('.') {
            return self.call_namespaced(namespace, short, positional, named);
        }
        if let Some(function) = self.modules.function(self.env.active_module(), name) {
            return self.call_user_function(&function, positional, named);
        }
        if let Some(custom) = self.custom_functions.get(&normalize(name)).cloned() {
            return call_custom(name, &custom, &positional, &named);
        }
        self.call_global(name, positional, named)
    }

    /// Built-in functions by global name, then members of `@use ... as *`
    /// built-in modules, then a plain CSS function call.
    fn call_global(
        &mut self,
        name: &str,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
    ) -> EvalResult<Value> {
        let key = normalize(name);
        if let Some(handler) = self.functions.route(&key) {
            if is_css_passthrough(&positional) || is_css_filter(&key, &positional) {
                return Ok(literal_call(name, &positional));
            }
            return self.call_builtin(handler, positional, named);
        }
        for module in self.modules.star_builtins(self.env.active_module()).to_vec() {
            if let Some(handler) = self.functions.in_module(module, &key) {
                return self.call_builtin(handler, positional, named);
            }
        }
        if !named.is_empty() {
            return Err(EvalError::InvalidArgument(format!(
                "Plain CSS function {name}() doesn't support keyword arguments."
            )));
        }
        Ok(literal_call(name, &positional))
    }

    fn eval_namespaced_call(&mut self, namespace: &str, name: &str, args: &[Arg]) -> EvalResult<Value> {
        // An unknown namespace fails before any argument is evaluated.
        self.resolve_namespace(namespace)?;
        let (positional, named) = self.eval_args(args)?;
        self.call_namespaced(namespace, name, positional, named)
    }

    pub(crate) fn call_namespaced(
        &mut self,
        namespace: &str,
        name: &str,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
    ) -> EvalResult<Value> {
        let undefined = || EvalError::UndefinedFunction(format!("{namespace}.{name}"));
        match self.resolve_namespace(namespace)? {
            Namespace::Builtin(module) => {
                let handler = self.functions.in_module(module, name).ok_or_else(undefined)?;
                self.call_builtin(handler, positional, named)
            }
            Namespace::User(path) => {
                let key = normalize(name);
                let function = self
                    .modules
                    .module(&path)
                    .and_then(|m| {
                        m.functions
                            .get(&key)
                            .filter(|_| !is_private(name))
                            .or_else(|| m.forwarded.functions.get(&key))
                    })
                    .cloned()
                    .ok_or_else(undefined)?;
                self.call_user_function(&function, positional, named)
            }
        }
    }

    /// Invoke a built-in handler with evaluated arguments.
    pub(crate) fn call_builtin(
        &mut self,
        handler: Handler,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
    ) -> EvalResult<Value> {
        let args = Args::new(handler.name, positional, named);
        trace!(module = handler.module.name(), function = handler.name, "calling built-in");
        match handler.module {
            BuiltinModule::Math => math::call(handler.name, &args),
            BuiltinModule::String if handler.name == "unique-id" => {
                args.check_max(0)?;
                self.next_unique_id += 1;
                Ok(Value::unquoted(format!("u{:08x}", self.next_unique_id)))
            }
            BuiltinModule::String => string::call(handler.name, &args),
            BuiltinModule::List => list::call(handler.name, &args),
            BuiltinModule::Map => map::call(handler.name, &args),
            BuiltinModule::Color => color::call(handler.name, &args),
            BuiltinModule::Selector => selector::call(handler.name, &args),
            BuiltinModule::Meta => self.call_meta(handler.name, &args),
        }
    }

    /// Evaluate call-site arguments. Spread lists extend the positional
    /// arguments; spread maps become keyword arguments.
    pub(crate) fn eval_args(&mut self, args: &[Arg]) -> EvalResult<(Vec<Value>, IndexMap<String, Value>)> {
        let mut positional = Vec::new();
        let mut named = IndexMap::new();
        for arg in args {
            let value = self.eval_expr(&arg.value)?;
            if let Some(name) = &arg.name {
                named.insert(normalize(name), value);
                continue;
            }
            if !arg.spread {
                positional.push(value);
                continue;
            }
            match value {
                Value::Map(map) => {
                    for (key, value) in map.iter() {
                        named.insert(normalize(&key.to_css_unquoted()), value.clone());
                    }
                }
                Value::List(list) => positional.extend(list.items),
                other => positional.push(other),
            }
        }
        Ok((positional, named))
    }

    /// `if($condition, $if-true, $if-false)`: only the chosen branch is
    /// evaluated.
    fn eval_if_function(&mut self, args: &[Arg]) -> EvalResult<Value> {
        let (Some(condition), Some(if_true), Some(if_false)) = (
            find_arg(args, 0, "condition"),
            find_arg(args, 1, "if-true"),
            find_arg(args, 2, "if-false"),
        )
        else {
            return Err(EvalError::WrongArgCount(
                "if() requires exactly three arguments.".to_string(),
            ));
        };
        if self.eval_expr(condition)?.is_truthy() {
            self.eval_expr(if_true)
        } else {
            self.eval_expr(if_false)
        }
    }

    /// `url(...)`: quoted arguments keep their quotes; raw text passes
    /// through after interpolation.
    fn eval_url(&mut self, args: &[Arg]) -> EvalResult<Value> {
        let [arg] = args else {
            let (positional, _) = self.eval_args(args)?;
            return Ok(literal_call("url", &positional));
        };
        let inner = match &arg.value.kind {
            ExprKind::String { text, quoted: false } => self.interpolate(text)?,
            _ => self.eval_expr(&arg.value)?.to_css(),
        };
        Ok(Value::unquoted(format!("url({inner})")))
    }
}

/// A raw argument by keyword, else by position among positional arguments.
fn find_arg<'a>(args: &'a [Arg], index: usize, name: &str) -> Option<&'a Expr> {
    args.iter()
        .find(|a| a.name.as_deref().map(normalize).as_deref() == Some(name))
        .or_else(|| args.iter().filter(|a| a.name.is_none()).nth(index))
        .map(|a| &a.value)
}

/// CSS filter functions share names with Sass color functions; a numeric
/// first argument selects the CSS one.
fn is_css_filter(name: &str, args: &[Value]) -> bool {
    matches!(name, "grayscale" | "invert" | "saturate" | "opacity")
        && matches!(args, [Value::Number(_)])
}

/// Join values as a comma list, the shape of arbitrary-argument lists.
pub(crate) fn arglist(items: Vec<Value>) -> Value {
    Value::list(items, ListSeparator::Comma)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_full_and_short_names() {
        let registry = FunctionRegistry::new();
        let full = registry.route("map.get").unwrap();
        assert_eq!((full.module, full.name), (BuiltinModule::Map, "get"));
        let legacy = registry.route("map-get").unwrap();
        assert_eq!(legacy, full);
        let short = registry.route("whatever.nth").unwrap();
        assert_eq!(short.module, BuiltinModule::List);
    }

    #[test]
    fn test_if_is_lazy() {
        assert_eq!(call_style("if"), CallStyle::Lazy);
        assert_eq!(call_style("nth"), CallStyle::Eager);
    }

    #[test]
    fn test_fade_aliases_route_to_opacity_helpers() {
        let registry = FunctionRegistry::new();
        assert_eq!(registry.route("fade-out").unwrap().name, "transparentize");
        assert_eq!(registry.route("lighten").unwrap().module, BuiltinModule::Color);
    }

    #[test]
    fn test_unknown_function_does_not_route() {
        let registry = FunctionRegistry::new();
        assert!(registry.route("translate").is_none());
    }

    #[test]
    fn test_module_functions_are_namespaced() {
        let registry = FunctionRegistry::new();
        assert!(registry.in_module(BuiltinModule::Color, "adjust").is_some());
        assert!(registry.in_module(BuiltinModule::Math, "adjust").is_none());
        assert!(registry.in_module(BuiltinModule::String, "to_upper_case").is_some());
    }

    #[test]
    fn test_math_constants() {
        assert_eq!(
            BuiltinModule::Math.constant("pi"),
            Some(Value::number(std::f64::consts::PI))
        );
        assert!(BuiltinModule::Color.constant("pi").is_none());
        assert_eq!(BuiltinModule::Math.constants().len(), 5);
    }

    #[test]
    fn test_literal_call_rendering() {
        let value = literal_call("translate", &[Value::with_unit(1.0, "px"), Value::number(2.0)]);
        assert_eq!(value.to_css(), "translate(1px, 2)");
    }

    #[test]
    fn test_css_passthrough_detection() {
        assert!(is_css_passthrough(&[Value::unquoted("var(--x)")]));
        assert!(!is_css_passthrough(&[Value::quoted("var(--x)")]));
        assert!(is_css_filter("grayscale", &[Value::with_unit(50.0, "%")]));
    }
}
