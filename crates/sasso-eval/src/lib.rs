//! Sasso evaluation engine.
//!
//! Walks the SCSS AST produced by `sasso-parser` and renders CSS. The
//! [`Evaluator`] owns every piece of compile state: the variable
//! environment, the module registry, the mixin expansion cache and the
//! extend registry. Nothing is shared between evaluators.
//!
//! ```text
//! source ─► parse ─► compile rules ─► apply @extend ─► serialize ─► CSS
//! ```

pub mod css;
pub mod engine;
pub mod env;
pub mod error;
pub mod extend;
pub mod format;
pub mod functions;
pub mod modules;
pub mod operation;
pub mod selector;
pub mod units;
pub mod value;

mod calc;
mod expression;
mod flow;
mod interpolation;
mod mixin;
mod rule;

pub use css::Mapping;
pub use engine::{
    CompiledCss, CustomFunction, EngineConfig, Evaluator, DEFAULT_MIXIN_CACHE_CAPACITY,
    MAX_CALL_DEPTH, MAX_WHILE_ITERATIONS,
};
pub use error::{EvalError, EvalResult};
pub use modules::{LoadError, LoadedModule, Loader, MemoryLoader};
pub use value::Value;
