//! The orchestrating engine: owns all compile state and drives a compile
//! from source text to serialized CSS.

use crate::css::{serialize, CssNode, Mapping};
use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::extend::ExtendRegistry;
use crate::functions::FunctionRegistry;
use crate::mixin::{ContentBlock, MixinCache};
use crate::modules::{Configured, Loader, ModuleRegistry};
use crate::rule::{Block, Parent};
use crate::value::Value;
use indexmap::IndexMap;
use sasso_parser::parse_stylesheet;
use sasso_types::ast::Stylesheet;
use sasso_types::{CompileError, SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use tracing::{debug, warn};

/// `@while` loops fail after this many iterations.
pub const MAX_WHILE_ITERATIONS: usize = 1000;

/// Nested mixin and function calls fail beyond this depth.
pub const MAX_CALL_DEPTH: usize = 100;

pub const DEFAULT_MIXIN_CACHE_CAPACITY: usize = 1000;

/// Engine settings derived from the host's options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Record one source mapping per declaration.
    pub source_map: bool,
    /// Maximum cached mixin expansions; `0` disables the cache.
    pub mixin_cache_capacity: usize,
    /// Do not collect `@warn` output.
    pub quiet: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source_map: false,
            mixin_cache_capacity: DEFAULT_MIXIN_CACHE_CAPACITY,
            quiet: false,
        }
    }
}

/// A host-provided function: receives evaluated positional arguments.
pub type CustomFunction = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// Result of a successful compile.
#[derive(Debug, Clone, Default)]
pub struct CompiledCss {
    pub css: String,
    pub mappings: Vec<Mapping>,
    pub warnings: Vec<String>,
    pub debug: Vec<String>,
    /// Canonical paths of every stylesheet loaded through `@use`,
    /// `@forward` or `@import`.
    pub loaded_files: Vec<String>,
}

/// The tree-walking compiler. One instance holds the state of one
/// compilation at a time; [`Evaluator::compile_string`] resets it.
pub struct Evaluator {
    pub(crate) env: Environment,
    pub(crate) config: EngineConfig,
    pub(crate) loader: Rc<dyn Loader>,
    pub(crate) modules: ModuleRegistry,
    pub(crate) functions: FunctionRegistry,
    pub(crate) custom_functions: IndexMap<String, CustomFunction>,
    pub(crate) mixin_cache: MixinCache,
    pub(crate) extends: ExtendRegistry,
    pub(crate) content_stack: Vec<Option<Rc<ContentBlock>>>,
    pub(crate) call_depth: usize,
    pub(crate) current_file: Rc<str>,
    /// Span of the statement being compiled, the origin for re-parsed text.
    pub(crate) span: Span,
    pub(crate) sources: IndexMap<String, SourceFile>,
    /// Selectors of the innermost style rule, for `&` in expressions.
    pub(crate) selectors: Vec<String>,
    pub(crate) import_stack: Vec<String>,
    /// `with (...)` entries a module passes on to the modules it forwards.
    pub(crate) forward_config: IndexMap<String, Vec<Configured>>,
    pub(crate) warnings: Vec<String>,
    pub(crate) debug_messages: Vec<String>,
    pub(crate) next_unique_id: u64,
}

impl Evaluator {
    pub fn new(config: EngineConfig, loader: Rc<dyn Loader>) -> Self {
        let capacity = config.mixin_cache_capacity;
        Self {
            env: Environment::new(),
            config,
            loader,
            modules: ModuleRegistry::new(),
            functions: FunctionRegistry::new(),
            custom_functions: IndexMap::new(),
            mixin_cache: MixinCache::new(capacity),
            extends: ExtendRegistry::new(),
            content_stack: Vec::new(),
            call_depth: 0,
            current_file: Rc::from(""),
            span: Span::default(),
            sources: IndexMap::new(),
            selectors: Vec::new(),
            import_stack: Vec::new(),
            forward_config: IndexMap::new(),
            warnings: Vec::new(),
            debug_messages: Vec::new(),
            next_unique_id: 0,
        }
    }

    /// Register a host function, callable from stylesheets by `name`.
    /// User-defined `@function`s with the same name take priority.
    pub fn add_function(&mut self, name: &str, function: CustomFunction) {
        self.custom_functions
            .insert(crate::env::normalize(name), function);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    /// `@warn` messages and unmatched-extend warnings of the last compile.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// `@debug` messages of the last compile.
    pub fn debug_messages(&self) -> &[String] {
        &self.debug_messages
    }

    /// `(hits, misses)` of the mixin expansion cache.
    pub fn mixin_cache_stats(&self) -> (usize, usize) {
        (self.mixin_cache.hits(), self.mixin_cache.misses())
    }

    pub fn extends(&self) -> &ExtendRegistry {
        &self.extends
    }

    /// Clear all per-compile state. Host functions and the loader are kept.
    pub fn reset(&mut self) {
        self.env = Environment::new();
        self.modules = ModuleRegistry::new();
        self.mixin_cache = MixinCache::new(self.config.mixin_cache_capacity);
        self.extends = ExtendRegistry::new();
        self.content_stack.clear();
        self.call_depth = 0;
        self.span = Span::default();
        self.sources.clear();
        self.selectors.clear();
        self.import_stack.clear();
        self.forward_config.clear();
        self.warnings.clear();
        self.debug_messages.clear();
        self.next_unique_id = 0;
    }

    /// Compile SCSS source text. `file_name` names the source in errors,
    /// source maps and relative `@use` resolution.
    #[tracing::instrument(level = "debug", skip_all, fields(file = file_name))]
    pub fn compile_string(&mut self, source: &str, file_name: &str) -> Result<CompiledCss, CompileError> {
        self.reset();
        let source_file = SourceFile::new(file_name, source);
        let parsed = parse_stylesheet(&source_file);
        if let Some(error) = parsed.errors.first() {
            return Err(error.clone());
        }
        self.sources.insert(file_name.to_string(), source_file);
        self.current_file = Rc::from(file_name);

        self.compile_stylesheet(&parsed.stylesheet)
            .map_err(|e| self.to_compile_error(e))
    }

    fn compile_stylesheet(&mut self, stylesheet: &Stylesheet) -> EvalResult<CompiledCss> {
        let mut nodes = self.compile_root(&stylesheet.nodes)?;

        let unmatched = self.extends.apply_to_tree(&mut nodes);
        for extension in unmatched {
            self.warn(format!(
                "The target selector was not found.\nUse \"@extend {} !optional\" to avoid this error.\n  {}:{}",
                extension.target, extension.file, extension.span.start_line
            ));
        }

        let (css, mappings) = serialize(&nodes, self.config.source_map);
        debug!(bytes = css.len(), mappings = mappings.len(), "compiled stylesheet");
        Ok(CompiledCss {
            css,
            mappings,
            warnings: self.warnings.clone(),
            debug: self.debug_messages.clone(),
            loaded_files: self.sources.keys().skip(1).cloned().collect(),
        })
    }

    /// Compile top-level statements of the current module into CSS nodes.
    pub(crate) fn compile_root(&mut self, nodes: &[sasso_types::ast::Stmt]) -> EvalResult<Vec<CssNode>> {
        let mut block = Block::default();
        self.compile_block(nodes, &Parent::root(), &mut block)?;
        Ok(block.into_nodes())
    }

    /// Record a warning unless warnings are suppressed.
    pub(crate) fn warn(&mut self, message: String) {
        warn!(message = %message, "sass warning");
        if !self.config.quiet {
            self.warnings.push(message);
        }
    }

    /// Convert an engine error into the user-facing error, filling in the
    /// source line from the loaded sources.
    pub(crate) fn to_compile_error(&self, error: EvalError) -> CompileError {
        let sources = &self.sources;
        error.into_compile_error(&self.current_file, |file, line| {
            sources
                .get(file)
                .and_then(|sf| sf.line(line))
                .map(|l| l.to_string())
        })
    }

    /// Source text of a loaded file, if any.
    pub fn source(&self, path: &str) -> Option<&SourceFile> {
        self.sources.get(path)
    }
}

impl std::fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Evaluator")
            .field("config", &self.config)
            .field("current_file", &self.current_file)
            .field("call_depth", &self.call_depth)
            .finish_non_exhaustive()
    }
}
