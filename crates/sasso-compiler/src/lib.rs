//! Sasso compiler: the host-facing API.
//!
//! ```text
//! SCSS source → Parser → Evaluator → expanded CSS ─┬─► CSS
//!                                                  ├─► compressed CSS (optimize)
//!                                                  └─► Source Map v3 (source_map)
//! ```
//!
//! [`compile_string`] and [`compile_file`] cover one-shot use. A
//! [`Compiler`] keeps registered host functions across compilations.

pub mod fs_loader;
pub mod optimize;
pub mod options;
pub mod source_map;

pub use fs_loader::FsLoader;
pub use options::{OutputStyle, Options};
pub use source_map::{SourceMap, SourceMapGenerator, SourceMapOptions};

use sasso_eval::{CustomFunction, Evaluator, Loader, Value};
use sasso_parser::parse_stylesheet;
use sasso_types::{CompileError, CompileErrors, ErrorCode, SourceFile};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// A successful compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileOutput {
    pub css: String,
    /// Source Map v3 JSON, when requested.
    pub source_map: Option<String>,
    /// `@warn` messages and unmatched `@extend` warnings.
    pub warnings: Vec<String>,
    /// `@debug` messages.
    pub debug: Vec<String>,
    /// Stylesheets loaded by `@use`, `@forward` and `@import`.
    pub loaded_files: Vec<String>,
}

/// JSON-friendly outcome of a compilation, for hosts that cross a
/// serialization boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub success: bool,
    pub css: Option<String>,
    pub source_map: Option<String>,
    pub warnings: Vec<String>,
    pub errors: CompileErrors,
    /// SHA-256 of the entry source, hex encoded.
    pub source_hash: String,
}

/// Holds options, a loader and host functions across compilations.
pub struct Compiler {
    options: Options,
    loader: Rc<dyn Loader>,
    functions: Vec<(String, CustomFunction)>,
}

impl Compiler {
    /// A compiler that loads dependencies from disk, relative to the
    /// importing file and then `options.load_paths`.
    pub fn new(options: Options) -> Self {
        let loader = Rc::new(FsLoader::new(options.load_paths.clone()));
        Self::with_loader(options, loader)
    }

    pub fn with_loader(options: Options, loader: Rc<dyn Loader>) -> Self {
        Self {
            options,
            loader,
            functions: Vec::new(),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Register a host function callable from stylesheets. It receives the
    /// evaluated positional arguments; an `Err` aborts the compilation with
    /// that message.
    pub fn add_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        let function: CustomFunction = Rc::new(function);
        self.functions.push((name.to_string(), function));
    }

    /// Compile SCSS text. The entry is named by `options.source_file`.
    #[tracing::instrument(level = "debug", skip_all, fields(file = self.options.entry_name()))]
    pub fn compile_string(&self, source: &str) -> Result<CompileOutput, CompileError> {
        let entry = self.options.entry_name().to_string();
        self.compile_named(source, &entry)
    }

    /// Read and compile a stylesheet from disk.
    #[tracing::instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompileOutput, CompileError> {
        let path = path.as_ref();
        let name = path.to_string_lossy().replace('\\', "/");
        let source = std::fs::read_to_string(path).map_err(|err| {
            CompileError::unlocated(
                &name,
                ErrorCode::MODULE_NOT_FOUND,
                format!("Failed to read {name}: {err}"),
            )
        })?;
        self.compile_named(&source, &name)
    }

    /// Like [`Compiler::compile_string`] but never fails: errors are
    /// reported inside the result.
    pub fn compile_to_result(&self, source: &str) -> CompileResult {
        let source_hash = hash_source(source);
        match self.compile_string(source) {
            Ok(output) => CompileResult {
                success: true,
                css: Some(output.css),
                source_map: output.source_map,
                warnings: output.warnings,
                errors: CompileErrors::empty(),
                source_hash,
            },
            Err(error) => {
                let mut errors = CompileErrors::empty();
                errors.push_error(error);
                CompileResult {
                    success: false,
                    css: None,
                    source_map: None,
                    warnings: Vec::new(),
                    errors,
                    source_hash,
                }
            }
        }
    }

    fn compile_named(&self, source: &str, entry: &str) -> Result<CompileOutput, CompileError> {
        let mut evaluator = Evaluator::new(self.options.engine_config(), self.loader.clone());
        for (name, function) in &self.functions {
            evaluator.add_function(name, function.clone());
        }
        let compiled = evaluator.compile_string(source, entry)?;

        let mut mappings = compiled.mappings;
        let mut css = match self.options.style {
            OutputStyle::Expanded => compiled.css,
            OutputStyle::Compressed => optimize::compress(&compiled.css, &mut mappings),
        };

        let source_map = if self.options.source_map {
            let mut map_options = SourceMapOptions::default();
            if self.options.source_map_contents {
                map_options.contents = std::iter::once(entry)
                    .chain(compiled.loaded_files.iter().map(String::as_str))
                    .filter_map(|path| {
                        evaluator
                            .source(path)
                            .map(|file| (path.to_string(), file.source.clone()))
                    })
                    .collect();
            }
            let output_file = self.options.output_file.as_deref();
            let map = SourceMapGenerator::generate(&mappings, entry, output_file, &map_options);
            if let Some(output_file) = output_file {
                let separator = match self.options.style {
                    OutputStyle::Expanded => "\n\n",
                    OutputStyle::Compressed => "\n",
                };
                css.push_str(&format!("{separator}/*# sourceMappingURL={output_file}.map */"));
            }
            Some(map.to_json())
        } else {
            None
        };

        debug!(
            bytes = css.len(),
            warnings = compiled.warnings.len(),
            loaded = compiled.loaded_files.len(),
            "compilation finished"
        );
        Ok(CompileOutput {
            css,
            source_map,
            warnings: compiled.warnings,
            debug: compiled.debug,
            loaded_files: compiled.loaded_files,
        })
    }
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("options", &self.options)
            .field(
                "functions",
                &self.functions.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Compile SCSS text with default host functions, loading dependencies
/// from disk.
pub fn compile_string(source: &str, options: &Options) -> Result<CompileOutput, CompileError> {
    Compiler::new(options.clone()).compile_string(source)
}

/// Read and compile a stylesheet from disk.
pub fn compile_file(path: impl AsRef<Path>, options: &Options) -> Result<CompileOutput, CompileError> {
    Compiler::new(options.clone()).compile_file(path)
}

/// Parse without evaluating and return every syntax error found, up to
/// the parser's limit. Cheaper than a full compile for editor diagnostics.
pub fn check_syntax(source: &str, file_name: &str) -> CompileErrors {
    let file = SourceFile::new(file_name, source);
    parse_stylesheet(&file).errors
}

/// Compile SCSS text into a [`CompileResult`].
pub fn compile_to_result(source: &str, options: &Options) -> CompileResult {
    Compiler::new(options.clone()).compile_to_result(source)
}

fn hash_source(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
