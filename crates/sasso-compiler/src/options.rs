//! Compile options accepted by the host API.

use sasso_eval::{EngineConfig, DEFAULT_MIXIN_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CSS output style.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStyle {
    /// One declaration per line, two-space indentation.
    #[default]
    Expanded,
    /// No insignificant whitespace, no silent comments.
    Compressed,
}

/// Options for a single compilation.
///
/// Deserializes from a partial JSON object; missing fields take their
/// defaults:
///
/// ```json
/// { "style": "compressed", "source_map": true, "load_paths": ["styles"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub style: OutputStyle,
    /// Produce a Source Map v3 alongside the CSS.
    pub source_map: bool,
    /// Name of the entry stylesheet, used in errors and as the map source.
    pub source_file: Option<String>,
    /// Name of the generated CSS file. When set together with
    /// `source_map`, a `sourceMappingURL` comment is appended.
    pub output_file: Option<String>,
    /// Extra directories searched by `@use`, `@forward` and `@import`.
    pub load_paths: Vec<PathBuf>,
    /// Embed source text in the map's `sourcesContent`.
    pub source_map_contents: bool,
    pub mixin_cache_capacity: usize,
    /// Do not collect `@warn` output.
    pub quiet: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            style: OutputStyle::Expanded,
            source_map: false,
            source_file: None,
            output_file: None,
            load_paths: Vec::new(),
            source_map_contents: false,
            mixin_cache_capacity: DEFAULT_MIXIN_CACHE_CAPACITY,
            quiet: false,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    pub fn compressed(self) -> Self {
        self.style(OutputStyle::Compressed)
    }

    pub fn source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn source_file(mut self, name: impl Into<String>) -> Self {
        self.source_file = Some(name.into());
        self
    }

    pub fn output_file(mut self, name: impl Into<String>) -> Self {
        self.output_file = Some(name.into());
        self
    }

    pub fn load_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.load_paths.push(path.into());
        self
    }

    pub fn source_map_contents(mut self, enabled: bool) -> Self {
        self.source_map_contents = enabled;
        self
    }

    pub fn mixin_cache_capacity(mut self, capacity: usize) -> Self {
        self.mixin_cache_capacity = capacity;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Name used for the entry stylesheet when none is configured.
    pub fn entry_name(&self) -> &str {
        self.source_file.as_deref().unwrap_or("stdin")
    }

    /// The subset of options the engine consumes.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            source_map: self.source_map,
            mixin_cache_capacity: self.mixin_cache_capacity,
            quiet: self.quiet,
        }
    }
}
