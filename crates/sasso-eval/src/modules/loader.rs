//! Source loading for `@use`, `@forward` and `@import`.

use indexmap::IndexMap;
use std::cell::Cell;
use thiserror::Error;

/// Failure to read a stylesheet.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("Can't find stylesheet: {0}")]
    NotFound(String),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// Supplies stylesheet sources to the engine.
pub trait Loader {
    /// Read the source text stored at a canonical path.
    fn load(&self, path: &str) -> Result<String, LoadError>;

    /// Resolve a URL as written in `@use`/`@import`, relative to the file
    /// `from`, into a canonical path. `None` if no candidate exists.
    fn resolve(&self, url: &str, from: Option<&str>) -> Option<String>;
}

/// File-name candidates for a URL: the URL itself, then `.scss`/`.css`
/// variants, partials (`_name.scss`) and directory indexes.
pub fn candidates(url: &str) -> Vec<String> {
    let url = url.trim_end_matches('/');
    let (dir, stem) = match url.rfind('/') {
        Some(i) => (&url[..=i], &url[i + 1..]),
        None => ("", url),
    };
    if stem.ends_with(".scss") || stem.ends_with(".css") || stem.ends_with(".sass") {
        let mut found = vec![url.to_string()];
        if !stem.starts_with('_') {
            found.push(format!("{dir}_{stem}"));
        }
        return found;
    }
    vec![
        format!("{url}.scss"),
        format!("{dir}_{stem}.scss"),
        format!("{url}.css"),
        format!("{url}/_index.scss"),
        format!("{url}/index.scss"),
        url.to_string(),
    ]
}

/// Directory part of a path, including the trailing `/`.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..=i],
        None => "",
    }
}

/// Join `url` onto the directory of `from`, folding `./` and `../`.
pub fn join_relative(from: Option<&str>, url: &str) -> String {
    let base = from.map(parent_dir).unwrap_or("");
    let joined = if url.starts_with('/') {
        url.to_string()
    } else {
        format!("{base}{url}")
    };
    let mut parts: Vec<&str> = Vec::new();
    for part in joined.split('/') {
        match part {
            "." | "" if !parts.is_empty() => {}
            "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else {
                    parts.push(part);
                }
            }
            other => parts.push(other),
        }
    }
    let mut result = parts.join("/");
    if joined.starts_with('/') && !result.starts_with('/') {
        result.insert(0, '/');
    }
    result
}

/// An in-memory loader keyed by path, used for string compiles and tests.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    files: IndexMap<String, String>,
    loads: Cell<usize>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, builder style.
    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.add_file(path, source);
        self
    }

    pub fn add_file(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }

    /// How many times [`Loader::load`] has been called.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl Loader for MemoryLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        self.loads.set(self.loads.get() + 1);
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(path.to_string()))
    }

    fn resolve(&self, url: &str, from: Option<&str>) -> Option<String> {
        let relative = join_relative(from, url);
        candidates(&relative)
            .into_iter()
            .chain(candidates(url))
            .find(|candidate| self.files.contains_key(candidate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_partial() {
        let loader = MemoryLoader::new().with_file("_colors.scss", "$a: 1;");
        assert_eq!(loader.resolve("colors", None).as_deref(), Some("_colors.scss"));
    }

    #[test]
    fn test_resolves_relative_to_importer() {
        let loader = MemoryLoader::new().with_file("lib/_mixins.scss", "");
        assert_eq!(
            loader.resolve("mixins", Some("lib/index.scss")).as_deref(),
            Some("lib/_mixins.scss")
        );
    }

    #[test]
    fn test_resolves_directory_index() {
        let loader = MemoryLoader::new().with_file("theme/_index.scss", "");
        assert_eq!(loader.resolve("theme", None).as_deref(), Some("theme/_index.scss"));
    }

    #[test]
    fn test_join_relative_folds_dots() {
        assert_eq!(join_relative(Some("a/b/c.scss"), "../d"), "a/d");
        assert_eq!(join_relative(Some("a/c.scss"), "./e"), "a/e");
    }

    #[test]
    fn test_missing_file() {
        let loader = MemoryLoader::new();
        assert!(loader.resolve("nope", None).is_none());
        assert!(matches!(loader.load("nope.scss"), Err(LoadError::NotFound(_))));
    }
}
