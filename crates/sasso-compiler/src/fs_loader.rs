//! Filesystem-backed stylesheet loader.

use sasso_eval::modules::{candidates, join_relative};
use sasso_eval::{LoadError, Loader};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Resolves URLs against the importing file first, then each load path in
/// order. Paths use `/` separators.
#[derive(Debug, Clone, Default)]
pub struct FsLoader {
    load_paths: Vec<PathBuf>,
}

impl FsLoader {
    pub fn new(load_paths: Vec<PathBuf>) -> Self {
        Self { load_paths }
    }

    pub fn load_paths(&self) -> &[PathBuf] {
        &self.load_paths
    }
}

fn to_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl Loader for FsLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        std::fs::read_to_string(path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.to_string()),
            _ => LoadError::Io {
                path: path.to_string(),
                message: err.to_string(),
            },
        })
    }

    fn resolve(&self, url: &str, from: Option<&str>) -> Option<String> {
        let relative = candidates(&join_relative(from, url));
        let from_load_paths = self.load_paths.iter().flat_map(|dir| {
            candidates(url)
                .into_iter()
                .map(move |candidate| to_slashes(&dir.join(candidate)))
        });
        let found = relative
            .into_iter()
            .chain(from_load_paths)
            .find(|candidate| Path::new(candidate).is_file());
        trace!(url, ?found, "resolved stylesheet");
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sasso-fs-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_resolves_partial_in_load_path() {
        let dir = scratch("partial");
        fs::write(dir.join("_colors.scss"), "$c: red;").unwrap();
        let loader = FsLoader::new(vec![dir.clone()]);
        let path = loader.resolve("colors", None).unwrap();
        assert!(path.ends_with("/_colors.scss"), "{path}");
        assert_eq!(loader.load(&path).unwrap(), "$c: red;");
    }

    #[test]
    fn test_relative_to_importer_wins() {
        let dir = scratch("relative");
        fs::create_dir_all(dir.join("lib")).unwrap();
        fs::write(dir.join("lib/_a.scss"), "").unwrap();
        let importer = to_slashes(&dir.join("lib/main.scss"));
        let loader = FsLoader::default();
        let path = loader.resolve("a", Some(&importer)).unwrap();
        assert!(path.ends_with("lib/_a.scss"), "{path}");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let loader = FsLoader::default();
        assert!(loader.resolve("definitely-missing", None).is_none());
        assert!(matches!(
            loader.load("definitely-missing.scss"),
            Err(LoadError::NotFound(_))
        ));
    }
}
