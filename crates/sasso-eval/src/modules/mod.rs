//! The module system: loaders, the module registry and `@use`/`@forward`/
//! `@import` handling.

mod handler;
mod loader;

pub use handler::LoadedModule;
pub(crate) use handler::Configured;
pub use loader::{candidates, join_relative, parent_dir, Loader, LoadError, MemoryLoader};

use crate::env::{normalize, ROOT_MODULE};
use crate::functions::BuiltinModule;
use crate::value::Value;
use indexmap::IndexMap;
use sasso_types::ast::{Callable, ForwardFilter};
use std::rc::Rc;

/// A mixin or function definition together with the module it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct UserCallable {
    pub def: Callable,
    /// Key of the defining module; its globals are visible in the body.
    pub module: String,
    pub file: Rc<str>,
}

/// Members a module exposes or receives.
#[derive(Debug, Clone, Default)]
pub struct Members {
    pub variables: IndexMap<String, Value>,
    pub functions: IndexMap<String, Rc<UserCallable>>,
    pub mixins: IndexMap<String, Rc<UserCallable>>,
    pub builtins: Vec<BuiltinModule>,
}

impl Members {
    /// Copy `other`'s members into `self`, later entries winning.
    pub fn merge(&mut self, other: Members) {
        self.variables.extend(other.variables);
        self.functions.extend(other.functions);
        self.mixins.extend(other.mixins);
        for builtin in other.builtins {
            if !self.builtins.contains(&builtin) {
                self.builtins.push(builtin);
            }
        }
    }

    /// Apply an `as prefix-*` prefix, then `show`/`hide`. The listed names
    /// are the prefixed ones.
    pub fn filtered(self, prefix: Option<&str>, filter: Option<&ForwardFilter>) -> Members {
        let rename = |name: &str| match prefix {
            Some(p) => normalize(&format!("{p}{name}")),
            None => name.to_string(),
        };
        let visible = |name: &str, is_variable: bool| {
            let spelled = if is_variable {
                format!("${name}")
            } else {
                name.to_string()
            };
            let spelled = normalize(&spelled);
            let listed = |names: &[String]| names.iter().any(|n| normalize(n) == spelled);
            match filter {
                None => true,
                Some(ForwardFilter::Show(names)) => listed(names),
                Some(ForwardFilter::Hide(names)) => !listed(names),
            }
        };
        Members {
            variables: self
                .variables
                .into_iter()
                .map(|(k, v)| (rename(&k), v))
                .filter(|(k, _)| visible(k, true))
                .collect(),
            functions: self
                .functions
                .into_iter()
                .map(|(k, v)| (rename(&k), v))
                .filter(|(k, _)| visible(k, false))
                .collect(),
            mixins: self
                .mixins
                .into_iter()
                .map(|(k, v)| (rename(&k), v))
                .filter(|(k, _)| visible(k, false))
                .collect(),
            builtins: self.builtins,
        }
    }
}

/// A loaded user module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub path: String,
    pub functions: IndexMap<String, Rc<UserCallable>>,
    pub mixins: IndexMap<String, Rc<UserCallable>>,
    /// Members received through `@forward`.
    pub forwarded: Members,
}

/// What a namespace refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum Namespace {
    User(String),
    Builtin(BuiltinModule),
}

/// Registry of loaded modules and of the namespaces each module binds.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: IndexMap<String, Module>,
    /// canonical path -> namespace it was first loaded under.
    loaded: IndexMap<String, String>,
    /// (owner module, alias) -> target.
    namespaces: IndexMap<(String, String), Namespace>,
    /// Members merged into an owner's global namespace (`as *`, root `@forward`).
    star: IndexMap<String, Members>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.modules.insert(
            ROOT_MODULE.to_string(),
            Module {
                path: ROOT_MODULE.to_string(),
                ..Module::default()
            },
        );
        registry
    }

    pub fn module(&self, key: &str) -> Option<&Module> {
        self.modules.get(key)
    }

    pub fn module_mut(&mut self, key: &str) -> &mut Module {
        self.modules.entry(key.to_string()).or_insert_with(|| Module {
            path: key.to_string(),
            ..Module::default()
        })
    }

    /// Namespace a path was first loaded under.
    pub fn loaded_namespace(&self, path: &str) -> Option<&str> {
        self.loaded.get(path).map(String::as_str)
    }

    pub fn mark_loaded(&mut self, path: &str, namespace: &str) {
        self.loaded
            .entry(path.to_string())
            .or_insert_with(|| namespace.to_string());
    }

    pub fn bind(&mut self, owner: &str, alias: &str, target: Namespace) {
        self.namespaces
            .insert((owner.to_string(), alias.to_string()), target);
    }

    pub fn namespace(&self, owner: &str, alias: &str) -> Option<&Namespace> {
        self.namespaces.get(&(owner.to_string(), alias.to_string()))
    }

    pub fn star(&self, owner: &str) -> Option<&Members> {
        self.star.get(owner)
    }

    pub fn merge_star(&mut self, owner: &str, members: Members) {
        self.star.entry(owner.to_string()).or_default().merge(members);
    }

    /// A bare function name visible in `owner`: its own definitions first,
    /// then globally merged members.
    pub fn function(&self, owner: &str, name: &str) -> Option<Rc<UserCallable>> {
        let key = normalize(name);
        self.modules
            .get(owner)
            .and_then(|m| m.functions.get(&key))
            .or_else(|| self.star.get(owner).and_then(|s| s.functions.get(&key)))
            .cloned()
    }

    pub fn mixin(&self, owner: &str, name: &str) -> Option<Rc<UserCallable>> {
        let key = normalize(name);
        self.modules
            .get(owner)
            .and_then(|m| m.mixins.get(&key))
            .or_else(|| self.star.get(owner).and_then(|s| s.mixins.get(&key)))
            .cloned()
    }

    /// Built-in modules merged into `owner`'s global namespace.
    pub fn star_builtins(&self, owner: &str) -> &[BuiltinModule] {
        self.star
            .get(owner)
            .map(|s| s.builtins.as_slice())
            .unwrap_or(&[])
    }
}

/// Default namespace of a URL: its last path segment without leading `_`
/// and extension. `sass:math` becomes `math`.
pub fn default_namespace(url: &str) -> String {
    let url = url.strip_prefix("sass:").unwrap_or(url);
    let stem = url.rsplit('/').next().unwrap_or(url);
    let stem = stem.strip_prefix('_').unwrap_or(stem);
    let stem = stem.split('.').next().unwrap_or(stem);
    stem.to_string()
}

/// Whether a member is private to its module (`-name` or `_name`).
pub fn is_private(name: &str) -> bool {
    name.starts_with('-') || name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_namespace() {
        assert_eq!(default_namespace("src/_colors.scss"), "colors");
        assert_eq!(default_namespace("theme"), "theme");
        assert_eq!(default_namespace("sass:math"), "math");
    }

    #[test]
    fn test_filter_show_and_prefix() {
        let mut members = Members::default();
        members.variables.insert("limit".into(), Value::number(1.0));
        members.variables.insert("hidden".into(), Value::number(2.0));
        let filtered = members.filtered(
            Some("list-"),
            Some(&ForwardFilter::Show(vec!["$list-limit".into()])),
        );
        assert!(filtered.variables.contains_key("list-limit"));
        assert_eq!(filtered.variables.len(), 1);
    }

    #[test]
    fn test_filter_hide() {
        let mut members = Members::default();
        members.variables.insert("a".into(), Value::Null);
        members.variables.insert("b".into(), Value::Null);
        let filtered = members.filtered(None, Some(&ForwardFilter::Hide(vec!["$a".into()])));
        assert_eq!(filtered.variables.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}
