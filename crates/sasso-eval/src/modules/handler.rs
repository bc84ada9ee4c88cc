//! `@use`, `@forward` and `@import` handling, and namespaced member lookup.

use super::{default_namespace, is_private, Members, Namespace};
use crate::css::CssNode;
use crate::engine::Evaluator;
use crate::env::{normalize, ROOT_MODULE};
use crate::error::{EvalError, EvalResult};
use crate::functions::BuiltinModule;
use crate::rule::{Block, Parent};
use crate::value::Value;
use sasso_parser::parse_stylesheet;
use sasso_types::ast::{ConfigEntry, ForwardRule, Stmt, Stylesheet};
use sasso_types::SourceFile;
use std::rc::Rc;
use tracing::debug;

/// Result of loading a module: the CSS it produced on first load (empty
/// on later loads) and the namespace it is bound to.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    pub css: Vec<CssNode>,
    pub namespace: String,
    pub path: String,
}

/// Evaluated `with (...)` entry.
#[derive(Debug, Clone)]
pub(crate) struct Configured {
    pub(crate) name: String,
    pub(crate) value: Value,
    pub(crate) default: bool,
}

impl Evaluator {
    /// Load a module by URL and bind it under `namespace` (default: the
    /// file stem). A module is evaluated once; later loads only bind the
    /// namespace and return no CSS.
    pub fn load_module(&mut self, url: &str, namespace: Option<&str>) -> EvalResult<LoadedModule> {
        self.use_module(url, namespace, &[])
    }

    pub(crate) fn use_module(
        &mut self,
        url: &str,
        namespace: Option<&str>,
        config: &[ConfigEntry],
    ) -> EvalResult<LoadedModule> {
        let alias = namespace
            .map(str::to_string)
            .unwrap_or_else(|| default_namespace(url));
        if alias.is_empty() || alias.contains('.') {
            return Err(EvalError::InvalidModuleReference(alias));
        }
        let owner = self.env.active_module().to_string();

        if let Some(name) = url.strip_prefix("sass:") {
            let builtin = BuiltinModule::from_name(name)
                .ok_or_else(|| EvalError::ModuleNotFound(url.to_string()))?;
            if !config.is_empty() {
                return Err(EvalError::InvalidConfiguration(
                    "Built-in modules can't be configured.".to_string(),
                ));
            }
            if alias == "*" {
                self.modules.merge_star(
                    &owner,
                    Members {
                        builtins: vec![builtin],
                        ..Members::default()
                    },
                );
            } else {
                self.modules.bind(&owner, &alias, Namespace::Builtin(builtin));
            }
            return Ok(LoadedModule {
                css: Vec::new(),
                namespace: alias,
                path: url.to_string(),
            });
        }

        let config = self.evaluate_config(config)?;
        let (path, css, first_namespace) = self.load_user_module(url, &alias, config)?;
        if alias == "*" {
            let members = self.exported_members(&path);
            self.modules.merge_star(&owner, members);
        } else {
            self.modules.bind(&owner, &alias, Namespace::User(path.clone()));
        }
        Ok(LoadedModule {
            css,
            namespace: first_namespace,
            path,
        })
    }

    /// Apply `@forward`: load the module and re-export its (filtered,
    /// prefixed) members from the current module. At the root they also
    /// become globally visible.
    pub(crate) fn forward_module(&mut self, rule: &ForwardRule) -> EvalResult<Vec<CssNode>> {
        let owner = self.env.active_module().to_string();
        let (members, css) = match rule.url.strip_prefix("sass:") {
            Some(name) => {
                let builtin = BuiltinModule::from_name(name)
                    .ok_or_else(|| EvalError::ModuleNotFound(rule.url.clone()))?;
                let members = Members {
                    builtins: vec![builtin],
                    ..Members::default()
                };
                (members, Vec::new())
            }
            None => {
                let mut config = self.evaluate_config(&rule.config)?;
                for upstream in self.pending_config(&owner) {
                    config.retain(|c| !(c.default && c.name == upstream.name));
                    if !config.iter().any(|c| c.name == upstream.name) {
                        config.push(upstream);
                    }
                }
                let (path, css, _) =
                    self.load_user_module(&rule.url, &default_namespace(&rule.url), config)?;
                let members = self
                    .exported_members(&path)
                    .filtered(rule.prefix.as_deref(), rule.filter.as_ref());
                (members, css)
            }
        };
        if owner == ROOT_MODULE {
            self.modules.merge_star(ROOT_MODULE, members.clone());
        }
        self.modules.module_mut(&owner).forwarded.merge(members);
        Ok(css)
    }

    /// Inline a Sass file at the current position. Its members become
    /// visible in the current scope.
    pub(crate) fn import_file(&mut self, url: &str, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let path = self
            .loader
            .resolve(url, Some(&self.current_file))
            .ok_or_else(|| EvalError::ModuleNotFound(url.to_string()))?;
        if self.import_stack.contains(&path) {
            return Err(EvalError::InvalidModuleReference(format!(
                "This file is already being loaded: {path}"
            )));
        }
        let stylesheet = self.parse_module(&path)?;
        self.import_stack.push(path.clone());
        let file = std::mem::replace(&mut self.current_file, Rc::from(path.as_str()));
        let result = self.compile_block(&stylesheet.nodes, parent, out);
        self.current_file = file;
        self.import_stack.pop();
        result
    }

    fn load_user_module(
        &mut self,
        url: &str,
        alias: &str,
        config: Vec<Configured>,
    ) -> EvalResult<(String, Vec<CssNode>, String)> {
        let path = self
            .loader
            .resolve(url, Some(&self.current_file))
            .ok_or_else(|| EvalError::ModuleNotFound(url.to_string()))?;
        if let Some(namespace) = self.modules.loaded_namespace(&path) {
            if !config.is_empty() {
                return Err(EvalError::InvalidConfiguration(format!(
                    "{url} was already loaded, so it can't be configured using \"with\"."
                )));
            }
            debug!(path = %path, "module already loaded");
            return Ok((path.clone(), Vec::new(), namespace.to_string()));
        }
        if self.import_stack.contains(&path) {
            return Err(EvalError::InvalidModuleReference(format!(
                "Module loop: {path} is already being loaded."
            )));
        }

        let stylesheet = self.parse_module(&path)?;
        let (own, pass_through) = split_config(&stylesheet, config)?;
        self.modules.mark_loaded(&path, alias);
        self.modules.module_mut(&path);
        let css = self.run_module(&path, &stylesheet, own, pass_through)?;
        Ok((path, css, alias.to_string()))
    }

    fn parse_module(&mut self, path: &str) -> EvalResult<Stylesheet> {
        let source = self
            .loader
            .load(path)
            .map_err(|e| EvalError::ModuleNotFound(e.to_string()))?;
        debug!(path, "parsing module");
        let source_file = SourceFile::new(path, source);
        let parsed = parse_stylesheet(&source_file);
        self.sources.insert(path.to_string(), source_file);
        if let Some(error) = parsed.errors.first() {
            return Err(error.clone().into());
        }
        Ok(parsed.stylesheet)
    }

    /// Evaluate a module's top level in its own global scope. Configured
    /// values are defined first so `!default` declarations keep them.
    fn run_module(
        &mut self,
        path: &str,
        stylesheet: &Stylesheet,
        config: Vec<Configured>,
        pass_through: Vec<Configured>,
    ) -> EvalResult<Vec<CssNode>> {
        let context = self.env.enter_context(path);
        for entry in config {
            self.env.define(&entry.name, entry.value, true, false);
        }
        if !pass_through.is_empty() {
            self.forward_config.insert(path.to_string(), pass_through);
        }
        let file = std::mem::replace(&mut self.current_file, Rc::from(path));
        let selectors = std::mem::take(&mut self.selectors);
        self.import_stack.push(path.to_string());

        let result = self.compile_root(&stylesheet.nodes);

        self.import_stack.pop();
        self.selectors = selectors;
        self.current_file = file;
        self.forward_config.shift_remove(path);
        self.env.leave_context(context);
        result
    }

    fn pending_config(&self, module: &str) -> Vec<Configured> {
        self.forward_config.get(module).cloned().unwrap_or_default()
    }

    fn evaluate_config(&mut self, entries: &[ConfigEntry]) -> EvalResult<Vec<Configured>> {
        entries
            .iter()
            .map(|entry| {
                Ok(Configured {
                    name: normalize(&entry.name),
                    value: self.eval_expr(&entry.value)?,
                    default: entry.default,
                })
            })
            .collect()
    }

    /// Public members of a loaded module, including what it forwards.
    pub(crate) fn exported_members(&self, path: &str) -> Members {
        let mut members = Members::default();
        if let Some(globals) = self.env.module_globals(path) {
            members.variables = globals
                .iter()
                .filter(|(k, _)| !is_private(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
        }
        if let Some(module) = self.modules.module(path) {
            let public = |(k, v): (&String, &Rc<_>)| (!is_private(k)).then(|| (k.clone(), Rc::clone(v)));
            members.functions = module.functions.iter().filter_map(public).collect();
            members.mixins = module.mixins.iter().filter_map(public).collect();
            members.merge(module.forwarded.clone());
        }
        members
    }

    // ══════════════════════════════════════════════════════════════════════
    // Member lookup
    // ══════════════════════════════════════════════════════════════════════

    /// Resolve a namespace visible from the current module. Built-in module
    /// names resolve even without an explicit `@use`.
    pub(crate) fn resolve_namespace(&self, namespace: &str) -> EvalResult<Namespace> {
        if namespace.is_empty() || namespace.contains('.') {
            return Err(EvalError::InvalidModuleReference(namespace.to_string()));
        }
        if let Some(target) = self.modules.namespace(self.env.active_module(), namespace) {
            return Ok(target.clone());
        }
        BuiltinModule::from_name(namespace)
            .map(Namespace::Builtin)
            .ok_or_else(|| {
                EvalError::InvalidModuleReference(format!(
                    "There is no module with the namespace \"{namespace}\"."
                ))
            })
    }

    /// `$name` or `ns.$name`.
    pub(crate) fn lookup_variable(&self, namespace: Option<&str>, name: &str) -> EvalResult<Value> {
        if let Some(namespace) = namespace {
            return self.module_variable(namespace, name);
        }
        if let Some(value) = self.env.lookup(name) {
            return Ok(value.clone());
        }
        self.modules
            .star(self.env.active_module())
            .and_then(|star| star.variables.get(&normalize(name)))
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.to_string()))
    }

    fn module_variable(&self, namespace: &str, name: &str) -> EvalResult<Value> {
        let not_found = || EvalError::PropertyNotFound {
            namespace: namespace.to_string(),
            name: format!("${name}"),
        };
        match self.resolve_namespace(namespace)? {
            Namespace::Builtin(module) => module.constant(name).ok_or_else(not_found),
            Namespace::User(path) => {
                if is_private(name) {
                    return Err(not_found());
                }
                let key = normalize(name);
                self.env
                    .module_globals(&path)
                    .and_then(|g| g.get(&key))
                    .or_else(|| {
                        self.modules
                            .module(&path)
                            .and_then(|m| m.forwarded.variables.get(&key))
                    })
                    .cloned()
                    .ok_or_else(not_found)
            }
        }
    }

    /// `ns.$name: value`.
    pub(crate) fn set_module_variable(&mut self, namespace: &str, name: &str, value: Value) -> EvalResult<()> {
        let path = match self.resolve_namespace(namespace)? {
            Namespace::Builtin(_) => {
                return Err(EvalError::InvalidModuleReference(format!(
                    "Cannot modify built-in variable {namespace}.${name}."
                )))
            }
            Namespace::User(path) => path,
        };
        let key = normalize(name);
        if self
            .env
            .module_globals(&path)
            .is_some_and(|g| g.contains_key(&key))
        {
            self.env.set_module_global(&path, &key, value);
            return Ok(());
        }
        let module = self.modules.module_mut(&path);
        match module.forwarded.variables.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                self.env.touch();
                Ok(())
            }
            None => Err(EvalError::PropertyNotFound {
                namespace: namespace.to_string(),
                name: format!("${name}"),
            }),
        }
    }
}

/// Every configured name must be a top-level `!default` variable of the
/// module. Names the module does not declare are passed on to its
/// `@forward`s when it has any. Returns `(own, passed_on)`.
fn split_config(
    stylesheet: &Stylesheet,
    config: Vec<Configured>,
) -> EvalResult<(Vec<Configured>, Vec<Configured>)> {
    if config.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    let defaults: Vec<String> = stylesheet
        .nodes
        .iter()
        .filter_map(|node| match node {
            Stmt::Variable(v) if v.default && v.namespace.is_none() => Some(normalize(&v.name)),
            _ => None,
        })
        .collect();
    let forwards = stylesheet.nodes.iter().any(|n| matches!(n, Stmt::Forward(_)));
    let mut own = Vec::new();
    let mut passed_on = Vec::new();
    for entry in config {
        if defaults.contains(&entry.name) {
            own.push(entry);
        } else if forwards {
            passed_on.push(entry);
        } else {
            return Err(EvalError::InvalidConfiguration(format!(
                "${} was not declared with !default in the @used module.",
                entry.name
            )));
        }
    }
    Ok((own, passed_on))
}
