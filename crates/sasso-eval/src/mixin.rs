//! `@include`, `@content` and the mixin expansion cache.

use crate::engine::Evaluator;
use crate::env::{normalize, Context};
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::functions::BuiltinModule;
use crate::modules::{is_private, Namespace, UserCallable};
use crate::rule::{Block, Parent};
use crate::value::Value;
use indexmap::IndexMap;
use sasso_types::ast::{Expr, ExprKind, Include, Stmt};
use sha2::{Digest, Sha256};
use std::rc::Rc;
use tracing::{debug, trace};

/// The block passed to a mixin, with the view it must run in.
#[derive(Debug, Clone)]
pub(crate) struct ContentBlock {
    pub(crate) body: Vec<Stmt>,
    /// Visibility at the `@include`.
    pub(crate) view: Context,
    /// Frames on the stack at the `@include`.
    pub(crate) depth: usize,
    pub(crate) file: Rc<str>,
    /// Content stack height at the `@include`.
    pub(crate) stack_len: usize,
}

/// Bounded cache of mixin expansions. The oldest entry is evicted first.
#[derive(Debug, Clone, Default)]
pub(crate) struct MixinCache {
    entries: IndexMap<String, Block>,
    capacity: usize,
    hits: usize,
    misses: usize,
}

impl MixinCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Block> {
        match self.entries.get(key) {
            Some(block) => {
                self.hits += 1;
                Some(block.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub(crate) fn insert(&mut self, key: String, block: Block) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            if let Some((evicted, _)) = self.entries.shift_remove_index(0) {
                debug!(key = %evicted, "evicted mixin expansion");
            }
        }
        self.entries.insert(key, block);
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits
    }

    pub(crate) fn misses(&self) -> usize {
        self.misses
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Evaluator {
    pub(crate) fn compile_include(&mut self, include: &Include, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let mixin = self.resolve_mixin(include)?;
        let (mut positional, named) = self.eval_args(&include.args)?;

        // A single list argument spreads over several required parameters.
        let required = mixin
            .def
            .params
            .iter()
            .filter(|p| p.default.is_none() && !p.arbitrary)
            .count();
        if required > 1 && positional.len() == 1 && named.is_empty() {
            if let Some(Value::List(list)) = positional.first() {
                positional = list.items.clone();
            }
        }

        let content = include.content.as_ref().map(|body| {
            Rc::new(ContentBlock {
                body: body.clone(),
                view: self.env.snapshot(),
                depth: self.env.frame_count(),
                file: Rc::clone(&self.current_file),
                stack_len: self.content_stack.len(),
            })
        });

        let key = (content.is_none()
            && self.mixin_cache.is_enabled()
            && cacheable(&mixin.def.body, &|namespace, name| {
                self.is_pure_call(&mixin.module, namespace, name)
            }))
        .then(|| self.cache_key(&mixin, &positional, &named, parent));
        if let Some(key) = &key {
            if let Some(block) = self.mixin_cache.get(key) {
                trace!(mixin = %mixin.def.name, "mixin cache hit");
                out.decls.extend(block.decls);
                out.nested.extend(block.nested);
                return Ok(());
            }
        }

        let block = self.expand_mixin(&mixin, positional, named, content, parent)?;
        if let Some(key) = key {
            self.mixin_cache.insert(key, block.clone());
        }
        out.decls.extend(block.decls);
        out.nested.extend(block.nested);
        Ok(())
    }

    fn resolve_mixin(&self, include: &Include) -> EvalResult<Rc<UserCallable>> {
        let undefined = || EvalError::UndefinedMixin(include.qualified_name());
        let Some(namespace) = &include.namespace else {
            return self
                .modules
                .mixin(self.env.active_module(), &include.name)
                .ok_or_else(undefined);
        };
        match self.resolve_namespace(namespace)? {
            Namespace::User(path) if !is_private(&include.name) => self
                .exported_members(&path)
                .mixins
                .get(&normalize(&include.name))
                .cloned()
                .ok_or_else(undefined),
            _ => Err(undefined()),
        }
    }

    fn expand_mixin(
        &mut self,
        mixin: &Rc<UserCallable>,
        positional: Vec<Value>,
        named: IndexMap<String, Value>,
        content: Option<Rc<ContentBlock>>,
        parent: &Parent,
    ) -> EvalResult<Block> {
        self.enter_call()?;
        trace!(mixin = %mixin.def.name, depth = self.call_depth, "expanding mixin");
        let context = self.env.enter_context(&mixin.module);
        let file = std::mem::replace(&mut self.current_file, Rc::clone(&mixin.file));
        self.env.enter_scope();
        self.content_stack.push(content);

        let mut block = Block::default();
        let result = self
            .bind_params(&mixin.def, positional, named)
            .and_then(|()| self.compile_block(&mixin.def.body, parent, &mut block));

        self.content_stack.pop();
        self.env.leave_context(context);
        self.current_file = file;
        self.leave_call();
        result.map(|()| block)
    }

    /// Whether a call made from `owner` always returns the same value for
    /// the same arguments. User and host functions may not.
    fn is_pure_call(&self, owner: &str, namespace: Option<&str>, name: &str) -> bool {
        let key = normalize(name);
        let Some(namespace) = namespace else {
            if self.custom_functions.contains_key(&key) || self.modules.function(owner, &key).is_some() {
                return false;
            }
            if let Some(handler) = self.functions.route(&key) {
                return is_pure_builtin(handler.module, handler.name);
            }
            return self
                .modules
                .star_builtins(owner)
                .iter()
                .filter(|module| module.has_function(&key))
                .all(|module| is_pure_builtin(*module, &key));
        };
        match self.modules.namespace(owner, namespace) {
            Some(Namespace::Builtin(module)) => is_pure_builtin(*module, &key),
            Some(Namespace::User(_)) => false,
            None => BuiltinModule::from_name(namespace).is_some_and(|module| is_pure_builtin(module, &key)),
        }
    }

    /// Hash of everything an expansion without a content block depends on.
    fn cache_key(
        &self,
        mixin: &UserCallable,
        positional: &[Value],
        named: &IndexMap<String, Value>,
        parent: &Parent,
    ) -> String {
        let mut hasher = Sha256::new();
        let mut field = |text: &str| {
            hasher.update(text.as_bytes());
            hasher.update(b"\0");
        };
        field(&mixin.module);
        field(&normalize(&mixin.def.name));
        for value in positional {
            field(&ValueFormatter::inspect(value));
        }
        for (name, value) in named {
            field(&format!("{name}={}", ValueFormatter::inspect(value)));
        }
        if uses_parent(&mixin.def.body) {
            field(&parent.selectors.join(","));
        }
        field(parent.media.as_deref().unwrap_or_default());
        field(&format!(
            "{}:{}:{}",
            parent.decl_context,
            parent.keyframes,
            self.env.version()
        ));
        format!("{:x}", hasher.finalize())
    }

    pub(crate) fn compile_content(&mut self, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let Some(top) = self.content_stack.last() else {
            return Err(EvalError::InvalidContext(
                "@content may only be used within a mixin.".to_string(),
            ));
        };
        let Some(block) = top.clone() else {
            return Ok(());
        };

        let suspended = self.env.suspend(block.depth, &block.view);
        let outer = self.content_stack.split_off(block.stack_len);
        let file = std::mem::replace(&mut self.current_file, Rc::clone(&block.file));
        self.env.enter_scope();

        let result = self.compile_block(&block.body, parent, out);

        self.env.exit_scope();
        self.content_stack.extend(outer);
        self.env.resume(suspended);
        self.current_file = file;
        result
    }
}

// ══════════════════════════════════════════════════════════════════════════
// Body analysis
// ══════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy)]
enum Node<'a> {
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    /// Raw text evaluated at compile time: selectors, property names,
    /// at-rule parameters, string contents.
    Text(&'a str),
}

fn is_pure_builtin(module: BuiltinModule, name: &str) -> bool {
    match module {
        BuiltinModule::Meta => matches!(name, "type-of" | "inspect"),
        _ => name != "unique-id",
    }
}

/// Whether an expansion only depends on what the cache key records.
/// `pure_call` decides for each function call by namespace and name.
fn cacheable(body: &[Stmt], pure_call: &dyn Fn(Option<&str>, &str) -> bool) -> bool {
    !any_node(body, &mut |node| match node {
        Node::Stmt(stmt) => match stmt {
            Stmt::Content(_)
            | Stmt::Extend(_)
            | Stmt::Message(_)
            | Stmt::Include(_)
            | Stmt::MixinDef(_)
            | Stmt::FunctionDef(_)
            | Stmt::Use(_)
            | Stmt::Forward(_)
            | Stmt::Import(_) => true,
            Stmt::Variable(decl) => decl.global || decl.namespace.is_some(),
            _ => false,
        },
        Node::Expr(expr) => matches!(
            &expr.kind,
            ExprKind::Call { namespace, name, .. } if !pure_call(namespace.as_deref(), name)
        ),
        // Calls inside interpolated text are not visible here.
        Node::Text(text) => text.contains("unique-id") || (text.contains("#{") && text.contains('(')),
    })
}

/// Whether the output depends on the enclosing selectors.
fn uses_parent(body: &[Stmt]) -> bool {
    any_node(body, &mut |node| match node {
        Node::Stmt(stmt) => match stmt {
            Stmt::Rule(_) | Stmt::AtRoot(_) => true,
            Stmt::AtRule(rule) => rule.body.is_some(),
            _ => false,
        },
        Node::Expr(expr) => matches!(expr.kind, ExprKind::ParentSelector),
        Node::Text(text) => text.contains('&'),
    })
}

fn any_node<F: FnMut(Node) -> bool>(body: &[Stmt], pred: &mut F) -> bool {
    body.iter().any(|stmt| any_stmt(stmt, pred))
}

fn any_stmt<F: FnMut(Node) -> bool>(stmt: &Stmt, pred: &mut F) -> bool {
    if pred(Node::Stmt(stmt)) {
        return true;
    }
    match stmt {
        Stmt::Variable(decl) => any_expr(&decl.value, pred),
        Stmt::Rule(rule) => pred(Node::Text(&rule.selector)) || any_node(&rule.body, pred),
        Stmt::Declaration(decl) => {
            pred(Node::Text(&decl.property))
                || decl.value.as_ref().is_some_and(|e| any_expr(e, pred))
                || any_node(&decl.children, pred)
        }
        Stmt::CustomProperty(prop) => pred(Node::Text(&prop.property)) || pred(Node::Text(&prop.value)),
        Stmt::MixinDef(def) | Stmt::FunctionDef(def) => any_node(&def.body, pred),
        Stmt::Include(include) => {
            include.args.iter().any(|a| any_expr(&a.value, pred))
                || include.content.as_deref().is_some_and(|c| any_node(c, pred))
        }
        Stmt::Return(rule) => any_expr(&rule.value, pred),
        Stmt::If(rule) => {
            rule.clauses
                .iter()
                .any(|c| any_expr(&c.condition, pred) || any_node(&c.body, pred))
                || rule.else_body.as_deref().is_some_and(|b| any_node(b, pred))
        }
        Stmt::Each(rule) => any_expr(&rule.iterable, pred) || any_node(&rule.body, pred),
        Stmt::For(rule) => {
            any_expr(&rule.from, pred) || any_expr(&rule.to, pred) || any_node(&rule.body, pred)
        }
        Stmt::While(rule) => any_expr(&rule.condition, pred) || any_node(&rule.body, pred),
        Stmt::Extend(rule) => pred(Node::Text(&rule.selector)),
        Stmt::AtRule(rule) => {
            pred(Node::Text(&rule.params)) || rule.body.as_deref().is_some_and(|b| any_node(b, pred))
        }
        Stmt::AtRoot(rule) => {
            rule.selector.as_deref().is_some_and(|s| pred(Node::Text(s))) || any_node(&rule.body, pred)
        }
        Stmt::Message(rule) => any_expr(&rule.value, pred),
        Stmt::Content(_) | Stmt::Use(_) | Stmt::Forward(_) | Stmt::Import(_) | Stmt::Comment(_) => false,
    }
}

fn any_expr<F: FnMut(Node) -> bool>(expr: &Expr, pred: &mut F) -> bool {
    if pred(Node::Expr(expr)) {
        return true;
    }
    match &expr.kind {
        ExprKind::String { text, .. } => pred(Node::Text(text)),
        ExprKind::List { items, .. } => items.iter().any(|e| any_expr(e, pred)),
        ExprKind::Map(entries) => entries
            .iter()
            .any(|(k, v)| any_expr(k, pred) || any_expr(v, pred)),
        ExprKind::Binary { left, right, .. } => any_expr(left, pred) || any_expr(right, pred),
        ExprKind::Unary { operand, .. } => any_expr(operand, pred),
        ExprKind::Call { args, .. } => args.iter().any(|a| any_expr(&a.value, pred)),
        ExprKind::Paren(inner) => any_expr(inner, pred),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::modules::MemoryLoader;
    use pretty_assertions::assert_eq;
    use sasso_parser::parse_stylesheet;
    use sasso_types::SourceFile;

    fn mixin_body(source: &str) -> Vec<Stmt> {
        let parsed = parse_stylesheet(&SourceFile::new("t.scss", source));
        match parsed.stylesheet.nodes.into_iter().next() {
            Some(Stmt::MixinDef(def)) => def.body,
            other => panic!("expected a mixin, got {other:?}"),
        }
    }

    fn evaluator(capacity: usize) -> Evaluator {
        let config = EngineConfig {
            mixin_cache_capacity: capacity,
            ..EngineConfig::default()
        };
        Evaluator::new(config, Rc::new(MemoryLoader::new()))
    }

    #[test]
    fn test_cache_evicts_oldest() {
        let mut cache = MixinCache::new(2);
        cache.insert("a".into(), Block::default());
        cache.insert("b".into(), Block::default());
        cache.insert("c".into(), Block::default());
        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("c").is_some());
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let mut cache = MixinCache::new(0);
        cache.insert("a".into(), Block::default());
        assert_eq!(cache.len(), 0);
        assert!(!cache.is_enabled());
    }

    fn builtins_only(_namespace: Option<&str>, name: &str) -> bool {
        name != "unique-id" && name != "next-id"
    }

    #[test]
    fn test_plain_declarations_are_cacheable() {
        let body = |source: &str| cacheable(&mixin_body(source), &builtins_only);
        assert!(body("@mixin m($a) { color: $a; margin: 0; }"));
        assert!(body("@mixin m($a) { width: percentage($a); }"));
        assert!(!body("@mixin m { @content; }"));
        assert!(!body("@mixin m { @warn \"x\"; }"));
        assert!(!body("@mixin m { $g: 1 !global; }"));
        assert!(!body("@mixin m { id: unique-id(); }"));
        assert!(!body("@mixin m { id: next-id(); }"));
        assert!(!body("@mixin m { .x-#{next-id()} { top: 0; } }"));
    }

    #[test]
    fn test_user_function_call_bypasses_cache() {
        let mut ev = evaluator(10);
        let css = ev
            .compile_string(
                "@function tag() { @return unique-id(); }\n@mixin m { id: tag(); }\n.a { @include m; }\n.b { @include m; }",
                "t.scss",
            )
            .unwrap()
            .css;
        let ids: Vec<&str> = css.lines().filter(|l| l.contains("id:")).collect();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(ev.mixin_cache_stats(), (0, 0));
    }

    #[test]
    fn test_uses_parent_detection() {
        assert!(!uses_parent(&mixin_body("@mixin m { color: red; }")));
        assert!(uses_parent(&mixin_body("@mixin m { &:hover { color: red; } }")));
        assert!(uses_parent(&mixin_body("@mixin m { @media print { color: red; } }")));
        assert!(uses_parent(&mixin_body("@mixin m { content: \"#{&}\"; }")));
    }

    #[test]
    fn test_repeated_include_hits_cache() {
        let mut ev = evaluator(10);
        let css = ev
            .compile_string(
                "@mixin pad($n) { padding: $n; }\n.a { @include pad(1px); }\n.b { @include pad(1px); }\n.c { @include pad(2px); }",
                "t.scss",
            )
            .unwrap()
            .css;
        assert_eq!(
            css,
            ".a {\n  padding: 1px;\n}\n\n.b {\n  padding: 1px;\n}\n\n.c {\n  padding: 2px;\n}"
        );
        assert_eq!(ev.mixin_cache_stats(), (1, 2));
    }

    #[test]
    fn test_cache_respects_parent_selector() {
        let mut ev = evaluator(10);
        let css = ev
            .compile_string(
                "@mixin hover { &:hover { color: red; } }\n.a { @include hover; }\n.b { @include hover; }",
                "t.scss",
            )
            .unwrap()
            .css;
        assert_eq!(
            css,
            ".a:hover {\n  color: red;\n}\n\n.b:hover {\n  color: red;\n}"
        );
        assert_eq!(ev.mixin_cache_stats(), (0, 2));
    }

    #[test]
    fn test_global_change_invalidates_cached_expansion() {
        let mut ev = evaluator(10);
        let css = ev
            .compile_string(
                "$c: red;\n@mixin m { color: $c; }\n.a { @include m; }\n$c: blue;\n.b { @include m; }",
                "t.scss",
            )
            .unwrap()
            .css;
        assert_eq!(css, ".a {\n  color: red;\n}\n\n.b {\n  color: blue;\n}");
    }

    #[test]
    fn test_content_sees_caller_scope() {
        let mut ev = evaluator(10);
        let css = ev
            .compile_string(
                "@mixin wrap($x: inner) { .w { @content; } }\n.a { $x: outer; @include wrap { v: $x; } }",
                "t.scss",
            )
            .unwrap()
            .css;
        assert_eq!(css, ".a .w {\n  v: outer;\n}");
    }

    #[test]
    fn test_list_argument_spreads_over_parameters() {
        let mut ev = evaluator(0);
        let css = ev
            .compile_string(
                "@mixin box($w, $h) { width: $w; height: $h; }\n.a { @include box((1px 2px)); }",
                "t.scss",
            )
            .unwrap()
            .css;
        assert_eq!(css, ".a {\n  width: 1px;\n  height: 2px;\n}");
    }

    #[test]
    fn test_content_outside_mixin_is_an_error() {
        let mut ev = evaluator(0);
        let err = ev.compile_string(".a { @content; }", "t.scss").unwrap_err();
        assert!(err.message.contains("within a mixin"), "{}", err.message);
    }

    #[test]
    fn test_undefined_mixin() {
        let mut ev = evaluator(0);
        let err = ev.compile_string(".a { @include nope; }", "t.scss").unwrap_err();
        assert_eq!(err.message, "Undefined mixin: nope");
    }
}
