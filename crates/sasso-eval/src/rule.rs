//! Statement compilation: style rules, declarations, at-rules and the
//! per-statement dispatch.
//!
//! A block compiles into a [`Block`]: declarations that belong to the
//! enclosing rule, and nested rules and at-rules that are emitted after it.
//! Nested style rules are flattened this way; `@media`, `@supports` and
//! `@container` inside a rule bubble up with the rule's selectors wrapped
//! inside.

use crate::css::{CssAtRule, CssDeclaration, CssNode, CssRule, Origin};
use crate::engine::Evaluator;
use crate::env::normalize;
use crate::error::{EvalError, EvalResult};
use crate::flow::Flow;
use crate::modules::UserCallable;
use crate::selector::{resolve, split_list};
use sasso_types::ast::{
    AtRootRule, AtRule, Callable, CustomProperty, Declaration, ExtendRule, ImportRule,
    ImportTarget, Stmt, StyleRule,
};
use std::rc::Rc;
use tracing::trace;

/// Where a block is compiled.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Parent {
    /// Resolved selectors of the enclosing style rule; empty outside rules.
    pub(crate) selectors: Vec<String>,
    /// Query of the enclosing `@media`, merged into nested queries.
    pub(crate) media: Option<String>,
    /// Inside `@keyframes`: selectors are taken as written.
    pub(crate) keyframes: bool,
    /// Declarations are allowed.
    pub(crate) decl_context: bool,
}

impl Parent {
    pub(crate) fn root() -> Self {
        Self::default()
    }

    fn rule(&self, selectors: Vec<String>) -> Self {
        Self {
            selectors,
            media: self.media.clone(),
            keyframes: false,
            decl_context: true,
        }
    }
}

/// Compiled output of a block.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Block {
    /// Stays in the enclosing rule.
    pub(crate) decls: Vec<CssNode>,
    /// Emitted after the enclosing rule.
    pub(crate) nested: Vec<CssNode>,
}

impl Block {
    /// Everything in output order, for bodies that hold both.
    pub(crate) fn into_nodes(self) -> Vec<CssNode> {
        let mut nodes = self.decls;
        nodes.extend(self.nested);
        nodes
    }

    /// Append in place: declarations next to declarations.
    fn place(&mut self, parent: &Parent, node: CssNode) {
        if parent.decl_context {
            self.decls.push(node);
        } else {
            self.nested.push(node);
        }
    }
}

impl Evaluator {
    /// Compile statements in order. An error is tagged with the location of
    /// the innermost statement that raised it.
    pub(crate) fn compile_block(&mut self, nodes: &[Stmt], parent: &Parent, out: &mut Block) -> EvalResult<()> {
        for stmt in nodes {
            self.span = stmt.span();
            self.compile_stmt(stmt, parent, out)
                .map_err(|e| e.at(&self.current_file, stmt.span()))?;
        }
        Ok(())
    }

    fn compile_stmt(&mut self, stmt: &Stmt, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        match stmt {
            Stmt::Variable(decl) => self.exec_variable(decl),
            Stmt::Rule(rule) => self.compile_style_rule(rule, parent, out),
            Stmt::Declaration(decl) => self.compile_declaration(decl, None, parent, out),
            Stmt::CustomProperty(prop) => self.compile_custom_property(prop, parent, out),
            Stmt::MixinDef(def) => {
                self.define_callable(def, true);
                Ok(())
            }
            Stmt::FunctionDef(def) => {
                self.define_callable(def, false);
                Ok(())
            }
            Stmt::Include(include) => self.compile_include(include, parent, out),
            Stmt::Content(_) => self.compile_content(parent, out),
            Stmt::Return(_) => Err(EvalError::InvalidContext(
                "@return may only be used within a function.".to_string(),
            )),
            Stmt::Use(rule) => {
                self.check_module_rule_position("@use", parent)?;
                let loaded = self.use_module(&rule.url, rule.namespace.as_deref(), &rule.config)?;
                out.nested.extend(loaded.css);
                Ok(())
            }
            Stmt::Forward(rule) => {
                self.check_module_rule_position("@forward", parent)?;
                let css = self.forward_module(rule)?;
                out.nested.extend(css);
                Ok(())
            }
            Stmt::Import(rule) => self.compile_import(rule, parent, out),
            Stmt::If(_) | Stmt::Each(_) | Stmt::For(_) | Stmt::While(_) => {
                self.compile_flow(stmt, parent, out)
            }
            Stmt::Extend(rule) => self.compile_extend(rule, parent),
            Stmt::AtRule(rule) => self.compile_at_rule(rule, parent, out),
            Stmt::AtRoot(rule) => self.compile_at_root(rule, parent, out),
            Stmt::Message(rule) => self.exec_message(rule),
            Stmt::Comment(comment) => {
                out.place(parent, CssNode::Comment(comment.text.clone()));
                Ok(())
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Style rules and declarations
    // ══════════════════════════════════════════════════════════════════════

    fn compile_style_rule(&mut self, rule: &StyleRule, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let text = self.interpolate_hash(&rule.selector)?;
        let selectors = if parent.keyframes {
            split_list(&text)
        } else {
            resolve(&parent.selectors, &text)?
        };
        trace!(selectors = ?selectors, "style rule");
        self.compile_rule_body(selectors, &rule.body, parent, out)
    }

    /// Compile a rule body under `selectors`. The rule is emitted only when
    /// it holds declarations; its nested output follows it.
    fn compile_rule_body(
        &mut self,
        selectors: Vec<String>,
        body: &[Stmt],
        parent: &Parent,
        out: &mut Block,
    ) -> EvalResult<()> {
        let child = parent.rule(selectors.clone());
        let saved = std::mem::replace(&mut self.selectors, selectors.clone());
        self.env.enter_scope();
        let mut inner = Block::default();
        let result = self.compile_block(body, &child, &mut inner);
        self.env.exit_scope();
        self.selectors = saved;
        result?;

        let rule = CssRule {
            selectors,
            children: inner.decls,
        };
        if rule.has_declarations() {
            out.nested.push(CssNode::Rule(rule));
        }
        out.nested.extend(inner.nested);
        Ok(())
    }

    /// `property: value`, and nested properties prefixed with `property-`.
    fn compile_declaration(
        &mut self,
        decl: &Declaration,
        prefix: Option<&str>,
        parent: &Parent,
        out: &mut Block,
    ) -> EvalResult<()> {
        if !parent.decl_context {
            return Err(EvalError::InvalidContext(
                "Declarations may only be used within style rules.".to_string(),
            ));
        }
        let name = self.interpolate_hash(&decl.property)?;
        let property = match prefix {
            Some(prefix) => format!("{prefix}-{name}"),
            None => name,
        };

        if let Some(expr) = &decl.value {
            let value = self.eval_expr(expr)?;
            if !value.is_blank() {
                out.decls.push(CssNode::Declaration(CssDeclaration {
                    property: property.clone(),
                    value: value.to_css(),
                    important: decl.important,
                    origin: self.origin(decl.span),
                }));
            }
        }

        for child in &decl.children {
            self.span = child.span();
            let result = match child {
                Stmt::Declaration(nested) => {
                    self.compile_declaration(nested, Some(&property), parent, out)
                }
                other => self.compile_stmt(other, parent, out),
            };
            result.map_err(|e| e.at(&self.current_file, child.span()))?;
        }
        Ok(())
    }

    /// `--name: value`. Only `#{...}` is evaluated in the value.
    fn compile_custom_property(&mut self, prop: &CustomProperty, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        if !parent.decl_context {
            return Err(EvalError::InvalidContext(
                "Declarations may only be used within style rules.".to_string(),
            ));
        }
        let property = self.interpolate_hash(&prop.property)?;
        let value = self.interpolate_hash(&prop.value)?;
        out.decls.push(CssNode::Declaration(CssDeclaration {
            property,
            value: value.trim().to_string(),
            important: false,
            origin: self.origin(prop.span),
        }));
        Ok(())
    }

    fn origin(&self, span: sasso_types::Span) -> Option<Origin> {
        self.config.source_map.then(|| Origin {
            file: Rc::clone(&self.current_file),
            line: span.start_line,
            column: span.start_col,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // At-rules
    // ══════════════════════════════════════════════════════════════════════

    fn compile_at_rule(&mut self, rule: &AtRule, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let params = self.interpolate(&rule.params)?;
        let Some(body) = &rule.body else {
            out.place(
                parent,
                CssNode::AtRule(CssAtRule {
                    name: rule.name.clone(),
                    params,
                    children: None,
                }),
            );
            return Ok(());
        };

        let lower = rule.name.to_ascii_lowercase();
        if matches!(lower.as_str(), "media" | "supports" | "container") {
            return self.compile_bubbling(&rule.name, params, body, parent, out);
        }

        let child = if lower.ends_with("keyframes") {
            Parent {
                selectors: Vec::new(),
                media: parent.media.clone(),
                keyframes: true,
                decl_context: false,
            }
        } else {
            Parent {
                selectors: parent.selectors.clone(),
                media: parent.media.clone(),
                keyframes: false,
                decl_context: true,
            }
        };
        let inner = self.compile_scoped(body, &child)?;
        out.nested.push(CssNode::AtRule(CssAtRule {
            name: rule.name.clone(),
            params,
            children: Some(inner.into_nodes()),
        }));
        Ok(())
    }

    /// `@media`, `@supports` and `@container`. Declarations inside a rule
    /// are wrapped in that rule's selectors; a nested `@media` merges its
    /// query with the enclosing one and is emitted next to it.
    fn compile_bubbling(
        &mut self,
        name: &str,
        params: String,
        body: &[Stmt],
        parent: &Parent,
        out: &mut Block,
    ) -> EvalResult<()> {
        let is_media = name.eq_ignore_ascii_case("media");
        let query = match (&parent.media, is_media) {
            (Some(outer), true) => format!("{outer} and {params}"),
            _ => params,
        };
        let child = Parent {
            selectors: parent.selectors.clone(),
            media: if is_media {
                Some(query.clone())
            } else {
                parent.media.clone()
            },
            keyframes: false,
            decl_context: !parent.selectors.is_empty(),
        };
        let inner = self.compile_scoped(body, &child)?;

        let mut children = Vec::new();
        if !inner.decls.is_empty() {
            children.push(CssNode::Rule(CssRule {
                selectors: parent.selectors.clone(),
                children: inner.decls,
            }));
        }
        let mut hoisted = Vec::new();
        for node in inner.nested {
            match node {
                CssNode::AtRule(at) if is_media && at.name.eq_ignore_ascii_case("media") => {
                    hoisted.push(CssNode::AtRule(at));
                }
                other => children.push(other),
            }
        }
        out.nested.push(CssNode::AtRule(CssAtRule {
            name: name.to_string(),
            params: query,
            children: Some(children),
        }));
        out.nested.extend(hoisted);
        Ok(())
    }

    /// `@at-root`: the body is compiled without the enclosing selectors.
    fn compile_at_root(&mut self, rule: &AtRootRule, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let Some(selector) = &rule.selector else {
            let child = Parent {
                selectors: Vec::new(),
                media: parent.media.clone(),
                keyframes: false,
                decl_context: false,
            };
            let saved = std::mem::take(&mut self.selectors);
            let inner = self.compile_scoped(&rule.body, &child);
            self.selectors = saved;
            out.nested.extend(inner?.into_nodes());
            return Ok(());
        };
        let text = self.interpolate_hash(selector)?;
        let selectors = if text.contains('&') {
            resolve(&parent.selectors, &text)?
        } else {
            split_list(&text)
        };
        let root = Parent {
            selectors: Vec::new(),
            media: parent.media.clone(),
            keyframes: false,
            decl_context: false,
        };
        let mut block = Block::default();
        self.compile_rule_body(selectors, &rule.body, &root, &mut block)?;
        out.nested.extend(block.into_nodes());
        Ok(())
    }

    fn compile_scoped(&mut self, body: &[Stmt], parent: &Parent) -> EvalResult<Block> {
        self.env.enter_scope();
        let mut inner = Block::default();
        let result = self.compile_block(body, parent, &mut inner);
        self.env.exit_scope();
        result.map(|()| inner)
    }

    // ══════════════════════════════════════════════════════════════════════
    // Everything else
    // ══════════════════════════════════════════════════════════════════════

    fn compile_flow(&mut self, stmt: &Stmt, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        let mut body = |ev: &mut Evaluator, stmts: &[Stmt]| -> EvalResult<Flow> {
            ev.compile_block(stmts, parent, out)?;
            Ok(Flow::Next)
        };
        match stmt {
            Stmt::If(rule) => self.exec_if(rule, &mut body)?,
            Stmt::Each(rule) => self.exec_each(rule, &mut body)?,
            Stmt::For(rule) => self.exec_for(rule, &mut body)?,
            Stmt::While(rule) => self.exec_while(rule, &mut body)?,
            _ => Flow::Next,
        };
        Ok(())
    }

    fn compile_import(&mut self, rule: &ImportRule, parent: &Parent, out: &mut Block) -> EvalResult<()> {
        for target in &rule.targets {
            match target {
                ImportTarget::Css(text) => {
                    let params = self.interpolate(text)?;
                    out.place(
                        parent,
                        CssNode::AtRule(CssAtRule {
                            name: "import".to_string(),
                            params,
                            children: None,
                        }),
                    );
                }
                ImportTarget::Sass(url) => self.import_file(url, parent, out)?,
            }
        }
        Ok(())
    }

    fn compile_extend(&mut self, rule: &ExtendRule, parent: &Parent) -> EvalResult<()> {
        if parent.selectors.is_empty() {
            return Err(EvalError::InvalidContext(
                "@extend may only be used within style rules.".to_string(),
            ));
        }
        let text = self.interpolate_hash(&rule.selector)?;
        for target in split_list(&text) {
            self.extends.register(
                &parent.selectors,
                &target,
                rule.optional,
                &self.current_file,
                rule.span,
            );
        }
        Ok(())
    }

    /// Register a mixin or function in the active module. Definitions are
    /// module-wide wherever they appear.
    fn define_callable(&mut self, def: &Callable, mixin: bool) {
        let module = self.env.active_module().to_string();
        let callable = Rc::new(UserCallable {
            def: def.clone(),
            module: module.clone(),
            file: Rc::clone(&self.current_file),
        });
        let key = normalize(&def.name);
        trace!(name = %key, mixin, module = %module, "define");
        let target = self.modules.module_mut(&module);
        if mixin {
            target.mixins.insert(key, callable);
        } else {
            target.functions.insert(key, callable);
        }
        // Cached mixin output may depend on the previous definition.
        self.env.touch();
    }

    fn check_module_rule_position(&self, keyword: &str, parent: &Parent) -> EvalResult<()> {
        if parent.decl_context || !parent.selectors.is_empty() || self.env.depth() > 0 {
            return Err(EvalError::InvalidContext(format!(
                "{keyword} rules must be written at the top level of a stylesheet."
            )));
        }
        Ok(())
    }
}
