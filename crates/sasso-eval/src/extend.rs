//! `@extend`: registration and selector rewriting.
//!
//! A registered extension `(extender, target)` adds, to every selector that
//! matches `target`, a copy with the matched part replaced by the extender.
//! A selector matches when it equals the target (pseudo-classes ignored),
//! or when its last compound does; in the latter case the extender's last
//! compound is substituted and the selector's prefix kept.

use crate::css::{CssNode, CssRule};
use crate::selector::{split_last_compound, split_list, split_pseudo};
use sasso_types::Span;
use tracing::debug;

/// Rewriting stops after this many passes even if new selectors keep appearing.
const MAX_PASSES: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub extender: String,
    pub target: String,
    pub optional: bool,
    pub file: String,
    pub span: Span,
}

/// Extensions collected while compiling, consumed once at the end.
#[derive(Debug, Clone, Default)]
pub struct ExtendRegistry {
    extensions: Vec<Extension>,
}

impl ExtendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every selector of `extenders` as extending `target`.
    pub fn register(
        &mut self,
        extenders: &[String],
        target: &str,
        optional: bool,
        file: &str,
        span: Span,
    ) {
        for extender in extenders {
            let extension = Extension {
                extender: extender.clone(),
                target: target.trim().to_string(),
                optional,
                file: file.to_string(),
                span,
            };
            if !self.extensions.contains(&extension) {
                self.extensions.push(extension);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    /// Extend a selector list. `used[i]` is set when extension `i` matched.
    pub fn extend_selectors(&self, selectors: &[String], used: &mut [bool]) -> Vec<String> {
        let mut result: Vec<String> = selectors.to_vec();
        let mut start = 0;
        for _ in 0..MAX_PASSES {
            let end = result.len();
            let mut added = Vec::new();
            for selector in &result[start..end] {
                for (i, extension) in self.extensions.iter().enumerate() {
                    if let Some(extended) = apply_one(selector, extension) {
                        used[i] = true;
                        if !result.contains(&extended) && !added.contains(&extended) {
                            added.push(extended);
                        }
                    }
                }
            }
            if added.is_empty() {
                break;
            }
            start = end;
            result.extend(added);
        }
        result
    }

    /// Rewrite the selectors of every rule in the tree, then drop
    /// placeholder selectors and rules left without any. Returns the
    /// extensions that matched nothing and are not `!optional`.
    pub fn apply_to_tree(&self, nodes: &mut Vec<CssNode>) -> Vec<Extension> {
        let mut used = vec![false; self.extensions.len()];
        if !self.extensions.is_empty() {
            self.rewrite(nodes, &mut used);
        }
        remove_placeholders(nodes);
        self.extensions
            .iter()
            .zip(used)
            .filter(|(e, used)| !used && !e.optional)
            .map(|(e, _)| {
                debug!(target = %e.target, extender = %e.extender, "unmatched @extend");
                e.clone()
            })
            .collect()
    }

    fn rewrite(&self, nodes: &mut [CssNode], used: &mut [bool]) {
        for node in nodes {
            match node {
                CssNode::Rule(rule) => rule.selectors = self.extend_selectors(&rule.selectors, used),
                CssNode::AtRule(at) => {
                    if let Some(children) = &mut at.children {
                        self.rewrite(children, used);
                    }
                }
                _ => {}
            }
        }
    }

    /// Text form of the rewrite: every line that opens a style rule gets
    /// its selector list extended. Lines without matches are unchanged.
    pub fn apply_extends(&self, css: &str) -> String {
        let mut used = vec![false; self.extensions.len()];
        let mut out = Vec::new();
        for line in css.split('\n') {
            out.push(self.extend_line(line, &mut used));
        }
        out.join("\n")
    }

    fn extend_line(&self, line: &str, used: &mut [bool]) -> String {
        let trimmed = line.trim_end();
        let Some(header) = trimmed.strip_suffix('{') else {
            return line.to_string();
        };
        let indent_len = header.len() - header.trim_start().len();
        let header = header.trim();
        if header.starts_with('@') || header.is_empty() {
            return line.to_string();
        }
        let selectors = split_list(header);
        let extended = self.extend_selectors(&selectors, used);
        if extended.len() == selectors.len() {
            return line.to_string();
        }
        format!("{}{} {{", &line[..indent_len], extended.join(", "))
    }
}

/// Apply one extension to one selector.
fn apply_one(selector: &str, extension: &Extension) -> Option<String> {
    let (prefix, last) = split_last_compound(selector);
    let (base, pseudo) = split_pseudo(last);
    if selector == extension.target || format!("{prefix}{base}") == extension.target {
        return Some(format!("{}{pseudo}", extension.extender));
    }
    if !prefix.is_empty() && base == extension.target {
        let (_, extender_last) = split_last_compound(&extension.extender);
        return Some(format!("{prefix}{extender_last}{pseudo}"));
    }
    None
}

fn remove_placeholders(nodes: &mut Vec<CssNode>) {
    for node in nodes.iter_mut() {
        match node {
            CssNode::Rule(CssRule { selectors, .. }) => selectors.retain(|s| !is_placeholder(s)),
            CssNode::AtRule(at) if is_keyframes(&at.name) => {}
            CssNode::AtRule(at) => {
                if let Some(children) = &mut at.children {
                    remove_placeholders(children);
                }
            }
            _ => {}
        }
    }
    nodes.retain(|node| !matches!(node, CssNode::Rule(rule) if rule.selectors.is_empty()));
}

fn is_keyframes(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with("keyframes")
}

/// Whether a selector contains a `%name` compound. `%` inside attribute
/// brackets, pseudo arguments or strings, and percentages such as `50%`,
/// do not count.
fn is_placeholder(selector: &str) -> bool {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = selector.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == '\\' {
                chars.next();
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '\\' => {
                chars.next();
            }
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '%' if depth == 0 => {
                if chars
                    .peek()
                    .is_some_and(|next| next.is_alphabetic() || *next == '_' || *next == '-')
                {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::CssDeclaration;

    fn registry(pairs: &[(&str, &str)]) -> ExtendRegistry {
        let mut registry = ExtendRegistry::new();
        for (extender, target) in pairs {
            registry.register(&[extender.to_string()], target, false, "t.scss", Span::point(1, 1));
        }
        registry
    }

    fn extend(registry: &ExtendRegistry, selectors: &[&str]) -> Vec<String> {
        let selectors: Vec<String> = selectors.iter().map(|s| s.to_string()).collect();
        let mut used = vec![false; registry.extensions().len()];
        registry.extend_selectors(&selectors, &mut used)
    }

    #[test]
    fn test_exact_match_appends_extender() {
        let registry = registry(&[(".a", ".b")]);
        assert_eq!(extend(&registry, &[".b"]), vec![".b", ".a"]);
    }

    #[test]
    fn test_pseudo_suffix_kept() {
        let registry = registry(&[(".a", ".b")]);
        assert_eq!(extend(&registry, &[".b:hover"]), vec![".b:hover", ".a:hover"]);
    }

    #[test]
    fn test_trailing_segment_match() {
        let registry = registry(&[(".x .a", ".b")]);
        assert_eq!(extend(&registry, &[".nav .b"]), vec![".nav .b", ".nav .a"]);
    }

    #[test]
    fn test_chained_extends_reach_fixed_point() {
        let registry = registry(&[(".a", ".b"), (".c", ".a")]);
        assert_eq!(extend(&registry, &[".b"]), vec![".b", ".a", ".c"]);
    }

    #[test]
    fn test_text_rewrite_is_identity_without_matches() {
        let registry = registry(&[(".a", ".missing")]);
        let css = ".b {\n  color: red;\n}";
        assert_eq!(registry.apply_extends(css), css);
        assert_eq!(registry.apply_extends(&registry.apply_extends(css)), css);
    }

    #[test]
    fn test_text_rewrite_keeps_indentation() {
        let registry = registry(&[(".a", ".b")]);
        let css = "@media print {\n  .b {\n    color: red;\n  }\n}";
        assert_eq!(
            registry.apply_extends(css),
            "@media print {\n  .b, .a {\n    color: red;\n  }\n}"
        );
    }

    #[test]
    fn test_placeholders_removed_and_unmatched_reported() {
        let registry = registry(&[(".a", "%base"), (".z", ".nowhere")]);
        let mut nodes = vec![CssNode::Rule(CssRule {
            selectors: vec!["%base".into()],
            children: vec![CssNode::Declaration(CssDeclaration {
                property: "color".into(),
                value: "red".into(),
                important: false,
                origin: None,
            })],
        })];
        let unmatched = registry.apply_to_tree(&mut nodes);
        let CssNode::Rule(rule) = &nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(rule.selectors, vec![".a"]);
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].target, ".nowhere");
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder("%btn"));
        assert!(is_placeholder(".a %btn:hover"));
        assert!(is_placeholder("a%btn"));
        assert!(!is_placeholder("50%"));
        assert!(!is_placeholder("[data-w=\"50%\"]"));
        assert!(!is_placeholder("[data-w=50%x]"));
        assert!(!is_placeholder(".a:not([title='%x'])"));
    }
}
