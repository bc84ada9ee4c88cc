//! The rendered CSS tree and its expanded-style serializer.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

/// A node of compiled CSS.
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    Rule(CssRule),
    Declaration(CssDeclaration),
    AtRule(CssAtRule),
    /// A loud comment, text included `/*` and `*/`.
    Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    pub selectors: Vec<String>,
    pub children: Vec<CssNode>,
}

impl CssRule {
    pub fn has_declarations(&self) -> bool {
        self.children
            .iter()
            .any(|c| matches!(c, CssNode::Declaration(_)))
    }
}

/// Where a declaration came from, for source maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Origin {
    pub file: Rc<str>,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssDeclaration {
    pub property: String,
    pub value: String,
    pub important: bool,
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CssAtRule {
    pub name: String,
    pub params: String,
    /// `None` for statement at-rules (`@charset "utf-8";`).
    pub children: Option<Vec<CssNode>>,
}

/// One generated-to-source position pair. Generated positions are 0-based,
/// source positions 1-based as in [`sasso_types::Span`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub generated_line: u32,
    pub generated_column: u32,
    pub source: String,
    pub source_line: u32,
    pub source_column: u32,
}

/// Serialize a CSS tree in expanded style. With `record_mappings`, one
/// mapping is recorded per declaration.
pub fn serialize(nodes: &[CssNode], record_mappings: bool) -> (String, Vec<Mapping>) {
    let mut writer = CssWriter {
        out: String::new(),
        line: 0,
        column: 0,
        mappings: Vec::new(),
        record_mappings,
    };
    let mut first = true;
    for node in nodes {
        if is_empty(node) {
            continue;
        }
        if !first {
            writer.write("\n\n");
        }
        first = false;
        writer.node(node, 0);
    }
    (writer.out, writer.mappings)
}

fn is_empty(node: &CssNode) -> bool {
    match node {
        CssNode::Rule(rule) => rule.selectors.is_empty() || rule.children.is_empty(),
        CssNode::AtRule(at) => at
            .children
            .as_ref()
            .is_some_and(|c| c.iter().all(is_empty) && !at.name.eq_ignore_ascii_case("font-face")),
        _ => false,
    }
}

struct CssWriter {
    out: String,
    line: u32,
    column: u32,
    mappings: Vec<Mapping>,
    record_mappings: bool,
}

impl CssWriter {
    fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }
        self.out.push_str(text);
    }

    fn indent(&mut self, depth: usize) {
        self.write(&"  ".repeat(depth));
    }

    fn node(&mut self, node: &CssNode, depth: usize) {
        match node {
            CssNode::Rule(rule) => {
                self.indent(depth);
                self.write(&rule.selectors.join(", "));
                self.write(" {");
                self.children(&rule.children, depth);
                self.write("}");
            }
            CssNode::Declaration(decl) => {
                self.indent(depth);
                if self.record_mappings {
                    if let Some(origin) = &decl.origin {
                        self.mappings.push(Mapping {
                            generated_line: self.line,
                            generated_column: self.column,
                            source: origin.file.to_string(),
                            source_line: origin.line,
                            source_column: origin.column,
                        });
                    }
                }
                self.write(&decl.property);
                self.write(": ");
                self.write(&decl.value);
                if decl.important {
                    self.write(" !important");
                }
                self.write(";");
            }
            CssNode::AtRule(at) => {
                self.indent(depth);
                self.write("@");
                self.write(&at.name);
                if !at.params.is_empty() {
                    self.write(" ");
                    self.write(&at.params);
                }
                match &at.children {
                    None => self.write(";"),
                    Some(children) => {
                        self.write(" {");
                        self.children(children, depth);
                        self.write("}");
                    }
                }
            }
            CssNode::Comment(text) => {
                self.indent(depth);
                self.write(text);
            }
        }
    }

    fn children(&mut self, children: &[CssNode], depth: usize) {
        let mut wrote = false;
        for child in children.iter().filter(|c| !is_empty(c)) {
            self.write("\n");
            self.node(child, depth + 1);
            wrote = true;
        }
        self.write("\n");
        if wrote {
            self.indent(depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decl(property: &str, value: &str) -> CssNode {
        CssNode::Declaration(CssDeclaration {
            property: property.into(),
            value: value.into(),
            important: false,
            origin: Some(Origin {
                file: Rc::from("a.scss"),
                line: 2,
                column: 3,
            }),
        })
    }

    fn rule(selectors: &[&str], children: Vec<CssNode>) -> CssNode {
        CssNode::Rule(CssRule {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            children,
        })
    }

    #[test]
    fn test_expanded_layout() {
        let nodes = vec![
            rule(&[".a", ".b"], vec![decl("color", "red")]),
            CssNode::AtRule(CssAtRule {
                name: "media".into(),
                params: "screen".into(),
                children: Some(vec![rule(&[".c"], vec![decl("margin", "0")])]),
            }),
        ];
        let (css, _) = serialize(&nodes, false);
        assert_eq!(
            css,
            ".a, .b {\n  color: red;\n}\n\n@media screen {\n  .c {\n    margin: 0;\n  }\n}"
        );
    }

    #[test]
    fn test_empty_rules_are_skipped() {
        let nodes = vec![rule(&[".empty"], vec![]), rule(&[".a"], vec![decl("b", "c")])];
        let (css, _) = serialize(&nodes, false);
        assert_eq!(css, ".a {\n  b: c;\n}");
    }

    #[test]
    fn test_statement_at_rule() {
        let nodes = vec![CssNode::AtRule(CssAtRule {
            name: "charset".into(),
            params: "\"utf-8\"".into(),
            children: None,
        })];
        assert_eq!(serialize(&nodes, false).0, "@charset \"utf-8\";");
    }

    #[test]
    fn test_mapping_per_declaration() {
        let nodes = vec![rule(&[".a"], vec![decl("color", "red"), decl("top", "0")])];
        let (_, mappings) = serialize(&nodes, true);
        assert_eq!(mappings.len(), 2);
        assert_eq!((mappings[0].generated_line, mappings[0].generated_column), (1, 2));
        assert_eq!(mappings[1].generated_line, 2);
        assert_eq!(mappings[0].source_line, 2);
    }
}
