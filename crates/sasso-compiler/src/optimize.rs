//! Compressed output: rewrites expanded CSS without insignificant
//! whitespace and remaps source-map positions onto the single output line.
//!
//! The expanded serializer puts every rule header, declaration, statement
//! at-rule and closing brace on its own line, so compression works line by
//! line:
//!
//! ```text
//! .a, .b {          ─►  .a,.b{color:red;margin:0 auto}
//!   color: red;
//!   margin: 0 auto;
//! }
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use sasso_eval::Mapping;

static LEADING_ZERO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[\s,(:/*+-])0\.(\d)").expect("valid regex"));

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#([0-9a-fA-F]{6})\b").expect("valid regex"));

static COMBINATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*([>+~,])\s*").expect("valid regex"));

/// Output text plus its length in characters, the unit of mapping columns.
#[derive(Default)]
struct Output {
    text: String,
    chars: usize,
}

impl Output {
    fn push_str(&mut self, text: &str) {
        self.chars += text.chars().count();
        self.text.push_str(text);
    }

    fn push(&mut self, ch: char) {
        self.chars += 1;
        self.text.push(ch);
    }

    /// Drop a trailing `;`, which is optional before `}`.
    fn trim_semicolon(&mut self) {
        if self.text.ends_with(';') {
            self.text.pop();
            self.chars -= 1;
        }
    }
}

/// Compress expanded CSS. Mappings are rewritten in place to point at the
/// compressed positions.
pub fn compress(css: &str, mappings: &mut [Mapping]) -> String {
    let mut out = Output::default();
    // Output column at which each expanded line's content starts, and the
    // width of the indentation stripped from it.
    let mut line_starts = Vec::new();
    let mut in_comment = false;

    for line in css.lines() {
        let content = line.trim_start();
        let indent = line.len() - content.len();
        line_starts.push((out.chars, indent));

        if in_comment {
            if content.contains("*/") {
                in_comment = false;
            }
            continue;
        }
        if content.is_empty() {
            continue;
        }
        if content.starts_with("/*") {
            if content.starts_with("/*!") {
                out.push_str(content);
            } else if !content.contains("*/") {
                in_comment = true;
            }
            continue;
        }

        if content == "}" {
            out.trim_semicolon();
            out.push('}');
        } else if let Some(header) = content.strip_suffix(" {") {
            out.push_str(&compress_header(header));
            out.push('{');
        } else {
            out.push_str(&compress_statement(content));
        }
    }

    for mapping in mappings.iter_mut() {
        if let Some(&(start, indent)) = line_starts.get(mapping.generated_line as usize) {
            let column = start + (mapping.generated_column as usize).saturating_sub(indent);
            mapping.generated_line = 0;
            mapping.generated_column = column as u32;
        }
    }

    out.trim_semicolon();
    out.text
}

/// A rule selector list or an at-rule prelude.
fn compress_header(header: &str) -> String {
    if header.starts_with('@') {
        return header.to_string();
    }
    COMBINATOR.replace_all(header, "$1").into_owned()
}

/// A declaration (`prop: value;`) or a statement at-rule.
fn compress_statement(line: &str) -> String {
    if line.starts_with('@') {
        return line.to_string();
    }
    let Some((property, value)) = line.split_once(": ") else {
        return line.to_string();
    };
    if property.starts_with("--") {
        return format!("{property}:{value}");
    }
    format!("{property}:{}", compress_value(value))
}

/// Shorten numbers and colors and drop spaces after commas outside strings.
pub fn compress_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut quote: Option<char> = None;
    let mut plain = String::new();

    let flush = |plain: &mut String, out: &mut String| {
        out.push_str(&shorten(plain));
        plain.clear();
    };

    for ch in value.chars() {
        match quote {
            Some(q) => {
                out.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch == '"' || ch == '\'' => {
                flush(&mut plain, &mut out);
                quote = Some(ch);
                out.push(ch);
            }
            None => plain.push(ch),
        }
    }
    flush(&mut plain, &mut out);
    out
}

fn shorten(text: &str) -> String {
    let text = text.replace(", ", ",").replace(" !important", "!important");
    let text = LEADING_ZERO.replace_all(&text, "$1.$2");
    HEX_COLOR
        .replace_all(&text, |caps: &regex::Captures| {
            let hex = caps[1].as_bytes();
            if hex[0] == hex[1] && hex[2] == hex[3] && hex[4] == hex[5] {
                format!("#{}{}{}", hex[0] as char, hex[2] as char, hex[4] as char)
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn squash(css: &str) -> String {
        compress(css, &mut [])
    }

    #[test]
    fn test_rule_is_collapsed() {
        assert_eq!(
            squash(".a, .b {\n  color: red;\n  margin: 0 auto;\n}"),
            ".a,.b{color:red;margin:0 auto}"
        );
    }

    #[test]
    fn test_nested_at_rule() {
        assert_eq!(
            squash("@media screen {\n  .c > .d {\n    top: 0;\n  }\n}\n\n.e {\n  left: 0;\n}"),
            "@media screen{.c>.d{top:0}}.e{left:0}"
        );
    }

    #[test]
    fn test_values_are_shortened() {
        assert_eq!(compress_value("0.5em, #ffffff"), ".5em,#fff");
        assert_eq!(compress_value("-0.25px #abcdef"), "-.25px #abcdef");
        assert_eq!(compress_value("red !important"), "red!important");
    }

    #[test]
    fn test_strings_are_untouched() {
        assert_eq!(compress_value("\"a, 0.5\", b"), "\"a, 0.5\",b");
    }

    #[test]
    fn test_comments_dropped_unless_preserved() {
        assert_eq!(squash("/* gone */\n\n/*! kept */\n\n.a {\n  b: c;\n}"), "/*! kept */.a{b:c}");
        assert_eq!(squash("/* multi\n   line */\n\n.a {\n  b: c;\n}"), ".a{b:c}");
    }

    #[test]
    fn test_statement_at_rules_keep_semicolon_between() {
        assert_eq!(
            squash("@charset \"utf-8\";\n\n.a {\n  b: c;\n}"),
            "@charset \"utf-8\";.a{b:c}"
        );
    }

    #[test]
    fn test_mappings_follow_compression() {
        let mut mappings = vec![
            Mapping {
                generated_line: 1,
                generated_column: 2,
                source: "a.scss".into(),
                source_line: 2,
                source_column: 3,
            },
            Mapping {
                generated_line: 2,
                generated_column: 2,
                source: "a.scss".into(),
                source_line: 3,
                source_column: 3,
            },
        ];
        let css = compress(".a {\n  color: red;\n  top: 0;\n}", &mut mappings);
        assert_eq!(css, ".a{color:red;top:0}");
        assert_eq!((mappings[0].generated_line, mappings[0].generated_column), (0, 3));
        assert_eq!(mappings[1].generated_column, 13);
    }
}
