//! `#{...}` and bare `$name` substitution in raw text: selectors, property
//! names, at-rule parameters and string contents.

use crate::engine::Evaluator;
use crate::error::EvalResult;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use sasso_parser::parse_expression;

/// Substitution repeats while its output still holds `#{`; this bounds it.
const MAX_PASSES: usize = 16;

/// A bare variable reference inside raw text.
static VARIABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$([A-Za-z_][\w-]*)").expect("valid regex"));

impl Evaluator {
    /// Replace every `#{expr}` with the unquoted text of its value, until
    /// no interpolation is left.
    pub(crate) fn interpolate_hash(&mut self, text: &str) -> EvalResult<String> {
        let mut current = text.to_string();
        for _ in 0..MAX_PASSES {
            if !current.contains("#{") {
                break;
            }
            let next = self.substitute(&current)?;
            if next == current {
                break;
            }
            current = next;
        }
        Ok(current)
    }

    /// Like [`Evaluator::interpolate_hash`], then replace bare `$name`
    /// references. Undefined names are left as written.
    pub(crate) fn interpolate(&mut self, text: &str) -> EvalResult<String> {
        let text = self.interpolate_hash(text)?;
        if !text.contains('$') {
            return Ok(text);
        }
        let replaced = VARIABLE.replace_all(&text, |caps: &Captures| {
            match self.lookup_variable(None, &caps[1]) {
                Ok(value) => value.to_css_unquoted(),
                Err(_) => caps[0].to_string(),
            }
        });
        Ok(replaced.into_owned())
    }

    /// One left-to-right pass over `text`.
    fn substitute(&mut self, text: &str) -> EvalResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("#{") {
            out.push_str(&rest[..start]);
            let body = &rest[start + 2..];
            let Some(end) = closing_brace(body) else {
                // Unbalanced: keep the remainder as written.
                out.push_str(&rest[start..]);
                return Ok(out);
            };
            let inner = body[..end].trim();
            if !inner.is_empty() {
                let expr = parse_expression(inner, &self.current_file, self.span)?;
                out.push_str(&self.eval_expr(&expr)?.to_css_unquoted());
            }
            rest = &body[end + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }
}

/// Byte offset of the `}` closing an interpolation whose body starts at
/// the beginning of `body`. Braces inside quotes do not count.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in body.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if let Some(q) = quote {
            match ch {
                '\\' => escaped = true,
                c if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(i),
            '}' => depth -= 1,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::modules::MemoryLoader;
    use crate::value::Value;
    use std::rc::Rc;

    fn evaluator() -> Evaluator {
        let mut ev = Evaluator::new(EngineConfig::default(), Rc::new(MemoryLoader::new()));
        ev.env.define("name", Value::quoted("card"), false, false);
        ev.env.define("gap", Value::with_unit(4.0, "px"), false, false);
        ev
    }

    #[test]
    fn test_closing_brace_skips_nested_and_quoted() {
        assert_eq!(closing_brace("a}"), Some(1));
        assert_eq!(closing_brace("map-get((a: 1), a)}x"), Some(18));
        assert_eq!(closing_brace("\"}\"}"), Some(3));
        assert_eq!(closing_brace("a"), None);
    }

    #[test]
    fn test_hash_interpolation_unquotes() {
        let mut ev = evaluator();
        assert_eq!(ev.interpolate_hash(".#{$name}-title").unwrap(), ".card-title");
        assert_eq!(ev.interpolate_hash("w-#{1 + 2}").unwrap(), "w-3");
    }

    #[test]
    fn test_nested_interpolation() {
        let mut ev = evaluator();
        assert_eq!(ev.interpolate_hash("#{\"x-#{$name}\"}").unwrap(), "x-card");
    }

    #[test]
    fn test_bare_variables_in_raw_text() {
        let mut ev = evaluator();
        assert_eq!(ev.interpolate("(min-width: $gap)").unwrap(), "(min-width: 4px)");
        assert_eq!(ev.interpolate("$missing and $gap").unwrap(), "$missing and 4px");
    }

    #[test]
    fn test_unbalanced_interpolation_is_kept() {
        let mut ev = evaluator();
        assert_eq!(ev.interpolate_hash("a #{b").unwrap(), "a #{b");
    }
}
