//! Selector text utilities: list splitting and parent resolution.

use crate::error::{EvalError, EvalResult};

/// Split a selector list on top-level commas, trimming each part.
pub fn split_list(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut current = String::new();
    for ch in text.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' | '[' => {
                depth += 1;
                current.push(ch);
            }
            ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => {
                push_part(&mut parts, &current);
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    push_part(&mut parts, &current);
    parts
}

fn push_part(parts: &mut Vec<String>, text: &str) {
    let trimmed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if !trimmed.is_empty() {
        parts.push(trimmed);
    }
}

/// Resolve a nested selector list against its parents, parent-major:
/// `&` is replaced by each parent, a leading combinator is glued to the
/// parent, anything else becomes a descendant.
pub fn resolve(parents: &[String], child: &str) -> EvalResult<Vec<String>> {
    let children = split_list(child);
    if parents.is_empty() {
        if children.iter().any(|c| c.contains('&')) {
            return Err(EvalError::InvalidSelector(
                "Top-level selectors may not contain the parent selector \"&\".".to_string(),
            ));
        }
        return Ok(children);
    }
    let mut resolved = Vec::with_capacity(parents.len() * children.len());
    for parent in parents {
        for child in &children {
            resolved.push(nest(parent, child));
        }
    }
    Ok(resolved)
}

/// Combine one parent and one child selector.
pub fn nest(parent: &str, child: &str) -> String {
    if child.contains('&') {
        child.replace('&', parent)
    } else {
        format!("{parent} {child}")
    }
}

/// Split a complex selector into everything before its last compound and
/// the last compound itself: `.a > .b:hover` becomes (`.a > `, `.b:hover`).
pub fn split_last_compound(selector: &str) -> (&str, &str) {
    let mut depth = 0usize;
    let mut split = 0;
    for (i, ch) in selector.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ' ' | '>' | '+' | '~' if depth == 0 => split = i + ch.len_utf8(),
            _ => {}
        }
    }
    selector.split_at(split)
}

/// Split a compound into its base and pseudo-class suffix:
/// `.b:hover` becomes (`.b`, `:hover`).
pub fn split_pseudo(compound: &str) -> (&str, &str) {
    let mut depth = 0usize;
    for (i, ch) in compound.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 && i > 0 => return compound.split_at(i),
            _ => {}
        }
    }
    (compound, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_descendant_join() {
        let resolved = resolve(&strings(&[".a"]), ".b, .c").unwrap();
        assert_eq!(resolved, strings(&[".a .b", ".a .c"]));
    }

    #[test]
    fn test_parent_major_order() {
        let resolved = resolve(&strings(&[".a", ".b"]), ".x, .y").unwrap();
        assert_eq!(resolved, strings(&[".a .x", ".a .y", ".b .x", ".b .y"]));
    }

    #[test]
    fn test_ampersand_replaced_per_parent() {
        let resolved = resolve(&strings(&[".a", ".b"]), "&:hover, &-icon").unwrap();
        assert_eq!(resolved, strings(&[".a:hover", ".a-icon", ".b:hover", ".b-icon"]));
    }

    #[test]
    fn test_leading_combinator() {
        let resolved = resolve(&strings(&[".menu"]), "> li").unwrap();
        assert_eq!(resolved, strings(&[".menu > li"]));
    }

    #[test]
    fn test_top_level_ampersand_is_error() {
        assert!(matches!(
            resolve(&[], "&.x"),
            Err(EvalError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_split_keeps_commas_in_parens() {
        assert_eq!(split_list(":is(.a, .b), .c"), strings(&[":is(.a, .b)", ".c"]));
    }

    #[test]
    fn test_last_compound_and_pseudo() {
        assert_eq!(split_last_compound(".a > .b:hover"), (".a > ", ".b:hover"));
        assert_eq!(split_pseudo(".b:hover"), (".b", ":hover"));
        assert_eq!(split_pseudo(":root"), (":root", ""));
    }
}
