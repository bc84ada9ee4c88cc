//! Source Map v3 generation from the engine's declaration mappings.
//!
//! Each mapping becomes one four-field segment (generated column, source
//! index, source line, source column) in the `mappings` string, encoded as
//! Base64 VLQ. Source lines and columns are converted to the 0-based form
//! the format uses.

use sasso_eval::Mapping;
use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// The serialized form of a Source Map v3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Serialize to JSON text.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deserialize from JSON text.
    pub fn from_json(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}

/// Extra inputs for [`SourceMapGenerator::generate`].
#[derive(Debug, Clone, Default)]
pub struct SourceMapOptions {
    pub source_root: Option<String>,
    /// Source text by path, embedded as `sourcesContent` when non-empty.
    pub contents: Vec<(String, String)>,
}

pub struct SourceMapGenerator;

impl SourceMapGenerator {
    /// Build a source map. `source_file` is listed first among the sources
    /// even if no mapping refers to it.
    pub fn generate(
        mappings: &[Mapping],
        source_file: &str,
        output_file: Option<&str>,
        options: &SourceMapOptions,
    ) -> SourceMap {
        let mut sources = vec![source_file.to_string()];
        for mapping in mappings {
            if !sources.contains(&mapping.source) {
                sources.push(mapping.source.clone());
            }
        }

        let sources_content = if options.contents.is_empty() {
            None
        } else {
            Some(
                sources
                    .iter()
                    .map(|source| {
                        options
                            .contents
                            .iter()
                            .find(|(path, _)| path == source)
                            .map(|(_, text)| text.clone())
                    })
                    .collect(),
            )
        };

        SourceMap {
            version: 3,
            file: output_file.map(String::from),
            source_root: options.source_root.clone(),
            mappings: encode_mappings(mappings, &sources),
            sources,
            sources_content,
            names: Vec::new(),
        }
    }
}

fn encode_mappings(mappings: &[Mapping], sources: &[String]) -> String {
    let mut sorted: Vec<&Mapping> = mappings.iter().collect();
    sorted.sort_by_key(|m| (m.generated_line, m.generated_column));

    let mut out = String::new();
    let mut line = 0;
    let mut previous_column = 0i64;
    let mut previous_source = 0i64;
    let mut previous_source_line = 0i64;
    let mut previous_source_column = 0i64;
    let mut first_in_line = true;

    for mapping in sorted {
        while line < mapping.generated_line {
            out.push(';');
            line += 1;
            previous_column = 0;
            first_in_line = true;
        }
        if !first_in_line {
            out.push(',');
        }
        first_in_line = false;

        let source = sources.iter().position(|s| *s == mapping.source).unwrap_or(0) as i64;
        let source_line = i64::from(mapping.source_line.saturating_sub(1));
        let source_column = i64::from(mapping.source_column.saturating_sub(1));
        let column = i64::from(mapping.generated_column);

        encode_vlq(column - previous_column, &mut out);
        encode_vlq(source - previous_source, &mut out);
        encode_vlq(source_line - previous_source_line, &mut out);
        encode_vlq(source_column - previous_source_column, &mut out);

        previous_column = column;
        previous_source = source;
        previous_source_line = source_line;
        previous_source_column = source_column;
    }
    out
}

/// Append one Base64 VLQ value: sign in the lowest bit, five data bits per
/// digit, continuation in bit six.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };
    loop {
        let mut digit = (vlq & 0b1_1111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b10_0000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vlq(value: i64) -> String {
        let mut out = String::new();
        encode_vlq(value, &mut out);
        out
    }

    fn mapping(line: u32, column: u32, source: &str, source_line: u32, source_column: u32) -> Mapping {
        Mapping {
            generated_line: line,
            generated_column: column,
            source: source.into(),
            source_line,
            source_column,
        }
    }

    #[test]
    fn test_vlq_digits() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn test_mappings_string() {
        let mappings = vec![
            mapping(1, 2, "a.scss", 2, 3),
            mapping(2, 2, "a.scss", 3, 3),
        ];
        let map = SourceMapGenerator::generate(&mappings, "a.scss", Some("a.css"), &SourceMapOptions::default());
        assert_eq!(map.mappings, ";EACE;EAAC");
        assert_eq!(map.sources, vec!["a.scss"]);
        assert_eq!(map.file.as_deref(), Some("a.css"));
    }

    #[test]
    fn test_second_source_is_indexed() {
        let mappings = vec![mapping(0, 0, "a.scss", 1, 1), mapping(0, 4, "_b.scss", 1, 1)];
        let map = SourceMapGenerator::generate(&mappings, "a.scss", None, &SourceMapOptions::default());
        assert_eq!(map.sources, vec!["a.scss", "_b.scss"]);
        assert_eq!(map.mappings, "AAAA,ICAA");
    }

    #[test]
    fn test_json_field_names() {
        let options = SourceMapOptions {
            source_root: Some("/src".into()),
            contents: vec![("a.scss".into(), ".a { b: c; }".into())],
        };
        let map = SourceMapGenerator::generate(&[], "a.scss", None, &options);
        let json: serde_json::Value = serde_json::from_str(&map.to_json()).unwrap();
        assert_eq!(json["version"], 3);
        assert_eq!(json["sourceRoot"], "/src");
        assert_eq!(json["sourcesContent"][0], ".a { b: c; }");
        assert!(json.get("file").is_none());
        assert_eq!(SourceMap::from_json(&map.to_json()), Some(map));
    }
}
