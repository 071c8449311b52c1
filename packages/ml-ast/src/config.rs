//! Parser configuration
//!
//! [`ParserConfig`] is fixed per dialect, [`ParseOptions`] varies per call and
//! [`Ruleset`] is opaque data handed through to the document.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// How a dialect treats missing end tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndTagType {
    /// Every non-void element is closed explicitly or with a self-closing slash
    Xml,
    /// End tags may be implied by the following markup
    Omittable,
    /// Elements never have end tags
    Never,
}

/// A region whose content the native parser must treat as opaque raw text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreTag {
    pub kind: String,
    pub start: String,
    pub end: String,
}

impl IgnoreTag {
    pub fn new(kind: &str, start: &str, end: &str) -> Self {
        IgnoreTag {
            kind: kind.to_string(),
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    /// Raw-text element such as `<script>`: starts at `<name`, ends at `</name`
    pub fn element(name: &str) -> Self {
        Self::new(name, &format!("<{name}"), &format!("</{name}"))
    }

    /// Whether the region belongs to the element `name`
    pub fn is_element(&self, name: &str) -> bool {
        self.kind.eq_ignore_ascii_case(name) && self.start.eq_ignore_ascii_case(&format!("<{name}"))
    }
}

/// Dialect-level configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub end_tag_type: EndTagType,
    pub tag_name_case_sensitive: bool,
    pub ignore_tags: Vec<IgnoreTag>,
}

impl ParserConfig {
    /// Closing sequence of a raw-text element, if `name` is one
    pub fn raw_text_end(&self, name: &str) -> Option<&str> {
        self.ignore_tags
            .iter()
            .find(|tag| tag.is_element(name))
            .map(|tag| tag.end.as_str())
    }

    /// Compares tag names honoring the dialect's case sensitivity
    pub fn names_match(&self, a: &str, b: &str) -> bool {
        if self.tag_name_case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            end_tag_type: EndTagType::Omittable,
            tag_name_case_sensitive: false,
            ignore_tags: Vec::new(),
        }
    }
}

/// Per-invocation options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseOptions {
    /// Treat a leading `---` block as front matter
    pub ignore_front_matter: bool,
    /// Byte offset of the source inside an enclosing file
    pub offset_offset: usize,
    /// 1-based line of the source's first character inside an enclosing file
    pub offset_line: usize,
    /// 1-based column of the source's first character inside an enclosing file
    pub offset_column: usize,
    /// Depth assigned to root nodes
    pub depth: usize,
}

/// Opaque rule configuration attached to a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(default)]
    pub rules: IndexMap<String, serde_json::Value>,
}

impl Ruleset {
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.rules.get(name)
    }

    /// A rule is enabled unless it is absent or set to `false`
    pub fn is_enabled(&self, name: &str) -> bool {
        matches!(self.rules.get(name), Some(value) if value != &serde_json::Value::Bool(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_deserialize_parse_options_with_defaults() {
        let options: ParseOptions =
            serde_json::from_value(json!({ "ignoreFrontMatter": true, "offsetLine": 3 })).unwrap();
        assert!(options.ignore_front_matter);
        assert_eq!(options.offset_line, 3);
        assert_eq!(options.offset_offset, 0);
        assert_eq!(options.depth, 0);
    }

    #[test]
    fn should_keep_rule_order() {
        let ruleset = Ruleset::from_json(json!({
            "rules": { "b-rule": true, "a-rule": false, "c-rule": { "value": 1 } }
        }))
        .unwrap();
        let names: Vec<&str> = ruleset.rules.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["b-rule", "a-rule", "c-rule"]);
        assert!(ruleset.is_enabled("b-rule"));
        assert!(!ruleset.is_enabled("a-rule"));
        assert!(ruleset.is_enabled("c-rule"));
        assert!(!ruleset.is_enabled("missing"));
    }

    #[test]
    fn should_find_raw_text_end() {
        let config = ParserConfig {
            ignore_tags: vec![IgnoreTag::element("script"), IgnoreTag::element("style")],
            ..ParserConfig::default()
        };
        assert_eq!(config.raw_text_end("SCRIPT"), Some("</script"));
        assert_eq!(config.raw_text_end("div"), None);
        assert!(config.names_match("DIV", "div"));
    }
}
