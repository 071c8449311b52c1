//! HTML Tag Definitions
//!
//! Parsing rules for the native tree builder: void elements, implied end
//! tags and raw-text content.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

/// How an element's content is tokenized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagContentType {
    /// `<script>`, `<style>`: no markup, no entities
    RawText,
    /// `<textarea>`, `<title>`: no markup
    EscapableRawText,
    ParsableData,
}

/// What the tree builder needs to know about one element
#[derive(Debug, Clone)]
pub struct HtmlTagDefinition {
    pub closed_by_children: HashSet<&'static str>,
    pub content_type: TagContentType,
    pub is_void: bool,
}

impl HtmlTagDefinition {
    pub fn new() -> Self {
        HtmlTagDefinition {
            closed_by_children: HashSet::new(),
            content_type: TagContentType::ParsableData,
            is_void: false,
        }
    }

    pub fn with_void(mut self, is_void: bool) -> Self {
        self.is_void = is_void;
        self
    }

    pub fn with_closed_by_children(mut self, children: &[&'static str]) -> Self {
        self.closed_by_children.extend(children.iter().copied());
        self
    }

    pub fn with_content_type(mut self, content_type: TagContentType) -> Self {
        self.content_type = content_type;
        self
    }

    /// Whether opening `name` implicitly ends this element
    pub fn is_closed_by_child(&self, name: &str) -> bool {
        self.is_void || self.closed_by_children.contains(name.to_ascii_lowercase().as_str())
    }

    pub fn is_raw_text(&self) -> bool {
        self.content_type != TagContentType::ParsableData
    }
}

impl Default for HtmlTagDefinition {
    fn default() -> Self {
        Self::new()
    }
}

const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "details", "div", "dl", "fieldset", "figcaption", "figure",
    "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "main", "menu", "nav", "ol",
    "p", "pre", "section", "table", "ul",
];

static TAG_DEFINITIONS: Lazy<HashMap<&'static str, HtmlTagDefinition>> = Lazy::new(|| {
    let mut defs: HashMap<&'static str, HtmlTagDefinition> = HashMap::new();

    for name in [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source", "track", "wbr",
    ] {
        defs.insert(name, HtmlTagDefinition::new().with_void(true));
    }

    defs.insert("p", HtmlTagDefinition::new().with_closed_by_children(P_CLOSERS));

    // table sections, rows and cells
    defs.insert("thead", HtmlTagDefinition::new().with_closed_by_children(&["tbody", "tfoot"]));
    defs.insert("tbody", HtmlTagDefinition::new().with_closed_by_children(&["tbody", "tfoot"]));
    defs.insert("tfoot", HtmlTagDefinition::new().with_closed_by_children(&["tbody"]));
    defs.insert("tr", HtmlTagDefinition::new().with_closed_by_children(&["tr"]));
    for cell in ["td", "th"] {
        defs.insert(cell, HtmlTagDefinition::new().with_closed_by_children(&["td", "th"]));
    }

    defs.insert("li", HtmlTagDefinition::new().with_closed_by_children(&["li"]));
    defs.insert("dt", HtmlTagDefinition::new().with_closed_by_children(&["dt", "dd"]));
    defs.insert("dd", HtmlTagDefinition::new().with_closed_by_children(&["dt", "dd"]));

    // ruby
    for ruby in ["rb", "rt", "rp"] {
        defs.insert(ruby, HtmlTagDefinition::new().with_closed_by_children(&["rb", "rt", "rtc", "rp"]));
    }
    defs.insert("rtc", HtmlTagDefinition::new().with_closed_by_children(&["rb", "rtc", "rp"]));

    defs.insert("optgroup", HtmlTagDefinition::new().with_closed_by_children(&["optgroup"]));
    defs.insert("option", HtmlTagDefinition::new().with_closed_by_children(&["option", "optgroup"]));

    for raw in ["script", "style"] {
        defs.insert(raw, HtmlTagDefinition::new().with_content_type(TagContentType::RawText));
    }
    for escapable in ["textarea", "title"] {
        defs.insert(
            escapable,
            HtmlTagDefinition::new().with_content_type(TagContentType::EscapableRawText),
        );
    }

    defs
});

static DEFAULT_TAG_DEFINITION: Lazy<HtmlTagDefinition> = Lazy::new(HtmlTagDefinition::new);

/// Tag names are matched case-insensitively
pub fn get_html_tag_definition(tag_name: &str) -> &'static HtmlTagDefinition {
    TAG_DEFINITIONS
        .get(tag_name)
        .or_else(|| TAG_DEFINITIONS.get(tag_name.to_ascii_lowercase().as_str()))
        .unwrap_or(&DEFAULT_TAG_DEFINITION)
}
