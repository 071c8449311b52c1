//! Plain HTML dialect
//!
//! Parses HTML with implied end tags into the shared markup AST.

pub mod tags;
pub mod tree;

use once_cell::sync::Lazy;
use regex::Regex;

use ml_ast::{
    Builder, DialectAdapter, Document, DoctypeNode, EndTagType, IgnoreTag, NativeParseError, NativeTree, NodeId,
    ParseOptions, ParserConfig, Result, SourceFile,
};

use crate::tags::get_html_tag_definition;
use crate::tree::{build_tree, HtmlNode, HtmlNodeKind};

/// A source starting with a doctype or `<html>` is a full document
static DOCUMENT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:<!doctype\s+html(?:\s[^>]*)?>|<html(?:\s|>))").unwrap());

static DOCTYPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)^<!doctype\s+([^\s>]+)(?:\s+(?:public\s+["']([^"']*)["']|system)(?:\s+["']([^"']*)["'])?)?"#,
    )
    .unwrap()
});

#[derive(Debug, Clone)]
pub struct HtmlParser {
    config: ParserConfig,
}

impl HtmlParser {
    pub fn new() -> Self {
        HtmlParser {
            config: ParserConfig {
                end_tag_type: EndTagType::Omittable,
                tag_name_case_sensitive: false,
                ignore_tags: vec![IgnoreTag::element("script"), IgnoreTag::element("style")],
            },
        }
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for HtmlParser {
    type Native = HtmlNode;

    fn name(&self) -> &'static str {
        "html"
    }

    fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn tokenize(&self, source: &SourceFile, options: &ParseOptions) -> Result<NativeTree<HtmlNode>, NativeParseError> {
        let content = source.content();
        let roots = build_tree(content, &self.config, options.ignore_front_matter)?;
        let markup_start = match roots.first() {
            Some(HtmlNode { kind: HtmlNodeKind::FrontMatter, end, .. }) => *end,
            _ => 0,
        };
        Ok(NativeTree {
            is_fragment: !DOCUMENT_START.is_match(&content[markup_start..]),
            roots,
        })
    }

    fn nodeize(&self, cx: &mut Builder<'_, Self>, native: &HtmlNode, parent: Option<NodeId>, depth: usize) -> Result<Vec<NodeId>> {
        let token = cx.child_token(native.start, native.end, parent, depth)?;
        match &native.kind {
            HtmlNodeKind::Text => cx.visit_text(token),
            HtmlNodeKind::Comment { bogus } => cx.visit_comment(token, *bogus),
            HtmlNodeKind::Doctype => {
                let doctype = parse_doctype(&token.token.raw);
                cx.visit_doctype(token, doctype)
            }
            HtmlNodeKind::StrayEndTag => cx.visit_stray_end_tag(token),
            HtmlNodeKind::FrontMatter => self.visit_ps_block(cx, token, "#front-matter", &[]),
            HtmlNodeKind::Cdata => self.visit_expression(cx, token, native),
            HtmlNodeKind::Element { start_tag_end, end_tag, .. } => {
                let start_tag = cx.child_token(native.start, *start_tag_end, parent, depth)?;
                let end_tag = *end_tag;
                cx.visit_element(start_tag, &native.children, |cx| {
                    end_tag.map(|(start, end)| cx.slice(start, end)).transpose()
                })
            }
        }
    }

    fn is_void_element(&self, node_name: &str) -> bool {
        get_html_tag_definition(node_name).is_void
    }
}

fn parse_doctype(raw: &str) -> DoctypeNode {
    let captures = DOCTYPE.captures(raw);
    let group = |index: usize| {
        captures
            .as_ref()
            .and_then(|caps| caps.get(index))
            .map_or_else(String::new, |m| m.as_str().to_string())
    };
    DoctypeNode {
        name: group(1),
        public_id: group(2),
        system_id: group(3),
    }
}

/// Parses an HTML source
pub fn parse(raw: &str, options: &ParseOptions) -> Result<Document> {
    ml_ast::parse(&HtmlParser::new(), raw, options)
}
