//! Svelte dialect
//!
//! Maps the native Svelte tree onto the shared markup AST. Blocks go through
//! the control-flow normalizer; attributes get Svelte's directive, binding
//! and shorthand semantics.

pub mod parser;

use once_cell::sync::Lazy;
use regex::Regex;

use ml_ast::attr::{split_directive_name, DEFAULT_END_OF_UNQUOTED_VALUE};
use ml_ast::{
    chars, AttrFlags, AttrOptions, AttrState, Attribute, Builder, ChildToken, DialectAdapter, Document, ElementType,
    EndTagType, IgnoreTag, NativeParseError, NativeTree, NodeId, ParseOptions, ParserConfig, ParserError, Quote,
    QuoteKind, Result, SourceFile, Token,
};

use crate::parser::{svelte_parse, SvelteNode, SvelteNodeKind};

/// `Button`, `Namespace.Widget`
static COMPONENT_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]|\.").unwrap());

const SVELTE_QUOTE_SET: &[Quote] = &[
    Quote::new('"', '"', QuoteKind::String),
    Quote::new('\'', '\'', QuoteKind::String),
    Quote::new('{', '}', QuoteKind::Script),
];

/// `bind:` targets that are not properties of the element
const SPECIFIC_BIND_DIRECTIVES: &[&str] = &["group", "this"];

#[derive(Debug, Clone)]
pub struct SvelteParser {
    config: ParserConfig,
}

impl SvelteParser {
    pub fn new() -> Self {
        SvelteParser {
            config: ParserConfig {
                end_tag_type: EndTagType::Xml,
                tag_name_case_sensitive: true,
                ignore_tags: vec![IgnoreTag::element("script"), IgnoreTag::element("style")],
            },
        }
    }

    fn node_token(cx: &Builder<'_, Self>, id: NodeId) -> Token {
        cx.node(id)
            .map(|node| node.token.clone())
            .unwrap_or_else(|| cx.source().empty_token(0))
    }
}

impl Default for SvelteParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DialectAdapter for SvelteParser {
    type Native = SvelteNode;

    fn name(&self) -> &'static str {
        "svelte"
    }

    fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn tokenize(&self, source: &SourceFile, _options: &ParseOptions) -> Result<NativeTree<SvelteNode>, NativeParseError> {
        Ok(NativeTree {
            roots: svelte_parse(source.content(), &self.config)?,
            is_fragment: true,
        })
    }

    /// Keeps the native code frame in the message
    fn parse_error(&self, source: &SourceFile, error: NativeParseError) -> ParserError {
        let token = source
            .slice(error.start.min(error.end), error.end)
            .unwrap_or_else(|_| source.empty_token(error.start));
        ParserError::syntax(format!("{}\n{}", error.message, error.frame), token)
    }

    fn nodeize(&self, cx: &mut Builder<'_, Self>, native: &SvelteNode, parent: Option<NodeId>, depth: usize) -> Result<Vec<NodeId>> {
        let token = cx.child_token(native.start, native.end, parent, depth)?;
        match &native.kind {
            SvelteNodeKind::Text => cx.visit_text(token),
            SvelteNodeKind::Comment => cx.visit_comment(token, false),
            SvelteNodeKind::MustacheTag => self.visit_ps_block(cx, token, "MustacheTag", &[]),
            SvelteNodeKind::Element { start_tag_end, end_tag, .. } => {
                let start_tag = cx.child_token(native.start, *start_tag_end, parent, depth)?;
                let end_tag = *end_tag;
                cx.visit_element(start_tag, &native.children, |cx| {
                    end_tag.map(|(start, end)| cx.slice(start, end)).transpose()
                })
            }
            _ => self.visit_expression(cx, token, native),
        }
    }

    fn visit_attr(&self, cx: &Builder<'_, Self>, token: Token) -> Result<Attribute> {
        let shorthand = token.raw.trim_start_matches(chars::is_whitespace).starts_with(chars::LBRACE);
        let options = AttrOptions {
            quote_set: SVELTE_QUOTE_SET,
            start_state: if shorthand { AttrState::BeforeValue } else { AttrState::BeforeName },
            end_of_unquoted: DEFAULT_END_OF_UNQUOTED_VALUE,
        };
        let mut attr = match cx.visit_attr(token, &options)? {
            Attribute::Html(attr) => attr,
            spread => return Ok(spread),
        };

        let is_script_value = attr.quote_kind == Some(QuoteKind::Script);
        if is_script_value && attr.name.raw.is_empty() {
            attr.potential_name = Some(attr.value.raw.trim().to_string());
        }

        let (base_name, sub_name) = split_directive_name(&attr.name.raw);
        let sub_name = sub_name.filter(|sub| !sub.is_empty());
        let mut flags = attr.flags;
        let mut potential_name = attr.potential_name.take();
        if let Some(sub) = sub_name {
            flags |= AttrFlags::DIRECTIVE;
            if base_name == "bind" && !SPECIFIC_BIND_DIRECTIVES.contains(&sub) {
                potential_name = Some(sub.to_string());
                flags |= AttrFlags::DYNAMIC_VALUE;
            }
        }
        if base_name.eq_ignore_ascii_case("class") {
            flags |= AttrFlags::DUPLICATABLE;
            if sub_name.is_some() {
                potential_name = Some("class".to_string());
                flags |= AttrFlags::DYNAMIC_VALUE;
            }
        }
        attr.flags = flags;
        attr.potential_name = potential_name;
        Ok(Attribute::Html(attr))
    }

    /// Blocks and `{@...}` tags become one block per branch
    fn visit_expression(&self, cx: &mut Builder<'_, Self>, token: ChildToken, native: &SvelteNode) -> Result<Vec<NodeId>> {
        cx.visit_control_flow(token, native)
    }

    /// Exactly one block per call
    fn visit_ps_block(
        &self,
        cx: &mut Builder<'_, Self>,
        token: ChildToken,
        node_name: &str,
        children: &[SvelteNode],
    ) -> Result<Vec<NodeId>> {
        let fallback = token.token.clone();
        let ids = cx.visit_ps_block(token, node_name, children)?;
        if ids.len() == 1 {
            return Ok(ids);
        }
        let offending = ids.get(1).map_or(fallback, |&extra| Self::node_token(cx, extra));
        Err(ParserError::contract_violation("Parse error", offending))
    }

    /// Svelte trees never need re-parenting
    fn visit_children(&self, cx: &mut Builder<'_, Self>, children: &[SvelteNode], parent: Option<NodeId>) -> Result<Vec<NodeId>> {
        let siblings = cx.visit_children(children, parent)?;
        if let Some(&first) = siblings.first() {
            return Err(ParserError::contract_violation(
                "Discovered child nodes with differing hierarchy levels",
                Self::node_token(cx, first),
            ));
        }
        Ok(siblings)
    }

    fn detect_element_type(&self, node_name: &str) -> ElementType {
        ml_ast::node::detect_element_type(node_name, Some(&COMPONENT_NAME))
    }
}

/// Parses a Svelte component source
///
/// Front matter is never recognized in Svelte sources.
pub fn parse(raw: &str, options: &ParseOptions) -> Result<Document> {
    let options = ParseOptions {
        ignore_front_matter: false,
        ..options.clone()
    };
    ml_ast::parse(&SvelteParser::new(), raw, &options)
}
