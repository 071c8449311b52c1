//! Generic node builder
//!
//! Drives a dialect adapter over a native tree and flattens it into the
//! document's node arena. The builder owns the invariants (pre-order, exact
//! spans, end tag pairing, parent/depth consistency); adapters translate
//! their native nodes by calling the `visit_*` primitives below.

use tracing::{debug, warn};

use crate::attr::{
    attr_tokenizer, AttrFlags, AttrState, Attribute, HtmlAttr, Quote, QuoteKind, SpreadAttr,
    DEFAULT_END_OF_UNQUOTED_VALUE, DEFAULT_QUOTE_SET,
};
use crate::chars;
use crate::config::{EndTagType, ParseOptions, ParserConfig};
use crate::control_flow::{normalize, ControlFlowNode};
use crate::document::Document;
use crate::error::{NativeParseError, ParserError, Result};
use crate::node::{
    detect_element_type, DoctypeNode, ElementNode, ElementType, EndTagNode, Namespace, Node, NodeData,
    NodeId, PsBlockNode,
};
use crate::parse_util::{SourceFile, SourceOffset, Token};

/// A token plus the tree position the adapter wants it placed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildToken {
    pub token: Token,
    pub depth: usize,
    pub parent: Option<NodeId>,
}

/// The native parser's output
#[derive(Debug, Clone)]
pub struct NativeTree<N> {
    pub roots: Vec<N>,
    pub is_fragment: bool,
}

/// Recognizer settings for one attribute
#[derive(Debug, Clone, Copy)]
pub struct AttrOptions<'q> {
    pub quote_set: &'q [Quote],
    pub start_state: AttrState,
    pub end_of_unquoted: &'q [char],
}

impl Default for AttrOptions<'static> {
    fn default() -> Self {
        AttrOptions {
            quote_set: DEFAULT_QUOTE_SET,
            start_state: AttrState::BeforeName,
            end_of_unquoted: DEFAULT_END_OF_UNQUOTED_VALUE,
        }
    }
}

/// Dialect hooks
///
/// `tokenize` and `nodeize` are required. Every other hook has a default
/// that delegates to the matching [`Builder`] primitive, so an adapter
/// overrides only what its dialect does differently.
pub trait DialectAdapter: Sized {
    type Native;

    fn name(&self) -> &'static str;

    fn config(&self) -> &ParserConfig;

    /// Runs the dialect-native parser
    fn tokenize(&self, source: &SourceFile, options: &ParseOptions) -> Result<NativeTree<Self::Native>, NativeParseError>;

    /// Translates one native node into zero or more top-level nodes
    fn nodeize(
        &self,
        cx: &mut Builder<'_, Self>,
        native: &Self::Native,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<Vec<NodeId>>;

    fn parse_error(&self, source: &SourceFile, error: NativeParseError) -> ParserError {
        let token = source
            .slice(error.start.min(error.end), error.end)
            .unwrap_or_else(|_| source.empty_token(error.start));
        ParserError::syntax(error.message, token)
    }

    /// Recognizes the first attribute of `token` (the rest of a start tag)
    fn visit_attr(&self, cx: &Builder<'_, Self>, token: Token) -> Result<Attribute> {
        cx.visit_attr(token, &AttrOptions::default())
    }

    /// Fallback for native nodes the adapter has no specific handling for
    fn visit_expression(&self, cx: &mut Builder<'_, Self>, token: ChildToken, _native: &Self::Native) -> Result<Vec<NodeId>> {
        cx.visit_ps_block(token, "#expression", &[])
    }

    fn visit_ps_block(
        &self,
        cx: &mut Builder<'_, Self>,
        token: ChildToken,
        node_name: &str,
        children: &[Self::Native],
    ) -> Result<Vec<NodeId>> {
        cx.visit_ps_block(token, node_name, children)
    }

    /// Visits `children` under `parent` and returns the nodes that came back
    /// at a different hierarchy level
    fn visit_children(&self, cx: &mut Builder<'_, Self>, children: &[Self::Native], parent: Option<NodeId>) -> Result<Vec<NodeId>> {
        cx.visit_children(children, parent)
    }

    fn detect_element_type(&self, node_name: &str) -> ElementType {
        detect_element_type(node_name, None)
    }

    /// Void elements never get an implied-close ghost
    fn is_void_element(&self, _node_name: &str) -> bool {
        false
    }
}

/// A parsed start tag
#[derive(Debug, Clone)]
pub struct StartTag {
    pub node_name: String,
    pub attributes: Vec<Attribute>,
    pub self_closing: bool,
}

pub struct Builder<'a, A: DialectAdapter> {
    adapter: &'a A,
    source: &'a SourceFile,
    root_depth: usize,
    nodes: Vec<Node>,
}

impl<'a, A: DialectAdapter> Builder<'a, A> {
    pub fn new(adapter: &'a A, source: &'a SourceFile, root_depth: usize) -> Self {
        Builder {
            adapter,
            source,
            root_depth,
            nodes: Vec::new(),
        }
    }

    pub fn source(&self) -> &SourceFile {
        self.source
    }

    pub fn config(&self) -> &ParserConfig {
        self.adapter.config()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Slices `[start, end)` of the local source
    pub fn slice(&self, start: usize, end: usize) -> Result<Token> {
        self.source.slice(start, end)
    }

    pub fn child_token(&self, start: usize, end: usize, parent: Option<NodeId>, depth: usize) -> Result<ChildToken> {
        Ok(ChildToken {
            token: self.slice(start, end)?,
            depth,
            parent,
        })
    }

    /// Depth of nodes placed directly under `parent`
    pub fn child_depth(&self, parent: Option<NodeId>) -> usize {
        parent
            .and_then(|id| self.node(id))
            .map_or(self.root_depth, |node| node.depth + 1)
    }

    fn namespace_for(&self, parent: Option<NodeId>) -> Namespace {
        match parent.and_then(|id| self.node(id)) {
            None => Namespace::Html,
            Some(node) => match &node.data {
                NodeData::Element(el) => Namespace::for_children_of(&el.node_name, node.namespace),
                _ => node.namespace,
            },
        }
    }

    fn push(&mut self, token: ChildToken, namespace: Namespace, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes
            .push(Node::new(id, token.token, token.depth, token.parent, namespace, data));
        id
    }

    fn attach(&mut self, parent: Option<NodeId>, child: NodeId) {
        if let Some(children) = parent.and_then(|id| self.nodes.get_mut(id.0)).and_then(Node::children_mut) {
            children.push(child);
        }
    }

    /// Moves `id` (and its subtree's depths) under `parent` at `depth`
    fn relocate(&mut self, id: NodeId, parent: Option<NodeId>, depth: usize) {
        let Some(node) = self.nodes.get_mut(id.0) else { return };
        let delta = depth as isize - node.depth as isize;
        node.parent = parent;
        let mut stack: Vec<NodeId> = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0) {
                node.depth = (node.depth as isize + delta).max(0) as usize;
                stack.extend(node.children().iter().copied());
                if let NodeData::Element(el) = &node.data {
                    stack.extend(el.end_tag);
                }
            }
        }
    }

    /// Moves nodes that came back at the wrong level to the given level
    fn adopt_siblings(&mut self, siblings: Vec<NodeId>, parent: Option<NodeId>, depth: usize) -> Vec<NodeId> {
        for &id in &siblings {
            warn!(
                dialect = self.adapter.name(),
                node = id.0,
                depth,
                "re-parenting node returned at a different hierarchy level"
            );
            self.relocate(id, parent, depth);
        }
        siblings
    }

    pub fn visit_children(&mut self, children: &[A::Native], parent: Option<NodeId>) -> Result<Vec<NodeId>> {
        let adapter = self.adapter;
        let depth = self.child_depth(parent);
        let mut siblings = Vec::new();
        for child in children {
            for id in adapter.nodeize(self, child, parent, depth)? {
                let in_place = self
                    .node(id)
                    .is_some_and(|node| node.parent == parent && node.depth == depth);
                if in_place {
                    self.attach(parent, id);
                } else {
                    siblings.push(id);
                }
            }
        }
        Ok(siblings)
    }

    pub fn visit_text(&mut self, token: ChildToken) -> Result<Vec<NodeId>> {
        let namespace = self.namespace_for(token.parent);
        Ok(vec![self.push(token, namespace, NodeData::Text)])
    }

    pub fn visit_comment(&mut self, token: ChildToken, is_bogus: bool) -> Result<Vec<NodeId>> {
        let namespace = self.namespace_for(token.parent);
        Ok(vec![self.push(token, namespace, NodeData::Comment { is_bogus })])
    }

    pub fn visit_doctype(&mut self, token: ChildToken, doctype: DoctypeNode) -> Result<Vec<NodeId>> {
        Ok(vec![self.push(token, Namespace::Html, NodeData::Doctype(doctype))])
    }

    /// An end tag that closes nothing
    ///
    /// It is kept in the node list for losslessness but is nobody's child.
    pub fn visit_stray_end_tag(&mut self, token: ChildToken) -> Result<Vec<NodeId>> {
        let namespace = self.namespace_for(token.parent);
        let node_name = end_tag_name(&token.token.raw).to_string();
        let token = ChildToken { parent: None, ..token };
        self.push(token, namespace, NodeData::EndTag(EndTagNode { node_name, pair: None }));
        Ok(Vec::new())
    }

    /// Builds an element from its start tag `token`
    ///
    /// Children are visited first, then `end_tag` is asked for the closing
    /// tag. A missing end tag under [`EndTagType::Omittable`] produces a
    /// zero-length ghost at the implied close position.
    pub fn visit_element(
        &mut self,
        token: ChildToken,
        children: &[A::Native],
        end_tag: impl FnOnce(&Self) -> Result<Option<Token>>,
    ) -> Result<Vec<NodeId>> {
        let adapter = self.adapter;
        let start_tag = self.parse_start_tag(&token.token)?;
        let namespace = Namespace::of_element(&start_tag.node_name, self.namespace_for(token.parent));
        let (depth, parent) = (token.depth, token.parent);
        let node_name = start_tag.node_name.clone();
        let element = ElementNode {
            element_type: adapter.detect_element_type(&start_tag.node_name),
            node_name: start_tag.node_name,
            is_case_sensitive: adapter.config().tag_name_case_sensitive,
            attributes: start_tag.attributes,
            children: Vec::new(),
            end_tag: None,
            self_closing: start_tag.self_closing,
            is_implied_close: false,
        };
        let id = self.push(token, namespace, NodeData::Element(element));

        let siblings = adapter.visit_children(self, children, Some(id))?;

        match end_tag(self)? {
            Some(end) => {
                let end_name = end_tag_name(&end.raw).to_string();
                let end_id = self.push(
                    ChildToken { token: end, depth, parent },
                    namespace,
                    NodeData::EndTag(EndTagNode { node_name: end_name, pair: Some(id) }),
                );
                if let Some(NodeData::Element(el)) = self.nodes.get_mut(id.0).map(|node| &mut node.data) {
                    el.end_tag = Some(end_id);
                }
            }
            None if !start_tag.self_closing
                && adapter.config().end_tag_type == EndTagType::Omittable
                && !adapter.is_void_element(&node_name) =>
            {
                let close_at = self
                    .nodes
                    .last()
                    .map_or(0, |node| self.source.local(node.token.end_offset));
                let ghost = ChildToken {
                    token: self.source.empty_token(close_at),
                    depth,
                    parent,
                };
                self.push(ghost, namespace, NodeData::Ghost { node_name: node_name.clone() });
                if let Some(NodeData::Element(el)) = self.nodes.get_mut(id.0).map(|node| &mut node.data) {
                    el.is_implied_close = true;
                }
            }
            None => {}
        }

        let mut ids = vec![id];
        ids.extend(self.adopt_siblings(siblings, parent, depth));
        Ok(ids)
    }

    /// Builds one preprocessor-specific block owning `children`
    pub fn visit_ps_block(&mut self, token: ChildToken, node_name: &str, children: &[A::Native]) -> Result<Vec<NodeId>> {
        let adapter = self.adapter;
        let namespace = self.namespace_for(token.parent);
        let (depth, parent) = (token.depth, token.parent);
        let block = PsBlockNode {
            node_name: node_name.to_string(),
            children: Vec::new(),
        };
        let id = self.push(token, namespace, NodeData::PsBlock(block));
        let siblings = adapter.visit_children(self, children, Some(id))?;
        let mut ids = vec![id];
        ids.extend(self.adopt_siblings(siblings, parent, depth));
        Ok(ids)
    }

    /// Normalizes a control-flow construct into sibling blocks
    ///
    /// `token` spans the whole construct; each branch becomes one block at
    /// the construct's position through the adapter's `visit_ps_block`.
    pub fn visit_control_flow(&mut self, token: ChildToken, native: &A::Native) -> Result<Vec<NodeId>>
    where
        A::Native: ControlFlowNode,
    {
        let adapter = self.adapter;
        let source = self.source;
        let Some(normalized) = normalize(native, source)? else {
            return adapter.visit_ps_block(self, token, "#block", &[]);
        };
        let (depth, parent) = (token.depth, token.parent);
        let mut ids = Vec::new();

        for group in normalized.orphans {
            for child in group {
                ids.extend(adapter.nodeize(self, child, parent, depth)?);
            }
        }

        for branch in normalized.branches {
            let branch_token = self.child_token(branch.start, branch.end, parent, depth)?;
            let first = branch.children.first().copied().unwrap_or(&[]);
            let blocks = adapter.visit_ps_block(self, branch_token, &branch.role, first)?;
            let owner = blocks.first().copied();
            ids.extend(blocks);
            if let Some(owner) = owner {
                for group in branch.children.iter().skip(1) {
                    let siblings = adapter.visit_children(self, group, Some(owner))?;
                    ids.extend(self.adopt_siblings(siblings, parent, depth));
                }
            }
        }
        Ok(ids)
    }

    /// Splits a start tag into its name, attributes and self-closing slash
    pub fn parse_start_tag(&self, token: &Token) -> Result<StartTag> {
        let raw = token.raw.as_str();
        let base = self.source.local(token.start_offset);
        if !raw.starts_with(chars::LT) {
            return Err(ParserError::contract_violation("Start tag must begin with \"<\"", token.clone()));
        }
        let name_len = raw[1..].find(chars::is_name_end).unwrap_or(raw.len() - 1);
        let node_name = &raw[1..1 + name_len];
        if node_name.is_empty() {
            return Err(ParserError::syntax("Start tag has no name", token.clone()));
        }

        let adapter = self.adapter;
        let mut attributes = Vec::new();
        let mut offset = 1 + name_len;
        loop {
            let rest = &raw[offset..];
            let spaces = chars::leading_whitespace_len(rest);
            let trimmed = &rest[spaces..];
            if trimmed.is_empty() || trimmed.starts_with(chars::GT) || is_self_closing_end(trimmed) {
                break;
            }
            if trimmed.starts_with(chars::SLASH) {
                offset += spaces + 1;
                continue;
            }
            let attr = adapter.visit_attr(self, self.slice(base + offset, base + raw.len())?)?;
            let consumed = self.source.local(attr.token().end_offset).saturating_sub(base + offset);
            if consumed == 0 {
                let at = self.source.empty_token(base + offset + spaces);
                return Err(ParserError::syntax("Unrecognized attribute", at));
            }
            offset += consumed;
            attributes.push(attr);
        }

        Ok(StartTag {
            node_name: node_name.to_string(),
            attributes,
            self_closing: is_self_closing_end(raw[offset..].trim_start_matches(chars::is_whitespace)),
        })
    }

    /// Runs the attribute recognizer over `token` and locates every part
    ///
    /// A `{...expr}` recognized in the spread state becomes [`Attribute::Spread`].
    pub fn visit_attr(&self, token: Token, options: &AttrOptions<'_>) -> Result<Attribute> {
        let start = self.source.local(token.start_offset);
        let parts = attr_tokenizer(&token.raw, options.quote_set, options.start_state, options.end_of_unquoted)
            .map_err(|err| ParserError::syntax(err.message, self.source.empty_token(start + err.offset)))?;

        let mut at = start;
        let mut take = |part: &str| -> Result<Token> {
            let token = self.slice(at, at + part.len());
            at += part.len();
            token
        };
        let spaces_before_name = take(&parts.spaces_before_name)?;
        let name = take(&parts.name)?;
        let spaces_before_equal = take(&parts.spaces_before_equal)?;
        let equal = take(&parts.equal)?;
        let spaces_after_equal = take(&parts.spaces_after_equal)?;
        let start_quote = take(&parts.start_quote)?;
        let value = take(&parts.value)?;
        let end_quote = take(&parts.end_quote)?;

        let attr_start = self.source.local(name.start_offset);
        let attr_end = self.source.local(end_quote.end_offset);
        if parts.spread {
            return Ok(Attribute::Spread(SpreadAttr {
                spaces_before: spaces_before_name,
                token: self.slice(attr_start, attr_end)?,
            }));
        }
        let quote_kind = parts.quote.map(|quote| quote.kind);
        let mut flags = AttrFlags::empty();
        if quote_kind == Some(QuoteKind::Script) {
            flags |= AttrFlags::DYNAMIC_VALUE;
        }

        Ok(Attribute::Html(HtmlAttr {
            token: self.slice(attr_start, attr_end)?,
            spaces_before_name,
            name,
            spaces_before_equal,
            equal,
            spaces_after_equal,
            start_quote: (!start_quote.is_empty()).then_some(start_quote),
            value,
            end_quote: (!end_quote.is_empty()).then_some(end_quote),
            quote_kind,
            flags,
            potential_name: None,
        }))
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

fn is_self_closing_end(s: &str) -> bool {
    s.strip_prefix(chars::SLASH)
        .is_some_and(|rest| rest.trim_start_matches(chars::is_whitespace).starts_with(chars::GT))
}

/// `div` for `</div >`
pub fn end_tag_name(raw: &str) -> &str {
    let inner = raw.strip_prefix("</").unwrap_or(raw);
    let len = inner.find(chars::is_name_end).unwrap_or(inner.len());
    &inner[..len]
}

/// Parses `raw` with `adapter` into a document
pub fn parse<A: DialectAdapter>(adapter: &A, raw: &str, options: &ParseOptions) -> Result<Document> {
    let source = SourceFile::with_offset(raw, SourceOffset::from(options));
    debug!(dialect = adapter.name(), bytes = raw.len(), "parsing source");

    let tree = adapter
        .tokenize(&source, options)
        .map_err(|err| adapter.parse_error(&source, err))?;

    let mut builder = Builder::new(adapter, &source, options.depth);
    let siblings = adapter.visit_children(&mut builder, &tree.roots, None)?;
    builder.adopt_siblings(siblings, None, options.depth);
    let nodes = builder.into_nodes();

    debug!(
        dialect = adapter.name(),
        nodes = nodes.len(),
        fragment = tree.is_fragment,
        "parsed source"
    );
    Ok(Document::new(nodes, raw, tree.is_fragment, None))
}
