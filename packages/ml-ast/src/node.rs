//! Node model
//!
//! Nodes live in a flat arena owned by the document, in source order. Tree
//! links are [`NodeId`] indices into that arena.

use std::cell::{Ref, RefCell};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::attr::Attribute;
use crate::parse_util::Token;

/// Index of a node in its document's node list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    EndTag,
    PsBlock,
    Ghost,
    Doctype,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Namespace {
    Html,
    Svg,
    MathMl,
}

impl Namespace {
    pub fn uri(self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
            Namespace::MathMl => "http://www.w3.org/1998/Math/MathML",
        }
    }

    /// Namespace of an element named `name` whose parent is in `parent`
    pub fn of_element(name: &str, parent: Namespace) -> Namespace {
        match parent {
            Namespace::Html if name.eq_ignore_ascii_case("svg") => Namespace::Svg,
            Namespace::Html if name.eq_ignore_ascii_case("math") => Namespace::MathMl,
            ns => ns,
        }
    }

    /// Namespace inherited by the children of an element
    pub fn for_children_of(name: &str, own: Namespace) -> Namespace {
        match own {
            Namespace::Svg if name == "foreignObject" || name.eq_ignore_ascii_case("foreignobject") => {
                Namespace::Html
            }
            ns => ns,
        }
    }
}

/// Who defines an element's semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Html,
    WebComponent,
    Authored,
}

static CUSTOM_ELEMENT_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z][a-z0-9._\-]*-[a-z0-9._\-]*$").expect("valid custom element pattern")
});

/// Classifies an element name
///
/// `authored` is the dialect's component pattern; a match wins over the
/// custom-element naming rule.
pub fn detect_element_type(name: &str, authored: Option<&Regex>) -> ElementType {
    if authored.is_some_and(|pattern| pattern.is_match(name)) {
        ElementType::Authored
    } else if CUSTOM_ELEMENT_NAME.is_match(name) {
        ElementType::WebComponent
    } else {
        ElementType::Html
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub node_name: String,
    pub element_type: ElementType,
    pub is_case_sensitive: bool,
    pub attributes: Vec<Attribute>,
    pub children: Vec<NodeId>,
    pub end_tag: Option<NodeId>,
    pub self_closing: bool,
    /// Closed implicitly; a ghost node marks where
    pub is_implied_close: bool,
}

impl ElementNode {
    pub fn attr(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| {
            if self.is_case_sensitive {
                attr.node_name() == name
            } else {
                attr.node_name().eq_ignore_ascii_case(name)
            }
        })
    }

    pub fn has_spread_attr(&self) -> bool {
        self.attributes.iter().any(|attr| matches!(attr, Attribute::Spread(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndTagNode {
    pub node_name: String,
    /// The matching start tag; `None` for a stray end tag
    pub pair: Option<NodeId>,
}

/// A dialect construct with no markup equivalent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsBlockNode {
    /// Construct role, e.g. `if`, `elseif`, `each`, `then`, `/if`, `MustacheTag`
    pub node_name: String,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctypeNode {
    pub name: String,
    pub public_id: String,
    pub system_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Element(ElementNode),
    Text,
    Comment { is_bogus: bool },
    EndTag(EndTagNode),
    PsBlock(PsBlockNode),
    /// Zero-length placeholder for a position with no source text
    Ghost { node_name: String },
    Doctype(DoctypeNode),
}

/// Metadata written by visitors during a pass
pub type Metadata = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub token: Token,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub namespace: Namespace,
    pub data: NodeData,
    meta: RefCell<Metadata>,
}

impl Node {
    pub fn new(id: NodeId, token: Token, depth: usize, parent: Option<NodeId>, namespace: Namespace, data: NodeData) -> Self {
        Node {
            id,
            token,
            depth,
            parent,
            namespace,
            data,
            meta: RefCell::new(Metadata::new()),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text => NodeKind::Text,
            NodeData::Comment { .. } => NodeKind::Comment,
            NodeData::EndTag(_) => NodeKind::EndTag,
            NodeData::PsBlock(_) => NodeKind::PsBlock,
            NodeData::Ghost { .. } => NodeKind::Ghost,
            NodeData::Doctype(_) => NodeKind::Doctype,
        }
    }

    pub fn raw(&self) -> &str {
        &self.token.raw
    }

    pub fn node_name(&self) -> &str {
        match &self.data {
            NodeData::Element(el) => &el.node_name,
            NodeData::Text => "#text",
            NodeData::Comment { .. } => "#comment",
            NodeData::EndTag(end) => &end.node_name,
            NodeData::PsBlock(block) => &block.node_name,
            NodeData::Ghost { node_name } => node_name,
            NodeData::Doctype(_) => "#doctype",
        }
    }

    pub fn is_ghost(&self) -> bool {
        matches!(self.data, NodeData::Ghost { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.data {
            NodeData::Element(el) => &el.children,
            NodeData::PsBlock(block) => &block.children,
            _ => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match &mut self.data {
            NodeData::Element(el) => Some(&mut el.children),
            NodeData::PsBlock(block) => Some(&mut block.children),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match &self.data {
            NodeData::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn as_ps_block(&self) -> Option<&PsBlockNode> {
        match &self.data {
            NodeData::PsBlock(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_end_tag(&self) -> Option<&EndTagNode> {
        match &self.data {
            NodeData::EndTag(end) => Some(end),
            _ => None,
        }
    }

    pub fn set_meta(&self, key: impl Into<String>, value: Value) {
        self.meta.borrow_mut().insert(key.into(), value);
    }

    pub fn meta(&self, key: &str) -> Option<Value> {
        self.meta.borrow().get(key).cloned()
    }

    pub fn metadata(&self) -> Ref<'_, Metadata> {
        self.meta.borrow()
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("index".into(), json!(self.id.0));
        obj.insert("kind".into(), json!(self.kind()));
        obj.insert("nodeName".into(), json!(self.node_name()));
        obj.insert("raw".into(), json!(self.token.raw));
        obj.insert("startOffset".into(), json!(self.token.start_offset));
        obj.insert("endOffset".into(), json!(self.token.end_offset));
        obj.insert("startLine".into(), json!(self.token.start_line));
        obj.insert("endLine".into(), json!(self.token.end_line));
        obj.insert("startCol".into(), json!(self.token.start_col));
        obj.insert("endCol".into(), json!(self.token.end_col));
        obj.insert("depth".into(), json!(self.depth));
        obj.insert("parent".into(), json!(self.parent.map(NodeId::index)));
        obj.insert("namespace".into(), json!(self.namespace.uri()));
        match &self.data {
            NodeData::Element(el) => {
                obj.insert("elementType".into(), json!(el.element_type));
                obj.insert("isCaseSensitive".into(), json!(el.is_case_sensitive));
                obj.insert(
                    "attributes".into(),
                    Value::Array(el.attributes.iter().map(Attribute::to_json).collect()),
                );
                obj.insert("selfClosing".into(), json!(el.self_closing));
                obj.insert("endTag".into(), json!(el.end_tag.map(NodeId::index)));
            }
            NodeData::EndTag(end) => {
                obj.insert("pair".into(), json!(end.pair.map(NodeId::index)));
            }
            NodeData::Comment { is_bogus } => {
                obj.insert("isBogus".into(), json!(is_bogus));
            }
            NodeData::Doctype(doctype) => {
                obj.insert("name".into(), json!(doctype.name));
                obj.insert("publicId".into(), json!(doctype.public_id));
                obj.insert("systemId".into(), json!(doctype.system_id));
            }
            NodeData::Text | NodeData::PsBlock(_) | NodeData::Ghost { .. } => {}
        }
        let children = self.children();
        if !children.is_empty() {
            obj.insert("children".into(), json!(children.iter().map(|c| c.0).collect::<Vec<_>>()));
        }
        let meta = self.meta.borrow();
        if !meta.is_empty() {
            obj.insert("meta".into(), json!(*meta));
        }
        Value::Object(obj)
    }
}
