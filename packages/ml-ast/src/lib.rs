//! Markup AST core
//!
//! A location-exact, lossless node model for markup template dialects and
//! the dialect-independent machinery that builds it:
//!
//! - [`parse_util`]: fragment slicing and line/column mapping
//! - [`attr`]: the attribute recognizer
//! - [`builder`]: the generic node builder and the [`DialectAdapter`] hooks
//! - [`control_flow`]: normalization of block constructs into sibling blocks
//! - [`document`] and [`walker`]: the result and its ordered traversal

pub mod attr;
pub mod builder;
pub mod chars;
pub mod config;
pub mod control_flow;
pub mod cursor;
pub mod document;
pub mod error;
pub mod node;
pub mod parse_util;
pub mod walker;

pub use attr::{AttrFlags, AttrState, Attribute, HtmlAttr, Quote, QuoteKind, SpreadAttr};
pub use builder::{parse, AttrOptions, Builder, ChildToken, DialectAdapter, NativeTree};
pub use config::{EndTagType, IgnoreTag, ParseOptions, ParserConfig, Ruleset};
pub use control_flow::{Construct, ControlFlowNode};
pub use document::{Document, Rule};
pub use error::{NativeParseError, ParserError, ParserErrorKind, Result, WalkError};
pub use node::{
    DoctypeNode, ElementNode, ElementType, EndTagNode, Namespace, Node, NodeData, NodeId, NodeKind, PsBlockNode,
};
pub use parse_util::{SourceFile, Token};
pub use walker::Walker;
