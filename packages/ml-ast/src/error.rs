//! Error types for building and walking documents

use serde::Serialize;
use thiserror::Error;

use crate::node::NodeKind;
use crate::parse_util::{SourceFile, Token};

/// What part of the pipeline rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParserErrorKind {
    /// The dialect-native parser rejected the source
    Syntax,
    /// An adapter hook broke a builder invariant
    ContractViolation,
    /// A fragment range was negative, out of range or split a character
    Fragment,
}

/// A located parse failure
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{message} ({}:{})", .token.start_line, .token.start_col)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub message: String,
    pub token: Token,
}

impl ParserError {
    pub fn new(kind: ParserErrorKind, message: impl Into<String>, token: Token) -> Self {
        ParserError {
            kind,
            message: message.into(),
            token,
        }
    }

    pub fn syntax(message: impl Into<String>, token: Token) -> Self {
        Self::new(ParserErrorKind::Syntax, message, token)
    }

    pub fn contract_violation(message: impl Into<String>, token: Token) -> Self {
        Self::new(ParserErrorKind::ContractViolation, message, token)
    }

    pub fn line(&self) -> usize {
        self.token.start_line
    }

    pub fn col(&self) -> usize {
        self.token.start_col
    }

    pub fn raw(&self) -> &str {
        &self.token.raw
    }

    /// The message followed by the offending excerpt, e.g.
    /// `Unexpected token ("<div>[ERROR ->]{/if}")`
    pub fn contextual_message(&self, source: &SourceFile) -> String {
        let (before, after) = source.get_context(source.local(self.token.start_offset), 100, 3);
        format!("{} (\"{}[ERROR ->]{}\")", self.message, before, after)
    }
}

/// The error shape reported by dialect-native parsers
///
/// Offsets are local byte offsets into the parsed source.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct NativeParseError {
    pub message: String,
    pub start: usize,
    pub end: usize,
    /// Numbered source excerpt pointing at `start`
    pub frame: String,
}

impl NativeParseError {
    pub fn new(source: &str, message: impl Into<String>, start: usize, end: usize) -> Self {
        NativeParseError {
            message: message.into(),
            start,
            end,
            frame: crate::parse_util::code_frame(source, start, end),
        }
    }
}

/// A walk aborted because a visitor failed
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("visitor failed on node #{index} ({kind:?})")]
    Visitor {
        index: usize,
        kind: NodeKind,
        #[source]
        source: anyhow::Error,
    },
}

impl WalkError {
    /// Position of the failing node in the document's node list
    pub fn index(&self) -> usize {
        match self {
            WalkError::Visitor { index, .. } => *index,
        }
    }
}

/// Result type for parser operations
pub type Result<T, E = ParserError> = std::result::Result<T, E>;
