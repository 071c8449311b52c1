//! Control-flow block normalizer
//!
//! Turns one native conditional/iteration/async construct into a flat,
//! ordered list of branch spans that tile the construct's source exactly.
//! Each branch covers a header (`{#if a}`, `{:else}`, `{:then v}`...) and
//! owns the native children written after it. A trailing closing branch
//! (`{/if}`) covers whatever remains.

use smallvec::SmallVec;

use crate::chars;
use crate::error::{ParserError, Result};
use crate::parse_util::SourceFile;

/// What a native construct is, from the normalizer's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    /// An `if` with an optional chain of `else if` and a final `else`
    Conditional,
    /// A construct made of named phases visited in a fixed order. The empty
    /// phase name is the construct itself.
    Phased {
        name: &'static str,
        phases: &'static [&'static str],
    },
}

/// Phases of an iteration block
pub const EACH_PHASES: &[&str] = &["", "else"];
/// Phases of an async block; `pending` is the construct's own body
pub const AWAIT_PHASES: &[&str] = &["pending", "then", "catch"];
/// `{#await p then v}`: the header opens the `then` phase
pub const AWAIT_THEN_PHASES: &[&str] = &["then", "catch"];
/// `{#await p catch e}`: the header opens the `catch` phase
pub const AWAIT_CATCH_PHASES: &[&str] = &["catch"];
/// Single-phase blocks such as `key` and `snippet`
pub const SINGLE_PHASE: &[&str] = &[""];

/// Access to a native control-flow node
///
/// Offsets are local byte offsets. `header_end` is where the node's own
/// header ends; its children are written after it.
pub trait ControlFlowNode: Sized {
    fn span(&self) -> (usize, usize);

    fn header_end(&self) -> usize;

    fn children(&self) -> &[Self];

    fn construct(&self) -> Option<Construct>;

    /// A named phase of a [`Construct::Phased`] node
    fn phase(&self, name: &str) -> Option<&Self>;

    /// The `else` branch of a conditional node
    fn alternate(&self) -> Option<&Self>;

    /// The nested conditional when an `else` branch is an `else if`
    fn else_if(&self) -> Option<&Self>;
}

/// One normalized branch
#[derive(Debug)]
pub struct Branch<'n, N> {
    /// `if`, `elseif`, `else`, `each`, `await`, `then`, `catch`, `/if`...
    pub role: String,
    pub start: usize,
    pub end: usize,
    /// Native child groups owned by this branch, in source order
    pub children: SmallVec<[&'n [N]; 1]>,
}

impl<'n, N> Branch<'n, N> {
    pub fn is_closing(&self) -> bool {
        self.role.starts_with(chars::SLASH)
    }
}

fn body_start<N: ControlFlowNode>(node: &N) -> usize {
    node.children().first().map_or(node.header_end(), |child| child.span().0)
}

fn body_end<N: ControlFlowNode>(node: &N) -> usize {
    node.children().last().map_or(node.header_end(), |child| child.span().1)
}

fn phase_role(construct: &str, phase: &str) -> String {
    match phase {
        "" | "pending" => construct.to_string(),
        other => other.to_string(),
    }
}

struct Tiler<'n, 's, N> {
    source: &'s SourceFile,
    origin: (usize, usize),
    branches: Vec<Branch<'n, N>>,
    /// Children of a headerless first branch
    orphans: Vec<&'n [N]>,
    cursor: usize,
}

impl<'n, 's, N: ControlFlowNode> Tiler<'n, 's, N> {
    fn new(source: &'s SourceFile, origin: &N) -> Self {
        let origin = origin.span();
        Tiler {
            source,
            origin,
            branches: Vec::new(),
            orphans: Vec::new(),
            cursor: origin.0,
        }
    }

    /// Emits the header `[cursor, body_start(node))` and moves past the body
    fn push(&mut self, role: String, node: &'n N) -> Result<()> {
        let start = self.cursor;
        let end = body_start(node);
        self.check(start, end)?;
        let children = node.children();
        if start == end {
            match self.branches.last_mut() {
                Some(prev) if !children.is_empty() => prev.children.push(children),
                Some(_) => {}
                None if !children.is_empty() => self.orphans.push(children),
                None => {}
            }
        } else {
            let mut groups = SmallVec::new();
            if !children.is_empty() {
                groups.push(children);
            }
            self.branches.push(Branch { role, start, end, children: groups });
        }
        self.cursor = body_end(node).max(end);
        Ok(())
    }

    fn close(mut self, name: &str) -> Result<(Vec<Branch<'n, N>>, Vec<&'n [N]>)> {
        let (_, origin_end) = self.origin;
        self.check(self.cursor, origin_end)?;
        let trailing = self.source.content().get(self.cursor..origin_end).unwrap_or_default();
        let start = self.cursor + chars::leading_whitespace_len(trailing);
        if start < origin_end {
            self.branches.push(Branch {
                role: format!("/{name}"),
                start,
                end: origin_end,
                children: SmallVec::new(),
            });
        }
        Ok((self.branches, self.orphans))
    }

    fn check(&self, start: usize, end: usize) -> Result<()> {
        if start > end {
            let (origin_start, origin_end) = self.origin;
            let token = self.source.slice(origin_start, origin_end)?;
            return Err(ParserError::syntax(
                format!("Control-flow branch has a negative span ({start}..{end})"),
                token,
            ));
        }
        Ok(())
    }
}

/// The result of normalizing one construct
#[derive(Debug)]
pub struct Normalized<'n, N> {
    pub branches: Vec<Branch<'n, N>>,
    /// Children that no emitted branch could own; they precede every branch
    /// and the caller visits them at the construct's own level
    pub orphans: Vec<&'n [N]>,
}

/// Normalizes `origin` into branches
///
/// Returns `Ok(None)` when the node is not a control-flow construct.
pub fn normalize<'n, N: ControlFlowNode>(origin: &'n N, source: &SourceFile) -> Result<Option<Normalized<'n, N>>> {
    let Some(construct) = origin.construct() else {
        return Ok(None);
    };
    let mut tiler = Tiler::new(source, origin);

    let closing_name = match construct {
        Construct::Conditional => {
            let mut current = origin;
            tiler.push("if".to_string(), current)?;
            while let Some(alternate) = current.alternate() {
                match alternate.else_if() {
                    Some(next) => {
                        tiler.push("elseif".to_string(), next)?;
                        current = next;
                    }
                    None => {
                        tiler.push("else".to_string(), alternate)?;
                        break;
                    }
                }
            }
            "if"
        }
        Construct::Phased { name, phases } => {
            let mut seen: SmallVec<[(usize, usize); 4]> = SmallVec::new();
            for &phase in phases {
                let node = match phase {
                    "" => origin,
                    _ => origin.phase(phase).unwrap_or(origin),
                };
                if seen.contains(&node.span()) {
                    continue;
                }
                seen.push(node.span());
                tiler.push(phase_role(name, phase), node)?;
            }
            name
        }
    };

    let (branches, orphans) = tiler.close(closing_name)?;
    Ok(Some(Normalized { branches, orphans }))
}
