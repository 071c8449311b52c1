//! A hand-assembled dialect used to drive the builder in tests
//!
//! The native tree is built by the test itself, with offsets into the
//! source passed to `parse`.

#![allow(dead_code)]

use ml_ast::builder::{Builder, DialectAdapter, NativeTree};
use ml_ast::{EndTagType, NativeParseError, NodeId, ParseOptions, ParserConfig, Result, SourceFile};

#[derive(Debug, Clone)]
pub enum Toy {
    Text(usize, usize),
    Element {
        start_tag: (usize, usize),
        end_tag: Option<(usize, usize)>,
        children: Vec<Toy>,
    },
    /// A text node that claims to be a root wherever it appears
    Misplaced(usize, usize),
    /// A native parse failure at the given range
    Broken(usize, usize),
}

pub fn text(start: usize, end: usize) -> Toy {
    Toy::Text(start, end)
}

pub fn element(start_tag: (usize, usize), end_tag: Option<(usize, usize)>, children: Vec<Toy>) -> Toy {
    Toy::Element { start_tag, end_tag, children }
}

pub struct ToyAdapter {
    pub roots: Vec<Toy>,
    pub config: ParserConfig,
}

impl ToyAdapter {
    pub fn new(roots: Vec<Toy>) -> Self {
        ToyAdapter {
            roots,
            config: ParserConfig {
                end_tag_type: EndTagType::Omittable,
                ..ParserConfig::default()
            },
        }
    }
}

impl DialectAdapter for ToyAdapter {
    type Native = Toy;

    fn name(&self) -> &'static str {
        "toy"
    }

    fn config(&self) -> &ParserConfig {
        &self.config
    }

    fn tokenize(&self, source: &SourceFile, _options: &ParseOptions) -> Result<NativeTree<Toy>, NativeParseError> {
        if let Some(Toy::Broken(start, end)) = self.roots.first() {
            return Err(NativeParseError::new(source.content(), "Broken input", *start, *end));
        }
        Ok(NativeTree {
            roots: self.roots.clone(),
            is_fragment: true,
        })
    }

    fn nodeize(&self, cx: &mut Builder<'_, Self>, native: &Toy, parent: Option<NodeId>, depth: usize) -> Result<Vec<NodeId>> {
        match native {
            Toy::Text(start, end) => {
                let token = cx.child_token(*start, *end, parent, depth)?;
                cx.visit_text(token)
            }
            Toy::Element { start_tag, end_tag, children } => {
                let token = cx.child_token(start_tag.0, start_tag.1, parent, depth)?;
                let end_tag = *end_tag;
                cx.visit_element(token, children, move |cx| end_tag.map(|(start, end)| cx.slice(start, end)).transpose())
            }
            Toy::Misplaced(start, end) => {
                let token = cx.child_token(*start, *end, None, 0)?;
                cx.visit_text(token)
            }
            Toy::Broken(start, _) => {
                let token = cx.child_token(*start, *start, parent, depth)?;
                cx.visit_text(token)
            }
        }
    }

    fn is_void_element(&self, node_name: &str) -> bool {
        node_name.eq_ignore_ascii_case("br")
    }
}

/// `<div>a<p>b</p></div>`
pub const NESTED: &str = "<div>a<p>b</p></div>";

pub fn nested_tree() -> Vec<Toy> {
    vec![element(
        (0, 5),
        Some((14, 20)),
        vec![text(5, 6), element((6, 9), Some((10, 14)), vec![text(9, 10)])],
    )]
}
