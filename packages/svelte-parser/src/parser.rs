//! Native Svelte template parser
//!
//! Produces a tree close to the one the Svelte compiler exposes: elements
//! and components, text, comments, `{expr}` tags and the `{#...}` block
//! family with their `{:...}` branches. Expressions are skipped, never
//! parsed.

use ml_ast::chars;
use ml_ast::control_flow::{
    Construct, ControlFlowNode, AWAIT_CATCH_PHASES, AWAIT_PHASES, AWAIT_THEN_PHASES, EACH_PHASES, SINGLE_PHASE,
};
use ml_ast::cursor::{find_expression_end, Cursor};
use ml_ast::{NativeParseError, ParserConfig};
use ml_html_parser::tags::get_html_tag_definition;
use tracing::trace;

/// `{@...}` tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialTag {
    Html,
    Const,
    Debug,
    Render,
}

impl SpecialTag {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "html" => Some(SpecialTag::Html),
            "const" => Some(SpecialTag::Const),
            "debug" => Some(SpecialTag::Debug),
            "render" => Some(SpecialTag::Render),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpecialTag::Html => "html",
            SpecialTag::Const => "const",
            SpecialTag::Debug => "debug",
            SpecialTag::Render => "render",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvelteNodeKind {
    Text,
    Comment,
    /// Elements, components and `svelte:*` elements
    Element {
        name: String,
        start_tag_end: usize,
        end_tag: Option<(usize, usize)>,
    },
    MustacheTag,
    Special(SpecialTag),
    /// `{#if}`, or `{:else if}` when `else_if` is set
    IfBlock { else_if: bool },
    ElseBlock,
    EachBlock,
    /// `{#await}`; `shorthand` names the phase opened by its own header
    AwaitBlock { shorthand: Option<&'static str> },
    ThenBlock,
    CatchBlock,
    KeyBlock,
    SnippetBlock,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvelteNode {
    pub kind: SvelteNodeKind,
    pub start: usize,
    pub end: usize,
    /// End of the node's own `{...}` header (equal to `end` for leaves)
    pub header_end: usize,
    pub children: Vec<SvelteNode>,
    /// `{:else}` / `{:else if}` of an if block
    pub alternate: Option<Box<SvelteNode>>,
    /// Named `{:...}` branches of each and await blocks
    pub phases: Vec<(&'static str, SvelteNode)>,
}

impl SvelteNode {
    fn new(kind: SvelteNodeKind, start: usize, header_end: usize) -> Self {
        SvelteNode {
            kind,
            start,
            end: header_end,
            header_end,
            children: Vec::new(),
            alternate: None,
            phases: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            SvelteNodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Where the node's body ends
    fn body_end(&self) -> usize {
        self.children.last().map_or(self.header_end, |child| child.end)
    }
}

impl ControlFlowNode for SvelteNode {
    fn span(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    fn header_end(&self) -> usize {
        self.header_end
    }

    fn children(&self) -> &[Self] {
        &self.children
    }

    fn construct(&self) -> Option<Construct> {
        let phased = |name, phases| Some(Construct::Phased { name, phases });
        match self.kind {
            SvelteNodeKind::IfBlock { else_if: false } => Some(Construct::Conditional),
            SvelteNodeKind::EachBlock => phased("each", EACH_PHASES),
            SvelteNodeKind::AwaitBlock { shorthand: None } => phased("await", AWAIT_PHASES),
            SvelteNodeKind::AwaitBlock { shorthand: Some("then") } => phased("await", AWAIT_THEN_PHASES),
            SvelteNodeKind::AwaitBlock { shorthand: Some(_) } => phased("await", AWAIT_CATCH_PHASES),
            SvelteNodeKind::KeyBlock => phased("key", SINGLE_PHASE),
            SvelteNodeKind::SnippetBlock => phased("snippet", SINGLE_PHASE),
            SvelteNodeKind::Special(tag) => phased(tag.name(), SINGLE_PHASE),
            _ => None,
        }
    }

    fn phase(&self, name: &str) -> Option<&Self> {
        self.phases.iter().find(|(phase, _)| *phase == name).map(|(_, node)| node)
    }

    fn alternate(&self) -> Option<&Self> {
        self.alternate.as_deref()
    }

    fn else_if(&self) -> Option<&Self> {
        matches!(self.kind, SvelteNodeKind::IfBlock { else_if: true }).then_some(self)
    }
}

type ParseResult<T> = Result<T, NativeParseError>;

/// Parses a Svelte template into its native tree
pub fn svelte_parse(src: &str, config: &ParserConfig) -> ParseResult<Vec<SvelteNode>> {
    let mut parser = SvelteTemplateParser {
        cursor: Cursor::new(src),
        config,
    };
    let roots = parser.parse_nodes()?;
    if !parser.cursor.is_eof() {
        return Err(parser.unexpected());
    }
    Ok(roots)
}

struct SvelteTemplateParser<'s, 'c> {
    cursor: Cursor<'s>,
    config: &'c ParserConfig,
}

impl<'s, 'c> SvelteTemplateParser<'s, 'c> {
    fn error(&self, message: impl Into<String>, start: usize, end: usize) -> NativeParseError {
        NativeParseError::new(self.cursor.source(), message, start, end)
    }

    /// Error for a `{:...}`, `{/...}` or end tag nothing was waiting for
    fn unexpected(&self) -> NativeParseError {
        let start = self.cursor.offset();
        if self.cursor.starts_with("</") {
            let name = self.cursor.rest()[2..]
                .split(chars::is_name_end)
                .next()
                .unwrap_or_default();
            return self.error(
                format!("</{name}> attempted to close an element that was not open"),
                start,
                start + 2 + name.len(),
            );
        }
        self.error("Unexpected block tag", start, start + 2)
    }

    /// Parses siblings up to a branch tag, a block closer, an end tag or EOF
    fn parse_nodes(&mut self) -> ParseResult<Vec<SvelteNode>> {
        let mut nodes = Vec::new();
        while !self.cursor.is_eof() && !self.at_boundary() {
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn at_boundary(&self) -> bool {
        self.cursor.starts_with("{:") || self.cursor.starts_with("{/") || self.cursor.starts_with("</")
    }

    fn parse_node(&mut self) -> ParseResult<SvelteNode> {
        if self.cursor.starts_with("<!--") {
            self.parse_comment()
        } else if self.cursor.peek() == chars::LT && chars::is_ascii_letter(self.cursor.peek_at(1)) {
            self.parse_element()
        } else if self.cursor.peek() == chars::LBRACE {
            self.parse_mustache()
        } else {
            Ok(self.parse_text())
        }
    }

    fn parse_text(&mut self) -> SvelteNode {
        let start = self.cursor.offset();
        self.cursor.advance();
        while !self.cursor.is_eof() && !self.at_text_end() {
            self.cursor.advance();
        }
        SvelteNode::new(SvelteNodeKind::Text, start, self.cursor.offset())
    }

    fn at_text_end(&self) -> bool {
        match self.cursor.peek() {
            chars::LBRACE => true,
            chars::LT => {
                let next = self.cursor.peek_at(1);
                chars::is_ascii_letter(next) || next == chars::SLASH || self.cursor.starts_with("<!--")
            }
            _ => false,
        }
    }

    fn parse_comment(&mut self) -> ParseResult<SvelteNode> {
        let start = self.cursor.offset();
        self.cursor.set_offset(start + 4);
        if !self.cursor.seek("-->") {
            return Err(self.error("comment was left open", start, start + 4));
        }
        self.cursor.set_offset(self.cursor.offset() + 3);
        Ok(SvelteNode::new(SvelteNodeKind::Comment, start, self.cursor.offset()))
    }

    fn parse_element(&mut self) -> ParseResult<SvelteNode> {
        let start = self.cursor.offset();
        self.cursor.advance();
        let name = self.cursor.eat_while(|ch| !chars::is_name_end(ch)).to_string();
        let self_closing = self.seek_start_tag_end(start, &name)?;
        let start_tag_end = self.cursor.offset();
        let mut element = SvelteNode::new(
            SvelteNodeKind::Element {
                name: name.clone(),
                start_tag_end,
                end_tag: None,
            },
            start,
            start_tag_end,
        );
        if self_closing || get_html_tag_definition(&name).is_void && !name.starts_with(|ch: char| ch.is_ascii_uppercase()) {
            return Ok(element);
        }

        if let Some(close) = self.config.raw_text_end(&name) {
            let close = close.to_string();
            if !self.cursor.seek(&close) {
                return Err(self.error(format!("<{name}> was left open"), start, start_tag_end));
            }
            if self.cursor.offset() > start_tag_end {
                element
                    .children
                    .push(SvelteNode::new(SvelteNodeKind::Text, start_tag_end, self.cursor.offset()));
            }
        } else {
            element.children = self.parse_nodes()?;
        }

        let end_tag = self.parse_end_tag(&name, start, start_tag_end)?;
        element.end = end_tag.1;
        if let SvelteNodeKind::Element { end_tag: slot, .. } = &mut element.kind {
            *slot = Some(end_tag);
        }
        Ok(element)
    }

    /// Advances past the start tag and reports whether it self-closes
    fn seek_start_tag_end(&mut self, start: usize, name: &str) -> ParseResult<bool> {
        let src = self.cursor.source();
        loop {
            if self.cursor.is_eof() {
                return Err(self.error(format!("<{name}> start tag was left open"), start, src.len()));
            }
            let ch = self.cursor.peek();
            match ch {
                chars::GT => {
                    self.cursor.advance();
                    return Ok(false);
                }
                chars::SLASH if self.cursor.peek_at(1) == chars::GT => {
                    self.cursor.set_offset(self.cursor.offset() + 2);
                    return Ok(true);
                }
                chars::DQ | chars::SQ => {
                    let from = self.cursor.offset();
                    self.cursor.advance();
                    if !self.cursor.seek(if ch == chars::DQ { "\"" } else { "'" }) {
                        return Err(self.error("Unclosed attribute value", from, src.len()));
                    }
                    self.cursor.advance();
                }
                chars::LBRACE => {
                    let from = self.cursor.offset();
                    let Some(close) = find_expression_end(src, from + 1, chars::RBRACE) else {
                        return Err(self.error("Unclosed expression in attribute", from, src.len()));
                    };
                    self.cursor.set_offset(close + 1);
                }
                _ => self.cursor.advance(),
            }
        }
    }

    /// Consumes `</name>`; returns its span
    fn parse_end_tag(&mut self, name: &str, start: usize, start_tag_end: usize) -> ParseResult<(usize, usize)> {
        let at = self.cursor.offset();
        if self.cursor.is_eof() {
            return Err(self.error(format!("<{name}> was left open"), start, start_tag_end));
        }
        if !self.cursor.starts_with("</") {
            return Err(self.unexpected());
        }
        self.cursor.set_offset(at + 2);
        let closing = self.cursor.eat_while(|ch| !chars::is_name_end(ch));
        if !self.config.names_match(closing, name) {
            self.cursor.set_offset(at);
            return Err(self.error(
                format!("</{closing}> attempted to close <{name}>"),
                at,
                at + 2 + closing.len(),
            ));
        }
        self.cursor.skip_whitespace();
        if !self.cursor.eat(">") {
            return Err(self.error("Expected >", self.cursor.offset(), self.cursor.offset()));
        }
        Ok((at, self.cursor.offset()))
    }

    /// Reads a `{...}` tag at the cursor; returns the trimmed inner text
    fn read_tag(&mut self) -> ParseResult<&'s str> {
        let src = self.cursor.source();
        let start = self.cursor.offset();
        let Some(close) = find_expression_end(src, start + 1, chars::RBRACE) else {
            return Err(self.error("Unclosed mustache tag", start, src.len()));
        };
        self.cursor.set_offset(close + 1);
        Ok(src[start + 1..close].trim())
    }

    fn parse_mustache(&mut self) -> ParseResult<SvelteNode> {
        let start = self.cursor.offset();
        let inner = self.read_tag()?;
        let header_end = self.cursor.offset();
        if let Some(block) = inner.strip_prefix(chars::HASH) {
            let keyword = leading_word(block);
            trace!(keyword, offset = start, "opening block");
            return match keyword {
                "if" => self.parse_if_block(start, header_end, false),
                "each" => self.parse_each_block(start, header_end),
                "await" => self.parse_await_block(await_shorthand(block), start, header_end),
                "key" => self.parse_single_block(SvelteNodeKind::KeyBlock, "key", start, header_end),
                "snippet" => self.parse_single_block(SvelteNodeKind::SnippetBlock, "snippet", start, header_end),
                _ => Err(self.error(format!("Unknown block type \"{keyword}\""), start, header_end)),
            };
        }
        if let Some(tag) = inner.strip_prefix(chars::AT) {
            let keyword = leading_word(tag);
            let Some(special) = SpecialTag::from_keyword(keyword) else {
                return Err(self.error(format!("Unknown tag \"@{keyword}\""), start, header_end));
            };
            return Ok(SvelteNode::new(SvelteNodeKind::Special(special), start, header_end));
        }
        Ok(SvelteNode::new(SvelteNodeKind::MustacheTag, start, header_end))
    }

    fn parse_if_block(&mut self, start: usize, header_end: usize, else_if: bool) -> ParseResult<SvelteNode> {
        let mut block = SvelteNode::new(SvelteNodeKind::IfBlock { else_if }, start, header_end);
        block.children = self.parse_nodes()?;

        if self.cursor.starts_with("{:") {
            let branch_start = self.cursor.offset();
            let inner = self.read_tag()?;
            let branch_header_end = self.cursor.offset();
            let alternate = match inner[1..].trim_start() {
                "else" => {
                    let mut branch = SvelteNode::new(SvelteNodeKind::ElseBlock, branch_start, branch_header_end);
                    branch.children = self.parse_nodes()?;
                    branch.end = branch.body_end();
                    branch
                }
                other if is_else_if(other) => self.parse_if_block(branch_start, branch_header_end, true)?,
                _ => return Err(self.error("Expected {:else} or {:else if ...}", branch_start, branch_header_end)),
            };
            block.alternate = Some(Box::new(alternate));
        }

        if else_if {
            block.end = block.alternate.as_ref().map_or_else(|| block.body_end(), |alt| alt.end);
            return Ok(block);
        }
        self.expect_block_close("if", start)?;
        block.end = self.cursor.offset();
        Ok(block)
    }

    fn parse_each_block(&mut self, start: usize, header_end: usize) -> ParseResult<SvelteNode> {
        let mut block = SvelteNode::new(SvelteNodeKind::EachBlock, start, header_end);
        block.children = self.parse_nodes()?;
        if self.cursor.starts_with("{:") {
            let branch_start = self.cursor.offset();
            let inner = self.read_tag()?;
            let branch_header_end = self.cursor.offset();
            if inner[1..].trim_start() != "else" {
                return Err(self.error("Expected {:else}", branch_start, branch_header_end));
            }
            let mut branch = SvelteNode::new(SvelteNodeKind::ElseBlock, branch_start, branch_header_end);
            branch.children = self.parse_nodes()?;
            branch.end = branch.body_end();
            block.phases.push(("else", branch));
        }
        self.expect_block_close("each", start)?;
        block.end = self.cursor.offset();
        Ok(block)
    }

    fn parse_await_block(&mut self, shorthand: Option<&'static str>, start: usize, header_end: usize) -> ParseResult<SvelteNode> {
        let mut block = SvelteNode::new(SvelteNodeKind::AwaitBlock { shorthand }, start, header_end);
        block.children = self.parse_nodes()?;
        while self.cursor.starts_with("{:") {
            let branch_start = self.cursor.offset();
            let inner = self.read_tag()?;
            let branch_header_end = self.cursor.offset();
            let (phase, kind) = match leading_word(&inner[1..]) {
                "then" => ("then", SvelteNodeKind::ThenBlock),
                "catch" => ("catch", SvelteNodeKind::CatchBlock),
                _ => return Err(self.error("Expected {:then ...} or {:catch ...}", branch_start, branch_header_end)),
            };
            if shorthand == Some("catch") || shorthand == Some(phase) || block.phase(phase).is_some() {
                return Err(self.error(format!("Duplicate {{:{phase}}} block"), branch_start, branch_header_end));
            }
            let mut branch = SvelteNode::new(kind, branch_start, branch_header_end);
            branch.children = self.parse_nodes()?;
            branch.end = branch.body_end();
            block.phases.push((phase, branch));
        }
        self.expect_block_close("await", start)?;
        block.end = self.cursor.offset();
        Ok(block)
    }

    fn parse_single_block(&mut self, kind: SvelteNodeKind, name: &str, start: usize, header_end: usize) -> ParseResult<SvelteNode> {
        let mut block = SvelteNode::new(kind, start, header_end);
        block.children = self.parse_nodes()?;
        self.expect_block_close(name, start)?;
        block.end = self.cursor.offset();
        Ok(block)
    }

    fn expect_block_close(&mut self, name: &str, block_start: usize) -> ParseResult<()> {
        let at = self.cursor.offset();
        if self.cursor.is_eof() {
            return Err(self.error(format!("Block {{#{name}}} was left open"), block_start, block_start + 1));
        }
        if !self.cursor.starts_with("{/") {
            return Err(self.error(format!("Expected {{/{name}}}"), at, at + 2));
        }
        let inner = self.read_tag()?;
        if inner[1..].trim() != name {
            return Err(self.error(format!("Expected {{/{name}}}"), at, self.cursor.offset()));
        }
        Ok(())
    }
}

/// `await p then v` or `await p catch e`
fn await_shorthand(header: &str) -> Option<&'static str> {
    header.split_whitespace().skip(2).find_map(|word| match word {
        "then" => Some("then"),
        "catch" => Some("catch"),
        _ => None,
    })
}

fn leading_word(s: &str) -> &str {
    let s = s.trim_start();
    let len = s.find(|ch: char| !ch.is_ascii_alphanumeric()).unwrap_or(s.len());
    &s[..len]
}

/// `else if cond`
fn is_else_if(branch: &str) -> bool {
    branch
        .strip_prefix("else")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix("if"))
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(chars::is_whitespace))
}
