//! Native HTML tree builder
//!
//! A forgiving tag-soup parser. It never reorders content: every byte of the
//! input ends up in exactly one node, and unclosed elements are simply closed
//! where the next markup implies it.

use ml_ast::chars;
use ml_ast::cursor::Cursor;
use ml_ast::{NativeParseError, ParserConfig};
use tracing::trace;

use crate::tags::get_html_tag_definition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlNodeKind {
    Doctype,
    Comment { bogus: bool },
    Text,
    Element {
        name: String,
        start_tag_end: usize,
        /// `[start, end)` of the explicit end tag
        end_tag: Option<(usize, usize)>,
    },
    /// An end tag that matched no open element
    StrayEndTag,
    FrontMatter,
    Cdata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlNode {
    pub kind: HtmlNodeKind,
    pub start: usize,
    pub end: usize,
    pub children: Vec<HtmlNode>,
}

impl HtmlNode {
    fn leaf(kind: HtmlNodeKind, start: usize, end: usize) -> Self {
        HtmlNode {
            kind,
            start,
            end,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            HtmlNodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Builds the native tree of `src`
pub fn build_tree(src: &str, config: &ParserConfig, ignore_front_matter: bool) -> Result<Vec<HtmlNode>, NativeParseError> {
    let mut builder = TreeBuilder {
        cursor: Cursor::new(src),
        config,
        roots: Vec::new(),
        stack: Vec::new(),
    };
    if ignore_front_matter {
        builder.consume_front_matter();
    }
    while !builder.cursor.is_eof() {
        builder.step()?;
    }
    while !builder.stack.is_empty() {
        builder.close_top(None);
    }
    Ok(builder.roots)
}

struct TreeBuilder<'s, 'c> {
    cursor: Cursor<'s>,
    config: &'c ParserConfig,
    roots: Vec<HtmlNode>,
    /// Open elements, innermost last
    stack: Vec<HtmlNode>,
}

impl<'s, 'c> TreeBuilder<'s, 'c> {
    fn step(&mut self) -> Result<(), NativeParseError> {
        let start = self.cursor.offset();
        if self.cursor.starts_with("<!--") {
            self.consume_until_after(4, "-->");
            self.add(HtmlNode::leaf(HtmlNodeKind::Comment { bogus: false }, start, self.cursor.offset()));
        } else if self.cursor.starts_with("<![CDATA[") {
            self.consume_until_after(9, "]]>");
            self.add(HtmlNode::leaf(HtmlNodeKind::Cdata, start, self.cursor.offset()));
        } else if self.cursor.starts_with_ignore_case("<!doctype") {
            self.consume_until_after(9, ">");
            self.add(HtmlNode::leaf(HtmlNodeKind::Doctype, start, self.cursor.offset()));
        } else if self.cursor.starts_with("<!") || self.cursor.starts_with("<?") {
            self.consume_until_after(2, ">");
            self.add(HtmlNode::leaf(HtmlNodeKind::Comment { bogus: true }, start, self.cursor.offset()));
        } else if self.cursor.starts_with("</") && chars::is_ascii_letter(self.cursor.peek_at(2)) {
            self.consume_end_tag()?;
        } else if self.cursor.peek() == chars::LT && chars::is_ascii_letter(self.cursor.peek_at(1)) {
            self.consume_start_tag()?;
        } else {
            self.consume_text();
        }
        Ok(())
    }

    /// Skips `skip` bytes, then everything through `terminator` (or to EOF)
    fn consume_until_after(&mut self, skip: usize, terminator: &str) {
        self.cursor.set_offset(self.cursor.offset() + skip);
        if self.cursor.seek(terminator) {
            self.cursor.set_offset(self.cursor.offset() + terminator.len());
        } else {
            self.cursor.to_end();
        }
    }

    fn consume_front_matter(&mut self) {
        let src = self.cursor.source();
        let Some(body) = src.strip_prefix("---") else { return };
        let body_start = src.len() - body.len();
        if !body.starts_with(chars::LF) && !body.starts_with("\r\n") {
            return;
        }
        let Some(close) = body.find("\n---") else { return };
        let mut end = body_start + close + 4;
        let rest = &src[end..];
        let line_end = rest.find(chars::LF).map_or(rest.len(), |i| i + 1);
        if !rest[..line_end].trim().is_empty() {
            return;
        }
        end += line_end;
        self.cursor.set_offset(end);
        self.add(HtmlNode::leaf(HtmlNodeKind::FrontMatter, 0, end));
    }

    fn consume_text(&mut self) {
        let start = self.cursor.offset();
        self.cursor.advance();
        while !self.cursor.is_eof() && !self.at_markup() {
            self.cursor.advance();
        }
        self.add(HtmlNode::leaf(HtmlNodeKind::Text, start, self.cursor.offset()));
    }

    fn at_markup(&self) -> bool {
        if self.cursor.peek() != chars::LT {
            return false;
        }
        match self.cursor.peek_at(1) {
            chars::BANG | chars::QUESTION => true,
            chars::SLASH => chars::is_ascii_letter(self.cursor.peek_at(2)),
            ch => chars::is_ascii_letter(ch),
        }
    }

    fn read_tag_name(&mut self) -> &'s str {
        self.cursor.eat_while(|ch| !chars::is_name_end(ch))
    }

    /// Advances past the `>` that ends the current tag, skipping quoted values
    fn seek_tag_end(&mut self, tag_start: usize) -> Result<(), NativeParseError> {
        let mut after_equal = false;
        loop {
            let ch = self.cursor.peek();
            if self.cursor.is_eof() {
                let src = self.cursor.source();
                return Err(NativeParseError::new(src, "Unexpected end of file in tag", tag_start, src.len()));
            }
            self.cursor.advance();
            match ch {
                chars::GT => return Ok(()),
                chars::EQ => after_equal = true,
                chars::DQ | chars::SQ if after_equal => {
                    self.cursor.eat_while(|inner| inner != ch);
                    self.cursor.advance();
                    after_equal = false;
                }
                _ if chars::is_whitespace(ch) => {}
                _ => after_equal = false,
            }
        }
    }

    fn consume_start_tag(&mut self) -> Result<(), NativeParseError> {
        let start = self.cursor.offset();
        self.cursor.advance();
        let name = self.read_tag_name().to_string();
        self.seek_tag_end(start)?;
        let tag_end = self.cursor.offset();
        let src = self.cursor.source();
        let self_closing = src[start..tag_end - 1].trim_end_matches(chars::is_whitespace).ends_with(chars::SLASH);

        while self.top_is_closed_by(&name) {
            self.close_top(None);
        }

        let definition = get_html_tag_definition(&name);
        let mut element = HtmlNode::leaf(
            HtmlNodeKind::Element {
                name: name.clone(),
                start_tag_end: tag_end,
                end_tag: None,
            },
            start,
            tag_end,
        );

        if definition.is_void || self_closing {
            self.add(element);
        } else if let Some(close) = self.raw_text_close(&name) {
            if let Some(end) = self.consume_raw_text(&close, tag_end) {
                element.children.push(HtmlNode::leaf(HtmlNodeKind::Text, tag_end, end));
            }
            let end_tag_start = self.cursor.offset();
            if !self.cursor.is_eof() {
                self.cursor.set_offset(end_tag_start + close.len());
                self.seek_tag_end(end_tag_start)?;
                set_end_tag(&mut element, Some((end_tag_start, self.cursor.offset())));
            }
            element.end = self.cursor.offset();
            self.add(element);
        } else {
            self.stack.push(element);
        }
        Ok(())
    }

    /// Closing sequence when `name` holds raw text
    fn raw_text_close(&self, name: &str) -> Option<String> {
        if let Some(end) = self.config.raw_text_end(name) {
            return Some(end.to_string());
        }
        get_html_tag_definition(name)
            .is_raw_text()
            .then(|| format!("</{name}"))
    }

    /// Moves to `close` (or EOF) and returns the end of any raw text before it
    fn consume_raw_text(&mut self, close: &str, from: usize) -> Option<usize> {
        if !self.cursor.seek_ignore_case(close) {
            self.cursor.to_end();
        }
        let end = self.cursor.offset();
        (end > from).then_some(end)
    }

    fn consume_end_tag(&mut self) -> Result<(), NativeParseError> {
        let start = self.cursor.offset();
        self.cursor.set_offset(start + 2);
        let name = self.read_tag_name();
        self.seek_tag_end(start)?;
        let end = self.cursor.offset();

        let matched = self
            .stack
            .iter()
            .rposition(|open| open.name().is_some_and(|open_name| self.config.names_match(open_name, name)));
        match matched {
            Some(index) => {
                while self.stack.len() > index + 1 {
                    self.close_top(None);
                }
                self.close_top(Some((start, end)));
            }
            None => self.add(HtmlNode::leaf(HtmlNodeKind::StrayEndTag, start, end)),
        }
        Ok(())
    }

    fn top_is_closed_by(&self, name: &str) -> bool {
        self.stack
            .last()
            .and_then(HtmlNode::name)
            .is_some_and(|open| get_html_tag_definition(open).is_closed_by_child(name))
    }

    fn close_top(&mut self, end_tag: Option<(usize, usize)>) {
        let Some(mut element) = self.stack.pop() else { return };
        if end_tag.is_none() {
            trace!(element = element.name().unwrap_or_default(), offset = element.start, "implied end tag");
        }
        set_end_tag(&mut element, end_tag);
        element.end = match end_tag {
            Some((_, end)) => end,
            None => element.children.last().map_or(element.end, |child| child.end),
        };
        self.add(element);
    }

    fn add(&mut self, node: HtmlNode) {
        match self.stack.last_mut() {
            Some(open) => open.children.push(node),
            None => self.roots.push(node),
        }
    }
}

fn set_end_tag(element: &mut HtmlNode, tag: Option<(usize, usize)>) {
    if let HtmlNodeKind::Element { end_tag, .. } = &mut element.kind {
        *end_tag = tag;
    }
}
