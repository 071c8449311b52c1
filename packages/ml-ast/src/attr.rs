//! Attribute recognizer
//!
//! A character state machine that splits the raw text following a tag name
//! into the parts of one attribute, leaving the rest of the tag untouched.

use bitflags::bitflags;
use serde_json::{json, Value};

use crate::chars;
use crate::cursor::find_expression_end;
use crate::parse_util::Token;

/// Recognizer states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrState {
    BeforeName,
    Name,
    BeforeEqual,
    BeforeValue,
    Value,
    UnquotedValue,
    AfterValue,
    /// `{...expr}`; the recognizer stops after the closing brace
    Spread,
}

/// Whether a quoted value is literal text or embedded script
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    String,
    Script,
}

/// A value delimiter pair recognized by a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub start: char,
    pub end: char,
    pub kind: QuoteKind,
}

impl Quote {
    pub const fn new(start: char, end: char, kind: QuoteKind) -> Self {
        Quote { start, end, kind }
    }
}

/// HTML attribute quotes
pub const DEFAULT_QUOTE_SET: &[Quote] = &[
    Quote::new(chars::DQ, chars::DQ, QuoteKind::String),
    Quote::new(chars::SQ, chars::SQ, QuoteKind::String),
];

/// Characters that end an unquoted value besides whitespace
///
/// A `/` is part of the value (`href=/a/b`); the start tag splitter decides
/// whether a trailing `/>` closes the element.
pub const DEFAULT_END_OF_UNQUOTED_VALUE: &[char] = &[chars::GT];

const SPREAD_START: &str = "{...";

/// The parts of one recognized attribute
///
/// Every part is a substring of the input; concatenating all parts and
/// `leftover` yields the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttrParts {
    pub spaces_before_name: String,
    pub name: String,
    pub spaces_before_equal: String,
    pub equal: String,
    pub spaces_after_equal: String,
    pub start_quote: String,
    pub value: String,
    pub end_quote: String,
    pub leftover: String,
    pub quote: Option<Quote>,
    /// Recognized as `{...expr}`; `value` holds `...expr`
    pub spread: bool,
}

impl AttrParts {
    /// Byte length of the recognized attribute, leading spaces excluded
    pub fn attr_len(&self) -> usize {
        self.name.len()
            + self.spaces_before_equal.len()
            + self.equal.len()
            + self.spaces_after_equal.len()
            + self.start_quote.len()
            + self.value.len()
            + self.end_quote.len()
    }
}

/// Recognizer failure, with the byte offset in the input where it happened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrError {
    pub message: String,
    pub offset: usize,
}

/// Runs the recognizer over `raw` starting in `state`
///
/// Script quotes nest: a value opened with `{` ends at the matching `}`.
/// An unquoted value ends at whitespace or one of `end_of_unquoted`. When the
/// quote set has a `{` script quote, a nameless `{...expr}` is a spread.
pub fn attr_tokenizer(
    raw: &str,
    quote_set: &[Quote],
    mut state: AttrState,
    end_of_unquoted: &[char],
) -> Result<AttrParts, AttrError> {
    let mut parts = AttrParts::default();
    let mut offset = 0;

    while offset < raw.len() {
        let rest = &raw[offset..];
        let Some(ch) = rest.chars().next() else { break };

        match state {
            AttrState::BeforeName => {
                if chars::is_whitespace(ch) {
                    parts.spaces_before_name.push(ch);
                } else if starts_spread(rest, quote_set) {
                    state = AttrState::Spread;
                    continue;
                } else if ch == chars::GT || (ch == chars::SLASH && rest[1..].trim_start().starts_with(chars::GT)) {
                    break;
                } else {
                    state = AttrState::Name;
                    continue;
                }
            }
            AttrState::Name => {
                if chars::is_whitespace(ch) {
                    state = AttrState::BeforeEqual;
                    continue;
                } else if ch == chars::EQ {
                    state = AttrState::BeforeValue;
                    parts.equal.push(ch);
                } else if ch == chars::GT || ch == chars::SLASH {
                    break;
                } else if parts.name.is_empty() || quote_for(quote_set, ch).is_none() {
                    parts.name.push(ch);
                } else {
                    break;
                }
            }
            AttrState::BeforeEqual => {
                if chars::is_whitespace(ch) {
                    parts.spaces_before_equal.push(ch);
                } else if ch == chars::EQ {
                    state = AttrState::BeforeValue;
                    parts.equal.push(ch);
                } else {
                    // a valueless attribute: give the spaces back to the next one
                    break;
                }
            }
            AttrState::BeforeValue => {
                if chars::is_whitespace(ch) {
                    if parts.equal.is_empty() && parts.name.is_empty() {
                        parts.spaces_before_name.push(ch);
                    } else {
                        parts.spaces_after_equal.push(ch);
                    }
                } else if parts.name.is_empty() && parts.equal.is_empty() && starts_spread(rest, quote_set) {
                    state = AttrState::Spread;
                    continue;
                } else if let Some(quote) = quote_for(quote_set, ch) {
                    parts.start_quote.push(ch);
                    parts.quote = Some(quote);
                    state = AttrState::Value;
                } else if ch == chars::GT {
                    break;
                } else {
                    state = AttrState::UnquotedValue;
                    continue;
                }
            }
            AttrState::Value => {
                let quote = parts.quote.unwrap_or(DEFAULT_QUOTE_SET[0]);
                let end = match quote.kind {
                    QuoteKind::String => rest.find(quote.end),
                    QuoteKind::Script => find_expression_end(rest, 0, quote.end),
                };
                let Some(end) = end else {
                    return Err(AttrError {
                        message: format!("Unclosed attribute value: expected \"{}\"", quote.end),
                        offset,
                    });
                };
                parts.value.push_str(&rest[..end]);
                parts.end_quote.push(quote.end);
                offset += end + quote.end.len_utf8();
                state = AttrState::AfterValue;
                continue;
            }
            AttrState::UnquotedValue => {
                if chars::is_whitespace(ch) || end_of_unquoted.contains(&ch) {
                    state = AttrState::AfterValue;
                    continue;
                }
                parts.value.push(ch);
            }
            AttrState::Spread => {
                let Some(end) = find_expression_end(rest, 1, chars::RBRACE) else {
                    return Err(AttrError {
                        message: "Unclosed spread attribute".to_string(),
                        offset,
                    });
                };
                parts.start_quote.push(chars::LBRACE);
                parts.value.push_str(&rest[1..end]);
                parts.end_quote.push(chars::RBRACE);
                parts.quote = quote_for(quote_set, chars::LBRACE);
                parts.spread = true;
                offset += end + 1;
                break;
            }
            AttrState::AfterValue => break,
        }
        offset += ch.len_utf8();
    }

    if state == AttrState::BeforeEqual {
        // spaces after a bare name belong to the next attribute
        let spaces = std::mem::take(&mut parts.spaces_before_equal);
        offset -= spaces.len();
    }
    parts.leftover = raw[offset..].to_string();
    Ok(parts)
}

fn quote_for(quote_set: &[Quote], ch: char) -> Option<Quote> {
    quote_set.iter().copied().find(|quote| quote.start == ch)
}

fn starts_spread(rest: &str, quote_set: &[Quote]) -> bool {
    rest.starts_with(SPREAD_START)
        && quote_for(quote_set, chars::LBRACE).is_some_and(|quote| quote.kind == QuoteKind::Script)
}

/// Splits `base:sub` on the first colon
///
/// `on:click|once` yields `("on", Some("click|once"))`; a name without a
/// colon yields `(name, None)`.
pub fn split_directive_name(name: &str) -> (&str, Option<&str>) {
    match name.split_once(chars::COLON) {
        Some((base, sub)) => (base, Some(sub)),
        None => (name, None),
    }
}

bitflags! {
    /// Classification flags of an attribute
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AttrFlags: u8 {
        const DYNAMIC_VALUE = 1 << 0;
        const DIRECTIVE = 1 << 1;
        const DUPLICATABLE = 1 << 2;
    }
}

/// A `name = "value"` attribute with all its parts located
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlAttr {
    /// The attribute from the name to the end quote
    pub token: Token,
    pub spaces_before_name: Token,
    pub name: Token,
    pub spaces_before_equal: Token,
    pub equal: Token,
    pub spaces_after_equal: Token,
    pub start_quote: Option<Token>,
    pub value: Token,
    pub end_quote: Option<Token>,
    pub quote_kind: Option<QuoteKind>,
    pub flags: AttrFlags,
    /// The name the attribute stands for when it is written in a shorthand
    pub potential_name: Option<String>,
}

impl HtmlAttr {
    pub fn node_name(&self) -> &str {
        &self.name.raw
    }

    pub fn base_name(&self) -> &str {
        split_directive_name(&self.name.raw).0
    }

    pub fn sub_name(&self) -> Option<&str> {
        split_directive_name(&self.name.raw).1
    }

    pub fn is_dynamic_value(&self) -> bool {
        self.flags.contains(AttrFlags::DYNAMIC_VALUE)
    }

    pub fn is_directive(&self) -> bool {
        self.flags.contains(AttrFlags::DIRECTIVE)
    }

    pub fn is_duplicatable(&self) -> bool {
        self.flags.contains(AttrFlags::DUPLICATABLE)
    }
}

/// A `{...props}` attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpreadAttr {
    pub token: Token,
    pub spaces_before: Token,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    Html(HtmlAttr),
    Spread(SpreadAttr),
}

impl Attribute {
    pub fn token(&self) -> &Token {
        match self {
            Attribute::Html(attr) => &attr.token,
            Attribute::Spread(attr) => &attr.token,
        }
    }

    /// `#spread` for spread attributes
    pub fn node_name(&self) -> &str {
        match self {
            Attribute::Html(attr) => attr.node_name(),
            Attribute::Spread(_) => "#spread",
        }
    }

    pub fn as_html(&self) -> Option<&HtmlAttr> {
        match self {
            Attribute::Html(attr) => Some(attr),
            Attribute::Spread(_) => None,
        }
    }

    /// The source covered by this attribute including its leading spaces
    pub fn full_raw(&self) -> String {
        match self {
            Attribute::Html(attr) => format!("{}{}", attr.spaces_before_name.raw, attr.token.raw),
            Attribute::Spread(attr) => format!("{}{}", attr.spaces_before.raw, attr.token.raw),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Attribute::Html(attr) => json!({
                "type": "html-attr",
                "nodeName": attr.node_name(),
                "raw": attr.token.raw,
                "startOffset": attr.token.start_offset,
                "endOffset": attr.token.end_offset,
                "startLine": attr.token.start_line,
                "startCol": attr.token.start_col,
                "name": attr.name.raw,
                "value": attr.value.raw,
                "startQuote": attr.start_quote.as_ref().map(|t| t.raw.as_str()),
                "endQuote": attr.end_quote.as_ref().map(|t| t.raw.as_str()),
                "isDynamicValue": attr.is_dynamic_value(),
                "isDirective": attr.is_directive(),
                "isDuplicatable": attr.is_duplicatable(),
                "potentialName": attr.potential_name,
            }),
            Attribute::Spread(attr) => json!({
                "type": "spread",
                "nodeName": "#spread",
                "raw": attr.token.raw,
                "startOffset": attr.token.start_offset,
                "endOffset": attr.token.end_offset,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT_QUOTES: &[Quote] = &[
        Quote::new('"', '"', QuoteKind::String),
        Quote::new('\'', '\'', QuoteKind::String),
        Quote::new('{', '}', QuoteKind::Script),
    ];

    fn tokenize(raw: &str) -> AttrParts {
        attr_tokenizer(raw, DEFAULT_QUOTE_SET, AttrState::BeforeName, DEFAULT_END_OF_UNQUOTED_VALUE).unwrap()
    }

    #[test]
    fn should_split_quoted_attribute() {
        let parts = tokenize(" data-Attr = 'db' b>");
        assert_eq!(parts.spaces_before_name, " ");
        assert_eq!(parts.name, "data-Attr");
        assert_eq!(parts.spaces_before_equal, " ");
        assert_eq!(parts.equal, "=");
        assert_eq!(parts.spaces_after_equal, " ");
        assert_eq!(parts.start_quote, "'");
        assert_eq!(parts.value, "db");
        assert_eq!(parts.end_quote, "'");
        assert_eq!(parts.leftover, " b>");
        assert_eq!(parts.quote.map(|q| q.kind), Some(QuoteKind::String));
        assert_eq!(parts.attr_len(), "data-Attr = 'db'".len());
    }

    #[test]
    fn should_split_unquoted_value() {
        let parts = tokenize(" data-attR=tr>");
        assert_eq!(parts.name, "data-attR");
        assert_eq!(parts.value, "tr");
        assert!(parts.start_quote.is_empty());
        assert_eq!(parts.leftover, ">");
    }

    #[test]
    fn should_keep_slashes_in_unquoted_values() {
        let parts = tokenize(" href=/path/to>");
        assert_eq!(parts.name, "href");
        assert_eq!(parts.value, "/path/to");
        assert_eq!(parts.leftover, ">");

        let parts = tokenize(" src=a/b.png alt=x>");
        assert_eq!(parts.value, "a/b.png");
        assert_eq!(parts.leftover, " alt=x>");
    }

    #[test]
    fn should_leave_spaces_after_bare_name() {
        let parts = tokenize(" hidden  id=a>");
        assert_eq!(parts.name, "hidden");
        assert!(parts.equal.is_empty());
        assert_eq!(parts.leftover, "  id=a>");
    }

    #[test]
    fn should_stop_at_end_of_tag() {
        let parts = tokenize(" />");
        assert!(parts.name.is_empty());
        assert_eq!(parts.spaces_before_name, " ");
        assert_eq!(parts.leftover, "/>");
    }

    #[test]
    fn should_nest_script_quotes() {
        let parts = attr_tokenizer(
            " on:click={() => { a = {b: '}'} }}>",
            SCRIPT_QUOTES,
            AttrState::BeforeName,
            DEFAULT_END_OF_UNQUOTED_VALUE,
        )
        .unwrap();
        assert_eq!(parts.name, "on:click");
        assert_eq!(parts.value, "() => { a = {b: '}'} }");
        assert_eq!(parts.end_quote, "}");
        assert_eq!(parts.leftover, ">");
        assert_eq!(parts.quote.map(|q| q.kind), Some(QuoteKind::Script));
    }

    #[test]
    fn should_start_before_value_for_shorthand() {
        let parts = attr_tokenizer("{x} a", SCRIPT_QUOTES, AttrState::BeforeValue, DEFAULT_END_OF_UNQUOTED_VALUE).unwrap();
        assert!(parts.name.is_empty());
        assert_eq!(parts.start_quote, "{");
        assert_eq!(parts.value, "x");
        assert_eq!(parts.leftover, " a");
    }

    #[test]
    fn should_end_in_spread_state() {
        let parts = attr_tokenizer(" {...props} a", SCRIPT_QUOTES, AttrState::BeforeName, DEFAULT_END_OF_UNQUOTED_VALUE)
            .unwrap();
        assert!(parts.spread);
        assert_eq!(parts.spaces_before_name, " ");
        assert!(parts.name.is_empty());
        assert_eq!(parts.value, "...props");
        assert_eq!(parts.leftover, " a");

        let shorthand = attr_tokenizer("{...{ a: 1 }}>", SCRIPT_QUOTES, AttrState::BeforeValue, DEFAULT_END_OF_UNQUOTED_VALUE)
            .unwrap();
        assert!(shorthand.spread);
        assert_eq!(shorthand.value, "...{ a: 1 }");
        assert_eq!(shorthand.leftover, ">");
    }

    #[test]
    fn should_not_spread_without_script_quotes() {
        let parts = tokenize(" {...props}>");
        assert!(!parts.spread);
        assert_eq!(parts.name, "{...props}");
    }

    #[test]
    fn should_fail_on_unclosed_quote() {
        let err = attr_tokenizer(" a=\"b>", DEFAULT_QUOTE_SET, AttrState::BeforeName, DEFAULT_END_OF_UNQUOTED_VALUE)
            .unwrap_err();
        assert_eq!(err.offset, 4);
    }

    #[test]
    fn should_split_directive_names() {
        assert_eq!(split_directive_name("bind:value"), ("bind", Some("value")));
        assert_eq!(split_directive_name("on:click|once"), ("on", Some("click|once")));
        assert_eq!(split_directive_name("xlink:href:x"), ("xlink", Some("href:x")));
        assert_eq!(split_directive_name("class"), ("class", None));
    }
}
