//! Parse Utilities
//!
//! Source files, location-exact tokens and the fragment slicer.

use serde::{Deserialize, Serialize};

use crate::chars;
use crate::config::ParseOptions;
use crate::error::{ParserError, ParserErrorKind};

/// A contiguous slice of the source with its location
///
/// Offsets are byte offsets into the (shifted) source, lines and columns are
/// 1-based and columns count characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub raw: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Token {
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn len(&self) -> usize {
        self.end_offset - self.start_offset
    }
}

/// Where a source starts when it is embedded in a larger file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceOffset {
    pub offset: usize,
    pub line: usize,
    pub col: usize,
}

impl Default for SourceOffset {
    fn default() -> Self {
        SourceOffset { offset: 0, line: 1, col: 1 }
    }
}

impl From<&ParseOptions> for SourceOffset {
    fn from(options: &ParseOptions) -> Self {
        SourceOffset {
            offset: options.offset_offset,
            line: options.offset_line.max(1),
            col: options.offset_column.max(1),
        }
    }
}

/// The raw source plus a line index
///
/// `wide_chars` holds the byte offset of every non-ASCII character with the
/// running count of bytes those characters add beyond one per character, so
/// columns are found by binary search instead of by counting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    content: String,
    line_starts: Vec<usize>,
    wide_chars: Vec<(usize, usize)>,
    base: SourceOffset,
}

impl SourceFile {
    pub fn new(content: impl Into<String>) -> Self {
        Self::with_offset(content, SourceOffset::default())
    }

    pub fn with_offset(content: impl Into<String>, base: SourceOffset) -> Self {
        let content = content.into();
        let line_starts = std::iter::once(0)
            .chain(content.match_indices(chars::LF).map(|(i, _)| i + 1))
            .collect();
        let mut surplus = 0;
        let wide_chars = content
            .char_indices()
            .filter(|(_, ch)| !ch.is_ascii())
            .map(|(at, ch)| {
                surplus += ch.len_utf8() - 1;
                (at, surplus)
            })
            .collect();
        SourceFile {
            content,
            line_starts,
            wide_chars,
            base,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn base(&self) -> SourceOffset {
        self.base
    }

    /// Converts a token offset back to an offset into `content()`
    pub fn local(&self, absolute: usize) -> usize {
        absolute.saturating_sub(self.base.offset)
    }

    /// 1-based line and column of a local byte offset
    pub fn location(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.content.len());
        let line_index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[line_index];
        let col = offset - line_start - (self.surplus_before(offset) - self.surplus_before(line_start)) + 1;
        if line_index == 0 {
            (self.base.line, col + self.base.col - 1)
        } else {
            (line_index + self.base.line, col)
        }
    }

    /// Extra bytes of the multi-byte characters starting before `offset`
    fn surplus_before(&self, offset: usize) -> usize {
        let count = self.wide_chars.partition_point(|&(at, _)| at < offset);
        count
            .checked_sub(1)
            .and_then(|last| self.wide_chars.get(last))
            .map_or(0, |&(_, surplus)| surplus)
    }

    /// Produces the token covering `[start, end)` of the local source
    pub fn slice(&self, start: usize, end: usize) -> Result<Token, ParserError> {
        if start > end || end > self.content.len() {
            return Err(ParserError::new(
                ParserErrorKind::Fragment,
                format!("Invalid fragment range {start}..{end} (source length {})", self.content.len()),
                self.empty_token(start.min(self.content.len())),
            ));
        }
        if !self.content.is_char_boundary(start) || !self.content.is_char_boundary(end) {
            return Err(ParserError::new(
                ParserErrorKind::Fragment,
                format!("Fragment range {start}..{end} splits a character"),
                self.empty_token(self.floor_boundary(start)),
            ));
        }
        Ok(self.token_unchecked(start, end))
    }

    /// A zero-length token at `offset`
    pub fn empty_token(&self, offset: usize) -> Token {
        let offset = self.floor_boundary(offset.min(self.content.len()));
        self.token_unchecked(offset, offset)
    }

    fn token_unchecked(&self, start: usize, end: usize) -> Token {
        let (start_line, start_col) = self.location(start);
        let (end_line, end_col) = self.location(end);
        Token {
            raw: self.content[start..end].to_string(),
            start_offset: start + self.base.offset,
            end_offset: end + self.base.offset,
            start_line,
            end_line,
            start_col,
            end_col,
        }
    }

    fn floor_boundary(&self, mut offset: usize) -> usize {
        while offset > 0 && !self.content.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    /// Return the source around a local offset
    /// Up to `max_chars` or `max_lines` on each side of the location
    pub fn get_context(&self, offset: usize, max_chars: usize, max_lines: usize) -> (String, String) {
        let offset = self.floor_boundary(offset.min(self.content.len()));
        let before_chars: Vec<char> = self.content[..offset].chars().rev().collect();
        let mut before = String::new();
        let mut lines = 0;
        for ch in before_chars.into_iter().take(max_chars) {
            if ch == chars::LF {
                lines += 1;
                if lines >= max_lines {
                    break;
                }
            }
            before.insert(0, ch);
        }

        let mut after = String::new();
        lines = 0;
        for ch in self.content[offset..].chars().take(max_chars) {
            if ch == chars::LF {
                lines += 1;
                if lines >= max_lines {
                    break;
                }
            }
            after.push(ch);
        }
        (before, after)
    }
}

/// Renders a numbered excerpt with a caret under the `start` position
///
/// ```text
/// 1: <div>
/// 2:   {#if a}
///        ^
/// 3: </div>
/// ```
pub fn code_frame(source: &str, start: usize, end: usize) -> String {
    let file = SourceFile::new(source);
    let (line, col) = file.location(start);
    let (end_line, end_col) = file.location(end);
    let lines: Vec<&str> = source.split(chars::LF).collect();
    let first = line.saturating_sub(2).max(1);
    let last = (line + 1).min(lines.len());
    let width = last.to_string().len();

    let mut frame = Vec::new();
    for number in first..=last {
        let text = lines[number - 1].trim_end_matches(chars::CR);
        frame.push(format!("{:>width$}: {}", number, text));
        if number == line {
            let prefix: String = text
                .chars()
                .take(col - 1)
                .map(|ch| if ch == chars::TAB { chars::TAB } else { chars::SPACE })
                .collect();
            let span = if end_line == line && end_col > col { end_col - col } else { 1 };
            frame.push(format!("{:>width$}  {}{}", "", prefix, "^".repeat(span)));
        }
    }
    frame.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compute_one_based_lines_and_columns() {
        let file = SourceFile::new("<div>\n\t<p>é</p>\n</div>");
        assert_eq!(file.location(0), (1, 1));
        assert_eq!(file.location(5), (1, 6));
        assert_eq!(file.location(6), (2, 1));
        assert_eq!(file.location(7), (2, 2));
        // `é` is two bytes but one column
        assert_eq!(file.location(12), (2, 6));
    }

    #[test]
    fn should_count_columns_past_wide_characters() {
        let file = SourceFile::new("日本\né😀x");
        assert_eq!(file.location(3), (1, 2));
        assert_eq!(file.location(6), (1, 3));
        assert_eq!(file.location(7), (2, 1));
        assert_eq!(file.location(9), (2, 2));
        assert_eq!(file.location(13), (2, 3));
        assert_eq!(file.location(14), (2, 4));
    }

    #[test]
    fn should_locate_tokens_on_a_long_single_line() {
        let unit = "<b>é</b>";
        let count = 50_000;
        let file = SourceFile::new(unit.repeat(count));
        let mut last = None;
        for index in 0..count {
            let start = index * unit.len();
            last = Some(file.slice(start, start + 3).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.start_line, 1);
        assert_eq!(last.start_col, (count - 1) * unit.chars().count() + 1);
        assert_eq!(last.end_col, last.start_col + 3);
    }

    #[test]
    fn should_slice_tokens_with_locations() {
        let file = SourceFile::new("ab\ncd");
        let token = file.slice(1, 4).unwrap();
        assert_eq!(token.raw, "b\nc");
        assert_eq!((token.start_offset, token.end_offset), (1, 4));
        assert_eq!((token.start_line, token.start_col), (1, 2));
        assert_eq!((token.end_line, token.end_col), (2, 2));
        assert_eq!(token.len(), token.raw.len());
    }

    #[test]
    fn should_slice_empty_tokens() {
        let file = SourceFile::new("abc");
        let token = file.slice(3, 3).unwrap();
        assert!(token.is_empty());
        assert_eq!((token.start_line, token.start_col), (1, 4));
    }

    #[test]
    fn should_reject_negative_and_out_of_range_fragments() {
        let file = SourceFile::new("abc");
        let err = file.slice(2, 1).unwrap_err();
        assert_eq!(err.kind, ParserErrorKind::Fragment);
        assert!(file.slice(0, 4).is_err());
    }

    #[test]
    fn should_reject_ranges_inside_a_character() {
        let file = SourceFile::new("é");
        assert!(file.slice(0, 1).is_err());
        assert!(file.slice(0, 2).is_ok());
    }

    #[test]
    fn should_shift_tokens_by_the_embedding_offset() {
        let file = SourceFile::with_offset("a\nb", SourceOffset { offset: 100, line: 10, col: 5 });
        let first = file.slice(0, 1).unwrap();
        assert_eq!((first.start_offset, first.start_line, first.start_col), (100, 10, 5));
        let second = file.slice(2, 3).unwrap();
        assert_eq!((second.start_offset, second.start_line, second.start_col), (102, 11, 1));
        assert_eq!(file.local(second.start_offset), 2);
    }

    #[test]
    fn should_get_context_around_offset() {
        let file = SourceFile::new("line1\nline2\nline3");
        let (before, after) = file.get_context(8, 100, 1);
        assert_eq!(before, "li");
        assert_eq!(after, "ne2");
    }

    #[test]
    fn should_render_code_frame() {
        let frame = code_frame("<div>\n  {#if a}\n</div>", 8, 9);
        assert_eq!(frame, "1: <div>\n2:   {#if a}\n     ^\n3: </div>");
    }
}
