//! Character cursor used by the dialect-native parsers

use crate::chars;

/// A forward-only cursor over a source string
#[derive(Debug, Clone)]
pub struct Cursor<'s> {
    src: &'s str,
    offset: usize,
}

impl<'s> Cursor<'s> {
    pub fn new(src: &'s str) -> Self {
        Cursor { src, offset: 0 }
    }

    pub fn source(&self) -> &'s str {
        self.src
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset.min(self.src.len());
    }

    pub fn is_eof(&self) -> bool {
        self.offset >= self.src.len()
    }

    pub fn rest(&self) -> &'s str {
        &self.src[self.offset..]
    }

    /// Current character, or [`chars::EOF`]
    pub fn peek(&self) -> char {
        self.rest().chars().next().unwrap_or(chars::EOF)
    }

    /// Character `n` positions ahead, or [`chars::EOF`]
    pub fn peek_at(&self, n: usize) -> char {
        self.rest().chars().nth(n).unwrap_or(chars::EOF)
    }

    pub fn advance(&mut self) {
        if let Some(ch) = self.rest().chars().next() {
            self.offset += ch.len_utf8();
        }
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    pub fn starts_with_ignore_case(&self, s: &str) -> bool {
        self.rest()
            .get(..s.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(s))
    }

    /// Consumes `s` if the cursor is at it
    pub fn eat(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.offset += s.len();
            true
        } else {
            false
        }
    }

    pub fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> &'s str {
        let start = self.offset;
        while !self.is_eof() && pred(self.peek()) {
            self.advance();
        }
        &self.src[start..self.offset]
    }

    pub fn skip_whitespace(&mut self) -> &'s str {
        self.eat_while(chars::is_whitespace)
    }

    /// Moves to the next occurrence of `needle` without consuming it
    pub fn seek(&mut self, needle: &str) -> bool {
        match self.rest().find(needle) {
            Some(index) => {
                self.offset += index;
                true
            }
            None => false,
        }
    }

    /// Moves to the next case-insensitive occurrence of an ASCII `needle`
    pub fn seek_ignore_case(&mut self, needle: &str) -> bool {
        let lowered = self.rest().to_ascii_lowercase();
        match lowered.find(&needle.to_ascii_lowercase()) {
            Some(index) => {
                self.offset += index;
                true
            }
            None => false,
        }
    }

    pub fn to_end(&mut self) {
        self.offset = self.src.len();
    }
}

/// Finds the byte offset of the `close` character that ends an expression
///
/// Scanning starts at `from` with depth zero. Nested brackets and JavaScript
/// string literals (including template literals with `${}` holes) are
/// skipped. Returns `None` when the expression is unterminated.
pub fn find_expression_end(src: &str, from: usize, close: char) -> Option<usize> {
    let mut stack: Vec<char> = Vec::new();
    let mut iter = src.get(from..)?.char_indices().peekable();
    while let Some((i, ch)) = iter.next() {
        let at = from + i;
        match ch {
            _ if stack.is_empty() && ch == close => return Some(at),
            '(' => stack.push(')'),
            '[' => stack.push(']'),
            '{' => stack.push('}'),
            ')' | ']' | '}' => {
                if stack.last() == Some(&ch) {
                    stack.pop();
                }
            }
            chars::SQ | chars::DQ => {
                let mut escaped = false;
                for (_, inner) in iter.by_ref() {
                    if escaped {
                        escaped = false;
                    } else if inner == chars::BACKSLASH {
                        escaped = true;
                    } else if inner == ch || inner == chars::LF {
                        break;
                    }
                }
            }
            chars::BT => {
                let end = find_template_literal_end(src, at + 1)?;
                while iter.peek().is_some_and(|&(j, _)| from + j <= end) {
                    iter.next();
                }
            }
            _ => {}
        }
    }
    None
}

fn find_template_literal_end(src: &str, from: usize) -> Option<usize> {
    let mut iter = src.get(from..)?.char_indices();
    let mut escaped = false;
    while let Some((i, ch)) = iter.next() {
        let at = from + i;
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            chars::BACKSLASH => escaped = true,
            chars::BT => return Some(at),
            chars::DOLLAR if src[at + 1..].starts_with(chars::LBRACE) => {
                let hole_end = find_expression_end(src, at + 2, chars::RBRACE)?;
                while let Some((j, _)) = iter.next() {
                    if from + j >= hole_end {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_walk_characters() {
        let mut cursor = Cursor::new("aé b");
        assert_eq!(cursor.peek(), 'a');
        cursor.advance();
        assert_eq!(cursor.peek(), 'é');
        cursor.advance();
        assert_eq!(cursor.offset(), 3);
        assert_eq!(cursor.skip_whitespace(), " ");
        assert_eq!(cursor.peek_at(1), chars::EOF);
        cursor.advance();
        assert!(cursor.is_eof());
        assert_eq!(cursor.peek(), chars::EOF);
    }

    #[test]
    fn should_eat_and_seek() {
        let mut cursor = Cursor::new("<!-- x --><P>");
        assert!(cursor.eat("<!--"));
        assert!(cursor.seek("-->"));
        assert_eq!(cursor.offset(), 7);
        assert!(cursor.starts_with("-->"));
        assert!(cursor.seek_ignore_case("<p"));
        assert!(cursor.starts_with_ignore_case("<p>"));
        assert!(!cursor.seek("missing"));
    }

    #[test]
    fn should_find_expression_end_with_nesting() {
        let src = "{a({b: 1}) + [2]}";
        assert_eq!(find_expression_end(src, 1, '}'), Some(src.len() - 1));
    }

    #[test]
    fn should_skip_strings_in_expressions() {
        let src = r#"{"}" + '\'}'}"#;
        assert_eq!(find_expression_end(src, 1, '}'), Some(src.len() - 1));
    }

    #[test]
    fn should_skip_template_literals() {
        let src = "{`a ${ {b: 1}.b } }`}";
        assert_eq!(find_expression_end(src, 1, '}'), Some(src.len() - 1));
    }

    #[test]
    fn should_report_unterminated_expression() {
        assert_eq!(find_expression_end("{a + (b", 1, '}'), None);
    }
}
