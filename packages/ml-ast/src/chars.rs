//! Characters the recognizers and the native dialect parsers branch on

/// Returned by cursors past the end of input
pub const EOF: char = '\0';

pub const TAB: char = '\t';
pub const LF: char = '\n';
pub const FF: char = '\x0C';
pub const CR: char = '\r';
pub const SPACE: char = ' ';

// markup delimiters
pub const LT: char = '<';
pub const GT: char = '>';
pub const SLASH: char = '/';
pub const EQ: char = '=';
pub const BANG: char = '!';
pub const QUESTION: char = '?';
pub const COLON: char = ':';

// template and script delimiters
pub const LBRACE: char = '{';
pub const RBRACE: char = '}';
pub const HASH: char = '#';
pub const AT: char = '@';
pub const DQ: char = '"';
pub const SQ: char = '\'';
pub const BT: char = '`';
pub const DOLLAR: char = '$';
pub const BACKSLASH: char = '\\';

/// HTML "ASCII whitespace": tab, LF, FF, CR and space
pub fn is_whitespace(ch: char) -> bool {
    ch == SPACE || ch == TAB || ch == LF || ch == CR || ch == FF
}

pub fn is_ascii_letter(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

/// Characters that end a tag name inside a start or end tag
pub fn is_name_end(ch: char) -> bool {
    is_whitespace(ch) || ch == SLASH || ch == GT || ch == EOF
}

/// Length in bytes of the leading whitespace run of `s`
pub fn leading_whitespace_len(s: &str) -> usize {
    s.len() - s.trim_start_matches(is_whitespace).len()
}
