//! Byte-indexed source reader shared by the command parser, the list parser
//! and the `expr` lexer.
//!
//! Invariants:
//! - `position` is a byte offset into `source` and always on a char boundary.
//! - `current()` is the decoded char at `position`, `None` at end of input.
//! - `line` counts newlines consumed so far, starting at 1.

#[derive(Debug, Clone)]
pub(crate) struct CharReader<'a> {
    source: &'a str,
    position: usize,
    line: usize,
}

impl<'a> CharReader<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
        }
    }

    pub(crate) fn current(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    pub(crate) fn peek(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next()?;
        chars.next()
    }

    pub(crate) fn at_end(&self) -> bool {
        self.position >= self.source.len()
    }

    pub(crate) fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        if ch == '\n' {
            self.line += 1;
        }
        self.position += ch.len_utf8();
        Some(ch)
    }

    pub(crate) fn starts_with(&self, text: &str) -> bool {
        self.source[self.position..].starts_with(text)
    }

    pub(crate) fn advance_by(&mut self, chars: usize) {
        for _ in 0..chars {
            if self.advance().is_none() {
                break;
            }
        }
    }

    pub(crate) fn skip_while(&mut self, mut predicate: impl FnMut(char) -> bool) {
        while let Some(ch) = self.current() {
            if !predicate(ch) {
                break;
            }
            self.advance();
        }
    }

    pub(crate) fn index(&self) -> usize {
        self.position
    }

    pub(crate) fn line(&self) -> usize {
        self.line
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end.min(self.source.len())]
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.source[self.position..]
    }

    /// Consume one backslash sequence (the reader sits on `\`) and append its
    /// substitution to `out`.
    pub(crate) fn backslash(&mut self, out: &mut String) {
        self.advance();
        let Some(ch) = self.advance() else {
            out.push('\\');
            return;
        };

        match ch {
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{b}'),
            '\n' => {
                self.skip_while(|c| c == ' ' || c == '\t');
                out.push(' ');
            }
            'x' => self.hex_escape(2, 'x', out),
            'u' => self.hex_escape(4, 'u', out),
            'U' => self.hex_escape(8, 'U', out),
            '0'..='7' => {
                let mut value = ch.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match self.current().and_then(|c| c.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            self.advance();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value & 0xFF).unwrap_or('?'));
            }
            other => out.push(other),
        }
    }

    fn hex_escape(&mut self, max_digits: usize, letter: char, out: &mut String) {
        let mut value = 0u32;
        let mut digits = 0;
        while digits < max_digits {
            match self.current().and_then(|c| c.to_digit(16)) {
                Some(digit) => {
                    value = value * 16 + digit;
                    digits += 1;
                    self.advance();
                }
                None => break,
            }
        }

        if digits == 0 {
            out.push(letter);
        } else {
            out.push(char::from_u32(value).unwrap_or('\u{FFFD}'));
        }
    }
}

/// Apply backslash substitution to a whole string.
pub(crate) fn unescape(text: &str) -> String {
    let mut reader = CharReader::new(text);
    let mut out = String::with_capacity(text.len());
    while let Some(ch) = reader.current() {
        if ch == '\\' {
            reader.backslash(&mut out);
        } else {
            out.push(ch);
            reader.advance();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{CharReader, unescape};

    #[test]
    fn tracks_lines_across_newlines() {
        let mut reader = CharReader::new("a\nb");
        assert_eq!(reader.line(), 1);
        reader.advance();
        reader.advance();
        assert_eq!(reader.current(), Some('b'));
        assert_eq!(reader.line(), 2);
    }

    #[test]
    fn eof_advance_is_stable() {
        let mut reader = CharReader::new("a");
        reader.advance();
        assert!(reader.at_end());
        assert_eq!(reader.advance(), None);
        assert_eq!(reader.index(), 1);
    }

    #[test]
    fn backslash_sequences() {
        assert_eq!(unescape(r"a\tb"), "a\tb");
        assert_eq!(unescape(r"\x41é"), "Aé");
        assert_eq!(unescape(r"\101"), "A");
        assert_eq!(unescape(r"\{\}"), "{}");
        assert_eq!(unescape("a\\\n    b"), "a b");
    }
}
