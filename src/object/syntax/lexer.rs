use super::token::{SYMBOLS, Token, TokenType, lookup_name};

/// Tokenizer for the expression and statement language.
///
/// Newlines are significant only outside brackets. Indentation is ignored:
/// there are no compound statements, so a script embedded with its host's
/// indentation still reads as a flat sequence of statements.
#[derive(Debug, Clone)]
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    depth: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            depth: 0,
        }
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_ignorable();

        let line = self.line;
        let column = self.column;
        let Some(ch) = self.peek(0) else {
            return Token::new(TokenType::Eof, "", line, column);
        };

        if ch == '\n' {
            self.advance();
            return Token::new(TokenType::Newline, "\\n", line, column);
        }
        if ch.is_ascii_digit() || (ch == '.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
            return self.read_number(line, column);
        }
        if ch == '\'' || ch == '"' {
            return self.read_string(TokenType::Str, false, line, column);
        }
        if ch.is_alphabetic() || ch == '_' {
            if let Some((token_type, raw, skip)) = self.string_prefix() {
                for _ in 0..skip {
                    self.advance();
                }
                return self.read_string(token_type, raw, line, column);
            }
            return self.read_name(line, column);
        }

        for (text, token_type) in SYMBOLS {
            if self.matches(text) {
                for _ in 0..text.chars().count() {
                    self.advance();
                }
                match token_type {
                    TokenType::LParen | TokenType::LBracket | TokenType::LBrace => self.depth += 1,
                    TokenType::RParen | TokenType::RBracket | TokenType::RBrace => {
                        self.depth = self.depth.saturating_sub(1)
                    }
                    _ => {}
                }
                return Token::new(*token_type, *text, line, column);
            }
        }

        self.advance();
        Token::new(TokenType::Illegal, format!("invalid character '{ch}'"), line, column)
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek(0)?;
        self.position += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn matches(&self, text: &str) -> bool {
        text.chars().enumerate().all(|(i, c)| self.peek(i) == Some(c))
    }

    fn skip_ignorable(&mut self) {
        while let Some(ch) = self.peek(0) {
            match ch {
                '\n' if self.depth > 0 => {
                    self.advance();
                }
                ' ' | '\t' | '\r' | '\x0c' => {
                    self.advance();
                }
                '\\' if self.peek(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '#' => {
                    while self.peek(0).is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_name(&mut self, line: usize, column: usize) -> Token {
        let mut name = String::new();
        while let Some(ch) = self.peek(0) {
            if !(ch.is_alphanumeric() || ch == '_') {
                break;
            }
            name.push(ch);
            self.advance();
        }
        Token::new(lookup_name(&name), name, line, column)
    }

    /// Recognise `b'..'`, `r'..'`, `br'..'` and `rb'..'` prefixes.
    fn string_prefix(&self) -> Option<(TokenType, bool, usize)> {
        let mut prefix = String::new();
        let mut len = 0;
        while let Some(ch) = self.peek(len) {
            if ch == '\'' || ch == '"' {
                break;
            }
            if len == 2 || !matches!(ch, 'b' | 'B' | 'r' | 'R') {
                return None;
            }
            prefix.push(ch.to_ascii_lowercase());
            len += 1;
        }
        self.peek(len)?;
        match prefix.as_str() {
            "b" => Some((TokenType::Bytes, false, len)),
            "r" => Some((TokenType::Str, true, len)),
            "br" | "rb" => Some((TokenType::Bytes, true, len)),
            _ => None,
        }
    }

    fn read_string(&mut self, token_type: TokenType, raw: bool, line: usize, column: usize) -> Token {
        let Some(quote) = self.advance() else {
            return Token::new(TokenType::Illegal, "unexpected end of input", line, column);
        };
        let triple = self.peek(0) == Some(quote) && self.peek(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut text = String::new();
        loop {
            let Some(ch) = self.advance() else {
                let message = if triple {
                    "unterminated triple-quoted string literal"
                } else {
                    "unterminated string literal"
                };
                return Token::new(TokenType::Illegal, message, line, column);
            };
            if ch == quote {
                if !triple {
                    break;
                }
                if self.peek(0) == Some(quote) && self.peek(1) == Some(quote) {
                    self.advance();
                    self.advance();
                    break;
                }
                text.push(ch);
                continue;
            }
            if ch == '\n' && !triple {
                return Token::new(TokenType::Illegal, "unterminated string literal", line, column);
            }
            if ch == '\\' {
                if raw {
                    text.push(ch);
                    if let Some(next) = self.advance() {
                        text.push(next);
                    }
                    continue;
                }
                if let Err(message) = self.read_escape(token_type, &mut text) {
                    return Token::new(TokenType::Illegal, message, line, column);
                }
                continue;
            }
            if token_type == TokenType::Bytes && !ch.is_ascii() {
                return Token::new(
                    TokenType::Illegal,
                    "bytes can only contain ASCII literal characters",
                    line,
                    column,
                );
            }
            text.push(ch);
        }
        Token::new(token_type, text, line, column)
    }

    fn read_escape(&mut self, token_type: TokenType, text: &mut String) -> Result<(), String> {
        let Some(ch) = self.advance() else {
            return Err("unterminated string literal".to_string());
        };
        match ch {
            '\n' => {}
            '\\' | '\'' | '"' => text.push(ch),
            'n' => text.push('\n'),
            't' => text.push('\t'),
            'r' => text.push('\r'),
            '0' => text.push('\0'),
            'a' => text.push('\x07'),
            'b' => text.push('\x08'),
            'f' => text.push('\x0c'),
            'v' => text.push('\x0b'),
            'x' => text.push(self.read_hex(2, "\\xXX")?),
            'u' if token_type == TokenType::Str => text.push(self.read_hex(4, "\\uXXXX")?),
            'U' if token_type == TokenType::Str => text.push(self.read_hex(8, "\\UXXXXXXXX")?),
            other => {
                text.push('\\');
                text.push(other);
            }
        }
        Ok(())
    }

    fn read_hex(&mut self, digits: usize, form: &str) -> Result<char, String> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .peek(0)
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| format!("truncated {form} escape"))?;
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| format!("illegal Unicode character in {form} escape"))
    }

    fn read_number(&mut self, line: usize, column: usize) -> Token {
        let mut text = String::new();
        if self.peek(0) == Some('0')
            && let Some(radix) = self.peek(1).filter(|c| matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B'))
        {
            text.push('0');
            text.push(radix.to_ascii_lowercase());
            self.advance();
            self.advance();
            while let Some(ch) = self.peek(0) {
                if !(ch.is_ascii_alphanumeric() || ch == '_') {
                    break;
                }
                text.push(ch);
                self.advance();
            }
            return Token::new(TokenType::Int, text, line, column);
        }

        let mut is_float = false;
        self.read_digits(&mut text);
        if self.peek(0) == Some('.') {
            is_float = true;
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = matches!(self.peek(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digit_at {
                    text.extend(self.advance());
                }
                self.read_digits(&mut text);
            }
        }
        if self.peek(0).is_some_and(|c| c.is_alphabetic() || c == '_') {
            while self.peek(0).is_some_and(|c| c.is_alphanumeric() || c == '_') {
                self.advance();
            }
            return Token::new(TokenType::Illegal, "invalid decimal literal", line, column);
        }
        let token_type = if is_float { TokenType::Float } else { TokenType::Int };
        Token::new(token_type, text, line, column)
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.peek(0) {
            if ch.is_ascii_digit() {
                text.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        let mut lexer = Lexer::new(source);
        let mut out = Vec::new();
        loop {
            let token = lexer.next_token();
            if token.token_type == TokenType::Eof {
                return out;
            }
            out.push(token.token_type);
        }
    }

    fn first(source: &str) -> Token {
        Lexer::new(source).next_token()
    }

    #[test]
    fn operators_take_the_longest_match() {
        assert_eq!(
            types("a **= 2 // 3 <= 4"),
            vec![
                TokenType::Name,
                TokenType::DoubleStarAssign,
                TokenType::Int,
                TokenType::DoubleSlash,
                TokenType::Int,
                TokenType::Lte,
                TokenType::Int,
            ]
        );
    }

    #[test]
    fn newlines_inside_brackets_are_skipped() {
        assert_eq!(
            types("f(1,\n 2)\nx # note\n"),
            vec![
                TokenType::Name,
                TokenType::LParen,
                TokenType::Int,
                TokenType::Comma,
                TokenType::Int,
                TokenType::RParen,
                TokenType::Newline,
                TokenType::Name,
                TokenType::Newline,
            ]
        );
    }

    #[test]
    fn string_literals_decode_escapes() {
        assert_eq!(first(r#""a\tb\x41é""#).literal, "a\tbAé");
        assert_eq!(first(r"r'a\tb'").literal, "a\\tb");
        let bytes = first(r"b'\x00z'");
        assert_eq!(bytes.token_type, TokenType::Bytes);
        assert_eq!(bytes.literal, "\0z");
        assert_eq!(first("'''one\ntwo'''").literal, "one\ntwo");
    }

    #[test]
    fn numbers() {
        assert_eq!(first("1_000").literal, "1000");
        assert_eq!(first("0xff").token_type, TokenType::Int);
        assert_eq!(first("1.5e3").token_type, TokenType::Float);
        assert_eq!(first(".5").token_type, TokenType::Float);
        assert_eq!(first("3e").token_type, TokenType::Illegal);
    }

    #[test]
    fn malformed_input_yields_illegal_tokens() {
        let token = first("'open");
        assert_eq!(token.token_type, TokenType::Illegal);
        assert_eq!(token.literal, "unterminated string literal");
        assert_eq!(first("$").literal, "invalid character '$'");
    }
}
