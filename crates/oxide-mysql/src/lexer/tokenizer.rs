//! MySQL tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};

/// A lexer that tokenizes MySQL input.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_line(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.advance();
        }
    }

    /// `--` opens a comment only when whitespace, a control character or
    /// the end of input follows it. `1--1` is `1 - -1`.
    fn at_dash_comment(&self) -> bool {
        let rest = &self.input[self.pos..];
        rest.strip_prefix("--").is_some_and(|after| {
            after
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || c.is_control())
        })
    }

    /// Skips whitespace and comments (`-- `, `#` and `/* */`).
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            match (self.peek(), self.peek_next()) {
                (Some('#'), _) => self.skip_line(),
                (Some('-'), Some('-')) if self.at_dash_comment() => self.skip_line(),
                (Some('/'), Some('*')) => {
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                break;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Creates a span from start to current position.
    const fn make_span(&self) -> Span {
        Span::new(self.start, self.pos)
    }

    /// Creates a token with the current span.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.make_span())
    }

    fn is_word_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '$'
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().is_some_and(Self::is_word_char) {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(text.to_string())),
        }
    }

    /// Scans a backtick-quoted identifier.
    fn scan_quoted_identifier(&mut self) -> Token {
        self.advance();
        let mut name = String::new();

        loop {
            match self.advance() {
                Some('`') if self.peek() == Some('`') => {
                    self.advance();
                    name.push('`');
                }
                Some('`') => break,
                Some(c) => name.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated quoted identifier",
                    )));
                }
            }
        }

        self.make_token(TokenKind::Identifier(name))
    }

    /// Scans a number (integer or float).
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E')
            && self
                .peek_next()
                .is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-')
        {
            is_float = true;
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.input[self.start..self.pos];
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return self.make_token(TokenKind::Integer(i));
            }
        }
        // Out-of-range integers (e.g. BIGINT UNSIGNED bounds) degrade to floats.
        match text.parse::<f64>() {
            Ok(f) => self.make_token(TokenKind::Float(f)),
            Err(e) => self.make_token(TokenKind::Error(format!("Invalid number: {e}"))),
        }
    }

    /// Scans a string literal with MySQL backslash and doubled-quote escapes.
    fn scan_string(&mut self, quote: char) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.advance();
                        value.push(quote);
                    } else {
                        break;
                    }
                }
                Some('\\') => match self.advance() {
                    Some('0') => value.push('\0'),
                    Some('b') => value.push('\u{8}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('Z') => value.push('\u{1a}'),
                    // LIKE wildcards keep their backslash.
                    Some(c @ ('%' | '_')) => {
                        value.push('\\');
                        value.push(c);
                    }
                    Some(c) => value.push(c),
                    None => {
                        return self.make_token(TokenKind::Error(String::from(
                            "Unterminated string literal",
                        )));
                    }
                },
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated string literal",
                    )));
                }
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans a hex literal (X'...' or x'...').
    fn scan_blob(&mut self) -> Token {
        self.advance();
        self.advance();

        let mut hex_chars = String::new();
        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) if c.is_ascii_hexdigit() => hex_chars.push(c),
                Some(_) => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Invalid character in hex literal",
                    )));
                }
                None => {
                    return self
                        .make_token(TokenKind::Error(String::from("Unterminated hex literal")));
                }
            }
        }

        if hex_chars.len() % 2 != 0 {
            return self.make_token(TokenKind::Error(String::from(
                "Odd number of hex digits in hex literal",
            )));
        }

        let bytes = hex_chars
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|s| u8::from_str_radix(s, 16).ok())
            })
            .collect();
        self.make_token(TokenKind::Blob(bytes))
    }

    /// Scans `@name`, `@'quoted name'`, `@@name` and `@@scope.name`.
    fn scan_variable(&mut self) -> Token {
        let system = self.peek() == Some('@');
        if system {
            self.advance();
        }

        let name = match self.peek() {
            Some(q @ ('\'' | '"')) if !system => match self.scan_string(q).kind {
                TokenKind::String(name) => name,
                other => return self.make_token(other),
            },
            Some('`') if !system => match self.scan_quoted_identifier().kind {
                TokenKind::Identifier(name) => name,
                other => return self.make_token(other),
            },
            _ => {
                let name_start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| Self::is_word_char(c) || c == '.')
                {
                    self.advance();
                }
                self.input[name_start..self.pos].to_string()
            }
        };

        if name.is_empty() {
            return self.make_token(TokenKind::Error(String::from("Expected variable name")));
        }
        if system {
            self.make_token(TokenKind::SystemVariable(name))
        } else {
            self.make_token(TokenKind::Variable(name))
        }
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.advance() else {
            return self.make_token(TokenKind::Eof);
        };

        match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Star),
            '/' => self.make_token(TokenKind::Slash),
            '%' => self.make_token(TokenKind::Percent),
            '~' => self.make_token(TokenKind::BitNot),
            '^' => self.make_token(TokenKind::BitXor),
            '?' => self.make_token(TokenKind::Question),
            '.' => self.make_token(TokenKind::Dot),
            '=' => self.make_token(TokenKind::Eq),
            '@' => self.scan_variable(),
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    if self.peek() == Some('>') {
                        self.advance();
                        self.make_token(TokenKind::NullSafeEq)
                    } else {
                        self.make_token(TokenKind::LtEq)
                    }
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                }
                Some('<') => {
                    self.advance();
                    self.make_token(TokenKind::LeftShift)
                }
                _ => self.make_token(TokenKind::Lt),
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    self.make_token(TokenKind::GtEq)
                }
                Some('>') => {
                    self.advance();
                    self.make_token(TokenKind::RightShift)
                }
                _ => self.make_token(TokenKind::Gt),
            },
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    self.make_token(TokenKind::DoublePipe)
                } else {
                    self.make_token(TokenKind::BitOr)
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    self.make_token(TokenKind::DoubleAmpersand)
                } else {
                    self.make_token(TokenKind::BitAnd)
                }
            }

            '\'' | '"' => {
                self.pos = self.start;
                self.scan_string(c)
            }
            '`' => {
                self.pos = self.start;
                self.scan_quoted_identifier()
            }
            'X' | 'x' if self.peek() == Some('\'') => {
                self.pos = self.start;
                self.scan_blob()
            }
            c if c.is_ascii_digit() => {
                self.pos = self.start;
                self.scan_number()
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                self.pos = self.start;
                self.scan_identifier()
            }

            _ => self.make_token(TokenKind::Error(format!("Unexpected character: {c}"))),
        }
    }

    /// Tokenizes the entire input and returns all tokens, ending with EOF.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
