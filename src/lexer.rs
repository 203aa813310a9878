//! Lexer for Power Query M source
//!
//! Spaces and tabs are dropped; newlines and comments are kept as trivia so the
//! parser can attach leading `//` comments to definitions.

use crate::token::{Span, Token, TokenKind};

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    position: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        // A UTF-8 BOM is common in files saved by Power BI Desktop
        let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
        Self {
            input,
            chars: input.char_indices().peekable(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the entire input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Next token, trivia included
    pub fn next_token(&mut self) -> Token {
        self.skip_blanks();

        let start_pos = self.position;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '\r' | '\n' => self.lex_newline(),
                '"' => self.lex_text(),
                '#' => self.lex_hash_prefix(),
                '0'..='9' => self.lex_number(),
                '.' if self.peek_next_char().is_some_and(|c| c.is_ascii_digit()) => {
                    self.lex_number()
                }
                '/' => self.lex_slash(),
                '=' => self.lex_pair('>', TokenKind::FatArrow, TokenKind::Equal),
                '>' => self.lex_pair('=', TokenKind::GreaterThanEqual, TokenKind::GreaterThan),
                '?' => self.lex_pair('?', TokenKind::QuestionQuestion, TokenKind::Question),
                '<' => self.lex_less_than(),
                '.' => self.lex_dots(),
                c if is_identifier_start(c) => self.lex_identifier(),
                c => {
                    self.advance();
                    single_char_token(c).unwrap_or_else(|| TokenKind::Invalid(c.to_string()))
                }
            },
        };

        Token::new(kind, Span::new(start_pos, self.position, start_line, start_col))
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_next_char(&self) -> Option<char> {
        let mut iter = self.input[self.position..].chars();
        iter.next();
        iter.next()
    }

    fn advance(&mut self) -> Option<char> {
        let (pos, c) = self.chars.next()?;
        self.position = pos + c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_while<F>(&mut self, predicate: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut result = String::new();
        while let Some(c) = self.peek_char() {
            if !predicate(c) {
                break;
            }
            result.push(c);
            self.advance();
        }
        result
    }

    fn skip_blanks(&mut self) {
        self.advance_while(|c| c == ' ' || c == '\t' || c == '\u{00A0}');
    }

    fn lex_pair(&mut self, second: char, joined: TokenKind, single: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some(second) {
            self.advance();
            joined
        } else {
            single
        }
    }

    fn lex_newline(&mut self) -> TokenKind {
        if self.advance() == Some('\r') && self.peek_char() == Some('\n') {
            self.advance();
        }
        TokenKind::Newline
    }

    fn lex_text(&mut self) -> TokenKind {
        self.advance(); // opening "
        match self.lex_quoted_body() {
            Ok(text) => TokenKind::Text(text),
            Err(message) => TokenKind::Invalid(message),
        }
    }

    /// Body of a `"..."` literal after the opening quote. `""` is an escaped
    /// quote; `#(...)` escapes are decoded.
    fn lex_quoted_body(&mut self) -> Result<String, String> {
        let mut result = String::new();
        loop {
            match self.advance() {
                None => return Err("unterminated text literal".to_string()),
                Some('"') => {
                    if self.peek_char() == Some('"') {
                        self.advance();
                        result.push('"');
                    } else {
                        return Ok(result);
                    }
                }
                Some('#') if self.peek_char() == Some('(') => {
                    self.advance();
                    result.push_str(&self.lex_escape_sequence()?);
                }
                Some(c) => result.push(c),
            }
        }
    }

    fn lex_escape_sequence(&mut self) -> Result<String, String> {
        let mut result = String::new();
        loop {
            let escape = self.advance_while(|c| c != ',' && c != ')' && c != '"');
            match escape.as_str() {
                "cr" => result.push('\r'),
                "lf" => result.push('\n'),
                "tab" => result.push('\t'),
                "#" => result.push('#'),
                hex if hex.len() == 4 || hex.len() == 8 => {
                    let decoded = u32::from_str_radix(hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| format!("invalid escape sequence #({})", hex))?;
                    result.push(decoded);
                }
                other => return Err(format!("unknown escape sequence #({})", other)),
            }
            match self.advance() {
                Some(',') => continue,
                Some(')') => return Ok(result),
                _ => return Err("unterminated escape sequence".to_string()),
            }
        }
    }

    fn lex_hash_prefix(&mut self) -> TokenKind {
        self.advance(); // #
        match self.peek_char() {
            Some('"') => {
                self.advance();
                match self.lex_quoted_body() {
                    Ok(name) => TokenKind::QuotedIdentifier(name),
                    Err(message) => TokenKind::Invalid(message),
                }
            }
            Some(c) if is_identifier_start(c) => {
                TokenKind::HashKeyword(self.advance_while(is_identifier_continue))
            }
            _ => TokenKind::Invalid("#".to_string()),
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        if self.peek_char() == Some('0')
            && matches!(self.peek_next_char(), Some('x') | Some('X'))
        {
            self.advance();
            self.advance();
            let digits = self.advance_while(|c| c.is_ascii_hexdigit());
            return match i64::from_str_radix(&digits, 16) {
                Ok(value) => TokenKind::Number(value as f64),
                Err(_) => TokenKind::Invalid(format!("invalid hex number 0x{}", digits)),
            };
        }

        let mut literal = self.advance_while(|c| c.is_ascii_digit());
        if self.peek_char() == Some('.') && self.peek_next_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            literal.push('.');
            literal.push_str(&self.advance_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.peek_char(), Some('e') | Some('E')) {
            self.advance();
            literal.push('e');
            if let Some(sign @ ('+' | '-')) = self.peek_char() {
                self.advance();
                literal.push(sign);
            }
            let exponent = self.advance_while(|c| c.is_ascii_digit());
            if exponent.is_empty() {
                return TokenKind::Invalid(format!("missing exponent in {}", literal));
            }
            literal.push_str(&exponent);
        }

        match literal.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid(format!("invalid number {}", literal)),
        }
    }

    fn lex_slash(&mut self) -> TokenKind {
        self.advance();
        match self.peek_char() {
            Some('/') => {
                self.advance();
                TokenKind::LineComment(self.advance_while(|c| c != '\n' && c != '\r'))
            }
            Some('*') => {
                self.advance();
                let mut content = String::new();
                loop {
                    match self.advance() {
                        None => return TokenKind::Invalid("unterminated block comment".to_string()),
                        Some('*') if self.peek_char() == Some('/') => {
                            self.advance();
                            return TokenKind::BlockComment(content);
                        }
                        Some(c) => content.push(c),
                    }
                }
            }
            _ => TokenKind::Slash,
        }
    }

    fn lex_less_than(&mut self) -> TokenKind {
        self.advance();
        match self.peek_char() {
            Some('=') => {
                self.advance();
                TokenKind::LessThanEqual
            }
            Some('>') => {
                self.advance();
                TokenKind::NotEqual
            }
            _ => TokenKind::LessThan,
        }
    }

    fn lex_dots(&mut self) -> TokenKind {
        let dots = self.advance_while(|c| c == '.');
        match dots.len() {
            2 => TokenKind::DotDot,
            3 => TokenKind::DotDotDot,
            _ => TokenKind::Invalid(dots),
        }
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let mut ident = self.advance_while(is_identifier_continue);

        // Dotted names such as Table.SelectRows are a single identifier
        while self.peek_char() == Some('.') && self.peek_next_char().is_some_and(is_identifier_start) {
            self.advance();
            ident.push('.');
            ident.push_str(&self.advance_while(is_identifier_continue));
        }

        if ident.contains('.') {
            return TokenKind::Identifier(ident);
        }
        keyword(&ident).unwrap_or(TokenKind::Identifier(ident))
    }
}

fn keyword(ident: &str) -> Option<TokenKind> {
    let kind = match ident {
        "and" => TokenKind::And,
        "as" => TokenKind::As,
        "each" => TokenKind::Each,
        "else" => TokenKind::Else,
        "error" => TokenKind::Error,
        "false" => TokenKind::False,
        "if" => TokenKind::If,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "let" => TokenKind::Let,
        "meta" => TokenKind::Meta,
        "not" => TokenKind::Not,
        "null" => TokenKind::Null,
        "or" => TokenKind::Or,
        "otherwise" => TokenKind::Otherwise,
        "section" => TokenKind::Section,
        "shared" => TokenKind::Shared,
        "then" => TokenKind::Then,
        "true" => TokenKind::True,
        "try" => TokenKind::Try,
        "type" => TokenKind::Type,
        _ => return None,
    };
    Some(kind)
}

fn single_char_token(c: char) -> Option<TokenKind> {
    let kind = match c {
        '+' => TokenKind::Plus,
        '-' => TokenKind::Minus,
        '*' => TokenKind::Star,
        '&' => TokenKind::Ampersand,
        ',' => TokenKind::Comma,
        ';' => TokenKind::Semicolon,
        '(' => TokenKind::LeftParen,
        ')' => TokenKind::RightParen,
        '[' => TokenKind::LeftBracket,
        ']' => TokenKind::RightBracket,
        '{' => TokenKind::LeftBrace,
        '}' => TokenKind::RightBrace,
        '@' => TokenKind::At,
        '!' => TokenKind::Bang,
        _ => return None,
    };
    Some(kind)
}

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
