//! Token definitions for Power Query M source

use std::fmt;

/// Source location of a token or syntax node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column of the first character
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self { start, end, line, column }
    }

    /// Cover both spans, keeping the position of `self`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line: self.line,
            column: self.column,
        }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self { start: 0, end: 0, line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Null,
    True,
    False,
    Number(f64),
    Text(String),

    // Identifiers
    Identifier(String),
    QuotedIdentifier(String), // #"identifier"

    // Keywords
    And,
    As,
    Each,
    Else,
    Error,
    If,
    In,
    Is,
    Let,
    Meta,
    Not,
    Or,
    Otherwise,
    Section,
    Shared,
    Then,
    Try,
    Type,

    /// `#date`, `#table`, `#shared`, `#infinity`... without the hash
    HashKeyword(String),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    FatArrow,
    QuestionQuestion,
    DotDot,
    DotDotDot,

    // Punctuation
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    At,
    Bang,
    Question,

    // Trivia kept for documentation harvesting
    LineComment(String),
    BlockComment(String),
    Newline,

    Eof,
    Invalid(String),
}

impl TokenKind {
    /// Comments and newlines
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::LineComment(_) | TokenKind::BlockComment(_)
        )
    }

    /// Operators that join two expressions
    pub fn is_binary_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Ampersand
                | TokenKind::Equal
                | TokenKind::NotEqual
                | TokenKind::LessThan
                | TokenKind::LessThanEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanEqual
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::QuestionQuestion
                | TokenKind::Meta
        )
    }

    /// Spelling of a keyword token, used where keywords are legal as names
    /// (record field names, generalized identifiers).
    pub fn keyword_text(&self) -> Option<&'static str> {
        let text = match self {
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::And => "and",
            TokenKind::As => "as",
            TokenKind::Each => "each",
            TokenKind::Else => "else",
            TokenKind::Error => "error",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::Let => "let",
            TokenKind::Meta => "meta",
            TokenKind::Not => "not",
            TokenKind::Or => "or",
            TokenKind::Otherwise => "otherwise",
            TokenKind::Section => "section",
            TokenKind::Shared => "shared",
            TokenKind::Then => "then",
            TokenKind::Try => "try",
            TokenKind::Type => "type",
            _ => return None,
        };
        Some(text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.keyword_text() {
            return write!(f, "'{}'", keyword);
        }
        match self {
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Text(s) => write!(f, "text \"{}\"", s),
            TokenKind::Identifier(s) => write!(f, "identifier '{}'", s),
            TokenKind::QuotedIdentifier(s) => write!(f, "identifier #\"{}\"", s),
            TokenKind::HashKeyword(s) => write!(f, "'#{}'", s),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Ampersand => write!(f, "'&'"),
            TokenKind::Equal => write!(f, "'='"),
            TokenKind::NotEqual => write!(f, "'<>'"),
            TokenKind::LessThan => write!(f, "'<'"),
            TokenKind::LessThanEqual => write!(f, "'<='"),
            TokenKind::GreaterThan => write!(f, "'>'"),
            TokenKind::GreaterThanEqual => write!(f, "'>='"),
            TokenKind::FatArrow => write!(f, "'=>'"),
            TokenKind::QuestionQuestion => write!(f, "'??'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::DotDotDot => write!(f, "'...'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::LeftParen => write!(f, "'('"),
            TokenKind::RightParen => write!(f, "')'"),
            TokenKind::LeftBracket => write!(f, "'['"),
            TokenKind::RightBracket => write!(f, "']'"),
            TokenKind::LeftBrace => write!(f, "'{{'"),
            TokenKind::RightBrace => write!(f, "'}}'"),
            TokenKind::At => write!(f, "'@'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Question => write!(f, "'?'"),
            TokenKind::LineComment(_) | TokenKind::BlockComment(_) => write!(f, "comment"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Invalid(s) => write!(f, "invalid input ({})", s),
            _ => write!(f, "{:?}", self),
        }
    }
}
