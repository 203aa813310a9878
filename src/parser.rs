//! Recursive-descent parser for Power Query M documents

use std::fmt;

use crate::ast::*;
use crate::lexer::Lexer;
use crate::symbol::ValueType;
use crate::token::{Span, Token, TokenKind};

/// A syntax error with its location
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}: {}", self.span.line, self.span.column, self.message)
    }
}

impl std::error::Error for ParseError {}

type ParseResult<T> = Result<T, ParseError>;

/// Lex and parse `source` into a [`Document`].
pub fn parse_document(source: &str) -> Result<Document, Vec<ParseError>> {
    let tokens = Lexer::new(source).tokenize();
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a whole document. Section documents are recognised by a leading
    /// `section` keyword, optionally preceded by a literal attribute record.
    pub fn parse(&mut self) -> Result<Document, Vec<ParseError>> {
        self.parse_document().map_err(|error| vec![error])
    }

    fn parse_document(&mut self) -> ParseResult<Document> {
        self.skip_trivia();
        let document = if self.starts_section_document() {
            Document::Section(self.parse_section()?)
        } else {
            Document::Expression(self.parse_expression()?)
        };

        self.skip_trivia();
        if !self.is_at_end() {
            return Err(self.unexpected("end of document"));
        }
        Ok(document)
    }

    fn starts_section_document(&mut self) -> bool {
        let saved = self.pos;
        if self.current_kind() == TokenKind::LeftBracket {
            self.skip_balanced(TokenKind::LeftBracket, TokenKind::RightBracket);
            self.skip_trivia();
        }
        let is_section = self.current_kind() == TokenKind::Section;
        self.pos = saved;
        is_section
    }

    // ---------------------------------------------------------------
    // Section documents
    // ---------------------------------------------------------------

    fn parse_section(&mut self) -> ParseResult<SectionDocument> {
        let start_span = self.current_span();
        self.skip_attributes()?;
        self.expect(TokenKind::Section)?;
        self.skip_trivia();

        let name = match self.current_kind() {
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) => {
                Some(self.parse_identifier()?)
            }
            _ => None,
        };
        self.skip_trivia();
        self.expect(TokenKind::Semicolon)?;
        let mut last_line = self.prev_span().line;

        let mut members = Vec::new();
        loop {
            let doc_comments = self.collect_doc_comments(last_line);
            if self.is_at_end() {
                break;
            }
            let member = self.parse_section_member(doc_comments)?;
            last_line = self.prev_span().line;
            members.push(member);
        }

        Ok(SectionDocument {
            name,
            members,
            span: start_span.merge(self.prev_span()),
        })
    }

    fn parse_section_member(&mut self, doc_comments: Vec<String>) -> ParseResult<SectionMember> {
        self.skip_attributes()?;
        self.skip_trivia();
        let start_span = self.current_span();

        let shared = if self.current_kind() == TokenKind::Shared {
            self.advance();
            self.skip_trivia();
            true
        } else {
            false
        };

        let name = self.parse_identifier()?;
        self.skip_trivia();
        self.expect(TokenKind::Equal)?;
        self.skip_trivia();
        let value = self.parse_expression()?;
        self.skip_trivia();
        self.expect(TokenKind::Semicolon)?;

        Ok(SectionMember {
            name,
            value,
            shared,
            span: start_span.merge(self.prev_span()),
            doc_comments,
        })
    }

    /// Literal attributes (`[Version = "1.0"]`) carry no symbol information.
    fn skip_attributes(&mut self) -> ParseResult<()> {
        self.skip_trivia();
        if self.current_kind() == TokenKind::LeftBracket {
            self.parse_bracket_expression()?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.skip_trivia();
        let mut left = self.parse_unary_expression()?;

        loop {
            let next = self.peek_significant();
            let is_type_operator = matches!(next, TokenKind::As | TokenKind::Is);
            if !next.is_binary_operator() && !is_type_operator {
                break;
            }
            self.skip_trivia();
            self.advance(); // operator
            self.skip_trivia();

            let right_span = if is_type_operator {
                self.parse_type()?.span
            } else {
                self.parse_unary_expression()?.span
            };
            left = Expr::opaque(left.span.merge(right_span));
        }

        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expr> {
        self.skip_trivia();
        let span = self.current_span();

        match self.current_kind() {
            TokenKind::Minus | TokenKind::Plus | TokenKind::Not => {
                let operator = self.current_kind();
                self.advance();
                let operand = self.parse_unary_expression()?;
                let span = span.merge(operand.span);
                let negate = operator == TokenKind::Minus;
                // Signed numeric literals stay literals
                match operand.kind {
                    ExprKind::Literal(Literal::Number(n)) if operator != TokenKind::Not => {
                        let n = if negate { -n } else { n };
                        Ok(Expr::new(ExprKind::Literal(Literal::Number(n)), span))
                    }
                    _ => Ok(Expr::opaque(span)),
                }
            }
            _ => self.parse_postfix_expression(),
        }
    }

    /// Field access, item access and invocation
    fn parse_postfix_expression(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary_expression()?;

        loop {
            let end_span = match self.peek_significant() {
                TokenKind::LeftBracket => {
                    self.skip_trivia();
                    self.parse_bracket_expression()?.span
                }
                TokenKind::LeftBrace => {
                    self.skip_trivia();
                    self.advance();
                    self.parse_expression()?;
                    self.skip_trivia();
                    self.expect(TokenKind::RightBrace)?;
                    self.prev_span()
                }
                TokenKind::LeftParen => {
                    self.skip_trivia();
                    self.advance();
                    self.parse_comma_separated(TokenKind::RightParen, |parser| {
                        parser.parse_expression().map(|_| ())
                    })?;
                    self.prev_span()
                }
                _ => break,
            };
            self.skip_optional_marker();
            expr = Expr::opaque(expr.span.merge(end_span));
        }

        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expr> {
        self.skip_trivia();
        let span = self.current_span();

        let literal = match self.current_kind() {
            TokenKind::Null => Some(Literal::Null),
            TokenKind::True => Some(Literal::Logical(true)),
            TokenKind::False => Some(Literal::Logical(false)),
            TokenKind::Number(n) => Some(Literal::Number(n)),
            TokenKind::Text(s) => Some(Literal::Text(s)),
            TokenKind::HashKeyword(ref word) if word == "infinity" => Some(Literal::Number(f64::INFINITY)),
            TokenKind::HashKeyword(ref word) if word == "nan" => Some(Literal::Number(f64::NAN)),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(Expr::new(ExprKind::Literal(literal), span));
        }

        match self.current_kind() {
            TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_) => {
                let ident = self.parse_identifier()?;
                Ok(Expr::new(ExprKind::Identifier(ident), span))
            }
            TokenKind::HashKeyword(_) => {
                self.advance();
                Ok(Expr::opaque(span))
            }
            TokenKind::DotDotDot => {
                self.advance();
                Ok(Expr::opaque(span))
            }
            TokenKind::At => {
                self.advance();
                let ident = self.parse_identifier()?;
                Ok(Expr::opaque(span.merge(ident.span)))
            }
            TokenKind::Let => self.parse_let_expression(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Try => self.parse_try_expression(),
            TokenKind::Error | TokenKind::Each => {
                self.advance();
                let body = self.parse_expression()?;
                Ok(Expr::opaque(span.merge(body.span)))
            }
            TokenKind::Type => {
                self.advance();
                self.skip_trivia();
                let ty = self.parse_type()?;
                Ok(Expr::opaque(span.merge(ty.span)))
            }
            TokenKind::LeftParen => self.parse_parenthesized_or_function(),
            TokenKind::LeftBracket => self.parse_bracket_expression(),
            TokenKind::LeftBrace => self.parse_list_expression(),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_let_expression(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        let mut last_line = start_span.line;
        self.advance(); // let

        let mut bindings = Vec::new();
        loop {
            let doc_comments = self.collect_doc_comments(last_line);
            if self.current_kind() == TokenKind::In {
                break;
            }
            bindings.push(self.parse_binding(doc_comments)?);

            self.skip_trivia();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
                last_line = self.prev_span().line;
            } else {
                break;
            }
        }

        self.skip_trivia();
        self.expect(TokenKind::In)?;
        let body = self.parse_expression()?;
        let span = start_span.merge(body.span);

        Ok(Expr::new(
            ExprKind::Let(LetExpr {
                bindings,
                body: Box::new(body),
            }),
            span,
        ))
    }

    fn parse_binding(&mut self, doc_comments: Vec<String>) -> ParseResult<Binding> {
        let start_span = self.current_span();
        let name = self.parse_generalized_identifier()?;

        self.skip_trivia();
        self.expect(TokenKind::Equal)?;
        let value = self.parse_expression()?;
        let span = start_span.merge(value.span);

        Ok(Binding {
            name,
            value,
            span,
            doc_comments,
        })
    }

    fn parse_if_expression(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        self.advance(); // if
        self.parse_expression()?;
        self.skip_trivia();
        self.expect(TokenKind::Then)?;
        self.parse_expression()?;
        self.skip_trivia();
        self.expect(TokenKind::Else)?;
        let else_branch = self.parse_expression()?;
        Ok(Expr::opaque(start_span.merge(else_branch.span)))
    }

    /// `try e`, `try e otherwise f`, `try e catch (x) => f`
    fn parse_try_expression(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        self.advance(); // try
        let mut end_span = self.parse_expression()?.span;

        match self.peek_significant() {
            TokenKind::Otherwise => {
                self.skip_trivia();
                self.advance();
                end_span = self.parse_expression()?.span;
            }
            TokenKind::Identifier(word) if word == "catch" => {
                self.skip_trivia();
                self.advance();
                end_span = self.parse_expression()?.span;
            }
            _ => {}
        }

        Ok(Expr::opaque(start_span.merge(end_span)))
    }

    fn parse_parenthesized_or_function(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        if self.is_function_definition() {
            return self.parse_function_expression(start_span);
        }

        self.advance(); // (
        let inner = self.parse_expression()?;
        self.skip_trivia();
        self.expect(TokenKind::RightParen)?;
        Ok(Expr::new(inner.kind, start_span.merge(self.prev_span())))
    }

    /// Looks past the parenthesised group for `=>`, allowing a return type
    /// annotation in between. The position is restored afterwards.
    fn is_function_definition(&mut self) -> bool {
        let saved = self.pos;
        let is_function = self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen)
            && self.scan_to_fat_arrow();
        self.pos = saved;
        is_function
    }

    fn scan_to_fat_arrow(&mut self) -> bool {
        self.skip_trivia();
        match self.current_kind() {
            TokenKind::FatArrow => return true,
            TokenKind::As => self.advance(),
            _ => return false,
        };

        loop {
            self.skip_trivia();
            match self.current_kind() {
                TokenKind::FatArrow => return true,
                TokenKind::Identifier(_) | TokenKind::Null | TokenKind::Type => {
                    self.advance();
                }
                TokenKind::LeftBrace => {
                    self.skip_balanced(TokenKind::LeftBrace, TokenKind::RightBrace);
                }
                TokenKind::LeftBracket => {
                    self.skip_balanced(TokenKind::LeftBracket, TokenKind::RightBracket);
                }
                TokenKind::LeftParen => {
                    self.skip_balanced(TokenKind::LeftParen, TokenKind::RightParen);
                }
                _ => return false,
            }
        }
    }

    fn parse_function_expression(&mut self, start_span: Span) -> ParseResult<Expr> {
        self.advance(); // (
        let parameters = self.parse_parameter_list()?;

        self.skip_trivia();
        let return_type = if self.current_kind() == TokenKind::As {
            self.advance();
            self.skip_trivia();
            Some(self.parse_type()?)
        } else {
            None
        };

        self.skip_trivia();
        self.expect(TokenKind::FatArrow)?;
        let body = self.parse_expression()?;
        let span = start_span.merge(body.span);

        Ok(Expr::new(
            ExprKind::Function(Box::new(FunctionExpr {
                parameters,
                return_type,
                body,
            })),
            span,
        ))
    }

    /// Parameters up to and including the closing `)`
    fn parse_parameter_list(&mut self) -> ParseResult<Vec<Parameter>> {
        let mut params = Vec::new();
        self.parse_comma_separated(TokenKind::RightParen, |parser| {
            params.push(parser.parse_parameter()?);
            Ok(())
        })?;
        Ok(params)
    }

    fn parse_parameter(&mut self) -> ParseResult<Parameter> {
        let start_span = self.current_span();

        // `optional` is contextual: a parameter may itself be called optional
        let optional = matches!(self.current_kind(), TokenKind::Identifier(ref word) if word == "optional")
            && matches!(
                self.peek_significant_at(1),
                TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_)
            );
        if optional {
            self.advance();
            self.skip_trivia();
        }

        let name = self.parse_identifier()?;
        let type_annotation = if self.peek_significant() == TokenKind::As {
            self.skip_trivia();
            self.advance();
            self.skip_trivia();
            Some(self.parse_type()?)
        } else {
            None
        };

        let end_span = type_annotation.as_ref().map(|t| t.span).unwrap_or(name.span);
        Ok(Parameter {
            name,
            type_annotation,
            optional,
            span: start_span.merge(end_span),
        })
    }

    // ---------------------------------------------------------------
    // Types
    // ---------------------------------------------------------------

    fn parse_type(&mut self) -> ParseResult<TypeAnnotation> {
        self.skip_trivia();
        let start_span = self.current_span();

        let kind = match self.current_kind() {
            TokenKind::Identifier(name) if name == "nullable" => {
                self.advance();
                let inner = self.parse_type()?;
                return Ok(TypeAnnotation {
                    span: start_span.merge(inner.span),
                    kind: TypeKind::Nullable(Box::new(inner)),
                });
            }
            TokenKind::Identifier(name) => {
                self.advance();
                let primitive = ValueType::from_name(&name);
                let has_body = matches!(
                    (primitive, self.peek_significant()),
                    (Some(ValueType::List), TokenKind::LeftBrace)
                        | (Some(ValueType::Record), TokenKind::LeftBracket)
                        | (Some(ValueType::Table), TokenKind::LeftBracket)
                        | (Some(ValueType::Function), TokenKind::LeftParen)
                );
                if has_body {
                    self.skip_type_body(primitive)?;
                    TypeKind::Opaque
                } else {
                    primitive.map(TypeKind::Primitive).unwrap_or(TypeKind::Opaque)
                }
            }
            TokenKind::Null => {
                self.advance();
                TypeKind::Primitive(ValueType::Null)
            }
            TokenKind::Type => {
                self.advance();
                TypeKind::Primitive(ValueType::Type)
            }
            TokenKind::LeftBrace => {
                self.advance();
                self.parse_type()?;
                self.skip_trivia();
                self.expect(TokenKind::RightBrace)?;
                TypeKind::Opaque
            }
            TokenKind::LeftBracket => {
                self.parse_type_field_list()?;
                TypeKind::Opaque
            }
            TokenKind::LeftParen => {
                self.advance();
                self.parse_type()?;
                self.skip_trivia();
                self.expect(TokenKind::RightParen)?;
                TypeKind::Opaque
            }
            _ => return Err(self.unexpected("a type")),
        };

        Ok(TypeAnnotation {
            kind,
            span: start_span.merge(self.prev_span()),
        })
    }

    /// `list {T}`, `record [...]`, `table [...]`, `function (...) as T`
    fn skip_type_body(&mut self, primitive: Option<ValueType>) -> ParseResult<()> {
        self.skip_trivia();
        match primitive {
            Some(ValueType::List) => {
                self.advance();
                self.parse_type()?;
                self.skip_trivia();
                self.expect(TokenKind::RightBrace)
            }
            Some(ValueType::Function) => {
                self.advance();
                self.parse_parameter_list()?;
                self.skip_trivia();
                self.expect(TokenKind::As)?;
                self.parse_type().map(|_| ())
            }
            _ => self.parse_type_field_list(),
        }
    }

    /// `[optional Name = type, Other, ...]`
    fn parse_type_field_list(&mut self) -> ParseResult<()> {
        self.expect(TokenKind::LeftBracket)?;
        self.parse_comma_separated(TokenKind::RightBracket, |parser| {
            if parser.current_kind() == TokenKind::DotDotDot {
                parser.advance();
                return Ok(());
            }
            if matches!(parser.current_kind(), TokenKind::Identifier(ref w) if w == "optional")
                && parser.peek_significant_at(1) != TokenKind::Equal
            {
                parser.advance();
                parser.skip_trivia();
            }
            parser.parse_generalized_identifier()?;
            if parser.peek_significant() == TokenKind::Equal {
                parser.skip_trivia();
                parser.advance();
                parser.parse_type()?;
            }
            Ok(())
        })
    }

    // ---------------------------------------------------------------
    // Records, lists and field access
    // ---------------------------------------------------------------

    /// `[` opens a record literal, an implicit field access (`[Name]`) or a
    /// projection (`[[A], [B]]`).
    fn parse_bracket_expression(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        if self.is_record_literal() {
            return self.parse_record_expression(start_span);
        }

        self.expect(TokenKind::LeftBracket)?;
        self.parse_comma_separated(TokenKind::RightBracket, |parser| {
            if parser.current_kind() == TokenKind::LeftBracket {
                parser.advance();
                parser.skip_trivia();
                parser.parse_generalized_identifier()?;
                parser.skip_trivia();
                parser.expect(TokenKind::RightBracket)
            } else {
                parser.parse_generalized_identifier().map(|_| ())
            }
        })?;
        self.skip_optional_marker();
        Ok(Expr::opaque(start_span.merge(self.prev_span())))
    }

    /// `[]` or `[name =` starts a record literal
    fn is_record_literal(&mut self) -> bool {
        let saved = self.pos;
        self.advance(); // [
        self.skip_trivia();

        let is_record = match self.current_kind() {
            TokenKind::RightBracket => true,
            _ => self.parse_generalized_identifier().is_ok() && self.peek_significant() == TokenKind::Equal,
        };

        self.pos = saved;
        is_record
    }

    fn parse_record_expression(&mut self, start_span: Span) -> ParseResult<Expr> {
        self.advance(); // [
        let mut last_line = start_span.line;
        let mut fields = Vec::new();

        loop {
            let doc_comments = self.collect_doc_comments(last_line);
            if self.current_kind() == TokenKind::RightBracket {
                break;
            }
            fields.push(self.parse_binding(doc_comments)?);

            self.skip_trivia();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
                last_line = self.prev_span().line;
            } else {
                break;
            }
        }

        self.skip_trivia();
        self.expect(TokenKind::RightBracket)?;
        Ok(Expr::new(
            ExprKind::Record(RecordExpr { fields }),
            start_span.merge(self.prev_span()),
        ))
    }

    fn parse_list_expression(&mut self) -> ParseResult<Expr> {
        let start_span = self.current_span();
        self.advance(); // {

        let mut items = Vec::new();
        self.parse_comma_separated(TokenKind::RightBrace, |parser| {
            let item = parser.parse_expression()?;
            // Range item: 1..10
            if parser.peek_significant() == TokenKind::DotDot {
                parser.skip_trivia();
                parser.advance();
                let end = parser.parse_expression()?;
                items.push(Expr::opaque(item.span.merge(end.span)));
            } else {
                items.push(item);
            }
            Ok(())
        })?;

        Ok(Expr::new(
            ExprKind::List(ListExpr { items }),
            start_span.merge(self.prev_span()),
        ))
    }

    // ---------------------------------------------------------------
    // Identifiers
    // ---------------------------------------------------------------

    fn parse_identifier(&mut self) -> ParseResult<Identifier> {
        self.skip_trivia();
        let span = self.current_span();
        match self.current_kind() {
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Identifier::new(name, false, span))
            }
            TokenKind::QuotedIdentifier(name) => {
                self.advance();
                Ok(Identifier::new(name, true, span))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// Field names may be keywords and may span several words (`Unit Price`).
    fn parse_generalized_identifier(&mut self) -> ParseResult<Identifier> {
        self.skip_trivia();
        let start_span = self.current_span();

        if let TokenKind::QuotedIdentifier(name) = self.current_kind() {
            self.advance();
            return Ok(Identifier::new(name, true, start_span));
        }

        let mut name = String::new();
        while let Some(word) = self.current_word() {
            let span = self.current_span();
            if !name.is_empty() {
                // Words must be on the same line to form one name
                if span.line != self.prev_span().line {
                    break;
                }
                name.push(' ');
            }
            name.push_str(&word);
            self.advance();
        }

        if name.is_empty() {
            return Err(self.unexpected("a field name"));
        }
        Ok(Identifier::new(name, false, start_span.merge(self.prev_span())))
    }

    fn current_word(&self) -> Option<String> {
        let kind = self.current_kind();
        match kind {
            TokenKind::Identifier(name) => Some(name),
            other => other.keyword_text().map(str::to_string),
        }
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Parse `item (, item)*` until `close`, consuming the closing token.
    fn parse_comma_separated<F>(&mut self, close: TokenKind, mut item: F) -> ParseResult<()>
    where
        F: FnMut(&mut Self) -> ParseResult<()>,
    {
        self.skip_trivia();
        while self.current_kind() != close && !self.is_at_end() {
            item(self)?;
            self.skip_trivia();
            if self.current_kind() == TokenKind::Comma {
                self.advance();
                self.skip_trivia();
            } else {
                break;
            }
        }
        self.skip_trivia();
        self.expect(close)
    }

    /// Gather `//` comments up to the next significant token. A comment on
    /// `previous_line` trails the previous definition and is not included.
    fn collect_doc_comments(&mut self, previous_line: usize) -> Vec<String> {
        let mut comments = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            match &token.kind {
                TokenKind::LineComment(text) if token.span.line != previous_line => {
                    comments.push(text.trim_start_matches('/').trim().to_string());
                }
                kind if kind.is_trivia() => {}
                _ => break,
            }
            self.pos += 1;
        }
        comments
    }

    /// Consume a balanced `open ... close` group starting at the current token.
    /// Returns false if the input ends first.
    fn skip_balanced(&mut self, open: TokenKind, close: TokenKind) -> bool {
        let mut depth = 0usize;
        while !self.is_at_end() {
            let kind = self.current_kind();
            self.advance();
            if kind == open {
                depth += 1;
            } else if kind == close {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return true;
                }
            }
        }
        false
    }

    fn skip_optional_marker(&mut self) {
        if self.peek_significant() == TokenKind::Question {
            self.skip_trivia();
            self.advance();
        }
    }

    fn current_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn current_span(&self) -> Span {
        self.tokens.get(self.pos).map(|t| t.span).unwrap_or_default()
    }

    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    /// Kind of the next non-trivia token, without consuming anything
    fn peek_significant(&self) -> TokenKind {
        self.peek_significant_at(0)
    }

    /// Kind of the `n`th non-trivia token from the current position
    fn peek_significant_at(&self, n: usize) -> TokenKind {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .filter(|t| !t.kind.is_trivia())
            .nth(n)
            .map(|t| t.kind.clone())
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn skip_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current_kind() == TokenKind::Eof
    }

    fn expect(&mut self, expected: TokenKind) -> ParseResult<()> {
        if std::mem::discriminant(&self.current_kind()) == std::mem::discriminant(&expected) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::new(
            format!("expected {}, found {}", expected, self.current_kind()),
            self.current_span(),
        )
    }
}
