//! Syntax tree for Power Query M documents
//!
//! Only the node kinds that symbol extraction looks at are modelled precisely.
//! Every other expression form (calls, operators, `if`, `each`, ...) is parsed
//! in full but kept as [`ExprKind::Opaque`].

use crate::symbol::ValueType;
use crate::token::Span;

/// A parsed source file: either a section document or a single expression.
#[derive(Debug, Clone)]
pub enum Document {
    Section(SectionDocument),
    Expression(Expr),
}

/// `section Name; [shared] member = value; ...`
#[derive(Debug, Clone)]
pub struct SectionDocument {
    /// Absent for the anonymous `section;` form
    pub name: Option<Identifier>,
    pub members: Vec<SectionMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SectionMember {
    pub name: Identifier,
    pub value: Expr,
    pub shared: bool,
    pub span: Span,
    /// Text of the `//` comments directly above the member, in source order
    pub doc_comments: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub quoted: bool,
    pub span: Span,
}

impl Identifier {
    pub fn new(name: String, quoted: bool, span: Span) -> Self {
        Self { name, quoted, span }
    }
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn opaque(span: Span) -> Self {
        Self::new(ExprKind::Opaque, span)
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// A bare name such as `Source` or `#"Sales Total"`
    Identifier(Identifier),
    Let(LetExpr),
    Function(Box<FunctionExpr>),
    Record(RecordExpr),
    List(ListExpr),
    /// Any expression whose structure symbol extraction does not need
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Logical(bool),
    Number(f64),
    Text(String),
}

/// `let bindings in body`
#[derive(Debug, Clone)]
pub struct LetExpr {
    pub bindings: Vec<Binding>,
    pub body: Box<Expr>,
}

/// `name = value` inside a let expression or record literal
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Identifier,
    pub value: Expr,
    pub span: Span,
    pub doc_comments: Vec<String>,
}

/// `(params) as type => body`
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeAnnotation>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Identifier,
    pub type_annotation: Option<TypeAnnotation>,
    pub optional: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeAnnotation {
    pub kind: TypeKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Primitive(ValueType),
    Nullable(Box<TypeAnnotation>),
    /// Record, table, list and function types, or a type reference by name
    Opaque,
}

/// `[field = value, ...]`
#[derive(Debug, Clone)]
pub struct RecordExpr {
    pub fields: Vec<Binding>,
}

/// `{item, ...}`
#[derive(Debug, Clone)]
pub struct ListExpr {
    pub items: Vec<Expr>,
}
