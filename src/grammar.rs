//! Symbol extraction from a parsed syntax tree
//!
//! Two module shapes export symbols:
//!
//! - a section document exports its `shared` members;
//! - a `let ... in result` document exports the fields of `result` when it is a
//!   record literal, and otherwise a single symbol named after the file.

use std::sync::Arc;

use tracing::debug;

use crate::ast::{
    Binding, Document, Expr, ExprKind, FunctionExpr, LetExpr, Literal, SectionDocument, TypeKind,
};
use crate::error::{Result, SymbolError};
use crate::extractor::SymbolExtractor;
use crate::parser::parse_document;
use crate::symbol::{Field, Parameter, SourceFile, Symbol, SymbolKind, ValueType};

#[derive(Debug, Default, Clone, Copy)]
pub struct GrammarExtractor;

impl GrammarExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Symbols exported by an already parsed document.
    pub fn extract_document(&self, document: &Document, source: &Arc<SourceFile>) -> Vec<Symbol> {
        match document {
            Document::Section(section) => self.extract_section(section, source),
            Document::Expression(Expr {
                kind: ExprKind::Let(let_expr),
                ..
            }) => self.extract_let_module(let_expr, source),
            Document::Expression(_) => {
                debug!(file = source.file_name(), "document is neither a section nor a let module");
                Vec::new()
            }
        }
    }

    fn extract_section(&self, section: &SectionDocument, source: &Arc<SourceFile>) -> Vec<Symbol> {
        section
            .members
            .iter()
            .filter(|member| member.shared)
            .map(|member| {
                Symbol::new(
                    member.name.name.clone(),
                    symbol_kind(&member.value),
                    Arc::clone(source),
                    member.span.line,
                )
                .with_documentation(join_comments(&member.doc_comments))
            })
            .collect()
    }

    fn extract_let_module(&self, let_expr: &LetExpr, source: &Arc<SourceFile>) -> Vec<Symbol> {
        match &let_expr.body.kind {
            ExprKind::Record(record) => {
                let default_doc = format!("Exported from {}", source.file_name());
                record
                    .fields
                    .iter()
                    .map(|field| {
                        let documentation = join_comments(&field.doc_comments).unwrap_or_else(|| default_doc.clone());
                        Symbol::new(
                            field.name.name.clone(),
                            symbol_kind(&field.value),
                            Arc::clone(source),
                            field.span.line,
                        )
                        .with_documentation(Some(documentation))
                    })
                    .collect()
            }
            _ => vec![Symbol::new(
                source.base_name(),
                symbol_kind(resolve_result(let_expr)),
                Arc::clone(source),
                1,
            )
            .with_documentation(Some("Module export".to_string()))],
        }
    }
}

impl SymbolExtractor for GrammarExtractor {
    fn name(&self) -> &'static str {
        "grammar"
    }

    fn extract(&self, source: &Arc<SourceFile>) -> Result<Vec<Symbol>> {
        let content = source.content()?;
        let document = parse_document(content).map_err(|diagnostics| SymbolError::Parse {
            file: source.file_name().to_string(),
            diagnostics,
        })?;
        Ok(self.extract_document(&document, source))
    }
}

/// The result expression, or the value of the binding it names (`let F = ... in F`).
/// Only the kind of the single file-named export comes from here; field
/// exports require a record literal in result position.
fn resolve_result(let_expr: &LetExpr) -> &Expr {
    if let ExprKind::Identifier(name) = &let_expr.body.kind {
        if let Some(binding) = let_expr.bindings.iter().rev().find(|b| b.name.name == name.name) {
            return &binding.value;
        }
    }
    &let_expr.body
}

fn symbol_kind(value: &Expr) -> SymbolKind {
    match &value.kind {
        ExprKind::Function(function) => SymbolKind::Function {
            parameters: parameters(function),
        },
        ExprKind::Record(record) if record.fields.is_empty() => SymbolKind::Record { fields: None },
        ExprKind::Record(record) => SymbolKind::Record {
            fields: Some(record.fields.iter().map(field).collect()),
        },
        _ => SymbolKind::Variable,
    }
}

fn parameters(function: &FunctionExpr) -> Vec<Parameter> {
    function
        .parameters
        .iter()
        .map(|param| {
            let (value_type, is_nullable) = match param.type_annotation.as_ref().map(|t| &t.kind) {
                Some(TypeKind::Primitive(primitive)) => (*primitive, false),
                Some(TypeKind::Nullable(inner)) => match inner.kind {
                    TypeKind::Primitive(primitive) => (primitive, true),
                    _ => (ValueType::Any, true),
                },
                Some(TypeKind::Opaque) | None => (ValueType::Any, false),
            };
            Parameter {
                name: param.name.name.clone(),
                value_type,
                is_required: !param.optional,
                is_nullable,
                description: None,
            }
        })
        .collect()
}

fn field(binding: &Binding) -> Field {
    Field {
        name: binding.name.name.clone(),
        value_type: infer_value_type(&binding.value),
        description: join_comments(&binding.doc_comments),
    }
}

/// Structural type of an expression; no evaluation takes place.
pub fn infer_value_type(expr: &Expr) -> ValueType {
    match &expr.kind {
        ExprKind::Literal(Literal::Number(_)) => ValueType::Number,
        ExprKind::Literal(Literal::Text(_)) => ValueType::Text,
        ExprKind::Literal(Literal::Logical(_)) => ValueType::Logical,
        ExprKind::Record(_) => ValueType::Record,
        ExprKind::List(_) => ValueType::List,
        ExprKind::Function(_) => ValueType::Function,
        ExprKind::Literal(Literal::Null) | ExprKind::Identifier(_) | ExprKind::Let(_) | ExprKind::Opaque => {
            ValueType::Any
        }
    }
}

fn join_comments(comments: &[String]) -> Option<String> {
    let text = comments
        .iter()
        .map(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}
