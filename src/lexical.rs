//! Line-oriented fallback extractor
//!
//! Used for files the grammar cannot parse. Each line is tested against three
//! definition patterns in priority order: function, record, variable. A line
//! that matches an earlier pattern is never reported by a later one.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::extractor::SymbolExtractor;
use crate::symbol::{Field, Parameter, SourceFile, Symbol, SymbolKind, ValueType};

/// A plain or dotted identifier, or a `#"quoted identifier"`
const IDENTIFIER: &str = r#"#"(?:[^"]|"")*"|[\p{L}_][\p{L}\p{N}_]*(?:\.[\p{L}_][\p{L}\p{N}_]*)*"#;

// Definition patterns compiled lazily
static FUNCTION_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^\s*(?:shared\s+)?(?P<name>{IDENTIFIER})\s*=\s*\((?P<params>[^)]*)\)\s*(?:as\s+(?:nullable\s+)?[\w.]+\s*)?=>"
    ))
    .expect("function definition regex should be valid")
});

static RECORD_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*(?:shared\s+)?(?P<name>{IDENTIFIER})\s*=\s*\[(?P<rest>.*)$"))
        .expect("record definition regex should be valid")
});

static VARIABLE_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^\s*(?:shared\s+)?(?P<name>{IDENTIFIER})\s*=(?:[^>=].*)?$"))
        .expect("variable definition regex should be valid")
});

static PARAMETER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?:(?P<optional>optional)\s+)?(?P<name>{IDENTIFIER})(?:\s+as\s+(?P<nullable>nullable\s+)?(?P<type>\w+))?$"
    ))
    .expect("parameter regex should be valid")
});

static FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)^(?P<name>{IDENTIFIER})\s*=\s*(?P<value>.+)$"))
        .expect("field regex should be valid")
});

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+$").expect("integer regex should be valid"));

static DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+\.\d+$").expect("decimal regex should be valid"));

/// Keywords that can start a line of the form `word = ...` without defining anything
const KEYWORDS: &[&str] = &[
    "and", "as", "each", "else", "error", "if", "in", "is", "let", "meta", "not", "or", "otherwise",
    "section", "then", "try", "type",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct LexicalExtractor;

impl LexicalExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Best-effort symbols of `text`, in line order.
    pub fn extract_text(&self, text: &str, source: &Arc<SourceFile>) -> Vec<Symbol> {
        let lines: Vec<&str> = text.lines().collect();
        let mut symbols = Vec::new();
        let mut index = 0;

        while index < lines.len() {
            let line = lines[index];
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                index += 1;
                continue;
            }

            let mut next = index + 1;
            let found = if let Some(caps) = FUNCTION_DEF.captures(line) {
                let parameters = parse_parameters(&caps["params"]);
                Some((caps["name"].to_string(), SymbolKind::Function { parameters }))
            } else if let Some(caps) = RECORD_DEF.captures(line) {
                let (fields, end) = harvest_fields(&caps["rest"], &lines[index + 1..]);
                next += end;
                let fields = (!fields.is_empty()).then_some(fields);
                Some((caps["name"].to_string(), SymbolKind::Record { fields }))
            } else if let Some(caps) = VARIABLE_DEF.captures(line) {
                Some((caps["name"].to_string(), SymbolKind::Variable))
            } else {
                None
            };

            if let Some((raw_name, kind)) = found {
                if !KEYWORDS.contains(&raw_name.as_str()) {
                    let symbol = Symbol::new(identifier_name(&raw_name), kind, Arc::clone(source), index + 1)
                        .with_documentation(leading_comments(&lines[..index]));
                    symbols.push(symbol);
                }
            }
            index = next;
        }

        symbols
    }
}

impl SymbolExtractor for LexicalExtractor {
    fn name(&self) -> &'static str {
        "lexical"
    }

    fn extract(&self, source: &Arc<SourceFile>) -> Result<Vec<Symbol>> {
        let content = source.content()?;
        Ok(self.extract_text(content, source))
    }
}

/// Type of a value from its literal form.
pub fn infer_literal_type(value: &str) -> ValueType {
    let value = value.trim();
    if value.starts_with('"') {
        ValueType::Text
    } else if value == "true" || value == "false" {
        ValueType::Logical
    } else if INTEGER.is_match(value) || DECIMAL.is_match(value) {
        ValueType::Number
    } else if value.starts_with('[') {
        ValueType::Record
    } else if value.starts_with('{') {
        ValueType::List
    } else if value.contains("=>") {
        ValueType::Function
    } else {
        ValueType::Any
    }
}

fn parse_parameters(params: &str) -> Vec<Parameter> {
    params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| PARAMETER.captures(p))
        .map(|caps| {
            let value_type = caps
                .name("type")
                .and_then(|t| ValueType::from_name(t.as_str()))
                .unwrap_or(ValueType::Any);
            Parameter {
                name: identifier_name(&caps["name"]),
                value_type,
                is_required: caps.name("optional").is_none(),
                is_nullable: caps.name("nullable").is_some(),
                description: None,
            }
        })
        .collect()
}

/// Collect `name = value` fields of a record whose opening `[` ends at the
/// start of `first`. Bracket depth starts at 1 and the record ends when it
/// returns to 0; only top-level entries become fields. Returns the fields and
/// the number of lines of `rest` the record spans.
fn harvest_fields(first: &str, rest: &[&str]) -> (Vec<Field>, usize) {
    let mut scanner = FieldScanner::default();
    if scanner.feed(first) {
        return (scanner.fields, 0);
    }
    for (offset, line) in rest.iter().enumerate() {
        scanner.push_newline();
        if scanner.feed(line) {
            return (scanner.fields, offset + 1);
        }
    }
    scanner.finish_piece();
    (scanner.fields, rest.len())
}

#[derive(Default)]
struct FieldScanner {
    depth: usize,
    nesting: usize,
    piece: String,
    fields: Vec<Field>,
}

impl FieldScanner {
    /// Scan one line; true once the record has closed.
    fn feed(&mut self, line: &str) -> bool {
        let mut chars = line.chars().peekable();
        let mut in_text = false;

        while let Some(c) = chars.next() {
            if in_text {
                in_text = c != '"';
                self.piece.push(c);
                continue;
            }
            match c {
                '"' => {
                    in_text = true;
                    self.piece.push(c);
                }
                '/' if chars.peek() == Some(&'/') => break,
                '[' => {
                    self.depth += 1;
                    self.piece.push(c);
                }
                ']' if self.depth == 0 => {
                    self.finish_piece();
                    return true;
                }
                ']' => {
                    self.depth -= 1;
                    self.piece.push(c);
                }
                '(' | '{' => {
                    self.nesting += 1;
                    self.piece.push(c);
                }
                ')' | '}' => {
                    self.nesting = self.nesting.saturating_sub(1);
                    self.piece.push(c);
                }
                ',' if self.depth == 0 && self.nesting == 0 => self.finish_piece(),
                _ => self.piece.push(c),
            }
        }
        false
    }

    fn push_newline(&mut self) {
        self.piece.push('\n');
    }

    fn finish_piece(&mut self) {
        let piece = std::mem::take(&mut self.piece);
        if let Some(caps) = FIELD.captures(piece.trim()) {
            let value = caps["value"].trim().trim_end_matches(';');
            self.fields
                .push(Field::new(identifier_name(&caps["name"]), infer_literal_type(value)));
        }
    }
}

/// Comments directly above a definition, blank lines tolerated
fn leading_comments(above: &[&str]) -> Option<String> {
    let mut comments = Vec::new();
    for line in above.iter().rev() {
        let trimmed = line.trim();
        if let Some(comment) = trimmed.strip_prefix("//") {
            comments.push(comment.trim_start_matches('/').trim());
        } else if !trimmed.is_empty() {
            break;
        }
    }
    comments.reverse();
    let text = comments
        .into_iter()
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// `#"Sales Total"` -> `Sales Total`
fn identifier_name(raw: &str) -> String {
    match raw.strip_prefix("#\"").and_then(|r| r.strip_suffix('"')) {
        Some(quoted) => quoted.replace("\"\"", "\""),
        None => raw.to_string(),
    }
}
