//! # Power Query Symbols
//!
//! Extracts the exported symbols of Power Query M source files and writes
//! symbol files in the JSON format read by the Power Query language service,
//! so user-defined functions show up in IntelliSense.
//!
//! ## Features
//!
//! - **Section documents**: `shared` members are exported, with parameters,
//!   record fields and leading `//` comments as documentation
//! - **Let modules**: the fields of a result record, or the result itself
//!   named after the file
//! - **Fallback extraction**: files that do not parse are scanned line by line
//! - **One symbol file per source file**: `<name>.json`, replaced atomically
//!
//! ## Quick Start
//!
//! ```rust
//! use pq_symbols::{extract_symbols, to_symbol_json};
//!
//! let code = "section Lib;\n// Adds one\nshared AddOne = (x as number) => x + 1;";
//! let symbols = extract_symbols("Lib.pq", code).unwrap();
//! assert_eq!(symbols[0].name, "AddOne");
//!
//! let json = to_symbol_json(&symbols).unwrap();
//! assert!(json.contains("\"completionItemKind\": 2"));
//! ```

pub mod ast;
pub mod config;
pub mod emitter;
pub mod error;
pub mod extractor;
pub mod grammar;
pub mod lexer;
pub mod lexical;
pub mod parser;
pub mod schema;
pub mod symbol;
pub mod token;

use std::path::PathBuf;
use std::sync::Arc;

pub use config::Config;
pub use emitter::{CleanupReport, EmitReport, SymbolEmitter};
pub use error::{ConfigError, SymbolError};
pub use extractor::{ScanReport, SymbolExtractor, SymbolScanner};
pub use grammar::GrammarExtractor;
pub use lexer::Lexer;
pub use lexical::LexicalExtractor;
pub use parser::{parse_document, ParseError, Parser};
pub use schema::MicrosoftSymbolFile;
pub use symbol::{Field, Parameter, SourceFile, Symbol, SymbolKind, ValueType};

/// Extract the exported symbols of in-memory source with the grammar.
///
/// `path` names the file; it decides the symbol name of single-export let
/// modules and the documentation category. Nothing is read from disk.
///
/// # Returns
///
/// * `Ok(Vec<Symbol>)` - Symbols in source order
/// * `Err(SymbolError::Parse)` - The source is not valid Power Query M
pub fn extract_symbols(path: impl Into<PathBuf>, code: &str) -> Result<Vec<Symbol>, SymbolError> {
    let source = Arc::new(SourceFile::from_content(path, code));
    GrammarExtractor::new().extract(&source)
}

/// Render symbols as the contents of one symbol file (a pretty-printed array).
pub fn to_symbol_json(symbols: &[Symbol]) -> Result<String, SymbolError> {
    let documents: Vec<MicrosoftSymbolFile> = symbols.iter().map(MicrosoftSymbolFile::from_symbol).collect();
    Ok(serde_json::to_string_pretty(&documents)?)
}

/// Validate Power Query M code syntax.
pub fn validate(code: &str) -> Result<(), Vec<ParseError>> {
    parse_document(code).map(|_| ())
}
