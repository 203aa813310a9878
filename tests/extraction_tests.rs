//! Symbol extraction tests for both extractors and the scanner pipeline

use std::fs;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use pq_symbols::lexical::infer_literal_type;
use pq_symbols::{
    Config, GrammarExtractor, LexicalExtractor, SourceFile, Symbol, SymbolError, SymbolExtractor, SymbolKind,
    SymbolScanner, ValueType,
};

fn source(name: &str, code: &str) -> Arc<SourceFile> {
    Arc::new(SourceFile::from_content(name, code))
}

fn grammar(name: &str, code: &str) -> Vec<Symbol> {
    GrammarExtractor::new()
        .extract(&source(name, code))
        .unwrap_or_else(|e| panic!("extraction failed: {e}"))
}

fn lexical(code: &str) -> Vec<Symbol> {
    LexicalExtractor::new().extract_text(code, &source("test.pq", code))
}

fn names(symbols: &[Symbol]) -> Vec<&str> {
    symbols.iter().map(|s| s.name.as_str()).collect()
}

const SECTION: &str = r#"section Finance;

// Computes total
// with tax
shared Total = (price as number, optional rate as nullable number) => price * (1 + (rate ?? 0.08));

TaxRate = 0.08;

shared Defaults = [
    // Currency code
    currency = "EUR",
    rounding = 2,
    strict = false
];

shared Version = "1.2";
"#;

// ============================================
// Grammar extraction: section documents
// ============================================

#[test]
fn test_section_exports_only_shared_members() {
    let symbols = grammar("Finance.pq", SECTION);
    assert_eq!(names(&symbols), vec!["Total", "Defaults", "Version"]);
}

#[test]
fn test_section_member_kinds_and_metadata() {
    let symbols = grammar("Finance.pq", SECTION);

    let total = &symbols[0];
    assert_eq!(total.line, 5);
    assert_eq!(total.documentation.as_deref(), Some("Computes total with tax"));
    let params = total.parameters().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!((params[0].name.as_str(), params[0].value_type), ("price", ValueType::Number));
    assert!(params[0].is_required && !params[0].is_nullable);
    assert!(!params[1].is_required && params[1].is_nullable);

    let defaults = &symbols[1];
    let fields = defaults.fields().unwrap();
    let summary: Vec<_> = fields.iter().map(|f| (f.name.as_str(), f.value_type)).collect();
    assert_eq!(
        summary,
        vec![
            ("currency", ValueType::Text),
            ("rounding", ValueType::Number),
            ("strict", ValueType::Logical)
        ]
    );
    assert_eq!(fields[0].description.as_deref(), Some("Currency code"));
    assert_eq!(defaults.documentation, None);

    assert_eq!(symbols[2].kind, SymbolKind::Variable);
}

#[test]
fn test_many_private_members_never_exported() {
    let mut code = String::from("section Big;\n");
    for i in 0..50 {
        code.push_str(&format!("Private{i} = {i};\n"));
    }
    code.push_str("shared Only = 1;\n");
    assert_eq!(names(&grammar("Big.pq", &code)), vec!["Only"]);
}

// ============================================
// Grammar extraction: let modules
// ============================================

#[test]
fn test_let_record_result_exports_fields() {
    let code = "let\n    helper = 1\nin\n    [\n        a = 1,\n        // Greets someone\n        b = (name as text) => \"Hi \" & name,\n        c = [x = 1]\n    ]";
    let symbols = grammar("Utils.pq", code);

    assert_eq!(names(&symbols), vec!["a", "b", "c"]);
    assert!(symbols.iter().all(|s| s.name != "Utils"));
    assert_eq!(symbols[0].documentation.as_deref(), Some("Exported from Utils.pq"));
    assert_eq!(symbols[1].documentation.as_deref(), Some("Greets someone"));
    assert_eq!(symbols[1].line, 7);
    assert!(matches!(symbols[1].kind, SymbolKind::Function { .. }));
    assert!(matches!(symbols[2].kind, SymbolKind::Record { .. }));
}

#[test]
fn test_let_non_record_result_is_single_export() {
    let code = "let\n    Source = 1,\n    Doubled = Source * 2\nin\n    Doubled + 1";
    let symbols = grammar("queries/Compute.m", code);

    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "Compute");
    assert_eq!(symbols[0].line, 1);
    assert_eq!(symbols[0].kind, SymbolKind::Variable);
    assert_eq!(symbols[0].documentation.as_deref(), Some("Module export"));
}

#[test]
fn test_let_result_naming_a_function_binding() {
    let code = "let\n    Clean = (value as text, optional trim as logical) => Text.Trim(value)\nin\n    Clean";
    let symbols = grammar("Clean.pqm", code);

    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "Clean");
    let params = symbols[0].parameters().unwrap();
    assert_eq!(params[1].value_type, ValueType::Logical);
    assert!(!params[1].is_required);
}

#[test]
fn test_let_result_naming_a_record_binding_is_single_export() {
    let symbols = grammar("R.pq", "let\n    R = [x = 1]\nin\n    R");
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].name, "R");
    assert_eq!(symbols[0].line, 1);
    assert_eq!(symbols[0].documentation.as_deref(), Some("Module export"));
    let fields = symbols[0].fields().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!((fields[0].name.as_str(), fields[0].value_type), ("x", ValueType::Number));

    let settings = grammar("Config.pq", "let\n    Settings = [a = 1, b = \"x\"]\nin\n    Settings");
    assert_eq!(names(&settings), vec!["Config"]);
}

#[rstest]
#[case("1", ValueType::Number)]
#[case("-2.5", ValueType::Number)]
#[case("\"x\"", ValueType::Text)]
#[case("true", ValueType::Logical)]
#[case("[a = 1]", ValueType::Record)]
#[case("{1, 2}", ValueType::List)]
#[case("(x) => x", ValueType::Function)]
#[case("null", ValueType::Any)]
#[case("Source[Column]", ValueType::Any)]
fn test_grammar_field_type_inference(#[case] value: &str, #[case] expected: ValueType) {
    let code = format!("section S; shared R = [field = {value}];");
    let symbols = grammar("S.pq", &code);
    assert_eq!(symbols[0].fields().unwrap()[0].value_type, expected);
}

// ============================================
// Lexical fallback
// ============================================

#[rstest]
#[case("\"hello\"", ValueType::Text)]
#[case("true", ValueType::Logical)]
#[case("false", ValueType::Logical)]
#[case("42", ValueType::Number)]
#[case("3.14", ValueType::Number)]
#[case("[a=1]", ValueType::Record)]
#[case("{1,2}", ValueType::List)]
#[case("(x) => x", ValueType::Function)]
#[case("someIdentifier", ValueType::Any)]
fn test_literal_type_inference(#[case] value: &str, #[case] expected: ValueType) {
    assert_eq!(infer_literal_type(value), expected);
}

#[test]
fn test_documentation_association() {
    let symbols = lexical("// Computes total\n// with tax\nTotal = (price) => price * 1.08");
    assert_eq!(symbols.len(), 1);
    assert!(matches!(symbols[0].kind, SymbolKind::Function { .. }));
    assert_eq!(symbols[0].documentation.as_deref(), Some("Computes total with tax"));
}

#[test]
fn test_lexical_line_exclusivity() {
    let code = "F = (a) => a\nR = [\n  x = 1,\n  y = \"t\"\n]\nV = 3\n// comment = 4\nW = F(1)";
    let symbols = lexical(code);

    let mut lines: Vec<_> = symbols.iter().map(|s| s.line).collect();
    lines.dedup();
    assert_eq!(lines.len(), symbols.len());
    let kinds: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind.name())).collect();
    assert_eq!(
        kinds,
        vec![("F", "function"), ("R", "record"), ("V", "variable"), ("W", "variable")]
    );
    let fields = symbols[1].fields().unwrap();
    assert_eq!(fields.len(), 2);
}

#[test]
fn test_lexical_unclosed_record_runs_to_end() {
    let symbols = lexical("R = [\n  a = 1,\n  b = 2");
    assert_eq!(symbols.len(), 1);
    assert_eq!(symbols[0].fields().map(<[_]>::len), Some(2));
}

// ============================================
// Idempotence and failure isolation
// ============================================

#[test]
fn test_extraction_is_idempotent() {
    let file = source("Finance.pq", SECTION);
    let scanner = SymbolScanner::default();
    assert_eq!(scanner.scan_file(&file), scanner.scan_file(&file));

    let lexical_file = source("Loose.pq", "A = 1\nB = [x = 1]\nC = (y) => y");
    let extractor = LexicalExtractor::new();
    assert_eq!(
        extractor.extract(&lexical_file).unwrap(),
        extractor.extract(&lexical_file).unwrap()
    );
}

#[test]
fn test_unreadable_file_yields_empty_list() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Vanished.pq");
    let file = Arc::new(SourceFile::under_root(&path, dir.path()));

    assert!(SymbolScanner::default().scan_file(&file).is_empty());
    assert!(matches!(LexicalExtractor::new().extract(&file), Err(SymbolError::Read { .. })));
}

#[test]
fn test_scan_reads_from_disk_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lib").join("Helpers.pq");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "section Helpers;\nshared Id = (x) => x;").unwrap();

    let file = Arc::new(SourceFile::under_root(&path, dir.path()));
    assert!(file.last_modified().is_some());
    assert_eq!(file.category(), "lib/Helpers");

    let first = SymbolScanner::default().scan_file(&file);
    fs::remove_file(&path).unwrap();
    // Content was cached by the first pass
    let second = SymbolScanner::default().scan_file(&file);
    assert_eq!(first, second);
    assert_eq!(names(&second), vec!["Id"]);
}

#[test]
fn test_parse_error_falls_back_or_fails() {
    let broken = "section Broken;\n// still documented\nshared Good = 1;\nshared Bad = (x) => ;";
    let files = vec![source("Broken.pq", broken), source("Fine.pq", "section Fine;\nshared Ok = 1;")];

    let lenient = SymbolScanner::from_config(&Config::default()).scan(&files);
    assert_eq!(names(&lenient.symbols), vec!["Good", "Bad", "Ok"]);
    assert_eq!(lenient.symbols[0].documentation.as_deref(), Some("still documented"));
    assert_eq!(lenient.fallbacks.len(), 1);

    let strict = SymbolScanner::from_config(&Config::strict()).scan(&files);
    assert_eq!(names(&strict.symbols), vec!["Ok"]);
    assert_eq!(strict.failures.len(), 1);
    assert!(strict.failures[0].error.to_string().contains("Broken.pq"));
}
