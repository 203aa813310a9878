//! Symbol file emission tests

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use pq_symbols::emitter::SAMPLE_FILE_NAME;
use pq_symbols::{
    Field, MicrosoftSymbolFile, SourceFile, Symbol, SymbolEmitter, SymbolError, SymbolKind, SymbolScanner, ValueType,
};

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap()
}

fn json_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".json"))
        .collect();
    names.sort();
    names
}

fn variable(name: &str, source: &Arc<SourceFile>) -> Symbol {
    Symbol::new(name, SymbolKind::Variable, Arc::clone(source), 1)
}

#[test]
fn test_one_file_per_source() {
    let dir = TempDir::new().unwrap();
    let a = Arc::new(SourceFile::from_content("a.pq", ""));
    let b = Arc::new(SourceFile::from_content("b.pq", ""));
    let symbols = vec![variable("a1", &a), variable("b1", &b), variable("a2", &a)];

    let report = SymbolEmitter::new(dir.path()).emit(&symbols).unwrap();
    assert_eq!(report.files_written, 2);
    assert_eq!(report.symbols_written, 3);
    assert!(!report.is_partial());

    assert_eq!(json_files(dir.path()), vec!["a.json", "b.json"]);
    let a_json = read_json(&dir.path().join("a.json"));
    let b_json = read_json(&dir.path().join("b.json"));
    assert_eq!(a_json.as_array().map(Vec::len), Some(2));
    assert_eq!(b_json.as_array().map(Vec::len), Some(1));
    assert_eq!(a_json[0]["name"], "a1");
    assert_eq!(a_json[1]["name"], "a2");
}

#[test]
fn test_output_directory_is_created() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("nested").join("deeper").join(".pq-symbols");
    let source = Arc::new(SourceFile::from_content("Lib.pq", ""));

    let report = SymbolEmitter::new(&out).emit(&[variable("X", &source)]).unwrap();
    assert_eq!(report.files_written, 1);
    assert!(out.join("Lib.json").is_file());
}

#[test]
fn test_directory_creation_failure_is_returned() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, "file").unwrap();
    let source = Arc::new(SourceFile::from_content("Lib.pq", ""));

    let result = SymbolEmitter::new(blocker.join("out")).emit(&[variable("X", &source)]);
    assert!(matches!(result, Err(SymbolError::CreateDir { .. })));
}

#[test]
fn test_rewrite_fully_overwrites() {
    let dir = TempDir::new().unwrap();
    let emitter = SymbolEmitter::new(dir.path());
    let source = Arc::new(SourceFile::from_content("Lib.pq", ""));

    emitter
        .emit(&[variable("Old1", &source), variable("Old2", &source)])
        .unwrap();
    emitter.emit(&[variable("New", &source)]).unwrap();

    let json = read_json(&dir.path().join("Lib.json"));
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["name"], "New");
    assert_eq!(json_files(dir.path()), vec!["Lib.json"]);
}

#[cfg(unix)]
#[test]
fn test_symbol_files_are_world_readable() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let emitter = SymbolEmitter::new(dir.path());
    let source = Arc::new(SourceFile::from_content("Lib.pq", ""));
    emitter.emit(&[variable("X", &source)]).unwrap();
    let sample = emitter.write_sample_symbols().unwrap();

    for path in [dir.path().join("Lib.json"), sample] {
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, pq_symbols::emitter::SYMBOL_FILE_MODE, "{}", path.display());
    }
}

#[test]
fn test_record_schema_accommodation() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(SourceFile::from_content("Shapes.pq", ""));
    let point = Symbol::new(
        "Point",
        SymbolKind::Record {
            fields: Some(vec![Field::new("x", ValueType::Number), Field::new("y", ValueType::Text)]),
        },
        source,
        3,
    );

    SymbolEmitter::new(dir.path()).emit(&[point]).unwrap();
    let json = read_json(&dir.path().join("Shapes.json"));

    let params = json[0]["functionParameters"].as_array().unwrap();
    assert_eq!(params.len(), 1);
    assert_eq!(params[0]["name"], "record");
    assert_eq!(params[0]["type"], "record");
    assert_eq!(params[0]["isRequired"], true);
    assert_eq!(params[0]["isNullable"], false);
    let fields: Vec<_> = params[0]["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| (f["name"].as_str().unwrap(), f["type"].as_str().unwrap()))
        .collect();
    assert_eq!(fields, vec![("x", "number"), ("y", "text")]);
}

#[test]
fn test_cleanup_removes_only_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.json"), "[]").unwrap();
    fs::write(dir.path().join("b.json"), "[]").unwrap();
    fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    let emitter = SymbolEmitter::new(dir.path());
    let report = emitter.cleanup();
    assert_eq!(report.removed, 2);
    assert_eq!(report.failed, 0);
    assert!(json_files(dir.path()).is_empty());
    assert!(dir.path().join("notes.txt").is_file());
    assert!(dir.path().is_dir());

    // Already empty
    assert_eq!(emitter.cleanup().removed, 0);
}

#[test]
fn test_cleanup_of_missing_directory_is_noop() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("never-created");
    let report = SymbolEmitter::new(&missing).cleanup();
    assert_eq!(report.removed, 0);
    assert_eq!(report.failed, 0);
    assert!(!missing.exists());
}

#[test]
fn test_base_name_collision_last_write_wins() {
    let dir = TempDir::new().unwrap();
    let first = Arc::new(SourceFile::from_content("one/Shared.pq", ""));
    let second = Arc::new(SourceFile::from_content("two/Shared.m", ""));

    let report = SymbolEmitter::new(dir.path())
        .emit(&[variable("FromOne", &first), variable("FromTwo", &second)])
        .unwrap();
    assert_eq!(report.files_written, 2);
    assert_eq!(json_files(dir.path()), vec!["Shared.json"]);
    assert_eq!(read_json(&dir.path().join("Shared.json"))[0]["name"], "FromTwo");
}

#[test]
fn test_sample_symbols() {
    let dir = TempDir::new().unwrap();
    let path = SymbolEmitter::new(dir.path()).write_sample_symbols().unwrap();
    assert_eq!(path, dir.path().join(SAMPLE_FILE_NAME));

    let json = read_json(&path);
    assert_eq!(json[0]["name"], "TestFunction");
    assert_eq!(json[0]["documentation"]["category"], "Test");
    assert_eq!(json[0]["functionParameters"][1]["isNullable"], true);
    assert_eq!(json[0]["functionParameters"][1]["fields"][0]["name"], "testMode");
    assert_eq!(json[1]["name"], "TestRecord");
    assert_eq!(json[1]["completionItemKind"], 6);

    let parsed: Vec<MicrosoftSymbolFile> = serde_json::from_value(json).unwrap();
    assert_eq!(parsed.len(), 2);
}

#[test]
fn test_workspace_end_to_end() {
    let root = TempDir::new().unwrap();
    let queries = root.path().join("queries");
    fs::create_dir_all(&queries).unwrap();
    fs::write(
        queries.join("Finance.pq"),
        "section Finance;\n// Adds VAT\nshared AddVat = (amount as number) => amount * 1.2;\nRate = 1.2;",
    )
    .unwrap();
    fs::write(root.path().join("Tools.pqm"), "let\n    Id = (x) => x\nin\n    [Identity = Id]").unwrap();

    let files = vec![
        Arc::new(SourceFile::under_root(queries.join("Finance.pq"), root.path())),
        Arc::new(SourceFile::under_root(root.path().join("Tools.pqm"), root.path())),
    ];
    let scan = SymbolScanner::default().scan(&files);
    let out = root.path().join(".pq-symbols");
    let emitted = SymbolEmitter::new(&out).emit(&scan.symbols).unwrap();
    assert_eq!(emitted.files_written, 2);

    let finance = read_json(&out.join("Finance.json"));
    assert_eq!(finance[0]["name"], "AddVat");
    assert_eq!(finance[0]["completionItemKind"], 2);
    assert_eq!(finance[0]["documentation"]["description"], "Adds VAT");
    assert_eq!(finance[0]["documentation"]["category"], "queries/Finance");
    assert_eq!(finance[0]["functionParameters"][0]["type"], "number");

    let tools = read_json(&out.join("Tools.json"));
    assert_eq!(tools[0]["name"], "Identity");
    assert_eq!(tools[0]["type"], "any");
    assert_eq!(tools[0]["documentation"]["description"], "Exported from Tools.pqm");
    assert_eq!(tools[0]["documentation"]["category"], "Tools");
}
