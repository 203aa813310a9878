//! Writes symbol files, one JSON document per source file

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, error, info, warn};

use crate::error::{Result, SymbolError};
use crate::schema::{sample_symbols, MicrosoftSymbolFile};
use crate::symbol::{SourceFile, Symbol};

/// File name of the sample descriptors written by [`SymbolEmitter::write_sample_symbols`]
pub const SAMPLE_FILE_NAME: &str = "test-symbols.json";

/// Mode of written symbol files on Unix
#[cfg(unix)]
pub const SYMBOL_FILE_MODE: u32 = 0o644;

/// A symbol file that could not be written
#[derive(Debug)]
pub struct WriteFailure {
    pub path: PathBuf,
    pub error: SymbolError,
}

#[derive(Debug, Default)]
pub struct EmitReport {
    pub files_written: usize,
    pub symbols_written: usize,
    pub failures: Vec<WriteFailure>,
}

impl EmitReport {
    /// True when at least one file of the batch failed to write
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed: usize,
    pub failed: usize,
}

/// Symbols of one source file, in extraction order
pub struct FileGroup<'a> {
    pub source: Arc<SourceFile>,
    pub symbols: Vec<&'a Symbol>,
}

/// Partition symbols by owning file, files in first-seen order.
pub fn group_by_file(symbols: &[Symbol]) -> IndexMap<PathBuf, FileGroup<'_>> {
    let mut groups: IndexMap<PathBuf, FileGroup<'_>> = IndexMap::new();
    for symbol in symbols {
        groups
            .entry(symbol.source.path().to_path_buf())
            .or_insert_with(|| FileGroup {
                source: Arc::clone(&symbol.source),
                symbols: Vec::new(),
            })
            .symbols
            .push(symbol);
    }
    groups
}

/// Owns an output directory. Writes through one emitter are serialized, and
/// every document replaces its predecessor atomically.
pub struct SymbolEmitter {
    output_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl SymbolEmitter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write `<base>.json` for every file that owns symbols.
    ///
    /// Fails only if the output directory cannot be created. A file that
    /// cannot be written is logged and recorded in the report.
    pub fn emit(&self, symbols: &[Symbol]) -> Result<EmitReport> {
        let _guard = self.write_lock.lock();
        self.ensure_output_dir()?;

        let mut report = EmitReport::default();
        let mut targets: HashMap<String, PathBuf> = HashMap::new();

        for (source_path, group) in group_by_file(symbols) {
            let base_name = group.source.base_name().to_string();
            if let Some(previous) = targets.insert(base_name.clone(), source_path.clone()) {
                warn!(
                    file = %source_path.display(),
                    previous = %previous.display(),
                    target = %format!("{base_name}.json"),
                    "symbol file name collision, later file wins"
                );
            }

            let path = self.output_dir.join(format!("{base_name}.json"));
            let documents: Vec<MicrosoftSymbolFile> =
                group.symbols.iter().map(|symbol| MicrosoftSymbolFile::from_symbol(symbol)).collect();

            match self.write_document(&path, &documents) {
                Ok(()) => {
                    debug!(path = %path.display(), count = documents.len(), "generated symbol file");
                    report.files_written += 1;
                    report.symbols_written += documents.len();
                }
                Err(error) => {
                    error!(path = %path.display(), error = %error, "failed to write symbol file");
                    report.failures.push(WriteFailure { path, error });
                }
            }
        }

        info!(
            files = report.files_written,
            symbols = report.symbols_written,
            failures = report.failures.len(),
            dir = %self.output_dir.display(),
            "symbol files written"
        );
        Ok(report)
    }

    /// Remove every `*.json` file in the output directory. A missing
    /// directory is not an error; individual deletion failures are logged.
    pub fn cleanup(&self) -> CleanupReport {
        let _guard = self.write_lock.lock();
        let mut report = CleanupReport::default();

        let entries = match fs::read_dir(&self.output_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return report,
            Err(e) => {
                warn!(dir = %self.output_dir.display(), error = %e, "cannot list symbols directory");
                return report;
            }
        };

        for path in entries.filter_map(|entry| entry.ok()).map(|entry| entry.path()) {
            if !is_symbol_file(&path) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                // Removed concurrently
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot remove symbol file");
                    report.failed += 1;
                }
            }
        }

        info!(count = report.removed, "cleaned up symbol files");
        report
    }

    /// Write the sample descriptors to `test-symbols.json`.
    pub fn write_sample_symbols(&self) -> Result<PathBuf> {
        let _guard = self.write_lock.lock();
        self.ensure_output_dir()?;
        let path = self.output_dir.join(SAMPLE_FILE_NAME);
        self.write_document(&path, &sample_symbols())?;
        info!(path = %path.display(), "generated sample symbol file");
        Ok(path)
    }

    /// `*.json` files currently in the output directory, sorted
    pub fn symbol_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.output_dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| is_symbol_file(path))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|source| SymbolError::CreateDir {
            path: self.output_dir.clone(),
            source,
        })
    }

    /// Pretty-printed array, written beside the target and renamed over it
    fn write_document(&self, path: &Path, documents: &[MicrosoftSymbolFile]) -> Result<()> {
        let json = serde_json::to_string_pretty(documents)?;
        let write_error = |source: io::Error| SymbolError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut temp = NamedTempFile::new_in(&self.output_dir).map_err(write_error)?;
        temp.write_all(json.as_bytes()).map_err(write_error)?;
        // Temp files are created 0600
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file()
                .set_permissions(fs::Permissions::from_mode(SYMBOL_FILE_MODE))
                .map_err(write_error)?;
        }
        temp.persist(path).map_err(|e| write_error(e.error))?;
        Ok(())
    }
}

fn is_symbol_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    fn symbol(name: &str, source: &Arc<SourceFile>) -> Symbol {
        Symbol::new(name, SymbolKind::Variable, Arc::clone(source), 1)
    }

    #[test]
    fn test_group_by_file_keeps_first_seen_order() {
        let a = Arc::new(SourceFile::from_content("a.pq", ""));
        let b = Arc::new(SourceFile::from_content("b.pq", ""));
        let symbols = vec![symbol("x", &b), symbol("y", &a), symbol("z", &b)];

        let groups = group_by_file(&symbols);
        let order: Vec<_> = groups.keys().cloned().collect();
        assert_eq!(order, vec![PathBuf::from("b.pq"), PathBuf::from("a.pq")]);
        let names: Vec<_> = groups[0].symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["x", "z"]);
    }

    #[test]
    fn test_is_partial() {
        let mut report = EmitReport::default();
        assert!(!report.is_partial());
        report.failures.push(WriteFailure {
            path: PathBuf::from("x.json"),
            error: SymbolError::Write {
                path: PathBuf::from("x.json"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            },
        });
        assert!(report.is_partial());
    }
}
