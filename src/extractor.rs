//! Extraction pipeline over a batch of source files

use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{Result, SymbolError};
use crate::grammar::GrammarExtractor;
use crate::lexical::LexicalExtractor;
use crate::symbol::{SourceFile, Symbol};

/// Produces the symbols of one source file.
pub trait SymbolExtractor: Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    fn extract(&self, source: &Arc<SourceFile>) -> Result<Vec<Symbol>>;
}

/// A file whose symbols could not be extracted
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: SymbolError,
}

/// Result of scanning a batch. Symbols are in input-file order.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub symbols: Vec<Symbol>,
    pub files_scanned: usize,
    /// Files that failed to parse and were handed to the fallback extractor
    pub fallbacks: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

enum FileOutcome {
    Extracted(Vec<Symbol>),
    FellBack(Vec<Symbol>),
    Failed(SymbolError),
}

/// Runs the preferred extractor on each file and hands parse failures to the
/// fallback, if any. A failing file never affects the others.
pub struct SymbolScanner {
    primary: Box<dyn SymbolExtractor>,
    fallback: Option<Box<dyn SymbolExtractor>>,
    parallel: bool,
}

impl SymbolScanner {
    pub fn new(primary: Box<dyn SymbolExtractor>, fallback: Option<Box<dyn SymbolExtractor>>) -> Self {
        Self {
            primary,
            fallback,
            parallel: false,
        }
    }

    /// Grammar extraction, with the lexical fallback unless `use_fallback` is off
    pub fn from_config(config: &Config) -> Self {
        let fallback: Option<Box<dyn SymbolExtractor>> = if config.use_fallback {
            Some(Box::new(LexicalExtractor::new()))
        } else {
            None
        };
        Self::new(Box::new(GrammarExtractor::new()), fallback).with_parallel(config.parallel)
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Symbols of one file; failures are logged and yield an empty list.
    pub fn scan_file(&self, source: &Arc<SourceFile>) -> Vec<Symbol> {
        match self.scan_one(source) {
            FileOutcome::Extracted(symbols) | FileOutcome::FellBack(symbols) => symbols,
            FileOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn scan(&self, files: &[Arc<SourceFile>]) -> ScanReport {
        let outcomes: Vec<FileOutcome> = if self.parallel {
            files.par_iter().map(|file| self.scan_one(file)).collect()
        } else {
            files.iter().map(|file| self.scan_one(file)).collect()
        };

        let mut report = ScanReport {
            files_scanned: files.len(),
            ..ScanReport::default()
        };
        for (file, outcome) in files.iter().zip(outcomes) {
            match outcome {
                FileOutcome::Extracted(symbols) => report.symbols.extend(symbols),
                FileOutcome::FellBack(symbols) => {
                    report.fallbacks.push(file.path().to_path_buf());
                    report.symbols.extend(symbols);
                }
                FileOutcome::Failed(error) => report.failures.push(FileFailure {
                    path: file.path().to_path_buf(),
                    error,
                }),
            }
        }

        info!(
            files = report.files_scanned,
            symbols = report.symbols.len(),
            failures = report.failures.len(),
            "scan complete"
        );
        report
    }

    fn scan_one(&self, source: &Arc<SourceFile>) -> FileOutcome {
        let file = source.file_name();
        match self.primary.extract(source) {
            Ok(symbols) => {
                debug!(file, extractor = self.primary.name(), count = symbols.len(), "extracted symbols");
                FileOutcome::Extracted(symbols)
            }
            Err(error @ SymbolError::Parse { .. }) => {
                warn!(file, error = %error, "failed to parse source file");
                let Some(fallback) = &self.fallback else {
                    return FileOutcome::Failed(error);
                };
                match fallback.extract(source) {
                    Ok(symbols) => {
                        debug!(file, extractor = fallback.name(), count = symbols.len(), "extracted symbols");
                        FileOutcome::FellBack(symbols)
                    }
                    Err(error) => {
                        warn!(file, error = %error, "fallback extraction failed");
                        FileOutcome::Failed(error)
                    }
                }
            }
            Err(error) => {
                warn!(file, error = %error, "cannot read source file");
                FileOutcome::Failed(error)
            }
        }
    }
}

impl Default for SymbolScanner {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
