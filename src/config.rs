//! Configuration for symbol generation

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the optional config file at the workspace root
pub const CONFIG_FILE_NAME: &str = "pqsym.toml";

/// Symbol generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Extensions of Power Query source files, leading dot included
    pub file_extensions: Vec<String>,

    /// Output directory for symbol files, relative to the workspace root
    pub symbols_directory: PathBuf,

    /// Directory names skipped while walking the workspace
    pub exclude_patterns: Vec<String>,

    /// Retry files that fail to parse with the line-based extractor
    pub use_fallback: bool,

    /// Extract files on the rayon thread pool
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_extensions: vec![".pq".to_string(), ".m".to_string(), ".pqm".to_string()],
            symbols_directory: PathBuf::from(".pq-symbols"),
            exclude_patterns: vec!["node_modules".to_string(), ".git".to_string()],
            use_fallback: true,
            parallel: false,
        }
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Grammar-only extraction: files that fail to parse yield no symbols
    pub fn strict() -> Self {
        Self {
            use_fallback: false,
            ..Self::default()
        }
    }

    /// Read a TOML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `<root>/pqsym.toml` if it exists, defaults otherwise
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE_NAME);
        if path.is_file() {
            Self::from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Output directory resolved against the workspace root
    pub fn symbols_dir(&self, root: &Path) -> PathBuf {
        if self.symbols_directory.is_absolute() {
            self.symbols_directory.clone()
        } else {
            root.join(&self.symbols_directory)
        }
    }

    /// Whether `path` has one of the configured extensions (case-insensitive)
    pub fn is_supported(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.file_extensions
            .iter()
            .any(|ext| ext.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Whether a directory entry name matches an exclude pattern
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude_patterns.iter().any(|pattern| pattern == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.file_extensions, vec![".pq", ".m", ".pqm"]);
        assert_eq!(config.symbols_directory, PathBuf::from(".pq-symbols"));
        assert!(config.use_fallback);
        assert!(!config.parallel);
        assert!(!Config::strict().use_fallback);
    }

    #[test]
    fn test_is_supported() {
        let config = Config::default();
        assert!(config.is_supported(Path::new("queries/Sales.pq")));
        assert!(config.is_supported(Path::new("Lib.PQM")));
        assert!(config.is_supported(Path::new("a.m")));
        assert!(!config.is_supported(Path::new("notes.md")));
        assert!(!config.is_supported(Path::new("Makefile")));
    }

    #[test]
    fn test_symbols_dir() {
        let config = Config::default();
        assert_eq!(config.symbols_dir(Path::new("/work")), PathBuf::from("/work/.pq-symbols"));
    }

    #[test]
    fn test_load_partial_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "symbols_directory = \"out\"\nparallel = true\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.symbols_directory, PathBuf::from("out"));
        assert!(config.parallel);
        assert!(config.use_fallback);
    }

    #[test]
    fn test_load_without_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "use_fallback = \"maybe\"").unwrap();
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Toml { .. })));
    }
}
