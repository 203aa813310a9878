//! Parser-independent symbol model
//!
//! A [`Symbol`] is one exported definition of a Power Query source file. Both
//! extractors produce these, and the emitter projects them into the JSON
//! descriptor format.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use once_cell::sync::OnceCell;

use crate::error::SymbolError;

/// Identity of one source unit with lazily loaded, cached content.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    relative_path: PathBuf,
    file_name: String,
    last_modified: Option<SystemTime>,
    content: OnceCell<String>,
}

impl SourceFile {
    /// A file on disk. `relative_path` is the path below the workspace root
    /// and determines the documentation category of its symbols.
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let last_modified = fs::metadata(&path).and_then(|m| m.modified()).ok();
        Self::with_parts(path, relative_path.into(), last_modified, OnceCell::new())
    }

    /// A file found under `root`; the relative path is derived from it.
    ///
    /// Paths that do not share a literal prefix with `root` (`sub/a.pq`
    /// under `.`) are compared in canonical form.
    pub fn under_root(path: impl Into<PathBuf>, root: &Path) -> Self {
        let path = path.into();
        let relative = relative_to(&path, root)
            .unwrap_or_else(|| PathBuf::from(path.file_name().unwrap_or(path.as_os_str())));
        Self::new(path, relative)
    }

    /// An in-memory source; `path` supplies the identity only and is never read.
    pub fn from_content(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let path = path.into();
        Self::with_parts(path.clone(), path, None, OnceCell::with_value(content.into()))
    }

    fn with_parts(
        path: PathBuf,
        relative_path: PathBuf,
        last_modified: Option<SystemTime>,
        content: OnceCell<String>,
    ) -> Self {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            relative_path,
            file_name,
            last_modified,
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// File name with extension, e.g. `Helpers.pq`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    /// File name without its extension; names the emitted `<base>.json`.
    pub fn base_name(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.file_name)
    }

    /// `dir/base` for files below the root, `base` for files at the root.
    pub fn category(&self) -> String {
        match self.relative_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && dir != Path::new(".") => {
                format!("{}/{}", dir.to_string_lossy().replace('\\', "/"), self.base_name())
            }
            _ => self.base_name().to_string(),
        }
    }

    /// UTF-8 text of the file, read once and cached for the life of `self`.
    pub fn content(&self) -> Result<&str, SymbolError> {
        self.content
            .get_or_try_init(|| fs::read_to_string(&self.path))
            .map(String::as_str)
            .map_err(|source| SymbolError::Read {
                path: self.path.clone(),
                source,
            })
    }
}

fn relative_to(path: &Path, root: &Path) -> Option<PathBuf> {
    if let Ok(relative) = path.strip_prefix(root) {
        return Some(relative.to_path_buf());
    }
    let path = fs::canonicalize(path).ok()?;
    let root = fs::canonicalize(root).ok()?;
    path.strip_prefix(&root).ok().map(Path::to_path_buf)
}

/// Primitive type names of the Power Query type system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Any,
    AnyNonNull,
    Binary,
    Date,
    DateTime,
    DateTimeZone,
    Duration,
    Function,
    List,
    Logical,
    None,
    Null,
    Number,
    Record,
    Table,
    Text,
    Time,
    Type,
}

impl ValueType {
    pub fn from_name(name: &str) -> Option<Self> {
        let value_type = match name {
            "any" => ValueType::Any,
            "anynonnull" => ValueType::AnyNonNull,
            "binary" => ValueType::Binary,
            "date" => ValueType::Date,
            "datetime" => ValueType::DateTime,
            "datetimezone" => ValueType::DateTimeZone,
            "duration" => ValueType::Duration,
            "function" => ValueType::Function,
            "list" => ValueType::List,
            "logical" => ValueType::Logical,
            "none" => ValueType::None,
            "null" => ValueType::Null,
            "number" => ValueType::Number,
            "record" => ValueType::Record,
            "table" => ValueType::Table,
            "text" => ValueType::Text,
            "time" => ValueType::Time,
            "type" => ValueType::Type,
            _ => return None,
        };
        Some(value_type)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Any => "any",
            ValueType::AnyNonNull => "anynonnull",
            ValueType::Binary => "binary",
            ValueType::Date => "date",
            ValueType::DateTime => "datetime",
            ValueType::DateTimeZone => "datetimezone",
            ValueType::Duration => "duration",
            ValueType::Function => "function",
            ValueType::List => "list",
            ValueType::Logical => "logical",
            ValueType::None => "none",
            ValueType::Null => "null",
            ValueType::Number => "number",
            ValueType::Record => "record",
            ValueType::Table => "table",
            ValueType::Text => "text",
            ValueType::Time => "time",
            ValueType::Type => "type",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value_type: ValueType,
    pub is_required: bool,
    pub is_nullable: bool,
    pub description: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            is_required: true,
            is_nullable: false,
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value_type: ValueType,
    pub description: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: None,
        }
    }
}

/// What a symbol is. Parameters exist only on functions and fields only on
/// records; a record literal with no fields carries `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolKind {
    Function { parameters: Vec<Parameter> },
    Variable,
    Record { fields: Option<Vec<Field>> },
}

impl SymbolKind {
    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Function { .. } => "function",
            SymbolKind::Variable => "variable",
            SymbolKind::Record { .. } => "record",
        }
    }
}

/// One exported definition
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub source: Arc<SourceFile>,
    /// 1-based line of the definition
    pub line: usize,
    pub documentation: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, source: Arc<SourceFile>, line: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            line: line.max(1),
            documentation: None,
        }
    }

    pub fn with_documentation(mut self, documentation: Option<String>) -> Self {
        self.documentation = documentation;
        self
    }

    pub fn parameters(&self) -> Option<&[Parameter]> {
        match &self.kind {
            SymbolKind::Function { parameters } => Some(parameters),
            _ => None,
        }
    }

    pub fn fields(&self) -> Option<&[Field]> {
        match &self.kind {
            SymbolKind::Record { fields } => fields.as_deref(),
            _ => None,
        }
    }
}

/// Symbols compare by content; the owning file compares by path.
impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && self.line == other.line
            && self.documentation == other.documentation
            && self.source.path() == other.source.path()
    }
}

impl Eq for Symbol {}
