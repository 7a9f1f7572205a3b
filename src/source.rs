//! Sources that deliver definition documents by identifier

use std::collections::HashMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::ParseError;

/// Errors that can occur while loading a definition batch
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("definition source not found: {id}")]
    NotFound { id: String },

    #[error("error reading definition file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `text` is the document as read, for rendering the errors against
    #[error("failed to parse {id}: {}", format_parse_errors(.errors))]
    Parse {
        id: String,
        text: String,
        errors: Vec<ParseError>,
    },
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Notification sent to load listeners
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadEvent {
    Loaded { id: String, added: usize },
    Failed { id: String, error: String },
    Unloaded { id: String, removed: usize },
}

/// Resource layer seam: read the raw text of a definition batch
pub trait DocumentSource {
    fn read(&self, id: &str) -> Result<String, LoadError>;
}

/// Reads definition files from disk
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    /// Base path for resolving relative identifiers
    base_path: Option<PathBuf>,
}

impl FileSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source resolving identifiers against `base_path`
    pub fn with_base_path(base_path: PathBuf) -> Self {
        Self {
            base_path: Some(base_path),
        }
    }

    /// Resolve a relative identifier to a path
    pub fn resolve_path(&self, id: &str) -> PathBuf {
        match &self.base_path {
            Some(base) => base.join(id),
            None => PathBuf::from(id),
        }
    }
}

impl DocumentSource for FileSource {
    fn read(&self, id: &str) -> Result<String, LoadError> {
        let path = self.resolve_path(id);
        std::fs::read_to_string(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound { id: id.to_string() },
            _ => LoadError::Io { path, source },
        })
    }
}

/// Serves documents held in memory, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.documents.insert(id.into(), text.into());
    }
}

impl DocumentSource for MemorySource {
    fn read(&self, id: &str) -> Result<String, LoadError> {
        self.documents
            .get(id)
            .cloned()
            .ok_or_else(|| LoadError::NotFound { id: id.to_string() })
    }
}
