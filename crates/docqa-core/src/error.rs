use std::path::PathBuf;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Length mismatch: {fragments} fragments but {vectors} vectors")]
    LengthMismatch { fragments: usize, vectors: usize },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector index is empty; insert fragments before searching")]
    EmptyIndex,

    #[error("No extractable content in the provided documents")]
    NoExtractableContent,

    #[error("Index not built; ingest documents first")]
    IndexNotBuilt,

    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("Document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("Unsupported document type: {}", .0.display())]
    UnsupportedDocument(PathBuf),

    #[error("Storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Embedding failed: {0}")]
    Embedding(#[source] BoxError),

    #[error("Answer generation failed: {0}")]
    Generation(#[source] BoxError),

    #[error("Background task failed: {0}")]
    Worker(String),
}

impl Error {
    pub fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage { path: path.into(), source }
    }

    pub fn embedding(err: impl Into<BoxError>) -> Self {
        Self::Embedding(err.into())
    }

    pub fn generation(err: impl Into<BoxError>) -> Self {
        Self::Generation(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
