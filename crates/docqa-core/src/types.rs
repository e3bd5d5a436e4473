//! Value types shared by the chunker, the vector index and the orchestrator.

use serde::{Deserialize, Serialize};

/// Position of a fragment in its store, in insertion order (0-based).
pub type FragmentId = usize;

/// Text extracted from one page of a source document.
///
/// Produced by a [`DocumentLoader`](crate::traits::DocumentLoader); pages
/// without extractable text are omitted, so `page` numbers may have gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub text: String,
    pub source: String,
    /// 1-based physical page number.
    pub page: u32,
}

impl PageText {
    pub fn new(text: impl Into<String>, source: impl Into<String>, page: u32) -> Self {
        Self { text: text.into(), source: source.into(), page }
    }
}

/// A unit of indexed text with its provenance.
///
/// - `id`: ordinal in the owning store; the vector for this fragment lives at
///   the same ordinal in the vector table
/// - `text`: non-blank window of at most `chunk_size` characters
/// - `source`: originating document (file name)
/// - `page`: 1-based page within `source`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub id: FragmentId,
    pub text: String,
    pub source: String,
    pub page: u32,
}

/// A fragment returned by a similarity search.
///
/// `score` lies in `[0, 1]`; 1 is an identical direction, 0 the opposite one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub fragment: Fragment,
    pub score: f32,
}

/// How repeated ingestion treats fragments that are already indexed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestPolicy {
    /// New fragments are appended to the existing index.
    #[default]
    Accumulate,
    /// The index is cleared before the new fragments are inserted.
    Replace,
}
