use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Fragment, PageText, SearchResult};

/// Text → vector gateway. Implementations return vectors of exactly
/// [`dim`](Embedder::dim) components, in input order.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the backing model (e.g. `hash:d384`).
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    /// Fails with [`Error::EmptyInput`] when `texts` is empty.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Fails with [`Error::EmptyInput`] when `text` is blank.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput("cannot embed blank text".into()));
        }
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::embedding("embedder returned no vector"))
    }
}

/// Extracts per-page text from a document on disk.
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Vec<PageText>>;
}

/// Nearest-neighbor store of fragments and their vectors.
///
/// Fragment `i` and vector `i` are kept at the same ordinal. Mutating
/// operations take `&mut self`; callers sharing an index across threads wrap
/// it in a read/write lock.
pub trait NearestNeighborIndex: Send + Sync {
    fn dim(&self) -> usize;
    fn total_count(&self) -> usize;
    fn fragments(&self) -> &[Fragment];

    /// Append a batch; incoming fragment ids are replaced by store ordinals.
    /// Either the whole batch is committed or nothing is.
    fn insert_batch(&mut self, fragments: Vec<Fragment>, vectors: Vec<Vec<f32>>) -> Result<()>;

    /// Up to `k` results in descending score order.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    fn save(&self, dir: &Path) -> Result<()>;

    /// Replace the contents with the snapshot in `dir`. Returns `false` and
    /// leaves the index untouched when no valid snapshot exists.
    fn load(&mut self, dir: &Path) -> Result<bool>;

    fn reset(&mut self);
}

/// Check a pending insert against the index dimension without mutating anything.
pub fn validate_batch(dim: usize, fragments: &[Fragment], vectors: &[Vec<f32>]) -> Result<()> {
    if fragments.len() != vectors.len() {
        return Err(Error::LengthMismatch { fragments: fragments.len(), vectors: vectors.len() });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
        return Err(Error::DimensionMismatch { expected: dim, actual: bad.len() });
    }
    Ok(())
}
