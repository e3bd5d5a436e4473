use std::cmp::Ordering;
use std::path::Path;

use docqa_core::error::{Error, Result};
use docqa_core::traits::{validate_batch, NearestNeighborIndex};
use docqa_core::types::{Fragment, SearchResult};
use tracing::{debug, info, warn};

use crate::distance::{distance_to_score, l2_normalize, squared_l2};
use crate::snapshot;

/// Exact nearest-neighbor index over unit-normalized vectors.
///
/// Vectors are kept row-major in one buffer; row `i` belongs to
/// `fragments[i]`. Search scans every row, which is fine for corpora in the
/// tens of thousands of fragments.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dim: usize,
    vectors: Vec<f32>,
    fragments: Vec<Fragment>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("index dimension must be positive".into()));
        }
        debug!(dim, "initialized flat index");
        Ok(Self { dim, vectors: Vec::new(), fragments: Vec::new() })
    }

    /// New index restored from `dir` when a snapshot is present there.
    pub fn open(dir: &Path, dim: usize) -> Result<Self> {
        let mut index = Self::new(dim)?;
        index.load(dir)?;
        Ok(index)
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }
}

fn by_distance_then_id(a: &(f32, usize), b: &(f32, usize)) -> Ordering {
    a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
}

impl NearestNeighborIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn total_count(&self) -> usize {
        self.fragments.len()
    }

    fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    fn insert_batch(&mut self, fragments: Vec<Fragment>, vectors: Vec<Vec<f32>>) -> Result<()> {
        validate_batch(self.dim, &fragments, &vectors)?;
        let added = fragments.len();
        let base = self.fragments.len();

        self.vectors.reserve(added * self.dim);
        self.fragments.reserve(added);
        for (offset, (mut fragment, mut vector)) in fragments.into_iter().zip(vectors).enumerate() {
            l2_normalize(&mut vector);
            self.vectors.extend_from_slice(&vector);
            fragment.id = base + offset;
            self.fragments.push(fragment);
        }
        info!(added, total = self.fragments.len(), "inserted fragments");
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let total = self.total_count();
        if total == 0 {
            return Err(Error::EmptyIndex);
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: query.len() });
        }
        let k = if k > total {
            warn!(requested = k, available = total, "k reduced to index size");
            total
        } else {
            k
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut query = query.to_vec();
        l2_normalize(&mut query);

        let mut ranked: Vec<(f32, usize)> =
            (0..total).map(|i| (squared_l2(&query, self.row(i)), i)).collect();
        if k < ranked.len() {
            ranked.select_nth_unstable_by(k - 1, by_distance_then_id);
            ranked.truncate(k);
        }
        ranked.sort_unstable_by(by_distance_then_id);

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .map(|(d, i)| SearchResult { fragment: self.fragments[i].clone(), score: distance_to_score(d) })
            .collect();
        debug!(k, returned = results.len(), "searched flat index");
        Ok(results)
    }

    fn save(&self, dir: &Path) -> Result<()> {
        snapshot::write(dir, self.dim, &self.vectors, &self.fragments)?;
        info!(count = self.fragments.len(), dir = %dir.display(), "saved index");
        Ok(())
    }

    fn load(&mut self, dir: &Path) -> Result<bool> {
        let Some(snap) = snapshot::read(dir)? else {
            info!(dir = %dir.display(), "no saved index found, starting fresh");
            return Ok(false);
        };
        if snap.dim != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: snap.dim });
        }
        self.vectors = snap.vectors;
        self.fragments = snap.fragments;
        info!(count = self.fragments.len(), dir = %dir.display(), "loaded index");
        Ok(true)
    }

    fn reset(&mut self) {
        self.vectors.clear();
        self.fragments.clear();
        debug!("index reset");
    }
}
