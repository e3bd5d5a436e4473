use std::collections::HashSet;
use std::path::{Path, PathBuf};

use docqa_core::chunker::{chunk_pages, ChunkingConfig};
use docqa_core::error::{Error, Result};
use docqa_core::traits::{validate_batch, DocumentLoader, Embedder, NearestNeighborIndex};
use docqa_core::types::{IngestPolicy, SearchResult};
use docqa_vector::FlatIndex;
use parking_lot::{RwLock, RwLockWriteGuard};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::answer::{Answer, AnswerGenerator};

/// Outcome of writing the snapshot after an ingest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "lowercase")]
pub enum Persistence {
    /// No snapshot directory configured.
    Disabled,
    Saved(PathBuf),
    /// The in-memory index is committed but the snapshot is stale.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub fragments_added: usize,
    pub total_count: usize,
    pub policy: IngestPolicy,
    pub persistence: Persistence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexStatus {
    pub built: bool,
    pub total_count: usize,
    /// Distinct fragment sources in first-insertion order.
    pub sources: Vec<String>,
}

/// Ingest and query pipeline over a shared vector index.
///
/// The index is either empty (nothing to search) or built; the state is read
/// off the index itself so a restored snapshot counts as built. Loading,
/// chunking and embedding happen before the index lock is taken, so readers
/// are only blocked for the insert itself.
pub struct Retriever<I = FlatIndex>
where
    I: NearestNeighborIndex,
{
    chunking: ChunkingConfig,
    policy: IngestPolicy,
    snapshot_dir: Option<PathBuf>,
    embedder: Box<dyn Embedder>,
    loader: Box<dyn DocumentLoader>,
    index: RwLock<I>,
}

impl<I> Retriever<I>
where
    I: NearestNeighborIndex,
{
    pub fn new(index: I, embedder: Box<dyn Embedder>, loader: Box<dyn DocumentLoader>) -> Result<Self> {
        if index.dim() != embedder.dim() {
            return Err(Error::InvalidConfig(format!(
                "embedder `{}` produces {}-dimensional vectors but the index holds {}",
                embedder.model_id(),
                embedder.dim(),
                index.dim()
            )));
        }
        info!(model = embedder.model_id(), dim = index.dim(), "retriever initialized");
        Ok(Self {
            chunking: ChunkingConfig::default(),
            policy: IngestPolicy::default(),
            snapshot_dir: None,
            embedder,
            loader,
            index: RwLock::new(index),
        })
    }

    pub fn with_chunking(mut self, chunking: ChunkingConfig) -> Result<Self> {
        chunking.validate()?;
        self.chunking = chunking;
        Ok(self)
    }

    pub fn with_policy(mut self, policy: IngestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Persist after every ingest and restore from `dir`.
    pub fn with_snapshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshot_dir = Some(dir.into());
        self
    }

    pub fn policy(&self) -> IngestPolicy {
        self.policy
    }

    pub fn snapshot_dir(&self) -> Option<&Path> {
        self.snapshot_dir.as_deref()
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn total_count(&self) -> usize {
        self.index.read().total_count()
    }

    pub fn is_built(&self) -> bool {
        self.total_count() > 0
    }

    /// Load, chunk and embed `paths`, then commit them to the index in one batch.
    pub fn build_index<P: AsRef<Path>>(&self, paths: &[P]) -> Result<IngestReport> {
        let mut pages = Vec::new();
        for path in paths {
            let path = path.as_ref();
            info!(path = %path.display(), "processing document");
            pages.extend(self.loader.load(path)?);
        }
        let fragments = chunk_pages(&pages, &self.chunking)?;
        if fragments.is_empty() {
            return Err(Error::NoExtractableContent);
        }

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;
        let added = fragments.len();

        let mut index = self.index.write();
        if self.policy == IngestPolicy::Replace {
            validate_batch(index.dim(), &fragments, &vectors)?;
            index.reset();
        }
        index.insert_batch(fragments, vectors)?;
        let total_count = index.total_count();
        let index = RwLockWriteGuard::downgrade(index);
        let persistence = self.persist(&*index);
        drop(index);

        info!(documents = paths.len(), added, total = total_count, policy = ?self.policy, "index built");
        Ok(IngestReport { documents: paths.len(), fragments_added: added, total_count, policy: self.policy, persistence })
    }

    fn persist(&self, index: &I) -> Persistence {
        let Some(dir) = &self.snapshot_dir else {
            return Persistence::Disabled;
        };
        match index.save(dir) {
            Ok(()) => Persistence::Saved(dir.clone()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to save index snapshot");
                Persistence::Failed(e.to_string())
            }
        }
    }

    pub fn search(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        if !self.is_built() {
            return Err(Error::IndexNotBuilt);
        }
        if question.trim().is_empty() {
            return Err(Error::EmptyQuestion);
        }
        let query = self.embedder.embed_one(question)?;
        let results = self.index.read().search(&query, k).map_err(|e| match e {
            // reset raced in between the check and the search
            Error::EmptyIndex => Error::IndexNotBuilt,
            other => other,
        })?;
        debug!(k, returned = results.len(), "search complete");
        Ok(results)
    }

    pub fn answer(&self, question: &str, k: usize, generator: &dyn AnswerGenerator) -> Result<Answer> {
        let results = self.search(question, k)?;
        info!(model = generator.model_id(), context = results.len(), "generating answer");
        generator.generate(question, &results)
    }

    /// Write the current index to the snapshot directory, if one is configured.
    pub fn save_snapshot(&self) -> Persistence {
        let index = self.index.read();
        self.persist(&*index)
    }

    /// Clear the in-memory index. The snapshot on disk is left alone.
    pub fn reset(&self) {
        self.index.write().reset();
        info!("index reset");
    }

    /// Load the configured snapshot. Returns whether one was found.
    pub fn restore(&self) -> Result<bool> {
        let Some(dir) = &self.snapshot_dir else {
            return Ok(false);
        };
        self.index.write().load(dir)
    }

    pub fn status(&self) -> IndexStatus {
        let index = self.index.read();
        let mut seen = HashSet::new();
        let sources = index
            .fragments()
            .iter()
            .filter(|f| seen.insert(f.source.as_str()))
            .map(|f| f.source.clone())
            .collect();
        IndexStatus { built: index.total_count() > 0, total_count: index.total_count(), sources }
    }
}
