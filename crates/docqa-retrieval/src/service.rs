use std::path::PathBuf;
use std::sync::Arc;

use docqa_core::error::{Error, Result};
use docqa_core::traits::NearestNeighborIndex;
use docqa_core::types::SearchResult;
use docqa_vector::FlatIndex;

use crate::retriever::{IndexStatus, IngestReport, Persistence, Retriever};

/// Cloneable async handle over a shared [`Retriever`].
///
/// Every call runs on tokio's blocking pool; the retriever's lock keeps
/// concurrent queries and ingests consistent.
pub struct RetrievalService<I = FlatIndex>
where
    I: NearestNeighborIndex + 'static,
{
    inner: Arc<Retriever<I>>,
}

impl<I> Clone for RetrievalService<I>
where
    I: NearestNeighborIndex + 'static,
{
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<I> RetrievalService<I>
where
    I: NearestNeighborIndex + 'static,
{
    pub fn new(retriever: Retriever<I>) -> Self {
        Self { inner: Arc::new(retriever) }
    }

    pub fn retriever(&self) -> &Retriever<I> {
        &self.inner
    }

    pub async fn ingest(&self, paths: Vec<PathBuf>) -> Result<IngestReport> {
        self.run("ingest", move |r| r.build_index(&paths)).await?
    }

    pub async fn query(&self, question: String, k: usize) -> Result<Vec<SearchResult>> {
        self.run("query", move |r| r.search(&question, k)).await?
    }

    pub async fn reset(&self) -> Result<()> {
        self.run("reset", |r| r.reset()).await
    }

    pub async fn save_snapshot(&self) -> Result<Persistence> {
        self.run("save", |r| r.save_snapshot()).await
    }

    pub async fn restore(&self) -> Result<bool> {
        self.run("restore", |r| r.restore()).await?
    }

    pub async fn status(&self) -> Result<IndexStatus> {
        self.run("status", |r| r.status()).await
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Retriever<I>) -> T + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| Error::Worker(format!("{} task failed: {}", op, e)))
    }
}
