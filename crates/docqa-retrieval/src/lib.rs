//! docqa-retrieval
//!
//! Ties loader, chunker, embedder and vector index together into an
//! ingest/search pipeline, plus the hand-off types for answer generation.

pub mod answer;
pub mod retriever;
pub mod service;

pub use answer::{Answer, AnswerGenerator, ExtractiveGenerator, SourceRef};
pub use retriever::{IndexStatus, IngestReport, Persistence, Retriever};
pub use service::RetrievalService;
