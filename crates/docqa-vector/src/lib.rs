//! docqa-vector
//!
//! Exact brute-force vector index with atomic on-disk snapshots. Other
//! backends plug in through `docqa_core::traits::NearestNeighborIndex`.

pub mod distance;
pub mod flat;
pub mod snapshot;

pub use docqa_core::traits::NearestNeighborIndex;
pub use flat::FlatIndex;
