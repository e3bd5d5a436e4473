use std::hash::{Hash, Hasher};

use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use twox_hash::XxHash64;

/// Deterministic bag-of-tokens embedding.
///
/// Every lowercased whitespace token is hashed into one of `dim` buckets and
/// the result is L2-normalized. Texts sharing words land close together,
/// which is enough for development, tests and offline demos without model
/// weights.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::InvalidConfig("embedding dimension must be positive".into()));
        }
        Ok(Self { dim, id: format!("hash:d{}", dim) })
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(Error::EmptyInput("cannot embed an empty list of texts".into()));
        }
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}
