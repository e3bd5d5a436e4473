//! Local sentence-transformer embeddings (BERT family, e.g. all-MiniLM-L6-v2).
//!
//! The model directory must contain `tokenizer.json`, `config.json` and the
//! weights as `model.safetensors` or `pytorch_model.bin`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use docqa_core::error::{Error, Result};
use docqa_core::traits::Embedder;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::pool::masked_mean_l2;

const MAX_TOKENS: usize = 256;

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl SentenceEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::embedding(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e))
        })?;

        let config_path = model_dir.join("config.json");
        let raw_config =
            std::fs::read_to_string(&config_path).map_err(|e| Error::storage(&config_path, e))?;
        let config: BertConfig = serde_json::from_str(&raw_config).map_err(Error::embedding)?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)
            .map_err(Error::embedding)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::embedding("config.json has no hidden_size"))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).map_err(Error::embedding)?;

        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        info!(model = %name, dim, "sentence embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, id: format!("local:{}:d{}", name, dim) })
    }

    fn embed_text(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let start = Instant::now();
        let enc = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {}", e)))?;
        let mut ids = enc.get_ids().to_vec();
        let mut mask = enc.get_attention_mask().to_vec();
        if ids.len() > MAX_TOKENS {
            ids.truncate(MAX_TOKENS);
            mask.truncate(MAX_TOKENS);
        }
        let len = ids.len();
        let input_ids = Tensor::from_iter(ids, &self.device)?.reshape((1, len))?;
        let attention_mask = Tensor::from_iter(mask, &self.device)?.reshape((1, len))?;
        let token_type_ids = input_ids.zeros_like()?;

        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let v = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if start.elapsed().as_millis() > 100 {
            debug!(elapsed_ms = start.elapsed().as_millis() as u64, "slow embedding");
        }
        Ok(v)
    }
}

impl Embedder for SentenceEmbedder {
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
        debug!(count = texts.len(), "embedding texts");
        texts
            .iter()
            .map(|t| self.embed_text(t).map_err(Error::embedding))
            .collect()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return candle_core::safetensors::load(&safetensors, device).map_err(Error::embedding);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&pickle).map_err(Error::embedding)?;
    Ok(weights.into_iter().collect())
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            info!("embedding device: Metal");
            return dev;
        }
        tracing::warn!("Metal unavailable, falling back to CPU");
    }
    info!("embedding device: CPU");
    Device::Cpu
}

/// Locate model files: explicit config value, then `APP_MODEL_DIR`, then
/// `models/all-MiniLM-L6-v2` under the working directory.
pub fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    let candidates = configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::env::var("APP_MODEL_DIR").ok().map(PathBuf::from))
        .chain(std::iter::once(PathBuf::from("models/all-MiniLM-L6-v2")));
    for dir in candidates {
        if dir.join("tokenizer.json").exists() {
            return Ok(dir);
        }
        debug!(dir = %dir.display(), "no model files");
    }
    Err(Error::InvalidConfig("could not locate a sentence embedding model directory".into()))
}
