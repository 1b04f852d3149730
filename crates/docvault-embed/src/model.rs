//! Candle-backed XLM-RoBERTa embedder (BGE-M3 style weights).
//!
//! The model directory must contain `tokenizer.json`, `config.json` and either
//! `model.safetensors` or `pytorch_model.bin`. Output is the masked mean of the
//! last hidden state, L2-normalized.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use serde::Deserialize;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docvault_core::{Embedder, Error, Result};

const PROVIDER: &str = "model";

#[derive(Deserialize)]
struct ModelShape {
    hidden_size: usize,
}

pub struct ModelEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

fn model_err(e: impl std::fmt::Display) -> Error { Error::embedding(PROVIDER, e.to_string()) }

impl ModelEmbedder {
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        if !model_dir.is_dir() {
            return Err(model_err(format!("model directory not found: {}", model_dir.display())));
        }
        let device = select_device();
        info!(dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| model_err(format!("failed to load tokenizer from {}: {}", tokenizer_path.display(), e)))?;

        let raw_config = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: XLMRobertaConfig = serde_json::from_str(&raw_config).map_err(model_err)?;
        let shape: ModelShape = serde_json::from_str(&raw_config).map_err(model_err)?;

        let dtype = DType::F32;
        let safetensors = model_dir.join("model.safetensors");
        let vb = if safetensors.exists() {
            // SAFETY: the weights file is not modified while mapped.
            unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], dtype, &device) }.map_err(model_err)?
        } else {
            let weights = candle_core::pickle::read_all(model_dir.join("pytorch_model.bin")).map_err(model_err)?;
            let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
            VarBuilder::from_tensors(weights_map, dtype, &device)
        };
        let model = XLMRobertaModel::new(&config, vb).map_err(model_err)?;

        let name = model_dir.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let id = format!("model:{}:d{}", name, shape.hidden_size);
        info!(id = %id, "embedding model loaded");
        Ok(Self { model, tokenizer, device, dim: shape.hidden_size, max_len, id })
    }

    fn forward(&self, text: &str) -> candle_core::Result<Vec<f32>> {
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()
    }
}

impl Embedder for ModelEmbedder {
    fn id(&self) -> &str { &self.id }

    fn dim(&self) -> usize { self.dim }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(vec![0f32; self.dim]);
        }
        let v = self.forward(text).map_err(model_err)?;
        if v.len() != self.dim {
            return Err(model_err(format!("model returned {} values, expected {}", v.len(), self.dim)));
        }
        debug!(dim = v.len(), "embedded text");
        Ok(v)
    }
}

fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => { info!("device: metal"); return dev; }
            Err(e) => tracing::warn!(error = %e, "metal unavailable, falling back to cpu"),
        }
    }
    info!("device: cpu");
    Device::Cpu
}

/// Encode `text`, truncated to `max_len` tokens, as `[1, T]` id and mask tensors.
fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, max_len: usize, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| candle_core::Error::Msg(format!("tokenization failed: {e}")))?;
    let mut ids = enc.get_ids().to_vec();
    let mut mask = enc.get_attention_mask().to_vec();
    if ids.len() > max_len { ids.truncate(max_len); mask.truncate(max_len); }
    let len = ids.len();
    let input_ids = Tensor::from_iter(ids, device)?.reshape((1, len))?;
    let attention_mask = Tensor::from_iter(mask, device)?.reshape((1, len))?;
    Ok((input_ids, attention_mask))
}

/// Mean over unmasked tokens of `[B, T, H]`, then L2 normalization per row.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let hidden_dim = hidden.dim(2)?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask_3d = mask.unsqueeze(2)?;
    let mask_broadcast = match mask_3d.broadcast_as(hidden.shape()) {
        Ok(m) => m,
        Err(_) => mask_3d.repeat((1, 1, hidden_dim))?,
    };
    let sum = (hidden * &mask_broadcast)?.sum(1)?;
    let lengths = mask.sum(1)?.unsqueeze(1)?.to_dtype(sum.dtype())?;
    let mean = sum.broadcast_div(&lengths)?;
    let eps_val = match hidden.dtype() { DType::F16 => 1e-6f32, _ => 1e-12f32 };
    let eps = Tensor::new(&[eps_val], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    mean.broadcast_div(&norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_mean_l2_ignores_padding() {
        let dev = Device::Cpu;
        // Two tokens with hidden dim 4; second token is masked out.
        let h = Tensor::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], (1, 2, 4), &dev).unwrap();
        let mask = Tensor::from_slice(&[1u32, 0u32], (1, 2), &dev).unwrap();
        let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
        let norm = 30f32.sqrt();
        for (a, b) in out[0].iter().zip([1.0 / norm, 2.0 / norm, 3.0 / norm, 4.0 / norm]) {
            assert!((a - b).abs() < 1e-5, "a={a} b={b}");
        }
    }

    #[test]
    fn missing_model_dir_is_an_embedding_error() {
        let err = ModelEmbedder::load(Path::new("/definitely/not/here"), 16).err().unwrap();
        assert_eq!(err.kind(), docvault_core::ErrorKind::Embedding);
    }
}
