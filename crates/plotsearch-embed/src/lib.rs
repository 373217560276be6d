use anyhow::{anyhow, Result};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use plotsearch_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

use device::select_device;
use pool::masked_mean_l2;
use tokenize::tokenize_on_device;

/// all-MiniLM-L6-v2 output dimensionality.
pub const EMBEDDING_DIM: usize = 384;
const MAX_LEN: usize = 256;

pub struct MiniLmModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl MiniLmModel {
    pub fn new() -> Result<Self> {
        let device = select_device();
        println!("🔄 Loading MiniLM model from local files...");
        let model_dir = resolve_model_dir()?;
        println!("📥 Loading tokenizer...");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        println!("📥 Loading model config...");
        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
        println!("📥 Loading model weights...");
        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, candle_core::Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        println!("✅ MiniLM model loaded!");
        Ok(Self { model, tokenizer, device })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vec = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if vec.len() != EMBEDDING_DIM {
            return Err(anyhow!("dim mismatch: got {} expected {}", vec.len(), EMBEDDING_DIM));
        }
        if start.elapsed().as_millis() > 100 {
            println!("⚠️  Slow embedding");
        }
        Ok(vec)
    }
}

impl Embedder for MiniLmModel {
    fn dim(&self) -> usize {
        EMBEDDING_DIM
    }
    fn max_len(&self) -> usize {
        MAX_LEN
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// Hash-based stand-in with the same dimensionality and L2 norm as the
/// real model. Deterministic per input, so repeated runs produce
/// byte-identical vectors.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }
    fn max_len(&self) -> usize {
        MAX_LEN
    }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

pub fn get_default_embedder() -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        println!("🧪 Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(EMBEDDING_DIM)));
    }
    Ok(Box::new(MiniLmModel::new()?))
}

fn resolve_model_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            println!("📦 Using APP_MODEL_DIR: {}", p.display());
            return Ok(p);
        }
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() {
            println!("📦 Using MODEL_DIR: {}", p.display());
            return Ok(p);
        }
    }
    let root = Path::new("../models/all-MiniLM-L6-v2");
    if root.exists() {
        println!("📦 Using model dir: {}", root.display());
        return Ok(root.to_path_buf());
    }
    let legacy = Path::new("models/all-MiniLM-L6-v2");
    if legacy.exists() {
        println!("📦 Using legacy model dir: {}", legacy.display());
        return Ok(legacy.to_path_buf());
    }
    Err(anyhow!("Could not locate all-MiniLM-L6-v2 model directory"))
}
