//! Tract-based embedding backend (fallback for musl and Intel Mac).
//!
//! Pure-Rust path: loads the ONNX model with tract-onnx, tokenizes with the
//! tokenizers crate, and runs inference on the caller's blocking thread.
//! Token representations are mean-pooled over the valid sequence length and
//! L2-normalized, matching the sentence-transformers reference pipeline.

use std::path::PathBuf;

use tract_onnx::prelude::*;

use crate::error::{Error, Result};

use super::normalize_l2;

const ALL_MINILM_REPO: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_MAX_LEN: usize = 256;

/// Model manifest: name -> (onnx path in repo, tokenizer path in repo).
fn model_manifest(model_name: &str) -> Result<(&'static str, &'static str)> {
    match model_name {
        "all-minilm-l6-v2" => Ok(("onnx/model.onnx", "tokenizer.json")),
        _ => Err(Error::Embedding(format!(
            "tract backend supports only all-minilm-l6-v2 for now; requested '{}'",
            model_name
        ))),
    }
}

fn cache_dir() -> Result<PathBuf> {
    let base = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let dir = PathBuf::from(base)
        .join(".cache")
        .join("meeting-recall")
        .join("models");
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::Embedding(format!("create cache dir: {}", e)))?;
    Ok(dir)
}

fn download_to_cache(repo: &str, path: &str, cache_path: &std::path::Path) -> Result<()> {
    if cache_path.exists() {
        return Ok(());
    }
    let url = format!(
        "https://huggingface.co/{}/resolve/main/{}",
        repo,
        path.replace(' ', "%20")
    );
    let resp = reqwest::blocking::get(&url)
        .map_err(|e| Error::Embedding(format!("download {}: {}", url, e)))?
        .error_for_status()
        .map_err(|e| Error::Embedding(format!("download {}: {}", url, e)))?;
    let bytes = resp
        .bytes()
        .map_err(|e| Error::Embedding(format!("read body: {}", e)))?;
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Embedding(format!("create cache parent: {}", e)))?;
    }
    std::fs::write(cache_path, &bytes)
        .map_err(|e| Error::Embedding(format!("write cache: {}", e)))?;
    Ok(())
}

/// Ensure model and tokenizer are in cache; return (onnx path, tokenizer path).
fn ensure_cached(model_name: &str) -> Result<(PathBuf, PathBuf)> {
    let (onnx_rel, tokenizer_rel) = model_manifest(model_name)?;
    let model_dir = cache_dir()?.join(model_name);
    let onnx_path = model_dir.join(onnx_rel);
    let tokenizer_path = model_dir.join(tokenizer_rel);
    download_to_cache(ALL_MINILM_REPO, onnx_rel, &onnx_path)?;
    download_to_cache(ALL_MINILM_REPO, tokenizer_rel, &tokenizer_path)?;
    Ok((onnx_path, tokenizer_path))
}

/// A loaded tract model, kept for the life of the process.
pub struct TractModel {
    plan: TypedSimplePlan<TypedModel>,
    tokenizer: tokenizers::Tokenizer,
    dims: usize,
}

impl TractModel {
    /// Download (if needed) and load the model. Must run on a blocking thread.
    pub fn load(model_name: &str, dims: usize) -> Result<Self> {
        let (onnx_path, tokenizer_path) = ensure_cached(model_name)?;

        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| Error::Embedding(format!("load tokenizer: {}", e)))?;

        let plan = tract_onnx::onnx()
            .model_for_path(&onnx_path)
            .map_err(|e| Error::Embedding(format!("load ONNX: {}", e)))?
            .into_optimized()
            .map_err(|e| Error::Embedding(format!("optimize: {}", e)))?
            .into_runnable()
            .map_err(|e| Error::Embedding(format!("build tract runnable: {}", e)))?;

        Ok(Self {
            plan,
            tokenizer,
            dims,
        })
    }

    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings: Vec<_> = texts
            .iter()
            .map(|s| {
                self.tokenizer
                    .encode(s.as_str(), true)
                    .map_err(|e| Error::Embedding(format!("tokenize: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(1)
            .min(DEFAULT_MAX_LEN);

        let batch = encodings.len();
        let mut input_ids = vec![0i64; batch * max_len];
        let mut attention_mask = vec![0i64; batch * max_len];

        for (i, enc) in encodings.iter().enumerate() {
            let ids = enc.get_ids();
            let len = ids.len().min(max_len);
            for (j, &id) in ids.iter().take(len).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = 1;
            }
        }

        let input_ids_tensor = ndarray::Array2::from_shape_vec((batch, max_len), input_ids)
            .map_err(|e| Error::Embedding(format!("input ids shape: {}", e)))?;
        let attention_mask_tensor =
            ndarray::Array2::from_shape_vec((batch, max_len), attention_mask)
                .map_err(|e| Error::Embedding(format!("attention mask shape: {}", e)))?;

        let input_ids_t: Tensor = input_ids_tensor.into();
        let attention_mask_t: Tensor = attention_mask_tensor.into();
        let result = self
            .plan
            .run(tvec!(input_ids_t.into(), attention_mask_t.into()))
            .map_err(|e| Error::Embedding(format!("inference: {}", e)))?;

        let output = result
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no output tensor".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| Error::Embedding(format!("output to array: {}", e)))?;

        // Output is [batch, seq_len, dims] (last_hidden_state, mean-pool over
        // the valid tokens) or [batch, dims] (already pooled). Handle both.
        let shape = view.shape();
        let mut embeddings = Vec::with_capacity(batch);
        if shape.len() == 2 {
            for i in 0..shape[0] {
                let row = view.slice(ndarray::s![i, ..]);
                embeddings.push(normalize_l2(row.iter().copied().collect()));
            }
        } else if shape.len() == 3 {
            let seq_len = shape[1];
            for (i, enc) in encodings.iter().enumerate() {
                let valid_len = enc.get_ids().len().min(seq_len).min(max_len);
                let mut sum = vec![0f32; self.dims];
                let mut count = 0f32;
                for j in 0..valid_len {
                    for (k, &v) in view.slice(ndarray::s![i, j, ..]).iter().enumerate() {
                        if k < self.dims {
                            sum[k] += v;
                        }
                    }
                    count += 1.0;
                }
                if count > 0.0 {
                    for x in &mut sum {
                        *x /= count;
                    }
                }
                embeddings.push(normalize_l2(sum));
            }
        } else {
            return Err(Error::Embedding(format!(
                "unexpected output shape: {:?}",
                shape
            )));
        }

        Ok(embeddings)
    }
}
