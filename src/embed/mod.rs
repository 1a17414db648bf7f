//! Embedding provider: turns text into fixed-length dense vectors with a
//! local feature-extraction model.
//!
//! Two backends sit behind the same [`Embedder`] trait:
//! - **fastembed** (feature `local-embeddings-fastembed`, default) — bundled
//!   ORT, no system dependencies.
//! - **tract** (feature `local-embeddings-tract`) — pure-Rust ONNX path for
//!   musl and Intel Mac, with explicit mean pooling and L2 normalization.
//!
//! Models are downloaded from Hugging Face on first use and cached. The
//! [`LocalEmbedder`] loads its model lazily, at most once per process:
//! concurrent first calls await a single in-flight initialization, and
//! empty input short-circuits before any model load.

#[cfg(all(
    feature = "local-embeddings-tract",
    not(feature = "local-embeddings-fastembed")
))]
mod local_tract;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

#[cfg(not(any(
    feature = "local-embeddings-fastembed",
    feature = "local-embeddings-tract"
)))]
compile_error!(
    "an embedding backend is required: enable `local-embeddings-fastembed` (default) \
     or `local-embeddings-tract`"
);

/// Seam for embedding backends. Tests inject deterministic fakes here.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text. Empty or whitespace-only input returns an
    /// empty vector without touching the model; callers treat an empty
    /// vector as "not embeddable".
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Vector dimensionality (e.g. `384`).
    fn dims(&self) -> usize;
}

/// Local embedding provider with lazy, memoized model initialization.
///
/// Construction only validates configuration; the model loads on the first
/// non-empty [`Embedder::embed`] call. The `OnceCell` guarantees a single
/// in-flight load even under concurrent first calls, and the loaded handle
/// is reused for the life of the process.
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    backend: OnceCell<Arc<Backend>>,
}

impl LocalEmbedder {
    /// Validate the configured model and build an uninitialized handle.
    ///
    /// Fails with [`Error::Config`] for unknown model names so a typo
    /// surfaces at startup rather than on the first indexing request.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let dims = resolve_model(&config.model, config.dims)?;
        Ok(Self {
            model_name: config.model.clone(),
            dims,
            backend: OnceCell::new(),
        })
    }

    async fn backend(&self) -> Result<Arc<Backend>> {
        self.backend
            .get_or_try_init(|| async {
                let model_name = self.model_name.clone();
                let dims = self.dims;
                let loaded =
                    tokio::task::spawn_blocking(move || Backend::load(&model_name, dims))
                        .await
                        .map_err(|e| {
                            Error::Embedding(format!("model load task failed: {}", e))
                        })??;
                Ok(Arc::new(loaded))
            })
            .await
            .map(Arc::clone)
    }
}

#[async_trait]
impl Embedder for LocalEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let backend = self.backend().await?;
        let text = text.to_string();
        let mut vectors =
            tokio::task::spawn_blocking(move || backend.embed_batch(&[text]))
                .await
                .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))??;

        vectors
            .pop()
            .ok_or_else(|| Error::Embedding("model returned no embedding".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Loaded inference engine, one variant per enabled backend.
enum Backend {
    #[cfg(feature = "local-embeddings-fastembed")]
    Fastembed(std::sync::Mutex<fastembed::TextEmbedding>),
    #[cfg(all(
        feature = "local-embeddings-tract",
        not(feature = "local-embeddings-fastembed")
    ))]
    Tract(local_tract::TractModel),
}

impl Backend {
    fn load(model_name: &str, _dims: usize) -> Result<Backend> {
        #[cfg(feature = "local-embeddings-fastembed")]
        {
            let model = fastembed_model(model_name)?;
            let engine = fastembed::TextEmbedding::try_new(
                fastembed::InitOptions::new(model).with_show_download_progress(true),
            )
            .map_err(|e| {
                Error::Embedding(format!("failed to initialize embedding model: {}", e))
            })?;
            Ok(Backend::Fastembed(std::sync::Mutex::new(engine)))
        }
        #[cfg(all(
            feature = "local-embeddings-tract",
            not(feature = "local-embeddings-fastembed")
        ))]
        {
            Ok(Backend::Tract(local_tract::TractModel::load(
                model_name, _dims,
            )?))
        }
        #[cfg(not(any(
            feature = "local-embeddings-fastembed",
            feature = "local-embeddings-tract"
        )))]
        {
            let _ = model_name;
            Err(Error::Embedding(
                "local embeddings require one of: --features local-embeddings-fastembed, \
                 --features local-embeddings-tract"
                    .to_string(),
            ))
        }
    }

    #[allow(unused_variables)]
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            #[cfg(feature = "local-embeddings-fastembed")]
            Backend::Fastembed(engine) => {
                let mut engine = engine
                    .lock()
                    .map_err(|_| Error::Embedding("embedding engine poisoned".to_string()))?;
                engine
                    .embed(texts.to_vec(), None)
                    .map_err(|e| Error::Embedding(format!("local embedding failed: {}", e)))
            }
            #[cfg(all(
                feature = "local-embeddings-tract",
                not(feature = "local-embeddings-fastembed")
            ))]
            Backend::Tract(model) => model.embed_batch(texts),
        }
    }
}

/// Resolve a model name to its vector dimensionality. An explicit `dims`
/// override wins; otherwise the name must be a known model.
fn resolve_model(model: &str, dims_override: Option<usize>) -> Result<usize> {
    if let Some(dims) = dims_override {
        if dims == 0 {
            return Err(Error::Config("embedding.dims must be > 0".to_string()));
        }
        return Ok(dims);
    }

    match model {
        "all-minilm-l6-v2" => Ok(384),
        "bge-small-en-v1.5" => Ok(384),
        "bge-base-en-v1.5" => Ok(768),
        "bge-large-en-v1.5" => Ok(1024),
        "nomic-embed-text-v1" | "nomic-embed-text-v1.5" => Ok(768),
        "multilingual-e5-small" => Ok(384),
        "multilingual-e5-base" => Ok(768),
        "multilingual-e5-large" => Ok(1024),
        other => Err(Error::Config(format!(
            "unknown embedding model '{}'; set embedding.dims to use an unlisted model",
            other
        ))),
    }
}

#[cfg(feature = "local-embeddings-fastembed")]
fn fastembed_model(name: &str) -> Result<fastembed::EmbeddingModel> {
    match name {
        "all-minilm-l6-v2" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(fastembed::EmbeddingModel::BGESmallENV15),
        "bge-base-en-v1.5" => Ok(fastembed::EmbeddingModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        "nomic-embed-text-v1" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV1),
        "nomic-embed-text-v1.5" => Ok(fastembed::EmbeddingModel::NomicEmbedTextV15),
        "multilingual-e5-small" => Ok(fastembed::EmbeddingModel::MultilingualE5Small),
        "multilingual-e5-base" => Ok(fastembed::EmbeddingModel::MultilingualE5Base),
        "multilingual-e5-large" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        other => Err(Error::Embedding(format!(
            "model '{}' is not available in the fastembed backend",
            other
        ))),
    }
}

/// L2-normalize a vector in place. Vectors below the norm floor are left
/// untouched rather than divided toward infinity.
pub fn normalize_l2(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 1e-9 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Cosine similarity in `[-1.0, 1.0]`. Returns `0.0` for empty vectors or
/// mismatched lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
