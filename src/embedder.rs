use std::sync::Mutex;

use candle_core::Tensor;

use crate::{
    error::{Error, Result},
    model_manager::ModelManager,
};

/// Opaque text-to-vector function behind the semantic index.
///
/// One call per batch: callers hand over every text of an operation at
/// once so the external model is invoked a bounded number of times.
/// Implementations must return one fixed-length vector per input text,
/// in input order.
pub trait Embedder: Send + Sync {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Production embedder: ColBERT token embeddings mean-pooled into a
/// single vector per text. The model is loaded lazily on first use.
pub struct ColbertEmbedder {
    model: Mutex<ModelManager>,
}

impl ColbertEmbedder {
    pub fn new(model: ModelManager) -> Self {
        Self {
            model: Mutex::new(model),
        }
    }
}

impl Default for ColbertEmbedder {
    fn default() -> Self {
        Self::new(ModelManager::default())
    }
}

impl Embedder for ColbertEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut model = self
            .model
            .lock()
            .map_err(|_| Error::Backend("model lock poisoned".to_string()))?;
        let embeddings = model.encode_documents(texts)?;
        mean_pool(&embeddings, texts.len())
    }
}

/// Collapse a `[batch, tokens, dim]` tensor into one mean vector per
/// batch entry.
fn mean_pool(embeddings: &Tensor, batch: usize) -> Result<Vec<Vec<f32>>> {
    let (batch_size, _num_tokens, _dim) = embeddings.dims3().map_err(|e| {
        Error::Backend(format!("unexpected embedding tensor shape: {e}"))
    })?;

    let mut vectors = Vec::with_capacity(batch);
    for i in 0..batch_size.min(batch) {
        let pooled = embeddings
            .get(i)
            .and_then(|doc| doc.mean(0))
            .map_err(|e| {
                Error::Backend(format!(
                    "failed to pool embedding for batch index {i}: {e}"
                ))
            })?;
        let vector = pooled.to_vec1::<f32>().map_err(|e| {
            Error::Backend(format!("failed to convert embedding to f32: {e}"))
        })?;
        vectors.push(vector);
    }

    if vectors.len() != batch {
        return Err(Error::Backend(format!(
            "embedding backend returned {} vectors for {batch} texts",
            vectors.len()
        )));
    }

    Ok(vectors)
}
