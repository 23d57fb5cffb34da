//! Shared sentence-embedding provider.
//!
//! One embedder instance serves every scorer in the process — the
//! disambiguation ensemble, the key canonicalizer, and the lexical-source
//! adapters that score descriptions against context. Obtain it through
//! [`shared`] so the model is configured and "loaded" exactly once.
//!
//! Two modes:
//!
//! - **`api`** — POST texts to an HF-style feature-extraction endpoint.
//!   The model name is configuration, not code.
//! - **`stub`** (default) — deterministic bag-of-tokens vectors seeded by a
//!   hash of each token. No network, no model files, stable across runs;
//!   texts that share words land near each other, which is what the scoring
//!   tests rely on.
//!
//! Vectors are L2-normalized by default so cosine similarity is a dot
//! product away.

mod api;
mod config;
mod error;
mod stub;

use once_cell::sync::OnceCell;

pub use crate::config::EmbedConfig;
pub use crate::error::EmbedError;

/// The process-wide embedder handle.
static SHARED: OnceCell<Embedder> = OnceCell::new();

/// Configure the process-wide embedder. Returns `false` when the embedder was
/// already initialized (first configuration wins, matching the rest of the
/// engine's first-writer-wins registries).
pub fn configure(cfg: EmbedConfig) -> bool {
    SHARED.set(Embedder::new(cfg)).is_ok()
}

/// The process-wide embedder, initializing a stub-mode instance on first use
/// if [`configure`] was never called.
pub fn shared() -> &'static Embedder {
    SHARED.get_or_init(|| Embedder::new(EmbedConfig::default()))
}

/// Sentence embedder. Cheap to construct; API mode shares one HTTP client
/// across all instances.
#[derive(Debug, Clone)]
pub struct Embedder {
    cfg: EmbedConfig,
}

impl Embedder {
    pub fn new(cfg: EmbedConfig) -> Self {
        if cfg.mode == "api" && cfg.api_url.is_none() {
            tracing::info!("embedder configured for api mode without an endpoint; using stub");
        }
        Embedder { cfg }
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.cfg
    }

    /// Encode one text into a dense vector.
    pub async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.encode_batch(&[text]).await?.remove(0))
    }

    /// Encode a batch of texts. Output is parallel to the input.
    pub async fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        match (self.cfg.mode.as_str(), &self.cfg.api_url) {
            ("api", Some(url)) => api::encode_via_api(url, texts, &self.cfg).await,
            _ => Ok(texts
                .iter()
                .map(|t| stub::stub_embedding(t, &self.cfg))
                .collect()),
        }
    }
}

/// Cosine similarity; 0.0 when either vector is zero or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stub_is_deterministic() {
        let e = Embedder::new(EmbedConfig::default());
        let a = e.encode("second hand car").await.expect("encode");
        let b = e.encode("second hand car").await.expect("encode");
        assert_eq!(a, b);
        assert_eq!(a.len(), EmbedConfig::default().dimension);
    }

    #[tokio::test]
    async fn stub_vectors_are_unit_length() {
        let e = Embedder::new(EmbedConfig::default());
        let v = e.encode("a motor vehicle with four wheels").await.expect("encode");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4, "norm was {norm}");
    }

    #[tokio::test]
    async fn shared_words_pull_texts_together() {
        let e = Embedder::new(EmbedConfig::default());
        let base = e
            .encode("in electronics products, the attribute 'brand' describes")
            .await
            .expect("encode");
        let near = e
            .encode("in electronics products, the attribute 'manufacturer' describes")
            .await
            .expect("encode");
        let far = e.encode("fluffy orange cat").await.expect("encode");

        let sim_near = cosine_similarity(&base, &near);
        let sim_far = cosine_similarity(&base, &far);
        assert!(
            sim_near > sim_far,
            "expected {sim_near} (overlapping) > {sim_far} (unrelated)"
        );
        assert!(sim_near > 0.5);
    }

    #[tokio::test]
    async fn empty_text_encodes_to_zero_vector() {
        let e = Embedder::new(EmbedConfig::default());
        let v = e.encode("").await.expect("encode");
        assert!(v.iter().all(|&x| x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[tokio::test]
    async fn batch_is_parallel_to_input() {
        let e = Embedder::new(EmbedConfig::default());
        let batch = e
            .encode_batch(&["dog", "cat", "dog"])
            .await
            .expect("encode batch");
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[0], batch[2]);
        assert_ne!(batch[0], batch[1]);
    }

    #[test]
    fn cosine_handles_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn shared_defaults_to_stub_mode() {
        let e = shared();
        assert_eq!(e.config().mode, "stub");
    }
}
