//! Engine configuration.
//!
//! Loaded from the environment (and an optional `lexcanon` config file)
//! through the `config` crate, with serde defaults for everything, so a
//! bare process starts in a fully local degraded mode: stub embeddings,
//! WordNet-only sources, detached store. API keys switch adapters on;
//! absent keys silently skip them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// `true` selects the 3-phase pipeline. The legacy cascade is
    /// recognized but not built; `false` logs a warning and the 3-phase
    /// pipeline runs anyway.
    #[serde(default = "default_true")]
    pub use_new_pipeline: bool,

    /// Full ensemble + LLM fallback when `true`; plain embedding-cosine
    /// scoring when `false`.
    #[serde(default = "default_true")]
    pub use_hybrid_scorer: bool,

    /// Comma-separated `T,E,K` ensemble weights.
    #[serde(default = "default_hybrid_weights")]
    pub hybrid_weights: String,

    /// Ensemble margin below which the LLM fallback fires.
    #[serde(default = "default_confidence_threshold")]
    pub hybrid_confidence_threshold: f32,

    #[serde(default = "default_true")]
    pub enable_llm_fallback: bool,

    #[serde(default = "default_llm_model")]
    pub llm_fallback_model: String,

    /// OpenAI-compatible completion endpoint for the fallback model; the
    /// fallback is unavailable without one.
    #[serde(default)]
    pub llm_fallback_endpoint: Option<String>,

    /// Gloss-context classifier endpoint; only consulted when the
    /// transformer weight is non-zero.
    #[serde(default)]
    pub transformer_endpoint: Option<String>,

    /// Sentence-embedding model label.
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// `"stub"` or `"api"`.
    #[serde(default = "default_embedding_mode")]
    pub embedding_mode: String,

    #[serde(default)]
    pub embedding_api_url: Option<String>,

    #[serde(default)]
    pub embedding_api_auth_header: Option<String>,

    // ── Lexical-source credentials; adapters skip silently when unset ──
    #[serde(default)]
    pub babelnet_api_key: Option<String>,

    /// RapidAPI key for WordsAPI.
    #[serde(default)]
    pub rapidapi_key: Option<String>,

    #[serde(default)]
    pub merriam_webster_api_key: Option<String>,

    /// WNdb dictionary directory; missing directory degrades to an empty
    /// local database.
    #[serde(default)]
    pub wordnet_dir: Option<PathBuf>,

    // ── Persistent store (PostgREST-style row API) ──────────────────────
    #[serde(default)]
    pub store_url: Option<String>,

    #[serde(default)]
    pub store_api_key: Option<String>,

    // ── Canonicalizer knobs ─────────────────────────────────────────────
    /// Gate for the offline Wikidata-alias enrichment.
    #[serde(default = "default_true")]
    pub enable_wikidata_enrichment: bool,

    #[serde(default = "default_p8814_path")]
    pub wordnet_wikidata_map_path: PathBuf,

    /// Rule B sibling threshold.
    #[serde(default = "default_min_siblings")]
    pub min_siblings: u32,

    /// Rule C gate. Leave off without empirical validation.
    #[serde(default)]
    pub enable_similarity_collapse: bool,

    // ── Sidecar paths ───────────────────────────────────────────────────
    #[serde(default = "default_key_canonicals_path")]
    pub key_canonicals_path: PathBuf,

    #[serde(default = "default_geocoding_cache_path")]
    pub geocoding_cache_path: PathBuf,

    /// Key-canonicalizer embedding acceptance threshold.
    #[serde(default = "default_key_similarity_threshold")]
    pub key_similarity_threshold: f32,

    /// Borderline window upper bound for the review queue.
    #[serde(default = "default_key_borderline_threshold")]
    pub key_borderline_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        // Round-trips through serde so the field defaults stay the single
        // source of truth.
        serde_json::from_value(serde_json::json!({})).expect("defaults are valid")
    }
}

impl EngineConfig {
    /// Load from `lexcanon.{toml,json,yaml}` (optional), a `.env` file, and
    /// the process environment (`USE_HYBRID_SCORER`, `BABELNET_API_KEY`, ...).
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let builder = config::Config::builder()
            .add_source(config::File::with_name("lexcanon").required(false))
            .add_source(config::Environment::default());
        Ok(builder.build()?.try_deserialize()?)
    }
}

fn default_true() -> bool {
    true
}

fn default_hybrid_weights() -> String {
    "0.0,0.7,0.3".to_string()
}

fn default_confidence_threshold() -> f32 {
    0.10
}

fn default_llm_model() -> String {
    "llama-3.2-1b-instruct".to_string()
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_mode() -> String {
    "stub".to_string()
}

fn default_p8814_path() -> PathBuf {
    PathBuf::from("wordnet_wikidata_map.json")
}

fn default_min_siblings() -> u32 {
    1
}

fn default_key_canonicals_path() -> PathBuf {
    PathBuf::from("key_canonicals.json")
}

fn default_geocoding_cache_path() -> PathBuf {
    PathBuf::from("geocoding_cache.json")
}

fn default_key_similarity_threshold() -> f32 {
    0.80
}

fn default_key_borderline_threshold() -> f32 {
    0.85
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_local_degraded_mode() {
        let cfg = EngineConfig::default();
        assert!(cfg.use_new_pipeline);
        assert!(cfg.use_hybrid_scorer);
        assert_eq!(cfg.hybrid_weights, "0.0,0.7,0.3");
        assert!((cfg.hybrid_confidence_threshold - 0.10).abs() < f32::EPSILON);
        assert_eq!(cfg.embedding_mode, "stub");
        assert!(cfg.babelnet_api_key.is_none());
        assert!(cfg.store_url.is_none());
        assert!(!cfg.enable_similarity_collapse);
        assert!((cfg.key_similarity_threshold - 0.80).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let cfg: EngineConfig = serde_json::from_value(serde_json::json!({
            "use_hybrid_scorer": false,
            "babelnet_api_key": "key-123",
            "hybrid_weights": "0.5,0.35,0.15"
        }))
        .expect("parses");
        assert!(!cfg.use_hybrid_scorer);
        assert_eq!(cfg.babelnet_api_key.as_deref(), Some("key-123"));
        assert_eq!(cfg.hybrid_weights, "0.5,0.35,0.15");
        assert!(cfg.use_new_pipeline);
    }
}
