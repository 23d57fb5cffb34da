//! Workspace umbrella crate for the lexcanon canonicalization engine.
//!
//! The `lexcanon` crate re-exports the preprocessing, lexical-source,
//! scoring, ontology, resolution, key-canonicalization, and orchestration
//! layers, and wires them into a single [`Engine`] so applications can
//! drive the full pipeline through one dependency.
//!
//! ## What the engine does
//!
//! Free-form attribute values from the upstream extractor ("used",
//! "pre-owned", "2nd hand", "gently worn") resolve to stable, shared
//! concept identifiers so set-membership and hierarchy matching work:
//! semantically equivalent surface strings land on the *same* id, and the
//! `is_ancestor` relation lets broad queries match specific listings
//! without the reverse holding.
//!
//! ## Quick start
//!
//! ```no_run
//! use lexcanon::{Engine, EngineConfig, Listing};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let cfg = EngineConfig::load()?;
//! let engine = Engine::start(cfg).await;
//!
//! // One value.
//! let node = engine
//!     .resolver
//!     .resolve("pre-owned", None, Some("condition"))
//!     .await;
//! assert_eq!(node.concept_id, "used");
//!
//! // A whole listing.
//! let listing: Listing = serde_json::from_str(r#"{"items": []}"#)?;
//! let canonical = engine.orchestrator.canonicalize_listing(&listing).await;
//! # let _ = canonical;
//! # Ok(())
//! # }
//! ```
//!
//! ## Degraded modes
//!
//! Everything optional degrades instead of failing: missing API keys skip
//! their adapters, a missing WordNet directory yields an empty local
//! database, a missing store URL leaves the ontology detached (buffering
//! still works, flushes are no-ops), and the stub embedder keeps scoring
//! deterministic without any model endpoint.

mod config;

use std::sync::Arc;

pub use config::EngineConfig;
pub use embedder::{EmbedConfig, Embedder};
pub use keycanon::{KeyCanonConfig, KeyCanonicalizer, ReviewEntry, ReviewStatus};
pub use lexsource::{
    BabelNetClient, CandidateSense, CanonicalEntry, DatamuseClient, LexicalSource,
    MerriamWebsterClient, SourceTag, WikidataClient, WordNetSource, WordsApiClient,
};
pub use ontology::{
    ConceptRow, InMemoryBackend, OntologyNode, OntologyStore, RestBackend, StoreBackend,
    StoreStats, SynonymRegistry,
};
pub use orchestrate::{
    haversine_km, GeoPoint, GeocodingService, Listing, ListingOrchestrator,
    PassthroughQuantities, QuantityResolver,
};
pub use preprocess::{normalize_for_registry_lookup, Preprocessor};
pub use resolver::{CanonicalizerConfig, CategoricalResolver, SourceSet};
pub use scoring::{HybridScorer, LlmFallback, LlmFallbackConfig, ScorerWeights};
pub use wordnet::WordNet;

/// The wired engine: one authoritative instance of every shared store.
pub struct Engine {
    pub wordnet: Arc<WordNet>,
    pub store: Arc<OntologyStore>,
    pub resolver: Arc<CategoricalResolver>,
    pub keys: Arc<KeyCanonicalizer>,
    pub orchestrator: Arc<ListingOrchestrator>,
}

impl Engine {
    /// Wire every component from configuration. No I/O beyond reading the
    /// local WordNet files and sidecars; call [`Engine::start`] to also
    /// bulk-load the persisted ontology.
    pub fn from_config(cfg: &EngineConfig) -> Engine {
        if !cfg.use_new_pipeline {
            tracing::warn!(
                "USE_NEW_PIPELINE=false requested; legacy cascade is not built, using the 3-phase pipeline"
            );
        }

        // Shared embedding provider; first configuration wins process-wide.
        embedder::configure(EmbedConfig {
            mode: cfg.embedding_mode.clone(),
            model_name: cfg.embedding_model.clone(),
            api_url: cfg.embedding_api_url.clone(),
            api_auth_header: cfg.embedding_api_auth_header.clone(),
            ..EmbedConfig::default()
        });

        let wordnet = match &cfg.wordnet_dir {
            Some(dir) => match WordNet::load(dir) {
                Ok(db) => Arc::new(db),
                Err(e) => {
                    tracing::info!(error = %e, "wordnet unavailable; local lexical lookups disabled");
                    Arc::new(WordNet::empty())
                }
            },
            None => {
                tracing::info!("no WORDNET_DIR configured; local lexical lookups disabled");
                Arc::new(WordNet::empty())
            }
        };

        let wordnet_source = Arc::new(WordNetSource::new(wordnet.clone()));
        let sources = SourceSet {
            wordnet: wordnet_source,
            // Free, keyless sources are always on.
            datamuse: Some(Arc::new(DatamuseClient::default())),
            wikidata: Some(Arc::new(WikidataClient::default())),
            // Keyed sources join only when configured.
            wordsapi: cfg
                .rapidapi_key
                .as_ref()
                .map(|key| Arc::new(WordsApiClient::new(key.clone()))),
            babelnet: cfg
                .babelnet_api_key
                .as_ref()
                .map(|key| Arc::new(BabelNetClient::new(key.clone()))),
            merriam: cfg
                .merriam_webster_api_key
                .as_ref()
                .map(|key| Arc::new(MerriamWebsterClient::new(key.clone()))),
        };

        let store = match (&cfg.store_url, &cfg.store_api_key) {
            (Some(url), Some(key)) => Arc::new(OntologyStore::new(Arc::new(RestBackend::new(
                url.clone(),
                key.clone(),
            )))),
            _ => {
                tracing::info!("no store configured; ontology runs detached (non-durable)");
                Arc::new(OntologyStore::detached())
            }
        };

        let scorer = HybridScorer::new(
            ScorerWeights::parse(&cfg.hybrid_weights),
            wordnet.clone(),
            cfg.transformer_endpoint.clone(),
        );
        let fallback = LlmFallback::new(LlmFallbackConfig {
            enabled: cfg.enable_llm_fallback,
            endpoint: cfg.llm_fallback_endpoint.clone(),
            model: cfg.llm_fallback_model.clone(),
            ..Default::default()
        });
        let canonicalizer_cfg = CanonicalizerConfig {
            enrichment_enabled: cfg.enable_wikidata_enrichment,
            p8814_path: Some(cfg.wordnet_wikidata_map_path.clone()),
            min_siblings: cfg.min_siblings,
            enable_similarity_collapse: cfg.enable_similarity_collapse,
        };

        let resolver = Arc::new(CategoricalResolver::from_parts(
            sources,
            scorer,
            fallback,
            canonicalizer_cfg,
            cfg.use_hybrid_scorer,
            cfg.hybrid_confidence_threshold,
            store.clone(),
        ));

        // The stub embedder's vectors are deterministic but not semantic
        // enough for key clustering; with no real model the embedding layer
        // is pushed out of reach and the WordNet layers carry key matching.
        let key_threshold = if cfg.embedding_mode == "api" {
            cfg.key_similarity_threshold
        } else {
            tracing::info!("stub embeddings: key-canonicalizer embedding layer disabled");
            1.01
        };
        let keys = Arc::new(KeyCanonicalizer::new(
            wordnet.clone(),
            KeyCanonConfig {
                similarity_threshold: key_threshold,
                borderline_threshold: cfg.key_borderline_threshold.max(key_threshold),
                ..KeyCanonConfig::at(cfg.key_canonicals_path.clone())
            },
        ));

        let geocoder = Arc::new(GeocodingService::new(Some(cfg.geocoding_cache_path.clone())));
        let orchestrator = Arc::new(
            ListingOrchestrator::new(resolver.clone(), store.clone())
                .with_key_canonicalizer(keys.clone())
                .with_quantities(Arc::new(PassthroughQuantities))
                .with_geocoder(geocoder),
        );

        Engine {
            wordnet,
            store,
            resolver,
            keys,
            orchestrator,
        }
    }

    /// Wire the engine and bulk-load the persisted ontology into the
    /// in-memory registry and path index.
    pub async fn start(cfg: EngineConfig) -> Engine {
        let engine = Engine::from_config(&cfg);
        engine.resolver.load_persisted().await;
        engine
    }
}
