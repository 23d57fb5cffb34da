//! Listing orchestration.
//!
//! Sits between the language-model extractor and the matcher: takes the
//! extracted document, replaces every free-form categorical value and item
//! type with a stable concept id, normalizes numeric constraints through
//! the quantity contract, geocodes locations, and flushes the ontology
//! store when the listing is done. The matcher receives a document of the
//! same shape on every path — quality degrades (lowercase fallback), the
//! pipeline never fails.

mod geocode;
mod listing;
mod orchestrator;
mod quantity;

pub use crate::geocode::{haversine_km, GeoPoint, GeocodingService};
pub use crate::listing::{
    ConstraintAttr, Constraints, Coordinates, Item, Listing, Location, Preferences, TypedValue,
};
pub use crate::orchestrator::{lowercase_fallback, ListingOrchestrator};
pub use crate::quantity::{Money, PassthroughQuantities, Quantity, QuantityResolver};

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use lexsource::WordNetSource;
    use ontology::{InMemoryBackend, OntologyStore};
    use resolver::{CanonicalizerConfig, CategoricalResolver, SourceSet};
    use scoring::{HybridScorer, LlmFallback, LlmFallbackConfig, ScorerWeights};
    use serde_json::json;
    use tempfile::TempDir;
    use wordnet::WordNet;

    use super::*;

    fn fixture_wordnet(dir: &TempDir) -> Arc<WordNet> {
        std::fs::write(
            dir.path().join("data.noun"),
            "\
00000002 03 n 01 animal 0 002 ~ 00000004 n 0000 ~ 00000006 n 0000 | a living organism\n\
00000004 03 n 01 dog 0 001 @ 00000002 n 0000 | a member of the genus canis\n\
00000006 03 n 01 cat 0 001 @ 00000002 n 0000 | a feline mammal\n",
        )
        .expect("data.noun");
        std::fs::write(
            dir.path().join("index.noun"),
            "animal n 1 2 ~ ~ 1 0 00000002\ndog n 1 1 @ 1 0 00000004\ncat n 1 1 @ 1 0 00000006\n",
        )
        .expect("index.noun");
        Arc::new(WordNet::load(dir.path()).expect("fixture loads"))
    }

    fn orchestrator(dir: &TempDir) -> (ListingOrchestrator, Arc<OntologyStore>) {
        let wn = fixture_wordnet(dir);
        let store = Arc::new(OntologyStore::new(Arc::new(InMemoryBackend::new())));
        let sources = SourceSet::local_only(Arc::new(WordNetSource::new(wn.clone())));
        let scorer = HybridScorer::new(ScorerWeights::default(), wn, None);
        let fallback = LlmFallback::new(LlmFallbackConfig {
            endpoint: None,
            ..Default::default()
        });
        let resolver = Arc::new(CategoricalResolver::from_parts(
            sources,
            scorer,
            fallback,
            CanonicalizerConfig::default(),
            true,
            0.10,
            store.clone(),
        ));
        (ListingOrchestrator::new(resolver, store.clone()), store)
    }

    fn sample_listing() -> Listing {
        serde_json::from_value(json!({
            "intent": "buy",
            "domain": ["Pets"],
            "items": [{
                "type": "Dog",
                "categorical": {"condition": "Pre-Owned"},
                "max": {
                    "cost": [{"value": "$40"}],
                    "weight": [{"value": "5 kg"}]
                }
            }],
            "item_exclusions": ["Cats"],
            "self_attributes": {
                "identity": [{"type": "nationality", "value": "Indian"}],
                "habits": {"smoking": "no"}
            },
            "target_location": {"name": "Bengaluru"},
            "location_exclusions": ["Mumbai"]
        }))
        .expect("listing parses")
    }

    #[tokio::test]
    async fn categorical_values_become_concept_ids() {
        let dir = TempDir::new().expect("tempdir");
        let (orchestrator, _store) = orchestrator(&dir);

        let canonical = orchestrator.canonicalize_listing(&sample_listing()).await;

        let item = &canonical.items[0];
        // "Dog" resolved through WordNet; "Pre-Owned" reduced onto the
        // seeded condition hierarchy.
        assert_eq!(item.item_type, "00000004-n");
        assert_eq!(item.categorical["condition"], "used");
        // Exclusions are plain concept ids too ("Cats" lemmatizes to cat).
        assert_eq!(canonical.item_exclusions, vec!["00000006-n"]);
        // Identity values go through the demonym gate.
        let identity = &canonical.self_attributes.as_ref().expect("prefs").identity;
        assert_eq!(identity[0].value, "india");
        // Habits pass through untouched.
        assert_eq!(
            canonical.self_attributes.as_ref().expect("prefs").habits,
            Some(json!({"smoking": "no"}))
        );
        // Locations lowercase even without a geocoder.
        assert_eq!(
            canonical.target_location.as_ref().expect("location").name,
            Some("bengaluru".into())
        );
        assert_eq!(canonical.location_exclusions, vec!["mumbai"]);
    }

    #[tokio::test]
    async fn numeric_constraints_split_value_and_tag() {
        let dir = TempDir::new().expect("tempdir");
        let (orchestrator, _store) = orchestrator(&dir);

        let canonical = orchestrator.canonicalize_listing(&sample_listing()).await;
        let max = &canonical.items[0].max;

        let cost = &max["cost"][0];
        assert_eq!(cost.value, Some(json!(40.0)));
        assert_eq!(cost.currency.as_deref(), Some("USD"));
        assert!(cost.unit.is_none());

        let weight = &max["weight"][0];
        assert_eq!(weight.value, Some(json!(5.0)));
        assert_eq!(weight.unit.as_deref(), Some("kg"));
    }

    #[tokio::test]
    async fn listing_walk_triggers_the_write_behind_flush() {
        let dir = TempDir::new().expect("tempdir");
        let (orchestrator, store) = orchestrator(&dir);

        orchestrator.canonicalize_listing(&sample_listing()).await;
        let stats = store.get_stats();
        assert!(stats.total_flushed > 0, "stats: {stats:?}");
        assert_eq!(stats.pending_buffer, 0);
    }

    #[tokio::test]
    async fn geocoder_enriches_locations_from_cache() {
        let dir = TempDir::new().expect("tempdir");
        let cache_path = dir.path().join("geocoding_cache.json");
        std::fs::write(
            &cache_path,
            r#"{"bengaluru": {"lat": 12.9716, "lng": 77.5946, "canonical_name": "Bengaluru"}}"#,
        )
        .expect("seed cache");

        let (orchestrator, _store) = orchestrator(&dir);
        let orchestrator = orchestrator.with_geocoder(Arc::new(GeocodingService::with_endpoint(
            "http://127.0.0.1:9/search",
            Some(cache_path),
        )));

        let canonical = orchestrator.canonicalize_listing(&sample_listing()).await;
        let location = canonical.target_location.expect("location");
        assert_eq!(location.canonical_name.as_deref(), Some("Bengaluru"));
        let coordinates = location.coordinates.expect("coordinates");
        assert!((coordinates.lat - 12.9716).abs() < 1e-9);
    }

    #[tokio::test]
    async fn semantic_implies_is_exposed_to_the_matcher() {
        let dir = TempDir::new().expect("tempdir");
        let (orchestrator, _store) = orchestrator(&dir);
        let canonical = orchestrator.canonicalize_listing(&sample_listing()).await;
        let dog_id = &canonical.items[0].item_type;

        // A dog listing satisfies an "animal" requirement.
        assert!(orchestrator.semantic_implies(dog_id, "animal").await);
        assert!(!orchestrator.semantic_implies("animal", dog_id).await);
    }

    #[test]
    fn lowercase_fallback_preserves_shape() {
        let mut listing = sample_listing();
        listing.items[0].categorical =
            BTreeMap::from([("Condition".to_string(), "Pre-Owned".to_string())]);

        let fallback = lowercase_fallback(&listing);
        assert_eq!(fallback.items[0].item_type, "dog");
        assert_eq!(fallback.items[0].categorical["Condition"], "pre-owned");
        assert_eq!(fallback.item_exclusions, vec!["cats"]);
        assert_eq!(
            fallback.self_attributes.as_ref().expect("prefs").identity[0].value,
            "indian"
        );
        // Untouched structure still round-trips.
        assert_eq!(fallback.items.len(), listing.items.len());
    }
}
