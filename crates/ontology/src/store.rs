//! The write-behind ontology store.
//!
//! Resolve is on the request hot path, so durable writes are deferred:
//! concepts accumulate in a mutex-guarded buffer and a flush (triggered at
//! the end of a listing ingest) snapshots the buffer, performs the row I/O
//! outside the lock, and re-merges failed rows under the lock for the next
//! attempt. A crash between resolve and flush loses nothing semantically —
//! the concept is re-derived deterministically on the next request.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use fxhash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::backend::{ConceptRow, StoreBackend};
use crate::registry::{ConceptPaths, SynonymRegistry};

const LOAD_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
struct PendingConcept {
    concept_path: Vec<String>,
    synonyms: BTreeSet<String>,
    source: String,
    confidence: f32,
}

/// In-memory state rebuilt from the table at startup.
#[derive(Debug, Default)]
pub struct LoadedOntology {
    pub synonym_registry: SynonymRegistry,
    pub concept_paths: ConceptPaths,
}

/// Operator-visible store counters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoreStats {
    pub initialized: bool,
    pub loaded_concepts: usize,
    pub total_flushed: usize,
    pub pending_buffer: usize,
    pub known_ids: usize,
    pub last_flush_failures: usize,
}

pub struct OntologyStore {
    backend: Option<Arc<dyn StoreBackend>>,
    pending: Mutex<FxHashMap<String, PendingConcept>>,
    known_ids: Mutex<FxHashSet<String>>,
    counters: Mutex<Counters>,
}

#[derive(Default)]
struct Counters {
    loaded: usize,
    flushed: usize,
    last_flush_failures: usize,
}

impl OntologyStore {
    /// A store with no backend: buffering works, loads return empty state,
    /// flushes are no-ops. Degraded, not failed.
    pub fn detached() -> Self {
        OntologyStore {
            backend: None,
            pending: Mutex::new(FxHashMap::default()),
            known_ids: Mutex::new(FxHashSet::default()),
            counters: Mutex::new(Counters::default()),
        }
    }

    /// Attach to a backing table.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        OntologyStore {
            backend: Some(backend),
            ..Self::detached()
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    /// Paginated bulk load. Every synonym registers under its
    /// lowercased-trimmed form, every concept id maps to itself, and every
    /// non-empty path lands in the path index. On any page failure the rows
    /// read so far are returned — startup proceeds with partial knowledge
    /// rather than failing.
    pub async fn load_from_db(&self) -> LoadedOntology {
        let mut loaded = LoadedOntology::default();
        let Some(backend) = &self.backend else {
            tracing::info!("ontology store not initialized; starting with empty state");
            return loaded;
        };

        let mut offset = 0usize;
        let mut row_count = 0usize;
        loop {
            let page = match backend.fetch_page(offset, LOAD_PAGE_SIZE).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(error = %e, offset, "ontology bulk load stopped early");
                    break;
                }
            };
            if page.is_empty() {
                break;
            }
            let page_len = page.len();

            {
                let mut known = self.known_ids.lock().expect("store poisoned");
                for row in &page {
                    for synonym in &row.synonyms {
                        loaded.synonym_registry.bind(synonym, &row.concept_id);
                    }
                    loaded.synonym_registry.bind(&row.concept_id, &row.concept_id);
                    if !row.concept_path.is_empty() {
                        loaded
                            .concept_paths
                            .insert(&row.concept_id, row.concept_path.clone());
                    }
                    known.insert(row.concept_id.clone());
                }
            }

            row_count += page_len;
            if page_len < LOAD_PAGE_SIZE {
                break;
            }
            offset += LOAD_PAGE_SIZE;
        }

        self.counters.lock().expect("store poisoned").loaded = row_count;
        tracing::info!(
            concepts = row_count,
            synonyms = loaded.synonym_registry.len(),
            paths = loaded.concept_paths.len(),
            "ontology loaded from store"
        );
        loaded
    }

    /// Buffer a concept for the next flush. If the id is already buffered,
    /// synonyms union and the longer path wins.
    pub fn buffer_concept(
        &self,
        concept_id: &str,
        concept_path: &[String],
        synonyms: &[String],
        source: &str,
        confidence: f32,
    ) {
        if concept_id.is_empty() {
            return;
        }
        let cleaned: BTreeSet<String> = synonyms
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let mut pending = self.pending.lock().expect("store poisoned");
        match pending.get_mut(concept_id) {
            Some(existing) => {
                existing.synonyms.extend(cleaned);
                if concept_path.len() > existing.concept_path.len() {
                    existing.concept_path = concept_path.to_vec();
                }
            }
            None => {
                pending.insert(
                    concept_id.to_string(),
                    PendingConcept {
                        concept_path: concept_path.to_vec(),
                        synonyms: cleaned,
                        source: source.to_string(),
                        confidence,
                    },
                );
            }
        }
    }

    /// Flush the pending buffer. Returns the number of rows written.
    ///
    /// Known rows are read back first so synonym sets union (never shrink)
    /// and the longer path survives. Row-level failures re-merge into the
    /// buffer under the lock, so a concurrent `buffer_concept` for the same
    /// id is not clobbered.
    pub async fn flush_to_db(&self) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };

        let snapshot: Vec<(String, PendingConcept)> = {
            let mut pending = self.pending.lock().expect("store poisoned");
            pending.drain().collect()
        };
        if snapshot.is_empty() {
            return 0;
        }

        let mut flushed = 0usize;
        let mut failures = 0usize;
        for (concept_id, data) in snapshot {
            if data.concept_path.is_empty() {
                tracing::warn!(concept_id = %concept_id, "buffered concept with empty path; re-buffering");
                failures += 1;
                self.remerge(&concept_id, data);
                continue;
            }

            let mut row = ConceptRow {
                concept_id: concept_id.clone(),
                concept_path: data.concept_path.clone(),
                synonyms: data.synonyms.iter().cloned().collect(),
                source: data.source.clone(),
                confidence: data.confidence,
                created_at: None,
                updated_at: None,
            };

            let known = self
                .known_ids
                .lock()
                .expect("store poisoned")
                .contains(&concept_id);
            if known {
                if let Ok(Some(existing)) = backend.fetch_one(&concept_id).await {
                    let mut merged: BTreeSet<String> = existing.synonyms.into_iter().collect();
                    merged.extend(row.synonyms.iter().cloned());
                    row.synonyms = merged.into_iter().collect();
                    if existing.concept_path.len() > row.concept_path.len() {
                        row.concept_path = existing.concept_path;
                    }
                }
            }

            match backend.upsert(&row).await {
                Ok(()) => {
                    self.known_ids
                        .lock()
                        .expect("store poisoned")
                        .insert(concept_id);
                    flushed += 1;
                }
                Err(e) => {
                    tracing::warn!(concept_id = %concept_id, error = %e, "flush failed; re-buffering");
                    failures += 1;
                    self.remerge(&concept_id, data);
                }
            }
        }

        let mut counters = self.counters.lock().expect("store poisoned");
        counters.flushed += flushed;
        counters.last_flush_failures = failures;
        if flushed > 0 {
            tracing::debug!(flushed, total = counters.flushed, "ontology flush complete");
        }
        flushed
    }

    /// Re-merge a failed row into the buffer, unioning with anything that
    /// was buffered while the flush I/O was in flight.
    fn remerge(&self, concept_id: &str, data: PendingConcept) {
        let mut pending = self.pending.lock().expect("store poisoned");
        match pending.get_mut(concept_id) {
            Some(existing) => {
                existing.synonyms.extend(data.synonyms);
                if data.concept_path.len() > existing.concept_path.len() {
                    existing.concept_path = data.concept_path;
                }
            }
            None => {
                pending.insert(concept_id.to_string(), data);
            }
        }
    }

    pub fn get_stats(&self) -> StoreStats {
        let counters = self.counters.lock().expect("store poisoned");
        StoreStats {
            initialized: self.backend.is_some(),
            loaded_concepts: counters.loaded,
            total_flushed: counters.flushed,
            pending_buffer: self.pending.lock().expect("store poisoned").len(),
            known_ids: self.known_ids.lock().expect("store poisoned").len(),
            last_flush_failures: counters.last_flush_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::error::StoreError;
    use async_trait::async_trait;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn buffer_merges_synonyms_and_keeps_longer_path() {
        let store = OntologyStore::detached();
        store.buffer_concept("dog", &strings(&["dog"]), &strings(&["hound"]), "wordnet", 0.8);
        store.buffer_concept(
            "dog",
            &strings(&["animal", "dog"]),
            &strings(&["Canine "]),
            "wordnet",
            0.8,
        );

        let pending = store.pending.lock().expect("lock");
        let entry = pending.get("dog").expect("buffered");
        assert_eq!(entry.concept_path, strings(&["animal", "dog"]));
        assert!(entry.synonyms.contains("hound"));
        assert!(entry.synonyms.contains("canine"));
    }

    #[tokio::test]
    async fn flush_then_load_round_trips() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = OntologyStore::new(backend.clone());
        store.buffer_concept(
            "00000101-s",
            &strings(&["condition", "used"]),
            &strings(&["used", "second hand", "pre-owned"]),
            "wordnet",
            0.9,
        );

        assert_eq!(store.flush_to_db().await, 1);
        assert_eq!(backend.row_count(), 1);

        let loaded = store.load_from_db().await;
        assert_eq!(
            loaded.synonym_registry.get("second hand").map(String::as_str),
            Some("00000101-s")
        );
        // Concept id maps to itself.
        assert_eq!(
            loaded.synonym_registry.get("00000101-s").map(String::as_str),
            Some("00000101-s")
        );
        assert_eq!(
            loaded.concept_paths.get("00000101-s"),
            Some(&strings(&["condition", "used"]))
        );
    }

    #[tokio::test]
    async fn synonyms_union_across_flushes() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = OntologyStore::new(backend.clone());

        store.buffer_concept("dog", &strings(&["dog"]), &strings(&["hound"]), "wordnet", 0.8);
        assert_eq!(store.flush_to_db().await, 1);

        // A second flush with a disjoint synonym set must not shrink the row.
        store.buffer_concept("dog", &strings(&["dog"]), &strings(&["pooch"]), "wordnet", 0.8);
        assert_eq!(store.flush_to_db().await, 1);

        let row = backend.fetch_one("dog").await.expect("fetch").expect("row");
        assert!(row.synonyms.contains(&"hound".to_string()));
        assert!(row.synonyms.contains(&"pooch".to_string()));
    }

    #[tokio::test]
    async fn empty_path_rows_are_rebuffered_not_written() {
        let backend = Arc::new(InMemoryBackend::new());
        let store = OntologyStore::new(backend.clone());
        store.buffer_concept("weird", &[], &strings(&["weird"]), "fallback", 0.3);

        assert_eq!(store.flush_to_db().await, 0);
        assert_eq!(backend.row_count(), 0);
        let stats = store.get_stats();
        assert_eq!(stats.pending_buffer, 1);
        assert_eq!(stats.last_flush_failures, 1);
    }

    struct FailingBackend;

    #[async_trait]
    impl StoreBackend for FailingBackend {
        async fn fetch_page(
            &self,
            _offset: usize,
            _limit: usize,
        ) -> Result<Vec<ConceptRow>, StoreError> {
            Err(StoreError::Transport("down".into()))
        }
        async fn fetch_one(&self, _concept_id: &str) -> Result<Option<ConceptRow>, StoreError> {
            Err(StoreError::Transport("down".into()))
        }
        async fn upsert(&self, _row: &ConceptRow) -> Result<(), StoreError> {
            Err(StoreError::Transport("down".into()))
        }
    }

    #[tokio::test]
    async fn failed_flush_rebuffers_for_retry() {
        let store = OntologyStore::new(Arc::new(FailingBackend));
        store.buffer_concept("dog", &strings(&["dog"]), &strings(&["hound"]), "wordnet", 0.8);

        assert_eq!(store.flush_to_db().await, 0);
        let stats = store.get_stats();
        assert_eq!(stats.pending_buffer, 1);
        assert_eq!(stats.total_flushed, 0);

        // The load degrades to empty state rather than failing.
        let loaded = store.load_from_db().await;
        assert!(loaded.synonym_registry.is_empty());
    }

    #[tokio::test]
    async fn detached_store_degrades_silently() {
        let store = OntologyStore::detached();
        assert!(!store.is_initialized());
        store.buffer_concept("dog", &strings(&["dog"]), &[], "wordnet", 0.5);
        assert_eq!(store.flush_to_db().await, 0);
        assert!(store.load_from_db().await.synonym_registry.is_empty());
        assert_eq!(store.get_stats().pending_buffer, 1);
    }
}
