//! The layered key-canonicalization cascade.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use embedder::cosine_similarity;
use fxhash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use wordnet::{Pos, WordNet};

use crate::error::KeyCanonError;
use crate::graph::SimilarityGraph;
use crate::review::{summarize, ReviewEntry, ReviewStatus, ReviewSummary};

/// Hypernym labels too generic to justify unioning two keys. The top-level
/// abstractions plus the mid-level parents that empirically produced false
/// positives (condition↔quality, brand↔condition, manufacturer↔state).
const GENERIC_HYPERNYMS: &[&str] = &[
    "entity",
    "abstraction",
    "object",
    "whole",
    "physical entity",
    "thing",
    "psychological feature",
    "attribute",
    "communication",
    "group",
    "relation",
    "process",
    "causal agent",
    "matter",
];

#[derive(Debug, Clone)]
pub struct KeyCanonConfig {
    /// Sidecar for mappings + graph edges (`key_canonicals.json`).
    pub persistence_path: PathBuf,
    /// Sidecar for the review queue; defaults to
    /// `<persistence stem>_review_queue.json`.
    pub review_queue_path: PathBuf,
    /// Embedding-similarity acceptance threshold. High on purpose.
    pub similarity_threshold: f32,
    /// Matches in `[similarity_threshold, borderline_threshold)` are
    /// accepted but flagged for review.
    pub borderline_threshold: f32,
    /// Hypernym-path prefix depth for the shared-ancestor layer.
    pub hypernym_depth: usize,
}

impl KeyCanonConfig {
    pub fn at(persistence_path: impl Into<PathBuf>) -> Self {
        let persistence_path = persistence_path.into();
        let review_queue_path = sibling_with_suffix(&persistence_path, "_review_queue");
        KeyCanonConfig {
            persistence_path,
            review_queue_path,
            similarity_threshold: 0.80,
            borderline_threshold: 0.85,
            hypernym_depth: 3,
        }
    }
}

impl Default for KeyCanonConfig {
    fn default() -> Self {
        Self::at("key_canonicals.json")
    }
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("key_canonicals");
    path.with_file_name(format!("{stem}{suffix}.json"))
}

#[derive(Default)]
struct Inner {
    /// (domain, key) → canonical. Stable: only the reject path unbinds.
    mappings: FxHashMap<(String, String), String>,
    /// Session-local embeddings; never persisted, recomputed on demand.
    embeddings: FxHashMap<(String, String), Vec<f32>>,
    graphs: FxHashMap<String, SimilarityGraph>,
    review_queue: Vec<ReviewEntry>,
    /// Hypernyms recorded by rejections, extending [`GENERIC_HYPERNYMS`].
    blocked_hypernyms: FxHashSet<String>,
}

/// Serialized shape of the mappings sidecar.
#[derive(Serialize, Deserialize, Default)]
struct PersistedState {
    #[serde(default)]
    mappings: FxHashMap<String, String>,
    #[serde(default)]
    graphs: FxHashMap<String, Vec<(String, String)>>,
    #[serde(default)]
    blocked_hypernyms: Vec<String>,
}

pub struct KeyCanonicalizer {
    wn: Arc<WordNet>,
    cfg: KeyCanonConfig,
    inner: Mutex<Inner>,
}

impl KeyCanonicalizer {
    pub fn new(wn: Arc<WordNet>, cfg: KeyCanonConfig) -> Self {
        let canonicalizer = KeyCanonicalizer {
            wn,
            cfg,
            inner: Mutex::new(Inner::default()),
        };
        canonicalizer.load_persistence();
        canonicalizer.load_review_queue();
        canonicalizer
    }

    /// Canonicalize `(domain, key)` through the layered cascade:
    /// cache → shared synset → shared hypernym → embedding → self.
    ///
    /// Stable within a session and (via the sidecars) across sessions; the
    /// review-queue reject path is the only way a mapping is ever unbound.
    pub async fn canonicalize(&self, key: &str, domain: &str) -> String {
        let key = key.trim().to_lowercase();
        let domain = normalize_domain(domain);
        let cache_key = (domain.clone(), key.clone());

        // Layer 1: cache.
        if let Some(canonical) = self
            .inner
            .lock()
            .expect("keycanon poisoned")
            .mappings
            .get(&cache_key)
        {
            return canonical.clone();
        }

        // Embed outside the lock. Values are never part of the phrase —
        // embedding the key in a domain template only keeps "color" from
        // drifting toward whatever values it happened to carry.
        let phrase = format!("In {domain} products, the attribute '{key}' describes");
        let embedding = embedder::shared().encode(&phrase).await.ok();

        let (canonical, changed) = {
            let mut inner = self.inner.lock().expect("keycanon poisoned");
            // Another request may have canonicalized the same key while we
            // were embedding.
            if let Some(existing) = inner.mappings.get(&cache_key) {
                return existing.clone();
            }
            if let Some(embedding) = embedding {
                inner.embeddings.insert(cache_key.clone(), embedding);
            }
            inner.graphs.entry(domain.clone()).or_default().add_node(&key);

            let canonical = self
                .synset_match(&mut inner, &key, &domain)
                .or_else(|| self.hypernym_match(&mut inner, &key, &domain))
                .or_else(|| self.embedding_match(&mut inner, &key, &domain))
                .unwrap_or_else(|| key.clone());

            self.assign_component(&mut inner, &cache_key, &canonical);
            (canonical, true)
        };

        if changed {
            self.save_persistence();
            self.save_review_queue();
        }
        canonical
    }

    /// Layer 2: the new key shares a noun synset with an existing key in
    /// the same domain.
    fn synset_match(&self, inner: &mut Inner, key: &str, domain: &str) -> Option<String> {
        if !self.wn.is_available() {
            return None;
        }
        let own: FxHashSet<String> = self
            .wn
            .synsets_pos(key, Pos::Noun)
            .iter()
            .map(|s| s.offset_id())
            .collect();
        if own.is_empty() {
            return None;
        }

        let session_keys = same_domain_keys(inner, domain, key);
        for existing in session_keys {
            let theirs: FxHashSet<String> = self
                .wn
                .synsets_pos(&existing, Pos::Noun)
                .iter()
                .map(|s| s.offset_id())
                .collect();
            if own.intersection(&theirs).next().is_some() {
                inner
                    .graphs
                    .entry(domain.to_string())
                    .or_default()
                    .add_edge(key, &existing);
                return Some(resolve_canonical(inner, domain, &existing));
            }
        }
        None
    }

    /// Layer 3: shared hypernym within the configured depth, with generic
    /// ancestors filtered so "brand" and "condition" cannot union through
    /// "attribute".
    fn hypernym_match(&self, inner: &mut Inner, key: &str, domain: &str) -> Option<String> {
        if !self.wn.is_available() {
            return None;
        }
        let own = self.hypernym_labels(key);
        if own.is_empty() {
            return None;
        }

        let session_keys = same_domain_keys(inner, domain, key);
        for existing in session_keys {
            let theirs = self.hypernym_labels(&existing);
            let shared: Vec<&String> = own.intersection(&theirs).collect();
            if shared.is_empty() {
                continue;
            }
            let all_generic = shared.iter().all(|label| {
                GENERIC_HYPERNYMS.contains(&label.as_str())
                    || inner.blocked_hypernyms.contains(label.as_str())
            });
            if all_generic {
                continue;
            }
            inner
                .graphs
                .entry(domain.to_string())
                .or_default()
                .add_edge(key, &existing);
            return Some(resolve_canonical(inner, domain, &existing));
        }
        None
    }

    /// Ancestor labels from the root-side prefix of each hypernym path.
    fn hypernym_labels(&self, key: &str) -> FxHashSet<String> {
        let mut labels = FxHashSet::default();
        for synset in self.wn.synsets_pos(key, Pos::Noun) {
            for path in self.wn.hypernym_paths(synset) {
                for ancestor in path.iter().take(self.cfg.hypernym_depth) {
                    labels.insert(ancestor.first_lemma().to_string());
                }
            }
        }
        labels
    }

    /// Layer 4: embedding cosine against every session key in the domain,
    /// accepted above the (high) threshold, flagged when borderline.
    fn embedding_match(&self, inner: &mut Inner, key: &str, domain: &str) -> Option<String> {
        let own = inner
            .embeddings
            .get(&(domain.to_string(), key.to_string()))?
            .clone();

        let session_keys = same_domain_keys(inner, domain, key);
        for existing in session_keys {
            let Some(theirs) = inner
                .embeddings
                .get(&(domain.to_string(), existing.clone()))
            else {
                continue;
            };
            let similarity = cosine_similarity(&own, theirs);
            if similarity <= self.cfg.similarity_threshold {
                continue;
            }

            if similarity < self.cfg.borderline_threshold {
                self.flag_for_review(
                    inner,
                    key,
                    &existing,
                    domain,
                    "embedding",
                    similarity,
                    format!(
                        "borderline similarity {similarity:.3} (threshold={}, borderline={})",
                        self.cfg.similarity_threshold, self.cfg.borderline_threshold
                    ),
                );
            }
            inner
                .graphs
                .entry(domain.to_string())
                .or_default()
                .add_edge(key, &existing);
            return Some(resolve_canonical(inner, domain, &existing));
        }
        None
    }

    /// Spread the canonical across the key's connected component; existing
    /// mappings are never overwritten, which is what makes the clustering
    /// order-independent.
    fn assign_component(&self, inner: &mut Inner, cache_key: &(String, String), canonical: &str) {
        let (domain, key) = cache_key;
        let component = inner
            .graphs
            .get(domain)
            .map(|graph| graph.component(key))
            .unwrap_or_default();

        if component.is_empty() {
            inner
                .mappings
                .entry(cache_key.clone())
                .or_insert_with(|| canonical.to_string());
            return;
        }
        for member in component {
            inner
                .mappings
                .entry((domain.clone(), member))
                .or_insert_with(|| canonical.to_string());
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn flag_for_review(
        &self,
        inner: &mut Inner,
        key1: &str,
        key2: &str,
        domain: &str,
        match_type: &str,
        score: f32,
        reason: String,
    ) {
        let duplicate = inner.review_queue.iter().any(|entry| {
            entry.matches(key1, key2, domain) && entry.status == ReviewStatus::Pending
        });
        if duplicate {
            return;
        }
        tracing::info!(key1, key2, domain, score, "borderline key match flagged for review");
        inner
            .review_queue
            .push(ReviewEntry::new(key1, key2, domain, match_type, score, reason));
    }

    /// All keys in the same cluster as `key` (diagnostics).
    pub fn cluster(&self, key: &str, domain: &str) -> Vec<String> {
        let key = key.trim().to_lowercase();
        let domain = normalize_domain(domain);
        let inner = self.inner.lock().expect("keycanon poisoned");
        let mut members: Vec<String> = inner
            .graphs
            .get(&domain)
            .map(|graph| graph.component(&key))
            .unwrap_or_default()
            .into_iter()
            .collect();
        if members.is_empty() {
            members.push(key);
        }
        members.sort();
        members
    }

    pub fn pending_reviews(&self) -> Vec<ReviewEntry> {
        self.inner
            .lock()
            .expect("keycanon poisoned")
            .review_queue
            .iter()
            .filter(|e| e.status == ReviewStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn review_summary(&self) -> ReviewSummary {
        summarize(&self.inner.lock().expect("keycanon poisoned").review_queue)
    }

    /// Approve a flagged match: the mapping stays, the entry is closed.
    pub fn approve_match(&self, key1: &str, key2: &str, domain: &str) -> bool {
        let domain = normalize_domain(domain);
        let found = {
            let mut inner = self.inner.lock().expect("keycanon poisoned");
            mark_entry(&mut inner, key1, key2, &domain, ReviewStatus::Approved, None)
        };
        if found {
            self.save_review_queue();
        }
        found
    }

    /// Reject a flagged match: unbind the new key, cut the graph edge, bind
    /// the key to itself, and optionally record a hypernym for the generic
    /// block-list.
    pub fn reject_match(
        &self,
        key1: &str,
        key2: &str,
        domain: &str,
        block_hypernym: Option<&str>,
    ) -> bool {
        let key1 = key1.trim().to_lowercase();
        let domain = normalize_domain(domain);
        let found = {
            let mut inner = self.inner.lock().expect("keycanon poisoned");
            let found = mark_entry(
                &mut inner,
                &key1,
                key2,
                &domain,
                ReviewStatus::Rejected,
                block_hypernym,
            );
            if found {
                let cache_key = (domain.clone(), key1.clone());
                inner.mappings.remove(&cache_key);
                if let Some(graph) = inner.graphs.get_mut(&domain) {
                    graph.remove_edge(&key1, key2);
                }
                inner.mappings.insert(cache_key, key1.clone());
                if let Some(hypernym) = block_hypernym {
                    inner.blocked_hypernyms.insert(hypernym.trim().to_lowercase());
                }
            }
            found
        };
        if found {
            self.save_persistence();
            self.save_review_queue();
        }
        found
    }

    // ── Sidecar persistence ─────────────────────────────────────────────
    // Snapshots are taken under the lock; file writes happen outside it.

    fn save_persistence(&self) {
        let snapshot = {
            let inner = self.inner.lock().expect("keycanon poisoned");
            let mut state = PersistedState::default();
            for ((domain, key), canonical) in &inner.mappings {
                state.mappings.insert(format!("{domain}|{key}"), canonical.clone());
            }
            for (domain, graph) in &inner.graphs {
                state.graphs.insert(domain.clone(), graph.edges());
            }
            state.blocked_hypernyms = inner.blocked_hypernyms.iter().cloned().collect();
            state.blocked_hypernyms.sort();
            state
        };
        if let Err(e) = write_json(&self.cfg.persistence_path, &snapshot) {
            tracing::warn!(error = %e, "could not save key canonicals sidecar");
        }
    }

    fn load_persistence(&self) {
        let state = match read_json::<PersistedState>(&self.cfg.persistence_path) {
            Ok(Some(state)) => state,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    path = %self.cfg.persistence_path.display(),
                    error = %e,
                    "could not load key canonicals sidecar; starting empty"
                );
                return;
            }
        };
        let mut inner = self.inner.lock().expect("keycanon poisoned");
        for (compound, canonical) in state.mappings {
            if let Some((domain, key)) = compound.split_once('|') {
                inner
                    .mappings
                    .insert((domain.to_string(), key.to_string()), canonical);
            }
        }
        for (domain, edges) in state.graphs {
            let graph = inner.graphs.entry(domain).or_default();
            for (a, b) in edges {
                graph.add_edge(&a, &b);
            }
        }
        inner.blocked_hypernyms = state.blocked_hypernyms.into_iter().collect();
        tracing::debug!(mappings = inner.mappings.len(), "key canonicals loaded");
    }

    fn save_review_queue(&self) {
        let snapshot = {
            self.inner
                .lock()
                .expect("keycanon poisoned")
                .review_queue
                .clone()
        };
        if let Err(e) = write_json(&self.cfg.review_queue_path, &snapshot) {
            tracing::warn!(error = %e, "could not save review queue sidecar");
        }
    }

    fn load_review_queue(&self) {
        let entries = match read_json::<Vec<ReviewEntry>>(&self.cfg.review_queue_path) {
            Ok(Some(entries)) => entries,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(
                    path = %self.cfg.review_queue_path.display(),
                    error = %e,
                    "could not load review queue sidecar; starting empty"
                );
                return;
            }
        };
        let pending = entries
            .iter()
            .filter(|e| e.status == ReviewStatus::Pending)
            .count();
        if pending > 0 {
            tracing::info!(pending, "loaded pending key-review items");
        }
        self.inner.lock().expect("keycanon poisoned").review_queue = entries;
    }
}

fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        "general".to_string()
    } else {
        domain
    }
}

/// Session keys in the same domain (embedding-map keys), excluding `key`.
fn same_domain_keys(inner: &Inner, domain: &str, key: &str) -> Vec<String> {
    let mut keys: Vec<String> = inner
        .embeddings
        .keys()
        .filter(|(d, k)| d == domain && k != key)
        .map(|(_, k)| k.clone())
        .collect();
    keys.sort();
    keys
}

/// The canonical an existing key maps to, else the key itself.
fn resolve_canonical(inner: &Inner, domain: &str, existing: &str) -> String {
    inner
        .mappings
        .get(&(domain.to_string(), existing.to_string()))
        .cloned()
        .unwrap_or_else(|| existing.to_string())
}

fn mark_entry(
    inner: &mut Inner,
    key1: &str,
    key2: &str,
    domain: &str,
    status: ReviewStatus,
    block_hypernym: Option<&str>,
) -> bool {
    for entry in inner.review_queue.iter_mut() {
        if entry.matches(key1, key2, domain) && entry.status == ReviewStatus::Pending {
            entry.status = status;
            entry.reviewed_at = Some(chrono::Utc::now());
            entry.blocked_hypernym = block_hypernym.map(|h| h.to_string());
            return true;
        }
    }
    false
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), KeyCanonError> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// `Ok(None)` when the sidecar does not exist yet; every other failure is a
/// real error the caller logs.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, KeyCanonError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}
