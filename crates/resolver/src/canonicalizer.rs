//! Phase 2: turn the winning sense into an ontology node.
//!
//! The work splits in two so no I/O ever happens under the registry lock:
//! [`Canonicalizer::enrich`] performs the optional network/file enrichments
//! on the sense, then [`Canonicalizer::canonicalize`] runs the in-memory
//! part — cross-tier propagation, the hypernym-collapse decision, concept-id
//! assignment, path construction, and the registry writes.
//!
//! Cross-tier propagation is the load-bearing step: checking every known
//! surface form against the registry before minting a new id is what makes
//! "used" (registered earlier) and "second-hand" (resolving now) collide
//! onto the same concept.

use std::path::Path;
use std::sync::{Arc, Mutex};

use fxhash::FxHashMap;
use lexsource::{BabelNetClient, LexicalSource, SourceTag, WordNetSource};
use ontology::{OntologyNode, SynonymRegistry};
use preprocess::normalize_for_registry_lookup;

use crate::disambiguator::DisambiguatedSense;

/// Overly-abstract parents that must never become collapse targets. A
/// concept id of "entity" would make everything an ancestor of everything.
const ABSTRACT_PARENTS: &[&str] = &[
    "entity",
    "object",
    "abstraction",
    "thing",
    "whole",
    "matter",
    "substance",
    "unit",
    "artifact",
    "science",
    "discipline",
    "study",
    "activity",
    "work",
    "act",
    "action",
    "physical entity",
];

/// Similarity floor for the config-gated Rule C. Left disabled by default:
/// Wu-Palmer-style closeness collapses dentist into medical practitioner
/// and puppy into dog, which is exactly the specificity loss we refuse.
const SIMILARITY_COLLAPSE_FLOOR: f32 = 0.5;

pub struct CanonicalizerConfig {
    /// Gate for the offline Wikidata-alias enrichment (P8814 map).
    pub enrichment_enabled: bool,
    /// Path to `wordnet_wikidata_map.json`; missing file makes the step a
    /// no-op.
    pub p8814_path: Option<std::path::PathBuf>,
    /// Rule B: collapse once a hypernym has been a collapse target this
    /// many times in the current process.
    pub min_siblings: u32,
    /// Rule C gate. Keep off unless validated on the target domain.
    pub enable_similarity_collapse: bool,
}

impl Default for CanonicalizerConfig {
    fn default() -> Self {
        CanonicalizerConfig {
            enrichment_enabled: true,
            p8814_path: None,
            min_siblings: 1,
            enable_similarity_collapse: false,
        }
    }
}

pub struct Canonicalizer {
    wordnet: Arc<WordNetSource>,
    babelnet: Option<Arc<BabelNetClient>>,
    /// synset offset id → Wikidata aliases, built offline.
    p8814: Option<FxHashMap<String, Vec<String>>>,
    /// Process-local; resets on restart by design, so sibling consolidation
    /// re-accumulates after a restart.
    hypernym_usage: Mutex<FxHashMap<String, u32>>,
    cfg: CanonicalizerConfig,
}

impl Canonicalizer {
    pub fn new(
        wordnet: Arc<WordNetSource>,
        babelnet: Option<Arc<BabelNetClient>>,
        cfg: CanonicalizerConfig,
    ) -> Self {
        let p8814 = if cfg.enrichment_enabled {
            cfg.p8814_path.as_deref().and_then(load_p8814)
        } else {
            None
        };
        Canonicalizer {
            wordnet,
            babelnet,
            p8814,
            hypernym_usage: Mutex::new(FxHashMap::default()),
            cfg,
        }
    }

    /// Optional enrichments, each skipped silently when unavailable:
    /// Wikidata aliases for WordNet senses, BabelNet synonyms, and a
    /// WordNet hypernym fill for sources without hierarchy.
    pub async fn enrich(&self, sense: &mut DisambiguatedSense) {
        self.enrich_with_wikidata_aliases(sense);
        self.enrich_with_babelnet_synonyms(sense).await;
        self.enrich_hypernyms(sense).await;
    }

    fn enrich_with_wikidata_aliases(&self, sense: &mut DisambiguatedSense) {
        if sense.source_tag != SourceTag::Wordnet {
            return; // BabelNet already carries Wikidata; others have no synset id.
        }
        let Some(map) = &self.p8814 else {
            return;
        };
        let Some(aliases) = map.get(&sense.source_id) else {
            return;
        };
        let mut added = false;
        for alias in aliases {
            let alias = alias.to_lowercase();
            if !alias.is_empty() && !sense.all_forms.contains(&alias) {
                sense.all_forms.push(alias);
                added = true;
            }
        }
        if added {
            sense.source.push_str("+wikidata");
        }
    }

    async fn enrich_with_babelnet_synonyms(&self, sense: &mut DisambiguatedSense) {
        let Some(babelnet) = &self.babelnet else {
            return;
        };
        if !babelnet.is_available() {
            return;
        }
        let synonyms = babelnet.get_synonyms(&sense.resolved_form).await;
        let mut added = false;
        for synonym in synonyms {
            if !sense.all_forms.contains(&synonym) {
                sense.all_forms.push(synonym);
                added = true;
            }
        }
        if added && !sense.source.contains("babelnet") {
            sense.source.push_str("+babelnet");
        }
    }

    /// Senses from sources without hierarchy (Datamuse, Wikidata search
    /// hits) get their parents from WordNet.
    async fn enrich_hypernyms(&self, sense: &mut DisambiguatedSense) {
        if !sense.hypernyms.is_empty() {
            return;
        }
        let hypernyms = self.wordnet.get_hypernyms(&sense.resolved_form, 1).await;
        if !hypernyms.is_empty() {
            sense.hypernyms = hypernyms;
        }
    }

    /// The collapse decision: a disjunction of rules behind a safety filter.
    /// Deterministic in the current process — it reads only the sense, the
    /// original term, and the usage counter.
    fn should_collapse_to_hypernym(&self, sense: &DisambiguatedSense, original_term: &str) -> bool {
        let Some(first) = sense.hypernyms.first() else {
            return false;
        };
        let hypernym = normalize_label(first);
        if hypernym.is_empty() || ABSTRACT_PARENTS.contains(&hypernym.as_str()) {
            return false;
        }

        // Rule A: the original term is literally a lemma of the parent
        // synset (rare, but unambiguously safe).
        if sense.source_tag == SourceTag::Wordnet {
            let db = self.wordnet.database();
            if let Some(parent) = db.synsets(&hypernym).into_iter().next() {
                let original = original_term.trim().to_lowercase();
                if parent.lemmas.iter().any(|lemma| *lemma == original) {
                    return true;
                }

                // Rule C, config-gated and off by default: semantic
                // closeness between sense and parent.
                if self.cfg.enable_similarity_collapse {
                    if let Some(own) = db.synset_by_id(&sense.source_id) {
                        if let Some(similarity) = db.path_similarity(own, parent) {
                            if similarity >= SIMILARITY_COLLAPSE_FLOOR {
                                return true;
                            }
                        }
                    }
                }
            }
        }

        // Rule B: sibling consolidation — the parent has already absorbed
        // enough terms this process.
        let usage = self.hypernym_usage.lock().expect("usage counter poisoned");
        usage.get(&hypernym).copied().unwrap_or(0) >= self.cfg.min_siblings
    }

    /// The in-memory canonicalization step. Holds no locks of its own other
    /// than the usage counter; the caller holds the registry lock.
    pub fn canonicalize(
        &self,
        sense: &DisambiguatedSense,
        original_term: &str,
        attribute_key: Option<&str>,
        registry: &mut SynonymRegistry,
    ) -> OntologyNode {
        // Cross-tier propagation: any known form already in the registry
        // decides the concept id.
        let mut concept_id: Option<String> = None;
        for form in &sense.all_forms {
            if let Some(existing) = registry.resolve(form) {
                concept_id = Some(existing.clone());
                break;
            }
        }

        let concept_id = match concept_id {
            Some(id) => id,
            None if self.should_collapse_to_hypernym(sense, original_term) => {
                let target = normalize_label(&sense.hypernyms[0]);
                let mut usage = self.hypernym_usage.lock().expect("usage counter poisoned");
                *usage.entry(target.clone()).or_insert(0) += 1;
                target
            }
            None => match sense.source_tag {
                SourceTag::Wordnet => sense.source_id.clone(),
                SourceTag::Wikidata => sense.source_id.to_lowercase(),
                SourceTag::Babelnet => sense.source_id.clone(),
                _ => normalize_label(&sense.resolved_form),
            },
        };

        let concept_path = build_concept_path(&concept_id, attribute_key, &sense.hypernyms);

        // Register every form under both normalization forms; first writer
        // wins, so earlier bindings are never clobbered.
        registry.bind_both_forms(original_term, &concept_id);
        registry.bind_both_forms(&sense.resolved_form, &concept_id);
        for form in &sense.all_forms {
            registry.bind_both_forms(form, &concept_id);
        }
        registry.bind(&concept_id, &concept_id);

        let concept_root = attribute_key
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_else(|| concept_id.clone());
        let siblings: Vec<String> = sense
            .all_forms
            .iter()
            .map(|f| f.to_lowercase())
            .filter(|f| *f != concept_id)
            .collect();

        OntologyNode {
            concept_id,
            concept_root,
            concept_path,
            parents: sense.hypernyms.iter().map(|h| h.to_lowercase()).collect(),
            children: Vec::new(),
            siblings,
            source: sense.source.clone(),
            confidence: if sense.score > 0.0 {
                (sense.score + 0.3).min(1.0)
            } else {
                0.7
            },
        }
    }
}

/// `[attribute_key?, ...hypernym labels, concept_id]`, lowercased,
/// duplicates removed preserving first occurrence.
fn build_concept_path(
    concept_id: &str,
    attribute_key: Option<&str>,
    hypernyms: &[String],
) -> Vec<String> {
    let mut path: Vec<String> = Vec::with_capacity(hypernyms.len() + 2);
    if let Some(key) = attribute_key {
        let key = key.trim().to_lowercase();
        if !key.is_empty() {
            path.push(key);
        }
    }
    for hypernym in hypernyms {
        let label = hypernym.to_lowercase();
        if !label.is_empty() && label != concept_id && !path.contains(&label) {
            path.push(label);
        }
    }
    if !path.iter().any(|p| p == concept_id) {
        path.push(concept_id.to_string());
    }
    path
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase().replace('_', " ")
}

fn load_p8814(path: &Path) -> Option<FxHashMap<String, Vec<String>>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::info!(path = %path.display(), error = %e, "P8814 cache missing; enrichment disabled");
            return None;
        }
    };
    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::info!(path = %path.display(), error = %e, "P8814 cache unparseable; enrichment disabled");
            return None;
        }
    };

    let mut map = FxHashMap::default();
    if let Some(entries) = value.as_object() {
        for (synset_id, entry) in entries {
            let aliases: Vec<String> = entry["aliases"]
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|a| a.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            if !aliases.is_empty() {
                map.insert(synset_id.clone(), aliases);
            }
        }
    }
    tracing::info!(mappings = map.len(), "P8814 cache loaded");
    Some(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wordnet::WordNet;

    fn wordnet_source() -> Arc<WordNetSource> {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("data.noun"),
            "\
00000010 03 n 02 laptop 0 portable_computer 0 001 @ 00000011 n 0000 | a portable personal computer\n\
00000011 03 n 02 portable_computer 0 notebook 0 001 ~ 00000010 n 0000 | a computer small enough to carry\n\
00000012 03 n 01 entity 0 000 | that which exists\n\
00000013 03 n 01 mathematics 0 001 @ 00000014 n 0000 | the study of quantity and structure\n\
00000014 03 n 01 science 0 001 ~ 00000013 n 0000 | systematic knowledge\n",
        )
        .expect("data");
        std::fs::write(
            dir.path().join("index.noun"),
            "\
laptop n 1 1 @ 1 0 00000010\n\
portable_computer n 1 1 ~ 1 0 00000011\n\
notebook n 1 1 ~ 1 0 00000011\n\
entity n 1 0 1 0 00000012\n\
mathematics n 1 1 @ 1 0 00000013\n\
science n 1 1 ~ 1 0 00000014\n",
        )
        .expect("index");
        Arc::new(WordNetSource::new(Arc::new(
            WordNet::load(dir.path()).expect("load"),
        )))
    }

    fn canonicalizer() -> Canonicalizer {
        Canonicalizer::new(wordnet_source(), None, CanonicalizerConfig::default())
    }

    fn laptop_sense() -> DisambiguatedSense {
        DisambiguatedSense {
            resolved_form: "laptop".into(),
            source: "wordnet".into(),
            source_tag: SourceTag::Wordnet,
            source_id: "00000010-n".into(),
            all_forms: vec!["laptop".into(), "portable computer".into()],
            hypernyms: vec!["portable computer".into()],
            score: 0.8,
        }
    }

    #[test]
    fn cross_tier_propagation_reuses_existing_ids() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        registry.bind_both_forms("portable computer", "already-known");

        let node = canon.canonicalize(&laptop_sense(), "Laptop", Some("item_type"), &mut registry);
        assert_eq!(node.concept_id, "already-known");
        // The new surface forms now alias the existing concept.
        assert_eq!(
            registry.resolve("laptop").map(String::as_str),
            Some("already-known")
        );
    }

    #[test]
    fn rule_a_collapses_when_term_is_parent_lemma() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        // "notebook" is a lemma of the parent synset (portable_computer), so
        // the literal-synonym rule fires.
        let sense = DisambiguatedSense {
            resolved_form: "notebook".into(),
            source: "wordnet".into(),
            source_tag: SourceTag::Wordnet,
            source_id: "00000011-n".into(),
            all_forms: vec!["notebook".into()],
            hypernyms: vec!["portable_computer".into()],
            score: 0.5,
        };
        let node = canon.canonicalize(&sense, "notebook", None, &mut registry);
        assert_eq!(node.concept_id, "portable computer");
    }

    #[test]
    fn rule_b_consolidates_siblings_after_first_collapse() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();

        // First collapse (via Rule A) seeds the usage counter.
        let notebook = DisambiguatedSense {
            resolved_form: "notebook".into(),
            source: "wordnet".into(),
            source_tag: SourceTag::Wordnet,
            source_id: "00000011-n".into(),
            all_forms: vec!["notebook".into()],
            hypernyms: vec!["portable_computer".into()],
            score: 0.5,
        };
        let first = canon.canonicalize(&notebook, "notebook", None, &mut registry);
        assert_eq!(first.concept_id, "portable computer");

        // A different sense with the same parent now consolidates via Rule B
        // even though its own term is not a parent lemma.
        let mut registry2 = SynonymRegistry::new();
        let laptop = laptop_sense();
        let node = canon.canonicalize(&laptop, "laptop", None, &mut registry2);
        assert_eq!(node.concept_id, "portable computer");
    }

    #[test]
    fn abstract_parents_never_become_concept_ids() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        let sense = DisambiguatedSense {
            resolved_form: "mathematics".into(),
            source: "wordnet".into(),
            source_tag: SourceTag::Wordnet,
            source_id: "00000013-n".into(),
            all_forms: vec!["mathematics".into()],
            hypernyms: vec!["science".into()],
            score: 0.9,
        };
        let node = canon.canonicalize(&sense, "mathematics", Some("subject"), &mut registry);
        // "science" is block-listed; specificity is preserved and the
        // WordNet sense keeps its synset id.
        assert_eq!(node.concept_id, "00000013-n");
        assert_eq!(node.concept_path, vec!["subject", "science", "00000013-n"]);
    }

    #[test]
    fn non_wordnet_sources_use_normalized_labels() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        let sense = DisambiguatedSense {
            resolved_form: "Navy_Blue".into(),
            source: "datamuse".into(),
            source_tag: SourceTag::Datamuse,
            source_id: "datamuse:navy blue".into(),
            all_forms: vec!["navy blue".into()],
            hypernyms: vec![],
            score: 0.0,
        };
        let node = canon.canonicalize(&sense, "Navy Blue", Some("color"), &mut registry);
        assert_eq!(node.concept_id, "navy blue");
        assert_eq!(node.concept_path, vec!["color", "navy blue"]);
        assert!((node.confidence - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn wikidata_ids_are_lowercased() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        let sense = DisambiguatedSense {
            resolved_form: "laptop".into(),
            source: "wikidata".into(),
            source_tag: SourceTag::Wikidata,
            source_id: "Q3962".into(),
            all_forms: vec!["laptop".into()],
            hypernyms: vec![],
            score: 0.6,
        };
        let node = canon.canonicalize(&sense, "laptop", None, &mut registry);
        assert_eq!(node.concept_id, "q3962");
        assert_eq!(registry.resolve("laptop").map(String::as_str), Some("q3962"));
    }

    #[test]
    fn registry_writes_cover_both_normalization_forms() {
        let canon = canonicalizer();
        let mut registry = SynonymRegistry::new();
        let sense = DisambiguatedSense {
            resolved_form: "second hand".into(),
            source: "wordnet".into(),
            source_tag: SourceTag::Wordnet,
            source_id: "00000101-s".into(),
            all_forms: vec!["second hand".into(), "secondhand".into()],
            hypernyms: vec![],
            score: 0.4,
        };
        canon.canonicalize(&sense, "Second-Hand", Some("condition"), &mut registry);
        for form in ["second hand", "second-hand", "secondhand", "SECOND   HAND"] {
            assert_eq!(
                registry.resolve(form).map(String::as_str),
                Some("00000101-s"),
                "form {form:?} did not resolve"
            );
        }
    }

    #[test]
    fn path_collapses_duplicates_preserving_first() {
        let path = build_concept_path(
            "dog",
            Some("species"),
            &["canine".into(), "dog".into(), "canine".into()],
        );
        assert_eq!(path, vec!["species", "canine", "dog"]);
    }
}
