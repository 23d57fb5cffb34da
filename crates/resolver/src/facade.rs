//! The categorical resolver: the public face of the 3-phase pipeline.
//!
//! One instance serves the whole process. It owns the preprocessor, the
//! disambiguator, the canonicalizer, and the mutex-guarded registry/path
//! state; the ontology store is shared by handle. Mutex hold times are
//! bounded by in-memory work — every network call happens outside the lock.

use std::sync::{Arc, Mutex};

use ontology::{ConceptPaths, OntologyNode, OntologyStore, SynonymRegistry};
use preprocess::Preprocessor;
use serde_json::{json, Value};
use wordnet::{Pos, Synset, WordNet};

use crate::canonicalizer::Canonicalizer;
use crate::disambiguator::{Disambiguator, SourceSet};

/// Default depth bound for the lexical-hierarchy ancestor strategy,
/// measured from the concept toward the root.
pub const DEFAULT_ANCESTOR_DEPTH: usize = 5;

/// Marketplace condition hierarchy seeded into fresh registries so
/// condition values participate in ancestor checks from the first request.
/// The MWE tables reduce surface variants onto exactly these labels.
const CONDITION_HIERARCHY: &[(&str, &[&str])] = &[
    ("new", &["condition", "new"]),
    ("used", &["condition", "used"]),
    ("like_new", &["condition", "used", "like_new"]),
    ("very_good", &["condition", "used", "very_good"]),
    ("good", &["condition", "used", "good"]),
    ("acceptable", &["condition", "used", "acceptable"]),
    ("refurbished", &["condition", "refurbished"]),
    ("damaged", &["condition", "damaged"]),
    ("for_parts", &["condition", "damaged", "for_parts"]),
];

struct ResolverState {
    registry: SynonymRegistry,
    paths: ConceptPaths,
}

pub struct CategoricalResolver {
    preprocessor: Preprocessor,
    disambiguator: Disambiguator,
    canonicalizer: Canonicalizer,
    wn: Arc<WordNet>,
    store: Arc<OntologyStore>,
    wikidata: Option<Arc<lexsource::WikidataClient>>,
    state: Mutex<ResolverState>,
}

impl CategoricalResolver {
    pub fn new(
        preprocessor: Preprocessor,
        disambiguator: Disambiguator,
        canonicalizer: Canonicalizer,
        sources_wikidata: Option<Arc<lexsource::WikidataClient>>,
        wn: Arc<WordNet>,
        store: Arc<OntologyStore>,
    ) -> Self {
        let resolver = CategoricalResolver {
            preprocessor,
            disambiguator,
            canonicalizer,
            wn,
            store,
            wikidata: sources_wikidata,
            state: Mutex::new(ResolverState {
                registry: SynonymRegistry::new(),
                paths: ConceptPaths::new(),
            }),
        };
        resolver.seed_condition_hierarchy();
        resolver
    }

    /// Convenience constructor wiring the full pipeline from a source set.
    pub fn from_parts(
        sources: SourceSet,
        scorer: scoring::HybridScorer,
        fallback: scoring::LlmFallback,
        canonicalizer_cfg: crate::canonicalizer::CanonicalizerConfig,
        use_hybrid: bool,
        margin_threshold: f32,
        store: Arc<OntologyStore>,
    ) -> Self {
        let wn = sources.wordnet.database().clone();
        let wordnet_source = sources.wordnet.clone();
        let babelnet = sources.babelnet.clone();
        let wikidata = sources.wikidata.clone();
        let preprocessor = Preprocessor::new(Some(wn.clone()));
        let disambiguator =
            Disambiguator::new(sources, scorer, fallback, use_hybrid, margin_threshold);
        let canonicalizer = Canonicalizer::new(wordnet_source, babelnet, canonicalizer_cfg);
        Self::new(preprocessor, disambiguator, canonicalizer, wikidata, wn, store)
    }

    fn seed_condition_hierarchy(&self) {
        let mut state = self.state.lock().expect("resolver state poisoned");
        for (label, path) in CONDITION_HIERARCHY {
            let path: Vec<String> = path.iter().map(|p| p.to_string()).collect();
            state.registry.bind_both_forms(label, label);
            state.paths.insert(label, path);
        }
    }

    /// Merge the persisted ontology into the in-memory state. Call once at
    /// startup; persisted bindings win over nothing (first-writer-wins means
    /// seeds stay seeded).
    pub async fn load_persisted(&self) {
        let loaded = self.store.load_from_db().await;
        let mut state = self.state.lock().expect("resolver state poisoned");
        for (alias, concept_id) in loaded.synonym_registry.iter() {
            // Persisted aliases register under both normalization forms,
            // exactly like live registrations.
            state.registry.bind_both_forms(alias, concept_id);
        }
        for (concept_id, path) in loaded.concept_paths.iter() {
            state.paths.insert(concept_id, path.clone());
        }
    }

    /// Resolve one categorical value to an ontology node.
    pub async fn resolve(
        &self,
        value: &str,
        context: Option<&str>,
        attribute_key: Option<&str>,
    ) -> OntologyNode {
        // Phase 0: deterministic preprocessing.
        let preprocessed = self.preprocessor.preprocess(value, attribute_key);
        if preprocessed.is_empty() {
            return OntologyNode::fallback(value, attribute_key);
        }

        // Registry consultation under both normalization forms.
        if let Some(node) = self.registry_hit(&preprocessed, attribute_key) {
            return node;
        }

        // Phase 1: disambiguate. The attribute key doubles as context when
        // the caller has nothing richer.
        let context = context.or(attribute_key);
        let Some(mut sense) = self.disambiguator.disambiguate(&preprocessed, context).await
        else {
            tracing::debug!(value, preprocessed = %preprocessed, "no candidate from any source; fallback node");
            return OntologyNode::fallback(&preprocessed, attribute_key);
        };

        // Phase 2: enrich (outside the lock), then canonicalize and write
        // the registry (inside the lock).
        self.canonicalizer.enrich(&mut sense).await;
        let node = {
            let mut state = self.state.lock().expect("resolver state poisoned");
            let node =
                self.canonicalizer
                    .canonicalize(&sense, value, attribute_key, &mut state.registry);
            state.paths.insert(&node.concept_id, node.concept_path.clone());
            node
        };

        // Buffer for the write-behind flush.
        let mut synonyms: Vec<String> = vec![node.concept_id.clone()];
        synonyms.extend(node.siblings.iter().cloned());
        synonyms.extend(sense.all_forms.iter().map(|f| f.to_lowercase()));
        self.store.buffer_concept(
            &node.concept_id,
            &node.concept_path,
            &synonyms,
            &node.source,
            node.confidence,
        );

        node
    }

    fn registry_hit(&self, preprocessed: &str, attribute_key: Option<&str>) -> Option<OntologyNode> {
        let state = self.state.lock().expect("resolver state poisoned");
        let concept_id = state.registry.resolve(preprocessed)?.clone();
        let path = state.paths.get(&concept_id).cloned().unwrap_or_else(|| {
            match attribute_key {
                Some(key) => vec![key.trim().to_lowercase(), concept_id.clone()],
                None => vec![concept_id.clone()],
            }
        });
        let concept_root = attribute_key
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_else(|| concept_id.clone());
        Some(OntologyNode {
            concept_id,
            concept_root,
            concept_path: path,
            parents: Vec::new(),
            children: Vec::new(),
            siblings: Vec::new(),
            source: "synonym_registry".into(),
            confidence: 0.85,
        })
    }

    /// All surface forms a term may appear under in paths and synset
    /// lookups: the term itself, plus its lemmas when it is a synset id.
    fn term_forms(&self, term: &str) -> Vec<String> {
        let mut forms = vec![term.trim().to_lowercase()];
        if let Some(synset) = self.wn.synset_by_id(term.trim()) {
            for lemma in &synset.lemmas {
                if !forms.contains(lemma) {
                    forms.push(lemma.clone());
                }
            }
        }
        forms
    }

    /// Is `ancestor` an ancestor of `concept_id`?
    ///
    /// Strategies in order: stored concept paths, WordNet hypernym paths
    /// (depth measured from the concept toward the root — ancestry is about
    /// how far up you must climb), then a bounded Wikidata subclass check.
    /// Any internal miss or error reports `false`.
    pub async fn is_ancestor(&self, ancestor: &str, concept_id: &str, max_depth: usize) -> bool {
        // Reflexivity: every concept is its own ancestor.
        if ancestor.trim().to_lowercase() == concept_id.trim().to_lowercase() {
            return true;
        }

        let ancestor_forms = self.term_forms(ancestor);
        let concept_forms = self.term_forms(concept_id);

        // Strategy 1: stored paths.
        {
            let state = self.state.lock().expect("resolver state poisoned");
            for concept_form in &concept_forms {
                let Some(path) = state.paths.get(concept_form) else {
                    continue;
                };
                let ancestor_idx = path
                    .iter()
                    .position(|p| ancestor_forms.iter().any(|a| a == p));
                let concept_idx = path
                    .iter()
                    .rposition(|p| concept_forms.iter().any(|c| c == p));
                if let (Some(ai), Some(ci)) = (ancestor_idx, concept_idx) {
                    if ai < ci {
                        return true;
                    }
                }
            }
        }

        // Strategy 2: live WordNet hypernym paths.
        if self.wordnet_ancestor(&ancestor_forms, &concept_forms, max_depth) {
            return true;
        }

        // Strategy 3: Wikidata P31/P279, bounded tighter (network cost).
        if let Some(wikidata) = &self.wikidata {
            let ancestor_term = &ancestor_forms[0];
            let concept_term = &concept_forms[0];
            if wikidata
                .is_subclass_of(concept_term, ancestor_term, max_depth.min(3))
                .await
            {
                return true;
            }
        }

        false
    }

    fn wordnet_ancestor(
        &self,
        ancestor_forms: &[String],
        concept_forms: &[String],
        max_depth: usize,
    ) -> bool {
        if !self.wn.is_available() {
            return false;
        }

        let concept_synsets = self.synsets_noun_preferred(concept_forms);
        let ancestor_synsets = self.synsets_noun_preferred(ancestor_forms);
        if concept_synsets.is_empty() || ancestor_synsets.is_empty() {
            return false;
        }

        let ancestor_ids: Vec<String> =
            ancestor_synsets.iter().map(|s| s.offset_id()).collect();

        for concept_synset in &concept_synsets {
            for path in self.wn.hypernym_paths(concept_synset) {
                // Paths run root → leaf; walk from the concept upward.
                for (depth_from_concept, synset) in path.iter().rev().enumerate() {
                    if depth_from_concept > max_depth {
                        break;
                    }
                    if ancestor_ids.contains(&synset.offset_id()) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn synsets_noun_preferred(&self, forms: &[String]) -> Vec<&Synset> {
        for form in forms {
            let nouns = self.wn.synsets_pos(form, Pos::Noun);
            if !nouns.is_empty() {
                return nouns;
            }
        }
        for form in forms {
            let any = self.wn.synsets(form);
            if !any.is_empty() {
                return any;
            }
        }
        Vec::new()
    }

    /// The matcher-facing implication: candidate implies required iff they
    /// are equal, registered synonyms, or required is an ancestor of
    /// candidate.
    pub async fn semantic_implies(&self, candidate_id: &str, required_id: &str) -> bool {
        let candidate = candidate_id.trim().to_lowercase();
        let required = required_id.trim().to_lowercase();
        if candidate == required {
            return true;
        }

        {
            let state = self.state.lock().expect("resolver state poisoned");
            let candidate_concept = state.registry.resolve(&candidate);
            let required_concept = state.registry.resolve(&required);
            if let Some(c) = candidate_concept {
                if *c == required {
                    return true;
                }
                if let Some(r) = required_concept {
                    if c == r {
                        return true;
                    }
                }
            }
        }

        self.is_ancestor(&required, &candidate, DEFAULT_ANCESTOR_DEPTH)
            .await
    }

    /// Shape a node for downstream persistence. `match_scope` is consumed by
    /// the matcher ("exact" vs "include_descendants"); the resolver only
    /// carries it.
    pub fn to_schema_format(&self, node: &OntologyNode, match_scope: &str) -> Value {
        json!({
            "concept_id": node.concept_id,
            "concept_root": node.concept_root,
            "concept_path": node.concept_path,
            "match_scope": match_scope,
            "metadata": {
                "parents": node.parents,
                "children": node.children,
                "siblings": node.siblings,
                "source": node.source,
                "confidence": node.confidence,
            },
        })
    }

    /// Registry/path counters, for diagnostics.
    pub fn state_sizes(&self) -> (usize, usize) {
        let state = self.state.lock().expect("resolver state poisoned");
        (state.registry.len(), state.paths.len())
    }
}
