//! WordNet adapter: the only local source, and the only one with a full
//! sense inventory plus hierarchy, so it anchors both disambiguation and
//! the ancestor checks.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use embedder::cosine_similarity;
use wordnet::{Pos, Synset, WordNet};

use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

pub struct WordNetSource {
    wn: Arc<WordNet>,
}

impl WordNetSource {
    pub fn new(wn: Arc<WordNet>) -> Self {
        WordNetSource { wn }
    }

    pub fn database(&self) -> &Arc<WordNet> {
        &self.wn
    }

    /// First lemma of each direct hypernym synset, closest parents first.
    fn hypernym_labels(&self, synset: &Synset) -> Vec<String> {
        self.wn
            .hypernyms_of(synset)
            .into_iter()
            .map(|h| h.first_lemma().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    fn candidate_from(&self, term: &str, synset: &Synset) -> CandidateSense {
        let label = if synset.first_lemma().is_empty() {
            term.to_lowercase()
        } else {
            synset.first_lemma().to_string()
        };
        CandidateSense {
            source: SourceTag::Wordnet,
            source_id: synset.offset_id(),
            label,
            gloss: synset.gloss.clone(),
            all_forms: synset.lemmas.clone(),
            hypernyms: self.hypernym_labels(synset),
            score: 0.0,
        }
    }

    /// Pick the synset whose gloss best matches the context embedding.
    async fn disambiguate<'a>(&self, synsets: &[&'a Synset], context: &str) -> Option<&'a Synset> {
        if synsets.is_empty() {
            return None;
        }
        if synsets.len() == 1 || context.is_empty() {
            return Some(synsets[0]);
        }

        let context_emb = match embedder::shared().encode(context).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "gloss disambiguation fell back to first synset");
                return Some(synsets[0]);
            }
        };

        let mut best = synsets[0];
        let mut best_score = -1.0f32;
        for synset in synsets {
            if synset.gloss.is_empty() {
                continue;
            }
            let gloss_emb = match embedder::shared().encode(&synset.gloss).await {
                Ok(v) => v,
                Err(_) => continue,
            };
            let score = cosine_similarity(&context_emb, &gloss_emb);
            if score > best_score {
                best_score = score;
                best = synset;
            }
        }
        Some(best)
    }
}

#[async_trait]
impl LexicalSource for WordNetSource {
    fn tag(&self) -> SourceTag {
        SourceTag::Wordnet
    }

    fn is_available(&self) -> bool {
        self.wn.is_available()
    }

    async fn gather(&self, term: &str, _context: Option<&str>) -> Vec<CandidateSense> {
        self.wn
            .synsets(term)
            .into_iter()
            .map(|synset| self.candidate_from(term, synset))
            .collect()
    }

    async fn get_canonical(&self, term: &str, context: Option<&str>) -> Option<CanonicalEntry> {
        let mut synsets = self.wn.synsets(term);
        if synsets.is_empty() {
            return None;
        }

        // Prefer nominal/adjectival senses over verbs and adverbs: item
        // types, attributes, and categories are almost always nouns or
        // adjectives, and this keeps "used" from resolving as a verb.
        let nominal: Vec<&Synset> = synsets
            .iter()
            .copied()
            .filter(|s| matches!(s.pos, Pos::Noun | Pos::Adj | Pos::AdjSat))
            .collect();
        if !nominal.is_empty() {
            synsets = nominal;
        }

        let best = self
            .disambiguate(&synsets, context.unwrap_or(""))
            .await?;

        let all_forms = best.lemmas.clone();
        Some(CanonicalEntry {
            canonical_id: best.offset_id(),
            canonical_label: all_forms
                .first()
                .cloned()
                .unwrap_or_else(|| term.to_lowercase()),
            all_forms,
            hypernyms: self.hypernym_labels(best),
            gloss: best.gloss.clone(),
            linked_wikidata: None,
            linked_babelnet: None,
        })
    }

    async fn get_synonyms(&self, term: &str) -> Vec<String> {
        let needle = term.trim().to_lowercase();
        let mut synonyms: Vec<String> = self
            .wn
            .synsets(term)
            .into_iter()
            .flat_map(|s| s.lemmas.iter().cloned())
            .filter(|l| *l != needle)
            .collect();
        synonyms.sort();
        synonyms.dedup();
        synonyms
    }

    async fn get_hypernyms(&self, term: &str, depth: usize) -> Vec<String> {
        let synsets = self.wn.synsets(term);
        let Some(first) = synsets.first() else {
            return Vec::new();
        };

        let mut labels = Vec::new();
        let mut queue: VecDeque<(&Synset, usize)> = VecDeque::new();
        queue.push_back((first, 0));
        let mut visited: Vec<String> = Vec::new();

        while let Some((synset, level)) = queue.pop_front() {
            if level >= depth {
                continue;
            }
            for parent in self.wn.hypernyms_of(synset) {
                let id = parent.offset_id();
                if visited.contains(&id) {
                    continue;
                }
                visited.push(id);
                labels.extend(parent.lemmas.iter().cloned());
                queue.push_back((parent, level + 1));
            }
        }
        dedup_preserving(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fixture() -> WordNetSource {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("data.noun"),
            "\
00000003 03 n 02 canine 0 canid 0 001 ~ 00000004 n 0000 | a carnivorous mammal\n\
00000004 03 n 03 dog 0 domestic_dog 0 canis_familiaris 0 001 @ 00000003 n 0000 | a member of the genus canis\n",
        )
        .expect("data.noun");
        std::fs::write(
            dir.path().join("index.noun"),
            "canine n 1 1 ~ 1 0 00000003\ncanid n 1 1 ~ 1 0 00000003\ndog n 1 1 @ 1 0 00000004\n",
        )
        .expect("index.noun");
        // A verb sense for "dog" to exercise the POS preference.
        std::fs::write(
            dir.path().join("data.verb"),
            "00000204 03 v 01 dog 0 000 | go after with the intent to catch\n",
        )
        .expect("data.verb");
        std::fs::write(dir.path().join("index.verb"), "dog v 1 0 1 0 00000204\n")
            .expect("index.verb");

        let wn = WordNet::load(dir.path()).expect("load fixture");
        WordNetSource::new(Arc::new(wn))
    }

    #[tokio::test]
    async fn gather_yields_one_candidate_per_synset() {
        let source = fixture();
        let candidates = source.gather("dog", None).await;
        assert_eq!(candidates.len(), 2); // noun + verb senses
        assert_eq!(candidates[0].source_id, "00000004-n");
        assert_eq!(candidates[0].hypernyms, vec!["canine".to_string()]);
        assert!(candidates[0].all_forms.contains(&"domestic dog".into()));
    }

    #[tokio::test]
    async fn canonical_prefers_nominal_senses() {
        let source = fixture();
        let entry = source.get_canonical("dog", None).await.expect("entry");
        assert_eq!(entry.canonical_id, "00000004-n");
        assert_eq!(entry.canonical_label, "dog");
        assert_eq!(entry.hypernyms, vec!["canine".to_string()]);
    }

    #[tokio::test]
    async fn synonyms_exclude_the_term_itself() {
        let source = fixture();
        let synonyms = source.get_synonyms("dog").await;
        assert!(synonyms.contains(&"domestic dog".to_string()));
        assert!(!synonyms.contains(&"dog".to_string()));
    }

    #[tokio::test]
    async fn hypernyms_respect_depth() {
        let source = fixture();
        let parents = source.get_hypernyms("dog", 1).await;
        assert!(parents.contains(&"canine".to_string()));
        assert!(parents.contains(&"canid".to_string()));
        assert!(source.get_hypernyms("dog", 0).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_terms_are_empty_not_errors() {
        let source = fixture();
        assert!(source.gather("zzzzz", None).await.is_empty());
        assert!(source.get_canonical("zzzzz", None).await.is_none());
    }
}
