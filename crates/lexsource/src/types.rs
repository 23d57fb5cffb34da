use std::fmt;

use serde::{Deserialize, Serialize};

/// Provenance tag for a candidate sense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    Wordnet,
    Wordsapi,
    Datamuse,
    Wikidata,
    Babelnet,
    MerriamWebster,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Wordnet => "wordnet",
            SourceTag::Wordsapi => "wordsapi",
            SourceTag::Datamuse => "datamuse",
            SourceTag::Wikidata => "wikidata",
            SourceTag::Babelnet => "babelnet",
            SourceTag::MerriamWebster => "merriam-webster",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One possible meaning of a term, from one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSense {
    pub source: SourceTag,
    /// Source-scoped stable id: WordNet offset+POS, Wikidata QID, BabelNet
    /// synset id, or a synthetic key for sources without a sense inventory.
    pub source_id: String,
    /// Preferred surface form.
    pub label: String,
    /// Free-text definition used for scoring; may be empty.
    pub gloss: String,
    /// Known surface synonyms, including the label.
    pub all_forms: Vec<String>,
    /// Parent labels, closest first; possibly empty.
    pub hypernyms: Vec<String>,
    /// Ensemble score, assigned during disambiguation. Range [0, 1].
    pub score: f32,
}

/// A source's single best sense for a term, already disambiguated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntry {
    pub canonical_id: String,
    pub canonical_label: String,
    pub all_forms: Vec<String>,
    pub hypernyms: Vec<String>,
    pub gloss: String,
    /// Cross-link to a Wikidata entity when the source exposes one
    /// (BabelNet senses with a WIKIDATA provenance).
    pub linked_wikidata: Option<String>,
    /// Cross-link to a BabelNet synset (Wikidata property P2581).
    pub linked_babelnet: Option<String>,
}

impl CanonicalEntry {
    /// A minimal entry with no synonyms, hierarchy, or cross-links.
    pub fn bare(canonical_id: impl Into<String>, canonical_label: impl Into<String>) -> Self {
        let canonical_label = canonical_label.into();
        CanonicalEntry {
            canonical_id: canonical_id.into(),
            all_forms: vec![canonical_label.clone()],
            canonical_label,
            hypernyms: Vec::new(),
            gloss: String::new(),
            linked_wikidata: None,
            linked_babelnet: None,
        }
    }
}

/// Deduplicate, preserving first occurrence.
pub(crate) fn dedup_preserving(items: Vec<String>) -> Vec<String> {
    let mut seen = fxhash::FxHashSet::default();
    items
        .into_iter()
        .filter(|item| !item.is_empty() && seen.insert(item.clone()))
        .collect()
}
