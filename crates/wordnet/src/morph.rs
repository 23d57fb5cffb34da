//! Morphy lemmatization: exception lists first, then suffix detachment
//! rules, keeping only candidates that actually exist in the index.

use crate::db::{FileKind, Pos, WordNet};

const NOUN_RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ses", "s"),
    ("ves", "f"),
    ("xes", "x"),
    ("zes", "z"),
    ("ches", "ch"),
    ("shes", "sh"),
    ("men", "man"),
    ("ies", "y"),
];

const VERB_RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ies", "y"),
    ("es", "e"),
    ("es", ""),
    ("ed", "e"),
    ("ed", ""),
    ("ing", "e"),
    ("ing", ""),
];

const ADJ_RULES: &[(&str, &str)] = &[("er", ""), ("est", ""), ("er", "e"), ("est", "e")];

fn rules_for(file: FileKind) -> &'static [(&'static str, &'static str)] {
    match file {
        FileKind::Noun => NOUN_RULES,
        FileKind::Verb => VERB_RULES,
        FileKind::Adj => ADJ_RULES,
        FileKind::Adv => &[],
    }
}

impl WordNet {
    /// Morphological base form of `word` for the given POS, or `None` when no
    /// candidate survives the index-membership filter.
    pub fn morphy(&self, word: &str, pos: Pos) -> Option<String> {
        if !self.is_available() {
            return None;
        }
        let file = pos.file();
        let word = word.trim().to_lowercase().replace(' ', "_");
        if word.is_empty() {
            return None;
        }

        let mut candidates: Vec<String> = Vec::new();

        if self.lemma_in_index(&word, file) {
            candidates.push(word.clone());
        }
        if let Some(base) = self.exceptions.get(&(file, word.clone())) {
            if self.lemma_in_index(base, file) {
                candidates.push(base.clone());
            }
        }
        for (suffix, replacement) in rules_for(file) {
            if let Some(stem) = word.strip_suffix(suffix) {
                if stem.is_empty() {
                    continue;
                }
                let candidate = format!("{stem}{replacement}");
                if self.lemma_in_index(&candidate, file) && !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }

        // Shortest surviving form, matching the lemmatizer the pipeline
        // was tuned against.
        candidates
            .into_iter()
            .min_by_key(String::len)
            .map(|lemma| lemma.replace('_', " "))
    }

    /// Noun-position lemmatization with identity fallback: unknown words come
    /// back unchanged.
    pub fn lemmatize(&self, word: &str) -> String {
        self.morphy(word, Pos::Noun)
            .unwrap_or_else(|| word.to_string())
    }
}
