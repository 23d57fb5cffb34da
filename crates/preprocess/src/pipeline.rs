//! The phase-0 normalization pipeline.
//!
//! Stage order matters and is part of the contract:
//! lowercase/trim/collapse → abbreviations → MWE reduction → UK→US spelling
//! → demonyms (gated by attribute key) → single-word lemmatization.
//!
//! The pipeline never fails: every stage is a pure table lookup or a local
//! WordNet query, and a stage that has nothing to say leaves the text as the
//! previous stage produced it. Applying the pipeline twice yields the same
//! string as applying it once.

use std::sync::Arc;

use wordnet::{Pos, WordNet};

use crate::dicts::{
    ABBREVIATIONS, ATTRIBUTE_MWE, DEMONYMS, DEMONYM_ATTRIBUTES, GENERAL_MWE, UK_TO_US,
};

/// Phase-0 preprocessor. Holds an optional WordNet handle for the
/// lemmatization stage; without one that stage is skipped.
#[derive(Clone)]
pub struct Preprocessor {
    wordnet: Option<Arc<WordNet>>,
}

impl Preprocessor {
    pub fn new(wordnet: Option<Arc<WordNet>>) -> Self {
        Preprocessor { wordnet }
    }

    /// Normalize a raw attribute value.
    ///
    /// `attribute_key` scopes the MWE tables and gates the demonym stage.
    pub fn preprocess(&self, value: &str, attribute_key: Option<&str>) -> String {
        // 1. Lowercase, trim, collapse internal whitespace.
        let mut text = value
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            return text;
        }

        // 2. Abbreviations: full-string lookup first, then per-token.
        if let Some(expanded) = ABBREVIATIONS.get(text.as_str()) {
            text = (*expanded).to_string();
        } else {
            text = text
                .split(' ')
                .map(|word| *ABBREVIATIONS.get(word).unwrap_or(&word))
                .collect::<Vec<_>>()
                .join(" ");
        }

        // 3. MWE reduction: attribute-scoped table first, then general.
        if let Some(key) = attribute_key {
            if let Some(attr_table) = ATTRIBUTE_MWE.get(key.to_lowercase().as_str()) {
                if let Some(reduced) = attr_table.get(text.as_str()) {
                    text = (*reduced).to_string();
                }
            }
        }
        if let Some(reduced) = GENERAL_MWE.get(text.as_str()) {
            text = (*reduced).to_string();
        }

        // 4. UK → US spelling, word level.
        text = text
            .split(' ')
            .map(|word| *UK_TO_US.get(word).unwrap_or(&word))
            .collect::<Vec<_>>()
            .join(" ");

        // 5. Demonyms, only under origin-like attribute keys. Gating is what
        // keeps "english" a language when the attribute is `language`.
        if let Some(key) = attribute_key {
            if DEMONYM_ATTRIBUTES.contains(key.to_lowercase().as_str()) {
                if let Some(place) = DEMONYMS.get(text.as_str()) {
                    text = (*place).to_string();
                }
            }
        }

        // 6. Lemmatize single-word residues; discard empty or one-character
        // lemmas.
        if !text.contains(' ') {
            if let Some(wn) = &self.wordnet {
                if let Some(lemma) = wn.morphy(&text, Pos::Noun) {
                    if lemma.len() > 1 {
                        text = lemma;
                    }
                }
            }
        }

        text.trim().to_string()
    }
}

/// Compound normalization for registry lookups: lowercase, then strip all
/// whitespace, hyphens, and underscores so "second hand", "second-hand" and
/// "secondhand" collide.
pub fn normalize_for_registry_lookup(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect()
}
