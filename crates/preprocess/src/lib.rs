//! Phase-0 text normalization for the canonicalization pipeline.
//!
//! Static, deterministic, local processing — no network, no model calls.
//! Hardcoded dictionaries drive every transformation:
//!
//! 1. lowercase + trim + whitespace collapse
//! 2. abbreviation expansion (full-string first, then per-token)
//! 3. multi-word-expression reduction (attribute-scoped table, then general)
//! 4. UK → US spelling normalization
//! 5. demonym resolution (gated on origin-like attribute keys)
//! 6. single-word lemmatization via WordNet morphy
//!
//! Also exports [`normalize_for_registry_lookup`], the compound form the
//! synonym registry stores alongside the plain lowercased-trimmed form.

mod dicts;
mod pipeline;

pub use crate::dicts::{ABBREVIATIONS, ATTRIBUTE_MWE, DEMONYMS, GENERAL_MWE, UK_TO_US};
pub use crate::pipeline::{normalize_for_registry_lookup, Preprocessor};

#[cfg(test)]
mod tests {
    use super::*;

    fn pre() -> Preprocessor {
        Preprocessor::new(None)
    }

    #[test]
    fn lowercases_and_collapses_whitespace() {
        let p = pre();
        assert_eq!(p.preprocess("  Brand   NEW  ", None), "new");
        assert_eq!(p.preprocess("Navy   Blue", None), "navy blue");
    }

    #[test]
    fn abbreviation_full_string_before_tokens() {
        let p = pre();
        assert_eq!(p.preprocess("AC", Some("amenity")), "air conditioning");
        // Token-level expansion feeds the MWE stage.
        assert_eq!(p.preprocess("2nd hand", Some("condition")), "used");
    }

    #[test]
    fn attribute_mwe_takes_precedence() {
        let p = pre();
        assert_eq!(p.preprocess("gently worn", Some("condition")), "very_good");
        assert_eq!(p.preprocess("renewed", Some("condition")), "refurbished");
        // General table still applies without an attribute key.
        assert_eq!(p.preprocess("pre-owned", None), "used");
    }

    #[test]
    fn spelling_normalized_per_word() {
        let p = pre();
        assert_eq!(p.preprocess("Grey Colour", None), "gray color");
    }

    #[test]
    fn demonyms_only_for_origin_attributes() {
        let p = pre();
        assert_eq!(p.preprocess("Indian", Some("nationality")), "india");
        assert_eq!(p.preprocess("english", Some("country_of_origin")), "england");
        // Gated: a language attribute must not turn into a country.
        assert_eq!(p.preprocess("english", Some("language")), "english");
        assert_eq!(p.preprocess("indian", None), "indian");
    }

    #[test]
    fn preprocess_is_idempotent() {
        let p = pre();
        let cases = [
            ("  Brand NEW ", Some("condition")),
            ("2nd hand", Some("condition")),
            ("gently worn", Some("condition")),
            ("Indian", Some("nationality")),
            ("Grey Colour", None),
            ("AC", Some("amenity")),
            ("navy blue", Some("color")),
            ("english", Some("language")),
        ];
        for (input, key) in cases {
            let once = p.preprocess(input, key);
            let twice = p.preprocess(&once, key);
            assert_eq!(once, twice, "not idempotent for {input:?} / {key:?}");
        }
    }

    #[test]
    fn compound_forms_collide() {
        let a = normalize_for_registry_lookup("second hand");
        let b = normalize_for_registry_lookup("second-hand");
        let c = normalize_for_registry_lookup("secondhand");
        let d = normalize_for_registry_lookup("Second_Hand ");
        assert_eq!(a, "secondhand");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(c, d);
    }

    #[test]
    fn empty_and_whitespace_values_pass_through() {
        let p = pre();
        assert_eq!(p.preprocess("", None), "");
        assert_eq!(p.preprocess("   ", Some("condition")), "");
    }

    #[test]
    fn lemmatizes_single_words_with_wordnet() {
        use std::sync::Arc;
        let dir = tempfile::tempdir().expect("tempdir");
        // A single-entry noun database is enough to exercise morphy.
        std::fs::write(
            dir.path().join("data.noun"),
            "00000004 03 n 01 dog 0 000 | a member of the genus canis\n",
        )
        .expect("write data");
        std::fs::write(dir.path().join("index.noun"), "dog n 1 0 1 0 00000004\n")
            .expect("write index");
        let wn = Arc::new(wordnet::WordNet::load(dir.path()).expect("load"));

        let p = Preprocessor::new(Some(wn));
        assert_eq!(p.preprocess("Dogs", None), "dog");
        // Multi-word residues are left alone.
        assert_eq!(p.preprocess("guard dogs barking", None), "guard dogs barking");
    }
}
