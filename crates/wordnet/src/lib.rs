//! Local WordNet lexical database.
//!
//! Loads the standard WNdb flat-file distribution (`index.noun`, `data.noun`,
//! `noun.exc`, and the verb/adjective/adverb siblings) into memory and exposes
//! the operations the resolution pipeline needs:
//!
//! - synset lookup by lemma (optionally filtered by part of speech)
//! - lemmas, glosses, and stable offset ids (`"02958343-n"`)
//! - hypernym / hyponym traversal and full hypernym paths
//! - morphy lemmatization (exception lists + suffix detachment rules)
//! - path similarity over the hypernym graph
//!
//! Everything here is pure in-memory work: no network, no locks, no clocks.
//! A missing dictionary directory degrades to [`WordNet::empty`], where every
//! lookup returns nothing and [`WordNet::is_available`] is `false`, so callers
//! can treat absent data the same way they treat an unconfigured adapter.

mod db;
mod error;
mod morph;
mod similarity;

pub use crate::db::{Pos, Synset, SynsetKey, WordNet};
pub use crate::error::WordNetError;

#[cfg(test)]
pub(crate) mod fixtures {
    //! Hand-built miniature WNdb tree used across the crate's tests.
    //!
    //! Offsets are synthetic ids (the parser treats them as opaque keys), so
    //! the fixture does not need to reproduce real byte offsets.

    use std::fs;
    use std::path::Path;

    pub fn write_mini_wndb(dir: &Path) {
        // entity > animal > canine > dog > puppy, plus cat as a dog sibling.
        let data_noun = "\
00000001 03 n 01 entity 0 001 ~ 00000002 n 0000 | that which exists\n\
00000002 03 n 01 animal 0 002 @ 00000001 n 0000 ~ 00000003 n 0000 | a living organism\n\
00000003 03 n 02 canine 0 canid 0 002 @ 00000002 n 0000 ~ 00000004 n 0000 | a carnivorous mammal\n\
00000004 03 n 03 dog 0 domestic_dog 0 canis_familiaris 0 002 @ 00000003 n 0000 ~ 00000005 n 0000 | a member of the genus canis kept as a pet or work animal\n\
00000005 03 n 01 puppy 0 001 @ 00000004 n 0000 | a young dog\n\
00000006 03 n 01 cat 0 001 @ 00000002 n 0000 | a feline mammal usually having thick soft fur\n\
00000007 03 n 02 car 0 automobile 0 001 @ 00000001 n 0000 | a motor vehicle with four wheels\n\
00000008 03 n 02 condition 0 status 0 001 @ 00000001 n 0000 | a state at a particular time\n";
        let index_noun = "\
animal n 1 1 ~ 1 0 00000002\n\
canine n 1 2 @ ~ 1 0 00000003\n\
canid n 1 2 @ ~ 1 0 00000003\n\
car n 1 1 @ 1 0 00000007\n\
automobile n 1 1 @ 1 0 00000007\n\
cat n 1 1 @ 1 0 00000006\n\
condition n 1 1 @ 1 0 00000008\n\
status n 1 1 @ 1 0 00000008\n\
dog n 1 2 @ ~ 1 0 00000004\n\
entity n 1 1 ~ 1 0 00000001\n\
puppy n 1 1 @ 1 0 00000005\n";
        let data_adj = "\
00000101 00 s 03 used 0 secondhand 0 second-hand 0 000 | previously used or owned by another\n";
        let index_adj = "\
used a 1 0 1 0 00000101\n\
secondhand a 1 0 1 0 00000101\n\
second-hand a 1 0 1 0 00000101\n";
        let noun_exc = "children child\nteeth tooth\n";

        fs::write(dir.join("data.noun"), data_noun).expect("write data.noun");
        fs::write(dir.join("index.noun"), index_noun).expect("write index.noun");
        fs::write(dir.join("data.adj"), data_adj).expect("write data.adj");
        fs::write(dir.join("index.adj"), index_adj).expect("write index.adj");
        fs::write(dir.join("noun.exc"), noun_exc).expect("write noun.exc");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn load_fixture() -> WordNet {
        let dir = tempdir().expect("tempdir");
        crate::fixtures::write_mini_wndb(dir.path());
        WordNet::load(dir.path()).expect("fixture loads")
    }

    #[test]
    fn missing_directory_degrades_to_empty() {
        let wn = WordNet::load(std::path::Path::new("/definitely/not/there"))
            .unwrap_or_else(|_| WordNet::empty());
        assert!(!wn.is_available());
        assert!(wn.synsets("dog").is_empty());
        assert_eq!(wn.lemmatize("dogs"), "dogs");
    }

    #[test]
    fn synset_lookup_and_offset_id() {
        let wn = load_fixture();
        let synsets = wn.synsets("dog");
        assert_eq!(synsets.len(), 1);
        assert_eq!(synsets[0].offset_id(), "00000004-n");
        assert_eq!(synsets[0].first_lemma(), "dog");
        assert!(synsets[0].lemmas.contains(&"domestic dog".to_string()));
        assert!(synsets[0].gloss.contains("genus canis"));
    }

    #[test]
    fn multiword_lemma_lookup_uses_underscores() {
        let wn = load_fixture();
        let synsets = wn.synsets("domestic dog");
        assert_eq!(synsets.len(), 1);
        assert_eq!(synsets[0].offset_id(), "00000004-n");
    }

    #[test]
    fn synset_by_id_round_trips() {
        let wn = load_fixture();
        let dog = &wn.synsets("dog")[0].clone();
        let back = wn.synset_by_id(&dog.offset_id()).expect("id resolves");
        assert_eq!(back.first_lemma(), "dog");
        assert!(wn.synset_by_id("99999999-n").is_none());
        assert!(wn.synset_by_id("garbage").is_none());
    }

    #[test]
    fn adjective_satellites_carry_their_own_pos_char() {
        let wn = load_fixture();
        let used = wn.synsets("second-hand");
        assert_eq!(used.len(), 1);
        assert_eq!(used[0].offset_id(), "00000101-s");
        assert!(used[0].lemmas.contains(&"used".to_string()));
    }

    #[test]
    fn hypernym_chain_walks_to_root() {
        let wn = load_fixture();
        let puppy = wn.synsets("puppy")[0].clone();
        let parents = wn.hypernyms_of(&puppy);
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].first_lemma(), "dog");

        let paths = wn.hypernym_paths(&puppy);
        assert_eq!(paths.len(), 1);
        let labels: Vec<&str> = paths[0].iter().map(|s| s.first_lemma()).collect();
        assert_eq!(labels, vec!["entity", "animal", "canine", "dog", "puppy"]);
    }

    #[test]
    fn hyponyms_of_direct_children() {
        let wn = load_fixture();
        let dog = wn.synsets("dog")[0].clone();
        let children = wn.hyponyms_of(&dog);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].first_lemma(), "puppy");
    }

    #[test]
    fn path_similarity_prefers_close_relatives() {
        let wn = load_fixture();
        let puppy = wn.synsets("puppy")[0].clone();
        let dog = wn.synsets("dog")[0].clone();
        let cat = wn.synsets("cat")[0].clone();

        let near = wn.path_similarity(&puppy, &dog).expect("connected");
        let far = wn.path_similarity(&puppy, &cat).expect("connected");
        assert!(near > far, "puppy~dog ({near}) should beat puppy~cat ({far})");
        assert_eq!(wn.path_similarity(&dog, &dog), Some(1.0));
    }

    #[test]
    fn morphy_detaches_plural_suffixes() {
        let wn = load_fixture();
        assert_eq!(wn.lemmatize("dogs"), "dog");
        assert_eq!(wn.lemmatize("puppies"), "puppy");
        // Exception list wins over rules.
        assert_eq!(wn.morphy("children", Pos::Noun), None); // "child" is not in the fixture index
        // Unknown word comes back untouched.
        assert_eq!(wn.lemmatize("blorptastic"), "blorptastic");
        // A word already in the index is its own lemma.
        assert_eq!(wn.lemmatize("dog"), "dog");
    }
}
