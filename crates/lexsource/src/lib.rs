//! Uniform adapters over the lexical knowledge bases the resolver draws on.
//!
//! Six sources implement one trait: WordNet (local, always on), BabelNet,
//! Wikidata, WordsAPI, Datamuse, and Merriam-Webster (network-backed, each
//! optional at configuration time). The disambiguator iterates whatever set
//! the engine wired up — new sources plug in without touching it.
//!
//! Adapter ground rules, shared by every implementation here:
//!
//! - a TTL cache (default one hour) keyed by `(operation, args)`
//! - a daily quota where the free tier demands one; exceeding it degrades
//!   to empty results, it never fails the request
//! - transport failures are logged and swallowed — no error crosses the
//!   adapter boundary
//! - all HTTP goes through one process-wide gzip-enabled client

mod babelnet;
mod cache;
mod datamuse;
mod error;
mod http;
mod merriam;
mod quota;
mod types;
mod wikidata;
mod wordnet_source;
mod wordsapi;

use async_trait::async_trait;

pub use crate::babelnet::BabelNetClient;
pub use crate::cache::TtlCache;
pub use crate::datamuse::DatamuseClient;
pub use crate::error::SourceError;
pub use crate::merriam::MerriamWebsterClient;
pub use crate::quota::DailyQuota;
pub use crate::types::{CandidateSense, CanonicalEntry, SourceTag};
pub use crate::wikidata::{EntityDetails, SearchHit, WikidataClient};
pub use crate::wordnet_source::WordNetSource;
pub use crate::wordsapi::{DefinitionEntry, WordsApiClient};

/// The contract every lexical source implements.
///
/// `gather` is the disambiguator-facing operation: one [`CandidateSense`]
/// per sense the source knows for the term, unscored. The remaining
/// operations serve canonicalization and enrichment.
#[async_trait]
pub trait LexicalSource: Send + Sync {
    fn tag(&self) -> SourceTag;

    /// Whether the source can currently serve requests (key configured,
    /// quota not exhausted, data loaded).
    fn is_available(&self) -> bool {
        true
    }

    /// All candidate senses for a term. Empty on any failure.
    async fn gather(&self, term: &str, context: Option<&str>) -> Vec<CandidateSense>;

    /// The source's single best sense, disambiguated against `context`
    /// where the source supports it.
    async fn get_canonical(&self, term: &str, context: Option<&str>) -> Option<CanonicalEntry>;

    /// Deduplicated synonym surface forms.
    async fn get_synonyms(&self, term: &str) -> Vec<String>;

    /// Parent labels within `depth` hierarchy levels.
    async fn get_hypernyms(&self, term: &str, depth: usize) -> Vec<String>;
}
