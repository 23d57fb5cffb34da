//! Attribute-key canonicalization.
//!
//! Extracted listings spell the same attribute a dozen ways — "style",
//! "variety", "kind", "type" — and set-membership matching needs them to
//! agree. This crate clusters keys per domain through a layered cascade:
//!
//! 1. cache (stable mappings, persisted)
//! 2. shared WordNet synset with a previously seen key
//! 3. shared WordNet hypernym within a bounded depth, generic ancestors
//!    filtered
//! 4. embedding cosine over a domain-templated phrase, high threshold
//! 5. the key becomes its own canonical
//!
//! A match at any layer joins the key to its partner's connected component
//! in the per-domain similarity graph, and the whole component shares one
//! canonical (the first one written) — clustering is component-stable, not
//! last-writer-wins. Borderline embedding matches are accepted but flagged
//! into a persistent review queue; rejection is the only operation that
//! ever unbinds a mapping.

mod canonicalizer;
mod error;
mod graph;
mod review;

pub use crate::canonicalizer::{KeyCanonConfig, KeyCanonicalizer};
pub use crate::error::KeyCanonError;
pub use crate::graph::SimilarityGraph;
pub use crate::review::{ReviewEntry, ReviewStatus, ReviewSummary};
