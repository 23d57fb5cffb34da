//! The 3-phase categorical resolution pipeline.
//!
//! `raw value → preprocess → (registry hit?) → disambiguate → canonicalize
//! → buffered to the ontology store → concept id`.
//!
//! - Phase 0 ([`preprocess`]) is deterministic table-driven normalization.
//! - Phase 1 ([`Disambiguator`]) gathers candidate senses from every
//!   configured lexical source and scores them against context with the
//!   hybrid ensemble, consulting the LLM fallback on low margins.
//! - Phase 2 ([`Canonicalizer`]) enriches the winner's alias set, reuses
//!   any concept id the registry already knows (cross-tier propagation),
//!   optionally collapses to a hypernym, and registers every surface form.
//!
//! [`CategoricalResolver`] is the facade that owns the pipeline plus the
//! registry/path state, answers `is_ancestor`, and exposes
//! `semantic_implies` for the downstream matcher. No phase ever raises
//! toward the caller; every failure degrades to a fallback node or `false`.

mod canonicalizer;
mod disambiguator;
mod facade;

pub use crate::canonicalizer::{Canonicalizer, CanonicalizerConfig};
pub use crate::disambiguator::{DisambiguatedSense, Disambiguator, SourceSet};
pub use crate::facade::{CategoricalResolver, DEFAULT_ANCESTOR_DEPTH};
