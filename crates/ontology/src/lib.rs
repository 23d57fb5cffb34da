//! The persistent concept ontology.
//!
//! Three pieces live here:
//!
//! - [`OntologyNode`] — the canonical output of a resolve: concept id, path,
//!   hierarchy neighbors, provenance, confidence.
//! - [`SynonymRegistry`] and [`ConceptPaths`] — the process-wide in-memory
//!   maps the resolver consults on every request. Registry bindings are
//!   monotonic: first writer wins, and nothing is ever silently rebound.
//! - [`OntologyStore`] — the write-behind buffer in front of the
//!   `concept_ontology` table. Resolves buffer concepts in memory; a flush
//!   at the end of a listing ingest performs the durable writes, re-merging
//!   failed rows for the next attempt. Synonym sets only ever grow.
//!
//! The backing table is reached through [`StoreBackend`], with an in-memory
//! implementation for tests and a REST implementation speaking the
//! PostgREST-style row API of the production database.

mod backend;
mod error;
mod node;
mod registry;
mod store;

pub use crate::backend::{ConceptRow, InMemoryBackend, RestBackend, StoreBackend};
pub use crate::error::StoreError;
pub use crate::node::OntologyNode;
pub use crate::registry::{ConceptPaths, SynonymRegistry};
pub use crate::store::{LoadedOntology, OntologyStore, StoreStats};
