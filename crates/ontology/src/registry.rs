//! The in-memory synonym registry and concept-path index.
//!
//! Both are process-wide, populated from the store at startup and mutated
//! during resolves. The caller owns the locking (one mutex around both, per
//! the engine's concurrency model); these types are plain maps with the
//! binding rules baked in.

use fxhash::FxHashMap;
use preprocess::normalize_for_registry_lookup;

/// alias → concept_id, first-writer-wins.
///
/// Aliases are stored under the lowercased-trimmed form; callers that want
/// compound-form collisions register and look up the
/// [`normalize_for_registry_lookup`] form as well.
#[derive(Debug, Default, Clone)]
pub struct SynonymRegistry {
    map: FxHashMap<String, String>,
}

impl SynonymRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `alias → concept_id` unless the alias is already bound.
    /// Re-registration to a different id is a no-op; returns whether the
    /// binding was inserted.
    pub fn bind(&mut self, alias: &str, concept_id: &str) -> bool {
        let key = alias.trim().to_lowercase();
        if key.is_empty() || concept_id.is_empty() {
            return false;
        }
        if self.map.contains_key(&key) {
            return false;
        }
        self.map.insert(key, concept_id.to_string());
        true
    }

    /// Bind an alias under both normalization forms (lowercased-trimmed and
    /// compound-normalized).
    pub fn bind_both_forms(&mut self, alias: &str, concept_id: &str) {
        self.bind(alias, concept_id);
        let compound = normalize_for_registry_lookup(alias);
        if !compound.is_empty() {
            self.bind(&compound, concept_id);
        }
    }

    /// Exact lookup under the lowercased-trimmed key.
    pub fn get(&self, alias: &str) -> Option<&String> {
        self.map.get(&alias.trim().to_lowercase())
    }

    /// Lookup under both normalization forms — the form every resolver-side
    /// consultation uses.
    pub fn resolve(&self, surface: &str) -> Option<&String> {
        self.get(surface)
            .or_else(|| self.map.get(&normalize_for_registry_lookup(surface)))
    }

    /// Remove a binding. Only the key-canonicalizer reject path calls this;
    /// ordinary resolution never unbinds.
    pub fn unbind(&mut self, alias: &str) -> Option<String> {
        self.map.remove(&alias.trim().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.map.iter()
    }
}

/// concept_id → concept_path, written after each successful resolve and
/// loaded from the store on startup.
#[derive(Debug, Default, Clone)]
pub struct ConceptPaths {
    map: FxHashMap<String, Vec<String>>,
}

impl ConceptPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, concept_id: &str, path: Vec<String>) {
        if concept_id.is_empty() || path.is_empty() {
            return;
        }
        self.map.insert(concept_id.trim().to_lowercase(), path);
    }

    pub fn get(&self, concept_id: &str) -> Option<&Vec<String>> {
        self.map.get(&concept_id.trim().to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_writer_wins() {
        let mut registry = SynonymRegistry::new();
        assert!(registry.bind("used", "00000101-s"));
        assert!(!registry.bind("Used ", "something-else"));
        assert_eq!(registry.get("USED").map(String::as_str), Some("00000101-s"));
    }

    #[test]
    fn both_forms_collide_compounds() {
        let mut registry = SynonymRegistry::new();
        registry.bind_both_forms("second hand", "00000101-s");
        assert_eq!(
            registry.resolve("second-hand").map(String::as_str),
            Some("00000101-s")
        );
        assert_eq!(
            registry.resolve("secondhand").map(String::as_str),
            Some("00000101-s")
        );
    }

    #[test]
    fn unbind_is_explicit_only() {
        let mut registry = SynonymRegistry::new();
        registry.bind("style", "style");
        assert_eq!(registry.unbind("style"), Some("style".to_string()));
        assert!(registry.get("style").is_none());
    }

    #[test]
    fn empty_aliases_rejected() {
        let mut registry = SynonymRegistry::new();
        assert!(!registry.bind("  ", "x"));
        assert!(!registry.bind("a", ""));
        assert!(registry.is_empty());
    }

    #[test]
    fn paths_are_keyed_case_insensitively() {
        let mut paths = ConceptPaths::new();
        paths.insert("Dog", vec!["animal".into(), "dog".into()]);
        assert_eq!(
            paths.get("dog"),
            Some(&vec!["animal".to_string(), "dog".to_string()])
        );
        paths.insert("", vec!["x".into()]);
        assert_eq!(paths.len(), 1);
    }
}
