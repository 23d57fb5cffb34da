use serde::{Deserialize, Serialize};

/// A resolved concept, shaped for downstream matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyNode {
    /// Stable concept key: WordNet offset+POS, lowercased Wikidata QID, or a
    /// lowercased normalized label.
    pub concept_id: String,
    /// The attribute key when one was supplied, else the concept id.
    pub concept_root: String,
    /// Ordered root → leaf: `[attribute_key?, ...hypernym_labels, concept_id]`,
    /// lowercased, duplicates collapsed preserving first occurrence.
    pub concept_path: Vec<String>,
    pub parents: Vec<String>,
    pub children: Vec<String>,
    pub siblings: Vec<String>,
    /// Provenance: a source tag, an enrichment chain like
    /// `"wordnet+wikidata"`, or the special `"synonym_registry"` /
    /// `"fallback"` values.
    pub source: String,
    /// Range [0, 1].
    pub confidence: f32,
}

impl OntologyNode {
    /// Fallback node for values nothing could resolve: the value becomes its
    /// own concept.
    pub fn fallback(value: &str, attribute_key: Option<&str>) -> Self {
        let concept_id = value.trim().to_lowercase();
        let concept_root = attribute_key
            .map(|k| k.trim().to_lowercase())
            .unwrap_or_else(|| concept_id.clone());
        let concept_path = if attribute_key.is_some() {
            vec![concept_root.clone(), concept_id.clone()]
        } else {
            vec![concept_id.clone()]
        };
        OntologyNode {
            concept_id,
            concept_root,
            concept_path,
            parents: Vec::new(),
            children: Vec::new(),
            siblings: Vec::new(),
            source: "fallback".into(),
            confidence: 0.3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_node_shape() {
        let node = OntologyNode::fallback("Telecaster", Some("Model"));
        assert_eq!(node.concept_id, "telecaster");
        assert_eq!(node.concept_root, "model");
        assert_eq!(node.concept_path, vec!["model", "telecaster"]);
        assert_eq!(node.source, "fallback");
        assert!((node.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn fallback_without_attribute_roots_at_itself() {
        let node = OntologyNode::fallback("widget", None);
        assert_eq!(node.concept_root, "widget");
        assert_eq!(node.concept_path, vec!["widget"]);
    }
}
