//! Per-domain similarity graph: a plain adjacency map with BFS component
//! walks. Edges persist; components are recomputed on demand.

use fxhash::{FxHashMap, FxHashSet};

#[derive(Debug, Default, Clone)]
pub struct SimilarityGraph {
    adjacency: FxHashMap<String, FxHashSet<String>>,
}

impl SimilarityGraph {
    pub fn add_node(&mut self, key: &str) {
        self.adjacency.entry(key.to_string()).or_default();
    }

    pub fn add_edge(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub fn remove_edge(&mut self, a: &str, b: &str) {
        if let Some(neighbors) = self.adjacency.get_mut(a) {
            neighbors.remove(b);
        }
        if let Some(neighbors) = self.adjacency.get_mut(b) {
            neighbors.remove(a);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.adjacency.contains_key(key)
    }

    /// Connected component of `key`, including `key` itself.
    pub fn component(&self, key: &str) -> FxHashSet<String> {
        let mut seen: FxHashSet<String> = FxHashSet::default();
        if !self.adjacency.contains_key(key) {
            seen.insert(key.to_string());
            return seen;
        }
        let mut queue = vec![key.to_string()];
        while let Some(current) = queue.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(neighbors) = self.adjacency.get(&current) {
                for neighbor in neighbors {
                    if !seen.contains(neighbor) {
                        queue.push(neighbor.clone());
                    }
                }
            }
        }
        seen
    }

    /// Undirected edge list, each pair emitted once.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut edges = Vec::new();
        for (a, neighbors) in &self.adjacency {
            for b in neighbors {
                if a < b {
                    edges.push((a.clone(), b.clone()));
                }
            }
        }
        edges.sort();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_follow_edges_transitively() {
        let mut graph = SimilarityGraph::default();
        graph.add_edge("a", "b");
        graph.add_edge("b", "c");
        graph.add_node("lonely");

        let component = graph.component("a");
        assert!(component.contains("a"));
        assert!(component.contains("b"));
        assert!(component.contains("c"));
        assert!(!component.contains("lonely"));
        assert_eq!(graph.component("lonely").len(), 1);
    }

    #[test]
    fn removing_an_edge_splits_the_component() {
        let mut graph = SimilarityGraph::default();
        graph.add_edge("a", "b");
        graph.remove_edge("a", "b");
        assert!(!graph.component("a").contains("b"));
    }

    #[test]
    fn edges_list_each_pair_once() {
        let mut graph = SimilarityGraph::default();
        graph.add_edge("x", "y");
        graph.add_edge("y", "x");
        assert_eq!(graph.edges(), vec![("x".to_string(), "y".to_string())]);
    }

    #[test]
    fn unknown_key_is_its_own_component() {
        let graph = SimilarityGraph::default();
        assert_eq!(graph.component("ghost").len(), 1);
    }
}
