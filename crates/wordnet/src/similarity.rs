//! Hypernym-graph traversal: full paths and path similarity.

use std::collections::VecDeque;

use fxhash::FxHashMap;

use crate::db::{Synset, SynsetKey, WordNet};

/// Hard cap on traversal depth. Real WordNet noun chains top out around 19.
const MAX_TRAVERSAL_DEPTH: usize = 24;

impl WordNet {
    /// All hypernym paths for a synset, each ordered root → leaf (the synset
    /// itself is always the last element).
    pub fn hypernym_paths<'a>(&'a self, synset: &'a Synset) -> Vec<Vec<&'a Synset>> {
        let mut paths = Vec::new();
        let mut stack = vec![synset];
        self.walk_paths(synset, &mut stack, &mut paths, 0);
        paths
    }

    fn walk_paths<'a>(
        &'a self,
        current: &'a Synset,
        stack: &mut Vec<&'a Synset>,
        out: &mut Vec<Vec<&'a Synset>>,
        depth: usize,
    ) {
        let parents = self.hypernyms_of(current);
        if parents.is_empty() || depth >= MAX_TRAVERSAL_DEPTH {
            let mut path: Vec<&Synset> = stack.clone();
            path.reverse();
            out.push(path);
            return;
        }
        for parent in parents {
            // Guard against pointer cycles in hand-built or damaged data.
            if stack.iter().any(|s| s.key() == parent.key()) {
                continue;
            }
            stack.push(parent);
            self.walk_paths(parent, stack, out, depth + 1);
            stack.pop();
        }
    }

    /// Minimal hypernym-closure depths, including the synset itself at 0.
    pub(crate) fn hypernym_depths(&self, synset: &Synset) -> FxHashMap<SynsetKey, usize> {
        let mut depths = FxHashMap::default();
        let mut queue = VecDeque::new();
        depths.insert(synset.key(), 0usize);
        queue.push_back(synset.key());

        while let Some(key) = queue.pop_front() {
            let depth = depths[&key];
            if depth >= MAX_TRAVERSAL_DEPTH {
                continue;
            }
            let Some(current) = self.synsets.get(&key) else {
                continue;
            };
            for parent in &current.hypernyms {
                if !depths.contains_key(parent) {
                    depths.insert(*parent, depth + 1);
                    queue.push_back(*parent);
                }
            }
        }
        depths
    }

    /// Path similarity: `1 / (1 + d)` where `d` is the shortest distance
    /// between the synsets through a common hypernym. `None` when the two
    /// synsets share no ancestor (e.g. across parts of speech).
    pub fn path_similarity(&self, a: &Synset, b: &Synset) -> Option<f32> {
        if a.key() == b.key() {
            return Some(1.0);
        }
        let depths_a = self.hypernym_depths(a);
        let depths_b = self.hypernym_depths(b);

        let mut shortest: Option<usize> = None;
        for (key, da) in &depths_a {
            if let Some(db) = depths_b.get(key) {
                let distance = da + db;
                shortest = Some(shortest.map_or(distance, |d| d.min(distance)));
            }
        }
        shortest.map(|d| 1.0 / (1.0 + d as f32))
    }
}
