//! The 3-scorer ensemble.

use std::sync::Arc;
use std::time::Duration;

use embedder::cosine_similarity;
use lexsource::{CandidateSense, SourceTag};
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use wordnet::{Synset, WordNet};

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .gzip(true)
        .build()
        .expect("failed to build scoring HTTP client")
});

/// Ensemble weights `(transformer, embedding, knowledge)`. Stored
/// normalized so they always sum to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScorerWeights {
    pub transformer: f32,
    pub embedding: f32,
    pub knowledge: f32,
}

impl Default for ScorerWeights {
    /// Transformer off until a fine-tuned checkpoint is configured.
    fn default() -> Self {
        ScorerWeights {
            transformer: 0.0,
            embedding: 0.7,
            knowledge: 0.3,
        }
    }
}

impl ScorerWeights {
    pub fn new(transformer: f32, embedding: f32, knowledge: f32) -> Self {
        ScorerWeights {
            transformer,
            embedding,
            knowledge,
        }
        .normalized()
    }

    /// Parse `"T,E,K"`; falls back to the defaults on any malformed input.
    pub fn parse(spec: &str) -> Self {
        let parts: Vec<f32> = spec
            .split(',')
            .filter_map(|p| p.trim().parse::<f32>().ok())
            .collect();
        match parts.as_slice() {
            [t, e, k] if t + e + k > 0.0 => Self::new(*t, *e, *k),
            _ => {
                tracing::info!(spec, "unparseable hybrid weights; using defaults");
                Self::default()
            }
        }
    }

    fn normalized(self) -> Self {
        let total = self.transformer + self.embedding + self.knowledge;
        if total <= 0.0 {
            return Self::default();
        }
        ScorerWeights {
            transformer: self.transformer / total,
            embedding: self.embedding / total,
            knowledge: self.knowledge / total,
        }
    }
}

/// Multi-scorer ensemble over candidate senses.
pub struct HybridScorer {
    weights: ScorerWeights,
    wn: Arc<WordNet>,
    /// Gloss-context classifier endpoint. `None` (the default) skips the
    /// transformer entirely — the model is never loaded when its weight
    /// is 0.
    transformer_endpoint: Option<String>,
}

impl HybridScorer {
    pub fn new(weights: ScorerWeights, wn: Arc<WordNet>, transformer_endpoint: Option<String>) -> Self {
        let transformer_endpoint = transformer_endpoint.filter(|_| weights.transformer > 0.0);
        HybridScorer {
            weights,
            wn,
            transformer_endpoint,
        }
    }

    pub fn weights(&self) -> ScorerWeights {
        self.weights
    }

    /// Ensemble scores, parallel to `candidates`, each in [0, 1].
    pub async fn score_candidates(&self, context: &str, candidates: &[CandidateSense]) -> Vec<f32> {
        if candidates.is_empty() {
            return Vec::new();
        }

        let transformer = normalize(self.score_with_transformer(context, candidates).await);
        let embedding = normalize(self.score_with_embeddings(context, candidates).await);
        let knowledge = normalize(self.score_with_knowledge(context, candidates));

        transformer
            .iter()
            .zip(&embedding)
            .zip(&knowledge)
            .map(|((t, e), k)| {
                self.weights.transformer * t + self.weights.embedding * e + self.weights.knowledge * k
            })
            .collect()
    }

    /// Remote gloss-context classifier: probability of the "relevant" class
    /// for each `(context, gloss)` pair. Neutral when disabled or failing.
    async fn score_with_transformer(&self, context: &str, candidates: &[CandidateSense]) -> Vec<f32> {
        let neutral = vec![0.5f32; candidates.len()];
        let Some(endpoint) = &self.transformer_endpoint else {
            return neutral;
        };

        let inputs: Vec<Value> = candidates
            .iter()
            .map(|c| json!({ "text": context, "text_pair": c.gloss }))
            .collect();
        let response = HTTP_CLIENT
            .post(endpoint)
            .json(&json!({ "inputs": inputs }))
            .send()
            .await;

        let body: Value = match response {
            Ok(r) if r.status().is_success() => match r.json().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "transformer scorer decode failed");
                    return neutral;
                }
            },
            Ok(r) => {
                tracing::debug!(status = %r.status(), "transformer scorer rejected request");
                return neutral;
            }
            Err(e) => {
                tracing::debug!(error = %e, "transformer scorer unreachable");
                return neutral;
            }
        };

        let Some(rows) = body.as_array() else {
            return neutral;
        };
        if rows.len() != candidates.len() {
            return neutral;
        }
        rows.iter()
            .map(|row| relevant_probability(row).unwrap_or(0.5))
            .collect()
    }

    /// Embedding cosine between context and each gloss, clamped at 0.
    async fn score_with_embeddings(&self, context: &str, candidates: &[CandidateSense]) -> Vec<f32> {
        let context_emb = match embedder::shared().encode(context).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "embedding scorer failed on context");
                return vec![0.5; candidates.len()];
            }
        };

        let glosses: Vec<&str> = candidates.iter().map(|c| c.gloss.as_str()).collect();
        let gloss_embs = match embedder::shared().encode_batch(&glosses).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "embedding scorer failed on glosses");
                return vec![0.5; candidates.len()];
            }
        };

        gloss_embs
            .iter()
            .map(|g| cosine_similarity(&context_emb, g).max(0.0))
            .collect()
    }

    /// Max WordNet path similarity between each WordNet candidate and the
    /// synsets of the context's content words (length > 3, first five).
    fn score_with_knowledge(&self, context: &str, candidates: &[CandidateSense]) -> Vec<f32> {
        if !self.wn.is_available() {
            return vec![0.0; candidates.len()];
        }

        let mut context_synsets: Vec<&Synset> = Vec::new();
        for token in context
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .filter(|t| t.len() > 3)
            .take(5)
        {
            context_synsets.extend(self.wn.synsets(&token).into_iter().take(3));
        }
        if context_synsets.is_empty() {
            return vec![0.0; candidates.len()];
        }

        candidates
            .iter()
            .map(|candidate| {
                if candidate.source != SourceTag::Wordnet {
                    return 0.0;
                }
                let Some(synset) = self.wn.synset_by_id(&candidate.source_id) else {
                    return 0.0;
                };
                context_synsets
                    .iter()
                    .filter_map(|ctx| self.wn.path_similarity(synset, ctx))
                    .fold(0.0f32, f32::max)
            })
            .collect()
    }
}

/// Probability of the positive class from an HF text-classification row:
/// either `[{label, score}, ...]` or a bare `{label, score}`.
fn relevant_probability(row: &Value) -> Option<f32> {
    let entries: Vec<&Value> = match row {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![row],
        _ => return None,
    };
    for entry in &entries {
        let label = entry["label"].as_str().unwrap_or("");
        if label.eq_ignore_ascii_case("relevant") || label == "LABEL_1" || label == "1" {
            return entry["score"].as_f64().map(|s| s as f32);
        }
    }
    // Single-score binary output: take it as the positive probability.
    entries.first().and_then(|e| e["score"].as_f64()).map(|s| s as f32)
}

/// Min-max normalization to [0, 1]; a flat distribution maps to 0.5s so it
/// contributes no ordering signal.
fn normalize(scores: Vec<f32>) -> Vec<f32> {
    if scores.is_empty() {
        return scores;
    }
    let min = scores.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = scores.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    if (max - min).abs() < f32::EPSILON {
        return vec![0.5; scores.len()];
    }
    scores.into_iter().map(|s| (s - min) / (max - min)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn candidate(source: SourceTag, id: &str, gloss: &str) -> CandidateSense {
        CandidateSense {
            source,
            source_id: id.into(),
            label: "x".into(),
            gloss: gloss.into(),
            all_forms: vec![],
            hypernyms: vec![],
            score: 0.0,
        }
    }

    fn mini_wordnet() -> Arc<WordNet> {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("data.noun"),
            "\
00000002 03 n 01 animal 0 002 ~ 00000004 n 0000 ~ 00000006 n 0000 | a living organism\n\
00000004 03 n 01 dog 0 001 @ 00000002 n 0000 | a domesticated canine\n\
00000006 03 n 01 rock 0 000 | a hard mineral mass\n",
        )
        .expect("data");
        std::fs::write(
            dir.path().join("index.noun"),
            "animal n 1 1 ~ 1 0 00000002\ndog n 1 1 @ 1 0 00000004\nrock n 1 0 1 0 00000006\n",
        )
        .expect("index");
        Arc::new(WordNet::load(dir.path()).expect("load"))
    }

    #[test]
    fn weights_renormalize() {
        let w = ScorerWeights::new(1.0, 1.0, 2.0);
        assert!((w.transformer - 0.25).abs() < 1e-6);
        assert!((w.embedding - 0.25).abs() < 1e-6);
        assert!((w.knowledge - 0.5).abs() < 1e-6);
    }

    #[test]
    fn weight_parsing_tolerates_garbage() {
        assert_eq!(ScorerWeights::parse("0.0,0.7,0.3"), ScorerWeights::default());
        assert_eq!(ScorerWeights::parse("nonsense"), ScorerWeights::default());
        assert_eq!(ScorerWeights::parse("0,0,0"), ScorerWeights::default());
        let custom = ScorerWeights::parse("0.5,0.35,0.15");
        assert!((custom.transformer - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normalize_flattens_uniform_scores() {
        assert_eq!(normalize(vec![0.4, 0.4, 0.4]), vec![0.5, 0.5, 0.5]);
        assert_eq!(normalize(vec![0.0, 1.0]), vec![0.0, 1.0]);
        assert_eq!(normalize(vec![2.0, 4.0, 3.0]), vec![0.0, 1.0, 0.5]);
    }

    #[tokio::test]
    async fn ensemble_prefers_gloss_matching_context() {
        let scorer = HybridScorer::new(ScorerWeights::default(), mini_wordnet(), None);
        let candidates = vec![
            candidate(
                SourceTag::Wordnet,
                "00000004-n",
                "a domesticated animal kept as a pet dog",
            ),
            candidate(SourceTag::Wordnet, "00000006-n", "a hard mineral mass of stone"),
        ];
        // Context shares vocabulary (and WordNet neighborhood) with the
        // first gloss.
        let scores = scorer
            .score_candidates("pet animal dog breed", &candidates)
            .await;
        assert_eq!(scores.len(), 2);
        assert!(
            scores[0] > scores[1],
            "expected dog sense to win: {scores:?}"
        );
    }

    #[tokio::test]
    async fn empty_candidates_score_empty() {
        let scorer = HybridScorer::new(ScorerWeights::default(), mini_wordnet(), None);
        assert!(scorer.score_candidates("anything", &[]).await.is_empty());
    }

    #[tokio::test]
    async fn non_wordnet_candidates_get_zero_knowledge_score() {
        let scorer = HybridScorer::new(
            ScorerWeights::new(0.0, 0.0, 1.0),
            mini_wordnet(),
            None,
        );
        let candidates = vec![
            candidate(SourceTag::Wordnet, "00000004-n", "a domesticated canine"),
            candidate(SourceTag::Datamuse, "datamuse:dog", "synonyms: hound"),
        ];
        let scores = scorer.score_candidates("animal dogs", &candidates).await;
        assert!(scores[0] > scores[1]);
    }
}
