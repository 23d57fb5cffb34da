//! Phase 1: gather candidates from every configured source, score them
//! against context, pick the winner.
//!
//! There is deliberately no short-circuiting: all sources contribute
//! candidates before scoring, so the best sense wins regardless of which
//! knowledge base produced it. One adapter failing (or being unconfigured)
//! never blocks the others.

use std::sync::Arc;

use embedder::cosine_similarity;
use lexsource::{
    BabelNetClient, CandidateSense, DatamuseClient, LexicalSource, MerriamWebsterClient,
    SourceTag, WikidataClient, WordNetSource, WordsApiClient,
};
use scoring::{argmax, margin, HybridScorer, LlmFallback};

/// Minimum cosine similarity for a candidate to be accepted in legacy
/// (embedding-only) scoring mode.
const LEGACY_THRESHOLD: f32 = 0.15;

/// The winning sense after phase 1.
#[derive(Debug, Clone, PartialEq)]
pub struct DisambiguatedSense {
    pub resolved_form: String,
    /// Provenance chain; starts as the source tag, enrichment appends
    /// suffixes like `"+wikidata"`.
    pub source: String,
    pub source_tag: SourceTag,
    pub source_id: String,
    pub all_forms: Vec<String>,
    pub hypernyms: Vec<String>,
    pub score: f32,
}

impl DisambiguatedSense {
    fn from_candidate(candidate: CandidateSense) -> Self {
        DisambiguatedSense {
            resolved_form: candidate.label,
            source: candidate.source.as_str().to_string(),
            source_tag: candidate.source,
            source_id: candidate.source_id,
            all_forms: candidate.all_forms,
            hypernyms: candidate.hypernyms,
            score: candidate.score,
        }
    }
}

/// The set of sources the engine wired up. Only WordNet is mandatory.
pub struct SourceSet {
    pub wordnet: Arc<WordNetSource>,
    pub wordsapi: Option<Arc<WordsApiClient>>,
    pub datamuse: Option<Arc<DatamuseClient>>,
    pub wikidata: Option<Arc<WikidataClient>>,
    pub babelnet: Option<Arc<BabelNetClient>>,
    pub merriam: Option<Arc<MerriamWebsterClient>>,
}

impl SourceSet {
    /// WordNet only; every network source absent.
    pub fn local_only(wordnet: Arc<WordNetSource>) -> Self {
        SourceSet {
            wordnet,
            wordsapi: None,
            datamuse: None,
            wikidata: None,
            babelnet: None,
            merriam: None,
        }
    }
}

pub struct Disambiguator {
    sources: SourceSet,
    scorer: HybridScorer,
    fallback: LlmFallback,
    use_hybrid: bool,
    margin_threshold: f32,
}

impl Disambiguator {
    pub fn new(
        sources: SourceSet,
        scorer: HybridScorer,
        fallback: LlmFallback,
        use_hybrid: bool,
        margin_threshold: f32,
    ) -> Self {
        Disambiguator {
            sources,
            scorer,
            fallback,
            use_hybrid,
            margin_threshold,
        }
    }

    /// Gather from all sources, score against `context`, return the winner.
    pub async fn disambiguate(
        &self,
        term: &str,
        context: Option<&str>,
    ) -> Option<DisambiguatedSense> {
        let mut candidates = self.gather_all(term, context).await;
        if candidates.is_empty() {
            return None;
        }

        let context = context.filter(|c| !c.trim().is_empty());
        let best_idx = match context {
            None => first_preferring_wordnet(&candidates),
            Some(ctx) if self.use_hybrid => {
                let scores = self.scorer.score_candidates(ctx, &candidates).await;
                for (candidate, score) in candidates.iter_mut().zip(&scores) {
                    candidate.score = *score;
                }
                if margin(&scores) < self.margin_threshold && self.fallback.is_available() {
                    tracing::debug!(term, "low ensemble margin; consulting llm fallback");
                    self.fallback.disambiguate(ctx, term, &candidates, &scores).await
                } else {
                    argmax(&scores)
                }
            }
            Some(ctx) => self.score_legacy(ctx, term, &mut candidates).await,
        };

        Some(DisambiguatedSense::from_candidate(
            candidates.swap_remove(best_idx),
        ))
    }

    /// Gathering policy: WordNet always; WordsAPI, Datamuse, and Wikidata
    /// only in hybrid mode; BabelNet whenever configured; Merriam-Webster
    /// only when WordNet came up empty.
    async fn gather_all(&self, term: &str, context: Option<&str>) -> Vec<CandidateSense> {
        let mut candidates = self.sources.wordnet.gather(term, context).await;
        let wordnet_empty = candidates.is_empty();

        if self.use_hybrid {
            if let Some(wordsapi) = &self.sources.wordsapi {
                candidates.extend(wordsapi.gather(term, context).await);
            }
            if let Some(datamuse) = &self.sources.datamuse {
                candidates.extend(datamuse.gather(term, context).await);
            }
            if let Some(wikidata) = &self.sources.wikidata {
                candidates.extend(wikidata.gather(term, context).await);
            }
        }
        if let Some(babelnet) = &self.sources.babelnet {
            candidates.extend(babelnet.gather(term, context).await);
        }
        if wordnet_empty {
            if let Some(merriam) = &self.sources.merriam {
                candidates.extend(merriam.gather(term, context).await);
            }
        }
        candidates
    }

    /// Legacy scoring: plain embedding cosine between context and gloss,
    /// with a small exact-label bonus and an acceptance threshold.
    async fn score_legacy(
        &self,
        context: &str,
        term: &str,
        candidates: &mut [CandidateSense],
    ) -> usize {
        let context_emb = match embedder::shared().encode(context).await {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "legacy scoring failed; taking first candidate");
                return first_preferring_wordnet(candidates);
            }
        };

        let term_lower = term.to_lowercase();
        for candidate in candidates.iter_mut() {
            candidate.score = if candidate.gloss.is_empty() {
                0.0
            } else {
                match embedder::shared().encode(&candidate.gloss).await {
                    Ok(gloss_emb) => {
                        let mut score = cosine_similarity(&context_emb, &gloss_emb).max(0.0);
                        if candidate.label == term_lower {
                            score += 0.1;
                        }
                        score
                    }
                    Err(_) => 0.0,
                }
            };
        }

        let mut best: Option<usize> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.score >= LEGACY_THRESHOLD
                && best.map_or(true, |b| candidate.score > candidates[b].score)
            {
                best = Some(i);
            }
        }
        best.unwrap_or_else(|| first_preferring_wordnet(candidates))
    }
}

/// First WordNet candidate, else the first candidate overall.
fn first_preferring_wordnet(candidates: &[CandidateSense]) -> usize {
    candidates
        .iter()
        .position(|c| c.source == SourceTag::Wordnet)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoring::{LlmFallbackConfig, ScorerWeights};
    use tempfile::tempdir;
    use wordnet::WordNet;

    fn fixture_sources() -> SourceSet {
        let dir = tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("data.noun"),
            "\
00000002 03 n 01 animal 0 001 ~ 00000004 n 0000 | a living organism\n\
00000004 03 n 02 dog 0 hound 0 001 @ 00000002 n 0000 | a domesticated animal kept as a pet\n\
00000007 03 n 02 car 0 automobile 0 000 | a motor vehicle with four wheels\n",
        )
        .expect("data");
        std::fs::write(
            dir.path().join("index.noun"),
            "animal n 1 1 ~ 1 0 00000002\ncar n 1 0 1 0 00000007\nautomobile n 1 0 1 0 00000007\ndog n 1 1 @ 1 0 00000004\nhound n 1 1 @ 1 0 00000004\n",
        )
        .expect("index");
        let wn = Arc::new(WordNet::load(dir.path()).expect("load"));
        SourceSet::local_only(Arc::new(WordNetSource::new(wn)))
    }

    fn disambiguator(sources: SourceSet) -> Disambiguator {
        let wn = sources.wordnet.database().clone();
        Disambiguator::new(
            sources,
            HybridScorer::new(ScorerWeights::default(), wn, None),
            LlmFallback::new(LlmFallbackConfig {
                endpoint: None,
                ..Default::default()
            }),
            true,
            0.10,
        )
    }

    #[tokio::test]
    async fn no_candidates_yields_none() {
        let d = disambiguator(fixture_sources());
        assert!(d.disambiguate("xyzzy", None).await.is_none());
    }

    #[tokio::test]
    async fn without_context_first_wordnet_candidate_wins_unscored() {
        let d = disambiguator(fixture_sources());
        let sense = d.disambiguate("dog", None).await.expect("sense");
        assert_eq!(sense.source_tag, SourceTag::Wordnet);
        assert_eq!(sense.source_id, "00000004-n");
        assert_eq!(sense.score, 0.0);
        assert!(sense.all_forms.contains(&"hound".to_string()));
    }

    #[tokio::test]
    async fn with_context_output_is_stable_across_calls() {
        let d = disambiguator(fixture_sources());
        let a = d.disambiguate("dog", Some("pet animal")).await.expect("sense");
        let b = d.disambiguate("dog", Some("pet animal")).await.expect("sense");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn hypernyms_travel_with_the_winner() {
        let d = disambiguator(fixture_sources());
        let sense = d.disambiguate("dog", Some("pet")).await.expect("sense");
        assert_eq!(sense.hypernyms, vec!["animal".to_string()]);
    }
}
