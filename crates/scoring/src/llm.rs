//! LLM fallback for low-confidence disambiguation.
//!
//! Fires only when the ensemble margin (top minus second-best) is below the
//! configured threshold — it is a margin breaker, not a ranker. Inference
//! is deterministic: temperature 0, no sampling, and a single-digit answer
//! format so parsing cannot wander.

use std::time::Duration;

use lexsource::CandidateSense;
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::argmax;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .gzip(true)
        .build()
        .expect("failed to build llm fallback HTTP client")
});

/// Margin between the top and second-best score. With fewer than two
/// scores the margin is infinite — nothing to break a tie between.
pub fn margin(scores: &[f32]) -> f32 {
    if scores.len() < 2 {
        return f32::INFINITY;
    }
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sorted[0] - sorted[1]
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmFallbackConfig {
    pub enabled: bool,
    /// OpenAI-compatible completion endpoint of the local model server.
    pub endpoint: Option<String>,
    pub model: String,
    /// Candidates presented to the model.
    pub top_k: usize,
}

impl Default for LlmFallbackConfig {
    fn default() -> Self {
        LlmFallbackConfig {
            enabled: true,
            endpoint: None,
            model: "llama-3.2-1b-instruct".into(),
            top_k: 3,
        }
    }
}

pub struct LlmFallback {
    cfg: LlmFallbackConfig,
}

impl LlmFallback {
    pub fn new(cfg: LlmFallbackConfig) -> Self {
        LlmFallback { cfg }
    }

    /// Available only when enabled and an endpoint is configured. Callers
    /// revert to the top ensemble index otherwise.
    pub fn is_available(&self) -> bool {
        self.cfg.enabled && self.cfg.endpoint.is_some()
    }

    /// Pick the best sense among the top-K ensemble candidates. Always
    /// returns an index into `candidates`; every failure path degrades to
    /// the ensemble argmax.
    pub async fn disambiguate(
        &self,
        query: &str,
        term: &str,
        candidates: &[CandidateSense],
        scores: &[f32],
    ) -> usize {
        let ensemble_best = argmax(scores);
        let Some(endpoint) = self.cfg.endpoint.as_ref().filter(|_| self.cfg.enabled) else {
            return ensemble_best;
        };
        if candidates.is_empty() || candidates.len() != scores.len() {
            return ensemble_best;
        }

        // Top-K candidate indices by ensemble score, descending.
        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|a, b| {
            scores[*b]
                .partial_cmp(&scores[*a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top: Vec<usize> = order.into_iter().take(self.cfg.top_k.max(1)).collect();

        let prompt = format_prompt(query, term, &top, candidates);
        let body = json!({
            "model": self.cfg.model,
            "prompt": prompt,
            "max_tokens": 10,
            "temperature": 0.0,
        });

        let response = HTTP_CLIENT.post(endpoint).json(&body).send().await;
        let generated = match response {
            Ok(r) if r.status().is_success() => match r.json::<Value>().await {
                Ok(v) => v["choices"][0]["text"].as_str().unwrap_or("").to_string(),
                Err(e) => {
                    tracing::debug!(error = %e, "llm fallback decode failed");
                    return ensemble_best;
                }
            },
            Ok(r) => {
                tracing::debug!(status = %r.status(), "llm fallback rejected request");
                return ensemble_best;
            }
            Err(e) => {
                tracing::debug!(error = %e, "llm fallback unreachable");
                return ensemble_best;
            }
        };

        match parse_choice(&generated, top.len()) {
            Some(choice) => {
                let selected = top[choice];
                tracing::debug!(
                    term,
                    choice = choice + 1,
                    source = %candidates[selected].source,
                    "llm fallback selected candidate"
                );
                selected
            }
            None => {
                tracing::debug!(term, "llm fallback answer unparseable; using ensemble top");
                top[0]
            }
        }
    }
}

/// Numbered-glosses multiple-choice prompt.
fn format_prompt(query: &str, term: &str, top: &[usize], candidates: &[CandidateSense]) -> String {
    let glosses = top
        .iter()
        .enumerate()
        .map(|(i, &idx)| format!("{}. {}", i + 1, candidates[idx].gloss))
        .collect::<Vec<_>>()
        .join("\n");
    let upper = top.len();
    format!(
        "Given the sentence: \"{query}\"\n\nWhich definition of \"{term}\" fits best?\n\n{glosses}\n\nReply with only the number (1 to {upper}):"
    )
}

/// First digit in `[1, k]` anywhere in the generation, 0-based.
fn parse_choice(output: &str, k: usize) -> Option<usize> {
    for c in output.chars() {
        if let Some(digit) = c.to_digit(10) {
            let digit = digit as usize;
            if (1..=k).contains(&digit) {
                return Some(digit - 1);
            }
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexsource::SourceTag;

    fn candidates(n: usize) -> Vec<CandidateSense> {
        (0..n)
            .map(|i| CandidateSense {
                source: SourceTag::Wordnet,
                source_id: format!("0000000{i}-n"),
                label: format!("sense{i}"),
                gloss: format!("gloss number {i}"),
                all_forms: vec![],
                hypernyms: vec![],
                score: 0.0,
            })
            .collect()
    }

    #[test]
    fn margin_of_sorted_and_unsorted_scores() {
        assert!((margin(&[0.9, 0.7, 0.1]) - 0.2).abs() < 1e-6);
        assert!((margin(&[0.1, 0.9, 0.7]) - 0.2).abs() < 1e-6);
        assert_eq!(margin(&[0.4]), f32::INFINITY);
        assert_eq!(margin(&[]), f32::INFINITY);
    }

    #[test]
    fn parse_choice_accepts_digits_in_range() {
        assert_eq!(parse_choice("2", 3), Some(1));
        assert_eq!(parse_choice("The answer is 3", 3), Some(2));
        assert_eq!(parse_choice("7", 3), None);
        assert_eq!(parse_choice("none of these", 3), None);
        assert_eq!(parse_choice("", 3), None);
    }

    #[test]
    fn prompt_numbers_the_top_candidates() {
        let cands = candidates(3);
        let prompt = format_prompt("buying a used car", "used", &[2, 0], &cands);
        assert!(prompt.contains("1. gloss number 2"));
        assert!(prompt.contains("2. gloss number 0"));
        assert!(prompt.contains("(1 to 2)"));
    }

    #[tokio::test]
    async fn unavailable_fallback_returns_ensemble_argmax() {
        let fallback = LlmFallback::new(LlmFallbackConfig {
            endpoint: None,
            ..Default::default()
        });
        assert!(!fallback.is_available());
        let cands = candidates(3);
        let idx = fallback
            .disambiguate("ctx", "term", &cands, &[0.1, 0.8, 0.3])
            .await;
        assert_eq!(idx, 1);
    }

    #[tokio::test]
    async fn disabled_fallback_ignores_endpoint() {
        let fallback = LlmFallback::new(LlmFallbackConfig {
            enabled: false,
            endpoint: Some("http://localhost:1/v1/completions".into()),
            ..Default::default()
        });
        assert!(!fallback.is_available());
        let cands = candidates(2);
        let idx = fallback.disambiguate("ctx", "term", &cands, &[0.9, 0.2]).await;
        assert_eq!(idx, 0);
    }
}
