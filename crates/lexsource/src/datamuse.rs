//! Datamuse adapter. Free, keyless, and without a sense inventory: the
//! synonym cluster itself carries the meaning, so gathering emits a single
//! synthetic candidate whose pseudo-gloss is either a real definition or
//! the synonym list.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::http::get_json;
use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

const API_TIMEOUT: Duration = Duration::from_secs(5);

pub struct DatamuseClient {
    base_url: String,
    cache: TtlCache<Value>,
}

impl Default for DatamuseClient {
    fn default() -> Self {
        Self::new("https://api.datamuse.com/words")
    }
}

impl DatamuseClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        DatamuseClient {
            base_url: base_url.into(),
            cache: TtlCache::hourly(),
        }
    }

    async fn fetch(&self, query: &[(&str, &str)], cache_key: String) -> Vec<Value> {
        if let Some(value) = self.cache.get(&cache_key) {
            return value.as_array().cloned().unwrap_or_default();
        }
        match get_json(&self.base_url, query, &[], API_TIMEOUT).await {
            Ok(body) => {
                self.cache.put(cache_key, body.clone());
                body.as_array().cloned().unwrap_or_default()
            }
            Err(e) => {
                tracing::debug!(error = %e, "datamuse request failed");
                Vec::new()
            }
        }
    }

    /// `rel_syn` synonyms, optionally topic-biased.
    pub async fn synonyms(&self, term: &str, topic: Option<&str>) -> Vec<String> {
        let mut query = vec![("rel_syn", term)];
        if let Some(topic) = topic {
            query.push(("topics", topic));
        }
        let rows = self
            .fetch(&query, format!("syn:{term}:{}", topic.unwrap_or("")))
            .await;
        words_of(&rows)
    }

    /// `ml` means-like results (broader semantic neighbors).
    pub async fn means_like(&self, term: &str, topic: Option<&str>) -> Vec<String> {
        let mut query = vec![("ml", term)];
        if let Some(topic) = topic {
            query.push(("topics", topic));
        }
        let rows = self
            .fetch(&query, format!("ml:{term}:{}", topic.unwrap_or("")))
            .await;
        words_of(&rows)
    }

    /// First dictionary definition via `sp=…&md=d`, when one exists.
    pub async fn definition(&self, term: &str) -> Option<String> {
        let rows = self
            .fetch(
                &[("sp", term), ("md", "d"), ("max", "1")],
                format!("def:{term}"),
            )
            .await;
        for row in rows {
            if let Some(defs) = row["defs"].as_array() {
                if let Some(first) = defs.first().and_then(Value::as_str) {
                    // Datamuse prefixes definitions with a POS tag ("n\t…").
                    let text = first.split_once('\t').map(|(_, d)| d).unwrap_or(first);
                    return Some(text.to_string());
                }
            }
        }
        None
    }
}

fn words_of(rows: &[Value]) -> Vec<String> {
    dedup_preserving(
        rows.iter()
            .filter_map(|row| row["word"].as_str().map(|w| w.to_lowercase()))
            .collect(),
    )
}

#[async_trait]
impl LexicalSource for DatamuseClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Datamuse
    }

    async fn gather(&self, term: &str, context: Option<&str>) -> Vec<CandidateSense> {
        let synonyms = self.synonyms(term, context).await;
        if synonyms.is_empty() {
            return Vec::new();
        }

        let pseudo_gloss = match self.definition(term).await {
            Some(def) => def,
            None => format!(
                "synonyms: {}",
                synonyms
                    .iter()
                    .take(10)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        let term_lower = term.to_lowercase();
        let mut all_forms = vec![term_lower.clone()];
        all_forms.extend(synonyms.iter().cloned());

        vec![CandidateSense {
            source: SourceTag::Datamuse,
            source_id: format!("datamuse:{term_lower}"),
            label: synonyms.first().cloned().unwrap_or(term_lower),
            gloss: pseudo_gloss,
            all_forms: dedup_preserving(all_forms),
            // Datamuse carries no hierarchy.
            hypernyms: Vec::new(),
            score: 0.0,
        }]
    }

    async fn get_canonical(&self, term: &str, context: Option<&str>) -> Option<CanonicalEntry> {
        self.gather(term, context).await.into_iter().next().map(|c| CanonicalEntry {
            canonical_id: c.source_id,
            canonical_label: c.label,
            all_forms: c.all_forms,
            hypernyms: c.hypernyms,
            gloss: c.gloss,
            linked_wikidata: None,
            linked_babelnet: None,
        })
    }

    async fn get_synonyms(&self, term: &str) -> Vec<String> {
        self.synonyms(term, None).await
    }

    async fn get_hypernyms(&self, _term: &str, _depth: usize) -> Vec<String> {
        Vec::new()
    }
}
