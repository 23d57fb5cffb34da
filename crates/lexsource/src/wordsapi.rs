//! WordsAPI adapter (via RapidAPI).
//!
//! Its distinguishing feature: definitions arrive grouped by sense with
//! synonyms already partitioned per definition — an implicit disambiguation
//! we preserve by emitting one candidate per definition.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::http::get_json;
use crate::quota::DailyQuota;
use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

const API_TIMEOUT: Duration = Duration::from_secs(5);
/// Free tier allows 2,500/day; stop a little early.
const DAILY_LIMIT: u32 = 2400;
const RAPIDAPI_HOST: &str = "wordsapiv1.p.rapidapi.com";

/// One sense-grouped definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionEntry {
    pub definition: String,
    pub part_of_speech: String,
    pub synonyms: Vec<String>,
    pub type_of: Vec<String>,
    pub has_types: Vec<String>,
}

pub struct WordsApiClient {
    api_key: String,
    base_url: String,
    cache: TtlCache<Vec<DefinitionEntry>>,
    quota: DailyQuota,
}

impl WordsApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, format!("https://{RAPIDAPI_HOST}/words"))
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        WordsApiClient {
            api_key: api_key.into(),
            base_url: base_url.into(),
            cache: TtlCache::hourly(),
            quota: DailyQuota::new(DAILY_LIMIT),
        }
    }

    pub async fn definitions_with_synonyms(&self, term: &str) -> Vec<DefinitionEntry> {
        let cache_key = format!("defs:{term}");
        if let Some(entries) = self.cache.get(&cache_key) {
            return entries;
        }
        if self.api_key.is_empty() {
            return Vec::new();
        }
        if !self.quota.try_acquire() {
            tracing::info!("wordsapi daily quota exhausted; degrading to empty");
            return Vec::new();
        }

        let url = format!("{}/{}", self.base_url, term);
        let headers = [
            ("X-RapidAPI-Key", self.api_key.as_str()),
            ("X-RapidAPI-Host", RAPIDAPI_HOST),
        ];
        let body = match get_json(&url, &[], &headers, API_TIMEOUT).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(term, error = %e, "wordsapi request failed");
                return Vec::new();
            }
        };

        let entries: Vec<DefinitionEntry> = body["results"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .map(|entry| DefinitionEntry {
                        definition: entry["definition"].as_str().unwrap_or("").to_string(),
                        part_of_speech: entry["partOfSpeech"].as_str().unwrap_or("").to_string(),
                        synonyms: lowercase_array(&entry["synonyms"]),
                        type_of: lowercase_array(&entry["typeOf"]),
                        has_types: lowercase_array(&entry["hasTypes"]),
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.cache.put(cache_key, entries.clone());
        entries
    }
}

fn lowercase_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_lowercase()))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LexicalSource for WordsApiClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Wordsapi
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() && self.quota.remaining() > 0
    }

    async fn gather(&self, term: &str, _context: Option<&str>) -> Vec<CandidateSense> {
        if !self.is_available() {
            return Vec::new();
        }
        let term_lower = term.to_lowercase();
        self.definitions_with_synonyms(term)
            .await
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                let mut all_forms = vec![term_lower.clone()];
                all_forms.extend(entry.synonyms.iter().cloned());
                CandidateSense {
                    source: SourceTag::Wordsapi,
                    source_id: format!("wordsapi:{term_lower}:{i}"),
                    label: entry
                        .synonyms
                        .first()
                        .cloned()
                        .unwrap_or_else(|| term_lower.clone()),
                    gloss: entry.definition,
                    all_forms: dedup_preserving(all_forms),
                    hypernyms: entry.type_of,
                    score: 0.0,
                }
            })
            .collect()
    }

    async fn get_canonical(&self, term: &str, _context: Option<&str>) -> Option<CanonicalEntry> {
        let entries = self.definitions_with_synonyms(term).await;
        let first = entries.into_iter().next()?;
        let term_lower = term.to_lowercase();
        let mut all_forms = vec![term_lower.clone()];
        all_forms.extend(first.synonyms.iter().cloned());
        Some(CanonicalEntry {
            canonical_id: format!("wordsapi:{term_lower}:0"),
            canonical_label: first.synonyms.first().cloned().unwrap_or(term_lower),
            all_forms: dedup_preserving(all_forms),
            hypernyms: first.type_of,
            gloss: first.definition,
            linked_wikidata: None,
            linked_babelnet: None,
        })
    }

    async fn get_synonyms(&self, term: &str) -> Vec<String> {
        let mut synonyms: Vec<String> = self
            .definitions_with_synonyms(term)
            .await
            .into_iter()
            .flat_map(|entry| entry.synonyms)
            .collect();
        synonyms.sort();
        synonyms.dedup();
        synonyms
    }

    async fn get_hypernyms(&self, term: &str, _depth: usize) -> Vec<String> {
        dedup_preserving(
            self.definitions_with_synonyms(term)
                .await
                .into_iter()
                .flat_map(|entry| entry.type_of)
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_client_is_silent() {
        let client = WordsApiClient::new("");
        assert!(!client.is_available());
        assert!(client.gather("car", None).await.is_empty());
        assert!(client.get_canonical("car", None).await.is_none());
    }
}
