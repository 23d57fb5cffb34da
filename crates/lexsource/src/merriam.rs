//! Merriam-Webster Collegiate adapter. Optional; pulled in for coverage on
//! terms WordNet has not caught up with (recent tech vocabulary, slang).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::http::get_json;
use crate::quota::DailyQuota;
use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

const API_TIMEOUT: Duration = Duration::from_secs(5);
const DAILY_LIMIT: u32 = 1000;

pub struct MerriamWebsterClient {
    api_key: String,
    base_url: String,
    cache: TtlCache<Value>,
    quota: DailyQuota,
}

impl MerriamWebsterClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(
            api_key,
            "https://www.dictionaryapi.com/api/v3/references/collegiate/json",
        )
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        MerriamWebsterClient {
            api_key: api_key.into(),
            base_url: base_url.into(),
            cache: TtlCache::hourly(),
            quota: DailyQuota::new(DAILY_LIMIT),
        }
    }

    async fn lookup(&self, term: &str) -> Vec<Value> {
        let cache_key = format!("lookup:{term}");
        if let Some(body) = self.cache.get(&cache_key) {
            return body.as_array().cloned().unwrap_or_default();
        }
        if self.api_key.is_empty() {
            return Vec::new();
        }
        if !self.quota.try_acquire() {
            tracing::info!("merriam-webster daily quota exhausted; degrading to empty");
            return Vec::new();
        }

        let url = format!("{}/{}", self.base_url, term);
        match get_json(&url, &[("key", self.api_key.as_str())], &[], API_TIMEOUT).await {
            Ok(body) => {
                self.cache.put(cache_key, body.clone());
                body.as_array().cloned().unwrap_or_default()
            }
            Err(e) => {
                tracing::debug!(term, error = %e, "merriam-webster request failed");
                Vec::new()
            }
        }
    }

    /// First real entry. The API returns bare suggestion strings when the
    /// term is unknown; those are not entries.
    fn first_entry(results: &[Value]) -> Option<&Value> {
        results.iter().find(|entry| entry.is_object())
    }

    fn entry_synonyms(entry: &Value) -> Vec<String> {
        // meta.syns is a list of synonym groups.
        entry["meta"]["syns"]
            .as_array()
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(Value::as_array)
                    .flatten()
                    .filter_map(|s| s.as_str().map(|s| s.to_lowercase()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LexicalSource for MerriamWebsterClient {
    fn tag(&self) -> SourceTag {
        SourceTag::MerriamWebster
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() && self.quota.remaining() > 0
    }

    async fn gather(&self, term: &str, _context: Option<&str>) -> Vec<CandidateSense> {
        if !self.is_available() {
            return Vec::new();
        }
        let results = self.lookup(term).await;
        let Some(entry) = Self::first_entry(&results) else {
            return Vec::new();
        };

        let term_lower = term.to_lowercase();
        let synonyms = Self::entry_synonyms(entry);
        let shortdefs: Vec<String> = entry["shortdef"]
            .as_array()
            .map(|defs| {
                defs.iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        shortdefs
            .into_iter()
            .take(3)
            .enumerate()
            .map(|(i, definition)| {
                let mut all_forms = vec![term_lower.clone()];
                all_forms.extend(synonyms.iter().cloned());
                CandidateSense {
                    source: SourceTag::MerriamWebster,
                    source_id: format!("mw:{term_lower}:{i}"),
                    label: term_lower.clone(),
                    gloss: definition,
                    all_forms: dedup_preserving(all_forms),
                    hypernyms: Vec::new(),
                    score: 0.0,
                }
            })
            .collect()
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
        let results = self.lookup(term).await;
        Self::first_entry(&results)
            .map(|entry| {
                let mut synonyms = Self::entry_synonyms(entry);
                synonyms.sort();
                synonyms.dedup();
                synonyms
            })
            .unwrap_or_default()
    }

    async fn get_hypernyms(&self, _term: &str, _depth: usize) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suggestion_strings_are_not_entries() {
        let results = vec![json!("laptop"), json!("lapel")];
        assert!(MerriamWebsterClient::first_entry(&results).is_none());
    }

    #[test]
    fn entry_synonyms_flatten_groups() {
        let entry = json!({"meta": {"syns": [["Notebook", "portable computer"], ["ultrabook"]]}});
        let synonyms = MerriamWebsterClient::entry_synonyms(&entry);
        assert_eq!(synonyms, vec!["notebook", "portable computer", "ultrabook"]);
    }

    #[tokio::test]
    async fn unconfigured_client_is_silent() {
        let client = MerriamWebsterClient::new("");
        assert!(!client.is_available());
        assert!(client.gather("laptop", None).await.is_empty());
    }
}
