//! BabelNet v9 adapter. Requires an API key; every operation is capped by
//! the free-tier daily quota and synset fetches are limited to the top few
//! ids per term to conserve it.

use std::time::Duration;

use async_trait::async_trait;
use embedder::cosine_similarity;
use serde_json::Value;

use crate::cache::TtlCache;
use crate::http::get_json;
use crate::quota::DailyQuota;
use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

const API_TIMEOUT: Duration = Duration::from_secs(5);
const DAILY_LIMIT: u32 = 1000;
/// Synsets fetched per term; each costs one quota slot.
const SYNSET_CAP: usize = 5;

pub struct BabelNetClient {
    api_key: String,
    base_url: String,
    cache: TtlCache<Value>,
    quota: DailyQuota,
}

impl BabelNetClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, "https://babelnet.io/v9")
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        BabelNetClient {
            api_key: api_key.into(),
            base_url: base_url.into(),
            cache: TtlCache::hourly(),
            quota: DailyQuota::new(DAILY_LIMIT),
        }
    }

    async fn fetch(&self, path: &str, query: &[(&str, &str)], cache_key: String) -> Option<Value> {
        if let Some(value) = self.cache.get(&cache_key) {
            return Some(value);
        }
        if self.api_key.is_empty() {
            return None;
        }
        if !self.quota.try_acquire() {
            tracing::info!(path, "babelnet daily quota exhausted; degrading to empty");
            return None;
        }

        let url = format!("{}/{}", self.base_url, path);
        let mut full_query: Vec<(&str, &str)> = query.to_vec();
        full_query.push(("key", self.api_key.as_str()));

        match get_json(&url, &full_query, &[], API_TIMEOUT).await {
            Ok(body) => {
                self.cache.put(cache_key, body.clone());
                Some(body)
            }
            Err(e) => {
                tracing::debug!(path, error = %e, "babelnet request failed");
                None
            }
        }
    }

    pub async fn get_senses(&self, term: &str) -> Vec<Value> {
        self.fetch(
            "getSenses",
            &[("lemma", term), ("searchLang", "EN")],
            format!("senses:{term}"),
        )
        .await
        .and_then(|body| body.as_array().cloned())
        .unwrap_or_default()
    }

    pub async fn get_synset(&self, synset_id: &str) -> Option<Value> {
        self.fetch(
            "getSynset",
            &[("id", synset_id), ("targetLang", "EN")],
            format!("synset:{synset_id}"),
        )
        .await
    }

    /// Unique synset ids from the sense list, first-seen order.
    fn synset_ids(senses: &[Value]) -> Vec<String> {
        let mut ids = Vec::new();
        for sense in senses {
            let props = sense.get("properties").unwrap_or(sense);
            if let Some(id) = props["synsetID"]["id"].as_str() {
                if !ids.contains(&id.to_string()) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    fn parse_synset(term: &str, synset_id: &str, synset: &Value) -> CandidateSense {
        let mut gloss = String::new();
        if let Some(glosses) = synset["glosses"].as_array() {
            for g in glosses {
                if g["language"].as_str() == Some("EN") {
                    if let Some(text) = g["gloss"].as_str() {
                        if !text.is_empty() {
                            gloss = text.to_string();
                            break;
                        }
                    }
                }
            }
        }

        let mut synonyms: Vec<String> = Vec::new();
        let mut key_lemma: Option<String> = None;
        if let Some(senses) = synset["senses"].as_array() {
            for sense in senses {
                let props = sense.get("properties").unwrap_or(sense);
                if props["language"].as_str() != Some("EN") {
                    continue;
                }
                let lemma = props["simpleLemma"]
                    .as_str()
                    .or_else(|| props["fullLemma"].as_str())
                    .unwrap_or("");
                if lemma.is_empty() {
                    continue;
                }
                let lemma = lemma.replace('_', " ").to_lowercase();
                if props["keySense"].as_bool() == Some(true) && key_lemma.is_none() {
                    key_lemma = Some(lemma.clone());
                }
                synonyms.push(lemma);
            }
        }

        let label = key_lemma
            .or_else(|| synonyms.first().cloned())
            .unwrap_or_else(|| term.to_lowercase());
        let mut all_forms = vec![term.to_lowercase()];
        all_forms.extend(synonyms);

        CandidateSense {
            source: SourceTag::Babelnet,
            source_id: synset_id.to_string(),
            label,
            gloss,
            all_forms: dedup_preserving(all_forms),
            hypernyms: Vec::new(),
            score: 0.0,
        }
    }

    /// Wikidata QID carried by a WIKIDATA-source sense, if any.
    fn linked_wikidata(synset: &Value) -> Option<String> {
        let senses = synset["senses"].as_array()?;
        for sense in senses {
            let props = sense.get("properties").unwrap_or(sense);
            if props["source"].as_str() != Some("WIKIDATA") {
                continue;
            }
            if let Some(key) = props["sensekey"].as_str() {
                if key.starts_with('Q') || key.starts_with('q') {
                    return Some(key.to_lowercase());
                }
            }
        }
        None
    }
}

#[async_trait]
impl LexicalSource for BabelNetClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Babelnet
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty() && self.quota.remaining() > 0
    }

    async fn gather(&self, term: &str, _context: Option<&str>) -> Vec<CandidateSense> {
        if !self.is_available() {
            return Vec::new();
        }
        let senses = self.get_senses(term).await;
        let mut candidates = Vec::new();
        for synset_id in Self::synset_ids(&senses).into_iter().take(SYNSET_CAP) {
            if let Some(synset) = self.get_synset(&synset_id).await {
                candidates.push(Self::parse_synset(term, &synset_id, &synset));
            }
        }
        candidates
    }

    async fn get_canonical(&self, term: &str, context: Option<&str>) -> Option<CanonicalEntry> {
        let senses = self.get_senses(term).await;
        let ids = Self::synset_ids(&senses);
        if ids.is_empty() {
            return None;
        }

        // Gloss-vs-context disambiguation across the capped synset list.
        // Without context the first synset wins; the API's own ordering is
        // frequency-ranked.
        let mut best: Option<(CandidateSense, Option<String>)> = None;
        let context_emb = match context.filter(|c| !c.is_empty()) {
            Some(ctx) => embedder::shared().encode(ctx).await.ok(),
            None => None,
        };
        let mut best_score = -1.0f32;

        for synset_id in ids.into_iter().take(SYNSET_CAP) {
            let Some(synset) = self.get_synset(&synset_id).await else {
                continue;
            };
            let candidate = Self::parse_synset(term, &synset_id, &synset);
            let linked = Self::linked_wikidata(&synset);

            let score = match (&context_emb, candidate.gloss.is_empty()) {
                (Some(ctx), false) => match embedder::shared().encode(&candidate.gloss).await {
                    Ok(gloss_emb) => cosine_similarity(ctx, &gloss_emb),
                    Err(_) => 0.0,
                },
                _ => 0.0,
            };
            if best.is_none() || score > best_score {
                best_score = score;
                best = Some((candidate, linked));
            }
            if context_emb.is_none() {
                break;
            }
        }

        let (candidate, linked_wikidata) = best?;
        Some(CanonicalEntry {
            canonical_id: candidate.source_id,
            canonical_label: candidate.label,
            all_forms: candidate.all_forms,
            hypernyms: candidate.hypernyms,
            gloss: candidate.gloss,
            linked_wikidata,
            linked_babelnet: None,
        })
    }

    async fn get_synonyms(&self, term: &str) -> Vec<String> {
        let senses = self.get_senses(term).await;
        let needle = term.trim().to_lowercase();
        let mut synonyms = Vec::new();
        for sense in &senses {
            let props = sense.get("properties").unwrap_or(sense);
            if props["language"].as_str() != Some("EN") {
                continue;
            }
            if let Some(lemma) = props["simpleLemma"]
                .as_str()
                .or_else(|| props["fullLemma"].as_str())
            {
                let lemma = lemma.replace('_', " ").to_lowercase();
                if !lemma.is_empty() && lemma != needle {
                    synonyms.push(lemma);
                }
            }
        }
        dedup_preserving(synonyms)
    }

    async fn get_hypernyms(&self, term: &str, _depth: usize) -> Vec<String> {
        let senses = self.get_senses(term).await;
        let Some(first_id) = Self::synset_ids(&senses).into_iter().next() else {
            return Vec::new();
        };

        let Some(edges) = self
            .fetch(
                "getOutgoingEdges",
                &[("id", first_id.as_str())],
                format!("edges:{first_id}"),
            )
            .await
        else {
            return Vec::new();
        };

        let mut labels = Vec::new();
        if let Some(edge_list) = edges.as_array() {
            for edge in edge_list {
                if edge["pointer"]["relationGroup"].as_str() != Some("HYPERNYM") {
                    continue;
                }
                if edge["language"].as_str().unwrap_or("EN") != "EN" {
                    continue;
                }
                let Some(target) = edge["target"].as_str() else {
                    continue;
                };
                // One synset fetch per hypernym edge; cap to protect quota.
                if labels.len() >= 3 {
                    break;
                }
                if let Some(synset) = self.get_synset(target).await {
                    let candidate = Self::parse_synset("", target, &synset);
                    if !candidate.label.is_empty() {
                        labels.push(candidate.label);
                    }
                }
            }
        }
        dedup_preserving(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn synset_ids_deduplicate_in_order() {
        let senses = vec![
            json!({"properties": {"synsetID": {"id": "bn:00015556n"}}}),
            json!({"properties": {"synsetID": {"id": "bn:00015556n"}}}),
            json!({"properties": {"synsetID": {"id": "bn:00020000n"}}}),
        ];
        assert_eq!(
            BabelNetClient::synset_ids(&senses),
            vec!["bn:00015556n".to_string(), "bn:00020000n".to_string()]
        );
    }

    #[test]
    fn parse_synset_prefers_key_sense_lemma() {
        let synset = json!({
            "glosses": [
                {"language": "IT", "gloss": "ignored"},
                {"language": "EN", "gloss": "a motor vehicle"}
            ],
            "senses": [
                {"properties": {"language": "EN", "fullLemma": "Motor_car", "keySense": false}},
                {"properties": {"language": "EN", "simpleLemma": "car", "keySense": true}}
            ]
        });
        let candidate = BabelNetClient::parse_synset("auto", "bn:1", &synset);
        assert_eq!(candidate.label, "car");
        assert_eq!(candidate.gloss, "a motor vehicle");
        assert!(candidate.all_forms.contains(&"motor car".to_string()));
        assert!(candidate.all_forms.contains(&"auto".to_string()));
    }

    #[test]
    fn linked_wikidata_reads_qid_sensekeys() {
        let synset = json!({
            "senses": [
                {"properties": {"language": "EN", "source": "WIKI", "sensekey": "Car"}},
                {"properties": {"language": "EN", "source": "WIKIDATA", "sensekey": "Q1420"}}
            ]
        });
        assert_eq!(
            BabelNetClient::linked_wikidata(&synset),
            Some("q1420".to_string())
        );
    }

    #[tokio::test]
    async fn unconfigured_client_is_silent() {
        let client = BabelNetClient::new("");
        assert!(!client.is_available());
        assert!(client.gather("car", None).await.is_empty());
        assert!(client.get_synonyms("car").await.is_empty());
    }
}
