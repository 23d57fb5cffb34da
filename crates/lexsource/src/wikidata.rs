//! Wikidata adapter: entity search, alias harvesting, and the P31/P279
//! hierarchy used by both candidate gathering and `is_subclass_of`.

use std::time::Duration;

use async_trait::async_trait;
use embedder::cosine_similarity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::TtlCache;
use crate::http::get_json;
use crate::types::{dedup_preserving, CandidateSense, CanonicalEntry, SourceTag};
use crate::LexicalSource;

const API_TIMEOUT: Duration = Duration::from_secs(5);
const SPARQL_TIMEOUT: Duration = Duration::from_secs(10);

/// One `wbsearchentities` hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub label: String,
    pub description: String,
    pub aliases: Vec<String>,
}

/// Full entity record from `wbgetentities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetails {
    pub id: String,
    pub label: String,
    pub description: String,
    pub aliases: Vec<String>,
}

pub struct WikidataClient {
    api_endpoint: String,
    sparql_endpoint: String,
    search_cache: TtlCache<Vec<SearchHit>>,
    details_cache: TtlCache<Option<EntityDetails>>,
    parents_cache: TtlCache<Vec<(String, String)>>,
    subclass_cache: TtlCache<bool>,
    link_cache: TtlCache<Option<String>>,
}

impl Default for WikidataClient {
    fn default() -> Self {
        Self::new(
            "https://www.wikidata.org/w/api.php",
            "https://query.wikidata.org/sparql",
        )
    }
}

impl WikidataClient {
    pub fn new(api_endpoint: impl Into<String>, sparql_endpoint: impl Into<String>) -> Self {
        WikidataClient {
            api_endpoint: api_endpoint.into(),
            sparql_endpoint: sparql_endpoint.into(),
            search_cache: TtlCache::hourly(),
            details_cache: TtlCache::hourly(),
            parents_cache: TtlCache::hourly(),
            subclass_cache: TtlCache::hourly(),
            link_cache: TtlCache::hourly(),
        }
    }

    pub async fn search_entity(&self, term: &str, limit: usize) -> Vec<SearchHit> {
        let cache_key = format!("search:{term}:{limit}");
        if let Some(hits) = self.search_cache.get(&cache_key) {
            return hits;
        }

        let limit_str = limit.to_string();
        let query = [
            ("action", "wbsearchentities"),
            ("format", "json"),
            ("language", "en"),
            ("type", "item"),
            ("limit", limit_str.as_str()),
            ("search", term),
        ];
        let body = match get_json(&self.api_endpoint, &query, &[], API_TIMEOUT).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(term, error = %e, "wikidata search failed");
                return Vec::new();
            }
        };

        let hits: Vec<SearchHit> = body["search"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|item| {
                        Some(SearchHit {
                            id: item["id"].as_str()?.to_string(),
                            label: item["label"].as_str().unwrap_or("").to_string(),
                            description: item["description"].as_str().unwrap_or("").to_string(),
                            aliases: string_array(&item["aliases"]),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        self.search_cache.put(cache_key, hits.clone());
        hits
    }

    pub async fn get_entity_details(&self, entity_id: &str) -> Option<EntityDetails> {
        let cache_key = format!("entity:{entity_id}");
        if let Some(details) = self.details_cache.get(&cache_key) {
            return details;
        }

        let query = [
            ("action", "wbgetentities"),
            ("format", "json"),
            ("ids", entity_id),
            ("props", "labels|aliases|descriptions"),
            ("languages", "en"),
        ];
        let body = match get_json(&self.api_endpoint, &query, &[], API_TIMEOUT).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(entity_id, error = %e, "wikidata entity fetch failed");
                return None;
            }
        };

        let entity = &body["entities"][entity_id];
        let details = entity.is_object().then(|| EntityDetails {
            id: entity_id.to_string(),
            label: entity["labels"]["en"]["value"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            description: entity["descriptions"]["en"]["value"]
                .as_str()
                .unwrap_or("")
                .to_string(),
            aliases: entity["aliases"]["en"]
                .as_array()
                .map(|entries| {
                    entries
                        .iter()
                        .filter_map(|a| a["value"].as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default(),
        });

        self.details_cache.put(cache_key, details.clone());
        details
    }

    /// Description-vs-context similarity plus a label/alias match bonus and a
    /// small first-hit rank bonus. Returns the best hit, or the first when no
    /// context is supplied.
    async fn search_disambiguated(&self, term: &str, context: Option<&str>) -> Option<SearchHit> {
        let hits = self.search_entity(term, 10).await;
        let first = hits.first().cloned()?;
        let Some(context) = context.filter(|c| !c.is_empty()) else {
            return Some(first);
        };

        let context_emb = match embedder::shared().encode(context).await {
            Ok(v) => v,
            Err(_) => return Some(first),
        };

        let term_lower = term.trim().to_lowercase();
        let mut best = first;
        let mut best_score = -1.0f32;
        for (rank, hit) in hits.iter().enumerate() {
            let desc_score = if hit.description.is_empty() {
                0.0
            } else {
                match embedder::shared().encode(&hit.description).await {
                    Ok(desc_emb) => cosine_similarity(&context_emb, &desc_emb).max(0.0),
                    Err(_) => 0.0,
                }
            };

            let label = hit.label.trim().to_lowercase();
            let aliases: Vec<String> =
                hit.aliases.iter().map(|a| a.trim().to_lowercase()).collect();
            let label_bonus = if label == term_lower {
                0.5
            } else if aliases.contains(&term_lower) {
                0.4
            } else if label.contains(&term_lower) {
                let extra_words = label
                    .split_whitespace()
                    .count()
                    .saturating_sub(term_lower.split_whitespace().count());
                (0.1 - extra_words as f32 * 0.05).max(0.0)
            } else if !label.is_empty() && term_lower.contains(&label) {
                0.1
            } else {
                0.0
            };
            let rank_bonus = if rank == 0 { 0.1 } else { 0.0 };

            let score = desc_score + label_bonus + rank_bonus;
            if score > best_score {
                best_score = score;
                best = hit.clone();
            }
        }
        Some(best)
    }

    /// P31 (instance of) and P279 (subclass of) parents as `(qid, label)`.
    pub async fn parent_classes(&self, entity_id: &str) -> Vec<(String, String)> {
        let cache_key = format!("parents:{entity_id}");
        if let Some(parents) = self.parents_cache.get(&cache_key) {
            return parents;
        }

        let sparql = format!(
            "SELECT DISTINCT ?parent ?parentLabel WHERE {{ \
             {{ wd:{entity_id} wdt:P31 ?parent. }} UNION {{ wd:{entity_id} wdt:P279 ?parent. }} \
             SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }} }} LIMIT 20"
        );
        let parents = self.run_sparql(&sparql, "parent", "parentLabel").await;
        self.parents_cache.put(cache_key, parents.clone());
        parents
    }

    /// BabelNet synset id linked via P2581, if any.
    pub async fn babelnet_link(&self, entity_id: &str) -> Option<String> {
        let cache_key = format!("babelnet_link:{entity_id}");
        if let Some(link) = self.link_cache.get(&cache_key) {
            return link;
        }

        let sparql =
            format!("SELECT ?babelnetId WHERE {{ wd:{entity_id} wdt:P2581 ?babelnetId. }} LIMIT 1");
        let query = [("query", sparql.as_str()), ("format", "json")];
        let link = match get_json(&self.sparql_endpoint, &query, &[], SPARQL_TIMEOUT).await {
            Ok(body) => body["results"]["bindings"]
                .as_array()
                .and_then(|b| b.first())
                .and_then(|row| row["babelnetId"]["value"].as_str())
                .map(str::to_string),
            Err(e) => {
                tracing::debug!(entity_id, error = %e, "wikidata P2581 lookup failed");
                None
            }
        };
        self.link_cache.put(cache_key, link.clone());
        link
    }

    async fn run_sparql(
        &self,
        sparql: &str,
        value_var: &str,
        label_var: &str,
    ) -> Vec<(String, String)> {
        let query = [("query", sparql), ("format", "json")];
        let body = match get_json(&self.sparql_endpoint, &query, &[], SPARQL_TIMEOUT).await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(error = %e, "wikidata sparql query failed");
                return Vec::new();
            }
        };

        body["results"]["bindings"]
            .as_array()
            .map(|bindings| {
                bindings
                    .iter()
                    .filter_map(|row| {
                        let uri = row[value_var]["value"].as_str()?;
                        let qid = uri.rsplit('/').next()?.to_string();
                        let label = row[label_var]["value"].as_str().unwrap_or("").to_string();
                        Some((qid, label))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// BFS over P31/P279 from `child_term`'s top entities, looking for any
    /// entity or label matching `parent_term`. Cached per argument triple.
    pub async fn is_subclass_of(
        &self,
        child_term: &str,
        parent_term: &str,
        max_depth: usize,
    ) -> bool {
        let cache_key = format!("is_subclass:{child_term}:{parent_term}:{max_depth}");
        if let Some(answer) = self.subclass_cache.get(&cache_key) {
            return answer;
        }

        let child_hits = self.search_entity(child_term, 3).await;
        let parent_hits = self.search_entity(parent_term, 3).await;
        if child_hits.is_empty() || parent_hits.is_empty() {
            self.subclass_cache.put(cache_key, false);
            return false;
        }

        let parent_ids: Vec<&str> = parent_hits.iter().map(|h| h.id.as_str()).collect();
        let parent_labels: Vec<String> =
            parent_hits.iter().map(|h| h.label.to_lowercase()).collect();

        let mut visited: Vec<String> = Vec::new();
        let mut queue: std::collections::VecDeque<(String, usize)> = child_hits
            .iter()
            .take(2)
            .map(|h| (h.id.clone(), 0usize))
            .collect();

        while let Some((current, depth)) = queue.pop_front() {
            if visited.contains(&current) || depth > max_depth {
                continue;
            }
            visited.push(current.clone());

            for (parent_id, parent_label) in self.parent_classes(&current).await {
                if parent_ids.contains(&parent_id.as_str())
                    || parent_labels.contains(&parent_label.to_lowercase())
                {
                    self.subclass_cache.put(cache_key, true);
                    return true;
                }
                if depth + 1 <= max_depth && !visited.contains(&parent_id) {
                    queue.push_back((parent_id, depth + 1));
                }
            }
        }

        self.subclass_cache.put(cache_key, false);
        false
    }
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl LexicalSource for WikidataClient {
    fn tag(&self) -> SourceTag {
        SourceTag::Wikidata
    }

    async fn gather(&self, term: &str, _context: Option<&str>) -> Vec<CandidateSense> {
        let hits = self.search_entity(term, 5).await;
        let mut candidates = Vec::with_capacity(hits.len());
        for hit in hits {
            let mut aliases: Vec<String> =
                hit.aliases.iter().map(|a| a.to_lowercase()).collect();
            if let Some(details) = self.get_entity_details(&hit.id).await {
                for alias in details.aliases {
                    let alias = alias.to_lowercase();
                    if !aliases.contains(&alias) {
                        aliases.push(alias);
                    }
                }
            }
            let label = hit.label.to_lowercase();
            let mut all_forms = vec![label.clone(), term.to_lowercase()];
            all_forms.extend(aliases);

            candidates.push(CandidateSense {
                source: SourceTag::Wikidata,
                source_id: hit.id,
                label,
                gloss: hit.description,
                all_forms: dedup_preserving(all_forms),
                hypernyms: Vec::new(),
                score: 0.0,
            });
        }
        candidates
    }

    async fn get_canonical(&self, term: &str, context: Option<&str>) -> Option<CanonicalEntry> {
        let hit = self.search_disambiguated(term, context).await?;
        let details = self.get_entity_details(&hit.id).await?;
        if details.label.is_empty() {
            return None;
        }

        let label = details.label.to_lowercase();
        let mut all_forms = vec![label.clone(), term.to_lowercase()];
        all_forms.extend(details.aliases.iter().map(|a| a.to_lowercase()));

        let hypernyms: Vec<String> = self
            .parent_classes(&hit.id)
            .await
            .into_iter()
            .map(|(_, parent_label)| parent_label.to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();

        Some(CanonicalEntry {
            canonical_id: hit.id.to_lowercase(),
            canonical_label: label,
            all_forms: dedup_preserving(all_forms),
            hypernyms: dedup_preserving(hypernyms),
            gloss: details.description,
            linked_wikidata: None,
            linked_babelnet: self.babelnet_link(&hit.id).await,
        })
    }

    async fn get_synonyms(&self, term: &str) -> Vec<String> {
        let hits = self.search_entity(term, 3).await;
        let mut aliases = Vec::new();
        for hit in hits {
            if let Some(details) = self.get_entity_details(&hit.id).await {
                if !details.label.is_empty() {
                    aliases.push(details.label.to_lowercase());
                }
                aliases.extend(details.aliases.iter().map(|a| a.to_lowercase()));
            }
        }
        aliases.sort();
        aliases.dedup();
        aliases
    }

    async fn get_hypernyms(&self, term: &str, _depth: usize) -> Vec<String> {
        let hits = self.search_entity(term, 1).await;
        let Some(hit) = hits.first() else {
            return Vec::new();
        };
        dedup_preserving(
            self.parent_classes(&hit.id)
                .await
                .into_iter()
                .map(|(_, label)| label.to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        )
    }
}
