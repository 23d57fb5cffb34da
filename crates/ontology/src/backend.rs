//! Pluggable backends for the `concept_ontology` table.
//!
//! [`InMemoryBackend`] keeps rows in a sorted map — fast, ephemeral, ideal
//! for tests. [`RestBackend`] speaks a PostgREST-style row API against the
//! production table (`concept_id` primary key, JSONB path and synonyms,
//! trigger-maintained `updated_at`).

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// One row of `concept_ontology`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRow {
    pub concept_id: String,
    #[serde(default)]
    pub concept_path: Vec<String>,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// One page of rows, ordered by `concept_id`.
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<ConceptRow>, StoreError>;

    /// A single row by primary key.
    async fn fetch_one(&self, concept_id: &str) -> Result<Option<ConceptRow>, StoreError>;

    /// Insert-or-replace with conflict target `concept_id`. Timestamps are
    /// the backend's concern (a trigger in production, set here in memory).
    async fn upsert(&self, row: &ConceptRow) -> Result<(), StoreError>;
}

/// Ephemeral backend for tests and offline runs.
#[derive(Default)]
pub struct InMemoryBackend {
    rows: Mutex<BTreeMap<String, ConceptRow>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.rows.lock().expect("backend poisoned").len()
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<ConceptRow>, StoreError> {
        let rows = self.rows.lock().expect("backend poisoned");
        Ok(rows.values().skip(offset).take(limit).cloned().collect())
    }

    async fn fetch_one(&self, concept_id: &str) -> Result<Option<ConceptRow>, StoreError> {
        let rows = self.rows.lock().expect("backend poisoned");
        Ok(rows.get(concept_id).cloned())
    }

    async fn upsert(&self, row: &ConceptRow) -> Result<(), StoreError> {
        if row.concept_id.is_empty() {
            return Err(StoreError::InvalidRow("empty concept_id".into()));
        }
        let mut rows = self.rows.lock().expect("backend poisoned");
        let now = Utc::now();
        let mut stored = row.clone();
        stored.updated_at = Some(now);
        stored.created_at = rows
            .get(&row.concept_id)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        rows.insert(row.concept_id.clone(), stored);
        Ok(())
    }
}

/// PostgREST-style REST backend for the production table.
pub struct RestBackend {
    base_url: String,
    table: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        RestBackend {
            base_url: base_url.into(),
            table: "concept_ontology".into(),
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .gzip(true)
                .build()
                .expect("failed to build store HTTP client"),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), self.table)
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl StoreBackend for RestBackend {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<ConceptRow>, StoreError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let request = self.client.get(self.table_url()).query(&[
            ("select", "concept_id,concept_path,synonyms,source,confidence"),
            ("order", "concept_id.asc"),
            ("offset", offset.as_str()),
            ("limit", limit.as_str()),
        ]);
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Transport(format!("status {status}")));
        }
        response
            .json::<Vec<ConceptRow>>()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn fetch_one(&self, concept_id: &str) -> Result<Option<ConceptRow>, StoreError> {
        let id_filter = format!("eq.{concept_id}");
        let request = self.client.get(self.table_url()).query(&[
            ("select", "concept_id,concept_path,synonyms,source,confidence"),
            ("concept_id", id_filter.as_str()),
            ("limit", "1"),
        ]);
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Transport(format!("status {status}")));
        }
        let mut rows: Vec<ConceptRow> = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn upsert(&self, row: &ConceptRow) -> Result<(), StoreError> {
        if row.concept_id.is_empty() {
            return Err(StoreError::InvalidRow("empty concept_id".into()));
        }
        let request = self
            .client
            .post(self.table_url())
            .query(&[("on_conflict", "concept_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(row);
        let response = self
            .authed(request)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Transport(format!("status {status}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_round_trip() {
        let backend = InMemoryBackend::new();
        let row = ConceptRow {
            concept_id: "dog".into(),
            concept_path: vec!["animal".into(), "dog".into()],
            synonyms: vec!["canine".into()],
            source: "wordnet".into(),
            confidence: 0.8,
            created_at: None,
            updated_at: None,
        };
        backend.upsert(&row).await.expect("upsert");

        let fetched = backend.fetch_one("dog").await.expect("fetch").expect("row");
        assert_eq!(fetched.concept_path, row.concept_path);
        assert!(fetched.created_at.is_some());
        assert!(fetched.updated_at.is_some());
    }

    #[tokio::test]
    async fn upsert_preserves_created_at() {
        let backend = InMemoryBackend::new();
        let mut row = ConceptRow {
            concept_id: "dog".into(),
            concept_path: vec!["dog".into()],
            synonyms: vec![],
            source: "wordnet".into(),
            confidence: 0.8,
            created_at: None,
            updated_at: None,
        };
        backend.upsert(&row).await.expect("first upsert");
        let created = backend
            .fetch_one("dog")
            .await
            .expect("fetch")
            .expect("row")
            .created_at;

        row.confidence = 0.9;
        backend.upsert(&row).await.expect("second upsert");
        let after = backend.fetch_one("dog").await.expect("fetch").expect("row");
        assert_eq!(after.created_at, created);
        assert!((after.confidence - 0.9).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn pagination_is_ordered_and_stable() {
        let backend = InMemoryBackend::new();
        for id in ["b", "a", "c"] {
            backend
                .upsert(&ConceptRow {
                    concept_id: id.into(),
                    concept_path: vec![id.into()],
                    synonyms: vec![],
                    source: "test".into(),
                    confidence: 0.5,
                    created_at: None,
                    updated_at: None,
                })
                .await
                .expect("upsert");
        }
        let page = backend.fetch_page(0, 2).await.expect("page");
        let ids: Vec<&str> = page.iter().map(|r| r.concept_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        let rest = backend.fetch_page(2, 2).await.expect("page");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].concept_id, "c");
    }

    #[tokio::test]
    async fn empty_concept_id_is_rejected() {
        let backend = InMemoryBackend::new();
        let row = ConceptRow {
            concept_id: "".into(),
            concept_path: vec![],
            synonyms: vec![],
            source: "test".into(),
            confidence: 0.0,
            created_at: None,
            updated_at: None,
        };
        assert!(matches!(
            backend.upsert(&row).await,
            Err(StoreError::InvalidRow(_))
        ));
    }
}
