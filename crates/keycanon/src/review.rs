//! The borderline-match review queue.
//!
//! Entries are flagged when an embedding match lands between the acceptance
//! threshold and the borderline threshold. They persist to a JSON sidecar,
//! transition only through `pending → approved | rejected`, and pending
//! duplicates are suppressed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// The new key that matched.
    pub key1: String,
    /// The existing key it matched against.
    pub key2: String,
    pub domain: String,
    pub match_type: String,
    pub score: f32,
    pub reason: String,
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_hypernym: Option<String>,
}

impl ReviewEntry {
    pub fn new(
        key1: &str,
        key2: &str,
        domain: &str,
        match_type: &str,
        score: f32,
        reason: String,
    ) -> Self {
        let timestamp = Utc::now();
        ReviewEntry {
            id: format!("{domain}|{key1}|{key2}|{}", timestamp.timestamp()),
            timestamp,
            key1: key1.to_string(),
            key2: key2.to_string(),
            domain: domain.to_string(),
            match_type: match_type.to_string(),
            score,
            reason,
            status: ReviewStatus::Pending,
            reviewed_at: None,
            blocked_hypernym: None,
        }
    }

    pub fn matches(&self, key1: &str, key2: &str, domain: &str) -> bool {
        self.key1 == key1 && self.key2 == key2 && self.domain == domain
    }
}

/// Counts by status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewSummary {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

pub(crate) fn summarize(entries: &[ReviewEntry]) -> ReviewSummary {
    let count = |status: ReviewStatus| entries.iter().filter(|e| e.status == status).count();
    ReviewSummary {
        total: entries.len(),
        pending: count(ReviewStatus::Pending),
        approved: count(ReviewStatus::Approved),
        rejected: count(ReviewStatus::Rejected),
    }
}
