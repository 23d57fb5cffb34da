//! Remote embedding endpoint (HF-style feature extraction).

use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::config::EmbedConfig;
use crate::error::EmbedError;
use crate::l2_normalize_in_place;

// One pooled client for all embedder instances.
static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(8)
        .gzip(true)
        .build()
        .expect("failed to build embedder HTTP client")
});

pub(crate) async fn encode_via_api(
    url: &str,
    texts: &[&str],
    cfg: &EmbedConfig,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let mut request = HTTP_CLIENT
        .post(url)
        .timeout(Duration::from_secs(cfg.api_timeout_secs))
        .json(&json!({ "inputs": texts }));
    if let Some(auth) = &cfg.api_auth_header {
        request = request.header("Authorization", auth.clone());
    }

    let response = request
        .send()
        .await
        .map_err(|e| EmbedError::Request(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(EmbedError::Request(format!("endpoint returned {status}")));
    }
    let body: Value = response
        .json()
        .await
        .map_err(|e| EmbedError::Malformed(e.to_string()))?;

    let mut vectors = parse_embeddings(&body, texts.len())?;
    if cfg.normalize {
        for v in &mut vectors {
            l2_normalize_in_place(v);
        }
    }
    Ok(vectors)
}

/// Accepts `[[f32]]` (one vector per input) or `[[[f32]]]` (token-level
/// output, mean-pooled here). A single flat `[f32]` is treated as one vector.
fn parse_embeddings(body: &Value, expected: usize) -> Result<Vec<Vec<f32>>, EmbedError> {
    let outer = body
        .as_array()
        .ok_or_else(|| EmbedError::Malformed("response is not an array".into()))?;

    // Single flat vector for a single input.
    if expected == 1 && outer.first().map(Value::is_number).unwrap_or(false) {
        return Ok(vec![parse_vector(body)?]);
    }

    let mut vectors = Vec::with_capacity(outer.len());
    for entry in outer {
        let rows = entry
            .as_array()
            .ok_or_else(|| EmbedError::Malformed("embedding entry is not an array".into()))?;
        if rows.first().map(Value::is_array).unwrap_or(false) {
            vectors.push(mean_pool(rows)?);
        } else {
            vectors.push(parse_vector(entry)?);
        }
    }

    if vectors.len() != expected {
        return Err(EmbedError::Malformed(format!(
            "endpoint returned {} embeddings for {} inputs",
            vectors.len(),
            expected
        )));
    }
    Ok(vectors)
}

fn parse_vector(value: &Value) -> Result<Vec<f32>, EmbedError> {
    value
        .as_array()
        .ok_or_else(|| EmbedError::Malformed("expected a numeric array".into()))?
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbedError::Malformed("non-numeric embedding value".into()))
        })
        .collect()
}

fn mean_pool(rows: &[Value]) -> Result<Vec<f32>, EmbedError> {
    let mut sum: Vec<f32> = Vec::new();
    let mut count = 0usize;
    for row in rows {
        let v = parse_vector(row)?;
        if sum.is_empty() {
            sum = v;
        } else {
            if v.len() != sum.len() {
                return Err(EmbedError::Malformed("ragged token embeddings".into()));
            }
            for (s, x) in sum.iter_mut().zip(v) {
                *s += x;
            }
        }
        count += 1;
    }
    if count == 0 {
        return Err(EmbedError::Malformed("empty token embedding list".into()));
    }
    for s in &mut sum {
        *s /= count as f32;
    }
    Ok(sum)
}
