//! The process-wide HTTP client every network adapter shares.

use std::time::Duration;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::error::SourceError;

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .pool_max_idle_per_host(16)
        .gzip(true)
        .user_agent("lexcanon/0.1 (concept canonicalization engine)")
        .build()
        .expect("failed to build lexsource HTTP client")
});

pub(crate) fn client() -> &'static reqwest::Client {
    &HTTP_CLIENT
}

/// GET a JSON document with query parameters and optional headers. All
/// transport and decode failures collapse into [`SourceError::Transport`];
/// callers log and return empty.
pub(crate) async fn get_json(
    url: &str,
    query: &[(&str, &str)],
    headers: &[(&str, &str)],
    timeout: Duration,
) -> Result<Value, SourceError> {
    let mut request = client().get(url).query(query).timeout(timeout);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Transport(format!("status {status}")));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| SourceError::Transport(e.to_string()))
}
