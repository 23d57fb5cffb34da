use serde::{Deserialize, Serialize};

/// Runtime configuration for the embedding provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedConfig {
    /// `"stub"` (deterministic, local) or `"api"` (remote endpoint).
    pub mode: String,
    /// Friendly model label carried for observability; which model actually
    /// runs is the endpoint's concern in api mode.
    pub model_name: String,
    /// Feature-extraction endpoint for api mode.
    pub api_url: Option<String>,
    /// Authorization header value (e.g. `"Bearer hf_xxx"`).
    pub api_auth_header: Option<String>,
    /// Per-request timeout in seconds.
    pub api_timeout_secs: u64,
    /// Vector dimension produced by the stub (api mode returns whatever the
    /// model yields).
    pub dimension: usize,
    /// L2-normalize outgoing vectors.
    pub normalize: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        EmbedConfig {
            mode: "stub".into(),
            model_name: "all-MiniLM-L6-v2".into(),
            api_url: None,
            api_auth_header: None,
            api_timeout_secs: 30,
            dimension: 384,
            normalize: true,
        }
    }
}
