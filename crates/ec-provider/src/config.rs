use serde::Deserialize;

pub const DEFAULT_ENDPOINT_URL: &str = "http://localhost:8545";
pub const ENDPOINT_URL_VAR: &str = "ETHER_CHECKER_RPC_URL";
pub const API_KEY_VAR: &str = "ETHER_CHECKER_API_KEY";

/// JSON-RPC endpoint settings for the HTTP provider.
///
/// Deserialized values go through [`ProviderConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawProviderConfig")]
pub struct ProviderConfig {
    pub endpoint_url: String,
    pub api_key: Option<String>,
}

#[derive(Deserialize)]
struct RawProviderConfig {
    endpoint_url: String,
    #[serde(default)]
    api_key: Option<String>,
}

impl From<RawProviderConfig> for ProviderConfig {
    fn from(raw: RawProviderConfig) -> Self {
        Self::new(raw.endpoint_url, raw.api_key)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT_URL, None)
    }
}

impl ProviderConfig {
    pub fn new(endpoint_url: impl Into<String>, api_key: Option<String>) -> Self {
        let endpoint_url = endpoint_url.into();
        Self {
            endpoint_url: endpoint_url.trim().trim_end_matches('/').to_owned(),
            api_key: api_key
                .map(|key| key.trim().to_owned())
                .filter(|key| !key.is_empty()),
        }
    }

    /// Reads `ETHER_CHECKER_RPC_URL` (default `http://localhost:8545`) and
    /// `ETHER_CHECKER_API_KEY`.
    pub fn from_env() -> Self {
        let endpoint_url = std::env::var(ENDPOINT_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_owned());
        Self::new(endpoint_url, std::env::var(API_KEY_VAR).ok())
    }

    /// Endpoint with the API key appended as the last path segment.
    pub fn rpc_url(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}/{}", self.endpoint_url, key),
            None => self.endpoint_url.clone(),
        }
    }
}
