//! Client configuration

use std::env;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, including the `/api` prefix
    pub base_url: String,

    /// Where to persist the token pair; in-memory when absent
    pub token_file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token_file: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env::var("INPAWDIA_API_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let token_file = env::var("INPAWDIA_TOKEN_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_api() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:5000/api");
        assert!(config.token_file.is_none());
    }
}
