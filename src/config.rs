use serde::Deserialize;
use std::time::Duration;

use crate::services::catalog::RetryPolicy;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// AniList GraphQL endpoint
    #[serde(default = "default_anilist_api_url")]
    pub anilist_api_url: String,

    /// Bearer token for the catalog API. Only the planning mutation needs it.
    #[serde(default)]
    pub anilist_token: Option<String>,

    /// Redis connection URL. Result caching is disabled when unset.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Age after which a cached ranking is recomputed
    #[serde(default = "default_cache_freshness_hours")]
    pub cache_freshness_hours: u64,

    /// Retries after a rate-limit response before giving up
    #[serde(default = "default_retry_max_attempts")]
    pub retry_max_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_anilist_api_url() -> String {
    "https://graphql.anilist.co".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cache_freshness_hours() -> u64 {
    24
}

fn default_retry_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    1000
}

fn default_retry_max_delay_ms() -> u64 {
    60_000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    pub fn cache_freshness(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_freshness_hours as i64)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_environment() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.anilist_api_url, "https://graphql.anilist.co");
        assert_eq!(config.anilist_token, None);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.cache_freshness(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let vars = vec![
            ("RETRY_MAX_ATTEMPTS".to_string(), "5".to_string()),
            ("RETRY_BASE_DELAY_MS".to_string(), "250".to_string()),
            ("RETRY_MAX_DELAY_MS".to_string(), "4000".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        let policy = config.retry_policy();

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
        assert_eq!(policy.max_delay, Duration::from_millis(4000));
    }
}
