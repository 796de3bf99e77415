// Client configuration, read from the environment (optionally seeded from a
// .env file) with command-line flags layered on top by the binaries.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::debounce::DEFAULT_QUIET_PERIOD;
use crate::error::ConfigError;
use crate::notify::DEFAULT_TOAST_TTL;
use crate::query::PAGE_SIZE;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub page_size: u64,
    pub search_debounce: Duration,
    pub toast_ttl: Duration,
    /// `None` means requests may hang forever; the UI just stays loading.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: PAGE_SIZE,
            search_debounce: DEFAULT_QUIET_PERIOD,
            toast_ttl: DEFAULT_TOAST_TTL,
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load `.env` (if any) and read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SIGNALTRACE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(raw) = lookup("SIGNALTRACE_PAGE_SIZE") {
            config.page_size = parse_positive("SIGNALTRACE_PAGE_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("SIGNALTRACE_DEBOUNCE_MS") {
            config.search_debounce =
                Duration::from_millis(parse_positive("SIGNALTRACE_DEBOUNCE_MS", &raw)?);
        }
        if let Some(raw) = lookup("SIGNALTRACE_TOAST_SECS") {
            config.toast_ttl = Duration::from_secs(parse_positive("SIGNALTRACE_TOAST_SECS", &raw)?);
        }
        if let Some(raw) = lookup("SIGNALTRACE_TIMEOUT_SECS") {
            config.request_timeout = Some(Duration::from_secs(parse_positive(
                "SIGNALTRACE_TIMEOUT_SECS",
                &raw,
            )?));
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        }),
    }
}

/// Load the first .env found in the working directory or up to two levels
/// above it (running from a subdirectory of a checkout).
pub fn load_dotenv() {
    let env_locations = [".env", "../../.env", "../.env"];

    for location in &env_locations {
        let path = Path::new(location);
        if path.exists() && dotenv::from_path(path).is_ok() {
            debug!("Loaded environment from {}", location);
            return;
        }
    }

    // Fall back to dotenv's own search
    dotenv::dotenv().ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.page_size, 200);
        assert_eq!(config.search_debounce, Duration::from_millis(350));
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("SIGNALTRACE_URL", "http://analyser:9000/"),
            ("SIGNALTRACE_PAGE_SIZE", "50"),
            ("SIGNALTRACE_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://analyser:9000");
        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::from_lookup(lookup(&[("SIGNALTRACE_PAGE_SIZE", "0")])).unwrap_err();
        assert!(err.to_string().contains("SIGNALTRACE_PAGE_SIZE"));
        assert!(ClientConfig::from_lookup(lookup(&[("SIGNALTRACE_DEBOUNCE_MS", "fast")])).is_err());
    }

    #[test]
    fn test_with_base_url() {
        let config = ClientConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
