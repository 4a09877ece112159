//! Configuration for screening and multiples operations

use crate::error::{Result, ScreenError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest page the Yahoo screener will return in one response
pub const MAX_PAGE_SIZE: usize = 250;

/// Browser-like agent; Yahoo rejects requests without one
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0 Safari/537.36";

/// Configuration for the Yahoo Finance client and the symbol lister
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Records requested per screener page
    pub page_size: usize,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// User agent sent with every request
    pub user_agent: String,

    /// Base URL for the query API (screener, quoteSummary, timeseries)
    pub query_base_url: String,

    /// URL hit once per session to obtain the consent cookie
    pub cookie_url: String,

    /// `lang` query parameter
    pub lang: String,

    /// `region` query parameter (market locale, not the screener filter)
    pub market_region: String,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            request_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            query_base_url: "https://query1.finance.yahoo.com".to_string(),
            cookie_url: "https://fc.yahoo.com".to_string(),
            lang: "en-US".to_string(),
            market_region: "US".to_string(),
        }
    }
}

impl ScreenConfig {
    /// Create a new configuration builder
    pub fn builder() -> ScreenConfigBuilder {
        ScreenConfigBuilder::default()
    }

    /// Apply `COMPS_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("COMPS_PAGE_SIZE") {
            self.page_size = raw.trim().parse().map_err(|_| {
                ScreenError::ConfigError(format!("COMPS_PAGE_SIZE is not a number: {raw}"))
            })?;
        }
        if let Some(raw) = lookup("COMPS_REQUEST_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ScreenError::ConfigError(format!(
                    "COMPS_REQUEST_TIMEOUT_SECS is not a number: {raw}"
                ))
            })?;
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(agent) = lookup("COMPS_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(url) = lookup("COMPS_QUERY_BASE_URL") {
            self.query_base_url = url;
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(ScreenError::ConfigError(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(ScreenError::ConfigError(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(ScreenError::ConfigError(
                "user_agent must not be empty".to_string(),
            ));
        }

        url::Url::parse(&self.query_base_url)?;
        url::Url::parse(&self.cookie_url)?;

        Ok(())
    }
}

/// Builder for ScreenConfig
#[derive(Debug, Default)]
pub struct ScreenConfigBuilder {
    page_size: Option<usize>,
    request_timeout: Option<Duration>,
    user_agent: Option<String>,
    query_base_url: Option<String>,
    cookie_url: Option<String>,
}

impl ScreenConfigBuilder {
    /// Set the screener page size
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Point the client at a different query host
    pub fn query_base_url(mut self, url: impl Into<String>) -> Self {
        self.query_base_url = Some(url.into());
        self
    }

    /// Set the consent cookie URL
    pub fn cookie_url(mut self, url: impl Into<String>) -> Self {
        self.cookie_url = Some(url.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ScreenConfig> {
        let defaults = ScreenConfig::default();

        let config = ScreenConfig {
            page_size: self.page_size.unwrap_or(defaults.page_size),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            query_base_url: self.query_base_url.unwrap_or(defaults.query_base_url),
            cookie_url: self.cookie_url.unwrap_or(defaults.cookie_url),
            lang: defaults.lang,
            market_region: defaults.market_region,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ScreenConfig::default();
        assert_eq!(config.page_size, 250);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ScreenConfig::builder()
            .page_size(100)
            .request_timeout(Duration::from_secs(60))
            .query_base_url("http://localhost:8080")
            .build()
            .unwrap();

        assert_eq!(config.page_size, 100);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.query_base_url, "http://localhost:8080");
    }

    #[test]
    fn test_validation_page_size_bounds() {
        assert!(ScreenConfig::builder().page_size(0).build().is_err());
        assert!(ScreenConfig::builder().page_size(251).build().is_err());
        assert!(ScreenConfig::builder().page_size(1).build().is_ok());
    }

    #[test]
    fn test_validation_bad_url() {
        let config = ScreenConfig {
            query_base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScreenError::ConfigError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("COMPS_PAGE_SIZE", "50"),
            ("COMPS_REQUEST_TIMEOUT_SECS", "5"),
            ("COMPS_USER_AGENT", "comps-test"),
        ]);

        let config = ScreenConfig::default()
            .apply_overrides(|key| env.get(key).map(ToString::to_string))
            .unwrap();

        assert_eq!(config.page_size, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, "comps-test");
        assert_eq!(config.query_base_url, "https://query1.finance.yahoo.com");
    }

    #[test]
    fn test_env_override_not_a_number() {
        let result = ScreenConfig::default().apply_overrides(|key| {
            (key == "COMPS_PAGE_SIZE").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(ScreenError::ConfigError(_))));
    }
}
