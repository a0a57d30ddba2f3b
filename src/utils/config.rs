use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Optional personal access token; without it GitHub applies the anonymous rate limit
    pub github_token: Option<String>,
    pub github_api_url: String,
    /// Enables the tracked-user endpoints when present
    pub database_url: Option<String>,
    /// Period used when a request carries none ("all" disables the cutoff)
    pub default_period: String,
    pub aggregation_timeout_secs: u64,
    pub max_concurrent_repo_fetches: usize,
    pub http_timeout_secs: u64,
    pub tracked_months: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            github_token: None,
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            database_url: None,
            default_period: "1m".to_string(),
            aggregation_timeout_secs: 60,
            max_concurrent_repo_fetches: 8,
            http_timeout_secs: 30,
            tracked_months: vec!["2025-09".to_string(), "2025-10".to_string()],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Config::default();

        let tracked_months = match non_empty_var("TRACKED_MONTHS") {
            Some(raw) => parse_month_list(&raw)?,
            None => defaults.tracked_months,
        };

        Ok(Config {
            host: non_empty_var("HOST").unwrap_or(defaults.host),
            port: parsed_var("PORT", defaults.port)?,
            github_token: non_empty_var("GITHUB_TOKEN"),
            github_api_url: non_empty_var("GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.github_api_url),
            database_url: non_empty_var("DATABASE_URL"),
            default_period: non_empty_var("DEFAULT_PERIOD").unwrap_or(defaults.default_period),
            aggregation_timeout_secs: positive_var(
                "AGGREGATION_TIMEOUT_SECS",
                defaults.aggregation_timeout_secs,
            )?,
            max_concurrent_repo_fetches: parsed_var(
                "MAX_CONCURRENT_REPO_FETCHES",
                defaults.max_concurrent_repo_fetches,
            )?
            .max(1),
            http_timeout_secs: positive_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs)?,
            tracked_months,
        })
    }

    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregation_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed_var<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_var(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{} must be a number, got '{}': {}", key, raw, e)),
        None => Ok(default),
    }
}

/// Seconds; zero is rejected
fn positive_var(key: &str, default: u64) -> Result<u64> {
    match parsed_var(key, default)? {
        0 => Err(anyhow!("{} must be greater than zero", key)),
        value => Ok(value),
    }
}

/// Parse a comma-separated list of `YYYY-MM` month names.
pub fn parse_month_list(raw: &str) -> Result<Vec<String>> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(|m| {
            super::validators::validate_month_name(m)
                .map(|_| m.to_string())
                .with_context(|| format!("invalid entry in month list '{}'", raw))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_period, "1m");
        assert!(config.github_token.is_none());
        assert!(config.database_url.is_none());
        assert_eq!(config.aggregation_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_parse_month_list() {
        assert_eq!(
            parse_month_list("2025-09, 2025-10,").unwrap(),
            vec!["2025-09".to_string(), "2025-10".to_string()]
        );
        assert!(parse_month_list("2025-13").is_err());
        assert!(parse_month_list("september").is_err());
    }

    #[test]
    fn test_parsed_var_rejects_garbage() {
        env::set_var("GH_TRACKER_TEST_NUMBER", "eight");
        assert!(parsed_var::<u16>("GH_TRACKER_TEST_NUMBER", 1).is_err());
        env::set_var("GH_TRACKER_TEST_NUMBER", "42");
        assert_eq!(parsed_var::<u16>("GH_TRACKER_TEST_NUMBER", 1).unwrap(), 42);
        env::remove_var("GH_TRACKER_TEST_NUMBER");
        assert_eq!(parsed_var::<u16>("GH_TRACKER_TEST_NUMBER", 1).unwrap(), 1);
    }

    #[test]
    fn test_positive_var_rejects_zero() {
        env::set_var("GH_TRACKER_TEST_TIMEOUT", "0");
        assert!(positive_var("GH_TRACKER_TEST_TIMEOUT", 60).is_err());
        env::set_var("GH_TRACKER_TEST_TIMEOUT", "5");
        assert_eq!(positive_var("GH_TRACKER_TEST_TIMEOUT", 60).unwrap(), 5);
        env::remove_var("GH_TRACKER_TEST_TIMEOUT");
        assert_eq!(positive_var("GH_TRACKER_TEST_TIMEOUT", 60).unwrap(), 60);
    }
}
