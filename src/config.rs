use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_PRIMARY_HOST: &str = "www.ebay.com";
pub const DEFAULT_FALLBACK_HOST: &str = "www.ebay.co.uk";
pub const DEFAULT_SUMMARY_MODEL: &str = "openai/gpt-4o-mini";
pub const DEFAULT_MAX_PAGES: u32 = 2;
pub const DEFAULT_SUMMARY_BUDGET: usize = 5;
pub const DEFAULT_DESCRIPTION_LIMIT: usize = 4000;
pub const DEFAULT_NAV_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openrouter_api_key: Option<String>,
    pub pipeline: PipelineConfig,
    pub headless: bool,
    pub request_timeout: Duration,
}

/// Knobs for one extraction run. Defaults mirror the environment defaults.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub primary_host: String,
    pub fallback_host: String,
    pub summary_model: String,
    pub max_pages: u32,
    pub summary_budget: usize,
    pub description_limit: usize,
    pub nav_max_attempts: u32,
    pub timings: Timings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            primary_host: DEFAULT_PRIMARY_HOST.to_string(),
            fallback_host: DEFAULT_FALLBACK_HOST.to_string(),
            summary_model: DEFAULT_SUMMARY_MODEL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            summary_budget: DEFAULT_SUMMARY_BUDGET,
            description_limit: DEFAULT_DESCRIPTION_LIMIT,
            nav_max_attempts: DEFAULT_NAV_MAX_ATTEMPTS,
            timings: Timings::default(),
        }
    }
}

/// Every wait the pipeline performs. All waits are bounded.
#[derive(Clone, Debug)]
pub struct Timings {
    pub navigation_timeout: Duration,
    pub backoff_step: Duration,
    pub results_wait: Duration,
    pub quiesce: Duration,
    pub after_scroll: Duration,
    pub page_pacing: Duration,
    pub page_jitter_ms: u64,
    pub expand_settle: Duration,
    pub description_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Timings {
            navigation_timeout: Duration::from_secs(60),
            backoff_step: Duration::from_millis(1500),
            results_wait: Duration::from_secs(30),
            quiesce: Duration::from_millis(500),
            after_scroll: Duration::from_millis(800),
            page_pacing: Duration::from_millis(1500),
            page_jitter_ms: 1000,
            expand_settle: Duration::from_millis(600),
            description_wait: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let openrouter_api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        // Load server configuration with defaults
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "3000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let server_addr = SocketAddr::new(ip, port);

        let pipeline = PipelineConfig {
            primary_host: env_or("EBAY_DOMAIN", DEFAULT_PRIMARY_HOST),
            fallback_host: env_or("EBAY_ALT_DOMAIN", DEFAULT_FALLBACK_HOST),
            summary_model: env_or("SUMMARY_MODEL", DEFAULT_SUMMARY_MODEL),
            max_pages: parse_env("MAX_PAGES", DEFAULT_MAX_PAGES)?,
            summary_budget: parse_env("SUMMARY_BUDGET", DEFAULT_SUMMARY_BUDGET)?,
            description_limit: parse_env("DESCRIPTION_LIMIT", DEFAULT_DESCRIPTION_LIMIT)?,
            nav_max_attempts: parse_env("NAV_MAX_ATTEMPTS", DEFAULT_NAV_MAX_ATTEMPTS)?,
            timings: Timings::default(),
        };

        if pipeline.max_pages == 0 || pipeline.nav_max_attempts == 0 {
            return Err(AppError::ConfigError(
                "MAX_PAGES and NAV_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let headless = parse_env("HEADLESS", true)?;
        let request_timeout = Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 900u64)?);

        Ok(Config {
            server_addr,
            openrouter_api_key,
            pipeline,
            headless,
            request_timeout,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", key, e))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PipelineConfig::default();
        assert_eq!(config.primary_host, "www.ebay.com");
        assert_eq!(config.fallback_host, "www.ebay.co.uk");
        assert_eq!(config.summary_budget, 5);
        assert_eq!(config.nav_max_attempts, 3);
        assert_eq!(config.timings.backoff_step, Duration::from_millis(1500));
    }

    #[test]
    fn unset_variable_falls_back_to_default() {
        let value: u32 = parse_env("EBAY_SCRAPER_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
        assert_eq!(env_or("EBAY_SCRAPER_TEST_UNSET_VARIABLE", "x"), "x");
    }
}
