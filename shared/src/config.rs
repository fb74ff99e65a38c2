//! Configuration management for the Company Agent client.

use std::env;
use std::time::Duration;

use crate::batch::BatchOptions;
use crate::error::ConfigError;

pub const DEFAULT_USERNAME: &str = "username";
pub const DEFAULT_PASSWORD: &str = "password";
pub const DEFAULT_BASE_URL: &str = "https://example.com";

/// Per-endpoint request timeouts.
///
/// QA runs multi-step retrieval and generation synchronously, so its timeout
/// is an order of magnitude above the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Token exchange and company directory
    pub auth: Duration,
    /// Crawl submission
    pub crawl: Duration,
    /// Question answering
    pub qa: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            auth: Duration::from_secs(30),
            crawl: Duration::from_secs(30),
            qa: Duration::from_secs(500),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial username for the credentials form
    pub username: String,
    /// Initial password for the credentials form
    pub password: String,
    /// Backend base URL
    pub base_url: String,
    /// Request timeouts
    pub timeouts: Timeouts,
    /// Batch QA fan-out limits
    pub batch: BatchOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeouts: Timeouts::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `AGENT_*` names win over the bare `USERNAME`/`PASSWORD`/`BASE_URL` ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|key| lookup(key));
        let defaults = Timeouts::default();

        Ok(Self {
            username: first(&["AGENT_USERNAME", "USERNAME"])
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            password: first(&["AGENT_PASSWORD", "PASSWORD"])
                .unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            base_url: first(&["AGENT_BASE_URL", "BASE_URL"])
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeouts: Timeouts {
                auth: secs(&lookup, "AGENT_AUTH_TIMEOUT_SECS", defaults.auth)?,
                crawl: secs(&lookup, "AGENT_CRAWL_TIMEOUT_SECS", defaults.crawl)?,
                qa: secs(&lookup, "AGENT_QA_TIMEOUT_SECS", defaults.qa)?,
            },
            batch: BatchOptions {
                max_concurrency: positive(&lookup, "AGENT_BATCH_MAX_CONCURRENCY")?,
            },
        })
    }
}

fn secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(positive(lookup, key)?
        .map(|secs| Duration::from_secs(secs as u64))
        .unwrap_or(default))
}

fn positive<F>(lookup: &F, key: &str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(0) => Err(ConfigError::invalid(key, "must be greater than zero")),
            Ok(value) => Ok(Some(value)),
            Err(e) => Err(ConfigError::invalid(key, format!("{:?}: {}", raw, e))),
        },
    }
}
