use std::path::PathBuf;

use anyhow::{anyhow, Result};

/// Connection settings for the Source Project REST API.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

impl SourceConfig {
    /// Resolve each setting from an explicit value or its environment variable.
    pub fn resolve(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            url: setting(url, "--url", "XMGR_URL")?,
            username: setting(username, "--username", "XMGR_USERNAME")?,
            password: setting(password, "--password", "XMGR_PASSWORD")?,
        })
    }
}

fn setting(value: Option<String>, flag: &str, var: &str) -> Result<String> {
    value
        .or_else(|| dotenv::var(var).ok())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("{} or {} is required", flag, var))
}

/// Per-request retry policy for transient HTTP failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Settings for a download job.
pub struct HarvestConfig {
    pub output_directory: PathBuf,
    /// How often (in items) to log progress.
    pub checkpoint_frequency: usize,
    pub max_docs: Option<usize>,
    /// Whole-job reruns after a failure; `None` runs once.
    pub job_retries: Option<u32>,
    pub job_retry_delay_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("."),
            checkpoint_frequency: 100,
            max_docs: None,
            job_retries: None,
            job_retry_delay_secs: 60,
        }
    }
}
