// src/config.rs
// =============================================================================
// Runtime configuration, read from environment variables.
//
// A `.env` file in the working directory is loaded first when present, so
// local runs can keep their settings next to the binary.
//
// Variables:
//   BLOCKSIZE         links per successor message          (default 10)
//   INVOKELIMIT       invocation ceiling of one lineage     (default 64)
//   PORT              coordinator HTTP port                 (default 3001)
//   SCAN_DELAY_MS     politeness delay before each fetch    (default 200)
//   POLL_INTERVAL_MS  completion poll interval              (default 2500)
//   POLL_ATTEMPTS     completion poll attempts              (default 128)
//   PAGE_SIZE         documents per results page            (default 64)
//   WORKER_ID         diagnostic id stamped on saved pages  (default "local")
// =============================================================================

use anyhow::{bail, Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::coordinator::PollPolicy;
use crate::crawl::WorkerSettings;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub block_size: usize,
    pub invoke_limit: u64,
    pub port: u16,
    pub scan_delay: Duration,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub page_size: usize,
    pub worker_id: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenvy::dotenv();

        let config = Self {
            block_size: parsed("BLOCKSIZE", 10)?,
            invoke_limit: parsed("INVOKELIMIT", 64)?,
            port: parsed("PORT", 3001)?,
            scan_delay: Duration::from_millis(parsed("SCAN_DELAY_MS", 200)?),
            poll_interval: Duration::from_millis(parsed("POLL_INTERVAL_MS", 2500)?),
            poll_attempts: parsed("POLL_ATTEMPTS", 128)?,
            page_size: parsed("PAGE_SIZE", 64)?,
            worker_id: optional("WORKER_ID").unwrap_or_else(|| "local".to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.block_size == 0 {
            bail!("BLOCKSIZE must be at least 1");
        }
        if self.invoke_limit == 0 {
            bail!("INVOKELIMIT must be at least 1");
        }
        if self.poll_attempts == 0 {
            bail!("POLL_ATTEMPTS must be at least 1");
        }
        if self.page_size == 0 {
            bail!("PAGE_SIZE must be at least 1");
        }
        Ok(())
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            block_size: self.block_size,
            invoke_limit: self.invoke_limit,
            scan_delay: self.scan_delay,
            worker_id: self.worker_id.clone(),
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval,
            attempts: self.poll_attempts,
        }
    }
}

// Empty values count as unset, like an unset variable in a .env file
fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number, got '{}'", key, raw)),
        None => Ok(default),
    }
}
