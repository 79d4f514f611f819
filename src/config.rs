//! Settings loaded from the environment and an optional `.env` file.

use crate::scrapers::browser::{Browser, ChromeBrowser};
use crate::scrapers::captured::CapturedSite;
use crate::scrapers::cpbl::CPBL_URL;
use crate::scrapers::extractor::ExtractorConfig;
use crate::store::RefreshPolicy;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Settings {
    pub cpbl_url: String,
    pub bind_addr: String,

    // Browser
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub captured_pages_dir: Option<PathBuf>,

    // Extraction
    pub max_browser_sessions: usize,
    pub extraction_timeout: Duration,
    pub wait_timeout: Duration,
    pub poll_interval: Duration,
    pub settle_polls: u32,
    pub settle_delay: Duration,
    pub close_grace: Duration,

    // Background refresh
    pub refresh_interval: Option<Duration>,
    pub retry_initial: Duration,
    pub retry_max: Duration,

    // Logging
    pub log_level: String,
    pub log_json: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let refresh_secs: u64 = env_parse("REFRESH_INTERVAL_SECS", 600)?;

        Ok(Self {
            cpbl_url: env_str("CPBL_URL", CPBL_URL),
            bind_addr: env_str("BIND_ADDR", "0.0.0.0:14888"),

            chrome_path: env_path("CHROME_PATH"),
            headless: env_bool("HEADLESS", true),
            captured_pages_dir: env_path("CAPTURED_PAGES_DIR"),

            max_browser_sessions: env_positive("MAX_BROWSER_SESSIONS", 2)?,
            extraction_timeout: Duration::from_secs(env_positive("EXTRACTION_TIMEOUT_SECS", 30)?),
            wait_timeout: Duration::from_secs(env_positive("WAIT_TIMEOUT_SECS", 10)?),
            poll_interval: Duration::from_millis(env_positive("POLL_INTERVAL_MS", 200)?),
            settle_polls: env_positive("SETTLE_POLLS", 5)?,
            settle_delay: Duration::from_millis(env_parse("SETTLE_DELAY_MS", 0)?),
            close_grace: Duration::from_secs(env_positive("CLOSE_GRACE_SECS", 5)?),

            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
            retry_initial: Duration::from_secs(env_positive("RETRY_INITIAL_SECS", 5)?),
            retry_max: Duration::from_secs(env_parse("RETRY_MAX_SECS", 300)?),

            log_level: env_str("LOG_LEVEL", "info"),
            log_json: env_bool("LOG_JSON", false),
        })
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_sessions: self.max_browser_sessions,
            deadline: self.extraction_timeout,
            wait_timeout: self.wait_timeout,
            poll_interval: self.poll_interval,
            settle_polls: self.settle_polls,
            close_grace: self.close_grace,
        }
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            interval: self.refresh_interval,
            initial_backoff: self.retry_initial,
            max_backoff: self.retry_max.max(self.retry_initial),
        }
    }

    /// Captured pages when a directory is configured, otherwise live Chromium
    pub fn browser(&self) -> Result<Arc<dyn Browser>> {
        match &self.captured_pages_dir {
            Some(dir) => Ok(Arc::new(CapturedSite::from_dir(dir)?)),
            None => Ok(Arc::new(ChromeBrowser::new(
                self.chrome_path.clone(),
                self.headless,
            ))),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` takes precedence over `LOG_LEVEL`.
pub fn init_logging(settings: &Settings) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    if settings.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .with_context(|| format!("{} must be a number, got {:?}", key, value)),
        _ => Ok(default),
    }
}

/// Like [`env_parse`], but zero is a configuration error
fn env_positive<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env_parse(key, default)?;
    if value <= T::default() {
        bail!("{} must be greater than zero", key);
    }
    Ok(value)
}
