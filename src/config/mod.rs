mod file_config;

pub use file_config::FileConfig;

use anyhow::{bail, Result};
use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

use crate::notifications::DEFAULT_PAGE_SIZE;

pub const DEFAULT_REQUEST_TIMEOUT_SEC: u64 = 30;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LoggingLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LoggingLevel> for LevelFilter {
    fn from(level: LoggingLevel) -> Self {
        match level {
            LoggingLevel::Error => LevelFilter::ERROR,
            LoggingLevel::Warn => LevelFilter::WARN,
            LoggingLevel::Info => LevelFilter::INFO,
            LoggingLevel::Debug => LevelFilter::DEBUG,
            LoggingLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub base_url: Option<String>,
    pub api_token: Option<String>,
    pub page_size: Option<u32>,
    pub request_timeout_sec: Option<u64>,
    pub logging_level: LoggingLevel,
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub request_timeout_sec: u64,
    pub logging_level: LoggingLevel,
}

impl SyncConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let base_url = file
            .base_url
            .or_else(|| cli.base_url.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("base_url must be specified via --base-url or in config file")
            })?;
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            bail!("base_url must be an http(s) URL: {}", base_url);
        }
        let base_url = base_url.trim_end_matches('/').to_string();

        let api_token = file
            .api_token
            .or_else(|| cli.api_token.clone())
            .filter(|token| !token.is_empty());

        let page_size = file
            .page_size
            .or(cli.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            bail!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE,
                page_size
            );
        }

        let request_timeout_sec = file
            .request_timeout_sec
            .or(cli.request_timeout_sec)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SEC);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than zero");
        }

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or(cli.logging_level);

        Ok(Self {
            base_url,
            api_token,
            page_size,
            request_timeout_sec,
            logging_level,
        })
    }
}

/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<LoggingLevel> {
    LoggingLevel::from_str(s, true).ok()
}
