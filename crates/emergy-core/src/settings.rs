use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EmergyError, Result};

/// Default base URL of the LCI catalog service.
pub const DEFAULT_LCI_API_URL: &str = "http://localhost:8001";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Emergy accounting and sustainability indicators from LCI flow data
#[derive(Parser, Debug, Clone)]
#[command(
    name = "emergy-calc",
    about = "Emergy accounting and sustainability indicators from LCI flow data",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Base URL of the LCI catalog service
    #[arg(long, env = "LCI_SERVICE_API_URL", default_value = DEFAULT_LCI_API_URL, global = true)]
    pub lci_api_url: String,

    /// Timeout for LCI catalog requests, in seconds (1-300)
    #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..=300), global = true)]
    pub lci_timeout_secs: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"], global = true)]
    pub log_level: String,

    /// Log file path (defaults to ~/.emergy-calc/logs/emergy-calc.log)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Only log to stderr
    #[arg(long, global = true, conflicts_with = "log_file")]
    pub no_log_file: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,
}

/// What to calculate.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Calculate emergy from a CSV, XLS or XLSX flow table
    File {
        /// Path to the flow table
        path: PathBuf,
    },
    /// Calculate emergy for a product of the LCI catalog
    Lci {
        /// Catalog product identifier
        product_id: i64,
    },
    /// List the products available in the LCI catalog
    Products,
}

// ── LciConfig ──────────────────────────────────────────────────────────────────

/// Connection settings handed to the LCI catalog client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LciConfig {
    /// Base URL without a trailing slash.
    pub api_url: String,
    pub timeout: Duration,
}

impl LciConfig {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let api_url = api_url.trim().trim_end_matches('/');
        if api_url.is_empty() {
            return Err(EmergyError::Config("LCI service API URL is empty".to_string()));
        }
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(EmergyError::Config(format!(
                "LCI service API URL must start with http:// or https://, got {}",
                api_url
            )));
        }
        Ok(Self {
            api_url: api_url.to_string(),
            timeout,
        })
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`load`](Self::load) but from an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Settings::try_parse_from(args).map(Self::resolve)
    }

    fn resolve(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Build the explicit client configuration from these settings.
    pub fn lci_config(&self) -> Result<LciConfig> {
        LciConfig::new(
            &self.lci_api_url,
            Duration::from_secs(self.lci_timeout_secs),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
