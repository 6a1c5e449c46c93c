//! Configuration management for cidwatch
//!
//! Handles CLI argument parsing (with environment fallbacks), config file
//! loading, defaults and validation. The resulting [`Config`] is read once at
//! startup and never mutated afterwards.

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::linkcheck::{BlockRule, FailurePolicy};
use crate::manifest::DEFAULT_MAX_MANIFEST_BYTES;

/// Public gateway used when none is configured
pub const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Argument error: {0}")]
    Cli(#[from] clap::Error),
}

#[derive(Parser, Debug)]
#[command(name = "cidwatch")]
#[command(about = "IPFS manifest digest and blocked-link gateway", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway
    Serve(ServeCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeCommand {
    /// Load configuration from a TOML file. The file replaces every other
    /// flag and environment variable; only --auth-key / AUTH_KEY is still read,
    /// and only when the file sets no auth_key.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Bearer token clients must present
    #[arg(long, env = "AUTH_KEY", hide_env_values = true)]
    pub auth_key: Option<String>,

    /// HTTP port to listen on
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Address to bind the HTTP listener to
    #[arg(long, default_value = "0.0.0.0")]
    pub bind_address: String,

    /// IPFS gateway manifests are downloaded from
    #[arg(long, env = "IPFS_GATEWAY", default_value = DEFAULT_GATEWAY_URL)]
    pub gateway_url: String,

    /// Gateway links are checked against (defaults to --gateway-url)
    #[arg(long)]
    pub check_gateway_url: Option<String>,

    /// Timeout for each outbound gateway request, in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Maximum link checks in flight per request (1 = sequential)
    #[arg(long, default_value_t = 1)]
    pub check_concurrency: usize,

    /// What to do when a link check itself fails
    #[arg(long, value_enum, default_value_t = FailurePolicy::Report)]
    pub on_check_error: FailurePolicy,

    /// Keep the first character after ": " in digest output
    #[arg(long)]
    pub no_display_quirk: bool,

    /// Largest manifest accepted, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_MANIFEST_BYTES)]
    pub max_manifest_bytes: usize,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth_key: String,
    pub port: u16,
    pub bind_address: String,
    pub gateway_url: String,
    pub check_gateway_url: Option<String>,
    pub request_timeout_secs: u64,
    pub check_concurrency: usize,
    pub on_check_error: FailurePolicy,
    pub display_quirk: bool,
    pub max_manifest_bytes: usize,
    pub log_level: String,
    pub block_rule: BlockRule,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auth_key: String::new(),
            port: 3000,
            bind_address: "0.0.0.0".to_string(),
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            check_gateway_url: None,
            request_timeout_secs: 30,
            check_concurrency: 1,
            on_check_error: FailurePolicy::Report,
            display_quirk: true,
            max_manifest_bytes: DEFAULT_MAX_MANIFEST_BYTES,
            log_level: "info".to_string(),
            block_rule: BlockRule::default(),
        }
    }
}

impl Config {
    /// Create config from process arguments and environment
    pub fn from_cli() -> Result<Self, ConfigError> {
        let cli = Cli::parse();

        match cli.command {
            Commands::Serve(cmd) => Self::from_command(cmd),
        }
    }

    /// Create config from an explicit argument list (first item is the binary name)
    pub fn from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args)?;

        match cli.command {
            Commands::Serve(cmd) => Self::from_command(cmd),
        }
    }

    fn from_command(cmd: ServeCommand) -> Result<Self, ConfigError> {
        let config = match &cmd.config {
            Some(path) => {
                let mut config = Self::load_from_file(path)?;
                if config.auth_key.is_empty() {
                    config.auth_key = cmd.auth_key.clone().unwrap_or_default();
                }
                config
            }
            None => cmd.into(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file; missing keys take their defaults
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth_key.is_empty() {
            return Err(ConfigError::Invalid(
                "auth key is required (--auth-key or AUTH_KEY)".to_string(),
            ));
        }
        if self.check_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "check concurrency must be at least 1".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be at least 1 second".to_string(),
            ));
        }
        for url in [Some(&self.gateway_url), self.check_gateway_url.as_ref()]
            .into_iter()
            .flatten()
        {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "gateway URL must be http(s): {}",
                    url
                )));
            }
        }
        Ok(())
    }

    /// Gateway used for link checks
    pub fn check_gateway(&self) -> &str {
        self.check_gateway_url
            .as_deref()
            .unwrap_or(&self.gateway_url)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl From<ServeCommand> for Config {
    fn from(cmd: ServeCommand) -> Self {
        Config {
            auth_key: cmd.auth_key.unwrap_or_default(),
            port: cmd.port,
            bind_address: cmd.bind_address,
            gateway_url: cmd.gateway_url,
            check_gateway_url: cmd.check_gateway_url,
            request_timeout_secs: cmd.request_timeout_secs,
            check_concurrency: cmd.check_concurrency,
            on_check_error: cmd.on_check_error,
            display_quirk: !cmd.no_display_quirk,
            max_manifest_bytes: cmd.max_manifest_bytes,
            log_level: cmd.log_level,
            block_rule: BlockRule::default(),
        }
    }
}
