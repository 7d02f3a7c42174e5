//! Layered exporter configuration.
//!
//! Values are resolved in order, later sources winning: built-in defaults,
//! an optional TOML file, `DISHWATCH_*` environment variables, then explicit
//! command-line flags.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

pub const DEFAULT_LISTEN: &str = ":9999";
pub const DEFAULT_DISH: &str = "192.168.100.1:9200";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
pub const DEFAULT_NAMESPACE: &str = "starlink";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

const ENV_PREFIX: &str = "DISHWATCH";

#[derive(Parser, Debug, Default, Clone)]
#[command(name = "dishwatch")]
#[command(version)]
#[command(about = "Prometheus exporter for Starlink dish bandwidth, power and ping metrics")]
pub struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on for metrics (e.g. ":9999", "127.0.0.1:9999")
    #[arg(long)]
    pub listen: Option<String>,

    /// Dish gRPC address (host:port)
    #[arg(long)]
    pub dish: Option<String>,

    /// Reach the dish through a gRPC-JSON gateway at this URL instead
    #[arg(long)]
    pub gateway: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// HTTP path serving the metrics
    #[arg(long)]
    pub metrics_path: Option<String>,

    /// Prefix for every metric name; empty for none
    #[arg(long)]
    pub namespace: Option<String>,

    /// Timeout for each dish request, in seconds
    #[arg(long)]
    pub request_timeout: Option<u64>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub listen: String,
    pub dish: String,
    /// JSON gateway to use instead of talking gRPC to `dish`.
    #[serde(default)]
    pub gateway: Option<String>,
    pub log_level: String,
    pub metrics_path: String,
    pub namespace: String,
    pub request_timeout_secs: u64,
}

impl Settings {
    /// Resolve settings from defaults, the config file, the process
    /// environment and the command line.
    pub fn load(args: &Args) -> Result<Self> {
        Self::load_from(args, None)
    }

    /// Like [`Settings::load`], reading environment variables from `env`
    /// instead of the process environment when given.
    pub fn load_from(args: &Args, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("listen", DEFAULT_LISTEN)?
            .set_default("dish", DEFAULT_DISH)?
            .set_default("log_level", DEFAULT_LOG_LEVEL)?
            .set_default("metrics_path", DEFAULT_METRICS_PATH)?
            .set_default("namespace", DEFAULT_NAMESPACE)?
            .set_default(
                "request_timeout_secs",
                DEFAULT_REQUEST_TIMEOUT_SECS as i64,
            )?;

        if let Some(path) = &args.config {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).source(env))
            .set_override_option("listen", args.listen.clone())?
            .set_override_option("dish", args.dish.clone())?
            .set_override_option("gateway", args.gateway.clone())?
            .set_override_option("log_level", args.log_level.clone())?
            .set_override_option("metrics_path", args.metrics_path.clone())?
            .set_override_option("namespace", args.namespace.clone())?
            .set_override_option(
                "request_timeout_secs",
                args.request_timeout.map(|secs| secs as i64),
            )?
            .build()
            .context("failed to load configuration")?
            .try_deserialize()
            .context("invalid configuration")?;

        if settings.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The configured gateway, ignoring an empty value.
    pub fn gateway(&self) -> Option<&str> {
        self.gateway
            .as_deref()
            .map(str::trim)
            .filter(|gateway| !gateway.is_empty())
    }
}
