//! Command-line and environment configuration of the server binary.

use std::time::Duration;

use clap::Parser;

use vendops_infra::AppConfig;
use vendops_infra::config::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECS, DEFAULT_LOW_STOCK_THRESHOLD};
use vendops_observability::LogFormat;

/// Vending operations API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "vendops-api", version, about)]
pub struct Args {
    /// Address to listen on.
    #[arg(long, env = "VENDOPS_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// SQLite database URL (e.g. `sqlite://vendops.db`); state stays in memory when unset.
    #[arg(long, env = "VENDOPS_DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "VENDOPS_CACHE_TTL_SECS", default_value_t = DEFAULT_CACHE_TTL_SECS)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = "VENDOPS_CACHE_CAPACITY", default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,

    /// Slots below this stock are reported as low stock.
    #[arg(long, env = "VENDOPS_LOW_STOCK_THRESHOLD", default_value_t = DEFAULT_LOW_STOCK_THRESHOLD)]
    pub low_stock_threshold: i64,

    /// Precompute the common analytics views before serving.
    #[arg(long, env = "VENDOPS_WARM_CACHE", default_value_t = false)]
    pub warm_cache: bool,

    /// `json` or `pretty`.
    #[arg(long, env = "VENDOPS_LOG_FORMAT", default_value = "json")]
    pub log_format: LogFormat,
}

impl Args {
    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            database_url: self.database_url.clone().filter(|u| !u.trim().is_empty()),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_capacity: self.cache_capacity,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_app_config() {
        let args = Args::try_parse_from([
            "vendops-api",
            "--database-url",
            "sqlite::memory:",
            "--cache-ttl-secs",
            "60",
            "--low-stock-threshold",
            "3",
            "--warm-cache",
            "--log-format",
            "pretty",
        ])
        .unwrap();
        assert!(args.warm_cache);
        assert_eq!(args.log_format, LogFormat::Pretty);

        let config = args.app_config();
        assert_eq!(config.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.cache_capacity, DEFAULT_CACHE_CAPACITY);
        assert_eq!(config.low_stock_threshold, 3);
    }

    #[test]
    fn bad_log_format_is_rejected() {
        assert!(Args::try_parse_from(["vendops-api", "--log-format", "xml"]).is_err());
    }
}
