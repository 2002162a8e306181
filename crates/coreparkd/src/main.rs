//! coreparkd — the core-parking daemon.
//!
//! Assembles the controller on top of the Linux platform:
//! - sysfs hotplug control and procfs load counters
//! - topology watcher feeding the controller's event queue
//! - admin REST API
//!
//! # Usage
//!
//! ```text
//! coreparkd --config /etc/corepark.toml --active
//! coreparkd --target-qof 600 --period-ms 100 --listen 127.0.0.1:8455
//! ```

mod daemon;

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

use corepark_core::CoreparkConfig;

#[derive(Parser)]
#[command(name = "coreparkd", about = "Adaptive core-parking daemon")]
struct Cli {
    /// Path to corepark.toml. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Admin API listen address.
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// QoS floor in 0..=1000.
    #[arg(long)]
    target_qof: Option<u32>,

    /// Control period in milliseconds.
    #[arg(long)]
    period_ms: Option<u32>,

    /// Start parking immediately instead of waiting for the admin API.
    #[arg(long)]
    active: bool,

    /// Print the effective configuration and exit.
    #[arg(long)]
    dump_config: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Load the config file (if any) and apply command-line overrides.
    fn resolve_config(&self) -> anyhow::Result<CoreparkConfig> {
        let mut config = match &self.config {
            Some(path) => CoreparkConfig::from_file(path)?,
            None => CoreparkConfig::default(),
        };

        if let Some(listen) = self.listen {
            config.admin.listen = listen;
        }
        if let Some(qof) = self.target_qof {
            config.controller.target_qof = qof;
        }
        if let Some(period) = self.period_ms {
            config.controller.period_ms = period;
        }
        if self.active {
            config.controller.start_active = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,coreparkd=debug,corepark=debug".parse().unwrap());
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    let config = cli.resolve_config()?;

    if cli.dump_config {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    daemon::run(config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let cli = Cli::parse_from([
            "coreparkd",
            "--target-qof",
            "600",
            "--period-ms",
            "100",
            "--listen",
            "0.0.0.0:9000",
            "--active",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.controller.target_qof, 600);
        assert_eq!(config.controller.period_ms, 100);
        assert_eq!(config.admin.listen.port(), 9000);
        assert!(config.controller.start_active);
        assert_eq!(config.controller.smoothing_coefficient, 4);
    }

    #[test]
    fn out_of_range_override_is_rejected() {
        let cli = Cli::parse_from(["coreparkd", "--target-qof", "1200"]);
        assert!(cli.resolve_config().is_err());
    }

    #[test]
    fn file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corepark.toml");
        std::fs::write(&path, "[controller]\ntarget_qof = 300\nperiod_ms = 50\n").unwrap();

        let cli = Cli::parse_from([
            "coreparkd",
            "--config",
            path.to_str().unwrap(),
            "--period-ms",
            "75",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.controller.target_qof, 300);
        assert_eq!(config.controller.period_ms, 75);
    }
}
