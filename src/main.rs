use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use logmux::config::loader::{read_config, ConfigError};
use logmux::config::schema::parse_delimiter;
use logmux::config::validation::validate_config;
use logmux::config::DaemonConfig;
use logmux::lifecycle;
use logmux::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "logmux", version)]
#[command(about = "Aggregate newline-delimited logs from many sockets into one stream", long_about = None)]
struct Cli {
    /// TOML configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on: host:port for TCP, otherwise a Unix socket path
    #[arg(short, long)]
    listen: Option<String>,

    /// Output file, use - for stdout
    #[arg(short, long)]
    out: Option<String>,

    /// Line delimiter: a single character, \n, \r, \t, \0 or 0xNN
    #[arg(long, value_parser = parse_delimiter)]
    delimiter: Option<u8>,

    /// Wait after SIGINT/SIGTERM before cancelling connections
    #[arg(long)]
    grace_period_ms: Option<u64>,

    /// Upper bound on waiting for connections to drain
    #[arg(long)]
    drain_timeout_ms: Option<u64>,

    /// Diagnostic log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn load(&self) -> Result<DaemonConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => DaemonConfig::default(),
        };

        if let Some(listen) = &self.listen {
            config.listener.address = listen.clone();
        }
        if let Some(out) = &self.out {
            config.output.path = out.clone();
        }
        if let Some(delimiter) = self.delimiter {
            config.pipeline.delimiter = delimiter;
        }
        if let Some(ms) = self.grace_period_ms {
            config.shutdown.grace_period_ms = ms;
        }
        if let Some(ms) = self.drain_timeout_ms {
            config.shutdown.drain_timeout_ms = ms;
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        if let Some(addr) = &self.metrics_address {
            config.observability.metrics_address = Some(addr.clone());
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load() {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&Default::default());
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "logmux starting");
    tracing::info!(
        listen = %config.listener.address,
        output = %config.output.path,
        delimiter = config.pipeline.delimiter,
        grace_period_ms = config.shutdown.grace_period_ms,
        drain_timeout_ms = config.shutdown.drain_timeout_ms,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        // Validation already checked the address parses.
        if let Ok(addr) = addr.parse() {
            metrics::init_metrics(addr);
        }
    }

    match lifecycle::run(&config).await {
        Ok(report) => {
            tracing::info!(
                connections = report.serve.connections,
                lines = report.sink.lines,
                bytes = report.sink.bytes,
                drain_timed_out = report.drain_timed_out,
                "Shutdown complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Exited with error");
            ExitCode::FAILURE
        }
    }
}
