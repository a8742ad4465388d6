use std::path::PathBuf;

use clap::Parser;
use quorumcast::config::{Config, Tuning};
use quorumcast::server::Server;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Group chat broadcast server with coordinated shutdown
#[derive(Parser, Debug)]
#[command(name = "quorumcast")]
#[command(version)]
struct Args {
    /// Port to listen on
    port: u16,

    /// Number of clients that must finish before the group shuts down
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    expected_clients: u32,

    /// YAML file with buffer sizes and timeouts
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_level(true))
        .with(filter)
        .init();

    let tuning = match &args.config {
        Some(path) => Tuning::load_file(path)?,
        None => Tuning::default(),
    };
    let cfg = Config::load(args.port, args.expected_clients as usize)?.with_tuning(tuning);

    let summary = Server::bind(&cfg)?.run()?;
    tracing::info!(
        notified = summary.notified,
        undelivered = summary.undelivered,
        "Exiting"
    );

    Ok(())
}
