pub mod worker;

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use nc_service::NeuralCache;

#[derive(Debug, Parser)]
#[command(
	version = nc_cli::VERSION,
	rename_all = "kebab",
	styles = nc_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Run a single sweep and exit.
	#[arg(long)]
	pub once: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = nc_config::load(&args.config)?;

	init_tracing(&config);

	let cache = NeuralCache::open(&config)?;

	if args.once {
		let report = cache.sweep.run_once(time::OffsetDateTime::now_utc());

		tracing::info!(
			pheromones_purged = report.pheromones_purged,
			narrative_reset = report.narrative_reset,
			flushed = report.flushed,
			"Single retention sweep finished."
		);

		return Ok(());
	}

	let interval = Duration::from_secs(config.retention.sweep_interval_s);

	tracing::info!(interval_s = config.retention.sweep_interval_s, "Retention worker started.");

	worker::run_sweeps(&cache.sweep, interval, shutdown_signal()).await;

	Ok(())
}

fn init_tracing(config: &nc_config::Config) {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %err, "Failed to listen for Ctrl-C. Running until killed.");

		std::future::pending::<()>().await;
	}
}
