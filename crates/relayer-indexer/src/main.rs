//! Entry point for the `IntentExecuted` indexer.
//!
//! Reads the same configuration file as the relayer but needs no signing
//! key: only the RPC URL, the settlement address and the `[indexer]`
//! section are used. Exits 0 after Ctrl-C or SIGTERM once the chunk in
//! flight has finished, and non-zero on any RPC or storage failure.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use relayer_config::Config;
use relayer_delivery::{AlloyChain, AlloyChainConfig};
use relayer_indexer::{ChainIndexer, IndexerSettings};
use relayer_storage::{CheckpointStore, EventLog};
use relayer_types::redact_rpc_url;
use tokio::sync::broadcast;

/// Command-line arguments for the indexer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/indexer.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let _ = dotenvy::dotenv();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	let settings = IndexerSettings::from_config(&config);

	tracing::info!(
		settlement = %settings.settlement.to_checksum(None),
		rpc = %redact_rpc_url(&config.rpc.url),
		events_path = %config.indexer.events_path.display(),
		checkpoint_path = %config.indexer.checkpoint_path.display(),
		"Indexer boot"
	);

	let chain = AlloyChain::read_only(&AlloyChainConfig {
		rpc_url: config.rpc.url.clone(),
		chain_id: config.relayer.chain_id,
		poll_interval: Duration::from_millis(config.rpc.poll_interval_ms),
		receipt_timeout: Duration::from_secs(config.rpc.receipt_timeout_seconds),
	})?;

	let indexer = ChainIndexer::new(
		Arc::new(chain),
		EventLog::new(config.indexer.events_path.clone()),
		CheckpointStore::new(config.indexer.checkpoint_path.clone()),
		settings,
	);

	let (stop_tx, stop_rx) = broadcast::channel(1);
	tokio::spawn(async move {
		shutdown_signal().await;
		tracing::info!("Shutdown requested");
		let _ = stop_tx.send(());
	});

	if let Err(e) = indexer.run(stop_rx).await {
		tracing::error!(error = %e, "Indexer failed");
		return Err(e.into());
	}
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		let _ = tokio::signal::ctrl_c().await;
	};

	#[cfg(unix)]
	let terminate = async {
		match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
			Ok(mut signal) => {
				signal.recv().await;
			},
			Err(e) => {
				tracing::warn!(error = %e, "Failed to install SIGTERM handler");
				std::future::pending::<()>().await;
			},
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
