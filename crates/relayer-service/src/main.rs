//! Main entry point for the relayer HTTP service.
//!
//! Loads `.env` when present, then the TOML configuration, builds the
//! pipeline and serves the API until Ctrl-C or SIGTERM.

use std::path::PathBuf;

use clap::Parser;
use relayer_config::Config;
use relayer_service::{build_state_from_config, server};

/// Command-line arguments for the relayer service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/relayer.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();
	let _ = dotenvy::dotenv();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started relayer");

	let config = Config::from_file(&args.config.to_string_lossy()).await?;
	tracing::info!(
		config = %args.config.display(),
		rpc = %relayer_types::redact_rpc_url(&config.rpc.url),
		"Loaded configuration"
	);

	let state = build_state_from_config(&config).await?;
	server::start_server(&config.api, state, shutdown_signal()).await?;

	tracing::info!("Stopped relayer");
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
