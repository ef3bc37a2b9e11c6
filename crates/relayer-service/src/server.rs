//! HTTP server for the relayer API.
//!
//! Three routes: `GET /health`, `POST /v1/build-intent` and
//! `POST /v1/execute`. Every failure is a JSON `{ "error": ... }` body with
//! status 400 or 500.

use std::sync::Arc;

use alloy_primitives::Address;
use axum::{
	extract::DefaultBodyLimit,
	routing::{get, post},
	Router,
};
use relayer_config::ApiConfig;
use relayer_core::IntentPipeline;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::apis::{build::build_intent, execute::execute_intent, health::health};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub pipeline: Arc<IntentPipeline>,
	/// Relay account paying for gas.
	pub relayer: Address,
	pub settlement: Address,
	pub chain_id: u64,
}

/// Routes and middleware, without binding a socket.
pub fn router(state: AppState, max_request_size: usize) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/build-intent", post(build_intent))
		.route("/v1/execute", post(execute_intent))
		.layer(DefaultBodyLimit::max(max_request_size))
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Binds `api_config.host:port` and serves until `shutdown` resolves.
pub async fn start_server(
	api_config: &ApiConfig,
	state: AppState,
	shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!(
		relayer = %state.relayer.to_checksum(None),
		settlement = %state.settlement.to_checksum(None),
		chain_id = state.chain_id,
		"Relayer listening on http://{}",
		bind_address
	);

	let app = router(state, api_config.max_request_size);
	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}
