//! `GET /health`.

use axum::{extract::State, Json};
use relayer_types::HealthResponse;

use crate::server::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
	Json(HealthResponse {
		ok: true,
		relayer: state.relayer.to_checksum(None),
		settlement: state.settlement.to_checksum(None),
		chain_id: state.chain_id,
	})
}
