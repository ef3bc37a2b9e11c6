//! `POST /v1/build-intent`: returns an unsigned intent with a reserved nonce.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use relayer_types::{APIError, BuildIntentRequest, BuildIntentResponse, SwapIntentWire};

use super::json_rejection;
use crate::server::AppState;

pub async fn build_intent(
	State(state): State<AppState>,
	payload: Result<Json<BuildIntentRequest>, JsonRejection>,
) -> Result<Json<BuildIntentResponse>, APIError> {
	let Json(request) = payload.map_err(json_rejection)?;

	match state.pipeline.build(&request).await {
		Ok(intent) => Ok(Json(BuildIntentResponse {
			chain_id: state.chain_id,
			intent: SwapIntentWire::from(&intent),
		})),
		Err(e) => {
			tracing::warn!(signer = %request.signer, "Build intent rejected: {}", e);
			Err(APIError::from(e))
		},
	}
}
