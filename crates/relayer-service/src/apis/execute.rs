//! `POST /v1/execute`: verifies and relays a signed intent.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use relayer_types::{APIError, ExecuteRequest, ExecuteResponse};

use super::json_rejection;
use crate::server::AppState;

pub async fn execute_intent(
	State(state): State<AppState>,
	payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Result<Json<ExecuteResponse>, APIError> {
	let Json(request) = payload.map_err(json_rejection)?;

	match state.pipeline.execute(&request).await {
		Ok(outcome) => Ok(Json(outcome.to_response())),
		Err(e) => {
			let api_error = APIError::from(e);
			if api_error.status_code() >= 500 {
				tracing::error!(signer = %request.intent.signer, "Execute failed: {}", api_error);
			} else {
				tracing::warn!(signer = %request.intent.signer, "Execute rejected: {}", api_error);
			}
			Err(api_error)
		},
	}
}
