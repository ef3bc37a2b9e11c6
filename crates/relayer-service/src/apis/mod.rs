//! HTTP handlers for the relayer API.

pub mod build;
pub mod execute;
pub mod health;

use axum::extract::rejection::JsonRejection;
use relayer_types::{APIError, ApiErrorType};

/// Malformed or mistyped JSON bodies are reported like any other invalid
/// request.
pub(crate) fn json_rejection(rejection: JsonRejection) -> APIError {
	APIError::bad_request(ApiErrorType::Validation, rejection.body_text())
}
