//! HTTP API types for the relayer.
//!
//! Request and response bodies for `/health`, `/v1/build-intent` and
//! `/v1/execute`, plus the structured [`APIError`] every handler returns on
//! failure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::IntentExecutedPayload;
use crate::intent::SwapIntentWire;

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
	pub ok: bool,
	/// Address of the relay account paying for gas.
	pub relayer: String,
	pub settlement: String,
	pub chain_id: u64,
}

/// Body of `POST /v1/build-intent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildIntentRequest {
	pub signer: String,
	pub token_in: String,
	pub token_out: String,
	/// Decimal string.
	pub amount_in: String,
	/// Decimal string, defaults to the configured minimum.
	#[serde(default)]
	pub min_amount_out: Option<String>,
	/// Pool fee tier for the adapter, defaults to the configured fee.
	#[serde(default)]
	pub fee: Option<u32>,
	/// Adapter override, defaults to the configured adapter.
	#[serde(default)]
	pub adapter: Option<String>,
}

/// Response of `POST /v1/build-intent`: the unsigned intent to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildIntentResponse {
	pub chain_id: u64,
	pub intent: SwapIntentWire,
}

/// Body of `POST /v1/execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
	pub chain_id: u64,
	pub intent: SwapIntentWire,
	/// 65-byte `r || s || v` signature as 0x hex.
	pub signature: String,
}

/// Final status of a relayed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
	Success,
	Reverted,
}

/// Response of `POST /v1/execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
	pub tx_hash: String,
	pub status: ExecutionStatus,
	/// Block number as a decimal string.
	pub block_number: String,
	/// Decoded `IntentExecuted` event, `null` when absent or undecodable.
	pub intent_executed: Option<IntentExecutedPayload>,
}

/// Coarse error category, reported as `code` in error bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
	Configuration,
	Validation,
	Policy,
	Signature,
	ChainRpc,
	Storage,
	Internal,
}

impl fmt::Display for ApiErrorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			ApiErrorType::Configuration => "configuration",
			ApiErrorType::Validation => "validation",
			ApiErrorType::Policy => "policy",
			ApiErrorType::Signature => "signature",
			ApiErrorType::ChainRpc => "chain_rpc",
			ApiErrorType::Storage => "storage",
			ApiErrorType::Internal => "internal",
		};
		write!(f, "{}", s)
	}
}

/// JSON error body: `{ "error": message, "code": category, "detail"?: cause, ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub code: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
	/// Extra top-level fields, e.g. `recovered` and `expected` on a signer mismatch.
	#[serde(flatten)]
	pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Rejected request (400)
	BadRequest {
		error_type: ApiErrorType,
		message: String,
		detail: Option<String>,
		fields: serde_json::Map<String, serde_json::Value>,
	},
	/// Failure on the relayer side (500)
	InternalServerError {
		error_type: ApiErrorType,
		message: String,
		detail: Option<String>,
	},
}

impl APIError {
	pub fn bad_request(error_type: ApiErrorType, message: impl Into<String>) -> Self {
		APIError::BadRequest {
			error_type,
			message: message.into(),
			detail: None,
			fields: serde_json::Map::new(),
		}
	}

	pub fn internal(
		error_type: ApiErrorType,
		message: impl Into<String>,
		detail: Option<String>,
	) -> Self {
		APIError::InternalServerError {
			error_type,
			message: message.into(),
			detail,
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::BadRequest {
				error_type,
				message,
				detail,
				fields,
			} => ErrorResponse {
				error: message.clone(),
				code: error_type.to_string(),
				detail: detail.clone(),
				fields: fields.clone(),
			},
			APIError::InternalServerError {
				error_type,
				message,
				detail,
			} => ErrorResponse {
				error: message.clone(),
				code: error_type.to_string(),
				detail: detail.clone(),
				fields: serde_json::Map::new(),
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = match self.status_code() {
			400 => StatusCode::BAD_REQUEST,
			_ => StatusCode::INTERNAL_SERVER_ERROR,
		};

		(status, Json(self.to_error_response())).into_response()
	}
}
