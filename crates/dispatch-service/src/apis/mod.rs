//! API endpoint implementations for the dispatch coordinator.

pub mod orders;
pub mod profiles;
pub mod tracking;

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use dispatch_core::CoordinatorError;
use dispatch_types::ErrorResponse;

/// Wrapper turning coordinator errors into HTTP responses.
///
/// Every rejection carries a stable machine-readable code plus the
/// human-readable reason naming the precondition that failed, so clients
/// refresh and show actual state instead of retrying blindly.
pub struct ApiError(pub CoordinatorError);

impl From<CoordinatorError> for ApiError {
	fn from(err: CoordinatorError) -> Self {
		ApiError(err)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, code) = match &self.0 {
			CoordinatorError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
			CoordinatorError::Denied(_) => (StatusCode::CONFLICT, "TRANSITION_DENIED"),
			CoordinatorError::Unauthorized(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
			CoordinatorError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
			CoordinatorError::NoPartnerAvailable => {
				(StatusCode::SERVICE_UNAVAILABLE, "NO_PARTNER_AVAILABLE")
			},
			CoordinatorError::VendorLocationMissing => {
				(StatusCode::CONFLICT, "VENDOR_LOCATION_MISSING")
			},
			CoordinatorError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
			CoordinatorError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
			CoordinatorError::Divergence { .. } => {
				(StatusCode::INTERNAL_SERVER_ERROR, "STATE_DIVERGED")
			},
		};
		if status.is_server_error() {
			tracing::error!(error = %self.0, "Request failed");
		} else {
			tracing::debug!(error = %self.0, "Request rejected");
		}
		(
			status,
			Json(ErrorResponse {
				error: code.to_string(),
				message: self.0.to_string(),
			}),
		)
			.into_response()
	}
}
