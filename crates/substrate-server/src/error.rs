// crates/substrate-server/src/error.rs
// ============================================================================
// Module: HTTP Error Response
// Description: Renders SubstrateError as the uniform JSON error envelope.
// Purpose: The one place a SubstrateError becomes an axum response.
// Dependencies: axum, substrate-core
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use substrate_core::AdapterError;
use substrate_core::SubstrateError;

/// Wraps [`SubstrateError`] so it can be returned directly from an axum handler.
pub struct ApiError(pub SubstrateError);

impl From<SubstrateError> for ApiError {
    fn from(err: SubstrateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = self.0.to_envelope();
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(envelope)).into_response()
    }
}

/// Maps a backend-agnostic [`AdapterError`] onto the richer [`SubstrateError`]
/// taxonomy a handler returns, without losing the adapter's detail text.
#[must_use]
pub fn map_adapter_error(err: AdapterError) -> SubstrateError {
    match err {
        AdapterError::Unavailable(detail) => SubstrateError::BackendUnavailable(detail),
        AdapterError::Invalid(detail) => SubstrateError::ConfigInvalid(detail),
        AdapterError::TooLarge {
            path,
            max_bytes,
            actual_bytes,
        } => SubstrateError::ConfigInvalid(format!("{path} exceeds max size: {actual_bytes} > {max_bytes}")),
        AdapterError::VersionConflict {
            expected_version,
            current_version,
        } => SubstrateError::VersionConflict {
            expected_version,
            current_version,
        },
        AdapterError::CursorInvalid => SubstrateError::CursorInvalid,
    }
}
