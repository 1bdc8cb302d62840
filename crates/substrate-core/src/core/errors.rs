// crates/substrate-core/src/core/errors.rs
// ============================================================================
// Module: Substrate Error Taxonomy
// Description: Crate-wide error enum mapping every failure kind to an HTTP status.
// Purpose: Give the HTTP boundary a single, uniform error envelope to render.
// Dependencies: crate::core::model, serde, thiserror
// ============================================================================

//! ## Overview
//! Every subsystem error ultimately converts into [`SubstrateError`]. The
//! conversion is total: no subsystem error is allowed to be swallowed into a
//! generic 500 without an explicit, named kind. Propagation policy: adapter
//! errors are wrapped with `resource_kind`/`scope` context, never discarded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::model::ContextMismatch;
use crate::core::model::ResourceKind;

// ============================================================================
// SECTION: Error Enum
// ============================================================================

/// Uniform control-plane error, carrying everything the HTTP boundary needs
/// to render the JSON error envelope from the external interface contract.
#[derive(Debug, Error)]
pub enum SubstrateError {
    /// `X-Env` legacy header present.
    #[error("legacy X-Env header is forbidden")]
    LegacyEnvForbidden,
    /// `X-Mode` missing or not one of the valid modes.
    #[error("X-Mode header is required and must be saas, enterprise, or lab")]
    ModeRequired,
    /// `X-Project-Id` missing.
    #[error("X-Project-Id header is required")]
    ProjectRequired,
    /// `X-Tenant-Id` malformed.
    #[error("tenant id is malformed")]
    TenantInvalid,
    /// Resolved context conflicts with payload/path/query scope fields.
    #[error("context mismatch on {} field(s)", .0.len())]
    ContextMismatch(Vec<ContextMismatch>),
    /// Missing or invalid authentication.
    #[error("authentication missing or invalid")]
    AuthMissingOrInvalid,
    /// Bearer token tenant not in the caller's membership set.
    #[error("tenant is not a member")]
    TenantNotMember,
    /// Client attempted to override server-derived identity.
    #[error("identity override attempted on {} field(s)", .0.len())]
    IdentityOverride(Vec<ContextMismatch>),
    /// Resolved backend type is forbidden for the current mode.
    #[error("backend class forbidden for resource kind {resource_kind:?}: {backend_type}")]
    ForbiddenBackendClass {
        /// Resource kind the forbidden backend was resolved for.
        resource_kind: ResourceKind,
        /// The forbidden backend type string.
        backend_type: String,
    },
    /// A gate in the gate chain blocked the action.
    #[error("gate {gate} blocked action: {reason}")]
    GateBlocked {
        /// Name of the gate that blocked the action.
        gate: String,
        /// Human-readable reason the gate blocked the action.
        reason: String,
    },
    /// Requested record does not exist.
    #[error("not found")]
    NotFound,
    /// Optimistic-concurrency version conflict.
    #[error("version conflict: expected {expected_version:?}, current {current_version}")]
    VersionConflict {
        /// Version the caller expected.
        expected_version: Option<u64>,
        /// Actual current version.
        current_version: u64,
    },
    /// Stream cursor is unknown or invalid.
    #[error("cursor invalid")]
    CursorInvalid,
    /// Append to the durable stream failed.
    #[error("stream write failed: {0}")]
    StreamWriteFailed(String),
    /// Adapter backend is unavailable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// No route exists for the given resource kind/scope.
    #[error("missing route for resource kind {0:?}")]
    MissingRoute(ResourceKind),
    /// The request deadline expired before the operation completed.
    #[error("request timed out")]
    RequestTimeout,
    /// Configuration was invalid or missing at startup.
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),
}

impl SubstrateError {
    /// Returns the `error_code` string rendered in the JSON error envelope.
    #[must_use]
    pub fn error_code(&self) -> String {
        match self {
            Self::LegacyEnvForbidden => "context.legacy_env_forbidden".to_owned(),
            Self::ModeRequired => "context.mode_required".to_owned(),
            Self::ProjectRequired => "context.project_required".to_owned(),
            Self::TenantInvalid => "context.tenant_invalid".to_owned(),
            Self::ContextMismatch(_) => "context.context_mismatch".to_owned(),
            Self::AuthMissingOrInvalid => "auth.missing_or_invalid".to_owned(),
            Self::TenantNotMember => "auth.tenant_not_member".to_owned(),
            Self::IdentityOverride(_) => "auth.identity_override".to_owned(),
            Self::ForbiddenBackendClass { .. } => "forbidden_backend_class".to_owned(),
            Self::GateBlocked { gate, .. } => format!("gate.{gate}_blocked"),
            Self::NotFound => "not_found".to_owned(),
            Self::VersionConflict { .. } => "blackboard.version_conflict".to_owned(),
            Self::CursorInvalid => "stream.cursor_invalid".to_owned(),
            Self::StreamWriteFailed(_) => "stream_write_failed".to_owned(),
            Self::BackendUnavailable(_) => "backend_unavailable".to_owned(),
            Self::MissingRoute(kind) => format!("{}.missing_route", kind.as_str()),
            Self::RequestTimeout => "request_timeout".to_owned(),
            Self::ConfigInvalid(_) => "config.invalid".to_owned(),
        }
    }

    /// Returns the HTTP status code this error maps to.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::LegacyEnvForbidden
            | Self::ModeRequired
            | Self::ProjectRequired
            | Self::TenantInvalid
            | Self::ContextMismatch(_) => 400,
            Self::AuthMissingOrInvalid => 401,
            Self::TenantNotMember | Self::IdentityOverride(_) | Self::ForbiddenBackendClass { .. } | Self::GateBlocked { .. } => 403,
            Self::NotFound => 404,
            Self::VersionConflict { .. } => 409,
            Self::CursorInvalid => 410,
            Self::StreamWriteFailed(_) | Self::BackendUnavailable(_) | Self::ConfigInvalid(_) => 500,
            Self::MissingRoute(_) => 503,
            Self::RequestTimeout => 504,
        }
    }

    /// Renders the uniform JSON error envelope from the external interface contract.
    #[must_use]
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let (resource_kind, mismatches, gate) = match self {
            Self::ForbiddenBackendClass { resource_kind, .. } | Self::MissingRoute(resource_kind) => {
                (Some((*resource_kind).as_str().to_owned()), None, None)
            }
            Self::ContextMismatch(mismatches) | Self::IdentityOverride(mismatches) => {
                (None, Some(mismatches.clone()), None)
            }
            Self::GateBlocked { gate, .. } => (None, None, Some(gate.clone())),
            _ => (None, None, None),
        };
        ErrorEnvelope {
            error_code: self.error_code(),
            message: self.to_string(),
            resource_kind,
            mismatches,
            gate,
        }
    }
}

/// The uniform JSON error envelope rendered at the HTTP boundary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    /// Dotted `<domain>.<kind>` error code.
    pub error_code: String,
    /// Human-readable message.
    pub message: String,
    /// Resource kind associated with the error, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_kind: Option<String>,
    /// Context/identity mismatches associated with the error, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mismatches: Option<Vec<ContextMismatch>>,
    /// Gate name associated with the error, if applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_route_maps_to_503_with_kind_suffixed_code() {
        let err = SubstrateError::MissingRoute(ResourceKind::EventStream);
        assert_eq!(err.http_status(), 503);
        assert_eq!(err.error_code(), "event_stream.missing_route");
    }

    #[test]
    fn version_conflict_maps_to_409() {
        let err = SubstrateError::VersionConflict {
            expected_version: Some(2),
            current_version: 3,
        };
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.error_code(), "blackboard.version_conflict");
    }
}
