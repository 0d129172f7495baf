//! Error types for SCIM bridge operations.
//!
//! Every failure in the protocol engine maps 1:1 onto a terminal SCIM wire
//! error: an HTTP status code plus a `scimType` keyword carried in the
//! standard error body. Nothing is recovered locally and multi-write
//! sequences are not rolled back; the variants here are the complete
//! taxonomy a caller can observe.

use crate::protocol::{ERROR_URN, ErrorBody};

/// Main error type for SCIM bridge operations.
///
/// Each variant corresponds to exactly one wire-level error response. The
/// `detail` string is client-visible and must not leak server internals
/// beyond what the matching endpoint would say.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScimError {
    /// Malformed value or shape in the request (e.g. non-boolean `active`)
    #[error("Bad request: {detail}")]
    BadRequest { detail: String },

    /// Missing or invalid bearer token
    #[error("Unauthorized: {detail}")]
    Unauthorized { detail: String },

    /// SCIM provisioning is disabled for this deployment
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },

    /// Unknown resource id or discovery document
    #[error("Not found: {detail}")]
    NotFound { detail: String },

    /// Uniqueness violation on `userName` (email) or group `displayName`
    #[error("Conflict: {detail}")]
    Conflict { detail: String },

    /// Unsupported filter, sort, projection, or PATCH (op, path) pair
    #[error("Not implemented: {detail}")]
    NotImplemented { detail: String },

    /// Version precondition failed (advertised but never raised: ETag
    /// concurrency is not supported)
    #[error("Precondition failed: {detail}")]
    PreconditionFailed { detail: String },

    /// The directory store failed or returned nothing where a record was
    /// required
    #[error("Internal server error: {detail}")]
    Internal { detail: String },
}

impl ScimError {
    /// Create a bad request error.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized {
            detail: detail.into(),
        }
    }

    /// Create a forbidden error.
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Create a uniqueness conflict error.
    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::Conflict {
            detail: detail.into(),
        }
    }

    /// Create a not implemented error.
    pub fn not_implemented(detail: impl Into<String>) -> Self {
        Self::NotImplemented {
            detail: detail.into(),
        }
    }

    /// Create an internal server error.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::Internal {
            detail: detail.into(),
        }
    }

    /// The HTTP status code this error maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Forbidden { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::PreconditionFailed { .. } => 412,
            Self::Internal { .. } => 500,
            Self::NotImplemented { .. } => 501,
        }
    }

    /// The SCIM `scimType` keyword for the wire error body.
    pub fn scim_type(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "invalidValue",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Forbidden { .. } => "forbidden",
            Self::NotFound { .. } => "notFound",
            Self::Conflict { .. } => "uniqueness",
            Self::PreconditionFailed { .. } => "preconditionFailed",
            Self::Internal { .. } => "internalServerError",
            Self::NotImplemented { .. } => "notImplemented",
        }
    }

    /// The client-visible detail message.
    pub fn detail(&self) -> &str {
        match self {
            Self::BadRequest { detail }
            | Self::Unauthorized { detail }
            | Self::Forbidden { detail }
            | Self::NotFound { detail }
            | Self::Conflict { detail }
            | Self::NotImplemented { detail }
            | Self::PreconditionFailed { detail }
            | Self::Internal { detail } => detail,
        }
    }

    /// Render the standard SCIM error body for this error.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            schemas: vec![ERROR_URN.to_string()],
            detail: Some(self.detail().to_string()),
            status: Some(self.status().to_string()),
            scim_type: Some(self.scim_type().to_string()),
        }
    }
}

/// Result type alias for SCIM bridge operations.
pub type ScimResult<T> = Result<T, ScimError>;

/// Wrap a directory store failure as an internal error.
///
/// Store errors are opaque to SCIM clients; the original error is preserved
/// in the detail for server-side logs only.
pub fn store_error<E: std::error::Error>(error: E) -> ScimError {
    ScimError::internal(format!("directory store error: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_scim_type_pairing() {
        let cases = [
            (ScimError::bad_request("x"), 400, "invalidValue"),
            (ScimError::unauthorized("x"), 401, "unauthorized"),
            (ScimError::forbidden("x"), 403, "forbidden"),
            (ScimError::not_found("x"), 404, "notFound"),
            (ScimError::conflict("x"), 409, "uniqueness"),
            (ScimError::not_implemented("x"), 501, "notImplemented"),
            (ScimError::internal("x"), 500, "internalServerError"),
        ];
        for (error, status, scim_type) in cases {
            assert_eq!(error.status(), status);
            assert_eq!(error.scim_type(), scim_type);
        }
    }

    #[test]
    fn error_body_carries_urn_and_stringified_status() {
        let body = ScimError::conflict("email taken").to_body();
        assert_eq!(body.schemas, vec![ERROR_URN.to_string()]);
        assert_eq!(body.status.as_deref(), Some("409"));
        assert_eq!(body.scim_type.as_deref(), Some("uniqueness"));
        assert_eq!(body.detail.as_deref(), Some("email taken"));
    }

    #[test]
    fn store_error_is_internal() {
        let io = std::io::Error::other("disk gone");
        let error = store_error(io);
        assert_eq!(error.status(), 500);
        assert!(error.detail().contains("disk gone"));
    }
}
