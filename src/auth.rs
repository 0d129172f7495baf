//! Bearer-token gate for inbound provisioning requests.
//!
//! Every SCIM request passes through [`verify_request`] before any other
//! processing: the feature flag is checked first (disabled → Forbidden),
//! then the `Authorization` header is parsed and the presented token is
//! compared against the configured one in constant time. No store call
//! happens before this gate passes.

use crate::error::{ScimError, ScimResult};
use log::warn;
use subtle::ConstantTimeEq;

/// Provisioning configuration owned by the host application.
#[derive(Debug, Clone, Default)]
pub struct ScimConfig {
    /// Master switch; when off, every request is refused outright
    pub enabled: bool,
    /// The static bearer token provisioning clients must present
    pub bearer_token: Option<String>,
}

impl ScimConfig {
    /// Enabled configuration with the given token.
    pub fn new(bearer_token: impl Into<String>) -> Self {
        Self {
            enabled: true,
            bearer_token: Some(bearer_token.into()),
        }
    }

    /// Disabled configuration.
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Verify a request's `Authorization` header against the configuration.
///
/// Ordering matters: the enablement check short-circuits with Forbidden
/// before any credential handling, and a missing server-side token is an
/// internal misconfiguration whose detail is deliberately vague.
pub fn verify_request(config: &ScimConfig, authorization: Option<&str>) -> ScimResult<()> {
    if !config.enabled {
        return Err(ScimError::forbidden("SCIM is not enabled"));
    }

    let Some(header) = authorization else {
        return Err(ScimError::unauthorized(
            "Not authenticated: missing Authorization header",
        ));
    };

    let (scheme, credentials) = header.split_once(' ').unwrap_or((header, ""));
    let credentials = credentials.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || credentials.is_empty() {
        return Err(ScimError::unauthorized(
            "Invalid authentication scheme or missing token",
        ));
    }

    let Some(expected) = config.bearer_token.as_deref().filter(|t| !t.is_empty()) else {
        warn!("SCIM bearer token is not configured; refusing request");
        return Err(ScimError::internal("SCIM token is not configured"));
    };

    let matches: bool = expected
        .as_bytes()
        .ct_eq(credentials.as_bytes())
        .into();
    if !matches {
        return Err(ScimError::unauthorized("Invalid SCIM token"));
    }

    Ok(())
}
