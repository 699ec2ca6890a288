use crate::error::VaultError;
use crate::router::VaultState;
use crate::types::ids::PrincipalId;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, request::Parts};
use std::str::FromStr;
use subtle::ConstantTimeEq;
use tracing::debug;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const PRINCIPAL_HEADER: &str = "x-principal-id";

/// Ensure the inbound request carries the service key.
/// Accepts either:
/// - Header: `x-api-key: ...`
/// - Header: `Authorization: Bearer ...`
pub fn ensure_authorized(headers: &HeaderMap, expected: &str) -> Result<(), VaultError> {
    if expected.is_empty() {
        return Err(VaultError::Unauthorized);
    }
    let key_matches = |candidate: &str| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes()));

    if let Some(hv) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok())
        && key_matches(hv)
    {
        return Ok(());
    }

    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && key_matches(token)
        {
            return Ok(());
        }
    }

    Err(VaultError::Unauthorized)
}

/// The principal the identity provider authenticated for this request.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedPrincipal(pub PrincipalId);

impl FromRequestParts<VaultState> for AuthenticatedPrincipal {
    type Rejection = VaultError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &VaultState,
    ) -> Result<Self, Self::Rejection> {
        ensure_authorized(&parts.headers, &state.api_key)?;

        let principal = parts
            .headers
            .get(PRINCIPAL_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| PrincipalId::from_str(v.trim()).ok())
            .ok_or_else(|| {
                debug!("request without a valid principal header");
                VaultError::Unauthorized
            })?;
        Ok(Self(principal))
    }
}
