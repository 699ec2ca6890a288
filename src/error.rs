use axum::{Json, extract::rejection::JsonRejection, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum VaultError {
    #[error("invalid `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("permission denied")]
    PermissionDenied,

    #[error("connection profile not found")]
    NotFound,

    /// Reserved for optimistic-concurrency tokens; nothing raises it yet.
    #[error("conflicting update")]
    Conflict,

    #[error("missing or invalid credentials")]
    Unauthorized,

    #[error("Database error: {0}")]
    Storage(#[from] SqlxError),

    #[error("secret codec error: {0}")]
    Codec(String),

    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),
}

impl VaultError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        VaultError::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// `NotFound` and `PermissionDenied` are one outcome to callers outside the
    /// store, so another principal's record is never confirmed to exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound | VaultError::PermissionDenied)
    }
}

impl IntoResponse for VaultError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            VaultError::Validation { field, reason } => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "VALIDATION_ERROR".to_string(),
                    message: reason,
                    field: Some(field),
                },
            ),
            VaultError::NotFound | VaultError::PermissionDenied => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: "Connection profile not found.".to_string(),
                    field: None,
                },
            ),
            VaultError::Conflict => (
                StatusCode::CONFLICT,
                ApiErrorBody {
                    code: "CONFLICT".to_string(),
                    message: "The profile was modified concurrently.".to_string(),
                    field: None,
                },
            ),
            VaultError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Authentication error.".to_string(),
                    field: None,
                },
            ),
            VaultError::Body(rejection) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "BAD_REQUEST".to_string(),
                    message: rejection.body_text(),
                    field: None,
                },
            ),
            VaultError::Storage(_) | VaultError::Codec(_) | VaultError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    field: None,
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

#[cfg(test)]
mod tests {
    use super::VaultError;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn permission_denied_is_indistinguishable_from_not_found() {
        let denied = VaultError::PermissionDenied.into_response();
        let missing = VaultError::NotFound.into_response();
        assert_eq!(denied.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert!(VaultError::PermissionDenied.is_not_found());
    }

    #[test]
    fn storage_errors_are_opaque() {
        let resp = VaultError::Storage(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_maps_to_bad_request() {
        let resp = VaultError::validation("port", "must be numeric").into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
