//! Service error types with HTTP status code mapping.
//!
//! [`HubError`] is the central error type. Each variant maps to an HTTP
//! status code, a numeric error code and the JSON response envelope shared
//! with successful responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// JSON body returned for every failed API request.
///
/// Mirrors the success envelope so clients can branch on `success`:
/// ```json
/// {
///   "statusCode": 409,
///   "code": 2101,
///   "message": "this coupon is already downloaded",
///   "data": null,
///   "success": false
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// HTTP status code repeated in the body.
    pub status_code: u16,
    /// Numeric error code (see the table on [`HubError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Always `null` for errors.
    pub data: Option<serde_json::Value>,
    /// Always `false` for errors.
    pub success: bool,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                 |
/// |-----------|-----------------------|-----------------------------|
/// | 1000–1099 | Validation            | 400 Bad Request             |
/// | 1100–1199 | Authentication/Roles  | 401 / 403                   |
/// | 2000–2099 | Not Found             | 404 Not Found               |
/// | 2100–2199 | Conflict              | 409 Conflict                |
/// | 3000–3999 | Server / Dependencies | 500 Internal Server Error   |
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Malformed or contradictory input.
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid bearer credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the role or ownership required.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Coupon with the given ID does not exist.
    #[error("coupon with id {0} doesn't exist")]
    CouponNotFound(uuid::Uuid),

    /// Category with the given ID does not exist.
    #[error("category with id {0} doesn't exist")]
    CategoryNotFound(uuid::Uuid),

    /// Download ledger entry does not exist.
    #[error("downloaded coupon {0} not found")]
    LedgerEntryNotFound(uuid::Uuid),

    /// Profile with the given ID does not exist.
    #[error("profile with id {0} doesn't exist")]
    ProfileNotFound(uuid::Uuid),

    /// The caller already holds a ledger entry for this coupon.
    #[error("this coupon is already downloaded")]
    AlreadyDownloaded,

    /// Generic uniqueness or reference conflict.
    #[error("{0}")]
    Conflict(String),

    /// An external collaborator (media upload, token signing) failed.
    #[error("dependency failure: {0}")]
    Dependency(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Validation(_) => 1001,
            Self::Unauthorized(_) => 1101,
            Self::Forbidden(_) => 1102,
            Self::CouponNotFound(_) => 2001,
            Self::CategoryNotFound(_) => 2002,
            Self::LedgerEntryNotFound(_) => 2003,
            Self::ProfileNotFound(_) => 2004,
            Self::AlreadyDownloaded => 2101,
            Self::Conflict(_) => 2102,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::Dependency(_) => 3002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::CouponNotFound(_)
            | Self::CategoryNotFound(_)
            | Self::LedgerEntryNotFound(_)
            | Self::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            Self::AlreadyDownloaded | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Dependency(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show to clients. Server-side failures are replaced by
    /// a generic text; the detail only goes to the log.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        let body = ErrorResponse {
            status_code: status.as_u16(),
            code: self.error_code(),
            message: self.public_message(),
            data: None,
            success: false,
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

impl From<MultipartError> for HubError {
    fn from(err: MultipartError) -> Self {
        Self::Validation(format!("invalid multipart body: {}", err.body_text()))
    }
}

impl From<MultipartRejection> for HubError {
    fn from(err: MultipartRejection) -> Self {
        Self::Validation(format!("invalid multipart body: {}", err.body_text()))
    }
}

impl From<QueryRejection> for HubError {
    fn from(err: QueryRejection) -> Self {
        Self::Validation(format!("invalid query string: {}", err.body_text()))
    }
}

impl From<JsonRejection> for HubError {
    fn from(err: JsonRejection) -> Self {
        Self::Validation(format!("invalid JSON body: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(HubError::AlreadyDownloaded.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            HubError::Conflict("category is in use".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn server_errors_hide_detail() {
        let err = HubError::Persistence("connection reset by peer".to_string());
        assert_eq!(err.public_message(), "Internal Server Error");
        assert_eq!(err.error_code(), 3001);
    }

    #[test]
    fn client_errors_keep_message() {
        let err = HubError::Validation("bad date".to_string());
        assert_eq!(err.public_message(), "bad date");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
