//! Shared DTO types used across multiple endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::persistence::PageWindow;

/// Envelope wrapping every successful API response.
///
/// ```json
/// {
///   "statusCode": 200,
///   "message": "Coupons fetched successfully",
///   "data": [],
///   "meta": { "total": 0, "totalPages": 0, "currentPage": 1, "limit": 10 },
///   "success": true
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// HTTP status code repeated in the body.
    pub status_code: u16,
    /// Human-readable outcome.
    pub message: String,
    /// Payload.
    pub data: T,
    /// Pagination metadata for list endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
    /// Always `true` for this envelope.
    pub success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    /// `200 OK` envelope.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::OK, message, data)
    }

    /// `201 Created` envelope.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::with_status(StatusCode::CREATED, message, data)
    }

    fn with_status(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
            data,
            meta: None,
            success: true,
        }
    }

    /// Attaches pagination metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: PaginationMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Pagination query parameters for list endpoints.
///
/// Values that are not a positive integer fall back to the defaults
/// instead of failing the request.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default = "default_page", deserialize_with = "page_or_default")]
    pub page: u32,
    /// Items per page (max 100). Defaults to 10.
    #[serde(default = "default_limit", deserialize_with = "limit_or_default")]
    pub limit: u32,
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    /// Total number of items.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
    /// Current page number.
    pub current_page: u32,
    /// Items per page.
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

/// Reads the leading digits of a query value; `"12abc"` gives 12 and
/// anything without leading digits gives `None`.
pub(crate) fn leading_int<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| {
        let digits: String = value
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok()
    }))
}

fn page_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(leading_int(deserializer)?
        .filter(|n| *n > 0)
        .unwrap_or_else(default_page))
}

fn limit_or_default<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(leading_int(deserializer)?
        .filter(|n| *n > 0)
        .unwrap_or_else(default_limit))
}

impl PaginationParams {
    /// Clamps `page` to at least 1 and `limit` to `1..=100`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, 100),
        }
    }

    /// Storage window for these parameters.
    #[must_use]
    pub fn window(&self) -> PageWindow {
        let p = self.clamped();
        PageWindow::new(p.page, p.limit)
    }

    /// Metadata for a result set of `total` items.
    #[must_use]
    pub fn meta(&self, total: u64) -> PaginationMeta {
        let p = self.clamped();
        PaginationMeta {
            total,
            total_pages: total.div_ceil(u64::from(p.limit)),
            current_page: p.page,
            limit: p.limit,
        }
    }
}

/// `?id=` query used by most coupon endpoints.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IdQuery {
    /// Target identifier.
    pub id: uuid::Uuid,
}

/// Empty payload for endpoints that only report success.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct Empty {}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn meta_rounds_pages_up() {
        let params = PaginationParams { page: 2, limit: 10 };
        assert_eq!(
            params.meta(21),
            PaginationMeta {
                total: 21,
                total_pages: 3,
                current_page: 2,
                limit: 10,
            }
        );
        assert_eq!(params.meta(0).total_pages, 0);
    }

    #[test]
    fn params_are_clamped() {
        let params = PaginationParams { page: 0, limit: 500 }.clamped();
        assert_eq!((params.page, params.limit), (1, 100));
        assert_eq!(
            PaginationParams { page: 3, limit: 0 }.window(),
            PageWindow::new(3, 1)
        );
    }

    #[test]
    fn paging_is_lenient() {
        let parse = |raw: &str| -> (u32, u32) {
            let Ok(params) = serde_json::from_str::<PaginationParams>(raw) else {
                panic!("paging should parse: {raw}");
            };
            (params.page, params.limit)
        };
        assert_eq!(parse(r#"{"page":"abc","limit":"25"}"#), (1, 25));
        assert_eq!(parse(r#"{"page":"3rd","limit":"0"}"#), (3, 10));
        assert_eq!(parse(r#"{"page":"-2"}"#), (1, 10));
        assert_eq!(parse("{}"), (1, 10));
    }

    #[test]
    fn envelope_is_camel_case() {
        let body = ApiResponse::ok("done", 5).with_meta(PaginationParams::default().meta(5));
        let Ok(json) = serde_json::to_value(&body) else {
            panic!("envelope serializes");
        };
        assert_eq!(json.get("statusCode"), Some(&serde_json::json!(200)));
        assert_eq!(json.pointer("/meta/totalPages"), Some(&serde_json::json!(1)));
        assert_eq!(json.get("success"), Some(&serde_json::json!(true)));
    }
}
