//! Query and JSON extractors that reject with [`HubError`], so malformed
//! input gets the same JSON envelope as every other failure.

use axum::extract::{FromRequest, FromRequestParts, Json, Query, Request};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::error::HubError;

/// Query string extractor. Rejections become [`HubError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// JSON body extractor. Rejections become [`HubError::Validation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use axum::body::Body;
    use axum::http;
    use serde::Deserialize;

    use super::*;
    use crate::api::dto::{IdQuery, PaginationParams};

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    fn parts(uri: &str) -> Parts {
        let Ok(req) = http::Request::builder().uri(uri).body(Body::empty()) else {
            panic!("request builds");
        };
        req.into_parts().0
    }

    #[tokio::test]
    async fn bad_uuid_is_a_validation_error() {
        let mut parts = parts("/coupons/get?id=not-a-uuid");
        let result = ApiQuery::<IdQuery>::from_request_parts(&mut parts, &()).await;
        let Err(HubError::Validation(message)) = result else {
            panic!("expected a validation error");
        };
        assert!(message.starts_with("invalid query string"));
    }

    #[tokio::test]
    async fn missing_field_is_a_validation_error() {
        let mut parts = parts("/coupons/get");
        let result = ApiQuery::<IdQuery>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn garbage_paging_falls_back_to_defaults() {
        let mut parts = parts("/home?page=abc&limit=0");
        let Ok(ApiQuery(params)) =
            ApiQuery::<PaginationParams>::from_request_parts(&mut parts, &()).await
        else {
            panic!("paging should parse leniently");
        };
        assert_eq!((params.page, params.limit), (1, 10));
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let Ok(req) = http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\":"))
        else {
            panic!("request builds");
        };
        let result = ApiJson::<Named>::from_request(req, &()).await;
        assert!(matches!(result, Err(HubError::Validation(_))));
    }

    #[tokio::test]
    async fn well_formed_json_passes_through() {
        let Ok(req) = http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\":\"güero\"}"))
        else {
            panic!("request builds");
        };
        let Ok(ApiJson(body)) = ApiJson::<Named>::from_request(req, &()).await else {
            panic!("body should parse");
        };
        assert_eq!(body.name, "güero");
    }
}
