//! Discovery feed and business totals.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::api::dto::{AnalyticsTotalsDto, ApiResponse, FeedDto, HomeQuery, RankedCouponDto};
use crate::api::extract::ApiQuery;
use crate::app_state::AppState;
use crate::auth::{Identity, MaybeIdentity};
use crate::domain::Role;
use crate::error::{ErrorResponse, HubError};

/// `GET /home` — Ranked discovery feed.
///
/// Coupons are ordered by popularity, nearest first among equals. Without
/// a search `query` the response also carries all categories and a
/// shuffled carousel of featured coupons.
///
/// # Errors
///
/// Returns [`HubError`] for an unknown category or bad coordinates.
#[utoipa::path(
    get,
    path = "/api/v1/home",
    tag = "Home",
    summary = "Discovery feed",
    params(HomeQuery),
    responses(
        (status = 200, description = "Ranked coupons", body = ApiResponse<FeedDto>),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
    )
)]
pub async fn home_feed(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    ApiQuery(query): ApiQuery<HomeQuery>,
) -> Result<impl IntoResponse, HubError> {
    let (filters, paging) = query.into_parts();
    let feed = state
        .discovery
        .feed(caller.map(|c| c.id), filters, paging.window())
        .await?;

    let data = FeedDto {
        categories: feed.categories,
        carousel: feed
            .carousel
            .map(|c| c.into_iter().map(RankedCouponDto::from).collect()),
        coupons: feed.coupons.into_iter().map(RankedCouponDto::from).collect(),
    };
    Ok(ApiResponse::ok("Home fetched successfully", data).with_meta(paging.meta(feed.total)))
}

/// `GET /home/analytics` — Lifetime totals for the calling business.
///
/// # Errors
///
/// Returns [`HubError::Forbidden`] for non-business callers.
#[utoipa::path(
    get,
    path = "/api/v1/home/analytics",
    tag = "Analytics",
    summary = "Analytics totals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Totals", body = ApiResponse<AnalyticsTotalsDto>),
        (status = 403, description = "Not a business", body = ErrorResponse),
    )
)]
pub async fn home_analytics(
    State(state): State<AppState>,
    caller: Identity,
) -> Result<impl IntoResponse, HubError> {
    caller.require(&[Role::Business])?;
    let totals = state.analytics.totals(caller.id).await?;
    Ok(ApiResponse::ok(
        "Analytics fetched successfully",
        AnalyticsTotalsDto::from(totals),
    ))
}

/// Home routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/home", get(home_feed))
        .route("/home/analytics", get(home_analytics))
}
