//! Profile handlers.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::Router;

use crate::api::dto::{
    ApiResponse, BusinessProfileDto, IdQuery, PaginationParams, UpsertProfileRequest,
};
use crate::api::extract::{ApiJson, ApiQuery};
use crate::app_state::AppState;
use crate::auth::{Identity, MaybeIdentity};
use crate::domain::{Profile, ProfileId};
use crate::error::{ErrorResponse, HubError};

/// `PUT /profile` — Create or replace the caller's profile summary.
///
/// # Errors
///
/// Returns [`HubError::Validation`] for an empty name or bad coordinates.
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    tag = "Profiles",
    summary = "Save own profile",
    request_body = UpsertProfileRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile saved", body = ApiResponse<Profile>),
        (status = 400, description = "Invalid profile", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn upsert_profile(
    State(state): State<AppState>,
    caller: Identity,
    ApiJson(req): ApiJson<UpsertProfileRequest>,
) -> Result<impl IntoResponse, HubError> {
    let profile = state.profiles.upsert_own(&caller, req.into()).await?;
    Ok(ApiResponse::ok("Profile saved successfully", profile))
}

/// `GET /profile/business-profile?id=` — A business page with its coupons.
///
/// # Errors
///
/// Returns [`HubError::ProfileNotFound`] for unknown or non-business ids.
#[utoipa::path(
    get,
    path = "/api/v1/profile/business-profile",
    tag = "Profiles",
    summary = "Business profile",
    params(IdQuery, PaginationParams),
    responses(
        (status = 200, description = "Business and coupons", body = ApiResponse<BusinessProfileDto>),
        (status = 404, description = "Business not found", body = ErrorResponse),
    )
)]
pub async fn business_profile(
    State(state): State<AppState>,
    MaybeIdentity(caller): MaybeIdentity,
    ApiQuery(query): ApiQuery<IdQuery>,
    ApiQuery(params): ApiQuery<PaginationParams>,
) -> Result<impl IntoResponse, HubError> {
    let page = state
        .profiles
        .business_profile(
            ProfileId::from_uuid(query.id),
            caller.map(|c| c.id),
            params.window(),
        )
        .await?;
    let total = page.coupons.total;
    Ok(
        ApiResponse::ok("Business profile fetched successfully", BusinessProfileDto::from(page))
            .with_meta(params.meta(total)),
    )
}

/// Profile routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/profile", put(upsert_profile))
        .route("/profile/business-profile", get(business_profile))
}
