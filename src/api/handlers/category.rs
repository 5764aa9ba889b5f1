//! Category handlers. Reads are public, writes are admin only.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;

use crate::api::dto::{ApiResponse, CategoryForm, CategoryIdQuery, Empty, parse_translations};
use crate::api::extract::ApiQuery;
use crate::api::form::FormData;
use crate::app_state::AppState;
use crate::auth::Identity;
use crate::domain::{Category, CategoryId};
use crate::error::{ErrorResponse, HubError};
use crate::service::UpdateCategoryInput;

/// `GET /categories` — All categories.
///
/// # Errors
///
/// Returns [`HubError::Persistence`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    tag = "Categories",
    summary = "List categories",
    responses(
        (status = 200, description = "Categories ordered by name", body = ApiResponse<Vec<Category>>),
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, HubError> {
    let categories = state.categories.list().await?;
    Ok(ApiResponse::ok("Categories fetched successfully", categories))
}

/// `POST /categories` — Create a category.
///
/// # Errors
///
/// Returns [`HubError`] for non-admins, a bad form or a duplicate name.
#[utoipa::path(
    post,
    path = "/api/v1/categories",
    tag = "Categories",
    summary = "Create a category",
    request_body(content = CategoryForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Invalid form", body = ErrorResponse),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 409, description = "Duplicate name", body = ErrorResponse),
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    caller: Identity,
    mut form: FormData,
) -> Result<impl IntoResponse, HubError> {
    let name = form.required("name")?;
    let icon = form
        .take_file(&["icon"])
        .ok_or_else(|| HubError::Validation("'icon' is required".to_string()))?;
    let translations = parse_translations(&form.text("translations").unwrap_or_default())?;

    let category = state
        .categories
        .create(&caller, &name, icon, translations)
        .await?;
    Ok(ApiResponse::created("Category created successfully", category))
}

/// `PATCH /categories?id=` — Update a category.
///
/// # Errors
///
/// Returns [`HubError`] for non-admins, a missing category or a name
/// collision.
#[utoipa::path(
    patch,
    path = "/api/v1/categories",
    tag = "Categories",
    summary = "Update a category",
    params(CategoryIdQuery),
    request_body(content = CategoryForm, content_type = "multipart/form-data"),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Duplicate name", body = ErrorResponse),
    )
)]
pub async fn update_category(
    State(state): State<AppState>,
    caller: Identity,
    ApiQuery(query): ApiQuery<CategoryIdQuery>,
    mut form: FormData,
) -> Result<impl IntoResponse, HubError> {
    let input = UpdateCategoryInput {
        name: form.text("name"),
        icon: form.take_file(&["icon"]),
        translations: form
            .text("translations")
            .map(|raw| parse_translations(&raw))
            .transpose()?,
    };
    let category = state
        .categories
        .update(&caller, CategoryId::from_uuid(query.id), input)
        .await?;
    Ok(ApiResponse::ok("Category updated successfully", category))
}

/// `DELETE /categories?id=` — Delete an unused category.
///
/// # Errors
///
/// Returns [`HubError::Conflict`] while coupons still use it.
#[utoipa::path(
    delete,
    path = "/api/v1/categories",
    tag = "Categories",
    summary = "Delete a category",
    params(CategoryIdQuery),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category deleted", body = ApiResponse<Empty>),
        (status = 403, description = "Not an admin", body = ErrorResponse),
        (status = 404, description = "Category not found", body = ErrorResponse),
        (status = 409, description = "Category in use", body = ErrorResponse),
    )
)]
pub async fn delete_category(
    State(state): State<AppState>,
    caller: Identity,
    ApiQuery(query): ApiQuery<CategoryIdQuery>,
) -> Result<impl IntoResponse, HubError> {
    state
        .categories
        .delete(&caller, CategoryId::from_uuid(query.id))
        .await?;
    Ok(ApiResponse::ok("Category deleted successfully", Empty {}))
}

/// Category routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/categories",
        get(list_categories)
            .post(create_category)
            .patch(update_category)
            .delete(delete_category),
    )
}
