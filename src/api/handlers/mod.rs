//! REST endpoint handlers organized by resource.

pub mod category;
pub mod coupon;
pub mod home;
pub mod profile;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(coupon::routes())
        .merge(category::routes())
        .merge(home::routes())
        .merge(profile::routes())
}
