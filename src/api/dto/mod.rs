//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain types stay free of wire concerns; these types flatten
//! discounts, format dates as `DD/MM/YYYY` and wrap everything in
//! [`ApiResponse`].

pub mod category_dto;
pub mod common_dto;
pub mod coupon_dto;
pub mod home_dto;
pub mod profile_dto;

pub use category_dto::*;
pub use common_dto::*;
pub use coupon_dto::*;
pub use home_dto::*;
pub use profile_dto::*;
