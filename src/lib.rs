//! # coupon-hub
//!
//! REST backend for a coupon marketplace. Businesses publish discount
//! coupons, users download them into a personal ledger and redeem each
//! download exactly once through a short-lived signed QR link. A discovery
//! feed ranks coupons by popularity and distance, and businesses get
//! engagement analytics.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)          bearer auth (auth.rs)
//!     │
//!     ├── Services (service/)
//!     │     catalog · categories · ledger · redemption
//!     │     discovery · analytics · profiles
//!     │
//!     ├── Domain rules (domain/)        discount, dates, haversine, buckets
//!     │
//!     ├── CouponStore (persistence/)    PostgreSQL or in-memory
//!     └── MediaUploader (media.rs)      local directory served at /media
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod media;
pub mod persistence;
pub mod service;
