//! Service layer: business logic orchestration.
//!
//! Each service owns one component of the marketplace and talks to storage
//! only through the injected [`crate::persistence::CouponStore`]. Services
//! are cheap to clone and shared through [`crate::app_state::AppState`].

pub mod analytics_service;
pub mod catalog_service;
pub mod category_service;
pub mod discovery_service;
pub mod ledger_service;
pub mod profile_service;
pub mod redemption_service;

pub use analytics_service::{AnalyticsSeries, AnalyticsService, AnalyticsTotals};
pub use catalog_service::{CatalogService, CreateCouponInput, UpdateCouponInput};
pub use category_service::{CategoryService, UpdateCategoryInput};
pub use discovery_service::{DiscoveryService, Feed, FeedQuery, RankedCoupon};
pub use ledger_service::{LedgerItem, LedgerService};
pub use profile_service::{BusinessPage, ProfileInput, ProfileService};
pub use redemption_service::{
    IssuedToken, RedemptionOutcome, RedemptionService, RedemptionTokens,
};
