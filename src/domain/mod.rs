//! Domain layer: entities, value types and pure business rules.
//!
//! Nothing in here performs I/O. Storage lives in [`crate::persistence`],
//! orchestration in [`crate::service`].

pub mod analytics;
pub mod category;
pub mod coupon;
pub mod geo;
pub mod ids;
pub mod ledger;
pub mod profile;
pub mod visit;

pub use analytics::AnalyticsPeriod;
pub use category::{Category, CategoryTranslation};
pub use coupon::{
    Coupon, CouponCounter, CouponCounters, Discount, DiscountFields, NewCoupon, ValidityWindow,
};
pub use geo::{CoordinateInput, GeoPoint};
pub use ids::{CategoryId, CouponId, LedgerEntryId, ProfileId, VisitId};
pub use ledger::{LedgerEntry, RedemptionState};
pub use profile::{Profile, Role};
pub use visit::{Visit, VisitSubject};
