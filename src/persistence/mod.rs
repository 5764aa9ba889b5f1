//! Persistence layer: the [`CouponStore`] trait and its backends.
//!
//! Every operation the services need is a single call on the trait, and
//! each call is atomic on its own. The two invariants that matter under
//! concurrency are enforced here, not in the services:
//!
//! - one ledger entry per (user, coupon): a duplicate insert fails with
//!   [`HubError::AlreadyDownloaded`];
//! - one redemption per ledger entry: [`CouponStore::redeem_ledger_entry`]
//!   is a compare-and-set that also bumps the coupon's redeem counter.
//!
//! [`postgres::PostgresStore`] is the production backend,
//! [`memory::MemoryStore`] backs development runs and tests.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Category, CategoryId, Coupon, CouponCounter, CouponId, LedgerEntry, LedgerEntryId, Profile,
    ProfileId, Visit,
};
use crate::error::HubError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Offset/limit window derived from 1-indexed page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Number of rows to skip.
    pub offset: u64,
    /// Maximum number of rows to return.
    pub limit: u64,
}

impl PageWindow {
    /// Window for `page` (1-indexed) of size `limit`.
    #[must_use]
    pub fn new(page: u32, limit: u32) -> Self {
        let page = u64::from(page.max(1));
        let limit = u64::from(limit.max(1));
        Self {
            offset: (page - 1).saturating_mul(limit),
            limit,
        }
    }

    /// Applies the window to an in-memory sequence.
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}

/// One page of results plus the total number of matching rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Rows on this page.
    pub items: Vec<T>,
    /// Rows matching the query across all pages.
    pub total: u64,
}

/// Coupon query filter. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CouponFilter {
    /// Only coupons created by this business.
    pub created_by: Option<ProfileId>,
    /// Only coupons in this category.
    pub category_id: Option<CategoryId>,
    /// Only coupons created by one of these businesses. An empty list
    /// matches nothing.
    pub creators: Option<Vec<ProfileId>>,
}

impl CouponFilter {
    /// Evaluates the filter against a coupon.
    #[must_use]
    pub fn matches(&self, coupon: &Coupon) -> bool {
        self.created_by.is_none_or(|c| c == coupon.created_by)
            && self.category_id.is_none_or(|c| c == coupon.category_id)
            && self
                .creators
                .as_ref()
                .is_none_or(|ids| ids.contains(&coupon.created_by))
    }
}

/// Storage backend for every collection the service owns.
#[async_trait]
pub trait CouponStore: Send + Sync + fmt::Debug {
    // ── Categories ──────────────────────────────────────────────────────

    /// Inserts a category.
    ///
    /// # Errors
    ///
    /// [`HubError::Conflict`] if the name is taken.
    async fn insert_category(&self, category: &Category) -> Result<(), HubError>;

    /// Fetches a category by id.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, HubError>;

    /// Lists all categories ordered by name.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn list_categories(&self) -> Result<Vec<Category>, HubError>;

    /// Replaces a category. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`HubError::Conflict`] if the new name is taken.
    async fn update_category(&self, category: &Category) -> Result<bool, HubError>;

    /// Deletes a category. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`HubError::Conflict`] while any coupon references it.
    async fn delete_category(&self, id: CategoryId) -> Result<bool, HubError>;

    // ── Profiles ────────────────────────────────────────────────────────

    /// Inserts or replaces a profile.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), HubError>;

    /// Fetches a profile by id.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, HubError>;

    /// Fetches every existing profile among `ids`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_profiles(&self, ids: &[ProfileId]) -> Result<Vec<Profile>, HubError>;

    /// Ids of profiles matching [`Profile::matches_search`].
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn search_creators(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<ProfileId>, HubError>;

    // ── Coupons ─────────────────────────────────────────────────────────

    /// Inserts a coupon.
    ///
    /// # Errors
    ///
    /// [`HubError::CategoryNotFound`] if the category vanished meanwhile.
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), HubError>;

    /// Fetches a coupon by id.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>, HubError>;

    /// Fetches every existing coupon among `ids`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_coupons(&self, ids: &[CouponId]) -> Result<Vec<Coupon>, HubError>;

    /// Writes the editable fields of a coupon. Counters are left alone.
    /// Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`HubError::CategoryNotFound`] if the category vanished meanwhile.
    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, HubError>;

    /// Deletes a coupon and its ledger entries. Returns `false` if it does
    /// not exist.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn delete_coupon(&self, id: CouponId) -> Result<bool, HubError>;

    /// Coupons matching `filter`, newest first, optionally paginated.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn find_coupons(
        &self,
        filter: &CouponFilter,
        window: Option<PageWindow>,
    ) -> Result<Page<Coupon>, HubError>;

    /// Atomically increments one counter. Returns `false` if the coupon
    /// does not exist.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn increment_counter(
        &self,
        id: CouponId,
        counter: CouponCounter,
    ) -> Result<bool, HubError>;

    // ── Download ledger ─────────────────────────────────────────────────

    /// Inserts a ledger entry.
    ///
    /// # Errors
    ///
    /// [`HubError::AlreadyDownloaded`] if the user already holds an entry
    /// for the coupon; [`HubError::CouponNotFound`] if the coupon vanished.
    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), HubError>;

    /// Fetches a ledger entry by id.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn get_ledger_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>, HubError>;

    /// Deletes the user's entry for a coupon. Returns `false` if none.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn delete_ledger_entry(&self, user: ProfileId, coupon: CouponId)
    -> Result<bool, HubError>;

    /// The user's entries, un-redeemed first, newest first within each
    /// group.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn list_ledger_entries(
        &self,
        user: ProfileId,
        window: PageWindow,
    ) -> Result<Page<LedgerEntry>, HubError>;

    /// Every entry referencing one of `coupons`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn ledger_entries_for_coupons(
        &self,
        coupons: &[CouponId],
    ) -> Result<Vec<LedgerEntry>, HubError>;

    /// Number of entries referencing one of `coupons`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn count_ledger_entries(&self, coupons: &[CouponId]) -> Result<u64, HubError>;

    /// Compare-and-set `redeemed = false → true`, stamping `redeemed_at`
    /// and incrementing the coupon's `redeem_count` in the same atomic
    /// step. Returns `false` if the entry is missing or already redeemed.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn redeem_ledger_entry(
        &self,
        id: LedgerEntryId,
        at: DateTime<Utc>,
    ) -> Result<bool, HubError>;

    // ── Visits ──────────────────────────────────────────────────────────

    /// Appends a visit record.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn insert_visit(&self, visit: &Visit) -> Result<(), HubError>;

    /// Number of coupon visits referencing one of `coupons`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn count_coupon_visits(&self, coupons: &[CouponId]) -> Result<u64, HubError>;

    /// Number of profile visits to `business`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on backend failure.
    async fn count_business_visits(&self, business: ProfileId) -> Result<u64, HubError>;
}
