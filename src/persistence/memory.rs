//! In-process store used for development runs and tests.
//!
//! All collections sit behind a single [`tokio::sync::RwLock`], so every
//! trait method observes and mutates a consistent snapshot. Uniqueness of
//! (user, coupon) ledger pairs is enforced by a secondary index updated
//! under the same write guard as the entry table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{CouponFilter, CouponStore, Page, PageWindow};
use crate::domain::{
    Category, CategoryId, Coupon, CouponCounter, CouponId, LedgerEntry, LedgerEntryId, Profile,
    ProfileId, Visit, VisitSubject,
};
use crate::error::HubError;

#[derive(Debug, Default)]
struct Tables {
    categories: HashMap<CategoryId, Category>,
    profiles: HashMap<ProfileId, Profile>,
    coupons: HashMap<CouponId, Coupon>,
    ledger: HashMap<LedgerEntryId, LedgerEntry>,
    ledger_index: HashMap<(ProfileId, CouponId), LedgerEntryId>,
    visits: Vec<Visit>,
}

impl Tables {
    fn category_name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        self.categories
            .values()
            .any(|c| c.name == name && Some(c.id) != except)
    }

    fn remove_ledger_entry(&mut self, id: LedgerEntryId) -> Option<LedgerEntry> {
        let entry = self.ledger.remove(&id)?;
        self.ledger_index.remove(&(entry.user_id, entry.coupon_id));
        Some(entry)
    }
}

/// [`CouponStore`] backed by hash maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn len_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn insert_category(&self, category: &Category) -> Result<(), HubError> {
        let mut tables = self.tables.write().await;
        if tables.category_name_taken(&category.name, None) {
            return Err(HubError::Conflict(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, HubError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, HubError> {
        let mut categories: Vec<Category> =
            self.tables.read().await.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn update_category(&self, category: &Category) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&category.id) {
            return Ok(false);
        }
        if tables.category_name_taken(&category.name, Some(category.id)) {
            return Err(HubError::Conflict(format!(
                "category '{}' already exists",
                category.name
            )));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(true)
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Ok(false);
        }
        if tables.coupons.values().any(|c| c.category_id == id) {
            return Err(HubError::Conflict(
                "category is still referenced by coupons".to_string(),
            ));
        }
        tables.categories.remove(&id);
        Ok(true)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), HubError> {
        self.tables
            .write()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get_profile(&self, id: ProfileId) -> Result<Option<Profile>, HubError> {
        Ok(self.tables.read().await.profiles.get(&id).cloned())
    }

    async fn get_profiles(&self, ids: &[ProfileId]) -> Result<Vec<Profile>, HubError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    async fn search_creators(
        &self,
        query: &str,
        location: Option<&str>,
    ) -> Result<Vec<ProfileId>, HubError> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|p| p.matches_search(query, location))
            .map(|p| p.id)
            .collect())
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<(), HubError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&coupon.category_id) {
            return Err(HubError::CategoryNotFound(*coupon.category_id.as_uuid()));
        }
        tables.coupons.insert(coupon.id, coupon.clone());
        Ok(())
    }

    async fn get_coupon(&self, id: CouponId) -> Result<Option<Coupon>, HubError> {
        Ok(self.tables.read().await.coupons.get(&id).cloned())
    }

    async fn get_coupons(&self, ids: &[CouponId]) -> Result<Vec<Coupon>, HubError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.coupons.get(id).cloned())
            .collect())
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&coupon.category_id) {
            return Err(HubError::CategoryNotFound(*coupon.category_id.as_uuid()));
        }
        let Some(stored) = tables.coupons.get_mut(&coupon.id) else {
            return Ok(false);
        };
        // Counters may have moved since the caller read the coupon.
        let counters = stored.counters;
        *stored = Coupon {
            counters,
            created_at: stored.created_at,
            created_by: stored.created_by,
            ..coupon.clone()
        };
        Ok(true)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        if tables.coupons.remove(&id).is_none() {
            return Ok(false);
        }
        let orphaned: Vec<LedgerEntryId> = tables
            .ledger
            .values()
            .filter(|e| e.coupon_id == id)
            .map(|e| e.id)
            .collect();
        for entry in orphaned {
            tables.remove_ledger_entry(entry);
        }
        Ok(true)
    }

    async fn find_coupons(
        &self,
        filter: &CouponFilter,
        window: Option<PageWindow>,
    ) -> Result<Page<Coupon>, HubError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Coupon> =
            tables.coupons.values().filter(|c| filter.matches(c)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = len_u64(matching.len());
        let items = match window {
            Some(window) => window.apply(matching.into_iter().cloned()),
            None => matching.into_iter().cloned().collect(),
        };
        Ok(Page { items, total })
    }

    async fn increment_counter(
        &self,
        id: CouponId,
        counter: CouponCounter,
    ) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        let Some(coupon) = tables.coupons.get_mut(&id) else {
            return Ok(false);
        };
        counter.bump(&mut coupon.counters);
        Ok(true)
    }

    async fn insert_ledger_entry(&self, entry: &LedgerEntry) -> Result<(), HubError> {
        let mut tables = self.tables.write().await;
        if !tables.coupons.contains_key(&entry.coupon_id) {
            return Err(HubError::CouponNotFound(*entry.coupon_id.as_uuid()));
        }
        let key = (entry.user_id, entry.coupon_id);
        if tables.ledger_index.contains_key(&key) {
            return Err(HubError::AlreadyDownloaded);
        }
        tables.ledger_index.insert(key, entry.id);
        tables.ledger.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_ledger_entry(&self, id: LedgerEntryId) -> Result<Option<LedgerEntry>, HubError> {
        Ok(self.tables.read().await.ledger.get(&id).cloned())
    }

    async fn delete_ledger_entry(
        &self,
        user: ProfileId,
        coupon: CouponId,
    ) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        let Some(id) = tables.ledger_index.get(&(user, coupon)).copied() else {
            return Ok(false);
        };
        Ok(tables.remove_ledger_entry(id).is_some())
    }

    async fn list_ledger_entries(
        &self,
        user: ProfileId,
        window: PageWindow,
    ) -> Result<Page<LedgerEntry>, HubError> {
        let tables = self.tables.read().await;
        let mut entries: Vec<&LedgerEntry> =
            tables.ledger.values().filter(|e| e.user_id == user).collect();
        entries.sort_by(|a, b| {
            a.redeemed
                .cmp(&b.redeemed)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        let total = len_u64(entries.len());
        Ok(Page {
            items: window.apply(entries.into_iter().cloned()),
            total,
        })
    }

    async fn ledger_entries_for_coupons(
        &self,
        coupons: &[CouponId],
    ) -> Result<Vec<LedgerEntry>, HubError> {
        let tables = self.tables.read().await;
        Ok(tables
            .ledger
            .values()
            .filter(|e| coupons.contains(&e.coupon_id))
            .cloned()
            .collect())
    }

    async fn count_ledger_entries(&self, coupons: &[CouponId]) -> Result<u64, HubError> {
        let tables = self.tables.read().await;
        Ok(len_u64(
            tables
                .ledger
                .values()
                .filter(|e| coupons.contains(&e.coupon_id))
                .count(),
        ))
    }

    async fn redeem_ledger_entry(
        &self,
        id: LedgerEntryId,
        at: DateTime<Utc>,
    ) -> Result<bool, HubError> {
        let mut tables = self.tables.write().await;
        let Some(entry) = tables.ledger.get_mut(&id) else {
            return Ok(false);
        };
        if !entry.mark_redeemed(at) {
            return Ok(false);
        }
        let coupon_id = entry.coupon_id;
        if let Some(coupon) = tables.coupons.get_mut(&coupon_id) {
            CouponCounter::Redeem.bump(&mut coupon.counters);
            coupon.updated_at = at;
        }
        Ok(true)
    }

    async fn insert_visit(&self, visit: &Visit) -> Result<(), HubError> {
        self.tables.write().await.visits.push(visit.clone());
        Ok(())
    }

    async fn count_coupon_visits(&self, coupons: &[CouponId]) -> Result<u64, HubError> {
        let tables = self.tables.read().await;
        Ok(len_u64(
            tables
                .visits
                .iter()
                .filter(|v| matches!(v.subject, VisitSubject::Coupon(id) if coupons.contains(&id)))
                .count(),
        ))
    }

    async fn count_business_visits(&self, business: ProfileId) -> Result<u64, HubError> {
        let tables = self.tables.read().await;
        Ok(len_u64(
            tables
                .visits
                .iter()
                .filter(|v| v.subject == VisitSubject::Business(business))
                .count(),
        ))
    }
}
