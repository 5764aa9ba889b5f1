//! Download ledger: claiming, removing and listing a user's coupons.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    Coupon, CouponCounter, CouponId, LedgerEntry, Profile, ProfileId, Visit, VisitSubject,
};
use crate::error::HubError;
use crate::persistence::{CouponStore, Page, PageWindow};

/// A ledger entry populated with its coupon and the coupon's creator.
#[derive(Debug, Clone)]
pub struct LedgerItem {
    /// The entry itself.
    pub entry: LedgerEntry,
    /// Claimed coupon.
    pub coupon: Coupon,
    /// Business that published the coupon, when it has a profile.
    pub creator: Option<Profile>,
}

/// Download ledger operations.
#[derive(Debug, Clone)]
pub struct LedgerService {
    store: Arc<dyn CouponStore>,
}

impl LedgerService {
    /// Creates a new `LedgerService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Claims `coupon_id` for `user`: creates the ledger entry, records a
    /// coupon visit and bumps `download_count`.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`] if the coupon does not exist,
    /// [`HubError::AlreadyDownloaded`] if the user already claimed it.
    pub async fn download(
        &self,
        user: ProfileId,
        coupon_id: CouponId,
    ) -> Result<LedgerEntry, HubError> {
        if self.store.get_coupon(coupon_id).await?.is_none() {
            return Err(HubError::CouponNotFound(*coupon_id.as_uuid()));
        }

        let entry = LedgerEntry::claim(user, coupon_id);
        self.store.insert_ledger_entry(&entry).await?;
        self.store
            .insert_visit(&Visit::now(Some(user), VisitSubject::Coupon(coupon_id)))
            .await?;
        self.store
            .increment_counter(coupon_id, CouponCounter::Download)
            .await?;

        tracing::info!(entry_id = %entry.id, %coupon_id, %user, "coupon downloaded");
        Ok(entry)
    }

    /// Removes the user's entry for a coupon. `download_count` is left as
    /// is.
    ///
    /// # Errors
    ///
    /// [`HubError::LedgerEntryNotFound`] if the user holds no entry.
    pub async fn remove(&self, user: ProfileId, coupon_id: CouponId) -> Result<(), HubError> {
        if !self.store.delete_ledger_entry(user, coupon_id).await? {
            return Err(HubError::LedgerEntryNotFound(*coupon_id.as_uuid()));
        }
        tracing::info!(%coupon_id, %user, "downloaded coupon removed");
        Ok(())
    }

    /// The user's entries, un-redeemed first, newest first within each
    /// group, populated with coupon and creator.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn list(
        &self,
        user: ProfileId,
        window: PageWindow,
    ) -> Result<Page<LedgerItem>, HubError> {
        let page = self.store.list_ledger_entries(user, window).await?;

        let coupon_ids: Vec<CouponId> = page.items.iter().map(|e| e.coupon_id).collect();
        let coupons: HashMap<CouponId, Coupon> = self
            .store
            .get_coupons(&coupon_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut creator_ids: Vec<ProfileId> = coupons.values().map(|c| c.created_by).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators: HashMap<ProfileId, Profile> = self
            .store
            .get_profiles(&creator_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let items = page
            .items
            .into_iter()
            .filter_map(|entry| {
                let coupon = coupons.get(&entry.coupon_id)?.clone();
                let creator = creators.get(&coupon.created_by).cloned();
                Some(LedgerItem {
                    entry,
                    coupon,
                    creator,
                })
            })
            .collect();

        Ok(Page {
            items,
            total: page.total,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{Category, Role};
    use crate::service::catalog_service::tests::{FakeUploader, business, create_input};
    use crate::service::CatalogService;
    use crate::persistence::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, LedgerService, Coupon) {
        let store = Arc::new(MemoryStore::new());
        let category = Category::new("Food".to_string(), "icon".to_string(), Vec::new());
        let Ok(()) = store.insert_category(&category).await else {
            panic!("category");
        };
        let owner = business();
        let Ok(()) = store
            .upsert_profile(&Profile {
                id: owner.id,
                role: Role::Business,
                name: "Owner".to_string(),
                company_name: Some("Tacos".to_string()),
                location: None,
                coordinates: None,
                updated_at: Utc::now(),
            })
            .await
        else {
            panic!("profile");
        };
        let catalog = CatalogService::new(
            Arc::clone(&store) as Arc<dyn CouponStore>,
            Arc::new(FakeUploader::default()),
        );
        let Ok(coupon) = catalog.create(&owner, create_input(category.id)).await else {
            panic!("coupon");
        };
        (Arc::clone(&store), LedgerService::new(store), coupon)
    }

    #[tokio::test]
    async fn download_once_then_conflict() {
        let (store, ledger, coupon) = setup().await;
        let user = ProfileId::new();
        let Ok(_) = ledger.download(user, coupon.id).await else {
            panic!("first download");
        };
        assert!(matches!(
            ledger.download(user, coupon.id).await,
            Err(HubError::AlreadyDownloaded)
        ));

        let Ok(Some(stored)) = store.get_coupon(coupon.id).await else {
            panic!("coupon");
        };
        assert_eq!(stored.counters.download_count, 1);
        assert!(matches!(store.count_coupon_visits(&[coupon.id]).await, Ok(1)));
    }

    #[tokio::test]
    async fn download_of_unknown_coupon_is_not_found() {
        let (_, ledger, _) = setup().await;
        assert!(matches!(
            ledger.download(ProfileId::new(), CouponId::new()).await,
            Err(HubError::CouponNotFound(_))
        ));
    }

    #[tokio::test]
    async fn remove_keeps_download_count() {
        let (store, ledger, coupon) = setup().await;
        let user = ProfileId::new();
        let Ok(_) = ledger.download(user, coupon.id).await else {
            panic!("download");
        };
        assert!(ledger.remove(user, coupon.id).await.is_ok());
        assert!(matches!(
            ledger.remove(user, coupon.id).await,
            Err(HubError::LedgerEntryNotFound(_))
        ));
        let Ok(Some(stored)) = store.get_coupon(coupon.id).await else {
            panic!("coupon");
        };
        assert_eq!(stored.counters.download_count, 1);
    }

    #[tokio::test]
    async fn list_is_populated() {
        let (_, ledger, coupon) = setup().await;
        let user = ProfileId::new();
        let Ok(_) = ledger.download(user, coupon.id).await else {
            panic!("download");
        };
        let Ok(page) = ledger.list(user, PageWindow::new(1, 10)).await else {
            panic!("list");
        };
        assert_eq!(page.total, 1);
        let Some(item) = page.items.first() else {
            panic!("one item");
        };
        assert_eq!(item.coupon.id, coupon.id);
        assert_eq!(
            item.creator.as_ref().and_then(|c| c.company_name.as_deref()),
            Some("Tacos")
        );
    }
}
