//! Per-business analytics: lifetime totals and the current-period series.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{AnalyticsPeriod, Coupon, CouponId, ProfileId};
use crate::error::HubError;
use crate::persistence::{CouponFilter, CouponStore};

/// Lifetime totals over a business's coupons.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalyticsTotals {
    /// Ledger entries referencing the coupons.
    pub total_downloads: u64,
    /// Sum of share counters.
    pub total_shares: u64,
    /// Coupon visits.
    pub click_to_explore: u64,
    /// Coupons whose validity ended before today.
    pub expired_coupons: u64,
    /// Visits to the business profile.
    pub profile_visits: u64,
    /// Sum of fixed discount amounts.
    pub value: f64,
}

/// Downloads and redemptions bucketed over the current period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsSeries {
    /// Selected period.
    pub period: AnalyticsPeriod,
    /// Bucket labels.
    pub labels: Vec<String>,
    /// Downloads per bucket.
    pub downloads: Vec<u64>,
    /// Redemptions per bucket.
    pub redemptions: Vec<u64>,
}

/// Analytics aggregation.
#[derive(Debug, Clone)]
pub struct AnalyticsService {
    store: Arc<dyn CouponStore>,
}

impl AnalyticsService {
    /// Creates a new `AnalyticsService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    async fn coupons_of(&self, business: ProfileId) -> Result<Vec<Coupon>, HubError> {
        let filter = CouponFilter {
            created_by: Some(business),
            ..CouponFilter::default()
        };
        Ok(self.store.find_coupons(&filter, None).await?.items)
    }

    /// Lifetime totals for `business`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn totals(&self, business: ProfileId) -> Result<AnalyticsTotals, HubError> {
        self.totals_on(business, Utc::now()).await
    }

    /// [`Self::totals`] with expiry evaluated against `now`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn totals_on(
        &self,
        business: ProfileId,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsTotals, HubError> {
        let coupons = self.coupons_of(business).await?;
        let ids: Vec<CouponId> = coupons.iter().map(|c| c.id).collect();
        let today = now.date_naive();

        let totals = AnalyticsTotals {
            total_downloads: self.store.count_ledger_entries(&ids).await?,
            total_shares: coupons
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.counters.share_count)),
            click_to_explore: self.store.count_coupon_visits(&ids).await?,
            expired_coupons: coupons
                .iter()
                .filter(|c| c.is_expired_on(today))
                .fold(0u64, |acc, _| acc.saturating_add(1)),
            profile_visits: self.store.count_business_visits(business).await?,
            value: coupons
                .iter()
                .filter_map(|c| c.discount.discount_amount())
                .sum(),
        };
        tracing::debug!(%business, ?totals, "analytics totals computed");
        Ok(totals)
    }

    /// Downloads and redemptions of `business`'s coupons over the period
    /// containing `now`.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn series(
        &self,
        business: ProfileId,
        period: AnalyticsPeriod,
        now: DateTime<Utc>,
    ) -> Result<AnalyticsSeries, HubError> {
        let ids: Vec<CouponId> = self
            .coupons_of(business)
            .await?
            .iter()
            .map(|c| c.id)
            .collect();
        let entries = self.store.ledger_entries_for_coupons(&ids).await?;

        Ok(AnalyticsSeries {
            period,
            labels: period.labels().iter().map(ToString::to_string).collect(),
            downloads: period.bucketize(entries.iter().map(|e| e.created_at), now),
            redemptions: period.bucketize(entries.iter().filter_map(|e| e.redeemed_at), now),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::domain::{
        Category, CategoryId, Discount, LedgerEntry, NewCoupon, ValidityWindow, Visit,
        VisitSubject,
    };
    use crate::persistence::MemoryStore;

    fn window(end: (i32, u32, u32)) -> ValidityWindow {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap_or_default();
        let Ok(w) = ValidityWindow::new(start, end) else {
            panic!("window");
        };
        w
    }

    fn coupon(
        business: ProfileId,
        category: CategoryId,
        discount: Discount,
        end: (i32, u32, u32),
    ) -> Coupon {
        Coupon::new(NewCoupon {
            created_by: business,
            category_id: category,
            discount,
            more_details: None,
            validity: window(end),
            photo_url: "p.png".to_string(),
            carousel_photo_url: None,
            add_to_carousel: false,
        })
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single() else {
            panic!("timestamp");
        };
        ts
    }

    #[tokio::test]
    async fn totals_cover_every_metric() {
        let store = Arc::new(MemoryStore::new());
        let category = Category::new("Food".to_string(), "i".to_string(), Vec::new());
        let Ok(()) = store.insert_category(&category).await else {
            panic!("category");
        };
        let business = ProfileId::new();
        let fixed = coupon(
            business,
            category.id,
            Discount::FixedAmounts {
                regular_amount: 200.0,
                discount_amount: 50.0,
                converted_amount: 150.0,
            },
            (2099, 1, 1),
        );
        let expired = coupon(
            business,
            category.id,
            Discount::Percentage { value: 10.0 },
            (2025, 6, 1),
        );
        let foreign = coupon(
            ProfileId::new(),
            category.id,
            Discount::Percentage { value: 10.0 },
            (2025, 6, 1),
        );
        for c in [&fixed, &expired, &foreign] {
            let Ok(()) = store.insert_coupon(c).await else {
                panic!("coupon");
            };
        }
        for (c, user) in [
            (&fixed, ProfileId::new()),
            (&expired, ProfileId::new()),
            (&foreign, ProfileId::new()),
        ] {
            let Ok(()) = store.insert_ledger_entry(&LedgerEntry::claim(user, c.id)).await else {
                panic!("entry");
            };
        }
        for _ in 0..2 {
            let Ok(_) = store
                .increment_counter(fixed.id, crate::domain::CouponCounter::Share)
                .await
            else {
                panic!("share");
            };
        }
        let visits = [
            Visit::now(None, VisitSubject::Coupon(fixed.id)),
            Visit::now(None, VisitSubject::Coupon(foreign.id)),
            Visit::now(None, VisitSubject::Business(business)),
        ];
        for v in &visits {
            let Ok(()) = store.insert_visit(v).await else {
                panic!("visit");
            };
        }

        let analytics = AnalyticsService::new(store);
        let Ok(totals) = analytics.totals_on(business, noon(2026, 1, 15)).await else {
            panic!("totals");
        };
        assert_eq!(
            totals,
            AnalyticsTotals {
                total_downloads: 2,
                total_shares: 2,
                click_to_explore: 1,
                expired_coupons: 1,
                profile_visits: 1,
                value: 50.0,
            }
        );
    }

    #[tokio::test]
    async fn business_without_coupons_has_zero_totals() {
        let analytics = AnalyticsService::new(Arc::new(MemoryStore::new()));
        let Ok(totals) = analytics.totals(ProfileId::new()).await else {
            panic!("totals");
        };
        assert_eq!(totals, AnalyticsTotals::default());
    }

    #[tokio::test]
    async fn series_buckets_downloads_and_redemptions() {
        let store = Arc::new(MemoryStore::new());
        let category = Category::new("Food".to_string(), "i".to_string(), Vec::new());
        let Ok(()) = store.insert_category(&category).await else {
            panic!("category");
        };
        let business = ProfileId::new();
        let c = coupon(business, category.id, Discount::Percentage { value: 5.0 }, (2099, 1, 1));
        let Ok(()) = store.insert_coupon(&c).await else {
            panic!("coupon");
        };

        // 2026-03-04 is a Wednesday.
        let mut entry = LedgerEntry::claim(ProfileId::new(), c.id);
        entry.created_at = noon(2026, 3, 2);
        let Ok(()) = store.insert_ledger_entry(&entry).await else {
            panic!("entry");
        };
        let Ok(true) = store.redeem_ledger_entry(entry.id, noon(2026, 3, 4)).await else {
            panic!("redeem");
        };
        let mut last_year = LedgerEntry::claim(ProfileId::new(), c.id);
        last_year.created_at = noon(2025, 3, 4);
        let Ok(()) = store.insert_ledger_entry(&last_year).await else {
            panic!("entry");
        };

        let analytics = AnalyticsService::new(store);
        let now = noon(2026, 3, 5);

        let Ok(week) = analytics.series(business, AnalyticsPeriod::Week, now).await else {
            panic!("week");
        };
        assert_eq!(week.labels.len(), 7);
        assert_eq!(week.downloads, vec![1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(week.redemptions, vec![0, 0, 1, 0, 0, 0, 0]);

        let Ok(year) = analytics.series(business, AnalyticsPeriod::Year, now).await else {
            panic!("year");
        };
        assert_eq!(year.downloads.iter().sum::<u64>(), 1);
        assert_eq!(year.downloads.get(2), Some(&1));
    }
}
