//! Discovery feed: filtering, distance/popularity ranking and the
//! featured carousel.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::{
    Category, CategoryId, CoordinateInput, Coupon, GeoPoint, Profile, ProfileId,
};
use crate::error::HubError;
use crate::persistence::{CouponFilter, CouponStore, PageWindow};

/// Maximum number of coupons in the carousel.
pub const CAROUSEL_LIMIT: usize = 20;

/// Feed request parameters.
#[derive(Debug, Clone, Default)]
pub struct FeedQuery {
    /// Free-text search over business names.
    pub query: Option<String>,
    /// Restrict to one category.
    pub category_id: Option<CategoryId>,
    /// Free-text location, also matched when `query` is set.
    pub location: Option<String>,
    /// Explicit caller latitude.
    pub lat: Option<CoordinateInput>,
    /// Explicit caller longitude.
    pub lng: Option<CoordinateInput>,
}

/// A coupon with its creator and distance from the caller.
#[derive(Debug, Clone)]
pub struct RankedCoupon {
    /// The coupon.
    pub coupon: Coupon,
    /// Creator summary, when the creator has a profile.
    pub creator: Option<Profile>,
    /// Haversine distance from the caller in kilometres.
    pub distance_km: f64,
}

/// One page of the discovery feed.
#[derive(Debug, Clone)]
pub struct Feed {
    /// All categories, only for unsearched feeds.
    pub categories: Option<Vec<Category>>,
    /// Shuffled featured coupons, only for unsearched feeds.
    pub carousel: Option<Vec<RankedCoupon>>,
    /// The ranked page.
    pub coupons: Vec<RankedCoupon>,
    /// Coupons matching the filters across all pages.
    pub total: u64,
}

/// Ranks coupons: distance ascending, then popularity descending. Both
/// sorts are stable, so popularity ties keep their distance order.
#[must_use]
pub fn rank(candidates: Vec<(Coupon, Option<Profile>)>, origin: GeoPoint) -> Vec<RankedCoupon> {
    let mut ranked: Vec<RankedCoupon> = candidates
        .into_iter()
        .map(|(coupon, creator)| {
            let position = creator
                .as_ref()
                .and_then(|p| p.coordinates)
                .unwrap_or(GeoPoint::ORIGIN);
            RankedCoupon {
                distance_km: origin.distance_km(&position),
                coupon,
                creator,
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.sort_by(|a, b| b.coupon.popularity_score().cmp(&a.coupon.popularity_score()));
    ranked
}

/// Picks up to [`CAROUSEL_LIMIT`] flagged coupons in random order.
pub fn pick_carousel<R: Rng + ?Sized>(ranked: &[RankedCoupon], rng: &mut R) -> Vec<RankedCoupon> {
    let mut flagged: Vec<RankedCoupon> = ranked
        .iter()
        .filter(|r| r.coupon.add_to_carousel)
        .cloned()
        .collect();
    flagged.shuffle(rng);
    flagged.truncate(CAROUSEL_LIMIT);
    flagged
}

/// Builds the discovery feed.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    store: Arc<dyn CouponStore>,
}

impl DiscoveryService {
    /// Creates a new `DiscoveryService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Builds one feed page for `caller` (anonymous when `None`).
    ///
    /// The whole filtered set is ranked before the page is cut, so page
    /// boundaries follow the ranking.
    ///
    /// # Errors
    ///
    /// [`HubError::CategoryNotFound`] for an unknown category filter,
    /// [`HubError::Validation`] for bad coordinates.
    pub async fn feed(
        &self,
        caller: Option<ProfileId>,
        query: FeedQuery,
        window: PageWindow,
    ) -> Result<Feed, HubError> {
        if let Some(category_id) = query.category_id {
            if self.store.get_category(category_id).await?.is_none() {
                return Err(HubError::CategoryNotFound(*category_id.as_uuid()));
            }
        }

        let origin = self.origin(caller, &query).await?;

        let search = query
            .query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty());
        let creators = match search {
            Some(q) => Some(
                self.store
                    .search_creators(q, query.location.as_deref().filter(|l| !l.trim().is_empty()))
                    .await?,
            ),
            None => None,
        };

        let filter = CouponFilter {
            category_id: query.category_id,
            creators,
            ..CouponFilter::default()
        };
        let page = self.store.find_coupons(&filter, None).await?;
        let total = page.total;

        let mut creator_ids: Vec<ProfileId> = page.items.iter().map(|c| c.created_by).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let profiles: HashMap<ProfileId, Profile> = self
            .store
            .get_profiles(&creator_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let candidates = page
            .items
            .into_iter()
            .map(|coupon| {
                let creator = profiles.get(&coupon.created_by).cloned();
                (coupon, creator)
            })
            .collect();
        let ranked = rank(candidates, origin);

        let (categories, carousel) = if search.is_none() {
            let carousel = pick_carousel(&ranked, &mut rand::rng());
            (Some(self.store.list_categories().await?), Some(carousel))
        } else {
            (None, None)
        };

        Ok(Feed {
            categories,
            carousel,
            coupons: window.apply(ranked),
            total,
        })
    }

    /// Explicit query coordinates, else the caller's stored profile, else
    /// the origin.
    async fn origin(
        &self,
        caller: Option<ProfileId>,
        query: &FeedQuery,
    ) -> Result<GeoPoint, HubError> {
        match (&query.lat, &query.lng) {
            (Some(lat), Some(lng)) => return GeoPoint::parse(lat, lng),
            (None, None) => {}
            _ => {
                return Err(HubError::Validation(
                    "'lat' and 'lng' must be provided together".to_string(),
                ));
            }
        }
        let Some(caller) = caller else {
            return Ok(GeoPoint::ORIGIN);
        };
        Ok(self
            .store
            .get_profile(caller)
            .await?
            .and_then(|p| p.coordinates)
            .unwrap_or(GeoPoint::ORIGIN))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::domain::{CouponCounters, Discount, NewCoupon, Role, ValidityWindow};
    use crate::persistence::MemoryStore;

    fn coupon(creator: ProfileId, category: CategoryId, redeem: u64, share: u64) -> Coupon {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        let end = NaiveDate::from_ymd_opt(2099, 1, 1).unwrap_or_default();
        let Ok(validity) = ValidityWindow::new(start, end) else {
            panic!("window");
        };
        let mut c = Coupon::new(NewCoupon {
            created_by: creator,
            category_id: category,
            discount: Discount::Percentage { value: 10.0 },
            more_details: None,
            validity,
            photo_url: "p.png".to_string(),
            carousel_photo_url: None,
            add_to_carousel: false,
        });
        c.counters = CouponCounters {
            redeem_count: redeem,
            share_count: share,
            ..CouponCounters::default()
        };
        c
    }

    fn business_at(company: &str, lat: f64, lng: f64) -> Profile {
        Profile {
            id: ProfileId::new(),
            role: Role::Business,
            name: company.to_string(),
            company_name: Some(company.to_string()),
            location: Some("CDMX".to_string()),
            coordinates: Some(GeoPoint { lat, lng }),
            updated_at: Utc::now(),
        }
    }

    /// Latitude offset of roughly `km` kilometres from the equator.
    fn km_north(km: f64) -> f64 {
        km / 111.195
    }

    #[test]
    fn popularity_beats_distance() {
        let category = CategoryId::new();
        let far = business_at("Far", km_north(10.0), 0.0);
        let near = business_at("Near", km_north(1.0), 0.0);
        let a = coupon(far.id, category, 5, 0);
        let b = coupon(near.id, category, 1, 1);

        let ranked = rank(
            vec![(b.clone(), Some(near)), (a.clone(), Some(far))],
            GeoPoint::ORIGIN,
        );
        let order: Vec<_> = ranked.iter().map(|r| r.coupon.id).collect();
        assert_eq!(order, vec![a.id, b.id]);
        let Some(first) = ranked.first() else {
            panic!("ranked");
        };
        assert!((first.distance_km - 10.0).abs() < 0.1);
    }

    #[test]
    fn distance_breaks_popularity_ties() {
        let category = CategoryId::new();
        let far = business_at("Far", km_north(30.0), 0.0);
        let near = business_at("Near", km_north(2.0), 0.0);
        let a = coupon(far.id, category, 2, 0);
        let b = coupon(near.id, category, 1, 1);
        let ranked = rank(
            vec![(a.clone(), Some(far)), (b.clone(), Some(near))],
            GeoPoint::ORIGIN,
        );
        let order: Vec<_> = ranked.iter().map(|r| r.coupon.id).collect();
        assert_eq!(order, vec![b.id, a.id]);
    }

    #[test]
    fn missing_creator_sits_at_origin() {
        let c = coupon(ProfileId::new(), CategoryId::new(), 0, 0);
        let ranked = rank(vec![(c, None)], GeoPoint::ORIGIN);
        assert_eq!(ranked.first().map(|r| r.distance_km), Some(0.0));
    }

    #[test]
    fn carousel_is_capped_and_shuffled() {
        let category = CategoryId::new();
        let ranked = rank(
            (0..30)
                .map(|_| {
                    let mut c = coupon(ProfileId::new(), category, 0, 0);
                    c.add_to_carousel = true;
                    (c, None)
                })
                .chain(std::iter::once((coupon(ProfileId::new(), category, 9, 9), None)))
                .collect(),
            GeoPoint::ORIGIN,
        );

        let mut rng = StdRng::seed_from_u64(7);
        let first = pick_carousel(&ranked, &mut rng);
        assert_eq!(first.len(), CAROUSEL_LIMIT);
        assert!(first.iter().all(|r| r.coupon.add_to_carousel));

        let flagged_order: Vec<_> = ranked
            .iter()
            .filter(|r| r.coupon.add_to_carousel)
            .take(CAROUSEL_LIMIT)
            .map(|r| r.coupon.id)
            .collect();
        let picked: Vec<_> = first.iter().map(|r| r.coupon.id).collect();
        assert_ne!(picked, flagged_order);
    }

    async fn seeded_store() -> (Arc<MemoryStore>, Category, Profile, Profile) {
        let store = Arc::new(MemoryStore::new());
        let category = Category::new("Food".to_string(), "icon".to_string(), Vec::new());
        let tacos = business_at("Tacos El Güero", km_north(5.0), 0.0);
        let pizza = business_at("Pizza Roma", km_north(1.0), 0.0);
        let Ok(()) = store.insert_category(&category).await else {
            panic!("category");
        };
        for profile in [&tacos, &pizza] {
            let Ok(()) = store.upsert_profile(profile).await else {
                panic!("profile");
            };
        }
        for (creator, carousel) in [(tacos.id, true), (pizza.id, false)] {
            let mut c = coupon(creator, category.id, 0, 0);
            c.add_to_carousel = carousel;
            let Ok(()) = store.insert_coupon(&c).await else {
                panic!("coupon");
            };
        }
        (store, category, tacos, pizza)
    }

    #[tokio::test]
    async fn unsearched_feed_includes_categories_and_carousel() {
        let (store, category, _, pizza) = seeded_store().await;
        let discovery = DiscoveryService::new(store);
        let Ok(feed) = discovery
            .feed(None, FeedQuery::default(), PageWindow::new(1, 10))
            .await
        else {
            panic!("feed");
        };
        assert_eq!(feed.total, 2);
        assert_eq!(feed.categories, Some(vec![category]));
        assert_eq!(feed.carousel.as_ref().map(Vec::len), Some(1));
        // Equal popularity: the nearer business comes first.
        assert_eq!(
            feed.coupons.first().map(|r| r.coupon.created_by),
            Some(pizza.id)
        );
    }

    #[tokio::test]
    async fn search_filters_by_company_and_hides_extras() {
        let (store, _, tacos, _) = seeded_store().await;
        let discovery = DiscoveryService::new(store);
        let query = FeedQuery {
            query: Some("tacos".to_string()),
            ..FeedQuery::default()
        };
        let Ok(feed) = discovery.feed(None, query, PageWindow::new(1, 10)).await else {
            panic!("feed");
        };
        assert_eq!(feed.total, 1);
        assert!(feed.categories.is_none());
        assert!(feed.carousel.is_none());
        assert_eq!(
            feed.coupons.first().map(|r| r.coupon.created_by),
            Some(tacos.id)
        );
    }

    #[tokio::test]
    async fn explicit_coordinates_override_profile() {
        let (store, _, tacos, _) = seeded_store().await;
        let discovery = DiscoveryService::new(store);
        let query = FeedQuery {
            lat: Some(CoordinateInput::from("0.045")),
            lng: Some(CoordinateInput::from(0.0)),
            ..FeedQuery::default()
        };
        let Ok(feed) = discovery.feed(None, query, PageWindow::new(1, 10)).await else {
            panic!("feed");
        };
        // 0.045° north is ~5 km: right on top of the taco stand.
        assert_eq!(
            feed.coupons.first().map(|r| r.coupon.created_by),
            Some(tacos.id)
        );
    }

    #[tokio::test]
    async fn bad_filters_are_rejected() {
        let (store, _, _, _) = seeded_store().await;
        let discovery = DiscoveryService::new(store);
        let unknown = FeedQuery {
            category_id: Some(CategoryId::new()),
            ..FeedQuery::default()
        };
        assert!(matches!(
            discovery.feed(None, unknown, PageWindow::new(1, 10)).await,
            Err(HubError::CategoryNotFound(_))
        ));
        let half = FeedQuery {
            lat: Some(CoordinateInput::from(1.0)),
            ..FeedQuery::default()
        };
        assert!(matches!(
            discovery.feed(None, half, PageWindow::new(1, 10)).await,
            Err(HubError::Validation(_))
        ));
        let garbage = FeedQuery {
            lat: Some(CoordinateInput::from("north")),
            lng: Some(CoordinateInput::from(0.0)),
            ..FeedQuery::default()
        };
        assert!(matches!(
            discovery.feed(None, garbage, PageWindow::new(1, 10)).await,
            Err(HubError::Validation(_))
        ));
    }
}
