//! Profile summaries used for joins, distance ranking and business pages.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::Identity;
use crate::domain::{
    CoordinateInput, Coupon, GeoPoint, Profile, ProfileId, Role, Visit, VisitSubject,
};
use crate::error::HubError;
use crate::persistence::{CouponFilter, CouponStore, Page, PageWindow};

/// Input of [`ProfileService::upsert_own`].
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    /// Display name.
    pub name: String,
    /// Business name.
    pub company_name: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Latitude, number or numeric string.
    pub lat: Option<CoordinateInput>,
    /// Longitude, number or numeric string.
    pub lng: Option<CoordinateInput>,
}

/// A business profile with one page of its coupons.
#[derive(Debug, Clone)]
pub struct BusinessPage {
    /// The business summary.
    pub profile: Profile,
    /// Its coupons, newest first.
    pub coupons: Page<Coupon>,
}

/// Profile operations.
#[derive(Debug, Clone)]
pub struct ProfileService {
    store: Arc<dyn CouponStore>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ProfileService {
    /// Creates a new `ProfileService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>) -> Self {
        Self { store }
    }

    /// Writes the caller's own summary. The role always comes from the
    /// access token.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] for an empty name, half a coordinate pair,
    /// or non-numeric coordinates.
    pub async fn upsert_own(
        &self,
        caller: &Identity,
        input: ProfileInput,
    ) -> Result<Profile, HubError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(HubError::Validation("name is required".to_string()));
        }
        let coordinates = match (&input.lat, &input.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::parse(lat, lng)?),
            (None, None) => None,
            _ => {
                return Err(HubError::Validation(
                    "'lat' and 'lng' must be provided together".to_string(),
                ));
            }
        };

        let profile = Profile {
            id: caller.id,
            role: caller.role,
            name: name.to_string(),
            company_name: non_blank(input.company_name),
            location: non_blank(input.location),
            coordinates,
            updated_at: Utc::now(),
        };
        self.store.upsert_profile(&profile).await?;
        tracing::info!(profile_id = %profile.id, role = profile.role.as_str(), "profile saved");
        Ok(profile)
    }

    /// Fetches a profile.
    ///
    /// # Errors
    ///
    /// [`HubError::ProfileNotFound`] if none exists.
    pub async fn get(&self, id: ProfileId) -> Result<Profile, HubError> {
        self.store
            .get_profile(id)
            .await?
            .ok_or(HubError::ProfileNotFound(*id.as_uuid()))
    }

    /// Business page view: the summary plus a page of coupons. Records a
    /// business visit.
    ///
    /// # Errors
    ///
    /// [`HubError::ProfileNotFound`] if `business` has no business
    /// profile.
    pub async fn business_profile(
        &self,
        business: ProfileId,
        visitor: Option<ProfileId>,
        window: PageWindow,
    ) -> Result<BusinessPage, HubError> {
        let profile = self.get(business).await?;
        if profile.role != Role::Business {
            return Err(HubError::ProfileNotFound(*business.as_uuid()));
        }

        let filter = CouponFilter {
            created_by: Some(business),
            ..CouponFilter::default()
        };
        let coupons = self.store.find_coupons(&filter, Some(window)).await?;
        self.store
            .insert_visit(&Visit::now(visitor, VisitSubject::Business(business)))
            .await?;

        tracing::debug!(%business, visitor = ?visitor, "business profile visited");
        Ok(BusinessPage { profile, coupons })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    fn caller(role: Role) -> Identity {
        Identity {
            id: ProfileId::new(),
            email: "owner@example.com".to_string(),
            role,
        }
    }

    fn input() -> ProfileInput {
        ProfileInput {
            name: " Ana ".to_string(),
            company_name: Some("Tacos El Güero".to_string()),
            location: Some("  ".to_string()),
            lat: Some(CoordinateInput::from("19.4326")),
            lng: Some(CoordinateInput::from(-99.1332)),
        }
    }

    #[tokio::test]
    async fn upsert_coerces_and_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let profiles = ProfileService::new(Arc::clone(&store) as Arc<dyn CouponStore>);
        let owner = caller(Role::Business);

        let Ok(saved) = profiles.upsert_own(&owner, input()).await else {
            panic!("upsert");
        };
        assert_eq!(saved.name, "Ana");
        assert_eq!(saved.location, None);
        assert_eq!(
            saved.coordinates,
            Some(GeoPoint {
                lat: 19.4326,
                lng: -99.1332
            })
        );

        let second = ProfileInput {
            name: "Ana María".to_string(),
            ..ProfileInput::default()
        };
        let Ok(_) = profiles.upsert_own(&owner, second).await else {
            panic!("second upsert");
        };
        let Ok(stored) = profiles.get(owner.id).await else {
            panic!("get");
        };
        assert_eq!(stored.name, "Ana María");
        assert_eq!(stored.coordinates, None);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let profiles = ProfileService::new(Arc::new(MemoryStore::new()));
        let half = ProfileInput {
            lng: None,
            ..input()
        };
        assert!(matches!(
            profiles.upsert_own(&caller(Role::User), half).await,
            Err(HubError::Validation(_))
        ));
        let text = ProfileInput {
            lat: Some(CoordinateInput::from("somewhere")),
            ..input()
        };
        assert!(matches!(
            profiles.upsert_own(&caller(Role::User), text).await,
            Err(HubError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn business_page_records_a_visit() {
        let store = Arc::new(MemoryStore::new());
        let profiles = ProfileService::new(Arc::clone(&store) as Arc<dyn CouponStore>);
        let owner = caller(Role::Business);
        let Ok(_) = profiles.upsert_own(&owner, input()).await else {
            panic!("upsert");
        };

        let Ok(page) = profiles
            .business_profile(owner.id, Some(ProfileId::new()), PageWindow::new(1, 10))
            .await
        else {
            panic!("business page");
        };
        assert_eq!(page.profile.id, owner.id);
        assert_eq!(page.coupons.total, 0);
        assert!(matches!(store.count_business_visits(owner.id).await, Ok(1)));
    }

    #[tokio::test]
    async fn plain_users_have_no_business_page() {
        let store = Arc::new(MemoryStore::new());
        let profiles = ProfileService::new(Arc::clone(&store) as Arc<dyn CouponStore>);
        let user = caller(Role::User);
        let Ok(_) = profiles.upsert_own(&user, input()).await else {
            panic!("upsert");
        };
        assert!(matches!(
            profiles
                .business_profile(user.id, None, PageWindow::new(1, 10))
                .await,
            Err(HubError::ProfileNotFound(_))
        ));
        assert!(matches!(
            profiles
                .business_profile(ProfileId::new(), None, PageWindow::new(1, 10))
                .await,
            Err(HubError::ProfileNotFound(_))
        ));
    }
}
