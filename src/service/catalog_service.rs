//! Coupon catalog: creation, partial updates, deletion and the public
//! explore/share counters.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::Identity;
use crate::domain::{
    CategoryId, Coupon, CouponCounter, CouponId, DiscountFields, NewCoupon, ProfileId, Role,
    ValidityWindow, Visit, VisitSubject, coupon::parse_date,
};
use crate::error::HubError;
use crate::media::{MediaFile, MediaUploader};
use crate::persistence::{CouponFilter, CouponStore, Page, PageWindow};

/// Input of [`CatalogService::create`], straight from the multipart form.
#[derive(Debug, Clone)]
pub struct CreateCouponInput {
    /// Category the coupon is listed under.
    pub category_id: CategoryId,
    /// Discount fields; exactly one variant must be set.
    pub discount: DiscountFields,
    /// First valid day, `DD/MM/YYYY`.
    pub start: String,
    /// Last valid day, `DD/MM/YYYY`.
    pub end: String,
    /// Free-text conditions.
    pub more_details: Option<String>,
    /// Featured placement flag.
    pub add_to_carousel: bool,
    /// Primary photo.
    pub photo: MediaFile,
    /// Optional carousel banner.
    pub carousel_photo: Option<MediaFile>,
}

/// Input of [`CatalogService::update`]. Absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct UpdateCouponInput {
    /// New category.
    pub category_id: Option<CategoryId>,
    /// Discount overrides, merged over the stored discount.
    pub discount: DiscountFields,
    /// New first valid day, `DD/MM/YYYY`.
    pub start: Option<String>,
    /// New last valid day, `DD/MM/YYYY`.
    pub end: Option<String>,
    /// New conditions.
    pub more_details: Option<String>,
    /// New featured flag.
    pub add_to_carousel: Option<bool>,
    /// Replacement photo.
    pub photo: Option<MediaFile>,
    /// Replacement carousel banner.
    pub carousel_photo: Option<MediaFile>,
}

/// Coupon catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogService {
    store: Arc<dyn CouponStore>,
    media: Arc<dyn MediaUploader>,
}

impl CatalogService {
    /// Creates a new `CatalogService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>, media: Arc<dyn MediaUploader>) -> Self {
        Self { store, media }
    }

    /// Publishes a coupon for the calling business.
    ///
    /// Everything is validated before any file is uploaded.
    ///
    /// # Errors
    ///
    /// [`HubError::Forbidden`] for non-business callers,
    /// [`HubError::Validation`] for a bad discount, date or file,
    /// [`HubError::CategoryNotFound`] for an unknown category.
    pub async fn create(
        &self,
        caller: &Identity,
        input: CreateCouponInput,
    ) -> Result<Coupon, HubError> {
        caller.require(&[Role::Business])?;
        let discount = input.discount.resolve()?;
        let validity = ValidityWindow::parse(&input.start, &input.end)?;
        self.ensure_category(input.category_id).await?;
        input.photo.ensure_image()?;
        if let Some(banner) = &input.carousel_photo {
            banner.ensure_image()?;
        }

        let photo_url = self.media.upload(input.photo).await?;
        let carousel_photo_url = match input.carousel_photo {
            Some(banner) => Some(self.media.upload(banner).await?),
            None => None,
        };

        let coupon = Coupon::new(NewCoupon {
            created_by: caller.id,
            category_id: input.category_id,
            discount,
            more_details: input.more_details.filter(|d| !d.trim().is_empty()),
            validity,
            photo_url,
            carousel_photo_url,
            add_to_carousel: input.add_to_carousel,
        });
        self.store.insert_coupon(&coupon).await?;

        tracing::info!(coupon_id = %coupon.id, created_by = %coupon.created_by, "coupon created");
        Ok(coupon)
    }

    /// Applies a partial update. Only the owning business may edit.
    ///
    /// The stored discount is the base for the overrides, and the merged
    /// result is validated again, so an update can never mix variants.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`], [`HubError::Forbidden`] for
    /// non-owners, [`HubError::Validation`], [`HubError::CategoryNotFound`].
    pub async fn update(
        &self,
        caller: &Identity,
        coupon_id: CouponId,
        input: UpdateCouponInput,
    ) -> Result<Coupon, HubError> {
        let mut coupon = self.get(coupon_id).await?;
        if coupon.created_by != caller.id {
            return Err(HubError::Forbidden(
                "only the coupon owner may update it".to_string(),
            ));
        }

        if !input.discount.is_empty() {
            coupon.discount = input.discount.overlay(coupon.discount.to_fields()).resolve()?;
        }
        if input.start.is_some() || input.end.is_some() {
            let start = match &input.start {
                Some(s) => parse_date(s)?,
                None => coupon.validity.start,
            };
            let end = match &input.end {
                Some(e) => parse_date(e)?,
                None => coupon.validity.end,
            };
            coupon.validity = ValidityWindow::new(start, end)?;
        }
        if let Some(category_id) = input.category_id {
            self.ensure_category(category_id).await?;
            coupon.category_id = category_id;
        }
        if let Some(details) = input.more_details {
            coupon.more_details = Some(details).filter(|d| !d.trim().is_empty());
        }
        if let Some(flag) = input.add_to_carousel {
            coupon.add_to_carousel = flag;
        }
        if let Some(photo) = &input.photo {
            photo.ensure_image()?;
        }
        if let Some(banner) = &input.carousel_photo {
            banner.ensure_image()?;
        }
        if let Some(photo) = input.photo {
            coupon.photo_url = self.media.upload(photo).await?;
        }
        if let Some(banner) = input.carousel_photo {
            coupon.carousel_photo_url = Some(self.media.upload(banner).await?);
        }
        coupon.updated_at = Utc::now();

        if !self.store.update_coupon(&coupon).await? {
            return Err(HubError::CouponNotFound(*coupon_id.as_uuid()));
        }
        tracing::info!(%coupon_id, "coupon updated");
        // Re-read so the counters reflect concurrent increments.
        self.get(coupon_id).await
    }

    /// Fetches a coupon.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`] if it does not exist.
    pub async fn get(&self, coupon_id: CouponId) -> Result<Coupon, HubError> {
        self.store
            .get_coupon(coupon_id)
            .await?
            .ok_or(HubError::CouponNotFound(*coupon_id.as_uuid()))
    }

    /// Fetches a coupon through the public endpoint, counting a
    /// click-to-explore: `explore_count` is incremented and a coupon visit
    /// is recorded.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`] if it does not exist.
    pub async fn explore(
        &self,
        coupon_id: CouponId,
        visitor: Option<ProfileId>,
    ) -> Result<Coupon, HubError> {
        if !self
            .store
            .increment_counter(coupon_id, CouponCounter::Explore)
            .await?
        {
            return Err(HubError::CouponNotFound(*coupon_id.as_uuid()));
        }
        self.store
            .insert_visit(&Visit::now(visitor, VisitSubject::Coupon(coupon_id)))
            .await?;
        self.get(coupon_id).await
    }

    /// Increments `share_count`.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`] if it does not exist.
    pub async fn share(&self, coupon_id: CouponId) -> Result<Coupon, HubError> {
        if !self
            .store
            .increment_counter(coupon_id, CouponCounter::Share)
            .await?
        {
            return Err(HubError::CouponNotFound(*coupon_id.as_uuid()));
        }
        tracing::debug!(%coupon_id, "coupon shared");
        self.get(coupon_id).await
    }

    /// Coupons created by `creator`, newest first.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn list_by_creator(
        &self,
        creator: ProfileId,
        window: PageWindow,
    ) -> Result<Page<Coupon>, HubError> {
        let filter = CouponFilter {
            created_by: Some(creator),
            ..CouponFilter::default()
        };
        self.store.find_coupons(&filter, Some(window)).await
    }

    /// Coupons in `category_id`, newest first.
    ///
    /// # Errors
    ///
    /// [`HubError::CategoryNotFound`] for an unknown category.
    pub async fn list_by_category(
        &self,
        category_id: CategoryId,
        window: PageWindow,
    ) -> Result<Page<Coupon>, HubError> {
        self.ensure_category(category_id).await?;
        let filter = CouponFilter {
            category_id: Some(category_id),
            ..CouponFilter::default()
        };
        self.store.find_coupons(&filter, Some(window)).await
    }

    /// Hard-deletes a coupon and its ledger entries. Owner only.
    ///
    /// # Errors
    ///
    /// [`HubError::CouponNotFound`], [`HubError::Forbidden`] for
    /// non-owners.
    pub async fn delete(&self, caller: &Identity, coupon_id: CouponId) -> Result<(), HubError> {
        let coupon = self.get(coupon_id).await?;
        if coupon.created_by != caller.id {
            return Err(HubError::Forbidden(
                "only the coupon owner may delete it".to_string(),
            ));
        }
        if !self.store.delete_coupon(coupon_id).await? {
            return Err(HubError::CouponNotFound(*coupon_id.as_uuid()));
        }
        tracing::info!(%coupon_id, "coupon deleted");
        Ok(())
    }

    async fn ensure_category(&self, category_id: CategoryId) -> Result<(), HubError> {
        match self.store.get_category(category_id).await? {
            Some(_) => Ok(()),
            None => Err(HubError::CategoryNotFound(*category_id.as_uuid())),
        }
    }
}
