//! Discovery feed DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::common_dto::{PaginationParams, leading_int};
use super::coupon_dto::{CouponDto, CreatorDto};
use crate::domain::{Category, CategoryId, CoordinateInput};
use crate::service::{FeedQuery, RankedCoupon};

/// Query parameters of `GET /home`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HomeQuery {
    /// Free-text search over business names.
    pub query: Option<String>,
    /// Restrict to one category.
    pub category_id: Option<uuid::Uuid>,
    /// Free-text location, matched alongside `query`.
    pub location: Option<String>,
    /// Caller latitude; overrides the stored profile.
    pub lat: Option<String>,
    /// Caller longitude; overrides the stored profile.
    pub lng: Option<String>,
    /// Page number (1-indexed). Defaults to 1.
    #[serde(default, deserialize_with = "leading_int")]
    pub page: Option<u32>,
    /// Items per page. Defaults to 10.
    #[serde(default, deserialize_with = "leading_int")]
    pub limit: Option<u32>,
}

impl HomeQuery {
    /// Splits into feed filters and pagination.
    #[must_use]
    pub fn into_parts(self) -> (FeedQuery, PaginationParams) {
        let defaults = PaginationParams::default();
        let paging = PaginationParams {
            page: self.page.filter(|p| *p > 0).unwrap_or(defaults.page),
            limit: self.limit.filter(|l| *l > 0).unwrap_or(defaults.limit),
        };
        let filters = FeedQuery {
            query: self.query,
            category_id: self.category_id.map(CategoryId::from_uuid),
            location: self.location,
            lat: self.lat.map(CoordinateInput::Text),
            lng: self.lng.map(CoordinateInput::Text),
        };
        (filters, paging)
    }
}

/// A ranked coupon with its creator and distance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RankedCouponDto {
    /// The coupon.
    #[serde(flatten)]
    pub coupon: CouponDto,
    /// The coupon's business.
    pub creator: Option<CreatorDto>,
    /// Distance from the caller in kilometres.
    pub distance: f64,
}

impl From<RankedCoupon> for RankedCouponDto {
    fn from(r: RankedCoupon) -> Self {
        Self {
            coupon: r.coupon.into(),
            creator: r.creator.map(Into::into),
            distance: r.distance_km,
        }
    }
}

/// Payload of `GET /home`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FeedDto {
    /// All categories; omitted for searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    /// Featured coupons in random order; omitted for searches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carousel: Option<Vec<RankedCouponDto>>,
    /// The ranked page.
    pub coupons: Vec<RankedCouponDto>,
}
