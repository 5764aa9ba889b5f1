//! Profile DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::coupon_dto::{CouponDto, CreatorDto};
use crate::domain::CoordinateInput;
use crate::service::{BusinessPage, ProfileInput};

/// Body of `PUT /profile`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertProfileRequest {
    /// Display name.
    pub name: String,
    /// Business name.
    #[serde(default)]
    pub company_name: Option<String>,
    /// Free-text location.
    #[serde(default)]
    pub location: Option<String>,
    /// Latitude, number or numeric string.
    #[serde(default)]
    pub lat: Option<CoordinateInput>,
    /// Longitude, number or numeric string.
    #[serde(default)]
    pub lng: Option<CoordinateInput>,
}

impl From<UpsertProfileRequest> for ProfileInput {
    fn from(r: UpsertProfileRequest) -> Self {
        Self {
            name: r.name,
            company_name: r.company_name,
            location: r.location,
            lat: r.lat,
            lng: r.lng,
        }
    }
}

/// Payload of `GET /profile/business-profile`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BusinessProfileDto {
    /// The business.
    pub business: CreatorDto,
    /// One page of its coupons.
    pub coupons: Vec<CouponDto>,
}

impl From<BusinessPage> for BusinessProfileDto {
    fn from(page: BusinessPage) -> Self {
        Self {
            business: page.profile.into(),
            coupons: page.coupons.items.into_iter().map(Into::into).collect(),
        }
    }
}
