//! Coupon, ledger, redemption and analytics DTOs.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{AnalyticsPeriod, Coupon, CouponCounters, DiscountFields, Profile};
use crate::domain::{CategoryId, CouponId, LedgerEntryId, ProfileId};
use crate::service::{AnalyticsSeries, AnalyticsTotals, IssuedToken, LedgerItem};

/// Wire format of a calendar date.
const DATE_FORMAT: &str = "%d/%m/%Y";

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Public summary of a coupon's creator.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreatorDto {
    /// Profile id.
    pub id: ProfileId,
    /// Display name.
    pub name: String,
    /// Business name.
    pub company_name: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Latitude, if known.
    pub lat: Option<f64>,
    /// Longitude, if known.
    pub lng: Option<f64>,
}

impl From<Profile> for CreatorDto {
    fn from(p: Profile) -> Self {
        Self {
            id: p.id,
            name: p.name,
            company_name: p.company_name,
            location: p.location,
            lat: p.coordinates.map(|c| c.lat),
            lng: p.coordinates.map(|c| c.lng),
        }
    }
}

/// A coupon as returned by the API. The discount is flattened back into
/// its optional fields; exactly one group is set.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponDto {
    /// Coupon id.
    pub id: CouponId,
    /// Creating business.
    pub created_by: ProfileId,
    /// Category.
    pub category_id: CategoryId,
    /// Discount fields.
    #[serde(flatten)]
    pub discount: DiscountFields,
    /// First valid day, `DD/MM/YYYY`.
    pub start: String,
    /// Last valid day, `DD/MM/YYYY`.
    pub end: String,
    /// Free-text conditions.
    pub more_details: Option<String>,
    /// Primary photo URL.
    pub photo: String,
    /// Carousel banner URL.
    pub carousel_photo: Option<String>,
    /// Featured placement flag.
    pub add_to_carousel: bool,
    /// Engagement counters.
    #[serde(flatten)]
    pub counters: CouponCounters,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Coupon> for CouponDto {
    fn from(c: Coupon) -> Self {
        Self {
            id: c.id,
            created_by: c.created_by,
            category_id: c.category_id,
            discount: c.discount.to_fields(),
            start: format_date(c.validity.start),
            end: format_date(c.validity.end),
            more_details: c.more_details,
            photo: c.photo_url,
            carousel_photo: c.carousel_photo_url,
            add_to_carousel: c.add_to_carousel,
            counters: c.counters,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// A downloaded coupon in the user's ledger.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LedgerItemDto {
    /// Ledger entry id, used to request a QR code.
    pub id: LedgerEntryId,
    /// Whether the coupon was used.
    pub redeemed: bool,
    /// When it was used.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// When it was downloaded.
    pub created_at: DateTime<Utc>,
    /// The coupon.
    pub coupon: CouponDto,
    /// The coupon's business.
    pub created_by: Option<CreatorDto>,
}

impl From<LedgerItem> for LedgerItemDto {
    fn from(item: LedgerItem) -> Self {
        Self {
            id: item.entry.id,
            redeemed: item.entry.redeemed,
            redeemed_at: item.entry.redeemed_at,
            created_at: item.entry.created_at,
            coupon: item.coupon.into(),
            created_by: item.creator.map(Into::into),
        }
    }
}

/// Payload of `GET /coupons`: a business's own coupons or a user's
/// downloaded ones.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum CouponListDto {
    /// Coupons the business created.
    Created(Vec<CouponDto>),
    /// Coupons the user downloaded.
    Downloaded(Vec<LedgerItemDto>),
}

/// Multipart form of `POST /coupons` and `PATCH /coupons`.
///
/// Documentation only; the handler reads the fields one by one. On
/// `PATCH` every field except `id` is optional.
#[derive(Debug, ToSchema)]
pub struct CouponForm {
    /// Coupon to update (`PATCH` only).
    pub id: Option<uuid::Uuid>,
    /// Category the coupon is listed under.
    pub category_id: Option<uuid::Uuid>,
    /// Percentage off.
    pub discount_percentage: Option<f64>,
    /// Promotion headline.
    pub promo_title: Option<String>,
    /// Regular price of the fixed triple.
    pub regular_amount: Option<f64>,
    /// Discount of the fixed triple.
    pub discount_amount: Option<f64>,
    /// Converted (MXN) price of the fixed triple.
    pub mxn_amount: Option<f64>,
    /// First valid day, `DD/MM/YYYY`.
    pub start: Option<String>,
    /// Last valid day, `DD/MM/YYYY`.
    pub end: Option<String>,
    /// Free-text conditions.
    pub more_details: Option<String>,
    /// `true` to feature the coupon in the carousel.
    pub add_to_carousel: Option<bool>,
    /// Primary photo.
    #[schema(value_type = Option<String>, format = Binary)]
    pub photo: Option<Vec<u8>>,
    /// Carousel banner (also accepted as `carousel_image`).
    #[schema(value_type = Option<String>, format = Binary)]
    pub carousel_photo: Option<Vec<u8>>,
}

/// Ledger entry returned by `GET /coupons/download`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DownloadDto {
    /// Ledger entry id.
    pub id: LedgerEntryId,
    /// Downloaded coupon.
    pub coupon_id: CouponId,
    /// Download timestamp.
    pub created_at: DateTime<Utc>,
}

/// Response of `GET /coupons/qr-code`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QrCodeDto {
    /// Link that redeems the coupon when opened.
    pub url: String,
    /// QR code of `url` as an SVG document.
    pub qr_code: String,
    /// The link stops working after this instant.
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for QrCodeDto {
    fn from(issued: IssuedToken) -> Self {
        Self {
            url: issued.url,
            qr_code: issued.qr_svg,
            expires_at: issued.expires_at,
        }
    }
}

/// `?token=` query of the redemption link.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RedeemQuery {
    /// Signed redemption token.
    #[serde(default)]
    pub token: String,
}

/// Body of `POST /coupons/share-coupon`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShareRequest {
    /// Shared coupon.
    pub id: uuid::Uuid,
}

/// `?type=` query of `GET /coupons/analytics`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// `week`, `month` or `year`.
    #[serde(rename = "type")]
    pub period: String,
}

/// Time-bucketed analytics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnalyticsSeriesDto {
    /// Selected period.
    #[serde(rename = "type")]
    pub period: AnalyticsPeriod,
    /// Bucket labels.
    pub labels: Vec<String>,
    /// Downloads per bucket.
    pub downloads: Vec<u64>,
    /// Redemptions per bucket.
    pub redemptions: Vec<u64>,
}

impl From<AnalyticsSeries> for AnalyticsSeriesDto {
    fn from(s: AnalyticsSeries) -> Self {
        Self {
            period: s.period,
            labels: s.labels,
            downloads: s.downloads,
            redemptions: s.redemptions,
        }
    }
}

/// Lifetime analytics totals.
#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct AnalyticsTotalsDto {
    /// Downloads of the business's coupons.
    pub total_downloads: u64,
    /// Shares of the business's coupons.
    pub total_shares: u64,
    /// Coupon detail views.
    pub click_to_explore: u64,
    /// Coupons past their end date.
    pub expired_coupons: u64,
    /// Business page views.
    pub profile_visits: u64,
    /// Sum of fixed discount amounts.
    pub value: f64,
}

impl From<AnalyticsTotals> for AnalyticsTotalsDto {
    fn from(t: AnalyticsTotals) -> Self {
        Self {
            total_downloads: t.total_downloads,
            total_shares: t.total_shares,
            click_to_explore: t.click_to_explore,
            expired_coupons: t.expired_coupons,
            profile_visits: t.profile_visits,
            value: t.value,
        }
    }
}
