//! Row types for the PostgreSQL tables and their conversion into domain
//! entities.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::{
    Category, CategoryTranslation, Coupon, CouponCounters, DiscountFields, GeoPoint, LedgerEntry,
    Profile, Role, ValidityWindow,
};
use crate::error::HubError;

/// Column list matching [`CouponRow`].
pub const COUPON_COLUMNS: &str = "id, created_by, category_id, discount_percentage, promo_title, \
     regular_amount, discount_amount, mxn_amount, more_details, start_date, end_date, photo_url, \
     carousel_photo_url, add_to_carousel, redeem_count, download_count, share_count, \
     explore_count, created_at, updated_at";

/// A row of the `categories` table.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique name.
    pub name: String,
    /// Icon URL.
    pub icon_url: String,
    /// JSONB array of translations.
    pub translations: Json<Vec<CategoryTranslation>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id.into(),
            name: row.name,
            icon_url: row.icon_url,
            translations: row.translations.0,
        }
    }
}

/// A row of the `profiles` table.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    /// Primary key.
    pub id: Uuid,
    /// Lowercase role name.
    pub role: String,
    /// Display name.
    pub name: String,
    /// Business name.
    pub company_name: Option<String>,
    /// Free-text location.
    pub location: Option<String>,
    /// Latitude, set together with `lng`.
    pub lat: Option<f64>,
    /// Longitude, set together with `lat`.
    pub lng: Option<f64>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = HubError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role).ok_or_else(|| {
            HubError::Persistence(format!("profile {} has unknown role '{}'", row.id, row.role))
        })?;
        let coordinates = match (row.lat, row.lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
            _ => None,
        };
        Ok(Self {
            id: row.id.into(),
            role,
            name: row.name,
            company_name: row.company_name,
            location: row.location,
            coordinates,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `coupons` table. The discount is stored flat, one
/// nullable column per [`DiscountFields`] field.
#[derive(Debug, Clone, FromRow)]
pub struct CouponRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning business.
    pub created_by: Uuid,
    /// Category reference.
    pub category_id: Uuid,
    /// Percentage discount.
    pub discount_percentage: Option<f64>,
    /// Promotion headline.
    pub promo_title: Option<String>,
    /// Regular price.
    pub regular_amount: Option<f64>,
    /// Discount amount.
    pub discount_amount: Option<f64>,
    /// Converted price.
    pub mxn_amount: Option<f64>,
    /// Conditions.
    pub more_details: Option<String>,
    /// First valid day.
    pub start_date: NaiveDate,
    /// Last valid day.
    pub end_date: NaiveDate,
    /// Photo URL.
    pub photo_url: String,
    /// Carousel banner URL.
    pub carousel_photo_url: Option<String>,
    /// Featured flag.
    pub add_to_carousel: bool,
    /// Redemptions.
    pub redeem_count: i64,
    /// Downloads.
    pub download_count: i64,
    /// Shares.
    pub share_count: i64,
    /// Explore views.
    pub explore_count: i64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

fn counter(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

impl TryFrom<CouponRow> for Coupon {
    type Error = HubError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let corrupt = |e: HubError| HubError::Persistence(format!("coupon {}: {e}", row.id));
        let discount = DiscountFields {
            discount_percentage: row.discount_percentage,
            promo_title: row.promo_title.clone(),
            regular_amount: row.regular_amount,
            discount_amount: row.discount_amount,
            mxn_amount: row.mxn_amount,
        }
        .resolve()
        .map_err(corrupt)?;
        let validity = ValidityWindow::new(row.start_date, row.end_date).map_err(corrupt)?;
        Ok(Self {
            id: row.id.into(),
            created_by: row.created_by.into(),
            category_id: row.category_id.into(),
            discount,
            more_details: row.more_details,
            validity,
            photo_url: row.photo_url,
            carousel_photo_url: row.carousel_photo_url,
            add_to_carousel: row.add_to_carousel,
            counters: CouponCounters {
                redeem_count: counter(row.redeem_count),
                download_count: counter(row.download_count),
                share_count: counter(row.share_count),
                explore_count: counter(row.explore_count),
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `downloaded_coupons` table.
#[derive(Debug, Clone, FromRow)]
pub struct LedgerRow {
    /// Primary key.
    pub id: Uuid,
    /// Claiming user.
    pub user_id: Uuid,
    /// Claimed coupon.
    pub coupon_id: Uuid,
    /// Redemption flag.
    pub redeemed: bool,
    /// Redemption time.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Download time.
    pub created_at: DateTime<Utc>,
}

impl From<LedgerRow> for LedgerEntry {
    fn from(row: LedgerRow) -> Self {
        Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            coupon_id: row.coupon_id.into(),
            redeemed: row.redeemed,
            redeemed_at: row.redeemed_at,
            created_at: row.created_at,
        }
    }
}
