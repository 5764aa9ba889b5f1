//! Coupon aggregate: discount variant, validity window and counters.
//!
//! The discount is a sum type at this layer. Clients and the database see
//! the flexible five-field representation ([`DiscountFields`]); conversion
//! happens only through [`DiscountFields::resolve`] and
//! [`Discount::to_fields`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CategoryId, CouponId, ProfileId};
use crate::error::HubError;

/// The discount a coupon grants. Exactly one variant per coupon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage off the regular price.
    Percentage {
        /// Percentage in `(0, 100]`.
        value: f64,
    },
    /// Free-text promotion ("2x1 on drinks").
    PromoTitle {
        /// Promotion headline.
        title: String,
    },
    /// Fixed price triple.
    FixedAmounts {
        /// Price without the coupon.
        regular_amount: f64,
        /// Amount taken off by the coupon.
        discount_amount: f64,
        /// Price in local currency (MXN) after the discount.
        converted_amount: f64,
    },
}

impl Discount {
    /// Flattens the variant back into the optional-field representation.
    #[must_use]
    pub fn to_fields(&self) -> DiscountFields {
        match self {
            Self::Percentage { value } => DiscountFields {
                discount_percentage: Some(*value),
                ..DiscountFields::default()
            },
            Self::PromoTitle { title } => DiscountFields {
                promo_title: Some(title.clone()),
                ..DiscountFields::default()
            },
            Self::FixedAmounts {
                regular_amount,
                discount_amount,
                converted_amount,
            } => DiscountFields {
                regular_amount: Some(*regular_amount),
                discount_amount: Some(*discount_amount),
                mxn_amount: Some(*converted_amount),
                ..DiscountFields::default()
            },
        }
    }

    /// Discount amount for fixed-amount coupons, `None` otherwise.
    #[must_use]
    pub const fn discount_amount(&self) -> Option<f64> {
        match self {
            Self::FixedAmounts {
                discount_amount, ..
            } => Some(*discount_amount),
            _ => None,
        }
    }
}

/// Flexible discount representation used on the wire and in storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountFields {
    /// Percentage off.
    pub discount_percentage: Option<f64>,
    /// Promotion headline. Empty strings count as absent.
    pub promo_title: Option<String>,
    /// Regular price of the fixed triple.
    pub regular_amount: Option<f64>,
    /// Discount of the fixed triple.
    pub discount_amount: Option<f64>,
    /// Converted (MXN) price of the fixed triple.
    pub mxn_amount: Option<f64>,
}

impl DiscountFields {
    /// Returns `self` with every absent field taken from `base`.
    ///
    /// Used by partial updates: the stored discount is the base, the request
    /// provides the overrides, and the merged result is validated again.
    #[must_use]
    pub fn overlay(self, base: Self) -> Self {
        Self {
            discount_percentage: self.discount_percentage.or(base.discount_percentage),
            promo_title: non_empty(self.promo_title).or_else(|| non_empty(base.promo_title)),
            regular_amount: self.regular_amount.or(base.regular_amount),
            discount_amount: self.discount_amount.or(base.discount_amount),
            mxn_amount: self.mxn_amount.or(base.mxn_amount),
        }
    }

    /// Returns `true` when no discount field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.discount_percentage.is_none()
            && non_empty(self.promo_title.clone()).is_none()
            && self.regular_amount.is_none()
            && self.discount_amount.is_none()
            && self.mxn_amount.is_none()
    }

    /// Validates the exclusivity rule and converts into a [`Discount`].
    ///
    /// Exactly one of `discount_percentage`, `promo_title` or the complete
    /// triple (`regular_amount`, `discount_amount`, `mxn_amount`) must be
    /// present.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when no variant, more than one
    /// variant, or a partial triple is provided, or when a value is out of
    /// range.
    pub fn resolve(&self) -> Result<Discount, HubError> {
        let title = non_empty(self.promo_title.clone());
        let has_percentage = self.discount_percentage.is_some();
        let has_title = title.is_some();
        let amounts_present = [self.regular_amount, self.discount_amount, self.mxn_amount]
            .iter()
            .filter(|a| a.is_some())
            .count();
        let has_triple = amounts_present == 3;
        let has_partial_triple = amounts_present > 0 && !has_triple;

        if !has_percentage && !has_title && !has_triple {
            return Err(HubError::Validation(
                "At least one valid coupon type must be provided: 'discount_percentage', \
                 'promo_title', or all three of 'regular_amount', 'discount_amount', and \
                 'mxn_amount'."
                    .to_string(),
            ));
        }
        if has_percentage && (has_title || amounts_present > 0) {
            return Err(HubError::Validation(
                "If 'discount_percentage' is selected, 'promo_title', 'regular_amount', \
                 'discount_amount', and 'mxn_amount' must not be provided."
                    .to_string(),
            ));
        }
        if has_title && amounts_present > 0 {
            return Err(HubError::Validation(
                "If 'promo_title' is selected, 'discount_percentage', 'regular_amount', \
                 'discount_amount', and 'mxn_amount' must not be provided."
                    .to_string(),
            ));
        }
        if has_partial_triple {
            return Err(HubError::Validation(
                "If using 'regular_amount', 'discount_amount', and 'mxn_amount', all three \
                 values must be provided together."
                    .to_string(),
            ));
        }

        match (
            self.discount_percentage,
            title,
            self.regular_amount,
            self.discount_amount,
            self.mxn_amount,
        ) {
            (Some(value), None, None, None, None) => {
                if !value.is_finite() || value <= 0.0 || value > 100.0 {
                    return Err(HubError::Validation(
                        "'discount_percentage' must be greater than 0 and at most 100".to_string(),
                    ));
                }
                Ok(Discount::Percentage { value })
            }
            (None, Some(title), None, None, None) => Ok(Discount::PromoTitle {
                title: title.trim().to_string(),
            }),
            (None, None, Some(regular), Some(discount), Some(converted)) => {
                for (name, amount) in [
                    ("regular_amount", regular),
                    ("discount_amount", discount),
                    ("mxn_amount", converted),
                ] {
                    if !amount.is_finite() || amount < 0.0 {
                        return Err(HubError::Validation(format!(
                            "'{name}' must be a non-negative number"
                        )));
                    }
                }
                Ok(Discount::FixedAmounts {
                    regular_amount: regular,
                    discount_amount: discount,
                    converted_amount: converted,
                })
            }
            _ => Err(HubError::Validation(
                "This coupon type doesn't support the provided fields".to_string(),
            )),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses a `DD/MM/YYYY` date.
///
/// # Errors
///
/// Returns [`HubError::Validation`] on a wrong segment count, non-numeric
/// segments, or a date that does not exist on the calendar.
pub fn parse_date(input: &str) -> Result<NaiveDate, HubError> {
    let invalid = || HubError::Validation(format!("invalid date '{input}', expected DD/MM/YYYY"));

    let parts: Vec<&str> = input.trim().split('/').collect();
    let &[day, month, year] = parts.as_slice() else {
        return Err(invalid());
    };
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !(numeric(day) && numeric(month) && numeric(year)) || year.len() != 4 {
        return Err(invalid());
    }

    let day: u32 = day.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let year: i32 = year.parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Inclusive validity window of a coupon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidityWindow {
    /// First day the coupon is valid.
    pub start: NaiveDate,
    /// Last day the coupon is valid.
    pub end: NaiveDate,
}

impl ValidityWindow {
    /// Builds a window, rejecting an `end` before `start`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if `end < start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, HubError> {
        if end < start {
            return Err(HubError::Validation(
                "'end' must not be before 'start'".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Parses both bounds from `DD/MM/YYYY` strings.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if either date is malformed or the
    /// window is inverted.
    pub fn parse(start: &str, end: &str) -> Result<Self, HubError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// A coupon is expired once the calendar date is past `end`.
    #[must_use]
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.end < today
    }
}

/// Counters kept on each coupon. Only ever incremented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CouponCounters {
    /// Successful redemptions.
    pub redeem_count: u64,
    /// Downloads (historical, never decremented).
    pub download_count: u64,
    /// Shares.
    pub share_count: u64,
    /// Click-to-explore views.
    pub explore_count: u64,
}

/// Names one of the [`CouponCounters`] for atomic increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouponCounter {
    /// `redeem_count`
    Redeem,
    /// `download_count`
    Download,
    /// `share_count`
    Share,
    /// `explore_count`
    Explore,
}

impl CouponCounter {
    /// Storage column backing this counter.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Redeem => "redeem_count",
            Self::Download => "download_count",
            Self::Share => "share_count",
            Self::Explore => "explore_count",
        }
    }

    /// Increments the matching field of `counters` in place.
    pub fn bump(self, counters: &mut CouponCounters) {
        let field = match self {
            Self::Redeem => &mut counters.redeem_count,
            Self::Download => &mut counters.download_count,
            Self::Share => &mut counters.share_count,
            Self::Explore => &mut counters.explore_count,
        };
        *field = field.saturating_add(1);
    }
}

/// A discount offer published by a business.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Coupon {
    /// Unique coupon identifier.
    pub id: CouponId,
    /// Owning business profile.
    pub created_by: ProfileId,
    /// Category the coupon is listed under.
    pub category_id: CategoryId,
    /// Discount variant.
    pub discount: Discount,
    /// Free-text conditions.
    pub more_details: Option<String>,
    /// Inclusive validity window.
    pub validity: ValidityWindow,
    /// Primary photo URL.
    pub photo_url: String,
    /// Optional carousel banner URL.
    pub carousel_photo_url: Option<String>,
    /// Featured placement in the home carousel.
    pub add_to_carousel: bool,
    /// Event counters.
    pub counters: CouponCounters,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to create a coupon, already validated.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    /// Owning business profile.
    pub created_by: ProfileId,
    /// Category reference.
    pub category_id: CategoryId,
    /// Discount variant.
    pub discount: Discount,
    /// Free-text conditions.
    pub more_details: Option<String>,
    /// Validity window.
    pub validity: ValidityWindow,
    /// Uploaded photo URL.
    pub photo_url: String,
    /// Uploaded carousel photo URL.
    pub carousel_photo_url: Option<String>,
    /// Featured placement flag.
    pub add_to_carousel: bool,
}

impl Coupon {
    /// Creates a fresh coupon with zeroed counters.
    #[must_use]
    pub fn new(draft: NewCoupon) -> Self {
        let now = Utc::now();
        Self {
            id: CouponId::new(),
            created_by: draft.created_by,
            category_id: draft.category_id,
            discount: draft.discount,
            more_details: draft.more_details,
            validity: draft.validity,
            photo_url: draft.photo_url,
            carousel_photo_url: draft.carousel_photo_url,
            add_to_carousel: draft.add_to_carousel,
            counters: CouponCounters::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Ranking score used by the discovery feed.
    #[must_use]
    pub const fn popularity_score(&self) -> u64 {
        self.counters
            .redeem_count
            .saturating_add(self.counters.share_count)
    }

    /// Whether the coupon can no longer be redeemed on `today`.
    #[must_use]
    pub fn is_expired_on(&self, today: NaiveDate) -> bool {
        self.validity.is_expired_on(today)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn fields() -> DiscountFields {
        DiscountFields::default()
    }

    #[test]
    fn percentage_alone_is_accepted() {
        let input = DiscountFields {
            discount_percentage: Some(10.0),
            ..fields()
        };
        let Ok(discount) = input.resolve() else {
            panic!("percentage should validate");
        };
        assert_eq!(discount, Discount::Percentage { value: 10.0 });
    }

    #[test]
    fn percentage_with_title_is_rejected() {
        let input = DiscountFields {
            discount_percentage: Some(10.0),
            promo_title: Some("X".to_string()),
            ..fields()
        };
        assert!(matches!(input.resolve(), Err(HubError::Validation(_))));
    }

    #[test]
    fn partial_triple_is_rejected() {
        let input = DiscountFields {
            regular_amount: Some(100.0),
            discount_amount: Some(20.0),
            ..fields()
        };
        assert!(matches!(input.resolve(), Err(HubError::Validation(_))));
    }

    #[test]
    fn nothing_set_is_rejected() {
        assert!(matches!(fields().resolve(), Err(HubError::Validation(_))));
    }

    #[test]
    fn empty_title_counts_as_absent() {
        let input = DiscountFields {
            promo_title: Some("   ".to_string()),
            ..fields()
        };
        assert!(input.resolve().is_err());
        assert!(input.is_empty());
    }

    #[test]
    fn complete_triple_is_accepted() {
        let input = DiscountFields {
            regular_amount: Some(100.0),
            discount_amount: Some(20.0),
            mxn_amount: Some(80.0),
            ..fields()
        };
        let Ok(discount) = input.resolve() else {
            panic!("triple should validate");
        };
        assert_eq!(discount.discount_amount(), Some(20.0));
    }

    #[test]
    fn triple_with_percentage_is_rejected() {
        let input = DiscountFields {
            discount_percentage: Some(5.0),
            regular_amount: Some(100.0),
            discount_amount: Some(20.0),
            mxn_amount: Some(80.0),
            ..fields()
        };
        assert!(input.resolve().is_err());
    }

    #[test]
    fn overlay_cannot_switch_variant() {
        let stored = Discount::Percentage { value: 15.0 }.to_fields();
        let update = DiscountFields {
            promo_title: Some("Free dessert".to_string()),
            ..fields()
        };
        assert!(update.overlay(stored).resolve().is_err());
    }

    #[test]
    fn overlay_replaces_value_within_variant() {
        let stored = Discount::FixedAmounts {
            regular_amount: 100.0,
            discount_amount: 20.0,
            converted_amount: 80.0,
        }
        .to_fields();
        let update = DiscountFields {
            discount_amount: Some(30.0),
            mxn_amount: Some(70.0),
            ..fields()
        };
        let Ok(Discount::FixedAmounts {
            discount_amount,
            converted_amount,
            regular_amount,
        }) = update.overlay(stored).resolve()
        else {
            panic!("merged triple should validate");
        };
        assert_eq!((regular_amount, discount_amount, converted_amount), (100.0, 30.0, 70.0));
    }

    #[test]
    fn parse_date_accepts_day_month_year() {
        let Ok(date) = parse_date("31/12/2025") else {
            panic!("valid date");
        };
        assert_eq!(date, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        for input in [
            "",
            "2025-01-01",
            "aa/01/2025",
            "01/01",
            "01/01/2025/1",
            "31/02/2025",
            "1/13/2025",
            "01/01/25",
        ] {
            assert!(parse_date(input).is_err(), "{input} should be rejected");
        }
    }

    #[test]
    fn inverted_window_is_rejected() {
        assert!(ValidityWindow::parse("02/01/2025", "01/01/2025").is_err());
    }

    #[test]
    fn expiry_is_inclusive_of_end_day() {
        let Ok(window) = ValidityWindow::parse("01/01/2025", "31/12/2025") else {
            panic!("valid window");
        };
        let last_day = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap_or_default();
        let next_day = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default();
        assert!(!window.is_expired_on(last_day));
        assert!(window.is_expired_on(next_day));
    }

    #[test]
    fn counter_bump_targets_one_field() {
        let mut counters = CouponCounters::default();
        CouponCounter::Share.bump(&mut counters);
        CouponCounter::Share.bump(&mut counters);
        CouponCounter::Redeem.bump(&mut counters);
        assert_eq!(counters.share_count, 2);
        assert_eq!(counters.redeem_count, 1);
        assert_eq!(counters.download_count, 0);
    }
}
