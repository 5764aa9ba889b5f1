//! Redemption tokens and the one-time redeem protocol.
//!
//! A token is an HS256 JWT naming one ledger entry. It is minted when the
//! user opens the QR screen, expires after a few minutes, and is consumed
//! by the public redeem endpoint the QR code points to.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use qrcode::QrCode;
use qrcode::render::svg;
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::domain::LedgerEntryId;
use crate::error::HubError;
use crate::persistence::CouponStore;

/// Purpose marker carried by every redemption token.
pub const REDEMPTION_PURPOSE: &str = "redeemCoupon";

/// Claims of a redemption token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionClaims {
    /// Ledger entry being redeemed.
    pub id: LedgerEntryId,
    /// Always [`REDEMPTION_PURPOSE`].
    pub purpose: String,
    /// Issue time, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

/// HS256 signer/verifier for redemption tokens.
#[derive(Clone)]
pub struct RedemptionTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl fmt::Debug for RedemptionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedemptionTokens")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl RedemptionTokens {
    /// Creates a signer with the server secret and token lifetime.
    #[must_use]
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000)),
        }
    }

    /// Signs a token for `entry` issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Dependency`] if signing fails.
    pub fn sign_at(
        &self,
        entry: LedgerEntryId,
        issued_at: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), HubError> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| HubError::Internal("redemption token TTL overflows".to_string()))?;
        let claims = RedemptionClaims {
            id: entry,
            purpose: REDEMPTION_PURPOSE.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| HubError::Dependency(format!("failed to sign redemption token: {e}")))?;
        Ok((token, expires_at))
    }

    /// Verifies signature, expiry (no leeway) and purpose.
    ///
    /// Returns `None` for any invalid token.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<LedgerEntryId> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<RedemptionClaims>(token, &self.decoding, &validation).ok()?;
        (data.claims.purpose == REDEMPTION_PURPOSE).then_some(data.claims.id)
    }
}

/// Result of [`RedemptionService::issue`].
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The signed token.
    pub token: String,
    /// Public URL that redeems the token.
    pub url: String,
    /// SVG QR code encoding `url`.
    pub qr_svg: String,
    /// Token expiry.
    pub expires_at: DateTime<Utc>,
}

/// Terminal states of a redeem attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionOutcome {
    /// The ledger entry was flipped to redeemed by this call.
    Success,
    /// The entry had already been redeemed.
    AlreadyRedeemed,
    /// The coupon's validity window has ended.
    Expired,
    /// The entry or its coupon no longer exists.
    NotFound,
    /// Bad signature, expired token or wrong purpose.
    Invalid,
}

impl RedemptionOutcome {
    /// Page title shown to the person scanning the code.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Success => "Coupon redeemed",
            Self::AlreadyRedeemed => "Already redeemed",
            Self::Expired => "Coupon expired",
            Self::NotFound => "Coupon not found",
            Self::Invalid => "Invalid code",
        }
    }

    /// Explanation shown under the title.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Success => "The coupon was redeemed successfully. Enjoy your discount!",
            Self::AlreadyRedeemed => "This coupon has already been redeemed.",
            Self::Expired => "This coupon is no longer valid.",
            Self::NotFound => "We could not find this coupon.",
            Self::Invalid => "This QR code is invalid or has expired. Ask for a new one.",
        }
    }
}

/// Issues and consumes redemption tokens.
#[derive(Debug, Clone)]
pub struct RedemptionService {
    store: Arc<dyn CouponStore>,
    tokens: RedemptionTokens,
    public_base_url: String,
}

impl RedemptionService {
    /// Creates a new `RedemptionService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn CouponStore>,
        tokens: RedemptionTokens,
        public_base_url: String,
    ) -> Self {
        Self {
            store,
            tokens,
            public_base_url,
        }
    }

    /// Mints a token for a ledger entry owned by the caller and renders
    /// the redeem URL as a QR code.
    ///
    /// # Errors
    ///
    /// [`HubError::LedgerEntryNotFound`] if the entry does not exist,
    /// [`HubError::Forbidden`] if it belongs to someone else.
    pub async fn issue(
        &self,
        caller: &Identity,
        entry_id: LedgerEntryId,
    ) -> Result<IssuedToken, HubError> {
        let entry = self
            .store
            .get_ledger_entry(entry_id)
            .await?
            .ok_or(HubError::LedgerEntryNotFound(*entry_id.as_uuid()))?;
        if entry.user_id != caller.id {
            return Err(HubError::Forbidden(
                "this downloaded coupon belongs to another user".to_string(),
            ));
        }

        let (token, expires_at) = self.tokens.sign_at(entry.id, Utc::now())?;
        let url = format!(
            "{}/api/v1/coupons/redeem-coupon?token={token}",
            self.public_base_url
        );
        let qr_svg = render_qr(&url)?;

        tracing::info!(%entry_id, %expires_at, "redemption token issued");
        Ok(IssuedToken {
            token,
            url,
            qr_svg,
            expires_at,
        })
    }

    /// Consumes a token, evaluated at the current time.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure. Every protocol
    /// outcome, including rejections, is an `Ok` value.
    pub async fn redeem(&self, token: &str) -> Result<RedemptionOutcome, HubError> {
        self.redeem_at(token, Utc::now()).await
    }

    /// Consumes a token, evaluating coupon expiry against `now`.
    ///
    /// Each terminal branch returns early; only the final step mutates.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn redeem_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<RedemptionOutcome, HubError> {
        let Some(entry_id) = self.tokens.verify(token) else {
            return Ok(RedemptionOutcome::Invalid);
        };
        let Some(entry) = self.store.get_ledger_entry(entry_id).await? else {
            return Ok(RedemptionOutcome::NotFound);
        };
        let Some(coupon) = self.store.get_coupon(entry.coupon_id).await? else {
            return Ok(RedemptionOutcome::NotFound);
        };
        if coupon.is_expired_on(now.date_naive()) {
            return Ok(RedemptionOutcome::Expired);
        }
        if entry.redeemed {
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }
        if !self.store.redeem_ledger_entry(entry_id, now).await? {
            tracing::debug!(%entry_id, "lost redemption race");
            return Ok(RedemptionOutcome::AlreadyRedeemed);
        }

        tracing::info!(%entry_id, coupon_id = %coupon.id, "coupon redeemed");
        Ok(RedemptionOutcome::Success)
    }
}

fn render_qr(data: &str) -> Result<String, HubError> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| HubError::Internal(format!("failed to encode QR code: {e}")))?;
    Ok(code
        .render::<svg::Color<'_>>()
        .min_dimensions(200, 200)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::domain::{
        Category, Coupon, CouponId, Discount, LedgerEntry, NewCoupon, ProfileId, Role,
        ValidityWindow,
    };
    use crate::persistence::MemoryStore;

    const SECRET: &str = "redemption-secret";

    fn user(id: ProfileId) -> Identity {
        Identity {
            id,
            email: "user@example.com".to_string(),
            role: Role::User,
        }
    }

    async fn setup(end: NaiveDate) -> (Arc<MemoryStore>, RedemptionService, LedgerEntry) {
        let store = Arc::new(MemoryStore::new());
        let category = Category::new("Food".to_string(), "icon".to_string(), Vec::new());
        let Ok(()) = store.insert_category(&category).await else {
            panic!("category");
        };
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
        let Ok(validity) = ValidityWindow::new(start, end) else {
            panic!("window");
        };
        let coupon = Coupon::new(NewCoupon {
            created_by: ProfileId::new(),
            category_id: category.id,
            discount: Discount::Percentage { value: 20.0 },
            more_details: None,
            validity,
            photo_url: "p.png".to_string(),
            carousel_photo_url: None,
            add_to_carousel: false,
        });
        let Ok(()) = store.insert_coupon(&coupon).await else {
            panic!("coupon");
        };
        let entry = LedgerEntry::claim(ProfileId::new(), coupon.id);
        let Ok(()) = store.insert_ledger_entry(&entry).await else {
            panic!("entry");
        };
        let service = RedemptionService::new(
            Arc::clone(&store) as Arc<dyn CouponStore>,
            RedemptionTokens::new(SECRET, 300),
            "http://hub.test".to_string(),
        );
        (store, service, entry)
    }

    fn far_future() -> NaiveDate {
        NaiveDate::from_ymd_opt(2099, 12, 31).unwrap_or_default()
    }

    async fn redeem_count(store: &MemoryStore, id: CouponId) -> u64 {
        let Ok(Some(coupon)) = store.get_coupon(id).await else {
            panic!("coupon");
        };
        coupon.counters.redeem_count
    }

    #[tokio::test]
    async fn issue_returns_url_and_qr() {
        let (_, service, entry) = setup(far_future()).await;
        let Ok(issued) = service.issue(&user(entry.user_id), entry.id).await else {
            panic!("issue");
        };
        assert!(issued.url.starts_with("http://hub.test/api/v1/coupons/redeem-coupon?token="));
        assert!(issued.url.ends_with(&issued.token));
        assert!(issued.qr_svg.contains("<svg"));
    }

    #[tokio::test]
    async fn issue_checks_ownership() {
        let (_, service, entry) = setup(far_future()).await;
        assert!(matches!(
            service.issue(&user(ProfileId::new()), entry.id).await,
            Err(HubError::Forbidden(_))
        ));
        assert!(matches!(
            service.issue(&user(entry.user_id), LedgerEntryId::new()).await,
            Err(HubError::LedgerEntryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn redeem_succeeds_once() {
        let (store, service, entry) = setup(far_future()).await;
        let Ok(issued) = service.issue(&user(entry.user_id), entry.id).await else {
            panic!("issue");
        };
        assert!(matches!(service.redeem(&issued.token).await, Ok(RedemptionOutcome::Success)));
        assert!(matches!(
            service.redeem(&issued.token).await,
            Ok(RedemptionOutcome::AlreadyRedeemed)
        ));
        assert_eq!(redeem_count(&store, entry.coupon_id).await, 1);

        let Ok(Some(stored)) = store.get_ledger_entry(entry.id).await else {
            panic!("entry");
        };
        assert!(stored.redeemed_at.is_some());
    }

    #[tokio::test]
    async fn expired_token_is_invalid_and_mutates_nothing() {
        let (store, service, entry) = setup(far_future()).await;
        let tokens = RedemptionTokens::new(SECRET, 300);
        let Ok((token, _)) = tokens.sign_at(entry.id, Utc::now() - Duration::minutes(6)) else {
            panic!("sign");
        };
        assert!(matches!(service.redeem(&token).await, Ok(RedemptionOutcome::Invalid)));
        assert_eq!(redeem_count(&store, entry.coupon_id).await, 0);
    }

    #[tokio::test]
    async fn foreign_signature_is_invalid() {
        let (_, service, entry) = setup(far_future()).await;
        let Ok((token, _)) = RedemptionTokens::new("other", 300).sign_at(entry.id, Utc::now())
        else {
            panic!("sign");
        };
        assert!(matches!(service.redeem(&token).await, Ok(RedemptionOutcome::Invalid)));
        assert!(matches!(service.redeem("not-a-jwt").await, Ok(RedemptionOutcome::Invalid)));
    }

    #[tokio::test]
    async fn expiry_wins_over_redeemed_state() {
        let yesterday = (Utc::now() - Duration::days(1)).date_naive();
        let (store, service, entry) = setup(yesterday).await;
        let Ok(true) = store.redeem_ledger_entry(entry.id, Utc::now()).await else {
            panic!("pre-redeem");
        };
        let Ok((token, _)) = RedemptionTokens::new(SECRET, 300).sign_at(entry.id, Utc::now())
        else {
            panic!("sign");
        };
        assert!(matches!(service.redeem(&token).await, Ok(RedemptionOutcome::Expired)));
        assert_eq!(redeem_count(&store, entry.coupon_id).await, 1);
    }

    #[tokio::test]
    async fn coupon_valid_through_its_last_day() {
        let today = Utc::now().date_naive();
        let (_, service, entry) = setup(today).await;
        let Ok((token, _)) = RedemptionTokens::new(SECRET, 300).sign_at(entry.id, Utc::now())
        else {
            panic!("sign");
        };
        assert!(matches!(service.redeem(&token).await, Ok(RedemptionOutcome::Success)));
    }

    #[tokio::test]
    async fn deleted_entry_is_not_found() {
        let (store, service, entry) = setup(far_future()).await;
        let Ok((token, _)) = RedemptionTokens::new(SECRET, 300).sign_at(entry.id, Utc::now())
        else {
            panic!("sign");
        };
        let Ok(true) = store.delete_ledger_entry(entry.user_id, entry.coupon_id).await else {
            panic!("delete");
        };
        assert!(matches!(service.redeem(&token).await, Ok(RedemptionOutcome::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_redeems_have_one_winner() {
        let (store, service, entry) = setup(far_future()).await;
        let Ok((token, _)) = RedemptionTokens::new(SECRET, 300).sign_at(entry.id, Utc::now())
        else {
            panic!("sign");
        };

        let mut handles = Vec::new();
        for _ in 0..32 {
            let service = service.clone();
            let token = token.clone();
            handles.push(tokio::spawn(async move { service.redeem(&token).await }));
        }
        let mut successes = 0;
        let mut already = 0;
        for handle in handles {
            match handle.await {
                Ok(Ok(RedemptionOutcome::Success)) => successes += 1,
                Ok(Ok(RedemptionOutcome::AlreadyRedeemed)) => already += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(already, 31);
        assert_eq!(redeem_count(&store, entry.coupon_id).await, 1);
    }
}
