//! Download ledger entry: one user's claim on one coupon.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CouponId, LedgerEntryId, ProfileId};

/// Redemption sub-state of a ledger entry.
///
/// `Claimed` → `Redeemed` is the only transition; `Redeemed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionState {
    /// Downloaded, not yet used.
    Claimed,
    /// Used in store.
    Redeemed,
}

/// A `DownloadedCoupon` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LedgerEntry {
    /// Entry identifier, embedded in redemption tokens.
    pub id: LedgerEntryId,
    /// Claiming user.
    pub user_id: ProfileId,
    /// Claimed coupon.
    pub coupon_id: CouponId,
    /// Whether the coupon was redeemed.
    pub redeemed: bool,
    /// Set exactly once, on the redeeming transition.
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Download timestamp.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Creates a fresh `Claimed` entry.
    #[must_use]
    pub fn claim(user_id: ProfileId, coupon_id: CouponId) -> Self {
        Self {
            id: LedgerEntryId::new(),
            user_id,
            coupon_id,
            redeemed: false,
            redeemed_at: None,
            created_at: Utc::now(),
        }
    }

    /// Current redemption state.
    #[must_use]
    pub const fn state(&self) -> RedemptionState {
        if self.redeemed {
            RedemptionState::Redeemed
        } else {
            RedemptionState::Claimed
        }
    }

    /// Applies the `Claimed` → `Redeemed` transition.
    ///
    /// Returns `false` without touching the entry if it was already
    /// redeemed.
    pub fn mark_redeemed(&mut self, at: DateTime<Utc>) -> bool {
        if self.redeemed {
            return false;
        }
        self.redeemed = true;
        self.redeemed_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_happens_once() {
        let mut entry = LedgerEntry::claim(ProfileId::new(), CouponId::new());
        assert_eq!(entry.state(), RedemptionState::Claimed);

        let first = Utc::now();
        assert!(entry.mark_redeemed(first));
        assert!(!entry.mark_redeemed(Utc::now()));
        assert_eq!(entry.state(), RedemptionState::Redeemed);
        assert_eq!(entry.redeemed_at, Some(first));
    }
}
