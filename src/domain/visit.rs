//! Append-only visit audit records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{CouponId, ProfileId, VisitId};

/// What was visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VisitSubject {
    /// A coupon click or download (click-to-explore).
    Coupon(CouponId),
    /// A business profile page view.
    Business(ProfileId),
}

/// A single visit. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visit {
    /// Record identifier.
    pub id: VisitId,
    /// Visiting user, when known.
    pub visitor: Option<ProfileId>,
    /// Visited coupon or business.
    pub subject: VisitSubject,
    /// Time of the visit.
    pub visited_at: DateTime<Utc>,
}

impl Visit {
    /// Records a visit happening now.
    #[must_use]
    pub fn now(visitor: Option<ProfileId>, subject: VisitSubject) -> Self {
        Self {
            id: VisitId::new(),
            visitor,
            subject,
            visited_at: Utc::now(),
        }
    }
}
