//! User and business summaries consumed by discovery and ownership checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{GeoPoint, ProfileId};

/// Caller role, as asserted by the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Consumer downloading and redeeming coupons.
    User,
    /// Business publishing coupons.
    Business,
    /// Back-office administrator.
    Admin,
}

impl Role {
    /// Lowercase role name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Business => "business",
            Self::Admin => "admin",
        }
    }

    /// Parses the lowercase role name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "business" => Some(Self::Business),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Summary of a user or business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    /// Profile identifier (the access token subject).
    pub id: ProfileId,
    /// Role of the profile owner.
    pub role: Role,
    /// Display name.
    pub name: String,
    /// Business name, for businesses.
    pub company_name: Option<String>,
    /// Free-text location ("Roma Norte, CDMX").
    pub location: Option<String>,
    /// Geographic position, when known.
    pub coordinates: Option<GeoPoint>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Case-insensitive substring match used by the feed's free-text
    /// search. `query` is checked against the company name; `location`,
    /// when given, against the free-text location.
    #[must_use]
    pub fn matches_search(&self, query: &str, location: Option<&str>) -> bool {
        let contains = |field: &Option<String>, needle: &str| {
            field
                .as_deref()
                .is_some_and(|v| v.to_lowercase().contains(&needle.to_lowercase()))
        };
        contains(&self.company_name, query) || location.is_some_and(|l| contains(&self.location, l))
    }
}
