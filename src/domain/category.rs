//! Category taxonomy node.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::CategoryId;

/// Localised category name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryTranslation {
    /// ISO language code (e.g. `"es"`).
    pub language_code: String,
    /// Name in that language.
    pub name: String,
}

/// Browsing category. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    /// Category identifier.
    pub id: CategoryId,
    /// Unique display name.
    pub name: String,
    /// Icon URL.
    pub icon_url: String,
    /// Optional translations of `name`.
    #[serde(default)]
    pub translations: Vec<CategoryTranslation>,
}

impl Category {
    /// Creates a category with a fresh identifier.
    #[must_use]
    pub fn new(name: String, icon_url: String, translations: Vec<CategoryTranslation>) -> Self {
        Self {
            id: CategoryId::new(),
            name,
            icon_url,
            translations,
        }
    }
}
