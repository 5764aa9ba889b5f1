//! Category DTOs.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::domain::CategoryTranslation;
use crate::error::HubError;

/// Multipart form of `POST /categories` and `PATCH /categories`.
///
/// Documentation only; the handler reads the fields one by one.
#[derive(Debug, ToSchema)]
pub struct CategoryForm {
    /// Category name.
    pub name: Option<String>,
    /// Icon image.
    #[schema(value_type = Option<String>, format = Binary)]
    pub icon: Option<Vec<u8>>,
    /// JSON array of `{language_code, name}` objects.
    pub translations: Option<String>,
}

/// `?id=` query of category updates and deletes.
#[derive(Debug, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CategoryIdQuery {
    /// Category id.
    pub id: uuid::Uuid,
}

/// Parses the `translations` form field.
///
/// # Errors
///
/// [`HubError::Validation`] if it is not a JSON array of translations.
pub fn parse_translations(raw: &str) -> Result<Vec<CategoryTranslation>, HubError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
        .map_err(|e| HubError::Validation(format!("invalid translations: {e}")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn translations_parse_from_json() {
        let Ok(parsed) = parse_translations(r#"[{"language_code":"es","name":"Comida"}]"#) else {
            panic!("valid translations");
        };
        assert_eq!(parsed.len(), 1);
        assert!(matches!(parse_translations(""), Ok(v) if v.is_empty()));
        assert!(parse_translations("{nope").is_err());
    }
}
