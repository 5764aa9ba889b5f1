//! Multipart form reading for the upload endpoints.

use std::collections::HashMap;

use axum::extract::{FromRequest, Multipart, Request};

use crate::error::HubError;
use crate::media::MediaFile;

/// A fully buffered multipart form: text fields and file fields by name.
///
/// Used directly as a handler argument; a request that is not multipart
/// is rejected with [`HubError::Validation`].
#[derive(Debug, Default)]
pub struct FormData {
    text: HashMap<String, String>,
    files: HashMap<String, MediaFile>,
}

impl FormData {
    /// Drains `multipart`. A part with a file name or a non-text content
    /// type is treated as a file.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] if the body is not valid multipart.
    pub async fn read(mut multipart: Multipart) -> Result<Self, HubError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let file_name = field.file_name().map(str::to_string);
            let content_type = field.content_type().map(str::to_string);
            let is_file = file_name.is_some()
                || content_type
                    .as_deref()
                    .is_some_and(|ct| !ct.starts_with("text/"));
            if is_file {
                let bytes = field.bytes().await?;
                form.files.insert(
                    name,
                    MediaFile {
                        file_name,
                        content_type: content_type
                            .unwrap_or_else(|| "application/octet-stream".to_string()),
                        bytes,
                    },
                );
            } else {
                form.text.insert(name, field.text().await?);
            }
        }
        Ok(form)
    }

    /// Trimmed text field; blank counts as absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<String> {
        self.text
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Required text field.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] if it is missing or blank.
    pub fn required(&self, name: &str) -> Result<String, HubError> {
        self.text(name)
            .ok_or_else(|| HubError::Validation(format!("'{name}' is required")))
    }

    /// Numeric field.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] if present but not a finite number.
    pub fn number(&self, name: &str) -> Result<Option<f64>, HubError> {
        self.text(name)
            .map(|v| {
                v.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| HubError::Validation(format!("'{name}' must be a number")))
            })
            .transpose()
    }

    /// Boolean field (`true`/`false`, `1`/`0`).
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] for any other value.
    pub fn flag(&self, name: &str) -> Result<Option<bool>, HubError> {
        self.text(name)
            .map(|v| match v.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(HubError::Validation(format!("'{name}' must be true or false"))),
            })
            .transpose()
    }

    /// UUID field.
    ///
    /// # Errors
    ///
    /// [`HubError::Validation`] if present but malformed.
    pub fn uuid(&self, name: &str) -> Result<Option<uuid::Uuid>, HubError> {
        self.text(name)
            .map(|v| {
                uuid::Uuid::parse_str(&v)
                    .map_err(|_| HubError::Validation(format!("'{name}' must be a UUID")))
            })
            .transpose()
    }

    /// Removes and returns the first file found under any of `names`.
    pub fn take_file(&mut self, names: &[&str]) -> Option<MediaFile> {
        names.iter().find_map(|n| self.files.remove(*n))
    }

    #[cfg(test)]
    fn with_text(pairs: &[(&str, &str)]) -> Self {
        Self {
            text: pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = HubError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = Multipart::from_request(req, state).await?;
        Self::read(multipart).await
    }
}
