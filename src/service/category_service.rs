//! Category taxonomy management. Writes are restricted to admins.

use std::sync::Arc;

use crate::auth::Identity;
use crate::domain::{Category, CategoryId, CategoryTranslation, Role};
use crate::error::HubError;
use crate::media::{MediaFile, MediaUploader};
use crate::persistence::CouponStore;

/// Input of [`CategoryService::update`]. Absent fields keep their value.
#[derive(Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    /// New name.
    pub name: Option<String>,
    /// Replacement icon.
    pub icon: Option<MediaFile>,
    /// Replacement translations.
    pub translations: Option<Vec<CategoryTranslation>>,
}

/// Category operations.
#[derive(Debug, Clone)]
pub struct CategoryService {
    store: Arc<dyn CouponStore>,
    media: Arc<dyn MediaUploader>,
}

fn clean_name(name: &str) -> Result<String, HubError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HubError::Validation("category name is required".to_string()));
    }
    Ok(name.to_string())
}

impl CategoryService {
    /// Creates a new `CategoryService`.
    #[must_use]
    pub fn new(store: Arc<dyn CouponStore>, media: Arc<dyn MediaUploader>) -> Self {
        Self { store, media }
    }

    /// All categories, ordered by name.
    ///
    /// # Errors
    ///
    /// [`HubError::Persistence`] on storage failure.
    pub async fn list(&self) -> Result<Vec<Category>, HubError> {
        self.store.list_categories().await
    }

    /// Creates a category.
    ///
    /// # Errors
    ///
    /// [`HubError::Forbidden`] for non-admins, [`HubError::Validation`] for
    /// an empty name or a non-image icon, [`HubError::Conflict`] for a
    /// duplicate name.
    pub async fn create(
        &self,
        caller: &Identity,
        name: &str,
        icon: MediaFile,
        translations: Vec<CategoryTranslation>,
    ) -> Result<Category, HubError> {
        caller.require(&[Role::Admin])?;
        let name = clean_name(name)?;
        icon.ensure_image()?;
        let icon_url = self.media.upload(icon).await?;

        let category = Category::new(name, icon_url, translations);
        self.store.insert_category(&category).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// Updates a category.
    ///
    /// # Errors
    ///
    /// [`HubError::Forbidden`] for non-admins,
    /// [`HubError::CategoryNotFound`], [`HubError::Conflict`] for a name
    /// collision.
    pub async fn update(
        &self,
        caller: &Identity,
        id: CategoryId,
        input: UpdateCategoryInput,
    ) -> Result<Category, HubError> {
        caller.require(&[Role::Admin])?;
        let mut category = self
            .store
            .get_category(id)
            .await?
            .ok_or(HubError::CategoryNotFound(*id.as_uuid()))?;

        if let Some(name) = input.name {
            category.name = clean_name(&name)?;
        }
        if let Some(translations) = input.translations {
            category.translations = translations;
        }
        if let Some(icon) = input.icon {
            icon.ensure_image()?;
            category.icon_url = self.media.upload(icon).await?;
        }

        if !self.store.update_category(&category).await? {
            return Err(HubError::CategoryNotFound(*id.as_uuid()));
        }
        tracing::info!(category_id = %id, "category updated");
        Ok(category)
    }

    /// Deletes a category that no coupon references.
    ///
    /// # Errors
    ///
    /// [`HubError::Forbidden`] for non-admins,
    /// [`HubError::CategoryNotFound`], [`HubError::Conflict`] while
    /// referenced.
    pub async fn delete(&self, caller: &Identity, id: CategoryId) -> Result<(), HubError> {
        caller.require(&[Role::Admin])?;
        if !self.store.delete_category(id).await? {
            return Err(HubError::CategoryNotFound(*id.as_uuid()));
        }
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::ProfileId;
    use crate::persistence::MemoryStore;
    use crate::service::catalog_service::tests::{FakeUploader, png};

    fn admin() -> Identity {
        Identity {
            id: ProfileId::new(),
            email: "admin@example.com".to_string(),
            role: Role::Admin,
        }
    }

    fn service() -> CategoryService {
        CategoryService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FakeUploader::default()),
        )
    }

    #[tokio::test]
    async fn admin_creates_and_renames() {
        let categories = service();
        let Ok(food) = categories
            .create(&admin(), " Food ", png("food.png"), Vec::new())
            .await
        else {
            panic!("create");
        };
        assert_eq!(food.name, "Food");
        assert_eq!(food.icon_url, "https://cdn.test/food.png");

        let input = UpdateCategoryInput {
            name: Some("Restaurants".to_string()),
            translations: Some(vec![CategoryTranslation {
                language_code: "es".to_string(),
                name: "Restaurantes".to_string(),
            }]),
            ..UpdateCategoryInput::default()
        };
        let Ok(renamed) = categories.update(&admin(), food.id, input).await else {
            panic!("update");
        };
        assert_eq!(renamed.name, "Restaurants");
        assert_eq!(renamed.translations.len(), 1);

        let Ok(all) = categories.list().await else {
            panic!("list");
        };
        assert_eq!(all, vec![renamed]);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let mut caller = admin();
        caller.role = Role::Business;
        assert!(matches!(
            service().create(&caller, "Food", png("f.png"), Vec::new()).await,
            Err(HubError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let categories = service();
        let Ok(_) = categories.create(&admin(), "Food", png("a.png"), Vec::new()).await else {
            panic!("create");
        };
        assert!(matches!(
            categories.create(&admin(), "Food", png("b.png"), Vec::new()).await,
            Err(HubError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        assert!(matches!(
            service().delete(&admin(), CategoryId::new()).await,
            Err(HubError::CategoryNotFound(_))
        ));
    }
}
