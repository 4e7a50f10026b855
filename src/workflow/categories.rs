use serde::Deserialize;

use super::{non_blank, slugify, unique_slug, ContentWorkflow};
use crate::db::{Category, CategoryRepo, VideoRepo};
use crate::errors::AppError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    #[serde(default)]
    pub name: String,
    pub parent_id: Option<String>,
}

impl CategoryInput {
    fn name(&self) -> Result<String, AppError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Category name is required.".to_string()));
        }
        Ok(name.to_string())
    }

    fn parent_id(&self) -> Result<Option<i64>, AppError> {
        match non_blank(self.parent_id.clone()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::Validation("Invalid parent category.".to_string())),
        }
    }
}

impl ContentWorkflow {
    #[tracing::instrument(name = "Create category", skip(self))]
    pub async fn create_category(&self, input: CategoryInput) -> Result<Category, AppError> {
        let name = input.name()?;
        let parent_id = input.parent_id()?;

        let mut transaction = self.db.begin().await?;
        let mut categories = CategoryRepo::new(&mut transaction);

        if categories.name_taken(&name, None).await? {
            return Err(AppError::Conflict("Category already exists.".to_string()));
        }

        if let Some(parent_id) = parent_id {
            if categories.find_by_id(parent_id).await?.is_none() {
                return Err(AppError::NotFound("Parent category not found.".to_string()));
            }
        }

        let taken = categories.slugs_excluding(None).await?;
        let slug = unique_slug(&slugify(&name), &taken);
        let category = categories.insert(&name, &slug, parent_id).await?;

        transaction.commit().await?;
        tracing::info!(category_id = category.id, slug = %category.slug, "Category created");
        Ok(category)
    }

    #[tracing::instrument(name = "Edit category", skip(self))]
    pub async fn edit_category(&self, id: i64, input: CategoryInput) -> Result<Category, AppError> {
        let name = input.name()?;
        let parent_id = input.parent_id()?;

        let mut transaction = self.db.begin().await?;
        let mut categories = CategoryRepo::new(&mut transaction);

        let category = categories
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Category not found.".to_string()))?;

        if categories.name_taken(&name, Some(id)).await? {
            return Err(AppError::Conflict("Category already exists.".to_string()));
        }

        if let Some(parent_id) = parent_id {
            ensure_valid_parent(&mut categories, id, parent_id).await?;
        }

        let base_slug = slugify(&name);
        let slug = if base_slug != category.slug {
            let taken = categories.slugs_excluding(Some(id)).await?;
            unique_slug(&base_slug, &taken)
        } else {
            category.slug
        };

        let updated = categories.update(id, &name, &slug, parent_id).await?;
        transaction.commit().await?;

        tracing::info!(category_id = id, slug = %updated.slug, "Category updated");
        Ok(updated)
    }

    #[tracing::instrument(name = "Delete category", skip(self))]
    pub async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let mut transaction = self.db.begin().await?;

        if CategoryRepo::new(&mut transaction).find_by_id(id).await?.is_none() {
            return Err(AppError::NotFound("Category not found.".to_string()));
        }

        if VideoRepo::new(&mut transaction).count_in_category(id).await? > 0 {
            return Err(AppError::Conflict(
                "Cannot delete category with videos. Remove videos first.".to_string(),
            ));
        }

        let mut categories = CategoryRepo::new(&mut transaction);
        if categories.count_children(id).await? > 0 {
            return Err(AppError::Conflict(
                "Cannot delete category with subcategories.".to_string(),
            ));
        }

        categories.delete(id).await?;
        transaction.commit().await?;

        tracing::info!(category_id = id, "Category deleted");
        Ok(())
    }
}

/// The parent must exist and must not be the category itself or one of its descendants.
async fn ensure_valid_parent(
    categories: &mut CategoryRepo<'_>,
    id: i64,
    parent_id: i64,
) -> Result<(), AppError> {
    if parent_id == id {
        return Err(AppError::Validation(
            "A category cannot be its own parent.".to_string(),
        ));
    }

    let parent = categories
        .find_by_id(parent_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Parent category not found.".to_string()))?;

    let mut cursor = parent.parent_id;
    while let Some(ancestor_id) = cursor {
        if ancestor_id == id {
            return Err(AppError::Validation(
                "A category cannot be moved under one of its subcategories.".to_string(),
            ));
        }
        cursor = categories
            .find_by_id(ancestor_id)
            .await?
            .and_then(|ancestor| ancestor.parent_id);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::workflow::fixtures;
    use chrono::Utc;

    fn named(name: &str) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            parent_id: None,
        }
    }

    fn child_of(name: &str, parent: i64) -> CategoryInput {
        CategoryInput {
            name: name.to_string(),
            parent_id: Some(parent.to_string()),
        }
    }

    #[tokio::test]
    async fn creates_category_with_slug() {
        let (workflow, _) = fixtures::workflow().await;
        let category = workflow.create_category(named("  Gospel Music  ")).await.unwrap();
        assert_eq!(category.name, "Gospel Music");
        assert_eq!(category.slug, "gospel-music");
        assert_eq!(category.parent_id, None);

        let child = workflow
            .create_category(child_of("Choirs", category.id))
            .await
            .unwrap();
        assert_eq!(child.parent_id, Some(category.id));
    }

    #[tokio::test]
    async fn colliding_slugs_get_suffixes() {
        let (workflow, _) = fixtures::workflow().await;
        let slugs = vec![
            workflow.create_category(named("Live Worship")).await.unwrap().slug,
            workflow.create_category(named("Live  Worship")).await.unwrap().slug,
            workflow.create_category(named("live worship")).await.unwrap().slug,
        ];
        assert_eq!(slugs, vec!["live-worship", "live-worship-1", "live-worship-2"]);
    }

    #[tokio::test]
    async fn rejects_blank_and_duplicate_names() {
        let (workflow, _) = fixtures::workflow().await;
        assert!(matches!(
            workflow.create_category(named("   ")).await,
            Err(AppError::Validation(_))
        ));
        workflow.create_category(named("Sermons")).await.unwrap();
        assert!(matches!(
            workflow.create_category(named("Sermons")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            workflow.create_category(child_of("Orphan", 77)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn edit_recomputes_slug_excluding_self() {
        let (workflow, _) = fixtures::workflow().await;
        let music = workflow.create_category(named("Music")).await.unwrap();
        let other = workflow.create_category(named("Praise")).await.unwrap();

        let same = workflow.edit_category(music.id, named("Music")).await.unwrap();
        assert_eq!(same.slug, "music");

        let renamed = workflow.edit_category(other.id, named("Music")).await;
        assert!(matches!(renamed, Err(AppError::Conflict(_))));

        let lower = workflow.edit_category(other.id, named("music")).await.unwrap();
        assert_eq!(lower.name, "music");
        assert_eq!(lower.slug, "music-1");

        let renamed = workflow.edit_category(other.id, named("Praise Songs")).await.unwrap();
        assert_eq!(renamed.slug, "praise-songs");
        assert_eq!(renamed.name, "Praise Songs");
    }

    #[tokio::test]
    async fn edit_rejects_cycles() {
        let (workflow, _) = fixtures::workflow().await;
        let root = workflow.create_category(named("Root")).await.unwrap();
        let child = workflow.create_category(child_of("Child", root.id)).await.unwrap();

        assert!(matches!(
            workflow.edit_category(root.id, child_of("Root", root.id)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            workflow.edit_category(root.id, child_of("Root", child.id)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            workflow.edit_category(999, named("Ghost")).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_requires_empty_leaf_category() {
        let (workflow, _) = fixtures::workflow().await;
        let parent = workflow.create_category(named("Parent")).await.unwrap();
        let child = workflow.create_category(child_of("Child", parent.id)).await.unwrap();
        let admin = fixtures::user(&workflow.db, "admin", Role::Admin).await;
        let video =
            fixtures::video(&workflow.db, "v1", Some(child.id), Some(admin.user_id), Utc::now()).await;

        assert!(matches!(
            workflow.delete_category(parent.id).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            workflow.delete_category(child.id).await,
            Err(AppError::Conflict(_))
        ));

        workflow.delete_video(video.id, &admin, Utc::now()).await.unwrap();
        workflow.delete_category(child.id).await.unwrap();
        workflow.delete_category(parent.id).await.unwrap();

        let mut conn = workflow.db.acquire().await.unwrap();
        let mut categories = CategoryRepo::new(&mut conn);
        assert!(categories.find_by_id(child.id).await.unwrap().is_none());
        assert!(categories.find_by_id(parent.id).await.unwrap().is_none());
    }
}
