use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i64>,
}

pub struct CategoryRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> CategoryRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(category)
    }

    pub async fn find_by_slug(&mut self, slug: &str) -> Result<Option<Category>, AppError> {
        let category =
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE slug = ?"#)
                .bind(slug)
                .fetch_optional(&mut *self.conn)
                .await?;
        Ok(category)
    }

    /// True when another category already uses `name`.
    pub async fn name_taken(&mut self, name: &str, excluding: Option<i64>) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"SELECT COUNT(*) FROM categories WHERE name = ? AND (? IS NULL OR id != ?)"#,
        )
        .bind(name)
        .bind(excluding)
        .bind(excluding)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(count > 0)
    }

    pub async fn slugs_excluding(&mut self, excluding: Option<i64>) -> Result<HashSet<String>, AppError> {
        let slugs = sqlx::query_scalar::<_, String>(
            r#"SELECT slug FROM categories WHERE ? IS NULL OR id != ?"#,
        )
        .bind(excluding)
        .bind(excluding)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(slugs.into_iter().collect())
    }

    pub async fn list_all(&mut self) -> Result<Vec<Category>, AppError> {
        let categories =
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories ORDER BY name ASC"#)
                .fetch_all(&mut *self.conn)
                .await?;
        Ok(categories)
    }

    pub async fn top_level(&mut self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories WHERE parent_id IS NULL ORDER BY name ASC"#,
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(categories)
    }

    pub async fn children_of(&mut self, parent_id: i64) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            r#"SELECT * FROM categories WHERE parent_id = ? ORDER BY name ASC"#,
        )
        .bind(parent_id)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(categories)
    }

    pub async fn count_children(&mut self, parent_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM categories WHERE parent_id = ?"#)
                .bind(parent_id)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(count)
    }

    pub async fn insert(
        &mut self,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"INSERT INTO categories (name, slug, parent_id) VALUES (?, ?, ?) RETURNING *"#,
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(category)
    }

    pub async fn update(
        &mut self,
        id: i64,
        name: &str,
        slug: &str,
        parent_id: Option<i64>,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"UPDATE categories SET name = ?, slug = ?, parent_id = ? WHERE id = ? RETURNING *"#,
        )
        .bind(name)
        .bind(slug)
        .bind(parent_id)
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(category)
    }

    pub async fn delete(&mut self, id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(r#"DELETE FROM categories WHERE id = ?"#)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }
}
