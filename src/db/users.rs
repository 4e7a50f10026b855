use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::auth::Role;
use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password")]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

pub struct UserRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> UserRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_username(&mut self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE username = ?"#)
            .bind(username)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(user)
    }

    pub async fn username_taken(&mut self, username: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users WHERE username = ?"#)
            .bind(username)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn email_taken(&mut self, email: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users WHERE email = ?"#)
            .bind(email)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn admin_exists(&mut self) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM users WHERE role = ?"#)
            .bind(Role::Admin.as_str())
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count > 0)
    }

    pub async fn insert(&mut self, user: &NewUser) -> Result<User, AppError> {
        let created = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, email, password, role, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *"#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(created)
    }
}
