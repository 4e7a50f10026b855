use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub date_subscribed: DateTime<Utc>,
}

pub struct SubscriberRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> SubscriberRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<Subscriber>, AppError> {
        let subscriber =
            sqlx::query_as::<_, Subscriber>(r#"SELECT * FROM subscribers WHERE email = ?"#)
                .bind(email)
                .fetch_optional(&mut *self.conn)
                .await?;
        Ok(subscriber)
    }

    pub async fn insert(&mut self, email: &str, now: DateTime<Utc>) -> Result<Subscriber, AppError> {
        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"INSERT INTO subscribers (email, date_subscribed) VALUES (?, ?) RETURNING *"#,
        )
        .bind(email)
        .bind(now)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(subscriber)
    }

    pub async fn all_emails(&mut self) -> Result<Vec<String>, AppError> {
        let emails = sqlx::query_scalar::<_, String>(r#"SELECT email FROM subscribers ORDER BY id"#)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(emails)
    }
}
