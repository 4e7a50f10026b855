//! SQLite persistence: pool setup, embedded migrations and one repository per entity.
//!
//! Repositories borrow a `SqliteConnection`, so the same code runs against a pooled
//! connection for reads and against an open transaction for mutations.

mod categories;
mod subscribers;
mod users;
mod videos;

pub use categories::{Category, CategoryRepo};
pub use subscribers::SubscriberRepo;
pub use users::{NewUser, User, UserRepo};
pub use videos::{NewVideo, Video, VideoChanges, VideoRepo};

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::errors::AppError;

pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[tracing::instrument(name = "Initialise database", skip(database_url))]
pub async fn init_db(database_url: &str) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(QUERY_TIMEOUT)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    tracing::info!("Database ready, migrations applied");
    Ok(pool)
}

/// Bounds a read query by [`QUERY_TIMEOUT`].
pub async fn timeout_query<T, F>(fut: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(QUERY_TIMEOUT, fut).await?
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("valid sqlite url")
        .foreign_keys(true);

    // A single long-lived connection keeps the in-memory database alive for the whole test.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("in-memory sqlite pool");

    MIGRATOR.run(&pool).await.expect("migrations apply");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn migrations_create_schema() {
        let pool = test_pool().await;
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE '\\_%' ESCAPE '\\' AND name != 'sqlite_sequence' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("list tables");

        assert_eq!(
            tables,
            vec!["categories", "comments", "likes", "subscribers", "users", "videos"]
        );
    }
}
