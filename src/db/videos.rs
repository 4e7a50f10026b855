use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection};

use crate::errors::AppError;

#[derive(Debug, Serialize, Deserialize, FromRow, Clone, PartialEq)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(rename = "video_id")]
    pub source_id: String,
    pub category_id: Option<i64>,
    pub uploaded_by: Option<i64>,
    pub translated_link: Option<String>,
    pub download_link: Option<String>,
    pub views: i64,
    pub likes_count: i64,
    pub last_watched: Option<DateTime<Utc>>,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: Option<String>,
    pub source_id: String,
    pub category_id: Option<i64>,
    pub uploaded_by: Option<i64>,
    pub translated_link: Option<String>,
    pub download_link: Option<String>,
    pub date_added: DateTime<Utc>,
}

/// Editable fields. The source id never changes after creation.
#[derive(Debug, Clone)]
pub struct VideoChanges {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub translated_link: Option<String>,
    pub download_link: Option<String>,
}

const RECENT_FIRST: &str = " ORDER BY date_added DESC, id DESC";

pub struct VideoRepo<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> VideoRepo<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE id = ?"#)
            .bind(id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(video)
    }

    pub async fn find_by_source_id(&mut self, source_id: &str) -> Result<Option<Video>, AppError> {
        let video = sqlx::query_as::<_, Video>(r#"SELECT * FROM videos WHERE video_id = ?"#)
            .bind(source_id)
            .fetch_optional(&mut *self.conn)
            .await?;
        Ok(video)
    }

    pub async fn insert(&mut self, video: &NewVideo) -> Result<Video, AppError> {
        let created = sqlx::query_as::<_, Video>(
            r#"INSERT INTO videos
            (title, description, video_id, category_id, uploaded_by, translated_link, download_link, date_added)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *"#,
        )
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.source_id)
        .bind(video.category_id)
        .bind(video.uploaded_by)
        .bind(&video.translated_link)
        .bind(&video.download_link)
        .bind(video.date_added)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(created)
    }

    pub async fn update(&mut self, id: i64, changes: &VideoChanges) -> Result<Video, AppError> {
        let updated = sqlx::query_as::<_, Video>(
            r#"UPDATE videos
            SET title = ?, description = ?, category_id = ?, translated_link = ?, download_link = ?
            WHERE id = ?
            RETURNING *"#,
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.category_id)
        .bind(&changes.translated_link)
        .bind(&changes.download_link)
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(updated)
    }

    pub async fn delete(&mut self, id: i64) -> Result<u64, AppError> {
        let result = sqlx::query(r#"DELETE FROM videos WHERE id = ?"#)
            .bind(id)
            .execute(&mut *self.conn)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn recent(&mut self, limit: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!("SELECT * FROM videos{RECENT_FIRST} LIMIT ?");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    pub async fn recent_in_category(&mut self, category_id: i64, limit: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!("SELECT * FROM videos WHERE category_id = ?{RECENT_FIRST} LIMIT ?");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(category_id)
            .bind(limit)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    pub async fn most_viewed(&mut self, limit: i64) -> Result<Vec<Video>, AppError> {
        let videos = sqlx::query_as::<_, Video>(
            r#"SELECT * FROM videos ORDER BY views DESC, date_added DESC, id DESC LIMIT ?"#,
        )
        .bind(limit)
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(videos)
    }

    pub async fn list_all(&mut self) -> Result<Vec<Video>, AppError> {
        let sql = format!("SELECT * FROM videos{RECENT_FIRST}");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    pub async fn by_uploader(&mut self, user_id: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!("SELECT * FROM videos WHERE uploaded_by = ?{RECENT_FIRST}");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(user_id)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    pub async fn count_all(&mut self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM videos"#)
            .fetch_one(&mut *self.conn)
            .await?;
        Ok(count)
    }

    pub async fn count_in_category(&mut self, category_id: i64) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>(r#"SELECT COUNT(*) FROM videos WHERE category_id = ?"#)
                .bind(category_id)
                .fetch_one(&mut *self.conn)
                .await?;
        Ok(count)
    }

    pub async fn page(&mut self, limit: i64, offset: i64) -> Result<Vec<Video>, AppError> {
        let sql = format!("SELECT * FROM videos{RECENT_FIRST} LIMIT ? OFFSET ?");
        let videos = sqlx::query_as::<_, Video>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    /// Case-insensitive substring match on the title. SQLite's `LOWER` only folds ASCII, so both
    /// sides are folded here with Unicode lower-casing.
    pub async fn search_title(&mut self, needle: &str) -> Result<Vec<Video>, AppError> {
        let needle = needle.to_lowercase();
        let videos = self.list_all().await?;
        Ok(videos
            .into_iter()
            .filter(|video| video.title.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn in_categories_excluding(
        &mut self,
        category_ids: &[i64],
        excluded_video: i64,
        limit: i64,
    ) -> Result<Vec<Video>, AppError> {
        if category_ids.is_empty() || limit <= 0 {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM videos WHERE category_id IN (");
        let mut ids = builder.separated(", ");
        for id in category_ids {
            ids.push_bind(*id);
        }
        ids.push_unseparated(") AND id != ");
        builder.push_bind(excluded_video);
        builder.push(RECENT_FIRST);
        builder.push(" LIMIT ");
        builder.push_bind(limit);

        let videos = builder
            .build_query_as::<Video>()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(videos)
    }

    pub async fn record_view(&mut self, id: i64, now: DateTime<Utc>) -> Result<Video, AppError> {
        let video = sqlx::query_as::<_, Video>(
            r#"UPDATE videos SET views = views + 1, last_watched = ? WHERE id = ? RETURNING *"#,
        )
        .bind(now)
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(video)
    }

    pub async fn increment_likes(&mut self, id: i64) -> Result<i64, AppError> {
        let likes = sqlx::query_scalar::<_, i64>(
            r#"UPDATE videos SET likes_count = likes_count + 1 WHERE id = ? RETURNING likes_count"#,
        )
        .bind(id)
        .fetch_one(&mut *self.conn)
        .await?;
        Ok(likes)
    }
}
