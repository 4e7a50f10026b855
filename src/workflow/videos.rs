use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{can_mutate, extract_source_id, non_blank, ContentWorkflow};
use crate::auth::Actor;
use crate::db::{CategoryRepo, NewVideo, SubscriberRepo, Video, VideoChanges, VideoRepo};
use crate::email::{dispatch, Message};
use crate::errors::AppError;

/// Video form as submitted by uploaders and admins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoInput {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub youtube_link: String,
    pub category_id: Option<String>,
    #[serde(rename = "drive_link")]
    pub translated_link: Option<String>,
    #[serde(rename = "mediafire_link")]
    pub download_link: Option<String>,
}

impl VideoInput {
    fn title(&self) -> Result<String, AppError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Video title is required.".to_string()));
        }
        Ok(title.to_string())
    }

    fn category_id(&self) -> Result<Option<i64>, AppError> {
        match non_blank(self.category_id.clone()) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<i64>()
                .map(Some)
                .map_err(|_| AppError::Validation("Invalid category.".to_string())),
        }
    }
}

impl ContentWorkflow {
    #[tracing::instrument(name = "Create video", skip(self, input), fields(actor = actor.user_id))]
    pub async fn create_video(
        &self,
        input: VideoInput,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Video, AppError> {
        let source_id = extract_source_id(&input.youtube_link)
            .ok_or_else(|| AppError::Validation("Invalid YouTube link.".to_string()))?;
        let title = input.title()?;
        let category_id = input.category_id()?;

        let mut transaction = self.db.begin().await?;

        if VideoRepo::new(&mut transaction)
            .find_by_source_id(&source_id)
            .await?
            .is_some()
        {
            tracing::warn!(source_id = %source_id, "Duplicate video submission");
            return Err(AppError::Conflict("Video already exists.".to_string()));
        }

        if let Some(category_id) = category_id {
            ensure_category_exists(&mut transaction, category_id).await?;
        }

        let video = VideoRepo::new(&mut transaction)
            .insert(&NewVideo {
                title,
                description: non_blank(input.description),
                source_id,
                category_id,
                uploaded_by: Some(actor.user_id),
                translated_link: non_blank(input.translated_link),
                download_link: non_blank(input.download_link),
                date_added: now,
            })
            .await?;

        transaction.commit().await?;
        tracing::info!(video_id = video.id, source_id = %video.source_id, "Video created");

        self.notify_new_video(&video).await;
        Ok(video)
    }

    #[tracing::instrument(name = "Edit video", skip(self, input), fields(actor = actor.user_id))]
    pub async fn edit_video(
        &self,
        id: i64,
        input: VideoInput,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Video, AppError> {
        let title = input.title()?;
        let category_id = input.category_id()?;

        let mut transaction = self.db.begin().await?;

        let video = find_video(&mut transaction, id).await?;
        can_mutate(&video, actor, now)?;

        if let Some(category_id) = category_id {
            ensure_category_exists(&mut transaction, category_id).await?;
        }

        let updated = VideoRepo::new(&mut transaction)
            .update(
                id,
                &VideoChanges {
                    title,
                    description: non_blank(input.description),
                    category_id,
                    translated_link: non_blank(input.translated_link),
                    download_link: non_blank(input.download_link),
                },
            )
            .await?;

        transaction.commit().await?;
        tracing::info!(video_id = id, "Video updated");
        Ok(updated)
    }

    #[tracing::instrument(name = "Delete video", skip(self), fields(actor = actor.user_id))]
    pub async fn delete_video(&self, id: i64, actor: &Actor, now: DateTime<Utc>) -> Result<(), AppError> {
        let mut transaction = self.db.begin().await?;

        let video = find_video(&mut transaction, id).await?;
        can_mutate(&video, actor, now)?;

        VideoRepo::new(&mut transaction).delete(id).await?;
        transaction.commit().await?;

        tracing::info!(video_id = id, "Video deleted");
        Ok(())
    }

    /// Queues a "new video" mail per subscriber. Never fails the caller.
    async fn notify_new_video(&self, video: &Video) {
        let recipients = match self.db.acquire().await {
            Ok(mut conn) => SubscriberRepo::new(&mut conn).all_emails().await,
            Err(err) => Err(AppError::from(err)),
        };

        let recipients = match recipients {
            Ok(recipients) => recipients,
            Err(err) => {
                tracing::error!(error = %err, "Could not load subscribers for notification");
                return;
            }
        };

        if recipients.is_empty() {
            return;
        }

        let watch_url = format!("{}/video/{}", self.public_base_url, video.source_id);
        let messages = recipients
            .into_iter()
            .map(|recipient| Message {
                recipient,
                subject: format!("New Video Added: {}", video.title),
                body: format!(
                    "Hello!\n\nA new video '{}' has been added to GospelTube.\nWatch it here: {}\n\nBlessings,\nGospelTube Team",
                    video.title, watch_url
                ),
            })
            .collect();

        dispatch(self.notifier.clone(), messages);
    }
}

async fn find_video(conn: &mut sqlx::SqliteConnection, id: i64) -> Result<Video, AppError> {
    VideoRepo::new(conn)
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Video not found.".to_string()))
}

async fn ensure_category_exists(conn: &mut sqlx::SqliteConnection, id: i64) -> Result<(), AppError> {
    match CategoryRepo::new(conn).find_by_id(id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::Validation("Selected category does not exist.".to_string())),
    }
}
