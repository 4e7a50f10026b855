//! Read paths: homepage, category pages, watch page, search, pagination and likes.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::auth::Actor;
use crate::db::{timeout_query, Category, CategoryRepo, Video, VideoRepo};
use crate::errors::AppError;
use crate::workflow::can_mutate;

pub const CATEGORY_BLOCK_SIZE: i64 = 10;
pub const FEATURED_COUNT: i64 = 5;
pub const HOMEPAGE_POPULAR_COUNT: i64 = 10;
pub const WATCH_POPULAR_COUNT: i64 = 8;
pub const RELATED_LIMIT: i64 = 6;
pub const PAGE_SIZE: i64 = 10;

#[derive(Debug, Serialize)]
pub struct CategoryVideos {
    pub category: Category,
    pub videos: Vec<Video>,
}

#[derive(Debug, Serialize)]
pub struct HomepageBlock {
    pub category: Category,
    pub parent_videos: Vec<Video>,
    pub children: Vec<CategoryVideos>,
}

#[derive(Debug, Serialize)]
pub struct Homepage {
    pub categories: Vec<HomepageBlock>,
    pub featured_videos: Vec<Video>,
    pub popular_videos: Vec<Video>,
}

#[derive(Debug, Serialize)]
pub struct CategoryLanding {
    pub category: Category,
    pub videos: Vec<Video>,
    pub subcategories: Vec<CategoryVideos>,
}

#[derive(Debug, Serialize)]
pub struct WatchPage {
    pub video: Video,
    pub related_videos: Vec<Video>,
    pub popular_videos: Vec<Video>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct VideoListing {
    pub videos: Vec<Video>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct DashboardEntry {
    pub video: Video,
    pub editable: bool,
}

#[derive(Clone)]
pub struct Catalog {
    db: SqlitePool,
}

impl Catalog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Top-level categories with their own and their children's recent videos. Categories
    /// with no videos anywhere in their block are left out.
    #[tracing::instrument(name = "List homepage", skip(self))]
    pub async fn homepage(&self) -> Result<Homepage, AppError> {
        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            let top_level = CategoryRepo::new(&mut conn).top_level().await?;

            let mut blocks = Vec::new();
            for category in top_level {
                let parent_videos = VideoRepo::new(&mut conn)
                    .recent_in_category(category.id, CATEGORY_BLOCK_SIZE)
                    .await?;
                let children = child_blocks(&mut conn, category.id).await?;

                if !parent_videos.is_empty() || !children.is_empty() {
                    blocks.push(HomepageBlock {
                        category,
                        parent_videos,
                        children,
                    });
                }
            }

            let mut videos = VideoRepo::new(&mut conn);
            let featured_videos = videos.recent(FEATURED_COUNT).await?;
            let popular_videos = videos.most_viewed(HOMEPAGE_POPULAR_COUNT).await?;

            Ok(Homepage {
                categories: blocks,
                featured_videos,
                popular_videos,
            })
        })
        .await
    }

    #[tracing::instrument(name = "Category landing page", skip(self))]
    pub async fn category_landing(&self, slug: &str) -> Result<CategoryLanding, AppError> {
        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            let category = CategoryRepo::new(&mut conn)
                .find_by_slug(slug)
                .await?
                .ok_or_else(|| AppError::NotFound("Category not found.".to_string()))?;

            let videos = VideoRepo::new(&mut conn)
                .recent_in_category(category.id, CATEGORY_BLOCK_SIZE)
                .await?;
            let subcategories = child_blocks(&mut conn, category.id).await?;

            Ok(CategoryLanding {
                category,
                videos,
                subcategories,
            })
        })
        .await
    }

    #[tracing::instrument(name = "Get video by source id", skip(self))]
    pub async fn get_video_by_source_id(&self, source_id: &str) -> Result<Video, AppError> {
        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            VideoRepo::new(&mut conn)
                .find_by_source_id(source_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Video not found.".to_string()))
        })
        .await
    }

    /// Counts a view unless this caller's session already did. Returns the current row and
    /// whether a view was recorded.
    #[tracing::instrument(name = "Record video view", skip(self, video), fields(video_id = video.id))]
    pub async fn record_view(
        &self,
        video: Video,
        already_viewed: bool,
        now: DateTime<Utc>,
    ) -> Result<(Video, bool), AppError> {
        if already_viewed {
            return Ok((video, false));
        }
        let mut conn = self.db.acquire().await?;
        let updated = VideoRepo::new(&mut conn).record_view(video.id, now).await?;
        Ok((updated, true))
    }

    /// Videos from the same branch of the category tree: siblings when the video sits in a
    /// child category, the category and its children when it sits at the top level.
    #[tracing::instrument(name = "Related videos", skip(self, video), fields(video_id = video.id))]
    pub async fn related_videos(&self, video: &Video, limit: i64) -> Result<Vec<Video>, AppError> {
        let Some(category_id) = video.category_id else {
            return Ok(Vec::new());
        };

        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            let mut categories = CategoryRepo::new(&mut conn);

            let Some(category) = categories.find_by_id(category_id).await? else {
                return Ok(Vec::new());
            };

            let candidate_ids: Vec<i64> = match category.parent_id {
                Some(parent_id) => categories
                    .children_of(parent_id)
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect(),
                None => std::iter::once(category.id)
                    .chain(categories.children_of(category.id).await?.into_iter().map(|c| c.id))
                    .collect(),
            };

            VideoRepo::new(&mut conn)
                .in_categories_excluding(&candidate_ids, video.id, limit)
                .await
        })
        .await
    }

    pub async fn watch_page(&self, video: Video) -> Result<WatchPage, AppError> {
        let related_videos = self.related_videos(&video, RELATED_LIMIT).await?;
        let popular_videos = timeout_query(async {
            let mut conn = self.db.acquire().await?;
            VideoRepo::new(&mut conn).most_viewed(WATCH_POPULAR_COUNT).await
        })
        .await?;

        Ok(WatchPage {
            video,
            related_videos,
            popular_videos,
        })
    }

    /// Case-insensitive title search. A blank query matches nothing.
    #[tracing::instrument(name = "Search videos", skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Video>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            VideoRepo::new(&mut conn).search_title(query).await
        })
        .await
    }

    /// Newest-first pages. Pages past the end come back empty.
    #[tracing::instrument(name = "List videos paged", skip(self))]
    pub async fn list_paged(&self, page: i64, page_size: i64) -> Result<Page<Video>, AppError> {
        let page = page.max(1);
        let per_page = page_size.max(1);

        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            let mut videos = VideoRepo::new(&mut conn);

            let total = videos.count_all().await?;
            let offset = (page - 1).saturating_mul(per_page);
            let items = if offset >= total {
                Vec::new()
            } else {
                videos.page(per_page, offset).await?
            };
            let total_pages = (total + per_page - 1) / per_page;

            Ok(Page {
                items,
                page,
                per_page,
                total,
                total_pages,
                has_next: page < total_pages,
                has_prev: page > 1,
            })
        })
        .await
    }

    /// Adds one like per call and returns the new total.
    #[tracing::instrument(name = "Like video", skip(self))]
    pub async fn like_video(&self, source_id: &str) -> Result<i64, AppError> {
        let video = self.get_video_by_source_id(source_id).await?;
        let mut conn = self.db.acquire().await?;
        VideoRepo::new(&mut conn).increment_likes(video.id).await
    }

    #[tracing::instrument(name = "List all videos", skip(self))]
    pub async fn list_all_videos(&self) -> Result<VideoListing, AppError> {
        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            let videos = VideoRepo::new(&mut conn).list_all().await?;
            let categories = CategoryRepo::new(&mut conn).list_all().await?;
            Ok(VideoListing { videos, categories })
        })
        .await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        timeout_query(async {
            let mut conn = self.db.acquire().await?;
            CategoryRepo::new(&mut conn).list_all().await
        })
        .await
    }

    #[tracing::instrument(name = "Uploader dashboard", skip(self))]
    pub async fn uploader_dashboard(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<DashboardEntry>, AppError> {
        let videos = timeout_query(async {
            let mut conn = self.db.acquire().await?;
            VideoRepo::new(&mut conn).by_uploader(actor.user_id).await
        })
        .await?;

        Ok(videos
            .into_iter()
            .map(|video| {
                let editable = can_mutate(&video, actor, now).is_ok();
                DashboardEntry { video, editable }
            })
            .collect())
    }
}

/// Child categories of `parent_id` that hold at least one video, with their recent videos.
async fn child_blocks(
    conn: &mut sqlx::SqliteConnection,
    parent_id: i64,
) -> Result<Vec<CategoryVideos>, AppError> {
    let children = CategoryRepo::new(conn).children_of(parent_id).await?;

    let mut blocks = Vec::new();
    for child in children {
        let videos = VideoRepo::new(conn)
            .recent_in_category(child.id, CATEGORY_BLOCK_SIZE)
            .await?;
        if !videos.is_empty() {
            blocks.push(CategoryVideos {
                category: child,
                videos,
            });
        }
    }
    Ok(blocks)
}
