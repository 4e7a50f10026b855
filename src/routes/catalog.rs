use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::auth::{caller_role, viewed_key, CallerRole, RequestContext};
use crate::catalog::{CategoryLanding, Homepage, Page, WatchPage, PAGE_SIZE};
use crate::db::Video;
use crate::errors::AppError;
use crate::routes::{success, ApiResponse, AppState};

/// Page payload plus the caller's role, so clients can show or hide back-office links.
#[derive(Debug, Serialize)]
pub struct ForCaller<T> {
    #[serde(flatten)]
    pub content: T,
    pub role: CallerRole,
}

/// `page` is read leniently: anything that is not a number means the first page.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub videos: Vec<Video>,
}

pub async fn homepage(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ForCaller<Homepage>>>, AppError> {
    let content = state.catalog.homepage().await?;
    Ok(success(
        "Homepage loaded.",
        ForCaller {
            content,
            role: caller_role(ctx.actor.as_ref()),
        },
    ))
}

pub async fn list_videos(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<ApiResponse<Page<Video>>>, AppError> {
    let page = state
        .catalog
        .list_paged(params.page(), PAGE_SIZE)
        .await?;
    Ok(success("Videos loaded.", page))
}

pub async fn search_videos(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let videos = state.catalog.search(&params.q).await?;
    Ok(success(
        format!("{} result(s).", videos.len()),
        SearchResults {
            query: params.q,
            videos,
        },
    ))
}

pub async fn category_page(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<CategoryLanding>>, AppError> {
    let landing = state.catalog.category_landing(&slug).await?;
    Ok(success("Category loaded.", landing))
}

/// Watch page. The first request per session for a video counts as a view.
#[tracing::instrument(name = "Watch video", skip(ctx, state))]
pub async fn watch_video(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<ApiResponse<ForCaller<WatchPage>>>, AppError> {
    let video = state.catalog.get_video_by_source_id(&source_id).await?;

    let key = viewed_key(video.id);
    let already_viewed = ctx.session.get::<bool>(&key).await?.unwrap_or(false);
    let (video, counted) = state
        .catalog
        .record_view(video, already_viewed, Utc::now())
        .await?;
    if counted {
        ctx.session.insert(&key, true).await?;
    }

    let content = state.catalog.watch_page(video).await?;
    Ok(success(
        "Video loaded.",
        ForCaller {
            content,
            role: caller_role(ctx.actor.as_ref()),
        },
    ))
}

pub async fn like_video(
    State(state): State<AppState>,
    Path(source_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let likes = state.catalog.like_video(&source_id).await?;
    Ok(Json(json!({ "likes": likes })))
}
