mod admin;
mod catalog;
pub(crate) mod health_check;
mod login;
mod subscriptions;
mod uploader;

pub use admin::*;
pub use catalog::*;
pub use health_check::*;
pub use login::*;
pub use subscriptions::*;
pub use uploader::*;

use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::catalog::Catalog;
use crate::workflow::ContentWorkflow;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub catalog: Catalog,
    pub workflow: ContentWorkflow,
}

impl AppState {
    pub fn new(db: SqlitePool, workflow: ContentWorkflow) -> Self {
        Self {
            catalog: Catalog::new(db.clone()),
            db,
            workflow,
        }
    }
}

/// Body of every successful JSON answer.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    pub message: String,
    pub data: T,
}

pub fn success<T: Serialize>(message: impl Into<String>, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        status: "success",
        message: message.into(),
        data,
    })
}

/// Application routes without the outer layers (sessions, tracing, metrics, CORS), which
/// `main` adds.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/", get(homepage))
        .route("/videos", get(list_videos))
        .route("/search", get(search_videos))
        .route("/category-page/:slug", get(category_page))
        .route("/video/:source_id", get(watch_video))
        .route("/like_video/:source_id", post(like_video))
        .route("/subscribe", post(subscribe))
        .route("/admin/login", post(login_user))
        .route("/logout", post(logout_user))
        .route("/admin/create-user", post(create_user))
        .route("/admin/videos", get(all_videos))
        .route("/admin/videos/add", post(add_video))
        .route("/admin/videos/:id/edit", post(edit_video))
        .route("/admin/videos/:id/delete", post(delete_video))
        .route("/admin/categories", get(all_categories).post(add_category))
        .route("/admin/categories/:id/edit", post(edit_category))
        .route("/admin/categories/:id/delete", post(delete_category))
        .route("/uploader/dashboard", get(uploader_dashboard))
        .with_state(state)
}
