//! Back-office handlers. Category and user management is admin-only; video mutations are open to
//! uploaders, with ownership and the edit window enforced by the workflow.

use axum::extract::{Path, State};
use axum::{Form, Json};
use chrono::Utc;

use crate::auth::{RequireAdmin, RequireUploaderOrAdmin};
use crate::catalog::VideoListing;
use crate::db::{Category, User, Video};
use crate::errors::AppError;
use crate::routes::{success, ApiResponse, AppState};
use crate::workflow::{CategoryInput, UserInput, VideoInput};

pub async fn create_user(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<UserInput>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let user = state.workflow.create_user(input, Utc::now()).await?;
    Ok(success("User created successfully.", user))
}

pub async fn all_videos(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<VideoListing>>, AppError> {
    let listing = state.catalog.list_all_videos().await?;
    Ok(success("Videos loaded.", listing))
}

pub async fn add_video(
    RequireUploaderOrAdmin(actor): RequireUploaderOrAdmin,
    State(state): State<AppState>,
    Form(input): Form<VideoInput>,
) -> Result<Json<ApiResponse<Video>>, AppError> {
    let video = state.workflow.create_video(input, &actor, Utc::now()).await?;
    Ok(success("Video added successfully.", video))
}

pub async fn edit_video(
    RequireUploaderOrAdmin(actor): RequireUploaderOrAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(input): Form<VideoInput>,
) -> Result<Json<ApiResponse<Video>>, AppError> {
    let video = state.workflow.edit_video(id, input, &actor, Utc::now()).await?;
    Ok(success("Video updated successfully.", video))
}

pub async fn delete_video(
    RequireUploaderOrAdmin(actor): RequireUploaderOrAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.workflow.delete_video(id, &actor, Utc::now()).await?;
    Ok(success("Video deleted successfully.", ()))
}

pub async fn all_categories(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Category>>>, AppError> {
    let categories = state.catalog.list_categories().await?;
    Ok(success("Categories loaded.", categories))
}

pub async fn add_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Form(input): Form<CategoryInput>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = state.workflow.create_category(input).await?;
    Ok(success("Category added successfully.", category))
}

pub async fn edit_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(input): Form<CategoryInput>,
) -> Result<Json<ApiResponse<Category>>, AppError> {
    let category = state.workflow.edit_category(id, input).await?;
    Ok(success("Category updated successfully.", category))
}

pub async fn delete_category(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.workflow.delete_category(id).await?;
    Ok(success("Category deleted successfully.", ()))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    use crate::auth::Role;
    use crate::db::VideoRepo;
    use crate::routes::testing::TestApp;
    use crate::workflow::fixtures;

    async fn admin_app() -> TestApp {
        let mut app = TestApp::new().await;
        fixtures::user(&app.pool, "boss", Role::Admin).await;
        assert_eq!(app.login("boss", "Password123").await, StatusCode::OK);
        app
    }

    #[tokio::test]
    async fn anonymous_callers_are_turned_away() {
        let mut app = TestApp::new().await;
        for uri in ["/admin/videos", "/admin/categories"] {
            let (status, body) = app.get(uri).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
            assert_eq!(body["status"], "error");
        }
        let (status, _) = app
            .post_form("/admin/videos/add", "title=x&youtube_link=https://youtu.be/abc")
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = app.post_form("/admin/categories", "name=Music").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_manages_categories() {
        let mut app = admin_app().await;

        let (status, body) = app.post_form("/admin/categories", "name=Gospel+Music").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "gospel-music");
        let parent = body["data"]["id"].as_i64().unwrap();

        let (status, body) = app
            .post_form("/admin/categories", &format!("name=Choirs&parent_id={parent}"))
            .await;
        assert_eq!(status, StatusCode::OK);
        let child = body["data"]["id"].as_i64().unwrap();

        let (status, _) = app.post_form("/admin/categories", "name=Gospel+Music").await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app.post_form("/admin/categories", "name=+++").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .post_form(&format!("/admin/categories/{child}/edit"), "name=Choir+Songs")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "choir-songs");
        assert!(body["data"]["parent_id"].is_null());

        let (_, body) = app.get("/admin/categories").await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);

        let (status, _) = app.post_form(&format!("/admin/categories/{child}/delete"), "").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.post_form(&format!("/admin/categories/{child}/delete"), "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_creates_users_and_uploader_cannot() {
        let mut app = admin_app().await;

        let (status, body) = app
            .post_form(
                "/admin/create-user",
                "username=john&email=John%40Example.com&password=secret1&role=uploader",
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "john@example.com");
        assert!(body["data"].get("password_hash").is_none());

        let (status, _) = app
            .post_form(
                "/admin/create-user",
                "username=john&email=other%40example.com&password=secret1",
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        assert_eq!(app.login("john", "secret1").await, StatusCode::OK);
        let (status, _) = app
            .post_form(
                "/admin/create-user",
                "username=eve&email=eve%40example.com&password=secret1",
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn uploader_edit_window_is_enforced_over_http() {
        let mut app = TestApp::new().await;
        let john = fixtures::user(&app.pool, "john", Role::Uploader).await;
        let mary = fixtures::user(&app.pool, "mary", Role::Uploader).await;
        let old = fixtures::video(&app.pool, "old", None, Some(john.user_id), Utc::now() - Duration::hours(49)).await;
        let marys = fixtures::video(&app.pool, "marys", None, Some(mary.user_id), Utc::now()).await;

        assert_eq!(app.login("john", "Password123").await, StatusCode::OK);

        let (status, body) = app
            .post_form("/admin/videos/add", "title=Fresh&youtube_link=youtu.be%2Ffresh01")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["source_id"], "fresh01");
        let fresh = body["data"]["id"].as_i64().unwrap();

        let (status, body) = app
            .post_form(&format!("/admin/videos/{fresh}/edit"), "title=Renamed")
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["title"], "Renamed");

        let (status, body) = app
            .post_form(&format!("/admin/videos/{}/edit", old.id), "title=Late")
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        let window_message = body["message"].clone();

        let (status, body) = app
            .post_form(&format!("/admin/videos/{}/delete", marys.id), "")
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_ne!(body["message"], window_message);

        let (status, _) = app.get("/admin/videos").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.post_form(&format!("/admin/videos/{fresh}/delete"), "").await;
        assert_eq!(status, StatusCode::OK);

        let mut conn = app.pool.acquire().await.unwrap();
        let mut videos = VideoRepo::new(&mut conn);
        assert!(videos.find_by_id(fresh).await.unwrap().is_none());
        assert_eq!(videos.find_by_id(old.id).await.unwrap().unwrap().title, "Video old");
    }

    #[tokio::test]
    async fn admin_lists_and_edits_any_video() {
        let mut app = admin_app().await;
        let john = fixtures::user(&app.pool, "john", Role::Uploader).await;
        let old = fixtures::video(&app.pool, "old", None, Some(john.user_id), Utc::now() - Duration::days(30)).await;

        let (status, _) = app
            .post_form(&format!("/admin/videos/{}/edit", old.id), "title=Fixed")
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.get("/admin/videos").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["videos"][0]["title"], "Fixed");

        let (status, _) = app
            .post_form("/admin/videos/add", "title=Dup&youtube_link=https://www.youtube.com/watch?v=old")
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .post_form("/admin/videos/add", "title=Bad&youtube_link=https://vimeo.com/123")
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
