use axum::extract::State;
use axum::Json;
use chrono::Utc;

use crate::auth::RequireUploader;
use crate::catalog::DashboardEntry;
use crate::errors::AppError;
use crate::routes::{success, ApiResponse, AppState};

pub async fn uploader_dashboard(
    RequireUploader(actor): RequireUploader,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<DashboardEntry>>>, AppError> {
    let entries = state.catalog.uploader_dashboard(&actor, Utc::now()).await?;
    Ok(success("Dashboard loaded.", entries))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use chrono::{Duration, Utc};

    use crate::auth::Role;
    use crate::routes::testing::TestApp;
    use crate::workflow::fixtures;

    #[tokio::test]
    async fn dashboard_lists_only_own_videos_with_edit_flags() {
        let mut app = TestApp::new().await;
        let john = fixtures::user(&app.pool, "john", Role::Uploader).await;
        let mary = fixtures::user(&app.pool, "mary", Role::Uploader).await;
        fixtures::video(&app.pool, "new", None, Some(john.user_id), Utc::now()).await;
        fixtures::video(&app.pool, "old", None, Some(john.user_id), Utc::now() - Duration::hours(72)).await;
        fixtures::video(&app.pool, "hers", None, Some(mary.user_id), Utc::now()).await;

        assert_eq!(app.login("john", "Password123").await, StatusCode::OK);
        let (status, body) = app.get("/uploader/dashboard").await;
        assert_eq!(status, StatusCode::OK);

        let entries = body["data"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["video"]["source_id"], "new");
        assert_eq!(entries[0]["editable"], true);
        assert_eq!(entries[1]["editable"], false);
    }

    #[tokio::test]
    async fn dashboard_is_for_uploaders_only() {
        let mut app = TestApp::new().await;
        fixtures::user(&app.pool, "boss", Role::Admin).await;

        assert_eq!(app.get("/uploader/dashboard").await.0, StatusCode::UNAUTHORIZED);
        assert_eq!(app.login("boss", "Password123").await, StatusCode::OK);
        assert_eq!(app.get("/uploader/dashboard").await.0, StatusCode::UNAUTHORIZED);
    }
}
