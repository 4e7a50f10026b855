use axum::extract::State;
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{end_session, start_session, Actor, RequestContext};
use crate::authentication::{validate_credentials, Credentials};
use crate::errors::AppError;
use crate::routes::{success, ApiResponse, AppState};

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn login_user(
    ctx: RequestContext,
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<ApiResponse<Actor>>, AppError> {
    let credentials = Credentials {
        username: form.username.trim().to_string(),
        password: form.password,
    };
    if credentials.username.is_empty() || credentials.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required.".to_string(),
        ));
    }

    let actor = {
        let mut conn = state.db.acquire().await?;
        validate_credentials(&credentials, &mut conn).await?
    };

    start_session(&ctx.session, actor).await?;
    tracing::info!(user_id = actor.user_id, role = %actor.role, "User logged in");

    Ok(success("Login successful.", actor))
}

pub async fn logout_user(ctx: RequestContext) -> Result<Json<Value>, AppError> {
    end_session(&ctx.session).await?;
    Ok(Json(json!({ "status": "success", "message": "Logged out." })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::auth::Role;
    use crate::routes::testing::TestApp;
    use crate::workflow::fixtures;

    #[tokio::test]
    async fn login_binds_session_and_logout_clears_it() {
        let mut app = TestApp::new().await;
        let uploader = fixtures::user(&app.pool, "john", Role::Uploader).await;

        let (status, body) = app.post_form("/admin/login", "username=john&password=Password123").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user_id"], uploader.user_id);
        assert_eq!(body["data"]["role"], "uploader");

        let (status, _) = app.get("/uploader/dashboard").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.post_form("/logout", "").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app.get("/uploader/dashboard").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials_alike() {
        let mut app = TestApp::new().await;
        fixtures::user(&app.pool, "john", Role::Uploader).await;

        let (status, wrong_password) = app.post_form("/admin/login", "username=john&password=nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown_user) = app.post_form("/admin/login", "username=ghost&password=nope").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password["message"], unknown_user["message"]);

        let (status, _) = app.post_form("/admin/login", "username=&password=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_replaces_previous_identity() {
        let mut app = TestApp::new().await;
        fixtures::user(&app.pool, "boss", Role::Admin).await;
        fixtures::user(&app.pool, "john", Role::Uploader).await;

        assert_eq!(app.login("boss", "Password123").await, StatusCode::OK);
        assert_eq!(app.get("/admin/categories").await.0, StatusCode::OK);

        assert_eq!(app.login("john", "Password123").await, StatusCode::OK);
        assert_eq!(app.get("/admin/categories").await.0, StatusCode::UNAUTHORIZED);
    }
}
