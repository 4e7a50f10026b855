use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::routes::AppState;

/// Liveness plus a trivial round trip to the store.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(&state.db).await {
        Ok(_) => (StatusCode::OK, "OK"),
        Err(err) => {
            tracing::error!(error = %err, "Health check could not reach the database");
            (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE")
        }
    }
}
