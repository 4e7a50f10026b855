use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::routes::AppState;
use crate::workflow::SubscribeOutcome;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SubscribeResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Newsletter signup. Errors come back as `{ "status": "error", "message": ... }` via `AppError`.
pub async fn subscribe(
    State(state): State<AppState>,
    payload: Result<Json<SubscribeRequest>, JsonRejection>,
) -> Result<Json<SubscribeResponse>, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection, "Malformed subscribe request");
        AppError::Validation("Email is required.".to_string())
    })?;

    let outcome = state.workflow.subscribe(&request.email, Utc::now()).await?;

    Ok(Json(match outcome {
        SubscribeOutcome::Subscribed => SubscribeResponse {
            status: "success",
            message: "Thank you for subscribing!",
        },
        SubscribeOutcome::AlreadySubscribed => SubscribeResponse {
            status: "info",
            message: "You are already subscribed.",
        },
    }))
}
