mod auth;
mod authentication;
mod catalog;
mod config;
mod db;
mod email;
mod errors;
mod routes;
mod telemetry;
mod workflow;

use std::error::Error;
use std::sync::Arc;

use axum::body::Body;
use axum::routing::get;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Settings;
use crate::db::init_db;
use crate::email::{EmailClient, LogNotifier, SharedNotifier};
use crate::routes::{create_router, AppState};
use crate::workflow::ContentWorkflow;

const SESSION_INACTIVITY_DAYS: i64 = 30;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::from_env();
    telemetry::init_tracing();

    let db = init_db(&settings.database_url).await?;

    let notifier: SharedNotifier = match &settings.email {
        Some(email) => Arc::new(EmailClient::new(email)?),
        None => {
            tracing::warn!("EMAIL_* settings missing, notifications will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let workflow = ContentWorkflow::new(db.clone(), notifier, settings.public_base_url.clone());
    workflow
        .ensure_admin(settings.admin_seed.as_ref(), Utc::now())
        .await?;

    let (prometheus_layer, metric_handle) = PrometheusMetricLayer::pair();

    let session_store = MemoryStore::default();
    let session = SessionManagerLayer::new(session_store)
        .with_secure(settings.session_secure)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)));

    let app = create_router(AppState::new(db, workflow))
        .route("/metrics", get(|| async move { metric_handle.render() }))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(telemetry::make_span::<Body>)
                .on_request(telemetry::on_request::<Body>)
                .on_response(telemetry::on_response::<Body>)
                .on_failure(telemetry::on_failure),
        )
        .layer(prometheus_layer)
        .layer(session);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
