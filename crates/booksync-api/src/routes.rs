use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use booksync_core::util::iso_timestamp;
use booksync_core::{dispatch, LiveReconciler, SyncRequest, SyncResponse};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::ApiError;

const SERVICE_NAME: &str = "booksync-api";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    reconciler: Arc<LiveReconciler>,
    /// One dispatch runs to completion before the next starts.
    dispatch_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn from_config(config: Arc<AppConfig>) -> booksync_core::Result<Self> {
        Ok(Self {
            reconciler: Arc::new(LiveReconciler::from_settings(&config.sync)?),
            dispatch_lock: Arc::new(Mutex::new(())),
            config,
        })
    }
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(
            "/api/sync",
            get(healthz)
                .post(run_sync)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([CONTENT_TYPE, AUTHORIZATION]),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    timestamp: String,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        service: SERVICE_NAME,
        timestamp: iso_timestamp(Utc::now()),
    })
}

async fn preflight() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
struct MethodNotAllowedBody {
    error: &'static str,
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(MethodNotAllowedBody {
            error: "Method not allowed",
        }),
    )
}

async fn run_sync(
    State(state): State<AppState>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    let _running = state.dispatch_lock.lock().await;
    let outcome = dispatch(state.reconciler.as_ref(), &request).await?;
    let response = SyncResponse::new(outcome);
    tracing::info!(
        action = request.action.as_deref().unwrap_or_default(),
        success = response.success,
        "Sync request completed"
    );
    Ok(Json(response))
}
