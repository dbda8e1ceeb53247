use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::error::StorageError;
use crate::news::{Category, NewsItem};
use crate::pipeline::{RunOutcome, UpdateOrchestrator};
use crate::store::{StoreStats, DEFAULT_EXPORT_LIMIT};

pub const CRON_AUTH_HEADER: &str = "x-cron-auth";
pub const DEFAULT_PAGE: usize = 50;
pub const MAX_PAGE: usize = 200;

/// Last externally triggered run, as reported by `/api/cron/check-update`.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerRecord {
    pub executed_at: DateTime<Utc>,
    pub result: RunOutcome,
}

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<UpdateOrchestrator>,
    cron_secret: Option<Arc<str>>,
    last_trigger: Arc<RwLock<Option<TriggerRecord>>>,
}

impl AppState {
    pub fn new(orchestrator: Arc<UpdateOrchestrator>, cron_secret: Option<String>) -> Self {
        if cron_secret.is_none() {
            tracing::warn!(target: "api", "CRON_SECRET not set, admin endpoints will refuse every request");
        }
        Self {
            orchestrator,
            cron_secret: cron_secret.map(Arc::from),
            last_trigger: Arc::new(RwLock::new(None)),
        }
    }

    fn remember(&self, result: &RunOutcome) {
        let rec = TriggerRecord {
            executed_at: Utc::now(),
            result: result.clone(),
        };
        match self.last_trigger.write() {
            Ok(mut g) => *g = Some(rec),
            Err(p) => *p.into_inner() = Some(rec),
        }
    }

    fn last_trigger(&self) -> Option<TriggerRecord> {
        match self.last_trigger.read() {
            Ok(g) => g.clone(),
            Err(p) => p.into_inner().clone(),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/cron/update-news", post(cron_update_news))
        .route("/api/cron/check-update", get(cron_check_update))
        .route("/api/news/clear-and-refresh", post(clear_and_refresh))
        .route("/api/news", get(list_news))
        .route("/api/news/stats", get(news_stats))
        .route("/api/news/export", get(export_news))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    Storage(StorageError),
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": "Unauthorized" }))).into_response()
            }
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Storage(e) => {
                tracing::error!(target: "api", error = %e, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": e.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/* ----------------------------
Auth
---------------------------- */

#[derive(Debug, Default, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// `X-Cron-Auth` header first, `?token=` second. No configured secret → nobody passes.
fn authorize(state: &AppState, headers: &HeaderMap, q: &TokenQuery) -> Result<(), ApiError> {
    let Some(secret) = state.cron_secret.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let presented = headers
        .get(CRON_AUTH_HEADER)
        .and_then(|v| v.to_str().ok())
        .or(q.token.as_deref());
    match presented {
        Some(p) if p == secret => Ok(()),
        _ => {
            tracing::warn!(target: "api", "unauthorized admin request");
            Err(ApiError::Unauthorized)
        }
    }
}

/* ----------------------------
Cron / admin
---------------------------- */

#[derive(Serialize)]
struct TriggerResp {
    success: bool,
    message: &'static str,
    result: RunOutcome,
}

/// 500 only for a failed run; a skip is still 200 but not a success.
fn trigger_response(message: &'static str, result: RunOutcome) -> Response {
    let status = match result {
        RunOutcome::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::OK,
    };
    let body = TriggerResp {
        success: result.is_completed(),
        message,
        result,
    };
    (status, Json(body)).into_response()
}

async fn cron_update_news(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &q)?;
    tracing::info!(target: "api", "cron update triggered");
    let result = state.orchestrator.run().await;
    state.remember(&result);
    Ok(trigger_response("Cron job executado", result))
}

async fn clear_and_refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<TokenQuery>,
) -> Result<Response, ApiError> {
    authorize(&state, &headers, &q)?;
    tracing::warn!(target: "api", "clear-and-refresh triggered");
    let result = state.orchestrator.clear_and_refresh().await;
    state.remember(&result);
    Ok(trigger_response("Notícias limpas e atualizadas", result))
}

#[derive(Serialize)]
struct CheckResp {
    last_run: Option<TriggerRecord>,
    current_time: DateTime<Utc>,
}

async fn cron_check_update(State(state): State<AppState>) -> Json<CheckResp> {
    Json(CheckResp {
        last_run: state.last_trigger(),
        current_time: Utc::now(),
    })
}

/* ----------------------------
Read side
---------------------------- */

#[derive(Debug, Default, Deserialize)]
struct NewsQuery {
    category: Option<String>,
    limit: Option<usize>,
}

async fn list_news(
    State(state): State<AppState>,
    Query(q): Query<NewsQuery>,
) -> Result<Json<Vec<NewsItem>>, ApiError> {
    let limit = q.limit.unwrap_or(DEFAULT_PAGE).min(MAX_PAGE);
    let store = state.orchestrator.store();
    let items = match q.category.as_deref().map(str::trim) {
        None | Some("") | Some("all") => store.query_all(limit).await?,
        Some(c) => {
            let category: Category = c.parse().map_err(ApiError::BadRequest)?;
            store.query_by_category(category, limit).await?
        }
    };
    Ok(Json(items))
}

async fn news_stats(State(state): State<AppState>) -> Result<Json<StoreStats>, ApiError> {
    Ok(Json(state.orchestrator.store().stats().await?))
}

async fn export_news(State(state): State<AppState>) -> Result<Response, ApiError> {
    let body = state
        .orchestrator
        .store()
        .export_json(DEFAULT_EXPORT_LIMIT)
        .await?;
    let disposition = format!(
        "attachment; filename=\"tunnel-news-{}.json\"",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
