// Web UI
// A static dashboard plus the JSON endpoints it calls

#[cfg(test)]
mod tests;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::recommend::{Recommendation, RecommendationService};
use crate::{RecsError, Result};

const DASHBOARD: &str = include_str!("dashboard.html");

#[derive(Clone)]
struct AppState {
    service: Arc<dyn RecommendationService>,
}

#[derive(Debug, Deserialize)]
struct TitleQuery {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct InfoResponse {
    pub max_user_id: u32,
}

/// A library error rendered as a JSON HTTP response
struct ApiError(RecsError);

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            RecsError::NotFound(_) => StatusCode::NOT_FOUND,
            RecsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.0.to_string();
        if status.is_server_error() {
            warn!("Request failed: {}", message);
        }

        (
            status,
            Json(serde_json::json!({
                "error": message,
                "status": status.as_u16(),
            })),
        )
            .into_response()
    }
}

async fn dashboard() -> Html<&'static str> {
    Html(DASHBOARD)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn info_handler(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        max_user_id: state.service.max_user_id(),
    })
}

async fn collaborative(
    State(state): State<AppState>,
    Path(user_id): Path<u32>,
) -> std::result::Result<Json<RecommendationsResponse>, ApiError> {
    debug!("Collaborative recommendations for user {}", user_id);
    let recommendations = state
        .service
        .recommend_for_user(user_id)
        .await
        .map_err(ApiError)?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

async fn content(
    State(state): State<AppState>,
    Query(query): Query<TitleQuery>,
) -> std::result::Result<Json<RecommendationsResponse>, ApiError> {
    debug!("Content recommendations for '{}'", query.title);
    let recommendations = state
        .service
        .recommend_similar(&query.title)
        .await
        .map_err(ApiError)?;
    Ok(Json(RecommendationsResponse { recommendations }))
}

/// All routes of the web UI
#[inline]
pub fn router(service: Arc<dyn RecommendationService>) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health))
        .route("/api/info", get(info_handler))
        .route("/api/recommend/collab/:user_id", get(collaborative))
        .route("/api/recommend/content", get(content))
        .with_state(AppState { service })
}

/// Serve the web UI until interrupted
#[inline]
pub async fn serve(config: &ServerConfig, service: Arc<dyn RecommendationService>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;
    let address = listener.local_addr()?;
    info!("Web UI listening on http://{}", address);
    eprintln!("Serving recommendations on http://{}", address);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Web UI stopped");
    Ok(())
}
