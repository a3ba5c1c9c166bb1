//! HTTP API
//!
//! A thin axum layer over [`crawl_domains`]: one POST endpoint accepting
//! a domain list and returning the discovered product URLs per domain,
//! plus a health probe.

use crate::config::Config;
use crate::crawler::crawl_domains;
use crate::fetch::FetcherFactory;
use crate::patterns::PatternSource;
use crate::CrawlError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub patterns: Arc<dyn PatternSource>,
    pub factory: Arc<dyn FetcherFactory>,
}

#[derive(Debug, Deserialize)]
pub struct CrawlRequest {
    pub domains: Vec<String>,
}

/// API failure carried back to the client as `{"error": "..."}`
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<CrawlError> for ApiError {
    fn from(e: CrawlError) -> Self {
        match e {
            CrawlError::EmptyDomainList => Self::bad_request(e.to_string()),
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/crawl", post(crawl_handler))
        .route("/health", get(health))
        .with_state(state)
}

/// Binds the listener and serves the API until the process exits
pub async fn serve(state: AppState, port: u16) -> crate::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

async fn crawl_handler(
    State(state): State<AppState>,
    Json(request): Json<CrawlRequest>,
) -> Result<Json<HashMap<String, Vec<String>>>, ApiError> {
    if request.domains.is_empty() {
        return Err(ApiError::bad_request("domain list must not be empty"));
    }

    tracing::info!("Crawl request for {} domain(s)", request.domains.len());
    let patterns = state.patterns.patterns_for(&request.domains).await;
    let results = crawl_domains(
        Arc::clone(&state.config),
        Arc::clone(&state.factory),
        &patterns,
        &request.domains,
    )
    .await?;

    Ok(Json(results))
}

async fn health() -> &'static str {
    "ok"
}
