//! HTTP surface.
//!
//! `GET /` computes a fresh summary and returns the dashboard page.
//! `GET /api/summary` returns the same summary as JSON and `GET /health`
//! answers without touching the store.

use crate::analysis::Aggregator;
use crate::models::DashboardSummary;
use crate::report::DashboardRenderer;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared, read-only request state.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<Aggregator>,
    renderer: Arc<DashboardRenderer>,
    title: Arc<str>,
}

impl AppState {
    pub fn new(aggregator: Aggregator, renderer: DashboardRenderer, title: &str) -> Self {
        Self {
            aggregator: Arc::new(aggregator),
            renderer: Arc::new(renderer),
            title: Arc::from(title),
        }
    }
}

/// Dashboard HTTP server.
pub struct DashboardServer {
    addr: String,
    state: AppState,
}

impl DashboardServer {
    pub fn new(host: &str, port: u16, state: AppState) -> Self {
        Self {
            addr: format!("{}:{}", host, port),
            state,
        }
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<()> {
        let listener = TcpListener::bind(&self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;

        info!("Dashboard listening on http://{}", self.addr);
        serve(listener, self.state).await
    }
}

/// Serve the dashboard on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    axum::serve(listener, router(state))
        .await
        .context("HTTP server failed")
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/summary", get(summary))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any failure while handling a request. Logged, then reported as a bare 500.
struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

// Route handlers

async fn dashboard(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let summary = state.aggregator.summarize().await?;
    let html = state.renderer.render_html(&summary, &state.title)?;
    Ok(Html(html))
}

async fn summary(State(state): State<AppState>) -> Result<Json<DashboardSummary>, AppError> {
    Ok(Json(state.aggregator.summarize().await?))
}

async fn health() -> &'static str {
    "ok"
}
