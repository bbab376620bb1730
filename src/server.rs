use crate::error::ScraperError;
use crate::pipeline::Pipeline;
use crate::telemetry;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info};

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "doujin-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        telemetry::render(),
    )
}

/// On-demand trigger: 200 with the run summary, 500 with the failure cause.
async fn scrape(Extension(pipeline): Extension<Arc<Pipeline>>) -> Response {
    match pipeline.try_run().await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(ScraperError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "success": false,
                "message": "scrape already in progress",
            })),
        )
            .into_response(),
        Err(e) => {
            error!("Manual scrape failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "message": "scrape failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, Authorization"),
            (header::ACCESS_CONTROL_MAX_AGE, "3600"),
        ],
    )
}

/// Create the HTTP server with all routes. `images_dir`, when set, is served under
/// `/images` so a local object store's public URLs resolve.
pub fn create_server(pipeline: Arc<Pipeline>, images_dir: Option<PathBuf>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/scrape", get(scrape).post(scrape).options(preflight));
    if let Some(dir) = images_dir {
        router = router.nest_service("/images", ServeDir::new(dir));
    }
    router
        .layer(Extension(pipeline))
        .layer(ServiceBuilder::new().layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        )))
}

/// Start the HTTP server on the specified port
pub async fn start_server(
    pipeline: Arc<Pipeline>,
    images_dir: Option<PathBuf>,
    port: u16,
) -> anyhow::Result<()> {
    let app = create_server(pipeline, images_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{port}");
    info!("Manual trigger: http://localhost:{port}/scrape");

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}
