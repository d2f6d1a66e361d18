pub mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::pipeline::Detector;
use crate::scanner::FindingsBuffer;

#[derive(Clone)]
pub struct AppState {
    pub detectors: Vec<Arc<Detector>>,
    pub findings: FindingsBuffer,
}

pub fn router(detectors: Vec<Arc<Detector>>, findings: FindingsBuffer) -> Router {
    let state = Arc::new(AppState {
        detectors,
        findings,
    });

    Router::new()
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/stats", get(handlers::stats))
        .route("/api/v1/findings", get(handlers::recent_findings))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn serve(
    detectors: Vec<Arc<Detector>>,
    findings: FindingsBuffer,
    host: &str,
    port: u16,
) -> eyre::Result<()> {
    let app = router(detectors, findings);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
