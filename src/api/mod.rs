mod error;
mod handlers;
mod types;

pub use error::ApiError;
pub use types::{ErrorResponse, HealthResponse, MicrographResponse, ProgressQuery};

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use log::info;
use tower_http::trace::TraceLayer;

use crate::core::MvfError;
use crate::service::DashboardService;

pub struct DashboardApi {
    service: Arc<DashboardService>,
}

impl DashboardApi {
    pub fn new(service: Arc<DashboardService>) -> Self {
        Self { service }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/v1/progress", get(handlers::progress))
            .route("/api/v1/micrographs/{index}", get(handlers::micrograph))
            .route("/previews/{file}", get(handlers::preview))
            .with_state(self.service.clone())
            .layer(TraceLayer::new_for_http())
    }

    pub async fn serve(self, addr: &str) -> Result<(), MvfError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| MvfError::IoError(format!("binding to {addr}: {e}")))?;
        info!("dashboard listening on http://{addr}");
        axum::serve(listener, self.router())
            .await
            .map_err(|e| MvfError::IoError(format!("serving: {e}")))?;
        Ok(())
    }
}
