use serde::{Deserialize, Serialize};

use crate::table::Row;

/// Query string of the progress endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct ProgressQuery {
    /// Generation the client already rendered.
    pub since: Option<u64>,
}

/// Selected micrograph row, columns in table order.
#[derive(Debug, Serialize)]
pub struct MicrographResponse {
    pub index: usize,
    pub row: Row,
}

/// Error response format.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub micrographs: usize,
}
