//! API route handlers
//!
//! - `compile`: `POST /`, the document compilation endpoint
//! - `health`: `GET /healthcheck`, liveness check

pub mod compile;
pub mod health;

use crate::error::ServerError;

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
