//! texgate server - HTTP gateway around `latexmk`
//!
//! Accepts a LaTeX source plus auxiliary files as `multipart/form-data`,
//! compiles them in an isolated per-request workspace and streams back the
//! PDF, or a zip of the whole workspace.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `POST /` - compile; parts `latex` (required) and `file.*` (optional);
//!   `?zip=1` returns `archive.zip` of the workspace instead of the PDF
//! - `GET /healthcheck` - liveness check, always `OK`
//!
//! # Configuration
//!
//! Read from an optional `server.{toml,yaml,json}` and `TEXGATE_SERVER__*`
//! environment variables, e.g. `TEXGATE_SERVER__PORT=8080` or
//! `TEXGATE_SERVER__COMPILE_TIMEOUT_SECS=120`.

pub mod config;
pub mod error;
pub mod ingest;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod stream;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, start_server};
pub use state::ServerState;
