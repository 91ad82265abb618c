//! Chunked file responses that own the request workspace.

use crate::error::{ServerError, ServerResult};
use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;
use futures::StreamExt;
use std::path::Path;
use texgate::Workspace;
use tokio_util::io::ReaderStream;

/// Read size per body frame.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub const PDF: &str = "application/pdf";
pub const ZIP: &str = "application/zip";

/// Stream `path` back as an attachment.
///
/// The file is opened before any header is produced, so a missing file is an
/// ordinary 500. The returned body takes ownership of `workspace`: the
/// directory is removed once the body has been fully sent or is dropped
/// because the client went away.
pub async fn stream_file(
    workspace: Workspace,
    path: &Path,
    content_type: &'static str,
) -> ServerResult<Response> {
    let file = tokio::fs::File::open(path).await.map_err(|err| {
        ServerError::Internal(format!("cannot open {}: {err}", path.display()))
    })?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("download");
    let disposition = HeaderValue::from_str(&attachment(filename))
        .map_err(|err| ServerError::Internal(format!("invalid download name: {err}")))?;

    tracing::info!(file = %filename, content_type, "streaming response");

    let name = filename.to_owned();
    let chunks = ReaderStream::with_capacity(file, CHUNK_SIZE).map(move |chunk| {
        // Holding the workspace here ties its lifetime to the body.
        let _workspace = &workspace;
        if let Err(err) = &chunk {
            tracing::error!(file = %name, error = %err, "read failed mid-stream");
        }
        chunk
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(chunks))
        .map_err(|err| ServerError::Internal(err.to_string()))
}

fn attachment(filename: &str) -> String {
    let escaped = filename.replace('\\', "\\\\").replace('"', "\\\"");
    format!("attachment; filename=\"{escaped}\"")
}
