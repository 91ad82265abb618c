use crate::error::{ServerError, ServerResult};
use crate::ingest::ingest;
use crate::state::ServerState;
use crate::stream::{stream_file, PDF, ZIP};
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::Response;
use std::sync::Arc;
use texgate::build_archive;

const MULTIPART_FORM: &str = "multipart/form-data";

/// Query parameters for `POST /`
#[derive(Debug, Default)]
pub struct CompileParams {
    /// `zip=1` returns the whole workspace as a zip instead of the PDF
    pub zip: Option<String>,
}

impl CompileParams {
    /// Pick the parameters out of raw query pairs. A repeated key keeps its
    /// first value; unknown keys are ignored.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let zip = pairs
            .into_iter()
            .find_map(|(key, value)| (key == "zip").then_some(value));
        Self { zip }
    }

    pub fn wants_archive(&self) -> bool {
        self.zip.as_deref() == Some("1")
    }
}

/// Compile an uploaded LaTeX document.
///
/// Expects `multipart/form-data` with one `latex` part and any number of
/// `file.*` parts. Responds with the PDF, or with a zip of the workspace when
/// `zip=1` is given. The archive is returned whether or not the toolchain
/// succeeded or ran out of time, since its logs are what a caller needs to
/// debug a failure.
///
/// # Responses
/// - `200 application/pdf`: compiled document
/// - `200 application/zip`: `archive.zip` of inputs, outputs and logs
/// - `400 text/plain`: not a multipart request, or no `latex` part
/// - `500 text/plain`: toolchain failed; body holds its diagnostics
pub async fn compile_document(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ServerResult<Response> {
    let params = CompileParams::from_pairs(query);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !is_multipart_form(content_type) {
        tracing::info!(
            content_type,
            "Bad request. Received content type instead of multipart/form-data"
        );
        return Err(ServerError::BadRequest("Multipart request required.".into()));
    }
    let mut multipart = multipart?;

    // Dropped on every early return below; otherwise moved into the body.
    let workspace = state.workspaces.acquire()?;

    let ingested = ingest(&mut multipart, &workspace).await?;
    let Some(source) = ingested.primary_name().map(str::to_owned) else {
        tracing::info!(
            auxiliary = ingested.auxiliary.len(),
            "Bad request. No latex file provided"
        );
        return Err(ServerError::MissingSource);
    };

    let outcome = match state.compiler.compile(workspace.path(), &source).await {
        Ok(outcome) => outcome,
        // Whatever the run left behind is still worth bundling.
        Err(texgate::Error::Timeout { limit }) if params.wants_archive() => {
            tracing::warn!(
                source = %source,
                limit_secs = limit.as_secs_f64(),
                "Toolchain timed out; archiving workspace as is"
            );
            let archive = build_archive(workspace.path()).await?;
            return stream_file(workspace, &archive, ZIP).await;
        }
        Err(err) => return Err(err.into()),
    };

    if params.wants_archive() {
        let archive = build_archive(workspace.path()).await?;
        return stream_file(workspace, &archive, ZIP).await;
    }

    if outcome.is_usable() {
        let output = outcome.output().to_path_buf();
        return stream_file(workspace, &output, PDF).await;
    }

    tracing::error!(
        source = %source,
        status = ?outcome.status,
        diagnostics = %outcome.diagnostics,
        "Document creation failed"
    );
    Err(ServerError::Compilation {
        diagnostics: outcome.diagnostics,
    })
}

fn is_multipart_form(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(MULTIPART_FORM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_multipart_form() {
        assert!(is_multipart_form("multipart/form-data; boundary=xyz"));
        assert!(is_multipart_form("Multipart/Form-Data;boundary=xyz"));
        assert!(is_multipart_form("multipart/form-data"));
        assert!(!is_multipart_form("multipart/mixed; boundary=xyz"));
        assert!(!is_multipart_form("application/json"));
        assert!(!is_multipart_form(""));
    }

    #[test]
    fn only_zip_1_requests_archive() {
        let params = |zip: Option<&str>| CompileParams {
            zip: zip.map(str::to_owned),
        };
        assert!(params(Some("1")).wants_archive());
        assert!(!params(Some("0")).wants_archive());
        assert!(!params(Some("true")).wants_archive());
        assert!(!params(None).wants_archive());
    }

    #[test]
    fn first_zip_value_wins() {
        let pairs = |raw: &[(&str, &str)]| {
            raw.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>()
        };

        assert!(CompileParams::from_pairs(pairs(&[("zip", "1"), ("zip", "1")])).wants_archive());
        assert!(CompileParams::from_pairs(pairs(&[("zip", "1"), ("zip", "0")])).wants_archive());
        assert!(!CompileParams::from_pairs(pairs(&[("zip", "0"), ("zip", "1")])).wants_archive());
        assert!(CompileParams::from_pairs(pairs(&[("debug", "x"), ("zip", "1")])).wants_archive());
        assert!(CompileParams::from_pairs(Vec::new()).zip.is_none());
    }
}
