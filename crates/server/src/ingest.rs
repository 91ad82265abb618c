//! Draining a multipart upload into a request workspace.
//!
//! Fields are written to disk chunk by chunk as they arrive, so memory use
//! is bounded by the transport's chunk size rather than the upload size.

use crate::error::{ServerError, ServerResult};
use axum::extract::multipart::{Field, Multipart};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use texgate::{sanitize_filename, PartKind, Workspace};
use tokio::io::AsyncWriteExt;

/// Files materialized from one upload.
#[derive(Debug, Default)]
pub struct Ingested {
    /// The `latex` part, if one was sent.
    pub primary: Option<PathBuf>,
    /// `file.*` parts keyed by field name.
    pub auxiliary: BTreeMap<String, PathBuf>,
}

impl Ingested {
    /// Bare filename of the primary source inside the workspace.
    pub fn primary_name(&self) -> Option<&str> {
        self.primary
            .as_deref()
            .and_then(Path::file_name)
            .and_then(|name| name.to_str())
    }
}

/// Write every `latex` and `file.*` part of `multipart` into `workspace`.
///
/// Other parts are skipped. A kept part whose declared filename has no
/// usable basename is rejected as a bad request.
pub async fn ingest(multipart: &mut Multipart, workspace: &Workspace) -> ServerResult<Ingested> {
    let mut ingested = Ingested::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        let kind = PartKind::classify(&name);
        if !kind.is_kept() {
            tracing::debug!(part = %name, "ignoring part");
            continue;
        }

        let declared = field.file_name().unwrap_or_default().to_owned();
        let filename = sanitize_filename(&declared).ok_or_else(|| {
            ServerError::BadRequest(format!("Part {name} has no usable filename."))
        })?;
        let path = workspace.join(filename);

        let written = save_field(&mut field, &path).await?;
        tracing::debug!(
            part = %name,
            file = %filename,
            bytes = written,
            "part saved"
        );

        match kind {
            PartKind::PrimarySource => ingested.primary = Some(path),
            PartKind::AuxiliaryResource(name) => {
                ingested.auxiliary.insert(name, path);
            }
            PartKind::Ignored => {}
        }
    }

    Ok(ingested)
}

async fn save_field(field: &mut Field<'_>, path: &Path) -> ServerResult<u64> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    while let Some(chunk) = field.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }

    file.flush().await?;
    Ok(written)
}
