use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the compilation core.
///
/// A toolchain that runs and exits non-zero is not an error at this level; it
/// is reported through [`crate::CompilationOutcome`]. Only failures to do the
/// work at all end up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to create workspace under {}: {source}", .root.display())]
    Workspace {
        root: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to run toolchain `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("source name `{0}` would be read as a toolchain option")]
    InvalidSource(String),

    #[error("toolchain did not finish within {limit:?}")]
    Timeout { limit: Duration },

    #[error("failed to build archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
