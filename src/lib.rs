//! Core of the texgate document compilation gateway.
//!
//! A request is handled in four steps, each owned by one module:
//!
//! 1. [`workspace`]: acquire an exclusively owned scratch directory.
//! 2. [`part`]: decide which uploaded parts to keep and under what filename.
//! 3. [`compiler`]: run `latexmk` in the workspace and classify the result.
//! 4. [`archive`]: optionally bundle the whole workspace into a zip.
//!
//! The HTTP surface (multipart ingestion, streaming responses, routing) lives
//! in the `texgate-server` crate.

pub mod archive;
pub mod compiler;
pub mod error;
pub mod part;
pub mod workspace;

pub use archive::{ARCHIVE_NAME, build_archive, write_archive};
pub use compiler::{
    ACCEPTED_EXIT_CODES, CompilationOutcome, Compiler, DEFAULT_TOOLCHAIN, OUTPUT_EXTENSION,
    TOOLCHAIN_ARGS, decode_latin1, output_path,
};
pub use error::{Error, Result};
pub use part::{AUXILIARY_PREFIX, PRIMARY_SOURCE_PART, PartKind, sanitize_filename};
pub use workspace::{Workspace, WorkspaceRoot};
