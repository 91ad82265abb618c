//! Invocation of the external typesetting toolchain.
//!
//! The toolchain is run as `<program> -pdf -f -latexoption=--interaction=nonstopmode <source>`
//! with the request workspace as its working directory. The argument list is
//! fixed; only the program path is configurable.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::{Error, Result};

pub const DEFAULT_TOOLCHAIN: &str = "latexmk";

/// Arguments passed before the source filename on every run.
pub const TOOLCHAIN_ARGS: [&str; 3] = ["-pdf", "-f", "-latexoption=--interaction=nonstopmode"];

pub const OUTPUT_EXTENSION: &str = "pdf";

/// Exit codes that may accompany a usable document. latexmk exits with 12
/// when some part of the build failed but it still wrote output.
pub const ACCEPTED_EXIT_CODES: [i32; 2] = [0, 12];

/// Result of one toolchain run.
#[derive(Debug, Clone)]
pub struct CompilationOutcome {
    /// `None` when the child was terminated by a signal.
    pub status: Option<i32>,
    /// stdout followed by stderr, decoded as Latin-1.
    pub diagnostics: String,
    pub output: PathBuf,
    pub output_exists: bool,
}

impl CompilationOutcome {
    pub fn is_usable(&self) -> bool {
        let accepted = self
            .status
            .is_some_and(|code| ACCEPTED_EXIT_CODES.contains(&code));
        accepted && self.output_exists
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Runs the toolchain for a request.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(DEFAULT_TOOLCHAIN)
    }
}

impl Compiler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bound the wait for the toolchain. With `None` the wait is unbounded.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Compile `source` (a bare filename inside `dir`).
    ///
    /// The child is awaited asynchronously so a slow run does not hold a
    /// runtime worker. A non-zero exit is reported in the outcome, not as an
    /// error; only a failure to start or wait for the process is an error.
    pub async fn compile(&self, dir: &Path, source: &str) -> Result<CompilationOutcome> {
        if source.starts_with('-') {
            return Err(Error::InvalidSource(source.to_string()));
        }
        let output = output_path(dir, source);

        tracing::info!(
            program = %self.program.display(),
            source,
            workspace = %dir.display(),
            "running toolchain"
        );

        let mut command = Command::new(&self.program);
        command
            .args(TOOLCHAIN_ARGS)
            .arg(source)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let run = command.output();
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| Error::Timeout { limit })?,
            None => run.await,
        };
        let result = result.map_err(|source| Error::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let mut diagnostics = decode_latin1(&result.stdout);
        diagnostics.push_str(&decode_latin1(&result.stderr));

        let output_exists = tokio::fs::try_exists(&output).await.unwrap_or(false);
        let outcome = CompilationOutcome {
            status: result.status.code(),
            diagnostics,
            output,
            output_exists,
        };

        tracing::info!(
            status = ?outcome.status,
            output_exists = outcome.output_exists,
            usable = outcome.is_usable(),
            "toolchain finished"
        );

        Ok(outcome)
    }
}

/// Where the toolchain is expected to write its document for `source`.
pub fn output_path(dir: &Path, source: &str) -> PathBuf {
    dir.join(Path::new(source).with_extension(OUTPUT_EXTENSION))
}

/// Decode bytes one-to-one into `char`s (ISO-8859-1). Never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::OnceLock;
    use tempfile::TempDir;

    const STUB: &str = r#"#!/bin/sh
for arg; do src="$arg"; done
base="${src%.*}"
echo "stub: $*"
if grep -q STUB-SLEEP "$src"; then sleep 10; fi
if grep -q STUB-FAIL "$src"; then
    printf '! Undefined control sequence \351\n' >&2
    exit 1
fi
printf '%%PDF-1.5\n' > "$base.pdf"
if grep -q STUB-PARTIAL "$src"; then exit 12; fi
exit 0
"#;

    // Written once per test binary so no test execs a file another thread
    // still has open for writing.
    fn stub() -> &'static Path {
        static STUB_DIR: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
        let (_, path) = STUB_DIR.get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("latexmk-stub");
            std::fs::write(&path, STUB).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            (dir, path)
        });
        path
    }

    fn source(dir: &Path, body: &str) {
        std::fs::write(dir.join("main.tex"), body).unwrap();
    }

    #[test]
    fn output_path_substitutes_extension() {
        let dir = Path::new("/ws");
        assert_eq!(output_path(dir, "main.tex"), Path::new("/ws/main.pdf"));
        assert_eq!(output_path(dir, "report.v2.tex"), Path::new("/ws/report.v2.pdf"));
        assert_eq!(output_path(dir, "noext"), Path::new("/ws/noext.pdf"));
    }

    #[test]
    fn latin1_decoding_accepts_any_bytes() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = decode_latin1(&bytes);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(decode_latin1(b"caf\xe9"), "café");
        assert_eq!(decode_latin1(b"\xff\xfe"), "\u{ff}\u{fe}");
    }

    #[test]
    fn usable_requires_accepted_code_and_output() {
        let outcome = |status, output_exists| CompilationOutcome {
            status,
            diagnostics: String::new(),
            output: PathBuf::from("main.pdf"),
            output_exists,
        };

        assert!(outcome(Some(0), true).is_usable());
        assert!(outcome(Some(12), true).is_usable());
        assert!(!outcome(Some(0), false).is_usable());
        assert!(!outcome(Some(12), false).is_usable());
        assert!(!outcome(Some(1), true).is_usable());
        assert!(!outcome(None, true).is_usable());
    }

    #[tokio::test]
    async fn successful_run_is_usable() {
        let dir = tempfile::tempdir().unwrap();
        source(dir.path(), "\\documentclass{article}");

        let outcome = Compiler::new(stub()).compile(dir.path(), "main.tex").await.unwrap();

        assert_eq!(outcome.status, Some(0));
        assert!(outcome.is_usable());
        assert_eq!(outcome.output(), dir.path().join("main.pdf"));
        assert!(outcome.diagnostics.contains("-pdf -f -latexoption=--interaction=nonstopmode main.tex"));
    }

    #[tokio::test]
    async fn partial_failure_with_output_is_usable() {
        let dir = tempfile::tempdir().unwrap();
        source(dir.path(), "STUB-PARTIAL");

        let outcome = Compiler::new(stub()).compile(dir.path(), "main.tex").await.unwrap();

        assert_eq!(outcome.status, Some(12));
        assert!(outcome.is_usable());
    }

    #[tokio::test]
    async fn failed_run_keeps_non_utf8_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        source(dir.path(), "STUB-FAIL");

        let outcome = Compiler::new(stub()).compile(dir.path(), "main.tex").await.unwrap();

        assert_eq!(outcome.status, Some(1));
        assert!(!outcome.output_exists);
        assert!(!outcome.is_usable());
        assert!(outcome.diagnostics.contains("Undefined control sequence é"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        source(dir.path(), "x");

        let err = Compiler::new(dir.path().join("no-such-toolchain"))
            .compile(dir.path(), "main.tex")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[tokio::test]
    async fn option_like_source_is_never_passed() {
        let dir = tempfile::tempdir().unwrap();
        let name = "-pdflatex=touch pwned %O %S";
        std::fs::write(dir.path().join(name), "x").unwrap();

        let err = Compiler::new(stub()).compile(dir.path(), name).await.unwrap_err();

        assert!(matches!(err, Error::InvalidSource(ref s) if s == name));
        assert!(!dir.path().join("pwned").exists());
    }

    #[tokio::test]
    async fn timeout_stops_a_stuck_run() {
        let dir = tempfile::tempdir().unwrap();
        source(dir.path(), "STUB-SLEEP");

        let err = Compiler::new(stub())
            .with_timeout(Some(Duration::from_millis(200)))
            .compile(dir.path(), "main.tex")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Timeout { .. }));
    }
}
