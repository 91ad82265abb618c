//! Per-request scratch directories.
//!
//! Every request gets its own directory under a [`WorkspaceRoot`], named with
//! a random suffix so concurrent requests never share files. The directory is
//! removed when the [`Workspace`] is released or dropped, whichever comes
//! first, so early returns, panics and aborted response bodies all clean up.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::{Error, Result};

const WORKSPACE_PREFIX: &str = "texgate-";

/// Parent directory that request workspaces are created in.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceRoot {
    dir: Option<PathBuf>,
}

impl WorkspaceRoot {
    /// Use the operating system's temporary directory.
    pub fn system() -> Self {
        Self { dir: None }
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn acquire(&self) -> Result<Workspace> {
        Workspace::acquire(self)
    }
}

/// An exclusively owned request directory.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh, empty directory under `root`.
    pub fn acquire(root: &WorkspaceRoot) -> Result<Self> {
        let root = root.path();
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&root)
            .map_err(|source| Error::Workspace { root, source })?;
        let path = dir.path().to_path_buf();

        tracing::debug!(workspace = %path.display(), "workspace acquired");

        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of `name` inside the workspace. `name` must already be a bare
    /// filename; see [`crate::sanitize_filename`].
    pub fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    pub fn is_released(&self) -> bool {
        self.dir.is_none()
    }

    /// Recursively delete the directory now. Safe to call more than once.
    ///
    /// Failures are logged and swallowed so they never replace an error the
    /// request is already returning.
    pub fn release(&mut self) {
        if let Some(dir) = self.dir.take() {
            close(dir, &self.path);
        }
    }
}

impl Drop for Workspace {
    /// Inside a tokio runtime the deletion runs on the blocking pool so a
    /// large workspace never stalls a worker. If the runtime is already gone
    /// the `TempDir` still removes itself when the task is dropped.
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let path = std::mem::take(&mut self.path);
                handle.spawn_blocking(move || close(dir, &path));
            }
            Err(_) => close(dir, &self.path),
        }
    }
}

fn close(dir: TempDir, path: &Path) {
    match dir.close() {
        Ok(()) => tracing::debug!(workspace = %path.display(), "workspace released"),
        Err(err) => tracing::warn!(
            workspace = %path.display(),
            error = %err,
            "failed to remove workspace"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn acquire_creates_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        let ws = WorkspaceRoot::at(root.path()).acquire().unwrap();

        assert!(ws.path().is_dir());
        assert!(ws.path().starts_with(root.path()));
        assert_eq!(entries(ws.path()), 0);
        assert!(
            ws.path()
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(WORKSPACE_PREFIX))
        );
    }

    #[test]
    fn workspaces_never_collide() {
        let root = tempfile::tempdir().unwrap();
        let root = WorkspaceRoot::at(root.path());

        let all: Vec<_> = (0..32).map(|_| root.acquire().unwrap()).collect();
        let mut paths: Vec<_> = all.iter().map(|ws| ws.path().to_path_buf()).collect();
        paths.sort();
        paths.dedup();

        assert_eq!(paths.len(), 32);
    }

    #[test]
    fn release_removes_contents_and_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut ws = WorkspaceRoot::at(root.path()).acquire().unwrap();
        std::fs::write(ws.join("main.tex"), b"\\relax").unwrap();
        std::fs::create_dir(ws.join("nested")).unwrap();
        std::fs::write(ws.path().join("nested").join("x.aux"), b"").unwrap();

        let path = ws.path().to_path_buf();
        ws.release();
        assert!(ws.is_released());
        assert!(!path.exists());

        ws.release();
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn drop_releases() {
        let root = tempfile::tempdir().unwrap();
        {
            let ws = WorkspaceRoot::at(root.path()).acquire().unwrap();
            std::fs::write(ws.join("a.txt"), b"a").unwrap();
        }
        assert_eq!(entries(root.path()), 0);
    }

    #[test]
    fn panic_while_held_still_releases() {
        let root = tempfile::tempdir().unwrap();
        let root_path = root.path().to_path_buf();

        let result = std::panic::catch_unwind(move || {
            let ws = WorkspaceRoot::at(&root_path).acquire().unwrap();
            std::fs::write(ws.join("a.txt"), b"a").unwrap();
            panic!("handler blew up");
        });

        assert!(result.is_err());
        assert_eq!(entries(root.path()), 0);
    }

    #[tokio::test]
    async fn drop_inside_runtime_releases_off_worker() {
        let root = tempfile::tempdir().unwrap();
        let ws = WorkspaceRoot::at(root.path()).acquire().unwrap();
        std::fs::write(ws.join("main.pdf"), vec![0u8; 1 << 20]).unwrap();

        drop(ws);

        for _ in 0..200 {
            if entries(root.path()) == 0 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("workspace still present after drop");
    }

    #[test]
    fn missing_root_is_a_workspace_error() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");

        let err = WorkspaceRoot::at(&missing).acquire().unwrap_err();
        assert!(matches!(err, Error::Workspace { root, .. } if root == missing));
    }
}
