//! Bundling a workspace into a single zip file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::Result;

/// Reserved name of the archive inside the workspace. Never archived itself.
pub const ARCHIVE_NAME: &str = "archive.zip";

/// Build `dir/archive.zip` on the blocking pool and return its path.
pub async fn build_archive(dir: &Path) -> Result<PathBuf> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || write_archive(&dir)).await?
}

/// Zip every regular file in `dir`, by bare filename, into `dir/archive.zip`.
///
/// The file listing is taken before the archive is created and skips
/// [`ARCHIVE_NAME`], so the archive never contains itself. Subdirectories
/// are not descended into.
pub fn write_archive(dir: &Path) -> Result<PathBuf> {
    let entries = snapshot(dir)?;
    let target = dir.join(ARCHIVE_NAME);

    let mut zip = ZipWriter::new(BufWriter::new(File::create(&target)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    for (name, path) in &entries {
        zip.start_file(name.as_str(), options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?.flush()?;

    tracing::debug!(
        archive = %target.display(),
        entries = entries.len(),
        "workspace archived"
    );

    Ok(target)
}

fn snapshot(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                tracing::warn!(name = ?raw, "skipping non UTF-8 filename");
                continue;
            }
        };
        if name == ARCHIVE_NAME {
            continue;
        }

        entries.push((name, entry.path()));
    }

    entries.sort();
    Ok(entries)
}
