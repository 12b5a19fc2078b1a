//! Atomic write operations for JSONL files.
//!
//! On POSIX systems a rename within one filesystem is atomic. These helpers
//! exploit that to provide crash-safe whole-file writes:
//!
//! 1. Data is written to a temporary file with a `.tmp` extension.
//! 2. The temporary file is flushed.
//! 3. The temporary file is renamed over the target path.
//!
//! If anything fails before the rename, the original file is untouched and
//! the temporary file is removed on a best-effort basis.

use crate::error::Result;
use crate::writer::JsonlWriter;
use serde::Serialize;
use std::path::Path;
use tokio::fs::File;

/// Atomically writes a slice of values to a JSONL file.
///
/// The target file is never left in a partially-written state: either the
/// rename lands and the file holds exactly `values`, or the original content
/// survives.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, any value fails
/// to serialize, an IO error occurs while writing, or the rename fails.
pub async fn write_jsonl_atomic<T, P>(path: P, values: &[T]) -> Result<()>
where
    T: Serialize,
    P: AsRef<Path>,
{
    write_jsonl_atomic_iter(path, values.iter()).await
}

/// Atomically writes an iterator of values to a JSONL file.
///
/// Like [`write_jsonl_atomic`] but without requiring the values to be
/// collected into a slice first.
///
/// # Errors
///
/// See [`write_jsonl_atomic`].
pub async fn write_jsonl_atomic_iter<T, I, P>(path: P, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let temp_path = make_temp_path(path);

    if let Err(e) = write_to_temp_file(&temp_path, values).await {
        // Best-effort cleanup; the original file is still intact.
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Appends `.tmp` to the path's extension (or uses `tmp` when there is none).
fn make_temp_path(path: &Path) -> std::path::PathBuf {
    let mut temp_path = path.to_path_buf();
    let new_extension = match path.extension() {
        Some(ext) => {
            let mut new_ext = ext.to_os_string();
            new_ext.push(".tmp");
            new_ext
        }
        None => std::ffi::OsString::from("tmp"),
    };
    temp_path.set_extension(new_extension);
    temp_path
}

async fn write_to_temp_file<T, I>(temp_path: &Path, values: I) -> Result<()>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let file = File::create(temp_path).await?;
    let mut writer = JsonlWriter::new(file);
    writer.write_all(values).await?;
    writer.flush().await?;
    Ok(())
}
