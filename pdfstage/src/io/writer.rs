//! Writing of the reconstructed document.
//!
//! Output is written atomically by default: the bytes go to a temporary
//! file next to the target, which is then renamed over it.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task;

use crate::error::{Result, StageError};
use crate::utils::format_file_size;

/// Options for writing output files.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Use atomic writes (write to temp file, then rename).
    pub atomic: bool,

    /// Buffer size for writing (in bytes).
    pub buffer_size: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            atomic: true,
            buffer_size: 8192,
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to write the file.
    pub write_time: Duration,

    /// Size of the written file in bytes.
    pub file_size: u64,

    /// Path where the file was written.
    pub output_path: PathBuf,
}

impl WriteStatistics {
    /// Format file size as human-readable string.
    pub fn format_file_size(&self) -> String {
        format_file_size(self.file_size)
    }
}

/// Writes output documents to disk.
#[derive(Debug, Clone, Default)]
pub struct OutputWriter {
    options: WriteOptions,
}

impl OutputWriter {
    /// Create a writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Write `content` to `path` and report what was written.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::FailedToWrite`] if the file cannot be created,
    /// written, or moved into place.
    pub async fn write(&self, content: &[u8], path: &Path) -> Result<WriteStatistics> {
        let path_buf = path.to_path_buf();
        let options = self.options.clone();
        let content = content.to_vec();

        task::spawn_blocking(move || {
            let start = Instant::now();

            let write_path = if options.atomic {
                temp_path(&path_buf)
            } else {
                path_buf.clone()
            };

            let failed = |path: &Path| {
                let path = path.to_path_buf();
                move |source| StageError::FailedToWrite { path, source }
            };

            let file = std::fs::File::create(&write_path).map_err(failed(&write_path))?;
            fill_or_remove(file, &write_path, &content, options.buffer_size)
                .map_err(failed(&write_path))?;

            if options.atomic
                && let Err(e) = std::fs::rename(&write_path, &path_buf)
            {
                let _ = std::fs::remove_file(&write_path);
                return Err(failed(&path_buf)(e));
            }

            Ok(WriteStatistics {
                write_time: start.elapsed(),
                file_size: content.len() as u64,
                output_path: path_buf,
            })
        })
        .await
        .map_err(|e| StageError::other(format!("Write task failed: {e}")))?
    }

    /// Check if a file can be written to the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Parent directory doesn't exist
    /// - Parent directory is not writable
    pub async fn can_write(&self, path: &Path) -> Result<()> {
        let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return Ok(());
        };

        let metadata = tokio::fs::metadata(parent).await.map_err(|_| {
            StageError::invalid_config(format!(
                "Output directory does not exist: {}",
                parent.display()
            ))
        })?;

        if metadata.permissions().readonly() {
            return Err(StageError::invalid_config(format!(
                "Output directory is not writable: {}",
                parent.display()
            )));
        }

        Ok(())
    }

    /// Check if output file exists.
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }
}

/// Write `content` through `sink`, the open file at `path`.
///
/// A partially written file is removed before the error is returned.
fn fill_or_remove(
    sink: impl Write,
    path: &Path,
    content: &[u8],
    buffer_size: usize,
) -> std::io::Result<()> {
    let mut writer = std::io::BufWriter::with_capacity(buffer_size, sink);
    let result = writer.write_all(content).and_then(|()| writer.flush());
    drop(writer);

    if result.is_err() {
        let _ = std::fs::remove_file(path);
    }
    result
}

/// Temporary sibling of `path` used for atomic writes.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
