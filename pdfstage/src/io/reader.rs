//! Loading of source files.
//!
//! Files are read as raw bytes; nothing is parsed here. Several files can
//! be read concurrently, and results always come back in input order.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstage::io::reader::SourceLoader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let loader = SourceLoader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = loader.load_all(&paths, 4).await;
//! println!("Loaded {} of {} files", stats.success_count, results.len());
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Result, StageError};
use crate::utils::format_file_size;

/// A source file read into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the file was read from.
    pub path: PathBuf,

    /// File name used as the display name.
    pub name: String,

    /// File content.
    pub bytes: Bytes,

    /// File size in bytes.
    pub size: u64,

    /// Time taken to read the file.
    pub load_time: Duration,
}

/// Result of loading one file.
pub type LoadResult = Result<SourceFile>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadStatistics {
    /// Number of files successfully read.
    pub success_count: usize,

    /// Number of files that failed to read.
    pub failure_count: usize,

    /// Total time taken for all reads.
    pub total_time: Duration,

    /// Total size of successfully read files.
    pub total_size: u64,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut stats = Self {
            total_time,
            ..Self::default()
        };

        for result in results {
            match result {
                Ok(file) => {
                    stats.success_count += 1;
                    stats.total_size += file.size;
                }
                Err(_) => stats.failure_count += 1,
            }
        }

        stats
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Reads source files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceLoader;

impl SourceLoader {
    /// Create a new loader.
    pub fn new() -> Self {
        Self
    }

    /// Read a single file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The path does not exist
    /// - The path is not a regular file
    /// - The file cannot be read
    pub async fn load(&self, path: &Path) -> Result<SourceFile> {
        let start = Instant::now();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| StageError::file_not_found(path.to_path_buf()))?;
        if !metadata.is_file() {
            return Err(StageError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let content = tokio::fs::read(path)
            .await
            .map_err(|e| StageError::FailedToRead {
                path: path.to_path_buf(),
                source: e,
            })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let size = content.len() as u64;

        debug!(path = %path.display(), size, "read source file");

        Ok(SourceFile {
            path: path.to_path_buf(),
            name,
            bytes: Bytes::from(content),
            size,
            load_time: start.elapsed(),
        })
    }

    /// Read several files with at most `workers` reads in flight.
    ///
    /// Returns one result per path, in the same order as `paths`, plus
    /// aggregate statistics.
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();
        let loader = *self;

        let results: Vec<LoadResult> = stream::iter(paths)
            .map(|path| async move { loader.load(path).await })
            .buffered(workers.max(1))
            .collect()
            .await;

        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }
}
