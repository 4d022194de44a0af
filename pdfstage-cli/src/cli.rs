//! CLI argument parsing for pdfstage.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! println!("Staging {} files", cli.inputs.len());
//! ```

use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use pdfstage::config::{
    Arrangement, Backend, Config, IntakeLimits, OverwriteMode, PositionMove,
};
use pdfstage::error::{Result, StageError};
use pdfstage::service::ServiceConfig;
use pdfstage::service::http::{DEFAULT_API_PREFIX, DEFAULT_BASE_URL};
use pdfstage::staging::StagingMode;
use pdfstage::utils::collect_paths_for_patterns;

/// Stage, reorder, and reconstruct PDF pages.
///
/// pdfstage stages PDF files, lets you rearrange their pages across
/// documents, and rebuilds a single PDF in exactly that order using a
/// document-processing service.
#[derive(Parser, Debug)]
#[command(name = "pdfstage")]
#[command(version)]
#[command(about = "Stage, reorder, and reconstruct PDF pages", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input files to stage (in order)
    ///
    /// Glob patterns are expanded; matches of one pattern are sorted.
    ///
    /// Examples:
    ///   pdfstage a.pdf b.pdf -o combined.pdf
    ///   pdfstage --mode organize scans/*.pdf --order "2:1;1:1-3"
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE", default_value = "output.pdf")]
    pub output: PathBuf,

    /// Staging mode
    ///
    /// - merge: whole documents, concatenated in order (default)
    /// - organize: documents are expanded into pages that can be
    ///   reordered, interleaved, and excluded
    /// - single: exactly one document
    #[arg(short, long, value_name = "MODE", default_value = "merge")]
    #[arg(value_parser = ["merge", "organize", "organise", "single"])]
    pub mode: String,

    /// Explicit page order (organize mode)
    ///
    /// Semicolon-separated INPUT:PAGES groups. INPUT is the 1-based
    /// position of the file on the command line; PAGES is a
    /// comma-separated list of pages or ranges. Descending ranges are
    /// allowed. Pages not listed are excluded.
    ///
    /// Example:
    ///   --order "2:1;1:3-1;2:2"
    #[arg(long, value_name = "ORDER")]
    pub order: Option<String>,

    /// Move the item at position FROM to position TO (1-based)
    ///
    /// Applied after --order, in the order given.
    #[arg(long = "move", value_name = "FROM:TO")]
    pub moves: Vec<String>,

    /// Exclude the pages at these display positions (organize mode)
    ///
    /// Positions are 1-based and refer to the sequence after --order
    /// and --move have been applied.
    #[arg(long, value_name = "POS", value_delimiter = ',')]
    pub exclude: Vec<usize>,

    /// Reconstruct in-process instead of calling the service
    #[arg(long)]
    pub local: bool,

    /// Base URL of the document-processing service
    #[arg(
        long,
        value_name = "URL",
        env = "PDFSTAGE_SERVICE_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub service_url: String,

    /// Route prefix of the service's PDF endpoints
    ///
    /// Older deployments use /api/pdf.
    #[arg(long, value_name = "PREFIX", default_value = DEFAULT_API_PREFIX)]
    pub api_prefix: String,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 120)]
    pub timeout: u64,

    /// Largest accepted input file, in megabytes
    #[arg(long, value_name = "MB", default_value_t = 50)]
    pub max_file_size_mb: u64,

    /// Largest number of input files
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub max_files: usize,

    /// Check that the service is reachable and healthy, then exit
    #[arg(long)]
    pub check_service: bool,

    /// Dry run - stage and plan without reconstructing
    ///
    /// Prints the staged sequence and the batches that would be
    /// requested from the service.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Read input file list from a file (one path per line)
    ///
    /// Lines starting with '#' are ignored. Paths from the list are
    /// staged after the direct inputs.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Number of files read concurrently
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,
}

impl Cli {
    /// Convert CLI arguments into a validated Config for `inputs`.
    ///
    /// # Errors
    ///
    /// Returns an error if an option cannot be parsed or the resulting
    /// configuration is inconsistent.
    pub fn to_config(&self, inputs: Vec<PathBuf>) -> Result<Config> {
        let mode = StagingMode::from_str(&self.mode)?;

        let arrangement = self
            .order
            .as_deref()
            .map(Arrangement::parse)
            .transpose()
            .map_err(|e| StageError::invalid_order(e.to_string()))?;

        let moves = self
            .moves
            .iter()
            .map(|m| {
                PositionMove::parse(m).map_err(|e| StageError::invalid_config(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let backend = if self.local {
            Backend::Local
        } else {
            Backend::Remote(self.service_config())
        };

        let limits = IntakeLimits::new(self.max_file_size_mb, self.max_files)
            .map_err(|e| StageError::invalid_config(e.to_string()))?;

        let config = Config {
            inputs,
            output: self.output.clone(),
            mode,
            arrangement,
            moves,
            excludes: self.exclude.clone(),
            backend,
            limits,
            overwrite_mode,
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            jobs: self.jobs,
        };

        config.validate().map_err(|e| {
            StageError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }

    /// Service settings from the CLI arguments.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            base_url: self.service_url.clone(),
            api_prefix: self.api_prefix.clone(),
            timeout: Duration::from_secs(self.timeout),
        }
    }

    /// Validate CLI arguments before any file is touched.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() && !self.check_service {
            return Err(StageError::invalid_config("No input files specified"));
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(StageError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }

        if self.timeout == 0 {
            return Err(StageError::invalid_config(
                "Timeout must be at least 1 second",
            ));
        }

        if self.exclude.contains(&0) {
            return Err(StageError::invalid_config(
                "Excluded positions must be positive (1-indexed)",
            ));
        }

        if let Some(ref order) = self.order {
            Arrangement::parse(order).map_err(|e| StageError::invalid_order(e.to_string()))?;
        }

        Ok(())
    }

    /// Get all input paths: expanded direct inputs followed by the
    /// entries of the input list, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid, the input list cannot be
    /// read, or no inputs remain.
    pub async fn get_all_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut all_inputs =
            collect_paths_for_patterns(self.inputs.iter().map(|p| p.to_string_lossy()))?;

        if let Some(ref input_list_path) = self.input_list {
            all_inputs.extend(read_input_list(input_list_path).await?);
        }

        if all_inputs.is_empty() {
            return Err(StageError::invalid_config("No input files matched"));
        }

        Ok(all_inputs)
    }
}

/// Read input paths from a file, one per line.
///
/// Lines starting with '#' are comments. Empty lines are skipped.
async fn read_input_list(path: &Path) -> Result<Vec<PathBuf>> {
    use tokio::fs::File;
    use tokio::io::{AsyncBufReadExt, BufReader};

    let failed = |source| StageError::FailedToRead {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).await.map_err(failed)?;
    let mut lines = BufReader::new(file).lines();
    let mut paths = Vec::new();

    while let Some(line) = lines.next_line().await.map_err(failed)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        paths.push(PathBuf::from(line));
    }

    Ok(paths)
}
