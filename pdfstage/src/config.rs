//! Configuration module for pdfstage.
//!
//! This module holds the validated configuration derived from CLI
//! arguments: which files to stage and in which mode, how to rearrange
//! them, which backend reconstructs the result, and where it goes.

use anyhow::{Context, Result, bail};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::StageError;
use crate::service::ServiceConfig;
use crate::staging::{DocumentId, PageRef, StagingMode};

/// Bytes per megabyte for the intake limits.
const MB: u64 = 1024 * 1024;

/// Size and count limits applied at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakeLimits {
    /// Largest accepted file, in bytes.
    pub max_file_size: u64,
    /// Largest number of files per run.
    pub max_files: usize,
}

impl Default for IntakeLimits {
    fn default() -> Self {
        Self {
            max_file_size: 50 * MB,
            max_files: 20,
        }
    }
}

impl IntakeLimits {
    /// Range of accepted `--max-file-size-mb` values.
    pub const FILE_SIZE_MB_RANGE: std::ops::RangeInclusive<u64> = 1..=1000;

    /// Range of accepted `--max-files` values.
    pub const FILES_RANGE: std::ops::RangeInclusive<usize> = 1..=100;

    /// Build limits from a size in megabytes and a file count.
    ///
    /// # Errors
    ///
    /// Returns an error if either value is outside its accepted range.
    pub fn new(max_file_size_mb: u64, max_files: usize) -> Result<Self> {
        if !Self::FILE_SIZE_MB_RANGE.contains(&max_file_size_mb) {
            bail!(
                "Maximum file size must be between {} and {} MB, got {max_file_size_mb}",
                Self::FILE_SIZE_MB_RANGE.start(),
                Self::FILE_SIZE_MB_RANGE.end()
            );
        }
        if !Self::FILES_RANGE.contains(&max_files) {
            bail!(
                "Maximum file count must be between {} and {}, got {max_files}",
                Self::FILES_RANGE.start(),
                Self::FILES_RANGE.end()
            );
        }

        Ok(Self {
            max_file_size: max_file_size_mb * MB,
            max_files,
        })
    }
}

/// Which implementation reconstructs the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// The remote document-processing service.
    Remote(ServiceConfig),
    /// In-process processing with lopdf.
    Local,
}

impl Default for Backend {
    fn default() -> Self {
        Self::Remote(ServiceConfig::default())
    }
}

/// A page ordering across input documents.
///
/// Written as `DOC:PAGES` groups separated by `;`, where `DOC` is the
/// 1-based position of the input file and `PAGES` is a comma-separated
/// list of pages and ranges. Ranges may run backwards.
///
/// - `"1:1-3"` - pages 1, 2, 3 of the first input
/// - `"2:5;1:4"` - page 5 of the second input, then page 4 of the first
/// - `"1:3-1"` - pages 3, 2, 1 of the first input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arrangement {
    entries: Vec<(usize, u32)>,
}

impl Arrangement {
    /// Largest number of pages an arrangement may list.
    pub const MAX_PAGES: usize = 100_000;

    /// Parse an arrangement string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string format is invalid, contains
    /// non-positive numbers, or lists more than [`Self::MAX_PAGES`] pages.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfstage::config::Arrangement;
    ///
    /// let order = Arrangement::parse("1:1-2;2:4").unwrap();
    /// assert_eq!(order.entries(), &[(1, 1), (1, 2), (2, 4)]);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut entries = Vec::new();

        for group in s.split(';').map(str::trim).filter(|g| !g.is_empty()) {
            let Some((doc, pages)) = group.split_once(':') else {
                bail!("Invalid order group: {group}. Expected format like '1:1-3'");
            };

            let doc: usize = doc
                .trim()
                .parse()
                .with_context(|| format!("Invalid document number: {doc}"))?;
            if doc == 0 {
                bail!("Document numbers must be positive (1-indexed)");
            }

            for part in pages.split(',').map(str::trim) {
                let (start, end) = parse_pages(part)?;
                let count = (start.abs_diff(end) as usize).saturating_add(1);
                if count > Self::MAX_PAGES - entries.len() {
                    bail!(
                        "Page order lists more than {} pages: {part}",
                        Self::MAX_PAGES
                    );
                }

                if start <= end {
                    entries.extend((start..=end).map(|page| (doc, page)));
                } else {
                    entries.extend((end..=start).rev().map(|page| (doc, page)));
                }
            }
        }

        if entries.is_empty() {
            bail!("Page order cannot be empty");
        }

        Ok(Self { entries })
    }

    /// `(document, page)` pairs in order, both 1-based.
    pub fn entries(&self) -> &[(usize, u32)] {
        &self.entries
    }

    /// Map input positions to staged documents.
    ///
    /// `documents[i]` is the staged id of input `i + 1`, or `None` if that
    /// input was not staged.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::InvalidOrder`] if an entry names an input
    /// that does not exist or was not staged.
    pub fn resolve(&self, documents: &[Option<DocumentId>]) -> crate::Result<Vec<PageRef>> {
        self.entries
            .iter()
            .map(|&(doc, page)| {
                let id = documents
                    .get(doc - 1)
                    .copied()
                    .flatten()
                    .ok_or_else(|| {
                        StageError::invalid_order(format!("input {doc} is not staged"))
                    })?;
                Ok(PageRef::new(id, page))
            })
            .collect()
    }
}

/// Parse `N` or `START-END` into inclusive bounds, in listed direction.
fn parse_pages(part: &str) -> Result<(u32, u32)> {
    if let Some((start, end)) = part.split_once('-') {
        let start: u32 = start
            .trim()
            .parse()
            .with_context(|| format!("Invalid page number: {start}"))?;
        let end: u32 = end
            .trim()
            .parse()
            .with_context(|| format!("Invalid page number: {end}"))?;

        if start == 0 || end == 0 {
            bail!("Page numbers must be positive (1-indexed)");
        }

        Ok((start, end))
    } else {
        let page: u32 = part
            .parse()
            .with_context(|| format!("Invalid page number: {part}"))?;
        if page == 0 {
            bail!("Page numbers must be positive (1-indexed)");
        }
        Ok((page, page))
    }
}

/// Move of one item between display positions, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionMove {
    /// Current position of the item.
    pub from: usize,
    /// Position the item should end up at.
    pub to: usize,
}

impl PositionMove {
    /// Parse `FROM:TO`.
    ///
    /// # Errors
    ///
    /// Returns an error if the format is wrong or a position is zero.
    pub fn parse(s: &str) -> Result<Self> {
        let Some((from, to)) = s.split_once(':') else {
            bail!("Invalid move: {s}. Expected format like '3:1'");
        };
        let from: usize = from
            .trim()
            .parse()
            .with_context(|| format!("Invalid position: {from}"))?;
        let to: usize = to
            .trim()
            .parse()
            .with_context(|| format!("Invalid position: {to}"))?;

        if from == 0 || to == 0 {
            bail!("Positions must be positive (1-indexed)");
        }

        Ok(Self { from, to })
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Complete configuration for a staging run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input files, in staging order.
    pub inputs: Vec<PathBuf>,

    /// Output file path.
    pub output: PathBuf,

    /// Staging mode.
    pub mode: StagingMode,

    /// Explicit page order (organize mode).
    pub arrangement: Option<Arrangement>,

    /// Moves applied after staging, in order.
    pub moves: Vec<PositionMove>,

    /// 1-based positions of pages to exclude.
    pub excludes: Vec<usize>,

    /// Reconstruction backend.
    pub backend: Backend,

    /// Intake limits.
    pub limits: IntakeLimits,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Print the plan instead of reconstructing.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Number of files read concurrently (None = auto-detect).
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            output: PathBuf::from("output.pdf"),
            mode: StagingMode::default(),
            arrangement: None,
            moves: Vec::new(),
            excludes: Vec::new(),
            backend: Backend::default(),
            limits: IntakeLimits::default(),
            overwrite_mode: OverwriteMode::default(),
            dry_run: false,
            verbose: false,
            quiet: false,
            jobs: None,
        }
    }
}

impl Config {
    /// Returns a reference to inputs.
    pub fn inputs(&self) -> &[PathBuf] {
        self.inputs.as_ref()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - Jobs count is zero
    /// - Page-level options are used outside organize mode
    /// - Single mode is given more than one input
    /// - The output path is also an input
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            bail!("No input files specified");
        }

        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            bail!("Number of jobs must be at least 1");
        }

        if !self.mode.is_page_granular() {
            if self.arrangement.is_some() {
                bail!("--order requires organize mode");
            }
            if !self.excludes.is_empty() {
                bail!("--exclude requires organize mode");
            }
        }

        if !self.mode.allows_multiple() && self.inputs.len() > 1 {
            bail!("{} mode takes exactly one input file", self.mode);
        }

        if let Backend::Remote(service) = &self.backend {
            if service.base_url.trim().is_empty() {
                bail!("Service URL cannot be empty");
            }
            if service.timeout == Duration::ZERO {
                bail!("Timeout must be at least 1 second");
            }
        }

        for input in &self.inputs {
            if input == &self.output {
                bail!(
                    "Output file cannot be the same as an input file: {}",
                    self.output.display()
                );
            }
        }

        Ok(())
    }

    /// Get the effective number of concurrent reads.
    pub fn effective_jobs(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Whether output should be displayed.
    ///
    /// Returns false if in quiet mode and not doing a dry run.
    pub fn should_print(&self) -> bool {
        !self.quiet || self.dry_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1:1-3", vec![(1, 1), (1, 2), (1, 3)])]
    #[case("1:3-1", vec![(1, 3), (1, 2), (1, 1)])]
    #[case("1:1,3;2:2;1:5", vec![(1, 1), (1, 3), (2, 2), (1, 5)])]
    #[case(" 2 : 4 ; ", vec![(2, 4)])]
    fn test_arrangement_parse(#[case] input: &str, #[case] expected: Vec<(usize, u32)>) {
        assert_eq!(Arrangement::parse(input).unwrap().entries(), expected.as_slice());
    }

    #[rstest]
    #[case("")]
    #[case("1")]
    #[case("0:1")]
    #[case("1:0")]
    #[case("1:a")]
    #[case("x:1")]
    #[case("1:2-0")]
    #[case("1:1-4000000000")]
    #[case("1:4000000000-1")]
    #[case("1:1-60000;2:1-60000")]
    fn test_arrangement_invalid(#[case] input: &str) {
        assert!(Arrangement::parse(input).is_err());
    }

    #[test]
    fn test_arrangement_page_limit() {
        let order = Arrangement::parse("1:1-100000").unwrap();
        assert_eq!(order.entries().len(), Arrangement::MAX_PAGES);

        let err = Arrangement::parse("1:1-100000;2:1").unwrap_err();
        assert!(err.to_string().contains("more than 100000 pages"));
    }

    #[test]
    fn test_arrangement_resolve() {
        let a = DocumentId::new(10);
        let b = DocumentId::new(11);
        let order = Arrangement::parse("2:1;1:2").unwrap();

        let pages = order.resolve(&[Some(a), Some(b)]).unwrap();
        assert_eq!(pages, vec![PageRef::new(b, 1), PageRef::new(a, 2)]);

        let err = order.resolve(&[Some(a), None]).unwrap_err();
        assert!(matches!(err, StageError::InvalidOrder { .. }));
        assert!(order.resolve(&[Some(a)]).is_err());
    }

    #[test]
    fn test_position_move_parse() {
        assert_eq!(
            PositionMove::parse("3:1").unwrap(),
            PositionMove { from: 3, to: 1 }
        );
        assert!(PositionMove::parse("3").is_err());
        assert!(PositionMove::parse("0:1").is_err());
        assert!(PositionMove::parse("a:b").is_err());
    }

    #[test]
    fn test_intake_limits() {
        assert_eq!(IntakeLimits::default(), IntakeLimits::new(50, 20).unwrap());
        assert!(IntakeLimits::new(0, 20).is_err());
        assert!(IntakeLimits::new(1001, 20).is_err());
        assert!(IntakeLimits::new(50, 0).is_err());
        assert!(IntakeLimits::new(50, 101).is_err());
        assert_eq!(IntakeLimits::new(1, 1).unwrap().max_file_size, 1024 * 1024);
    }

    fn create_test_config() -> Config {
        Config {
            inputs: vec![PathBuf::from("a.pdf")],
            output: PathBuf::from("out.pdf"),
            ..Config::default()
        }
    }

    #[test]
    fn test_config_validation() {
        let mut config = create_test_config();
        assert!(config.validate().is_ok());

        config.inputs.clear();
        assert!(config.validate().is_err());
        config.inputs = vec![PathBuf::from("a.pdf")];

        config.verbose = true;
        config.quiet = true;
        assert!(config.validate().is_err());
        config.verbose = false;
        config.quiet = false;

        config.jobs = Some(0);
        assert!(config.validate().is_err());
        config.jobs = None;

        config.output = PathBuf::from("a.pdf");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_page_options_need_organize() {
        let mut config = create_test_config();
        config.excludes = vec![2];
        assert!(config.validate().is_err());

        config.mode = StagingMode::Organize;
        assert!(config.validate().is_ok());

        config.arrangement = Some(Arrangement::parse("1:1").unwrap());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_single_mode_one_input() {
        let mut config = create_test_config();
        config.mode = StagingMode::Single;
        config.inputs.push(PathBuf::from("b.pdf"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_remote_backend_checks() {
        let mut config = create_test_config();
        config.backend = Backend::Remote(ServiceConfig::new(""));
        assert!(config.validate().is_err());

        config.backend = Backend::Local;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_jobs() {
        let config = Config {
            jobs: Some(4),
            ..create_test_config()
        };
        assert_eq!(config.effective_jobs(), 4);
        assert!(create_test_config().effective_jobs() >= 1);
    }

    #[test]
    fn test_should_print() {
        let mut config = create_test_config();
        assert!(config.should_print());

        config.quiet = true;
        assert!(!config.should_print());

        config.dry_run = true;
        assert!(config.should_print());
    }
}
