//! User-facing output for pdfstage.
//!
//! Status lines, the staging listing and the batch plan shown on a dry
//! run. Everything here respects quiet and verbose modes.
//!
//! # Examples
//!
//! ```no_run
//! use pdfstage::config::Config;
//! use pdfstage::output::create_formatter;
//!
//! # fn example(config: Config) {
//! let formatter = create_formatter(&config);
//! formatter.info("Planning reconstruction");
//! # }
//! ```

pub mod formatter;

pub use formatter::{MessageLevel, OutputFormatter};

use crate::config::Config;
use crate::io::LoadStatistics;
use crate::plan::{Batch, PageSelection};
use crate::reconstruct::ReconstructionStatistics;
use crate::staging::{ItemDescriptor, Snapshot};
use crate::validation::ValidationSummary;

/// Create an output formatter from configuration.
pub fn create_formatter(config: &Config) -> OutputFormatter {
    OutputFormatter::from_config(config)
}

/// Display intake validation results.
pub fn display_validation_summary(formatter: &OutputFormatter, summary: &ValidationSummary) {
    if summary.files_failed > 0 {
        formatter.warning(&format!(
            "{} file(s) rejected at intake",
            summary.files_failed
        ));
    }

    formatter.info(&format!(
        "Staged {} file(s), {}",
        summary.files_validated,
        summary.format_total_size()
    ));
}

/// Display load statistics.
pub fn display_load_statistics(formatter: &OutputFormatter, stats: &LoadStatistics) {
    if stats.failure_count > 0 {
        formatter.warning(&format!(
            "{} file(s) failed to load",
            stats.failure_count
        ));
    }

    formatter.debug(&format!(
        "Loaded {} file(s) in {:.2}s, {}",
        stats.success_count,
        stats.total_time.as_secs_f64(),
        stats.format_total_size()
    ));
}

/// Display the staging sequence in display order.
pub fn display_staging(formatter: &OutputFormatter, snapshot: &Snapshot) {
    formatter.section(&format!(
        "Staged items ({} mode, {} of {} included):",
        snapshot.mode,
        snapshot.included().count(),
        snapshot.len()
    ));
    for (index, item) in snapshot.items.iter().enumerate() {
        formatter.list_item(index + 1, &describe_item(item));
    }
}

/// Display the batch plan.
pub fn display_plan(formatter: &OutputFormatter, batches: &[Batch]) {
    let merges = usize::from(batches.len() > 1);
    formatter.section(&format!(
        "Plan: {} batch(es), {} merge request(s)",
        batches.len(),
        merges
    ));
    for (index, batch) in batches.iter().enumerate() {
        formatter.list_item(index + 1, &describe_batch(batch));
    }
}

/// Display the outcome of a reconstruction.
pub fn display_reconstruction(formatter: &OutputFormatter, stats: &ReconstructionStatistics) {
    formatter.detail("Batches", &stats.batches.to_string());
    formatter.detail("Extraction requests", &stats.extraction_requests.to_string());
    formatter.detail(
        "Merge requested",
        if stats.merge_requested { "yes" } else { "no" },
    );
    formatter.detail(
        "Time",
        &format!("{:.2}s", stats.total_time.as_secs_f64()),
    );
}

/// One-line description of a staged item.
pub fn describe_item(item: &ItemDescriptor) -> String {
    let marker = if item.included { "" } else { " (excluded)" };
    match item.page {
        Some(page) => format!("{} p.{page}{marker}", item.name),
        None => format!("{}{marker}", item.name),
    }
}

/// One-line description of a batch.
pub fn describe_batch(batch: &Batch) -> String {
    match &batch.selection {
        PageSelection::Whole => format!("{}: whole document", batch.name),
        PageSelection::Pages(pages) => {
            let list = pages
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}: pages {list}", batch.name)
        }
    }
}
