//! pdfstage - Stage, reorder, and reconstruct PDF pages.

mod cli;

use clap::Parser;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use pdfstage::config::{Backend, Config, OverwriteMode};
use pdfstage::error::StageError;
use pdfstage::io::{OutputWriter, SourceLoader};
use pdfstage::output::{
    OutputFormatter, display_load_statistics, display_plan, display_reconstruction,
    display_staging, display_validation_summary,
};
use pdfstage::render::{LopdfPageCounter, expand_all};
use pdfstage::service::{HttpDocumentService, LocalDocumentService};
use pdfstage::staging::{DocumentId, ItemRef};
use pdfstage::validation::{ValidationSummary, Validator};
use pdfstage::{Batch, BatchPlanner, RearrangementController, Reconstruction};
use pdfstage::{ReconstructionExecutor, StagingStore};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        process::exit(err.exit_code());
    }
}

/// Diagnostics go to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "pdfstage=debug"
    } else {
        "pdfstage=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), StageError> {
    cli.validate()?;

    if cli.check_service {
        let formatter = OutputFormatter::new(cli.quiet, cli.verbose);
        return check_service(&cli, &formatter).await;
    }

    let all_inputs = cli.get_all_inputs().await?;
    let config = cli.to_config(all_inputs)?;
    let formatter = OutputFormatter::from_config(&config);

    if formatter.should_print() {
        formatter.section(&format!("{} v{}", pdfstage::NAME, pdfstage::VERSION));
        formatter.blank_line();
    }

    let (mut store, staged) = stage_inputs(&config, &formatter).await?;

    if config.mode.is_page_granular() {
        for err in expand_all(&mut store, &LopdfPageCounter) {
            formatter.warning(&err.to_string());
        }
    }

    rearrange(&config, &mut store, &staged, &formatter)?;

    let snapshot = store.snapshot_order();
    if config.dry_run || formatter.is_verbose() {
        display_staging(&formatter, &snapshot);
    }

    let batches = BatchPlanner::new().plan(&snapshot)?;
    if config.dry_run || formatter.is_verbose() {
        display_plan(&formatter, &batches);
    }

    if config.dry_run {
        formatter.blank_line();
        formatter.success("Dry run completed successfully");
        formatter.info(&format!("  Output would be: {}", config.output.display()));
        formatter.info("  Run without --dry-run to reconstruct the document");
        return Ok(());
    }

    handle_output_overwrite(&config, &formatter).await?;

    let writer = OutputWriter::new();
    writer.can_write(&config.output).await?;

    formatter.info(&format!(
        "Reconstructing {} item(s) in {} batch(es)...",
        snapshot.included().count(),
        batches.len()
    ));
    let result = reconstruct(&config, &batches).await?;

    if let Some(ref filename) = result.filename {
        formatter.debug(&format!("Service suggested filename: {filename}"));
    }

    let write_stats = writer.write(&result.bytes, &config.output).await?;

    if formatter.should_print() {
        formatter.blank_line();
        formatter.success(&format!(
            "Successfully created {} ({})",
            config.output.display(),
            write_stats.format_file_size()
        ));

        if formatter.is_verbose() {
            formatter.blank_line();
            formatter.section("Statistics");
            display_reconstruction(&formatter, &result.statistics);
            formatter.detail(
                "Write time",
                &format!("{:.2}s", write_stats.write_time.as_secs_f64()),
            );
        }
    }

    Ok(())
}

/// Load, validate, and stage every input.
///
/// Returns the store and, per input position, the id it was staged
/// under. Inputs rejected at intake are reported and left out.
async fn stage_inputs(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(StagingStore, Vec<Option<DocumentId>>), StageError> {
    let validator = Validator::new(config.limits);
    validator.validate_count(config.inputs.len())?;

    formatter.info("Loading input files...");
    let (results, load_stats) = SourceLoader::new()
        .load_all(&config.inputs, config.effective_jobs())
        .await;
    display_load_statistics(formatter, &load_stats);

    let mut store = StagingStore::new(config.mode);
    let mut summary = ValidationSummary::default();
    let mut staged = Vec::with_capacity(results.len());

    for result in results {
        let file = result?;
        let outcome = validator
            .validate_source(&file.name, &file.bytes)
            .and_then(|kind| store.add_document(file.bytes.clone(), file.name.clone(), kind));

        match outcome {
            Ok(id) => {
                summary.record_accepted(file.size);
                staged.push(Some(id));
            }
            Err(err) if err.is_recoverable() => {
                formatter.warning(&err.to_string());
                summary.record_rejected();
                staged.push(None);
            }
            Err(err) => return Err(err),
        }
    }

    display_validation_summary(formatter, &summary);

    if store.is_empty() {
        return Err(StageError::EmptySelection);
    }

    Ok((store, staged))
}

/// Apply `--order`, `--move`, and `--exclude`, in that order.
fn rearrange(
    config: &Config,
    store: &mut StagingStore,
    staged: &[Option<DocumentId>],
    formatter: &OutputFormatter,
) -> Result<(), StageError> {
    if let Some(ref arrangement) = config.arrangement {
        let order = arrangement.resolve(staged)?;
        RearrangementController::new(store).arrange(&order)?;
    }

    for mv in &config.moves {
        let len = store.len();
        for position in [mv.from, mv.to] {
            if position > len {
                return Err(StageError::PositionOutOfRange { position, len });
            }
        }
        let item = store
            .item_at(mv.from - 1)
            .ok_or(StageError::PositionOutOfRange {
                position: mv.from,
                len,
            })?;
        RearrangementController::new(store).move_item(item, mv.to - 1)?;
    }

    for &position in &config.excludes {
        match position.checked_sub(1).and_then(|index| store.item_at(index)) {
            Some(ItemRef::Page(page)) => store.set_inclusion(page, false)?,
            Some(ItemRef::Document(_)) => {
                formatter.warning(&format!(
                    "Position {position} is a whole document and cannot be excluded"
                ));
            }
            None => {
                return Err(StageError::PositionOutOfRange {
                    position,
                    len: store.len(),
                });
            }
        }
    }

    Ok(())
}

async fn reconstruct(config: &Config, batches: &[Batch]) -> Result<Reconstruction, StageError> {
    match &config.backend {
        Backend::Local => {
            let service = LocalDocumentService::new();
            ReconstructionExecutor::with_service(&service)
                .execute(batches)
                .await
        }
        Backend::Remote(service_config) => {
            let service = HttpDocumentService::new(service_config.clone()).map_err(|e| {
                StageError::invalid_config(format!("Could not create service client: {e}"))
            })?;
            ReconstructionExecutor::with_service(&service)
                .execute(batches)
                .await
        }
    }
}

async fn check_service(cli: &Cli, formatter: &OutputFormatter) -> Result<(), StageError> {
    let service_config = cli.service_config();
    formatter.info(&format!("Checking {}...", service_config.status_url()));

    let service = HttpDocumentService::new(service_config).map_err(|e| {
        StageError::invalid_config(format!("Could not create service client: {e}"))
    })?;
    let health = service
        .status()
        .await
        .map_err(|e| StageError::other(format!("Service check failed: {e}")))?;

    let version = if health.version.is_empty() {
        "unknown version"
    } else {
        health.version.as_str()
    };
    if !health.is_healthy() {
        return Err(StageError::other(format!(
            "Service is {} ({version})",
            health.status
        )));
    }

    formatter.success(&format!("Service is healthy ({version})"));
    for (name, check) in &health.checks {
        formatter.detail(name, &check.to_string());
    }
    Ok(())
}

/// Handle output file overwrite scenarios.
async fn handle_output_overwrite(
    config: &Config,
    formatter: &OutputFormatter,
) -> Result<(), StageError> {
    if !OutputWriter::new().exists(&config.output).await {
        return Ok(());
    }

    match config.overwrite_mode {
        OverwriteMode::Force => Ok(()),
        OverwriteMode::NoClobber => Err(StageError::output_exists(config.output.clone())),
        OverwriteMode::Prompt => {
            if formatter.is_quiet() {
                return Err(StageError::output_exists(config.output.clone()));
            }

            formatter.warning(&format!(
                "Output file already exists: {}",
                config.output.display()
            ));

            use std::io::{self, Write};
            print!("Overwrite? [y/N]: ");
            io::stdout().flush().ok();

            let mut response = String::new();
            io::stdin()
                .read_line(&mut response)
                .map_err(|err| StageError::other(format!("Failed to read input: {err}")))?;

            let response = response.trim().to_lowercase();
            if response == "y" || response == "yes" {
                Ok(())
            } else {
                Err(StageError::Cancelled)
            }
        }
    }
}
