//! Batch orchestration.
//!
//! Wires the stages of one run together:
//!
//! ```text
//! scan ──► decide destinations ──► seed tasks ──► execute ──► merge ──► report
//!          (sequential, reserves    (scan order)   (pool or    (scan order)
//!           every output path)                      sequential)
//! ```
//!
//! Everything before `execute` happens on the calling thread, so destination
//! names and per-task seeds depend only on the scan order, never on
//! scheduling. Given the same sources, config and `random_seed`, two runs
//! produce the same files whatever the worker count.
//!
//! Per-image failures are recorded and the batch moves on. Only problems
//! that make the whole run meaningless abort it: an invalid job, a bad glob,
//! an output directory that cannot be created or a worker pool that cannot
//! start.

use crate::config::{ConfigError, JobConfig, effective_workers};
use crate::destination::{DestinationError, DestinationResolver, Reservations};
use crate::executor::{ExecutionStrategy, ExecutorError, WorkerPanic, map_unordered, run_guarded};
use crate::imaging::{ImageBackend, Quality, RustBackend};
use crate::report::write_csv_report;
use crate::scan::{ScanError, collect_source_images};
use crate::task::{ProcessingTask, run_task};
use crate::types::{
    BatchResult, DestinationAction, DestinationDecision, FileOutcome, OutcomeStatus,
    ProgressStatus, ProgressUpdate, SourceImage,
};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid job: {0}")]
    Config(#[from] ConfigError),
    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),
    #[error("Output setup failed: {0}")]
    Destination(#[from] DestinationError),
    #[error("Execution failed: {0}")]
    Executor(#[from] ExecutorError),
}

/// Process a job with the production image backend.
pub fn process_batch(
    config: &JobConfig,
    progress: Option<Sender<ProgressUpdate>>,
) -> Result<BatchResult, BatchError> {
    process_batch_with_backend(&RustBackend::new(), config, progress)
}

/// Progress sink that tolerates a missing or departed receiver.
struct Progress {
    sender: Option<Sender<ProgressUpdate>>,
    total: usize,
    completed: usize,
}

impl Progress {
    fn send(&self, message: Option<String>, status: ProgressStatus) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(ProgressUpdate {
                total: self.total,
                completed: self.completed,
                message,
                status,
            });
        }
    }

    fn tick(&mut self, source: &Path, status: OutcomeStatus) {
        self.completed += 1;
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());
        self.send(Some(format!("{name}: {status}")), ProgressStatus::Running);
    }
}

/// Process a job with an explicit image backend.
///
/// Progress updates are sent on `progress` if given: one `Running` update
/// once the total is known, one per finished image, and a final `Finished`
/// update after the report is written.
pub fn process_batch_with_backend(
    backend: &impl ImageBackend,
    config: &JobConfig,
    progress: Option<Sender<ProgressUpdate>>,
) -> Result<BatchResult, BatchError> {
    config.validate()?;
    let sources = collect_source_images(config)?;
    let resolver = DestinationResolver::new(&config.output)?;
    let mut progress = Progress {
        sender: progress,
        total: sources.len(),
        completed: 0,
    };
    progress.send(
        Some(format!("{} images found", sources.len())),
        ProgressStatus::Running,
    );

    // Decide every destination before anything is written
    let mut reservations = Reservations::new();
    let mut outcomes = Vec::with_capacity(sources.len());
    let mut tasks = Vec::new();
    let quality = Quality::new(config.output.jpeg_quality);

    for source in &sources {
        let decision = match resolver.decide(source, &mut reservations) {
            Ok(decision) => decision,
            Err(e) => {
                let outcome =
                    FileOutcome::failed(&source.source_path, OutcomeStatus::ErrorWrite, e);
                progress.tick(&source.source_path, outcome.status);
                outcomes.push(outcome);
                continue;
            }
        };

        match (decision.action, decision.destination) {
            (DestinationAction::Skip, _) | (_, None) => {
                let outcome = FileOutcome::new(&source.source_path, OutcomeStatus::SkipExisting)
                    .with_message(decision.note);
                progress.tick(&source.source_path, outcome.status);
                outcomes.push(outcome);
            }
            (action, Some(dest_path)) => tasks.push(ProcessingTask {
                source_path: source.source_path.clone(),
                dest_path,
                action,
                note: decision.note,
                styling: config.styling.clone(),
                anti_dedup: config.anti_dedup.clone(),
                validate: config.validation.enabled,
                quality,
                random_seed: 0,
            }),
        }
    }

    // Seeds are drawn in scan order so they never depend on scheduling
    let mut seeder = match config.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for task in &mut tasks {
        task.random_seed = seeder.next_u64();
    }

    let workers = effective_workers(config.max_workers);
    let strategy = ExecutionStrategy::from_workers(workers);
    let groups = group_by_destination(&tasks);
    let completions = map_unordered(
        &groups,
        strategy,
        |group| run_group(backend, &tasks, group),
        |(group_index, result)| match result {
            Ok(done) => {
                for (index, result) in done {
                    let status = match result {
                        Ok(outcome) => outcome.status,
                        Err(_) => OutcomeStatus::ErrorWorker,
                    };
                    progress.tick(&tasks[*index].source_path, status);
                }
            }
            Err(_) => {
                for &index in &groups[*group_index] {
                    progress.tick(&tasks[index].source_path, OutcomeStatus::ErrorWorker);
                }
            }
        },
    )?;

    for (group_index, result) in completions {
        match result {
            Ok(done) => outcomes.extend(done.into_iter().map(|(index, result)| {
                result.unwrap_or_else(|panic| worker_failure(&tasks[index], &panic))
            })),
            Err(panic) => outcomes.extend(
                groups[group_index]
                    .iter()
                    .map(|&index| worker_failure(&tasks[index], &panic)),
            ),
        }
    }

    let scan_position: HashMap<&Path, usize> = sources
        .iter()
        .enumerate()
        .map(|(position, source)| (source.source_path.as_path(), position))
        .collect();
    outcomes.sort_by_key(|o| {
        scan_position
            .get(o.source_path.as_path())
            .copied()
            .unwrap_or(usize::MAX)
    });

    let report_path =
        match write_csv_report(&outcomes, resolver.output_dir(), &config.report_filename) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Could not write report");
                None
            }
        };

    let mut result = BatchResult {
        report_path,
        ..BatchResult::default()
    };
    for outcome in outcomes {
        if outcome.status.is_success() {
            result.succeeded.push(outcome);
        } else if outcome.status.is_skip() {
            result.skipped.push(outcome);
        } else {
            result.failed.push(outcome);
        }
    }

    info!(
        succeeded = result.succeeded.len(),
        skipped = result.skipped.len(),
        failed = result.failed.len(),
        workers,
        "Batch complete"
    );
    progress.send(
        Some(format!(
            "{} succeeded, {} skipped, {} failed",
            result.succeeded.len(),
            result.skipped.len(),
            result.failed.len()
        )),
        ProgressStatus::Finished,
    );

    Ok(result)
}

/// Task indices grouped by destination, each group in scan order.
///
/// Only `overwrite` lets two sources share a path. Such a group runs on one
/// worker, one task after another, so the last source in scan order always
/// owns the file.
fn group_by_destination(tasks: &[ProcessingTask]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(tasks.len());
    let mut by_path: HashMap<&Path, usize> = HashMap::new();
    for (index, task) in tasks.iter().enumerate() {
        let group = *by_path.entry(task.dest_path.as_path()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[group].push(index);
    }
    groups
}

fn run_group(
    backend: &impl ImageBackend,
    tasks: &[ProcessingTask],
    group: &[usize],
) -> Vec<(usize, Result<FileOutcome, WorkerPanic>)> {
    group
        .iter()
        .map(|&index| (index, run_guarded(|| run_task(backend, &tasks[index]))))
        .collect()
}

fn worker_failure(task: &ProcessingTask, panic: &WorkerPanic) -> FileOutcome {
    FileOutcome::failed(&task.source_path, OutcomeStatus::ErrorWorker, panic)
}

/// A source and the destination a run would give it.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedItem {
    pub source: SourceImage,
    pub decision: DestinationDecision,
}

/// Scan and decide destinations without writing anything.
pub fn plan_batch(config: &JobConfig) -> Result<Vec<PlannedItem>, BatchError> {
    let sources = collect_source_images(config)?;
    let resolver = DestinationResolver::planning(&config.output);
    let mut reservations = Reservations::new();
    sources
        .into_iter()
        .map(|source| {
            let decision = resolver.decide(&source, &mut reservations)?;
            Ok(PlannedItem { source, decision })
        })
        .collect()
}
