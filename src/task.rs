//! Self-contained unit of work for one source image.
//!
//! A [`ProcessingTask`] carries everything a worker needs: pre-resolved
//! destination, the transform settings and its own seed. [`run_task`] never
//! touches shared state, so any number of tasks can run at once.
//!
//! ## Stages
//!
//! | Stage | Failure status |
//! |---|---|
//! | decode + orientation | `error-load` |
//! | styling | `error-style` |
//! | anti-dedup | `error-antidedup` |
//! | similarity metrics (optional) | never fails |
//! | encode + write | `error-write` |

use crate::config::{AntiDedupConfig, StylingConfig};
use crate::imaging::{ImageBackend, Quality, apply_antidedup, apply_styling};
use crate::types::{DestinationAction, FileOutcome, OutcomeStatus};
use crate::validation;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::PathBuf;
use tracing::debug;

/// Immutable description of one image to process.
#[derive(Debug, Clone)]
pub struct ProcessingTask {
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub action: DestinationAction,
    pub note: Option<String>,
    pub styling: StylingConfig,
    pub anti_dedup: AntiDedupConfig,
    /// Compute pHash distance and SSIM between source and output.
    pub validate: bool,
    pub quality: Quality,
    pub random_seed: u64,
}

/// Run every stage of `task` and report how far it got.
pub fn run_task(backend: &impl ImageBackend, task: &ProcessingTask) -> FileOutcome {
    let source = &task.source_path;
    let mut rng = StdRng::seed_from_u64(task.random_seed);

    let image = match backend.load(source) {
        Ok(image) => image,
        Err(e) => {
            debug!(path = %source.display(), error = %e, "Load failed");
            return FileOutcome::failed(source, OutcomeStatus::ErrorLoad, e);
        }
    };

    let styled = match apply_styling(&image, &task.styling) {
        Ok(styled) => styled,
        Err(e) => return FileOutcome::failed(source, OutcomeStatus::ErrorStyle, e),
    };

    let (processed, operations) = match apply_antidedup(&styled, &task.anti_dedup, &mut rng) {
        Ok(result) => result,
        Err(e) => return FileOutcome::failed(source, OutcomeStatus::ErrorAntidedup, e),
    };

    let similarity = task
        .validate
        .then(|| validation::compare(&image, &processed));

    if let Err(e) = backend.save(&processed, &task.dest_path, task.quality) {
        return FileOutcome::failed(source, OutcomeStatus::ErrorWrite, e);
    }

    let mut outcome = FileOutcome::new(source, task.action.success_status())
        .with_output(&task.dest_path)
        .with_message(compose_message(task.note.as_deref(), &operations));
    if let Some(similarity) = similarity {
        outcome.phash_distance = Some(similarity.phash_distance);
        outcome.ssim = Some(similarity.ssim);
    }
    outcome
}

/// `"<decision note>; antidedup: <op>, <op>"`, either half optional.
fn compose_message(note: Option<&str>, operations: &[String]) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(note) = note.filter(|n| !n.is_empty()) {
        parts.push(note.to_string());
    }
    if !operations.is_empty() {
        parts.push(format!("antidedup: {}", operations.join(", ")));
    }
    (!parts.is_empty()).then(|| parts.join("; "))
}
