//! Value types shared between pipeline stages.
//!
//! Everything here is plain data: created once, never mutated, and safe to
//! move across threads. Workers receive and return these types only.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A file discovered by the scanner, identified relative to its scan root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceImage {
    /// Canonical absolute path of the file.
    pub source_path: PathBuf,
    /// Root the file was found under (the parent directory when the root was a file).
    pub root: PathBuf,
    /// Path relative to `root`, or the bare file name.
    pub relative_path: PathBuf,
}

/// Terminal status of one source image.
///
/// The set is closed: anything that is not `processed*` or `skip-existing`
/// counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Processed,
    ProcessedOverwrite,
    ProcessedRename,
    SkipExisting,
    ErrorLoad,
    ErrorStyle,
    ErrorAntidedup,
    ErrorWrite,
    ErrorWorker,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Processed => "processed",
            OutcomeStatus::ProcessedOverwrite => "processed-overwrite",
            OutcomeStatus::ProcessedRename => "processed-rename",
            OutcomeStatus::SkipExisting => "skip-existing",
            OutcomeStatus::ErrorLoad => "error-load",
            OutcomeStatus::ErrorStyle => "error-style",
            OutcomeStatus::ErrorAntidedup => "error-antidedup",
            OutcomeStatus::ErrorWrite => "error-write",
            OutcomeStatus::ErrorWorker => "error-worker",
        }
    }

    pub fn is_success(self) -> bool {
        self.as_str().starts_with("processed")
    }

    pub fn is_skip(self) -> bool {
        self == OutcomeStatus::SkipExisting
    }

    pub fn is_failure(self) -> bool {
        !self.is_success() && !self.is_skip()
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one source image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileOutcome {
    pub source_path: PathBuf,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Perceptual hash Hamming distance between source and output (validation only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phash_distance: Option<u32>,
    /// Structural similarity between source and output (validation only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssim: Option<f64>,
}

impl FileOutcome {
    pub fn new(source_path: impl Into<PathBuf>, status: OutcomeStatus) -> Self {
        Self {
            source_path: source_path.into(),
            status,
            output_path: None,
            message: None,
            phash_distance: None,
            ssim: None,
        }
    }

    /// Failure outcome carrying the error text as its message.
    pub fn failed(
        source_path: impl Into<PathBuf>,
        status: OutcomeStatus,
        error: impl fmt::Display,
    ) -> Self {
        Self::new(source_path, status).with_message(Some(error.to_string()))
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }
}

/// Final partition of a batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    pub succeeded: Vec<FileOutcome>,
    pub skipped: Vec<FileOutcome>,
    pub failed: Vec<FileOutcome>,
    /// Where the CSV report landed, if it could be written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
}

impl BatchResult {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.skipped.len() + self.failed.len()
    }

    /// All outcomes, succeeded first, then skipped, then failed.
    pub fn outcomes(&self) -> impl Iterator<Item = &FileOutcome> {
        self.succeeded
            .iter()
            .chain(self.skipped.iter())
            .chain(self.failed.iter())
    }
}

/// What the resolver decided for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationAction {
    Write,
    Overwrite,
    Skip,
    Rename,
}

impl DestinationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            DestinationAction::Write => "write",
            DestinationAction::Overwrite => "overwrite",
            DestinationAction::Skip => "skip",
            DestinationAction::Rename => "rename",
        }
    }

    /// Status a successful write under this action is recorded with.
    pub fn success_status(self) -> OutcomeStatus {
        match self {
            DestinationAction::Overwrite => OutcomeStatus::ProcessedOverwrite,
            DestinationAction::Rename => OutcomeStatus::ProcessedRename,
            DestinationAction::Write | DestinationAction::Skip => OutcomeStatus::Processed,
        }
    }
}

/// Output of the destination resolver for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestinationDecision {
    /// `None` only for actions that forbid writing (reserved, unused by current policies).
    pub destination: Option<PathBuf>,
    pub action: DestinationAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Running,
    Finished,
}

/// One-way progress notification from the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub total: usize,
    pub completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: ProgressStatus,
}
