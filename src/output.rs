//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each image is shown by its file name with a positional index. Full paths,
//! conflict notes and error text follow as indented context lines, so the
//! output reads as an inventory first and a log second.
//!
//! # Output Format
//!
//! ## Scan (planned run)
//!
//! ```text
//! Sources (3)
//! 001 a.png → a.png
//!     Source: /in/x/a.png
//! 002 a.png → a_1.png (rename)
//!     Source: /in/y/a.png
//!     Note: destination taken by an earlier source: a.png -> renamed to a_1.png
//! 003 b.jpg → b.jpg (skip)
//!     Source: /in/b.jpg
//!     Note: destination exists: b.jpg
//!
//! Output: /out
//! ```
//!
//! ## Run
//!
//! ```text
//! Processed 2, skipped 1, failed 1
//! Skipped
//!     001 b.jpg
//!         destination exists: b.jpg
//! Failed
//!     001 broken.png [error-load]
//!         Failed to decode /in/broken.png: ...
//! Report: /out/report.csv
//! ```
//!
//! ## Ensure-main
//!
//! ```text
//! Folders: 12, inspected: 10, adjusted: 3, missing: 2, errors: 0
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::PlannedItem;
use crate::config::JobConfig;
use crate::main_image::AdjustmentStats;
use crate::types::{BatchResult, DestinationAction, FileOutcome};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

// ============================================================================
// Scan: planned destinations
// ============================================================================

/// Format the planned destination of every source.
pub fn format_plan(items: &[PlannedItem], output_dir: &Path) -> Vec<String> {
    let mut lines = vec![format!("Sources ({})", items.len())];

    for (i, item) in items.iter().enumerate() {
        let name = file_name(&item.source.source_path);
        let target = item
            .decision
            .destination
            .as_deref()
            .map(file_name)
            .unwrap_or_else(|| "-".to_string());
        let action = match item.decision.action {
            DestinationAction::Write => String::new(),
            other => format!(" ({})", other.as_str()),
        };
        lines.push(format!(
            "{} {} \u{2192} {}{}",
            format_index(i + 1),
            name,
            target,
            action
        ));
        lines.push(format!(
            "{}Source: {}",
            indent(1),
            item.source.source_path.display()
        ));
        if let Some(note) = &item.decision.note {
            lines.push(format!("{}Note: {}", indent(1), note));
        }
    }

    lines.push(String::new());
    lines.push(format!("Output: {}", output_dir.display()));
    lines
}

/// Print the planned run to stdout.
pub fn print_plan(items: &[PlannedItem], output_dir: &Path) {
    for line in format_plan(items, output_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Check: loaded job summary
// ============================================================================

/// Format the effective settings of a validated job.
pub fn format_job(config: &JobConfig) -> Vec<String> {
    let mut lines = vec!["Sources".to_string()];
    for source in &config.sources {
        lines.push(format!("{}{}", indent(1), source.display()));
    }

    let styling = &config.styling;
    let anti_dedup = &config.anti_dedup;
    let seed = config
        .random_seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "random".to_string());

    lines.push(format!("Output: {}", config.output.output_dir.display()));
    lines.push(format!(
        "{}conflicts: {:?}, flatten: {}, jpeg quality: {}",
        indent(1),
        config.output.conflict_strategy,
        config.output.flatten_structure,
        config.output.jpeg_quality
    ));
    lines.push(format!(
        "Styling: {}:{} at least {}x{}, {:?}",
        styling.aspect_ratio.0,
        styling.aspect_ratio.1,
        styling.min_size.0,
        styling.min_size.1,
        styling.mode
    ));
    lines.push(format!("Anti-dedup: {:?}", anti_dedup.mode));
    lines.push(format!(
        "Workers: {}, seed: {}, validation: {}",
        config.max_workers, seed, config.validation.enabled
    ));
    lines
}

/// Print the job summary to stdout.
pub fn print_job(config: &JobConfig) {
    for line in format_job(config) {
        println!("{}", line);
    }
}

// ============================================================================
// Run: summary
// ============================================================================

fn outcome_lines(lines: &mut Vec<String>, title: &str, outcomes: &[FileOutcome], status: bool) {
    if outcomes.is_empty() {
        return;
    }
    lines.push(title.to_string());
    for (i, outcome) in outcomes.iter().enumerate() {
        let name = file_name(&outcome.source_path);
        if status {
            lines.push(format!(
                "{}{} {} [{}]",
                indent(1),
                format_index(i + 1),
                name,
                outcome.status
            ));
        } else {
            lines.push(format!("{}{} {}", indent(1), format_index(i + 1), name));
        }
        if let Some(message) = &outcome.message {
            lines.push(format!("{}{}", indent(2), truncate(message, 120)));
        }
    }
}

/// Format the end-of-run summary: counts, then skipped and failed files.
pub fn format_summary(result: &BatchResult) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {}, skipped {}, failed {}",
        result.succeeded.len(),
        result.skipped.len(),
        result.failed.len()
    )];
    outcome_lines(&mut lines, "Skipped", &result.skipped, false);
    outcome_lines(&mut lines, "Failed", &result.failed, true);
    match &result.report_path {
        Some(path) => lines.push(format!("Report: {}", path.display())),
        None => lines.push("Report: not written".to_string()),
    }
    lines
}

/// Print the run summary to stdout.
pub fn print_summary(result: &BatchResult) {
    for line in format_summary(result) {
        println!("{}", line);
    }
}

// ============================================================================
// Ensure-main
// ============================================================================

pub fn format_adjustment_stats(stats: &AdjustmentStats) -> String {
    format!(
        "Folders: {}, inspected: {}, adjusted: {}, missing: {}, errors: {}",
        stats.total_folders,
        stats.inspected_files,
        stats.adjusted_files,
        stats.missing_files,
        stats.errors
    )
}

// ============================================================================
// Tests
// ============================================================================
