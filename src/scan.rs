//! Source discovery.
//!
//! Stage 1 of a batch. Walks every configured source root and returns the
//! images to process as [`SourceImage`]s.
//!
//! ## Rules
//!
//! - A root may be a file (taken as-is) or a directory (walked fully, or only
//!   one level when `recursive = false`).
//! - A file is kept when its lowercase name matches at least one include glob,
//!   matches no exclude glob, and has a `.jpg`, `.jpeg` or `.png` extension.
//!   Globs are case-insensitive; an empty include list means the defaults.
//! - The same physical file reached through two roots is returned once
//!   (compared by canonical path).
//! - `relative_path` is relative to the owning root, or to the file's parent
//!   when the root is the file itself.
//! - Output is sorted by lowercase source path, so the scan order, and with
//!   it destination naming and seed assignment, is stable across runs.
//!
//! Missing roots are logged and skipped. A malformed glob fails the whole
//! scan before anything is written.

use crate::config::JobConfig;
use crate::imaging::supported_extensions;
use crate::types::SourceImage;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}

const DEFAULT_INCLUDE: &[&str] = &["*.jpg", "*.jpeg", "*.png"];

fn build_globset(patterns: &[String]) -> Result<GlobSet, ScanError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ScanError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ScanError::InvalidPattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Compiled include/exclude filter on file names.
struct NameFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl NameFilter {
    fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        let include = if include.is_empty() {
            let defaults: Vec<String> = DEFAULT_INCLUDE.iter().map(|p| p.to_string()).collect();
            build_globset(&defaults)?
        } else {
            build_globset(include)?
        };
        Ok(Self {
            include,
            exclude: build_globset(exclude)?,
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let name = name.to_lowercase();
        self.include.is_match(&name) && !self.exclude.is_match(&name) && has_image_extension(path)
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|ext| supported_extensions().any(|s| s == ext))
}

/// Files under `root`: the root itself when it is a file, otherwise its
/// directory entries down to the requested depth.
fn candidate_files(root: &Path, recursive: bool) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut walker = WalkDir::new(root).min_depth(1);
    if !recursive {
        walker = walker.max_depth(1);
    }
    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .collect()
}

/// Discover every source image of a job, deduplicated and sorted.
pub fn collect_source_images(config: &JobConfig) -> Result<Vec<SourceImage>, ScanError> {
    let filter = NameFilter::new(&config.include_patterns, &config.exclude_patterns)?;
    let mut seen = HashSet::new();
    let mut collected = Vec::new();

    for root in &config.sources {
        let root = match fs::canonicalize(root) {
            Ok(root) => root,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping missing source root");
                continue;
            }
        };
        let base = if root.is_dir() {
            root.clone()
        } else {
            root.parent().map(Path::to_path_buf).unwrap_or_else(|| root.clone())
        };

        for candidate in candidate_files(&root, config.recursive) {
            if !filter.accepts(&candidate) {
                continue;
            }
            let source_path = fs::canonicalize(&candidate).unwrap_or_else(|_| candidate.clone());
            if !seen.insert(source_path.clone()) {
                debug!(path = %source_path.display(), "Duplicate source ignored");
                continue;
            }

            let relative_path = candidate
                .strip_prefix(&base)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| {
                    PathBuf::from(candidate.file_name().unwrap_or(candidate.as_os_str()))
                });

            collected.push(SourceImage {
                source_path,
                root: base.clone(),
                relative_path,
            });
        }
    }

    collected.sort_by_cached_key(|s| s.source_path.to_string_lossy().to_lowercase());
    Ok(collected)
}
