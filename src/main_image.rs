//! Main-image size enforcement.
//!
//! Listing folders often carry one designated cover image per product
//! subfolder. That image must be square and at least `target × target`.
//! [`ensure_main_image_size`] walks the immediate subfolders of a root and
//! rewrites every non-compliant cover in place, stretched to exactly
//! `target × target`.
//!
//! ```text
//! root/
//! ├── 001-boots/main01.jpg    1200×1200  compliant, untouched
//! ├── 002-scarf/main01.jpg    1200×900   stretched to 800×800
//! └── 003-hat/                           missing
//! ```

use crate::imaging::{ImageBackend, Quality};
use image::imageops::FilterType;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const DEFAULT_FILE_NAME: &str = "main01.jpg";
pub const DEFAULT_TARGET_SIZE: u32 = 800;

/// Tally of one enforcement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdjustmentStats {
    pub total_folders: usize,
    pub inspected_files: usize,
    pub adjusted_files: usize,
    pub missing_files: usize,
    pub errors: usize,
}

/// Square and at least `target` on both sides.
fn is_compliant((width, height): (u32, u32), target: u32) -> bool {
    width == height && width >= target
}

fn subfolders(root: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(root) else {
        return Vec::new();
    };
    let mut folders: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    folders.sort();
    folders
}

/// Ensure every subfolder's `file_name` is square and at least
/// `target_size` pixels wide.
///
/// A missing or non-directory `root` yields empty stats. Per-file failures
/// are counted in `errors` and never stop the pass.
pub fn ensure_main_image_size(
    backend: &impl ImageBackend,
    root: &Path,
    target_size: u32,
    file_name: &str,
) -> AdjustmentStats {
    let mut stats = AdjustmentStats::default();
    if !root.is_dir() {
        warn!(root = %root.display(), "Main-image root is not a directory");
        return stats;
    }

    for folder in subfolders(root) {
        stats.total_folders += 1;
        let path = folder.join(file_name);
        if !path.is_file() {
            debug!(path = %path.display(), "Main image missing");
            stats.missing_files += 1;
            continue;
        }

        stats.inspected_files += 1;
        let image = match backend.load(&path) {
            Ok(image) => image,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not read main image");
                stats.errors += 1;
                continue;
            }
        };

        let size = (image.width(), image.height());
        if is_compliant(size, target_size) {
            debug!(path = %path.display(), width = size.0, height = size.1, "Main image compliant");
            continue;
        }

        let resized = image.resize_exact(target_size, target_size, FilterType::Lanczos3);
        match backend.save(&resized, &path, Quality::default()) {
            Ok(()) => {
                info!(
                    path = %path.display(),
                    from = %format!("{}x{}", size.0, size.1),
                    to = target_size,
                    "Main image resized"
                );
                stats.adjusted_files += 1;
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not write main image");
                stats.errors += 1;
            }
        }
    }

    info!(
        folders = stats.total_folders,
        inspected = stats.inspected_files,
        adjusted = stats.adjusted_files,
        missing = stats.missing_files,
        errors = stats.errors,
        "Main-image pass complete"
    );
    stats
}
