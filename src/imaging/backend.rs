//! Image decode/encode backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the only place the pipeline touches image
//! files. Everything between `load` and `save` works on in-memory
//! [`DynamicImage`]s, so the pixel transforms are testable without disk I/O.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust on top of the
//! `image` crate.

use super::params::Quality;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Trait for image I/O backends.
///
/// `Sync` because one backend instance is shared by every worker thread.
pub trait ImageBackend: Sync {
    /// Decode an image, apply its EXIF orientation and convert it to RGB8.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `image` to `path`, choosing the container from the extension.
    fn save(&self, image: &DynamicImage, path: &Path, quality: Quality)
    -> Result<(), BackendError>;
}
