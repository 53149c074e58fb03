//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` + EXIF orientation |
//! | **Fit / fill** | Lanczos3 `resize` / `resize_to_fill` |
//! | **Rotate** | `imageproc::geometric_transformations::rotate_about_center` |
//! | **Watermark text** | built-in 5×7 bitmap font |
//! | **Encode** | JPEG (quality) or PNG (lossless) by extension |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing encoder settings
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Styling** and **Anti-dedup**: in-memory transforms between load and save

pub mod antidedup;
pub mod backend;
pub mod calculations;
pub mod glyphs;
mod params;
pub mod rust_backend;
pub mod styling;

pub use antidedup::{AntiDedupError, apply_antidedup};
pub use backend::{BackendError, ImageBackend};
pub use params::Quality;
pub use rust_backend::{RustBackend, supported_extensions};
pub use styling::{StyleError, apply_styling};
