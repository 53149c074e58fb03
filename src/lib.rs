//! # Restyle
//!
//! Batch image restyling for listing photos. Every source image is fitted to
//! a fixed aspect ratio and minimum size, optionally framed, then optionally
//! nudged by small random perturbations (mirror, color jitter, noise,
//! rotation, faint watermarks) so that near-identical listings stop matching
//! each other in duplicate detectors.
//!
//! # Architecture: Plan, Then Execute
//!
//! ```text
//! 1. Scan      job.toml  →  [SourceImage]          (filesystem → sorted list)
//! 2. Decide    sources   →  [ProcessingTask]       (destinations + seeds, sequential)
//! 3. Execute   tasks     →  [FileOutcome]          (sequential or rayon pool)
//! 4. Report    outcomes  →  report.csv + summary
//! ```
//!
//! Everything that could depend on scheduling (output names, random seeds)
//! is fixed in step 2 on one thread. Step 3 only runs pure per-image work,
//! so a fixed `random_seed` reproduces a batch byte for byte regardless of
//! the worker count.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML job file: defaults, validation, stock config |
//! | [`scan`] | Source discovery with include/exclude globs |
//! | [`destination`] | Output paths and conflict policy (overwrite, skip, rename) |
//! | [`imaging`] | Backend, styling transform, anti-dedup engine, dimension math |
//! | [`task`] | One self-contained unit of per-image work |
//! | [`executor`] | Unordered parallel map with panic isolation |
//! | [`batch`] | Orchestrator tying the stages together |
//! | [`report`] | CSV outcome report |
//! | [`validation`] | pHash distance and SSIM between source and output |
//! | [`main_image`] | Standalone square-cover enforcement |
//! | [`colors`] | Hex color parsing |
//! | [`types`] | Value types passed between stages |
//! | [`output`] | CLI output formatting |
//! | [`logging`] | `tracing` subscriber setup for the binary |
//!
//! # Design Decisions
//!
//! ## Explicit Seeds Instead of Global Randomness
//!
//! Each task owns a `StdRng` seeded from a value drawn, in scan order, from
//! one batch generator. Workers never share a generator, so the draws an
//! image sees cannot depend on which thread ran it or when.
//!
//! ## Reservations Instead of Filesystem Races
//!
//! Two sources with the same file name would race for the same output path
//! if workers checked the disk themselves. The resolver instead hands out
//! every path up front and remembers it, treating an earlier reservation
//! exactly like a file already on disk.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling and encoding use the `image` crate; rotation uses
//! `imageproc`. No system libraries are needed, so the binary is fully
//! self-contained.

pub mod batch;
pub mod colors;
pub mod config;
pub mod destination;
pub mod executor;
pub mod imaging;
pub mod logging;
pub mod main_image;
pub mod output;
pub mod report;
pub mod scan;
pub mod task;
pub mod types;
pub mod validation;
