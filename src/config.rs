//! Job configuration.
//!
//! A batch run is described by a single TOML job file. Every key is optional
//! except `sources`; missing keys take the stock defaults below. Relative paths
//! are resolved against the directory containing the job file.
//!
//! ## Configuration Options
//!
//! ```toml
//! sources = ["photos"]          # Files or directories to scan
//! recursive = true              # Descend into subdirectories
//! include_patterns = ["*.jpg", "*.jpeg", "*.png"]
//! exclude_patterns = []
//! max_workers = 4               # 1 = sequential; capped at CPU cores
//! # random_seed = 42            # Omit for a fresh seed every run
//! report_filename = "report.csv"
//!
//! [output]
//! output_dir = "output"
//! conflict_strategy = "rename"  # overwrite | skip | rename
//! flatten_structure = true
//! jpeg_quality = 95
//!
//! [styling]
//! aspect_ratio = [1, 1]
//! min_size = [800, 800]
//! mode = "contain"              # contain | cover
//! background_color = "#000000"
//! # border_color = "#ffffff"
//! border_thickness = 0
//! # border_image = "frame.png"
//!
//! [anti_dedup]
//! mode = "none"                 # none | light | medium | heavy
//! allow_mirror = false
//! noise_strength = 0.01
//! color_jitter_strength = 0.02
//! rotation_range = [-0.5, 0.5]
//! crop_margin = 0.01
//!
//! [anti_dedup.watermark]
//! enabled = false
//! text = ""
//! count_range = [3, 5]
//! opacity_range = [0.05, 0.15]
//! rotation_range = [-5.0, 5.0]
//! scale_range = [0.02, 0.05]
//!
//! [anti_dedup.texture]
//! enabled = false
//! # image_path = "paper.png"
//! opacity = 0.3
//!
//! [validation]
//! enabled = false
//! ```
//!
//! Unknown keys are rejected to catch typos early. Enumerated values
//! (`mode`, `conflict_strategy`) are parsed into enums, so an unrecognized
//! strategy is a load-time error rather than a surprise halfway through a batch.

use crate::colors::{self, ColorError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Config validation error: {0}")]
    Color(#[from] ColorError),
}

/// Everything one batch run needs. Built once, then only read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Files or directories to scan.
    pub sources: Vec<PathBuf>,
    pub output: OutputConfig,
    pub styling: StylingConfig,
    pub anti_dedup: AntiDedupConfig,
    pub validation: ValidationConfig,
    /// Descend into subdirectories of directory roots.
    pub recursive: bool,
    /// Case-insensitive globs matched against the file name.
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    /// Worker count. `1` runs tasks on the calling thread.
    pub max_workers: usize,
    /// Seed for the batch generator. `None` draws one from system entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// File name of the CSV report inside the output directory.
    pub report_filename: String,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            output: OutputConfig::default(),
            styling: StylingConfig::default(),
            anti_dedup: AntiDedupConfig::default(),
            validation: ValidationConfig::default(),
            recursive: true,
            include_patterns: default_include_patterns(),
            exclude_patterns: Vec::new(),
            max_workers: 4,
            random_seed: None,
            report_filename: "report.csv".to_string(),
        }
    }
}

fn default_include_patterns() -> Vec<String> {
    vec!["*.jpg".into(), "*.jpeg".into(), "*.png".into()]
}

impl JobConfig {
    /// A default job reading from `sources` and writing into `output_dir`.
    pub fn new(sources: Vec<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            output: OutputConfig {
                output_dir: output_dir.into(),
                ..OutputConfig::default()
            },
            ..Self::default()
        }
    }

    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Validation(
                "sources must list at least one file or directory".into(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Validation("max_workers must be >= 1".into()));
        }
        if self.report_filename.trim().is_empty() {
            return Err(ConfigError::Validation(
                "report_filename must not be empty".into(),
            ));
        }
        self.output.validate()?;
        self.styling.validate()?;
        self.anti_dedup.validate()?;
        Ok(())
    }

    /// Resolve every relative path in the config against `base`.
    pub fn resolve_paths(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.sources = self.sources.into_iter().map(resolve).collect();
        self.output.output_dir = resolve(self.output.output_dir);
        self.styling.border_image = self.styling.border_image.map(resolve);
        self.anti_dedup.texture.image_path = self.anti_dedup.texture.image_path.map(resolve);
        self
    }
}

/// Where and how results are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub conflict_strategy: ConflictStrategy,
    /// Write every output directly into `output_dir` instead of mirroring
    /// the source tree.
    pub flatten_structure: bool,
    /// JPEG encoding quality (1-100). PNG output is lossless.
    pub jpeg_quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            conflict_strategy: ConflictStrategy::Rename,
            flatten_structure: true,
            jpeg_quality: 95,
        }
    }
}

impl OutputConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(ConfigError::Validation(
                "output.jpeg_quality must be 1-100".into(),
            ));
        }
        Ok(())
    }
}

/// Policy for a destination that is already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    Overwrite,
    Skip,
    #[default]
    Rename,
}

/// How the source is fitted into the target canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Fit inside the canvas, pad with the background color.
    #[default]
    Contain,
    /// Fill the canvas, center-crop the overflow.
    Cover,
}

/// Canvas size, fit mode and borders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylingConfig {
    /// Target aspect ratio as `(width, height)`.
    pub aspect_ratio: (u32, u32),
    /// Minimum output size as `(width, height)`, before borders.
    pub min_size: (u32, u32),
    pub mode: FitMode,
    /// Hex color used to pad `contain` output.
    pub background_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    /// Solid border width in pixels on each edge.
    pub border_thickness: u32,
    /// Overlay image stretched to the final canvas and alpha-composited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_image: Option<PathBuf>,
}

impl Default for StylingConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: (1, 1),
            min_size: (800, 800),
            mode: FitMode::Contain,
            background_color: "#000000".to_string(),
            border_color: None,
            border_thickness: 0,
            border_image: None,
        }
    }
}

impl StylingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.aspect_ratio.0 == 0 || self.aspect_ratio.1 == 0 {
            return Err(ConfigError::Validation(
                "styling.aspect_ratio values must be non-zero".into(),
            ));
        }
        if self.min_size.0 == 0 || self.min_size.1 == 0 {
            return Err(ConfigError::Validation(
                "styling.min_size values must be non-zero".into(),
            ));
        }
        colors::parse_hex_color(&self.background_color)?;
        if let Some(border) = &self.border_color {
            colors::parse_hex_color(border)?;
        }
        Ok(())
    }
}

/// Strength tier of the anti-dedup pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AntiDedupMode {
    #[default]
    None,
    /// Mirror, color jitter, noise.
    Light,
    /// Light + small rotation.
    Medium,
    /// Medium + watermark swarm.
    Heavy,
}

impl AntiDedupMode {
    pub fn jitters(self) -> bool {
        self != AntiDedupMode::None
    }

    pub fn rotates(self) -> bool {
        matches!(self, AntiDedupMode::Medium | AntiDedupMode::Heavy)
    }

    pub fn watermarks(self) -> bool {
        self == AntiDedupMode::Heavy
    }
}

/// Stochastic perturbation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AntiDedupConfig {
    pub mode: AntiDedupMode,
    pub allow_mirror: bool,
    /// Noise amplitude as a fraction of the full 0-255 range.
    pub noise_strength: f64,
    /// Maximum relative change of brightness, contrast and saturation.
    pub color_jitter_strength: f64,
    /// Rotation angle range in degrees.
    pub rotation_range: (f64, f64),
    /// Over-scan applied before rotating so the corners stay filled.
    pub crop_margin: f64,
    pub watermark: WatermarkConfig,
    pub texture: TextureConfig,
}

impl Default for AntiDedupConfig {
    fn default() -> Self {
        Self {
            mode: AntiDedupMode::None,
            allow_mirror: false,
            noise_strength: 0.01,
            color_jitter_strength: 0.02,
            rotation_range: (-0.5, 0.5),
            crop_margin: 0.01,
            watermark: WatermarkConfig::default(),
            texture: TextureConfig::default(),
        }
    }
}

impl AntiDedupConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("anti_dedup.noise_strength", self.noise_strength)?;
        non_negative(
            "anti_dedup.color_jitter_strength",
            self.color_jitter_strength,
        )?;
        non_negative("anti_dedup.crop_margin", self.crop_margin)?;
        finite_range("anti_dedup.rotation_range", self.rotation_range)?;
        self.watermark.validate()?;
        self.texture.validate()?;
        Ok(())
    }
}

/// Faint repeated text marks, heavy mode only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Accepted for job-file compatibility. Stamping follows the mode.
    pub enabled: bool,
    /// Text to stamp. Empty falls back to a built-in default.
    pub text: String,
    pub count_range: (u32, u32),
    pub opacity_range: (f64, f64),
    /// Per-placement rotation in degrees.
    pub rotation_range: (f64, f64),
    /// Added to a base scale of 0.5 per placement.
    pub scale_range: (f64, f64),
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: String::new(),
            count_range: (3, 5),
            opacity_range: (0.05, 0.15),
            rotation_range: (-5.0, 5.0),
            scale_range: (0.02, 0.05),
        }
    }
}

impl WatermarkConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        finite_range("anti_dedup.watermark.opacity_range", self.opacity_range)?;
        finite_range("anti_dedup.watermark.rotation_range", self.rotation_range)?;
        finite_range("anti_dedup.watermark.scale_range", self.scale_range)?;
        Ok(())
    }
}

/// Texture image blended over the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TextureConfig {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    /// Blend weight of the texture, clamped to 0-1 at use.
    pub opacity: f64,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            image_path: None,
            opacity: 0.3,
        }
    }
}

impl TextureConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.opacity.is_finite() {
            return Err(ConfigError::Validation(
                "anti_dedup.texture.opacity must be a finite number".into(),
            ));
        }
        Ok(())
    }
}

/// Similarity metrics between source and output, written to the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    pub enabled: bool,
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{name} must be a finite number >= 0"
        )));
    }
    Ok(())
}

fn finite_range(name: &str, (lo, hi): (f64, f64)) -> Result<(), ConfigError> {
    if !lo.is_finite() || !hi.is_finite() {
        return Err(ConfigError::Validation(format!(
            "{name} bounds must be finite numbers"
        )));
    }
    Ok(())
}

/// Order a `(lo, hi)` pair so that `lo <= hi`.
pub fn normalized<T: PartialOrd>((a, b): (T, T)) -> (T, T) {
    if a > b { (b, a) } else { (a, b) }
}

/// Resolve the effective worker count.
///
/// User can constrain down, not up: values above the core count are clamped.
pub fn effective_workers(max_workers: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    max_workers.clamp(1, cores)
}

/// Load a job file, resolve its relative paths and validate it.
pub fn load_config(path: &Path) -> Result<JobConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: JobConfig = toml::from_str(&content)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let config = config.resolve_paths(base);
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock job file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Restyle Job Configuration
# =========================
# Every key except `sources` is optional. Relative paths resolve against
# the directory containing this file.

# Files or directories to scan.
sources = ["input"]

# Descend into subdirectories.
recursive = true

# Case-insensitive globs on the file name. Only .jpg/.jpeg/.png are ever kept.
include_patterns = ["*.jpg", "*.jpeg", "*.png"]
exclude_patterns = []

# Parallel workers. 1 processes images one by one on the main thread.
max_workers = 4

# Fix the seed to make output byte-reproducible across runs.
# random_seed = 42

report_filename = "report.csv"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
output_dir = "output"

# What to do when the destination exists: overwrite | skip | rename
# rename writes name_1.ext, name_2.ext, ...
conflict_strategy = "rename"

# true: write all files into output_dir. false: mirror the source tree.
flatten_structure = true

jpeg_quality = 95

# ---------------------------------------------------------------------------
# Styling
# ---------------------------------------------------------------------------
[styling]
# Output canvas is the smallest size with this exact ratio that is at least
# min_size in both axes.
aspect_ratio = [1, 1]
min_size = [800, 800]

# contain: fit inside and pad with background_color
# cover:   fill and crop the overflow
mode = "contain"
background_color = "#000000"

# Solid border added around the canvas (needs both keys).
# border_color = "#ffffff"
border_thickness = 0

# PNG overlay stretched over the final canvas.
# border_image = "frame.png"

# ---------------------------------------------------------------------------
# Anti-dedup perturbations
# ---------------------------------------------------------------------------
[anti_dedup]
# none | light (mirror, jitter, noise) | medium (+ rotation) | heavy (+ watermarks)
mode = "none"
allow_mirror = false
noise_strength = 0.01
color_jitter_strength = 0.02
rotation_range = [-0.5, 0.5]
crop_margin = 0.01

[anti_dedup.watermark]
enabled = false
text = ""
count_range = [3, 5]
opacity_range = [0.05, 0.15]
rotation_range = [-5.0, 5.0]
scale_range = [0.02, 0.05]

[anti_dedup.texture]
enabled = false
# image_path = "paper.png"
opacity = 0.3

# ---------------------------------------------------------------------------
# Validation metrics (pHash distance, SSIM) in the report
# ---------------------------------------------------------------------------
[validation]
enabled = false
"##
}
