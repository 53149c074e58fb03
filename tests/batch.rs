//! End-to-end runs through the public API with real files on disk.

use image::{DynamicImage, Rgb, RgbImage};
use restyle::batch::{plan_batch, process_batch};
use restyle::config::{AntiDedupMode, ConflictStrategy, FitMode, JobConfig};
use restyle::imaging::RustBackend;
use restyle::main_image::{DEFAULT_FILE_NAME, ensure_main_image_size};
use restyle::types::{DestinationAction, OutcomeStatus};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Diagonal gradient, so every transform visibly changes pixels.
fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

fn write_image(path: &Path, width: u32, height: u32) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    gradient(width, height).save(path).unwrap();
}

fn job(input: &Path, output: &Path) -> JobConfig {
    let mut config = JobConfig::new(vec![input.to_path_buf()], output);
    config.random_seed = Some(7);
    config.max_workers = 1;
    config
}

fn output_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n != "report.csv")
        .collect();
    names.sort();
    names
}

// =========================================================================
// Mixed inputs
// =========================================================================

#[test]
fn valid_corrupt_and_foreign_files() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("photo.jpg"), 400, 300);
    fs::write(input.join("broken.png"), b"definitely not a png").unwrap();
    fs::write(input.join("notes.txt"), b"ignored").unwrap();

    let result = process_batch(&job(&input, &output), None).unwrap();

    assert_eq!(result.succeeded.len(), 1);
    assert_eq!(result.failed.len(), 1);
    assert!(result.skipped.is_empty());
    assert_eq!(result.failed[0].status, OutcomeStatus::ErrorLoad);

    let written = result.succeeded[0].output_path.clone().unwrap();
    assert_eq!(written.file_name().unwrap(), "photo.jpg");
    let decoded = image::open(&written).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 800));

    let report = fs::read_to_string(result.report_path.unwrap()).unwrap();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        "source_path,output_path,status,message,phash_distance,ssim"
    );
    assert!(lines[1].contains("broken.png") && lines[1].contains("error-load"));
    assert!(lines[2].contains("photo.jpg") && lines[2].contains(",processed,"));
}

// =========================================================================
// Styling
// =========================================================================

#[test]
fn cover_mode_crops_to_target() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("wide.png"), 400, 200);

    let mut config = job(&input, &output);
    config.styling.mode = FitMode::Cover;
    config.styling.min_size = (150, 150);

    let result = process_batch(&config, None).unwrap();
    let decoded = image::open(output.join("wide.png")).unwrap();
    assert_eq!(result.succeeded.len(), 1);
    assert_eq!((decoded.width(), decoded.height()), (150, 150));
}

#[test]
fn border_grows_canvas() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("tall.png"), 40, 80);

    let mut config = job(&input, &output);
    config.styling.min_size = (100, 100);
    config.styling.background_color = "#000".into();
    config.styling.border_color = Some("#ff0000".into());
    config.styling.border_thickness = 10;

    process_batch(&config, None).unwrap();
    let decoded = image::open(output.join("tall.png")).unwrap().into_rgb8();
    assert_eq!(decoded.dimensions(), (120, 120));
    assert_eq!(*decoded.get_pixel(0, 0), Rgb([255, 0, 0]));
    assert_eq!(*decoded.get_pixel(119, 60), Rgb([255, 0, 0]));
    // Left padding inside the border is background
    assert_eq!(*decoded.get_pixel(12, 60), Rgb([0, 0, 0]));
}

#[test]
fn compliant_png_is_untouched_without_antidedup() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("exact.png"), 120, 120);

    let mut config = job(&input, &output);
    config.styling.min_size = (120, 120);
    config.anti_dedup.mode = AntiDedupMode::None;

    let result = process_batch(&config, None).unwrap();
    assert_eq!(result.succeeded[0].message, None);

    let original = image::open(input.join("exact.png")).unwrap().into_rgb8();
    let written = image::open(output.join("exact.png")).unwrap().into_rgb8();
    assert_eq!(original, written);
}

// =========================================================================
// Destinations
// =========================================================================

#[test]
fn duplicate_names_are_renamed() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("a").join("dup.png"), 20, 20);
    write_image(&input.join("b").join("dup.png"), 20, 20);

    let mut config = job(&input, &output);
    config.styling.min_size = (32, 32);
    config.max_workers = 4;

    let result = process_batch(&config, None).unwrap();
    assert_eq!(result.succeeded.len(), 2);
    assert_eq!(output_files(&output), vec!["dup.png", "dup_1.png"]);

    let renamed = result
        .succeeded
        .iter()
        .find(|o| o.status == OutcomeStatus::ProcessedRename)
        .unwrap();
    assert!(renamed.source_path.ends_with("b/dup.png"));
    assert!(renamed.message.as_ref().unwrap().contains("renamed to dup_1.png"));
}

#[test]
fn nested_structure_is_mirrored() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("trip").join("day1").join("a.png"), 20, 20);

    let mut config = job(&input, &output);
    config.styling.min_size = (32, 32);
    config.output.flatten_structure = false;

    process_batch(&config, None).unwrap();
    assert!(output.join("trip").join("day1").join("a.png").is_file());
}

#[test]
fn skip_leaves_existing_file_alone() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("a.png"), 20, 20);
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("a.png"), b"precious").unwrap();

    let mut config = job(&input, &output);
    config.output.conflict_strategy = ConflictStrategy::Skip;

    let result = process_batch(&config, None).unwrap();
    assert_eq!(result.skipped.len(), 1);
    assert_eq!(result.skipped[0].status, OutcomeStatus::SkipExisting);
    assert_eq!(fs::read(output.join("a.png")).unwrap(), b"precious");
}

#[test]
fn overwrite_replaces_existing_file() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("a.png"), 20, 20);
    fs::create_dir_all(&output).unwrap();
    fs::write(output.join("a.png"), b"stale").unwrap();

    let mut config = job(&input, &output);
    config.styling.min_size = (32, 32);
    config.output.conflict_strategy = ConflictStrategy::Overwrite;

    let result = process_batch(&config, None).unwrap();
    assert_eq!(result.succeeded[0].status, OutcomeStatus::ProcessedOverwrite);
    let decoded = image::open(output.join("a.png")).unwrap();
    assert_eq!(decoded.width(), 32);
}

#[test]
fn overwrite_collisions_leave_the_last_source() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    let colors = [[200, 0, 0], [0, 200, 0], [0, 0, 200], [90, 90, 90]];
    for (dir, color) in ["a", "b", "c", "d"].iter().zip(colors) {
        let path = input.join(dir).join("dup.png");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(24, 24, Rgb(color)).save(&path).unwrap();
    }

    let mut config = job(&input, &output);
    config.styling.min_size = (24, 24);
    config.output.conflict_strategy = ConflictStrategy::Overwrite;
    config.max_workers = 4;

    for _ in 0..3 {
        let result = process_batch(&config, None).unwrap();
        assert_eq!(result.succeeded.len(), 4);
        assert_eq!(output_files(&output), vec!["dup.png"]);
        let written = image::open(output.join("dup.png")).unwrap().into_rgb8();
        assert_eq!(*written.get_pixel(12, 12), Rgb([90, 90, 90]));
    }
}

#[test]
fn plan_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("x").join("a.png"), 10, 10);
    write_image(&input.join("y").join("a.png"), 10, 10);

    let plan = plan_batch(&job(&input, &output)).unwrap();
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[1].decision.action, DestinationAction::Rename);
    assert!(!output.exists());
}

// =========================================================================
// Determinism
// =========================================================================

fn run_heavy(workers: usize) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
        write_image(&input.join(name), 96, 64);
    }

    let mut config = job(&input, &output);
    config.styling.min_size = (96, 96);
    config.anti_dedup.mode = AntiDedupMode::Heavy;
    config.anti_dedup.allow_mirror = true;
    config.max_workers = workers;

    let result = process_batch(&config, None).unwrap();
    assert_eq!(result.succeeded.len(), 5);
    (tmp, output)
}

#[test]
fn seeded_output_is_identical_across_worker_counts() {
    let (_seq_tmp, sequential) = run_heavy(1);
    let (_par_tmp, parallel) = run_heavy(4);

    let names = output_files(&sequential);
    assert_eq!(names, output_files(&parallel));
    for name in names {
        assert_eq!(
            fs::read(sequential.join(&name)).unwrap(),
            fs::read(parallel.join(&name)).unwrap(),
            "{name} differs between runs"
        );
    }
}

#[test]
fn antidedup_changes_pixels_but_keeps_size() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("in");
    let output = tmp.path().join("out");
    write_image(&input.join("a.png"), 64, 64);

    let mut config = job(&input, &output);
    config.styling.min_size = (64, 64);
    config.anti_dedup.mode = AntiDedupMode::Medium;
    config.validation.enabled = true;

    let result = process_batch(&config, None).unwrap();
    let outcome = &result.succeeded[0];
    assert!(outcome.message.as_ref().unwrap().starts_with("antidedup: "));
    assert!(outcome.ssim.is_some());
    assert!(outcome.phash_distance.is_some());

    let original = image::open(input.join("a.png")).unwrap().into_rgb8();
    let written = image::open(output.join("a.png")).unwrap().into_rgb8();
    assert_eq!(written.dimensions(), (64, 64));
    assert_ne!(original, written);
}

// =========================================================================
// Main-image utility
// =========================================================================

#[test]
fn ensure_main_resizes_real_files() {
    let tmp = TempDir::new().unwrap();
    write_image(&tmp.path().join("001").join(DEFAULT_FILE_NAME), 300, 200);
    write_image(&tmp.path().join("002").join(DEFAULT_FILE_NAME), 256, 256);
    fs::create_dir_all(tmp.path().join("003")).unwrap();

    let stats = ensure_main_image_size(&RustBackend::new(), tmp.path(), 256, DEFAULT_FILE_NAME);
    assert_eq!(stats.total_folders, 3);
    assert_eq!(stats.adjusted_files, 1);
    assert_eq!(stats.missing_files, 1);
    assert_eq!(stats.errors, 0);

    let fixed: DynamicImage = image::open(tmp.path().join("001").join(DEFAULT_FILE_NAME)).unwrap();
    assert_eq!((fixed.width(), fixed.height()), (256, 256));
}
