//! Runs the `restyle` binary the way a user would.

use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn restyle(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_restyle"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_job(dir: &Path, extra: &str) {
    let job = format!(
        r#"sources = ["in"]
random_seed = 11
max_workers = 2
{extra}
[output]
output_dir = "out"

[styling]
min_size = [32, 32]
"#
    );
    fs::write(dir.join("job.toml"), job).unwrap();
}

fn write_source(dir: &Path, name: &str) {
    let path = dir.join("in").join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(20, 10, Rgb([30, 60, 90])).save(path).unwrap();
}

#[test]
fn run_processes_job_and_prints_json() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "a.png");
    write_source(tmp.path(), "b.png");
    write_job(tmp.path(), "");

    let out = restyle(tmp.path(), &["run", "job.toml", "--json"]);
    assert!(
        out.status.success(),
        "run failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );

    let result: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(result["succeeded"].as_array().unwrap().len(), 2);
    assert!(result["failed"].as_array().unwrap().is_empty());

    let written = image::open(tmp.path().join("out").join("a.png")).unwrap();
    assert_eq!((written.width(), written.height()), (32, 32));
    assert!(tmp.path().join("out").join("report.csv").is_file());
}

#[test]
fn run_prints_summary_by_default() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "a.png");
    write_job(tmp.path(), "");

    let out = restyle(tmp.path(), &["run", "job.toml", "--workers", "1"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Processed 1, skipped 0, failed 0"), "{stdout}");
}

#[test]
fn invalid_job_fails_with_reason() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "a.png");
    write_job(tmp.path(), "[anti_dedup]\nnoise_strength = -1.0\n");

    for command in ["run", "check"] {
        let out = restyle(tmp.path(), &[command, "job.toml"]);
        assert!(!out.status.success(), "{command} accepted a bad job");
        assert!(String::from_utf8_lossy(&out.stderr).contains("noise_strength"));
    }
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn scan_lists_plan_without_writing() {
    let tmp = TempDir::new().unwrap();
    write_source(tmp.path(), "x/dup.png");
    write_source(tmp.path(), "y/dup.png");
    write_job(tmp.path(), "");

    let out = restyle(tmp.path(), &["scan", "job.toml"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Sources (2)"), "{stdout}");
    assert!(stdout.contains("dup_1.png (rename)"), "{stdout}");
    assert!(!tmp.path().join("out").exists());
}

#[test]
fn generated_config_passes_check() {
    let tmp = TempDir::new().unwrap();
    let generated = restyle(tmp.path(), &["gen-config"]);
    assert!(generated.status.success());
    fs::write(tmp.path().join("job.toml"), &generated.stdout).unwrap();

    let out = restyle(tmp.path(), &["check", "job.toml"]);
    assert!(
        out.status.success(),
        "check failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(String::from_utf8_lossy(&out.stdout).contains("Job is valid"));
}
