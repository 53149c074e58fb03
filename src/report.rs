//! CSV outcome report.
//!
//! One header row, then one row per outcome:
//!
//! ```text
//! source_path,output_path,status,message,phash_distance,ssim
//! /in/a.png,/out/a.png,processed,antidedup: noise(strength=0.010),,
//! /in/b.png,,error-load,Failed to decode /in/b.png: ...,,
//! ```
//!
//! Absent values are empty cells. SSIM is written with six decimals.

use crate::types::FileOutcome;
use csv::WriterBuilder;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub const HEADER: [&str; 6] = [
    "source_path",
    "output_path",
    "status",
    "message",
    "phash_distance",
    "ssim",
];

fn row(outcome: &FileOutcome) -> [String; 6] {
    [
        outcome.source_path.display().to_string(),
        outcome
            .output_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
        outcome.status.to_string(),
        outcome.message.clone().unwrap_or_default(),
        outcome
            .phash_distance
            .map(|d| d.to_string())
            .unwrap_or_default(),
        outcome.ssim.map(|s| format!("{s:.6}")).unwrap_or_default(),
    ]
}

/// Write `outcomes` to `output_dir/filename`, returning the report path.
pub fn write_csv_report<'a>(
    outcomes: impl IntoIterator<Item = &'a FileOutcome>,
    output_dir: &Path,
    filename: &str,
) -> Result<PathBuf, ReportError> {
    let report_path = output_dir.join(filename);
    let mut writer = WriterBuilder::new().from_path(&report_path)?;
    writer.write_record(HEADER)?;
    for outcome in outcomes {
        writer.write_record(row(outcome))?;
    }
    writer.flush()?;
    Ok(report_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OutcomeStatus;
    use csv::ReaderBuilder;
    use tempfile::TempDir;

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new().has_headers(false).from_path(path).unwrap();
        reader
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    #[test]
    fn writes_header_and_rows() {
        let tmp = TempDir::new().unwrap();
        let mut ok = FileOutcome::new("/in/a.png", OutcomeStatus::Processed)
            .with_output("/out/a.png")
            .with_message(Some("antidedup: mirror, noise(strength=0.010)".into()));
        ok.phash_distance = Some(4);
        ok.ssim = Some(0.93);
        let failed = FileOutcome::failed("/in/b.png", OutcomeStatus::ErrorLoad, "bad header");

        let path = write_csv_report([&ok, &failed], tmp.path(), "report.csv").unwrap();
        assert_eq!(path, tmp.path().join("report.csv"));

        let rows = read_rows(&path);
        assert_eq!(rows[0], HEADER.to_vec());
        assert_eq!(
            rows[1],
            vec![
                "/in/a.png",
                "/out/a.png",
                "processed",
                "antidedup: mirror, noise(strength=0.010)",
                "4",
                "0.930000"
            ]
        );
        assert_eq!(rows[2], vec!["/in/b.png", "", "error-load", "bad header", "", ""]);
    }

    #[test]
    fn empty_batch_still_has_header() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv_report(std::iter::empty(), tmp.path(), "empty.csv").unwrap();
        assert_eq!(read_rows(&path), vec![HEADER.to_vec()]);
    }

    #[test]
    fn unwritable_directory_errors() {
        let result = write_csv_report(std::iter::empty(), Path::new("/nonexistent/dir"), "r.csv");
        assert!(result.is_err());
    }
}
