//! Output destination resolution.
//!
//! Destinations are decided one source at a time, in scan order, on the
//! coordinating thread, before any image is processed. Every path handed out
//! for writing goes into a [`Reservations`] set, so a later source whose
//! natural destination collides with an earlier one is treated exactly as if
//! the file already existed on disk. This keeps naming deterministic no matter
//! how the tasks are later scheduled.
//!
//! | Destination state | Overwrite | Skip | Rename |
//! |---|---|---|---|
//! | free | `write` | `write` | `write` |
//! | on disk or reserved | `overwrite` | `skip` | `rename` to `stem_N.ext` |

use crate::config::{ConflictStrategy, OutputConfig};
use crate::types::{DestinationAction, DestinationDecision, SourceImage};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DestinationError {
    #[error("Cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Source has no file name: {0}")]
    NoFileName(PathBuf),
}

/// Paths already promised to a source in the current batch.
#[derive(Debug, Default)]
pub struct Reservations {
    paths: HashSet<PathBuf>,
}

impl Reservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Returns `false` if the path was already reserved.
    pub fn reserve(&mut self, path: PathBuf) -> bool {
        self.paths.insert(path)
    }
}

/// Maps sources to output paths under one [`OutputConfig`].
#[derive(Debug)]
pub struct DestinationResolver {
    output_dir: PathBuf,
    strategy: ConflictStrategy,
    flatten: bool,
    /// `false` for planning runs that must leave the filesystem untouched.
    create_dirs: bool,
}

fn create_dir(path: &Path) -> Result<(), DestinationError> {
    fs::create_dir_all(path).map_err(|source| DestinationError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

impl DestinationResolver {
    /// Create the output directory and remember its canonical location.
    pub fn new(config: &OutputConfig) -> Result<Self, DestinationError> {
        create_dir(&config.output_dir)?;
        let output_dir =
            fs::canonicalize(&config.output_dir).unwrap_or_else(|_| config.output_dir.clone());
        Ok(Self {
            output_dir,
            strategy: config.conflict_strategy,
            flatten: config.flatten_structure,
            create_dirs: true,
        })
    }

    /// Resolver that decides like [`new`](Self::new) but never creates
    /// directories.
    pub fn planning(config: &OutputConfig) -> Self {
        Self {
            output_dir: fs::canonicalize(&config.output_dir)
                .unwrap_or_else(|_| config.output_dir.clone()),
            strategy: config.conflict_strategy,
            flatten: config.flatten_structure,
            create_dirs: false,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Natural destination of `source`, before conflict handling.
    pub fn candidate(&self, source: &SourceImage) -> Result<PathBuf, DestinationError> {
        if self.flatten {
            let name = source
                .source_path
                .file_name()
                .ok_or_else(|| DestinationError::NoFileName(source.source_path.clone()))?;
            Ok(self.output_dir.join(name))
        } else {
            Ok(self.output_dir.join(&source.relative_path))
        }
    }

    /// Decide where `source` is written and reserve the result.
    ///
    /// Creates the destination's parent directory. Skip decisions reserve
    /// nothing since nothing will be written.
    pub fn decide(
        &self,
        source: &SourceImage,
        reservations: &mut Reservations,
    ) -> Result<DestinationDecision, DestinationError> {
        let destination = self.candidate(source)?;
        if let Some(parent) = destination.parent().filter(|_| self.create_dirs) {
            create_dir(parent)?;
        }

        let on_disk = destination.exists();
        if !on_disk && !reservations.contains(&destination) {
            reservations.reserve(destination.clone());
            return Ok(DestinationDecision {
                destination: Some(destination),
                action: DestinationAction::Write,
                note: None,
            });
        }

        let name = display_name(&destination);
        let conflict = if on_disk {
            format!("destination exists: {name}")
        } else {
            format!("destination taken by an earlier source: {name}")
        };

        let decision = match self.strategy {
            ConflictStrategy::Overwrite => DestinationDecision {
                destination: Some(destination),
                action: DestinationAction::Overwrite,
                note: Some(conflict),
            },
            ConflictStrategy::Skip => {
                return Ok(DestinationDecision {
                    destination: Some(destination),
                    action: DestinationAction::Skip,
                    note: Some(conflict),
                });
            }
            ConflictStrategy::Rename => {
                let renamed = next_free_name(&destination, reservations);
                let note = format!("{conflict} -> renamed to {}", display_name(&renamed));
                DestinationDecision {
                    destination: Some(renamed),
                    action: DestinationAction::Rename,
                    note: Some(note),
                }
            }
        };

        if let Some(path) = &decision.destination {
            reservations.reserve(path.clone());
        }
        Ok(decision)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// First `stem_N.ext` (N from 1) that is neither on disk nor reserved.
fn next_free_name(destination: &Path, reservations: &Reservations) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = destination
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u64..)
        .map(|index| destination.with_file_name(format!("{stem}_{index}{suffix}")))
        .find(|candidate| !candidate.exists() && !reservations.contains(candidate))
        .unwrap_or_else(|| destination.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(root: &Path, rel: &str) -> SourceImage {
        SourceImage {
            source_path: root.join(rel),
            root: root.to_path_buf(),
            relative_path: PathBuf::from(rel),
        }
    }

    fn resolver(out: &Path, strategy: ConflictStrategy, flatten: bool) -> DestinationResolver {
        DestinationResolver::new(&OutputConfig {
            output_dir: out.to_path_buf(),
            conflict_strategy: strategy,
            flatten_structure: flatten,
            ..OutputConfig::default()
        })
        .unwrap()
    }

    fn file_name(decision: &DestinationDecision) -> String {
        display_name(decision.destination.as_ref().unwrap())
    }

    #[test]
    fn new_creates_output_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("a/b/out");
        resolver(&out, ConflictStrategy::Rename, true);
        assert!(out.is_dir());
    }

    #[test]
    fn free_destination_is_written_and_reserved() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Rename, true);
        let mut reservations = Reservations::new();

        let decision = r.decide(&source(Path::new("/in"), "a.png"), &mut reservations).unwrap();
        assert_eq!(decision.action, DestinationAction::Write);
        assert_eq!(decision.note, None);
        assert!(reservations.contains(decision.destination.as_ref().unwrap()));
    }

    #[test]
    fn flatten_uses_file_name_only() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Rename, true);
        let decision = r
            .decide(&source(Path::new("/in"), "trip/day1/a.png"), &mut Reservations::new())
            .unwrap();
        assert_eq!(
            decision.destination.unwrap(),
            r.output_dir().join("a.png")
        );
    }

    #[test]
    fn nested_structure_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Rename, false);
        let decision = r
            .decide(&source(Path::new("/in"), "trip/day1/a.png"), &mut Reservations::new())
            .unwrap();
        let dest = decision.destination.unwrap();
        assert_eq!(dest, r.output_dir().join("trip/day1/a.png"));
        assert!(dest.parent().unwrap().is_dir());
    }

    #[test]
    fn rename_skips_disk_and_reserved_names() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Rename, true);
        fs::write(r.output_dir().join("dup.png"), b"old").unwrap();
        fs::write(r.output_dir().join("dup_1.png"), b"old").unwrap();
        let mut reservations = Reservations::new();

        let first = r.decide(&source(Path::new("/a"), "dup.png"), &mut reservations).unwrap();
        let second = r.decide(&source(Path::new("/b"), "dup.png"), &mut reservations).unwrap();
        assert_eq!(first.action, DestinationAction::Rename);
        assert_eq!(file_name(&first), "dup_2.png");
        assert_eq!(file_name(&second), "dup_3.png");
        assert!(first.note.unwrap().contains("renamed to dup_2.png"));
    }

    #[test]
    fn rename_resolves_in_batch_collisions() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Rename, true);
        let mut reservations = Reservations::new();

        let names: Vec<_> = ["x", "y", "z", "w"]
            .iter()
            .map(|root| {
                let d = r
                    .decide(&source(&Path::new("/").join(root), "dup.png"), &mut reservations)
                    .unwrap();
                file_name(&d)
            })
            .collect();
        assert_eq!(names, vec!["dup.png", "dup_1.png", "dup_2.png", "dup_3.png"]);
        assert!(reservations.contains(&r.output_dir().join("dup_3.png")));
    }

    #[test]
    fn skip_keeps_path_without_reserving() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Skip, true);
        fs::write(r.output_dir().join("a.png"), b"old").unwrap();
        let mut reservations = Reservations::new();

        let decision = r.decide(&source(Path::new("/in"), "a.png"), &mut reservations).unwrap();
        assert_eq!(decision.action, DestinationAction::Skip);
        assert!(decision.note.unwrap().starts_with("destination exists"));
        assert!(!reservations.contains(&r.output_dir().join("a.png")));
    }

    #[test]
    fn skip_applies_to_reserved_paths_too() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Skip, true);
        let mut reservations = Reservations::new();

        let first = r.decide(&source(Path::new("/a"), "a.png"), &mut reservations).unwrap();
        let second = r.decide(&source(Path::new("/b"), "a.png"), &mut reservations).unwrap();
        assert_eq!(first.action, DestinationAction::Write);
        assert_eq!(second.action, DestinationAction::Skip);
        assert!(second.note.unwrap().contains("earlier source"));
    }

    #[test]
    fn overwrite_keeps_same_path() {
        let tmp = TempDir::new().unwrap();
        let r = resolver(&tmp.path().join("out"), ConflictStrategy::Overwrite, true);
        fs::write(r.output_dir().join("a.png"), b"old").unwrap();

        let decision = r
            .decide(&source(Path::new("/in"), "a.png"), &mut Reservations::new())
            .unwrap();
        assert_eq!(decision.action, DestinationAction::Overwrite);
        assert_eq!(decision.destination.unwrap(), r.output_dir().join("a.png"));
    }

    #[test]
    fn planning_never_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let r = DestinationResolver::planning(&OutputConfig {
            output_dir: out.clone(),
            flatten_structure: false,
            ..OutputConfig::default()
        });
        let mut reservations = Reservations::new();
        let first = r.decide(&source(Path::new("/in"), "x/a.png"), &mut reservations).unwrap();
        let second = r.decide(&source(Path::new("/in"), "x/a.png"), &mut reservations).unwrap();

        assert_eq!(first.destination.unwrap(), out.join("x/a.png"));
        assert_eq!(file_name(&second), "a_1.png");
        assert!(!out.exists());
    }

    #[test]
    fn next_free_name_without_extension() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("README");
        assert_eq!(
            next_free_name(&path, &Reservations::new()),
            tmp.path().join("README_1")
        );
    }
}
