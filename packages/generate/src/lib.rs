#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Artifact generation for hotspot results.
//!
//! Rendering and persistence are separate steps. The [`render`] functions
//! turn pipeline results into in-memory [`Artifact`]s; [`write_artifacts`]
//! then persists a complete set. Every artifact is first written to a
//! `.tmp` sibling and only renamed into place once the whole set has been
//! written. Files being replaced are moved to a `.bak` sibling until every
//! rename has succeeded; if one fails, the renames already done are undone,
//! so a failure never leaves a mix of old and new outputs behind.
//!
//! A `manifest.json` listing the artifacts of the last run (names and byte
//! sizes) is written alongside them.

pub mod render;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Current manifest schema version.
const MANIFEST_VERSION: u32 = 1;

/// File name of the generation manifest.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Errors that can occur while rendering or persisting artifacts.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// I/O error while writing an artifact.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path that caused the error.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// CSV rendering failed.
    #[error("CSV error in {artifact}: {source}")]
    Csv {
        /// Artifact being rendered.
        artifact: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// JSON rendering failed.
    #[error("JSON error in {artifact}: {source}")]
    Json {
        /// Artifact being rendered.
        artifact: String,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// The clustered dataset cannot be aligned with its cluster labels.
    #[error("Cannot render {artifact}: {message}")]
    Mismatch {
        /// Artifact being rendered.
        artifact: String,
        /// Description of the mismatch.
        message: String,
    },
}

/// A fully rendered output file, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name relative to the output directory.
    pub file_name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Creates an artifact from a name and its contents.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// One manifest entry per persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManifestEntry {
    file_name: String,
    size_bytes: usize,
}

/// Record of the artifacts written by the last run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Manifest {
    version: u32,
    artifacts: Vec<ManifestEntry>,
}

/// Default output directory: `data/generated` under the workspace root.
///
/// Resolved at compile time from `CARGO_MANIFEST_DIR`, falling back to the
/// current directory if the workspace root cannot be determined.
#[must_use]
pub fn output_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
        .join("data/generated")
}

fn io_error(path: &Path, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Renames `tmp` over `path`, moving any existing file to a `.bak` sibling
/// first. Returns the backup path, if one was made. On failure `path` is
/// left as it was.
fn swap_in(tmp: &Path, path: &Path) -> Result<Option<PathBuf>, GenerateError> {
    let backup = if path.symlink_metadata().is_ok() {
        let backup = sibling(path, ".bak");
        std::fs::rename(path, &backup).map_err(|e| io_error(path, e))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = std::fs::rename(tmp, path) {
        if let Some(backup) = &backup {
            if let Err(restore) = std::fs::rename(backup, path) {
                log::error!("Failed to restore {}: {restore}", path.display());
            }
        }
        return Err(io_error(path, e));
    }

    Ok(backup)
}

/// Undoes committed renames, newest first.
fn roll_back(committed: &[(PathBuf, Option<PathBuf>)]) {
    for (path, backup) in committed.iter().rev() {
        let result = backup.as_ref().map_or_else(
            || std::fs::remove_file(path),
            |backup| std::fs::rename(backup, path),
        );
        if let Err(e) = result {
            log::error!("Failed to roll back {}: {e}", path.display());
        }
    }
}

fn render_manifest(artifacts: &[Artifact]) -> Result<Artifact, GenerateError> {
    let manifest = Manifest {
        version: MANIFEST_VERSION,
        artifacts: artifacts
            .iter()
            .map(|a| ManifestEntry {
                file_name: a.file_name.clone(),
                size_bytes: a.bytes.len(),
            })
            .collect(),
    };
    let mut bytes =
        serde_json::to_vec_pretty(&manifest).map_err(|source| GenerateError::Json {
            artifact: MANIFEST_FILE.to_string(),
            source,
        })?;
    bytes.push(b'\n');
    Ok(Artifact::new(MANIFEST_FILE, bytes))
}

/// Persists a complete artifact set into `dir`, plus the manifest.
///
/// All files are staged as `<name>.tmp` first. If any staging write fails,
/// the staged files are removed and nothing in `dir` is replaced. If a
/// rename into place fails, the artifacts already renamed are restored from
/// their `.bak` backups (or removed when they are new).
///
/// Returns the final paths in the order the artifacts were given, manifest
/// last.
///
/// # Errors
///
/// Returns [`GenerateError::Io`] if the directory cannot be created or any
/// file cannot be written or renamed.
pub fn write_artifacts(dir: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>, GenerateError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let manifest = render_manifest(artifacts)?;
    let all: Vec<&Artifact> = artifacts.iter().chain(std::iter::once(&manifest)).collect();

    let mut staged: Vec<(PathBuf, PathBuf)> = Vec::with_capacity(all.len());
    for artifact in &all {
        let path = dir.join(&artifact.file_name);
        let tmp = sibling(&path, ".tmp");
        if let Err(e) = std::fs::write(&tmp, &artifact.bytes) {
            for (staged_tmp, _) in &staged {
                let _ = std::fs::remove_file(staged_tmp);
            }
            let _ = std::fs::remove_file(&tmp);
            return Err(io_error(&tmp, e));
        }
        staged.push((tmp, path));
    }

    let mut committed: Vec<(PathBuf, Option<PathBuf>)> = Vec::with_capacity(staged.len());
    for (i, (tmp, path)) in staged.iter().enumerate() {
        match swap_in(tmp, path) {
            Ok(backup) => {
                log::debug!("Wrote {}", path.display());
                committed.push((path.clone(), backup));
            }
            Err(e) => {
                log::error!("Rolling back {} committed artifacts", committed.len());
                roll_back(&committed);
                for (pending, _) in &staged[i..] {
                    let _ = std::fs::remove_file(pending);
                }
                return Err(e);
            }
        }
    }

    for backup in committed.iter().filter_map(|(_, backup)| backup.as_ref()) {
        if let Err(e) = std::fs::remove_file(backup) {
            log::warn!("Failed to remove backup {}: {e}", backup.display());
        }
    }
    let written: Vec<PathBuf> = committed.into_iter().map(|(path, _)| path).collect();

    log::info!("Wrote {} artifacts to {}", artifacts.len(), dir.display());

    Ok(written)
}
