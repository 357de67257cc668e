#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident source loading.
//!
//! Reads a cleaned incident CSV into an [`IncidentTable`], validating the
//! header row against the explicit [`ColumnMapping`] before any row is
//! parsed. Cleaning (null and duplicate removal) happens upstream, so a row
//! whose coordinates cannot be parsed is an error, never a silent skip.

pub mod csv_file;
pub mod parsing;
pub mod progress;

pub use crime_hotspot_source_models::{ColumnMapping, IncidentTable, RequiredColumn};

/// Errors that can occur while loading incidents.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The header row lacks a required column.
    #[error("Missing required column {column} (expected header '{header}')")]
    MissingRequiredColumn {
        /// Which required field is missing.
        column: RequiredColumn,
        /// Header name that was looked up.
        header: String,
    },

    /// A data row could not be converted into an incident.
    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord {
        /// One-based data row number (header excluded).
        row: u64,
        /// Description of what went wrong.
        message: String,
    },
}
