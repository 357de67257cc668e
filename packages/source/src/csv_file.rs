//! CSV incident file reader.
//!
//! Resolves the configured column names against the header row, then
//! converts every data row into an [`Incident`] while keeping the raw cells
//! for later echoing.

use std::io::Read;
use std::path::Path;

use crime_hotspot_source_models::{ColumnMapping, Incident, IncidentTable, RequiredColumn};

use crate::SourceError;
use crate::parsing::{parse_latitude, parse_longitude, parse_timestamp};
use crate::progress::ProgressCallback;

/// Header positions resolved from a [`ColumnMapping`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnIndexes {
    id: Option<usize>,
    latitude: usize,
    longitude: usize,
    town: usize,
    subdivision: usize,
    date: Option<usize>,
    crime_type: Option<usize>,
    severity: Option<usize>,
}

fn find_header(headers: &[String], name: &str) -> Option<usize> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

impl ColumnIndexes {
    fn resolve(headers: &[String], mapping: &ColumnMapping) -> Result<Self, SourceError> {
        let required = |column: RequiredColumn| {
            let header = mapping.required(column);
            find_header(headers, header).ok_or_else(|| SourceError::MissingRequiredColumn {
                column,
                header: header.to_string(),
            })
        };

        Ok(Self {
            id: find_header(headers, &mapping.id),
            latitude: required(RequiredColumn::Latitude)?,
            longitude: required(RequiredColumn::Longitude)?,
            town: required(RequiredColumn::Town)?,
            subdivision: required(RequiredColumn::Subdivision)?,
            date: find_header(headers, &mapping.date),
            crime_type: find_header(headers, &mapping.crime_type),
            severity: find_header(headers, &mapping.severity),
        })
    }
}

/// Loads incidents from a CSV file on disk.
///
/// The file is read fully and closed before this function returns.
///
/// # Errors
///
/// Returns [`SourceError::Io`] or [`SourceError::Csv`] if the file cannot be
/// read, [`SourceError::MissingRequiredColumn`] if the header row lacks a
/// required field, or [`SourceError::InvalidRecord`] for an unusable row.
pub fn load_incidents(
    path: &Path,
    mapping: &ColumnMapping,
    progress: &dyn ProgressCallback,
) -> Result<IncidentTable, SourceError> {
    log::info!("Loading incidents from {}", path.display());
    let file = std::fs::File::open(path)?;
    let table = read_incidents(file, mapping, progress)?;
    log::info!(
        "Loaded {} incidents ({} columns) from {}",
        table.len(),
        table.headers().len(),
        path.display()
    );
    Ok(table)
}

/// Reads incidents from any CSV byte stream.
///
/// # Errors
///
/// See [`load_incidents`].
pub fn read_incidents(
    reader: impl Read,
    mapping: &ColumnMapping,
    progress: &dyn ProgressCallback,
) -> Result<IncidentTable, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(false)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let columns = ColumnIndexes::resolve(&headers, mapping)?;
    log::debug!("Resolved incident columns: {columns:?}");

    progress.set_message("Reading incidents".to_string());

    let mut rows = Vec::new();
    let mut incidents = Vec::new();
    let mut unparsed_dates = 0u64;

    for (ordinal, result) in reader.records().enumerate() {
        let record = result?;
        let row_number = ordinal as u64 + 1;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

        let invalid = |message: String| SourceError::InvalidRecord {
            row: row_number,
            message,
        };

        let latitude = parse_latitude(cell(columns.latitude)).map_err(invalid)?;
        let longitude = parse_longitude(cell(columns.longitude)).map_err(invalid)?;

        let occurred_at = columns.date.and_then(|idx| {
            let parsed = parse_timestamp(cell(idx));
            if parsed.is_none() {
                unparsed_dates += 1;
            }
            parsed
        });

        let id = columns
            .id
            .map(cell)
            .filter(|s| !s.is_empty())
            .map_or_else(|| ordinal.to_string(), str::to_owned);
        let optional = |idx: Option<usize>| {
            idx.map(cell)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };

        incidents.push(Incident {
            id,
            latitude,
            longitude,
            town: cell(columns.town).to_owned(),
            subdivision: cell(columns.subdivision).to_owned(),
            crime_type: optional(columns.crime_type),
            severity: optional(columns.severity),
            occurred_at,
        });
        rows.push(record.iter().map(str::to_owned).collect());
        progress.inc(1);
    }

    if unparsed_dates > 0 {
        log::warn!("{unparsed_dates} incidents have an unparseable date and carry no temporal features");
    }

    progress.finish(format!("Read {} incidents", incidents.len()));

    Ok(IncidentTable::new(headers, rows, incidents))
}
