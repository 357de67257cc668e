#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record types and the explicit input schema.
//!
//! Every loaded CSV row becomes an [`Incident`] with typed coordinates and
//! location names. The original header and raw cells are kept alongside in
//! an [`IncidentTable`] so that downstream artifacts can echo every input
//! column untouched.

use chrono::{Datelike as _, NaiveDateTime, Timelike as _};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// First hour (inclusive) of the evening peak window.
pub const PEAK_HOUR_START: u32 = 17;

/// Last hour (inclusive) of the evening peak window.
pub const PEAK_HOUR_END: u32 = 20;

/// Columns that must be present in every incident source.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequiredColumn {
    /// WGS84 latitude in decimal degrees.
    Latitude,
    /// WGS84 longitude in decimal degrees.
    Longitude,
    /// Town (district) name.
    Town,
    /// Subdivision (neighborhood) name within a town.
    Subdivision,
}

impl RequiredColumn {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Latitude, Self::Longitude, Self::Town, Self::Subdivision]
    }
}

/// Header names used to locate each field in the input table.
///
/// Matching against the CSV header row is case-insensitive and ignores
/// surrounding whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ColumnMapping {
    /// Optional incident identifier column. Row ordinals are used when the
    /// column is absent.
    pub id: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
    /// Town name column.
    pub town: String,
    /// Subdivision name column.
    pub subdivision: String,
    /// Optional occurrence timestamp column.
    pub date: String,
    /// Optional crime type column.
    pub crime_type: String,
    /// Optional severity column.
    pub severity: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "INCIDENT_ID".to_string(),
            latitude: "LATITUDE".to_string(),
            longitude: "LONGITUDE".to_string(),
            town: "TOWN".to_string(),
            subdivision: "SUBDIVISION".to_string(),
            date: "DATE".to_string(),
            crime_type: "CRIME_TYPE".to_string(),
            severity: "SEVERITY".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Returns the configured header name for a required column.
    #[must_use]
    pub fn required(&self, column: RequiredColumn) -> &str {
        match column {
            RequiredColumn::Latitude => &self.latitude,
            RequiredColumn::Longitude => &self.longitude,
            RequiredColumn::Town => &self.town,
            RequiredColumn::Subdivision => &self.subdivision,
        }
    }
}

/// Calendar and clock features derived from an incident timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalFeatures {
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day of week, 0 = Monday through 6 = Sunday.
    pub day_of_week: u32,
    /// Month, 1-12.
    pub month: u32,
    /// Calendar year.
    pub year: i32,
    /// Whether the hour falls in the 17:00-20:59 evening peak.
    pub is_peak_hour: bool,
    /// Whether the day is a Saturday or Sunday.
    pub is_weekend: bool,
}

impl TemporalFeatures {
    /// Derives temporal features from a timestamp.
    #[must_use]
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let hour = dt.hour();
        let day_of_week = dt.weekday().num_days_from_monday();
        Self {
            hour,
            day_of_week,
            month: dt.month(),
            year: dt.year(),
            is_peak_hour: (PEAK_HOUR_START..=PEAK_HOUR_END).contains(&hour),
            is_weekend: day_of_week >= 5,
        }
    }
}

/// Returns the English name for a zero-based (Monday-first) weekday index.
#[must_use]
pub const fn day_name(day_of_week: u32) -> &'static str {
    match day_of_week {
        0 => "Monday",
        1 => "Tuesday",
        2 => "Wednesday",
        3 => "Thursday",
        4 => "Friday",
        5 => "Saturday",
        6 => "Sunday",
        _ => "Unknown",
    }
}

/// A single cleaned crime incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Source identifier, or the zero-based row ordinal when the source has
    /// no id column.
    pub id: String,
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// Town name.
    pub town: String,
    /// Subdivision name.
    pub subdivision: String,
    /// Crime type label, when the source carries one.
    pub crime_type: Option<String>,
    /// Severity label, when the source carries one.
    pub severity: Option<String>,
    /// When the incident occurred. `None` when the source has no date
    /// column or the value could not be parsed.
    pub occurred_at: Option<NaiveDateTime>,
}

impl Incident {
    /// Returns the temporal features for this incident, if it has a
    /// timestamp.
    #[must_use]
    pub fn temporal(&self) -> Option<TemporalFeatures> {
        self.occurred_at.as_ref().map(TemporalFeatures::from_datetime)
    }
}

/// An immutable snapshot of the loaded incident source.
///
/// `rows[i]` holds the raw cells that produced `incidents[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IncidentTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    incidents: Vec<Incident>,
}

impl IncidentTable {
    /// Builds a table from its header row and index-aligned raw rows and
    /// typed incidents.
    ///
    /// # Panics
    ///
    /// Panics if `rows` and `incidents` differ in length.
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>, incidents: Vec<Incident>) -> Self {
        assert_eq!(
            rows.len(),
            incidents.len(),
            "raw rows and incidents must be index-aligned"
        );
        Self {
            headers,
            rows,
            incidents,
        }
    }

    /// Builds a table directly from incidents, synthesizing the raw columns
    /// from the typed fields.
    #[must_use]
    pub fn from_incidents(incidents: Vec<Incident>) -> Self {
        let mapping = ColumnMapping::default();
        let headers = vec![
            mapping.id,
            mapping.latitude,
            mapping.longitude,
            mapping.town,
            mapping.subdivision,
        ];
        let rows = incidents
            .iter()
            .map(|i| {
                vec![
                    i.id.clone(),
                    i.latitude.to_string(),
                    i.longitude.to_string(),
                    i.town.clone(),
                    i.subdivision.clone(),
                ]
            })
            .collect();
        Self {
            headers,
            rows,
            incidents,
        }
    }

    /// Original header row.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Original raw rows, index-aligned with [`Self::incidents`].
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Typed incidents.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Number of incidents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.incidents.len()
    }

    /// Whether the table holds no incidents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.incidents.is_empty()
    }
}
