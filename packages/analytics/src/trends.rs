//! Temporal trend and category distribution counts.
//!
//! Groups incidents by calendar and clock features of their timestamp, and
//! by location, crime type and severity labels. Incidents without a
//! timestamp are left out of every temporal series and counted separately;
//! the category series cover every incident that carries the label.

use std::collections::BTreeMap;

use crime_hotspot_analytics_models::{TrendBucket, TrendGranularity, TrendReport, TrendSeries};
use crime_hotspot_source_models::{
    Incident, PEAK_HOUR_END, PEAK_HOUR_START, TemporalFeatures, day_name,
};

/// Subdivisions kept in the subdivision distribution.
pub const SUBDIVISION_TREND_LIMIT: usize = 20;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(usize::try_from(i).ok()?))
        .copied()
        .unwrap_or("Unknown")
}

/// Sortable key and display label of an incident for one temporal
/// granularity. `None` for the category granularities.
fn bucket_of(
    features: &TemporalFeatures,
    granularity: TrendGranularity,
) -> Option<(String, String)> {
    let bucket = match granularity {
        TrendGranularity::DayOfWeek => (
            features.day_of_week.to_string(),
            day_name(features.day_of_week).to_string(),
        ),
        TrendGranularity::Month => (
            format!("{:02}", features.month),
            month_name(features.month).to_string(),
        ),
        TrendGranularity::Year => (features.year.to_string(), features.year.to_string()),
        TrendGranularity::YearMonth => (
            format!("{}-{:02}", features.year, features.month),
            format!("{} {}", month_name(features.month), features.year),
        ),
        TrendGranularity::PeakHour => {
            if features.is_peak_hour {
                (
                    "1".to_string(),
                    format!("Peak ({PEAK_HOUR_START}:00-{PEAK_HOUR_END}:59)"),
                )
            } else {
                ("0".to_string(), "Off-peak".to_string())
            }
        }
        TrendGranularity::CrimeType
        | TrendGranularity::Town
        | TrendGranularity::Subdivision
        | TrendGranularity::Severity
        | TrendGranularity::YearMonthSeverity => return None,
    };
    Some(bucket)
}

fn keyed_series(
    granularity: TrendGranularity,
    entries: impl Iterator<Item = (String, String)>,
) -> TrendSeries {
    let mut counts: BTreeMap<String, (String, u64)> = BTreeMap::new();
    for (key, label) in entries {
        counts.entry(key).or_insert((label, 0)).1 += 1;
    }

    TrendSeries {
        granularity,
        buckets: counts
            .into_iter()
            .map(|(key, (label, incident_count))| TrendBucket {
                key,
                label,
                incident_count,
            })
            .collect(),
    }
}

fn temporal_series(features: &[TemporalFeatures], granularity: TrendGranularity) -> TrendSeries {
    keyed_series(
        granularity,
        features.iter().filter_map(|f| bucket_of(f, granularity)),
    )
}

/// Counts per label, busiest first with ties by name, keeping at most
/// `limit` buckets. Empty labels are skipped.
fn category_series<'a>(
    incidents: &'a [Incident],
    granularity: TrendGranularity,
    label: impl Fn(&'a Incident) -> Option<&'a str>,
    limit: Option<usize>,
) -> TrendSeries {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for name in incidents.iter().filter_map(label).filter(|s| !s.is_empty()) {
        *counts.entry(name).or_default() += 1;
    }

    let mut buckets: Vec<TrendBucket> = counts
        .into_iter()
        .map(|(name, incident_count)| TrendBucket {
            key: name.to_string(),
            label: name.to_string(),
            incident_count,
        })
        .collect();
    buckets.sort_by(|a, b| b.incident_count.cmp(&a.incident_count));
    if let Some(limit) = limit {
        buckets.truncate(limit);
    }

    TrendSeries {
        granularity,
        buckets,
    }
}

/// Monthly counts per severity label, over dated incidents that carry one.
fn year_month_severity_series(incidents: &[Incident]) -> TrendSeries {
    keyed_series(
        TrendGranularity::YearMonthSeverity,
        incidents.iter().filter_map(|incident| {
            let severity = incident.severity.as_deref().filter(|s| !s.is_empty())?;
            let features = incident.temporal()?;
            Some((
                format!("{}-{:02}/{severity}", features.year, features.month),
                format!(
                    "{} {} {severity}",
                    month_name(features.month),
                    features.year
                ),
            ))
        }),
    )
}

fn series_for(
    incidents: &[Incident],
    features: &[TemporalFeatures],
    granularity: TrendGranularity,
) -> TrendSeries {
    match granularity {
        TrendGranularity::DayOfWeek
        | TrendGranularity::Month
        | TrendGranularity::Year
        | TrendGranularity::YearMonth
        | TrendGranularity::PeakHour => temporal_series(features, granularity),
        TrendGranularity::CrimeType => {
            category_series(incidents, granularity, |i| i.crime_type.as_deref(), None)
        }
        TrendGranularity::Town => {
            category_series(incidents, granularity, |i| Some(i.town.as_str()), None)
        }
        TrendGranularity::Subdivision => category_series(
            incidents,
            granularity,
            |i| Some(i.subdivision.as_str()),
            Some(SUBDIVISION_TREND_LIMIT),
        ),
        TrendGranularity::Severity => {
            category_series(incidents, granularity, |i| i.severity.as_deref(), None)
        }
        TrendGranularity::YearMonthSeverity => year_month_severity_series(incidents),
    }
}

/// Builds the full trend report for a set of incidents.
#[must_use]
pub fn build_trend_report(incidents: &[Incident]) -> TrendReport {
    let features: Vec<TemporalFeatures> = incidents.iter().filter_map(Incident::temporal).collect();
    let undated_count = (incidents.len() - features.len()) as u64;

    if undated_count > 0 {
        log::warn!(
            "{undated_count} of {} incidents have no timestamp and are excluded from temporal trends",
            incidents.len()
        );
    }

    let series = TrendGranularity::all()
        .iter()
        .map(|&granularity| series_for(incidents, &features, granularity))
        .collect();

    log::info!("Built trends over {} dated incidents", features.len());

    TrendReport {
        incident_count: incidents.len() as u64,
        undated_count,
        series,
    }
}
