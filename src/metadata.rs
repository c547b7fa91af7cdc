//! Parsing of the `Name:<x>, Date Range:<start> - <end>` line that opens
//! every dataset file.

use crate::model::DatasetMetadata;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2})\s*-\s*(\d{4}-\d{2}-\d{2})$").expect("date range pattern")
});

/// Parses a metadata line, never failing.
///
/// Segments are split on commas, or on tabs when the line has no comma. Each
/// segment is read as `key:value` on its first colon; blank values and unknown
/// keys are dropped.
pub fn parse_metadata(line: &str) -> DatasetMetadata {
    let mut metadata = DatasetMetadata::default();
    if line.trim().is_empty() {
        return metadata;
    }

    let mut segments: Vec<&str> = line.split(',').collect();
    if segments.len() == 1 {
        segments = line.split('\t').collect();
    }

    for segment in segments {
        let Some((key, value)) = segment.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        match key.as_str() {
            "name" => metadata.name = Some(value.to_string()),
            "date range" => {
                metadata.date_range = Some(value.to_string());
                if let Some(caps) = DATE_RANGE_RE.captures(value) {
                    metadata.start_date = Some(caps[1].to_string());
                    metadata.end_date = Some(caps[2].to_string());
                }
            }
            _ => {}
        }
    }

    metadata
}

/// A record counts as valid only when it carries a name or a date range.
/// Start and end dates on their own do not qualify.
pub fn is_valid_metadata(metadata: &DatasetMetadata) -> bool {
    metadata.name.is_some() || metadata.date_range.is_some()
}

impl DatasetMetadata {
    /// Calendar dates of the range, when both ends parse.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = NaiveDate::parse_from_str(self.start_date.as_deref()?, "%Y-%m-%d").ok()?;
        let end = NaiveDate::parse_from_str(self.end_date.as_deref()?, "%Y-%m-%d").ok()?;
        Some((start, end))
    }

    /// Inclusive number of days covered by the range.
    pub fn coverage_days(&self) -> Option<i64> {
        let (start, end) = self.date_span()?;
        (end >= start).then(|| (end - start).num_days() + 1)
    }
}
