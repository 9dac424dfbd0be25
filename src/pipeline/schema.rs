//! Canonical schema, operator column mapping and table normalization
//!
//! Source exports name their columns freely; an operator-supplied
//! [`ColumnMapping`] renames them onto the canonical schema. Normalization
//! is a pure transform from a polars `DataFrame` to fixed-schema
//! [`Record`]s: numeric and date cells are coerced leniently, with blanks
//! and garbage becoming missing values rather than zeros or errors.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::record::Record;
use super::rules::bmi_from;

/// The fixed set of canonical field names the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    CaseId,
    Age,
    Sex,
    Consent,
    Weight,
    Height,
    Bmi,
    Date,
    Completed,
    TestFlag,
    BmiIndex,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 11] = [
        CanonicalField::CaseId,
        CanonicalField::Age,
        CanonicalField::Sex,
        CanonicalField::Consent,
        CanonicalField::Weight,
        CanonicalField::Height,
        CanonicalField::Bmi,
        CanonicalField::Date,
        CanonicalField::Completed,
        CanonicalField::TestFlag,
        CanonicalField::BmiIndex,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CanonicalField::CaseId => "case_id",
            CanonicalField::Age => "age",
            CanonicalField::Sex => "sex",
            CanonicalField::Consent => "consent",
            CanonicalField::Weight => "weight",
            CanonicalField::Height => "height",
            CanonicalField::Bmi => "bmi",
            CanonicalField::Date => "date",
            CanonicalField::Completed => "completed",
            CanonicalField::TestFlag => "test_flag",
            CanonicalField::BmiIndex => "bmi_index",
        }
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Operator-supplied mapping from canonical field to source column name.
///
/// Loaded from a JSON object keyed by canonical field name, e.g.
/// `{"age": "age_v", "weight": "greutate", "height": "inaltime",
///   "bmi": "IMC", "date": "data1", ...}`. Every canonical field must be
/// mapped; a missing key fails deserialization up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub case_id: String,
    pub age: String,
    pub sex: String,
    pub consent: String,
    pub weight: String,
    pub height: String,
    pub bmi: String,
    pub date: String,
    pub completed: String,
    pub test_flag: String,
    pub bmi_index: String,
}

impl ColumnMapping {
    /// The source column mapped to a canonical field.
    pub fn source_column(&self, field: CanonicalField) -> &str {
        match field {
            CanonicalField::CaseId => &self.case_id,
            CanonicalField::Age => &self.age,
            CanonicalField::Sex => &self.sex,
            CanonicalField::Consent => &self.consent,
            CanonicalField::Weight => &self.weight,
            CanonicalField::Height => &self.height,
            CanonicalField::Bmi => &self.bmi,
            CanonicalField::Date => &self.date,
            CanonicalField::Completed => &self.completed,
            CanonicalField::TestFlag => &self.test_flag,
            CanonicalField::BmiIndex => &self.bmi_index,
        }
    }

    /// Load a mapping from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<ColumnMapping> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid column mapping in {}", path.display()))
    }
}

/// Which canonical fields resolved to an existing source column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldCoverage {
    pub available: Vec<CanonicalField>,
    pub missing: Vec<CanonicalField>,
}

impl FieldCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Result of normalizing a raw table.
#[derive(Debug, Clone)]
pub struct NormalizedTable {
    pub records: Vec<Record>,
    pub coverage: FieldCoverage,
}

/// Rename mapped columns onto the canonical schema and coerce every cell.
///
/// The input frame is only read, never mutated. A canonical field whose
/// source column is absent does not fail the transform: the gap is reported
/// in the coverage and the field is missing on every record, which routes
/// analyzed fields through the normal anomaly-by-missing rule. A missing
/// supplied BMI is backfilled from weight and height when both are present.
pub fn normalize_table(df: &DataFrame, mapping: &ColumnMapping) -> Result<NormalizedTable> {
    let n_rows = df.height();

    let mut coverage = FieldCoverage::default();
    for field in CanonicalField::ALL {
        if df.column(mapping.source_column(field)).is_ok() {
            coverage.available.push(field);
        } else {
            coverage.missing.push(field);
        }
    }

    let case_id = string_column(df, mapping.source_column(CanonicalField::CaseId));
    let sex = string_column(df, mapping.source_column(CanonicalField::Sex));
    let consent = string_column(df, mapping.source_column(CanonicalField::Consent));
    let completed = string_column(df, mapping.source_column(CanonicalField::Completed));
    let test_flag = string_column(df, mapping.source_column(CanonicalField::TestFlag));

    let age = numeric_column(df, mapping.source_column(CanonicalField::Age));
    let weight = numeric_column(df, mapping.source_column(CanonicalField::Weight));
    let height = numeric_column(df, mapping.source_column(CanonicalField::Height));
    let bmi = numeric_column(df, mapping.source_column(CanonicalField::Bmi));
    let bmi_index = numeric_column(df, mapping.source_column(CanonicalField::BmiIndex));

    let timestamp = datetime_column(df, mapping.source_column(CanonicalField::Date));

    let pick_num = |col: &Option<Vec<Option<f64>>>, idx: usize| col.as_ref().and_then(|v| v[idx]);
    let pick_str = |col: &Option<Vec<Option<String>>>, idx: usize| {
        col.as_ref().and_then(|v| v[idx].clone())
    };

    let mut records = Vec::with_capacity(n_rows);
    for idx in 0..n_rows {
        let weight_v = pick_num(&weight, idx);
        let height_v = pick_num(&height, idx);
        let bmi_v = pick_num(&bmi, idx).or_else(|| bmi_from(weight_v, height_v));

        records.push(Record {
            case_id: pick_str(&case_id, idx),
            age: pick_num(&age, idx),
            weight: weight_v,
            height: height_v,
            bmi: bmi_v,
            timestamp: timestamp.as_ref().and_then(|v| v[idx]),
            sex: pick_str(&sex, idx),
            consent: pick_str(&consent, idx),
            completed: pick_str(&completed, idx),
            test_flag: pick_str(&test_flag, idx),
            bmi_index: pick_num(&bmi_index, idx),
            ..Record::default()
        });
    }

    Ok(NormalizedTable { records, coverage })
}

/// Extract a column as lenient f64 values; `None` when the column is absent.
fn numeric_column(df: &DataFrame, source: &str) -> Option<Vec<Option<f64>>> {
    let col = df.column(source).ok()?;
    Some(
        col.as_materialized_series()
            .rechunk()
            .iter()
            .map(|av| coerce_numeric(&av))
            .collect(),
    )
}

fn string_column(df: &DataFrame, source: &str) -> Option<Vec<Option<String>>> {
    let col = df.column(source).ok()?;
    Some(
        col.as_materialized_series()
            .rechunk()
            .iter()
            .map(|av| coerce_string(&av))
            .collect(),
    )
}

fn datetime_column(df: &DataFrame, source: &str) -> Option<Vec<Option<NaiveDateTime>>> {
    let col = df.column(source).ok()?;
    Some(
        col.as_materialized_series()
            .rechunk()
            .iter()
            .map(|av| coerce_datetime(&av))
            .collect(),
    )
}

fn coerce_numeric(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => parse_numeric_token(s),
        AnyValue::StringOwned(s) => parse_numeric_token(s.as_str()),
        other => other.extract::<f64>().filter(|v| !v.is_nan()),
    }
}

/// Blank and whitespace-only tokens are missing, never zero.
fn parse_numeric_token(token: &str) -> Option<f64> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn coerce_string(value: &AnyValue) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => non_blank(s),
        AnyValue::StringOwned(s) => non_blank(s.as_str()),
        other => non_blank(&other.to_string()),
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn coerce_datetime(value: &AnyValue) -> Option<NaiveDateTime> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(s) => parse_datetime_token(s),
        AnyValue::StringOwned(s) => parse_datetime_token(s.as_str()),
        AnyValue::Datetime(v, unit, _) => timestamp_from_units(*v, *unit),
        AnyValue::DatetimeOwned(v, unit, _) => timestamp_from_units(*v, *unit),
        AnyValue::Date(days) => DateTime::from_timestamp(i64::from(*days) * 86_400, 0)
            .map(|dt| dt.naive_utc()),
        _ => None,
    }
}

fn timestamp_from_units(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let (secs, nanos) = match unit {
        TimeUnit::Nanoseconds => (
            value.div_euclid(1_000_000_000),
            value.rem_euclid(1_000_000_000) as u32,
        ),
        TimeUnit::Microseconds => (
            value.div_euclid(1_000_000),
            (value.rem_euclid(1_000_000) * 1_000) as u32,
        ),
        TimeUnit::Milliseconds => (
            value.div_euclid(1_000),
            (value.rem_euclid(1_000) * 1_000_000) as u32,
        ),
    };
    DateTime::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// Accepted timestamp layouts, tried in order after RFC 3339.
const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

fn parse_datetime_token(token: &str) -> Option<NaiveDateTime> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    // Bare dates land at midnight
    for format in ["%Y-%m-%d", "%d/%m/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_tokens_parse_leniently() {
        assert_eq!(parse_numeric_token(" 23.5 "), Some(23.5));
        assert_eq!(parse_numeric_token(""), None);
        assert_eq!(parse_numeric_token("   "), None);
        assert_eq!(parse_numeric_token("abc"), None);
        assert_eq!(parse_numeric_token("NaN"), None);
    }

    #[test]
    fn datetime_tokens_accept_common_layouts() {
        for token in [
            "2024-01-01T10:30:00",
            "2024-01-01 10:30:00",
            "2024-01-01T10:30",
            "2024-01-01 10:30",
            "2024-01-01T10:30:00+00:00",
        ] {
            let parsed = parse_datetime_token(token);
            assert!(parsed.is_some(), "failed to parse {:?}", token);
            assert_eq!(
                parsed.unwrap().format("%Y-%m-%d %H:%M").to_string(),
                "2024-01-01 10:30"
            );
        }
    }

    #[test]
    fn bare_dates_land_at_midnight() {
        let parsed = parse_datetime_token("2024-03-05").unwrap();
        assert_eq!(parsed.format("%H:%M:%S").to_string(), "00:00:00");
        assert!(parse_datetime_token("garbage").is_none());
    }

    #[test]
    fn canonical_field_names_are_snake_case() {
        assert_eq!(CanonicalField::CaseId.name(), "case_id");
        assert_eq!(CanonicalField::BmiIndex.name(), "bmi_index");
        assert_eq!(CanonicalField::ALL.len(), 11);
    }
}
