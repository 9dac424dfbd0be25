//! Shared test utilities and fixture generators

use std::path::{Path, PathBuf};

use medsift::pipeline::{ColumnMapping, Record, Tier};
use polars::prelude::*;
use tempfile::TempDir;

/// Mapping used by the fixtures: canonical field -> source column name,
/// mirroring a real export with localized headers.
pub fn source_mapping() -> ColumnMapping {
    ColumnMapping {
        case_id: "id_cases".to_string(),
        age: "age_v".to_string(),
        sex: "sex_v".to_string(),
        consent: "agreement".to_string(),
        weight: "greutate".to_string(),
        height: "inaltime".to_string(),
        bmi: "IMC".to_string(),
        date: "data1".to_string(),
        completed: "finalizat".to_string(),
        test_flag: "testing".to_string(),
        bmi_index: "imcINdex".to_string(),
    }
}

/// Small survey table with one known outcome per row:
/// c1 Valid, c2 Warning (minor), c3 Anomaly (BMI 61),
/// c4 Warning (height 149), c5 Anomaly (blank weight, no BMI).
///
/// The weight column is textual to exercise lenient coercion.
pub fn survey_dataframe() -> DataFrame {
    df! {
        "id_cases" => ["c1", "c2", "c3", "c4", "c5"],
        "age_v" => [25.0f64, 17.0, 30.0, 30.0, 40.0],
        "sex_v" => ["F", "M", "F", "F", "M"],
        "agreement" => ["yes", "yes", "yes", "yes", "yes"],
        "greutate" => [" 70 ", "65", "80", "55.5", ""],
        "inaltime" => [170.0f64, 170.0, 170.0, 149.0, 175.0],
        "IMC" => [Some(24.2f64), Some(22.5), Some(61.0), Some(25.0), None],
        "data1" => [
            "2024-01-01T10:00:00",
            "2024-01-01T11:00:00",
            "2024-01-01 12:00:00",
            "2024-01-01T13:00:00",
            "2024-01-01T14:00:00",
        ],
        "finalizat" => ["da", "da", "da", "nu", "da"],
        "testing" => ["0", "0", "0", "0", "1"],
        "imcINdex" => [24.2f64, 22.5, 61.0, 25.0, 0.0],
    }
    .unwrap()
}

/// Larger table where the outlier model actually engages: a tight cluster
/// of plausible adults, one extreme-but-rule-passing profile, plus a few
/// rule-level anomalies that set a meaningful contamination.
pub fn clustered_survey_dataframe() -> DataFrame {
    let n = 16usize;
    let mut case_ids = Vec::new();
    let mut ages = Vec::new();
    let mut weights = Vec::new();
    let mut heights = Vec::new();
    let mut bmis = Vec::new();
    let mut dates = Vec::new();

    for i in 0..n {
        let spread = i as f64;
        case_ids.push(format!("v{:02}", i));
        ages.push(30.0 + spread * 0.5);
        weights.push(68.0 + spread * 0.4);
        heights.push(168.0 + spread * 0.3);
        bmis.push(23.0 + spread * 0.1);
        dates.push(format!("2024-02-01T{:02}:00:00", i));
    }

    // extreme but rule-passing profile
    case_ids.push("edge".to_string());
    ages.push(99.0);
    weights.push(295.0);
    heights.push(219.0);
    bmis.push(59.5);
    dates.push("2024-02-02T01:00:00".to_string());

    // rule-level anomalies to drive contamination
    for (i, bad_bmi) in [61.0f64, 70.0, 11.0].iter().enumerate() {
        case_ids.push(format!("a{:02}", i));
        ages.push(30.0);
        weights.push(70.0);
        heights.push(170.0);
        bmis.push(*bad_bmi);
        dates.push(format!("2024-02-02T{:02}:00:00", i + 2));
    }

    df! {
        "id_cases" => case_ids,
        "age_v" => ages,
        "sex_v" => vec!["F"; n + 4],
        "agreement" => vec!["yes"; n + 4],
        "greutate" => weights,
        "inaltime" => heights,
        "IMC" => bmis,
        "data1" => dates,
        "finalizat" => vec!["da"; n + 4],
        "testing" => vec!["0"; n + 4],
        "imcINdex" => vec![0.0f64; n + 4],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("cases.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Write the fixture mapping as a JSON file next to the data
pub fn write_mapping_json(dir: &Path) -> PathBuf {
    let path = dir.join("mapping.json");
    let json = serde_json::to_string_pretty(&source_mapping()).unwrap();
    std::fs::write(&path, json).unwrap();
    path
}

/// Count records carrying the given tier
pub fn count_tier(records: &[Record], tier: Tier) -> usize {
    records
        .iter()
        .filter(|rec| rec.status == Some(tier))
        .count()
}

/// Look up a record by case id
pub fn by_case<'a>(records: &'a [Record], case_id: &str) -> &'a Record {
    records
        .iter()
        .find(|rec| rec.case_id.as_deref() == Some(case_id))
        .unwrap_or_else(|| panic!("no record with case_id {}", case_id))
}
