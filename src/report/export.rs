//! Enriched-table and analysis-report export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::pipeline::analyze::AnalysisReport;
use crate::pipeline::record::Record;
use crate::pipeline::schema::FieldCoverage;
use crate::report::summary::TierCount;

/// Timestamp layout used in the enriched CSV
const CSV_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Write the enriched table as CSV: canonical columns plus the derived
/// `status`, `color`, `dup_within_1h`, `isolation_score` and `anomaly`.
pub fn write_enriched_csv(records: &[Record], path: &Path) -> Result<()> {
    let mut df = enriched_frame(records)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;

    Ok(())
}

/// Build the enriched output frame from a record table.
pub fn enriched_frame(records: &[Record]) -> Result<DataFrame> {
    let str_col = |name: &str, values: Vec<Option<String>>| Column::new(name.into(), values);
    let num_col = |name: &str, values: Vec<Option<f64>>| Column::new(name.into(), values);

    let timestamps: Vec<Option<String>> = records
        .iter()
        .map(|r| {
            r.timestamp
                .map(|ts| ts.format(CSV_DATETIME_FORMAT).to_string())
        })
        .collect();

    let columns = vec![
        str_col("case_id", records.iter().map(|r| r.case_id.clone()).collect()),
        num_col("age", records.iter().map(|r| r.age).collect()),
        str_col("sex", records.iter().map(|r| r.sex.clone()).collect()),
        str_col("consent", records.iter().map(|r| r.consent.clone()).collect()),
        num_col("weight", records.iter().map(|r| r.weight).collect()),
        num_col("height", records.iter().map(|r| r.height).collect()),
        num_col("bmi", records.iter().map(|r| r.bmi).collect()),
        str_col("date", timestamps),
        str_col(
            "completed",
            records.iter().map(|r| r.completed.clone()).collect(),
        ),
        str_col(
            "test_flag",
            records.iter().map(|r| r.test_flag.clone()).collect(),
        ),
        num_col("bmi_index", records.iter().map(|r| r.bmi_index).collect()),
        str_col(
            "status",
            records
                .iter()
                .map(|r| r.status.map(|t| t.to_string()))
                .collect(),
        ),
        str_col(
            "color",
            records
                .iter()
                .map(|r| r.color().map(|c| c.to_string()))
                .collect(),
        ),
        Column::new(
            "dup_within_1h".into(),
            records.iter().map(|r| r.dup_within_1h).collect::<Vec<bool>>(),
        ),
        num_col(
            "isolation_score",
            records.iter().map(|r| r.isolation_score).collect(),
        ),
        Column::new(
            "anomaly".into(),
            records
                .iter()
                .map(|r| r.anomaly.map(i32::from))
                .collect::<Vec<Option<i32>>>(),
        ),
    ];

    DataFrame::new(columns).context("Failed to assemble the enriched output table")
}

/// Metadata about the analysis run
#[derive(Serialize)]
pub struct ReportMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    /// medsift version
    pub medsift_version: String,
    /// Input file path
    pub input_file: String,
    /// RNG seed of the outlier model
    pub seed: u64,
    /// Trees in the isolation forest
    pub trees: usize,
}

/// Complete JSON analysis report
#[derive(Serialize)]
pub struct AnalysisExport {
    pub metadata: ReportMetadata,
    pub summary: Vec<TierCount>,
    pub percent_anomaly: f64,
    pub total_records: usize,
    pub duplicates_flagged: usize,
    pub contamination: f64,
    pub outliers_demoted: usize,
    pub scorer_skipped: bool,
    pub coverage: FieldCoverage,
}

/// Parameters for the JSON report metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub seed: u64,
    pub trees: usize,
}

/// Export the analysis summary to a JSON file.
pub fn export_analysis(
    report: &AnalysisReport,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = AnalysisExport {
        metadata: ReportMetadata {
            timestamp: Utc::now().to_rfc3339(),
            medsift_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            seed: params.seed,
            trees: params.trees,
        },
        summary: report.summary.rows(),
        percent_anomaly: report.percent_anomaly,
        total_records: report.records.len(),
        duplicates_flagged: report.duplicates_flagged,
        contamination: report.contamination,
        outliers_demoted: report.outlier.demoted,
        scorer_skipped: report.outlier.skipped,
        coverage: report.coverage.clone(),
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize the analysis report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    Ok(())
}
