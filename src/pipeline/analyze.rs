//! Pipeline orchestration: normalize, validate, dedupe, re-score, summarize
//!
//! One invocation is a pure function of (table, mapping, config): the
//! caller's DataFrame is only read, every run builds a fresh record table,
//! and no state survives between runs.

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rayon::prelude::*;

use super::duplicates::flag_duplicates;
use super::isolation::IsolationForest;
use super::outlier::{contamination_from_rejects, rescore_valid_records, OutlierOutcome};
use super::record::{Record, Tier};
use super::rules::validate;
use super::schema::{normalize_table, ColumnMapping, FieldCoverage};
use crate::report::TierSummary;

/// Knobs for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Base seed for the outlier model
    pub seed: u64,
    /// Trees in the isolation forest
    pub trees: usize,
    /// Per-tree subsample cap
    pub sample_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            seed: 42,
            trees: 100,
            sample_size: 256,
        }
    }
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// Enriched records, sorted by timestamp ascending (missing last)
    pub records: Vec<Record>,
    /// Canonical fields that did / did not resolve to a source column
    pub coverage: FieldCoverage,
    /// Per-tier counts in fixed order, zero-filled
    pub summary: TierSummary,
    /// Share of anomalies in percent, rounded to 2 decimals
    pub percent_anomaly: f64,
    /// Records flagged as one-hour duplicates
    pub duplicates_flagged: usize,
    /// Contamination handed to the outlier model
    pub contamination: f64,
    /// What the outlier stage did
    pub outlier: OutlierOutcome,
}

/// Run the full two-layer pipeline over a raw table.
///
/// Stages: schema normalization, rule validation (parallel per record),
/// timestamp sort, duplicate flagging, statistical re-scoring of the Valid
/// subset, summary aggregation. The input frame is never mutated.
pub fn run_analysis(
    df: &DataFrame,
    mapping: &ColumnMapping,
    config: &AnalysisConfig,
) -> Result<AnalysisReport> {
    let normalized = normalize_table(df, mapping).context("Schema normalization failed")?;
    let mut records = normalized.records;

    records.par_iter_mut().for_each(|rec| {
        let (tier, _) = validate(rec.bmi, rec.age, rec.height, rec.weight);
        rec.status = Some(tier);
    });

    // Chronological output order; records without a timestamp sink to the
    // end without disturbing ties
    records.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let flags = flag_duplicates(&records);
    for (rec, flag) in records.iter_mut().zip(&flags) {
        rec.dup_within_1h = *flag;
    }

    let total = records.len();
    let non_valid = records
        .iter()
        .filter(|rec| rec.status != Some(Tier::Valid))
        .count();
    let contamination = contamination_from_rejects(non_valid, total);

    let forest = IsolationForest {
        trees: config.trees,
        sample_size: config.sample_size,
        contamination,
        seed: config.seed,
    };
    let outlier = rescore_valid_records(&mut records, &forest)
        .context("Outlier re-scoring failed")?;

    let summary = TierSummary::from_records(&records);
    let percent_anomaly = summary.percent_anomaly();
    let duplicates_flagged = flags.iter().filter(|&&f| f).count();

    Ok(AnalysisReport {
        records,
        coverage: normalized.coverage,
        summary,
        percent_anomaly,
        duplicates_flagged,
        contamination,
        outlier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_run() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.trees, 100);
        assert_eq!(config.sample_size, 256);
    }
}
