//! Statistical re-scoring of the rule validator's survivors
//!
//! Only records the rule layer left `Valid` (and whose four features are all
//! present) are eligible. The scorer's contamination is derived from the
//! rule layer's own reject rate, so a dirtier rule pass makes the
//! statistical pass prune more aggressively. The stage can only ever demote
//! Valid records to Anomaly; Warning and existing Anomaly records are left
//! untouched.

use super::isolation::{AnomalyScorer, ScoreError};
use super::record::{Record, Tier};

/// Lower clamp for the contamination fraction
const CONTAMINATION_MIN: f64 = 0.01;
/// Upper clamp for the contamination fraction
const CONTAMINATION_MAX: f64 = 0.5;

/// Minimum eligible records before the scorer activates
const MIN_ELIGIBLE: usize = 2;

/// What the outlier stage did to the table.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlierOutcome {
    /// Records scored by the model
    pub scored: usize,
    /// Valid records demoted to Anomaly
    pub demoted: usize,
    /// True when fewer than two eligible records existed and the stage
    /// was a no-op
    pub skipped: bool,
}

/// Contamination derived from the rule layer's reject rate, clamped to
/// [0.01, 0.5]. A zero-record table clamps to the minimum.
pub fn contamination_from_rejects(non_valid: usize, total: usize) -> f64 {
    if total == 0 {
        return CONTAMINATION_MIN;
    }
    (non_valid as f64 / total as f64).clamp(CONTAMINATION_MIN, CONTAMINATION_MAX)
}

/// Feature vector for scoring, present only when the record is complete.
fn feature_row(rec: &Record) -> Option<Vec<f64>> {
    let finite = |v: Option<f64>| v.filter(|x| x.is_finite());
    Some(vec![
        finite(rec.age)?,
        finite(rec.weight)?,
        finite(rec.height)?,
        finite(rec.bmi)?,
    ])
}

/// Standardize feature columns to zero mean and unit variance.
///
/// Population variance, matching what the original StandardScaler fit did.
/// A zero-variance column keeps scale 1 so it standardizes to all zeros
/// instead of dividing by zero.
pub fn standardize(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    if rows.is_empty() {
        return Vec::new();
    }
    let width = rows[0].len();
    let n = rows.len() as f64;

    let mut means = vec![0.0; width];
    for row in rows {
        for (f, v) in row.iter().enumerate() {
            means[f] += v;
        }
    }
    for mean in &mut means {
        *mean /= n;
    }

    let mut scales = vec![0.0; width];
    for row in rows {
        for (f, v) in row.iter().enumerate() {
            let dev = v - means[f];
            scales[f] += dev * dev;
        }
    }
    for scale in &mut scales {
        *scale = (*scale / n).sqrt();
        if *scale == 0.0 {
            *scale = 1.0;
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(f, v)| (v - means[f]) / scales[f])
                .collect()
        })
        .collect()
}

/// Re-score the Valid subset and demote statistical outliers to Anomaly.
///
/// Eligible records get their `isolation_score` and `anomaly` fields filled;
/// everything else keeps `None`. With fewer than two eligible records the
/// stage is a no-op and reports `skipped`.
pub fn rescore_valid_records(
    records: &mut [Record],
    scorer: &dyn AnomalyScorer,
) -> Result<OutlierOutcome, ScoreError> {
    let eligible: Vec<(usize, Vec<f64>)> = records
        .iter()
        .enumerate()
        .filter(|(_, rec)| rec.status == Some(Tier::Valid))
        .filter_map(|(idx, rec)| feature_row(rec).map(|row| (idx, row)))
        .collect();

    if eligible.len() < MIN_ELIGIBLE {
        return Ok(OutlierOutcome {
            skipped: true,
            ..OutlierOutcome::default()
        });
    }

    let rows: Vec<Vec<f64>> = eligible.iter().map(|(_, row)| row.clone()).collect();
    let batch = scorer.fit_score(&standardize(&rows))?;
    if batch.scores.len() != eligible.len() || batch.labels.len() != eligible.len() {
        return Err(ScoreError::RaggedFeatures {
            expected: eligible.len(),
            row: 0,
            got: batch.scores.len(),
        });
    }

    let mut demoted = 0;
    for (pos, (idx, _)) in eligible.iter().enumerate() {
        let rec = &mut records[*idx];
        rec.isolation_score = Some(batch.scores[pos]);
        rec.anomaly = Some(batch.labels[pos]);
        if batch.labels[pos] == -1 {
            rec.status = Some(Tier::Anomaly);
            demoted += 1;
        }
    }

    Ok(OutlierOutcome {
        scored: eligible.len(),
        demoted,
        skipped: false,
    })
}
