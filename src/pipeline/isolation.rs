//! Unsupervised anomaly scoring behind a capability trait
//!
//! The pipeline only depends on the [`AnomalyScorer`] contract: fit on a
//! batch of standardized feature rows and hand back one score and one
//! inlier/outlier label per row. The shipped implementation is a seeded
//! isolation forest; tests substitute stubs to drive the demotion logic
//! without fitting anything.

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

/// Euler-Mascheroni constant, used in the average path length estimate
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Scoring failures surfaced by an [`AnomalyScorer`].
#[derive(Debug, Error)]
pub enum ScoreError {
    /// The model needs at least two rows to say anything about density.
    #[error("at least 2 rows are required to fit an anomaly scorer, got {0}")]
    InsufficientSample(usize),

    /// Feature rows disagree on their number of columns.
    #[error("feature rows have inconsistent widths (expected {expected}, row {row} has {got})")]
    RaggedFeatures {
        expected: usize,
        row: usize,
        got: usize,
    },
}

/// Per-row output of a fitted scorer, aligned with the input rows.
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    /// Continuous anomaly scores; more negative = more anomalous
    pub scores: Vec<f64>,
    /// +1 inlier / -1 outlier
    pub labels: Vec<i8>,
}

/// Capability contract for unsupervised anomaly scoring.
pub trait AnomalyScorer {
    /// Fit on the given feature rows and score every one of them.
    fn fit_score(&self, rows: &[Vec<f64>]) -> Result<ScoredBatch, ScoreError>;
}

/// Seeded isolation forest over standardized feature rows.
///
/// Scores follow the sklearn `score_samples` convention: they lie in
/// (-1, 0) and more negative means more anomalous. The label threshold is
/// the contamination quantile of the scores, so the configured contamination
/// fraction of rows (roughly) comes out labeled -1. Identical inputs with
/// an identical seed produce identical output; tree seeds are derived from
/// the base seed so parallel fitting cannot reorder results.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    /// Number of trees in the ensemble
    pub trees: usize,
    /// Rows subsampled per tree (capped at the batch size)
    pub sample_size: usize,
    /// Expected fraction of outliers, in (0, 0.5]
    pub contamination: f64,
    /// Base RNG seed
    pub seed: u64,
}

impl IsolationForest {
    pub fn new(contamination: f64, seed: u64) -> Self {
        IsolationForest {
            trees: 100,
            sample_size: 256,
            contamination,
            seed,
        }
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit_score(&self, rows: &[Vec<f64>]) -> Result<ScoredBatch, ScoreError> {
        if rows.len() < 2 {
            return Err(ScoreError::InsufficientSample(rows.len()));
        }
        let width = rows[0].len();
        for (row, r) in rows.iter().enumerate() {
            if r.len() != width {
                return Err(ScoreError::RaggedFeatures {
                    expected: width,
                    row,
                    got: r.len(),
                });
            }
        }

        let psi = self.sample_size.min(rows.len());
        let max_depth = (psi as f64).log2().ceil() as usize;

        let pb = ProgressBar::new(self.trees as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("   Fitting isolation forest [{bar:40.cyan/blue}] {pos}/{len} trees")
                .unwrap()
                .progress_chars("=>-"),
        );

        // One derived seed per tree keeps the fit deterministic under rayon
        let forest: Vec<IsolationTree> = (0..self.trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(i as u64));
                let tree = IsolationTree::fit(rows, psi, max_depth, &mut rng);
                pb.inc(1);
                tree
            })
            .collect();
        pb.finish_and_clear();

        let normalizer = average_path_length(psi);
        let scores: Vec<f64> = rows
            .par_iter()
            .map(|row| {
                let mean_path: f64 = forest
                    .iter()
                    .map(|tree| tree.path_length(row))
                    .sum::<f64>()
                    / forest.len() as f64;
                // s(x) in (0, 1), larger = more anomalous; negate so that
                // more negative = more anomalous
                -(2.0_f64.powf(-mean_path / normalizer))
            })
            .collect();

        let threshold = contamination_threshold(&scores, self.contamination);
        let labels: Vec<i8> = scores
            .iter()
            .map(|&s| if s < threshold { -1 } else { 1 })
            .collect();

        Ok(ScoredBatch { scores, labels })
    }
}

/// Expected unsuccessful-search path length in a BST of `n` nodes, the
/// normalization constant c(n) from Liu et al.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        _ => {
            let n = n as f64;
            let harmonic = (n - 1.0).ln() + EULER_GAMMA;
            2.0 * harmonic - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of the scores at the contamination level.
/// Scores strictly below the threshold become outliers; ties stay inliers.
fn contamination_threshold(scores: &[f64], contamination: f64) -> f64 {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let q = contamination.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn fit(rows: &[Vec<f64>], psi: usize, max_depth: usize, rng: &mut StdRng) -> IsolationTree {
        let sample = rand::seq::index::sample(rng, rows.len(), psi).into_vec();
        IsolationTree {
            root: grow(rows, sample, 0, max_depth, rng),
        }
    }

    fn path_length(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if indices.len() <= 1 || depth >= max_depth {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still spread within this node can split it
    let width = rows[indices[0]].len();
    let splittable: Vec<(usize, f64, f64)> = (0..width)
        .filter_map(|f| {
            let mut min = f64::INFINITY;
            let mut max = f64::NEG_INFINITY;
            for &i in &indices {
                let v = rows[i][f];
                min = min.min(v);
                max = max.max(v);
            }
            (max > min).then_some((f, min, max))
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(grow(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(grow(rows, right, depth + 1, max_depth, rng)),
    }
}
