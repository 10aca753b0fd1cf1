//! Statistical anomaly scoring
//!
//! Batch-local outlier detection over (execution_time, rows_examined).
//! Fitting is a barrier: the whole batch is consumed before any row is scored.
//!
//! The default strategy is an isolation forest. Points that are isolated by
//! fewer random splits than their peers get a higher anomaly score; the
//! decision threshold is the (1 - contamination) quantile of the training
//! scores, so roughly `contamination * n` rows are flagged.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::services::query_analyzer::models::{AnalyzerError, AnalyzerResult, FeatureRow};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Pluggable outlier detection strategy
pub trait OutlierDetector: Send + Sync {
    type Model;

    /// Fit on the batch; fails on fewer than two rows
    fn fit(&self, rows: &[FeatureRow]) -> AnalyzerResult<Self::Model>;

    /// One flag per row, in input order
    fn score(&self, rows: &[FeatureRow], model: &Self::Model) -> Vec<bool>;
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationForestConfig {
    /// Expected outlier fraction, in (0, 0.5]
    pub contamination: f64,
    pub n_estimators: usize,
    /// Sub-sample size per tree (capped at the batch size)
    pub max_samples: usize,
    pub seed: u64,
}

impl Default for IsolationForestConfig {
    fn default() -> Self {
        Self { contamination: 0.02, n_estimators: 100, max_samples: 256, seed: 42 }
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone)]
enum ITreeNode {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        value: f64,
        left: Box<ITreeNode>,
        right: Box<ITreeNode>,
    },
}

impl ITreeNode {
    fn path_length(&self, point: &[f64; 2], depth: usize) -> f64 {
        match self {
            Self::Leaf { size } => depth as f64 + average_path_length(*size),
            Self::Split { feature, value, left, right } => {
                if point[*feature] < *value {
                    left.path_length(point, depth + 1)
                } else {
                    right.path_length(point, depth + 1)
                }
            },
        }
    }
}

/// A fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForestModel {
    trees: Vec<ITreeNode>,
    sample_size: usize,
    threshold: f64,
}

impl IsolationForestModel {
    /// Anomaly score in (0, 1]; higher is more anomalous
    pub fn anomaly_score(&self, point: &[f64; 2]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let mean_path = self
            .trees
            .iter()
            .map(|t| t.path_length(point, 0))
            .sum::<f64>()
            / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.0;
        }
        2f64.powf(-mean_path / norm)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_anomaly(&self, point: &[f64; 2]) -> bool {
        self.anomaly_score(point) > self.threshold
    }
}

// ============================================================================
// Detector
// ============================================================================

/// Seeded isolation forest; identical batch + seed gives identical flags
#[derive(Debug, Clone, Default)]
pub struct IsolationForest {
    config: IsolationForestConfig,
}

impl IsolationForest {
    pub fn new(config: IsolationForestConfig) -> Self {
        Self { config }
    }

    fn validate(&self, n: usize) -> AnalyzerResult<()> {
        if n < 2 {
            return Err(AnalyzerError::validation(
                "rows",
                format!("anomaly model needs at least 2 rows to fit, got {}", n),
            ));
        }
        let c = self.config.contamination;
        if !(c > 0.0 && c <= 0.5) {
            return Err(AnalyzerError::validation(
                "contamination",
                format!("must be in (0, 0.5], got {}", c),
            ));
        }
        if self.config.n_estimators == 0 {
            return Err(AnalyzerError::validation("n_estimators", "must be greater than 0"));
        }
        Ok(())
    }

    fn build_tree(
        &self,
        data: &[[f64; 2]],
        indices: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut StdRng,
    ) -> ITreeNode {
        if depth >= height_limit || indices.len() <= 1 {
            return ITreeNode::Leaf { size: indices.len() };
        }

        // Only features with spread can split the node
        let ranges: Vec<(usize, f64, f64)> = (0..2)
            .filter_map(|f| {
                let (lo, hi) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(data[i][f]), hi.max(data[i][f]))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();

        if ranges.is_empty() {
            return ITreeNode::Leaf { size: indices.len() };
        }

        let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
        let value = rng.gen_range(lo..hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            indices.into_iter().partition(|&i| data[i][feature] < value);

        ITreeNode::Split {
            feature,
            value,
            left: Box::new(self.build_tree(data, left, depth + 1, height_limit, rng)),
            right: Box::new(self.build_tree(data, right, depth + 1, height_limit, rng)),
        }
    }
}

impl OutlierDetector for IsolationForest {
    type Model = IsolationForestModel;

    fn fit(&self, rows: &[FeatureRow]) -> AnalyzerResult<IsolationForestModel> {
        self.validate(rows.len())?;

        let data: Vec<[f64; 2]> = rows.iter().map(FeatureRow::feature_vector).collect();
        let n = data.len();
        let sample_size = self.config.max_samples.clamp(2, n);
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        let trees = (0..self.config.n_estimators)
            .map(|_| {
                let indices = sample(&mut rng, n, sample_size).into_vec();
                self.build_tree(&data, indices, 0, height_limit, &mut rng)
            })
            .collect();

        let mut model = IsolationForestModel { trees, sample_size, threshold: 0.0 };

        let mut scores: Vec<f64> = data.iter().map(|p| model.anomaly_score(p)).collect();
        scores.sort_by(f64::total_cmp);
        model.threshold = quantile(&scores, 1.0 - self.config.contamination);

        tracing::debug!(
            "Fitted isolation forest: rows={}, trees={}, sample_size={}, threshold={:.4}",
            n,
            self.config.n_estimators,
            sample_size,
            model.threshold
        );

        Ok(model)
    }

    fn score(&self, rows: &[FeatureRow], model: &IsolationForestModel) -> Vec<bool> {
        rows.iter().map(|r| model.is_anomaly(&r.feature_vector())).collect()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Average path length of an unsuccessful BST search over `n` points
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        },
    }
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
