//! ML model crate for the feature-selection service.
//!
//! Wraps `linfa-trees` decision trees in a seeded bagging ensemble that
//! exposes the per-feature importances the evaluator ranks features by, and
//! implements the full-versus-reduced model comparison.

mod evaluator;
mod metrics;

pub use evaluator::{evaluate, EvaluationError, EvaluationResult};
pub use metrics::weighted_f1_score;

use linfa::prelude::*;
use linfa::Dataset;
use linfa_trees::{DecisionTree, SplitQuality};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

/// Configuration for the random-forest classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestConfig {
    /// Number of trees in the ensemble.
    pub n_estimators: usize,
    /// Maximum depth per tree; `None` grows trees until pure.
    pub max_depth: Option<usize>,
    /// Worker threads for tree fitting; zero or negative uses all cores.
    pub n_jobs: i32,
    /// Seed for the bootstrap sampler.
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            max_depth: None,
            n_jobs: -1,
            seed: 42,
        }
    }
}

/// Errors raised while fitting the forest.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// The configuration was rejected before any tree was fit.
    #[error("invalid classifier configuration: {0}")]
    InvalidConfig(String),

    /// A tree rejected the training data.
    #[error("tree fitting failed: {0}")]
    Fit(String),
}

/// A bagging ensemble of Gini decision trees with majority-vote prediction.
#[derive(Debug)]
pub struct RandomForestClassifier {
    trees: Vec<DecisionTree<f64, usize>>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForestClassifier {
    /// Trains a forest on the given records and encoded labels.
    ///
    /// Each tree is fit on a bootstrap sample drawn from a per-tree seeded
    /// generator, so identical inputs and configuration produce an identical
    /// ensemble.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] if the configuration or data
    /// shape is unusable, and [`TrainingError::Fit`] if any tree fails to
    /// fit.
    pub fn fit(
        records: &Array2<f64>,
        targets: &Array1<usize>,
        config: &ForestConfig,
    ) -> Result<Self, TrainingError> {
        if config.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if records.nrows() == 0 {
            return Err(TrainingError::InvalidConfig(
                "training data has no rows".to_string(),
            ));
        }
        if records.nrows() != targets.len() {
            return Err(TrainingError::InvalidConfig(format!(
                "{} rows but {} labels",
                records.nrows(),
                targets.len()
            )));
        }

        let n_rows = records.nrows();
        let fit_one = |tree_index: usize| -> Result<DecisionTree<f64, usize>, TrainingError> {
            let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(tree_index as u64));
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect();

            let bootstrap = Dataset::new(
                records.select(Axis(0), &sample),
                targets.select(Axis(0), &sample),
            );

            DecisionTree::<f64, usize>::params()
                .split_quality(SplitQuality::Gini)
                .max_depth(config.max_depth)
                .fit(&bootstrap)
                .map_err(|e| TrainingError::Fit(e.to_string()))
        };

        let trees: Result<Vec<_>, TrainingError> = match thread_count(config.n_jobs) {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| TrainingError::InvalidConfig(e.to_string()))?;
                pool.install(|| (0..config.n_estimators).into_par_iter().map(fit_one).collect())
            }
            None => (0..config.n_estimators).into_par_iter().map(fit_one).collect(),
        };

        Ok(Self {
            trees: trees?,
            n_features: records.ncols(),
            n_classes: targets.iter().max().map_or(0, |&max| max + 1),
        })
    }

    /// Predicts class labels by majority vote across the ensemble.
    ///
    /// Vote ties resolve to the smallest class code.
    #[must_use]
    pub fn predict(&self, records: &Array2<f64>) -> Array1<usize> {
        let mut votes = Array2::<usize>::zeros((records.nrows(), self.n_classes.max(1)));

        for tree in &self.trees {
            let predictions = tree.predict(records);
            for (row, &class) in predictions.iter().enumerate() {
                if class < votes.ncols() {
                    votes[[row, class]] += 1;
                }
            }
        }

        let mut labels = Array1::zeros(records.nrows());
        for (row, row_votes) in votes.axis_iter(Axis(0)).enumerate() {
            let mut best = 0;
            let mut best_votes = 0;
            for (class, &count) in row_votes.iter().enumerate() {
                if count > best_votes {
                    best = class;
                    best_votes = count;
                }
            }
            labels[row] = best;
        }
        labels
    }

    /// Mean impurity-based feature importance across all trees, indexed by
    /// original column order.
    #[must_use]
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (feature, importance) in tree.feature_importance().iter().enumerate() {
                totals[feature] += importance;
            }
        }

        let count = self.trees.len() as f64;
        for total in &mut totals {
            *total /= count;
        }
        totals
    }

    /// Returns the number of feature columns the forest was trained on.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}

/// Explicit thread count for tree fitting, or `None` for all cores.
const fn thread_count(n_jobs: i32) -> Option<usize> {
    if n_jobs > 0 {
        Some(n_jobs as usize)
    } else {
        None
    }
}
