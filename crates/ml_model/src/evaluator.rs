//! Full-versus-reduced model comparison.

use dataset::PartitionedDataset;
use ndarray::Axis;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::metrics::weighted_f1_score;
use crate::{ForestConfig, RandomForestClassifier, TrainingError};

/// Outcome of comparing a full-feature model against a top-N reduced model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Weighted F1 of the model trained on every feature.
    pub full_model_f1_score: f64,

    /// Weighted F1 of the model trained on the selected features only.
    pub reduced_model_f1_score: f64,

    /// Relative degradation of the reduced model as a percentage of the
    /// full-model score. Negative when the reduced model scores higher.
    pub f1_difference_percentage: f64,

    /// Number of feature columns in the source data.
    pub total_features_evaluated: usize,

    /// Number of features actually retained; clamped to the feature count
    /// when more were requested.
    pub features_selected_count: usize,

    /// Selected feature names, most important first.
    pub top_features_list: Vec<String>,
}

/// Errors raised while running the comparison.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// The classifier rejected its parameters or data.
    #[error("model training failed: {0}")]
    TrainingFailed(#[from] TrainingError),

    /// The full model scored a weighted F1 of exactly zero, so the relative
    /// degradation is undefined.
    #[error("full model scored a weighted F1 of zero; relative degradation is undefined")]
    DegenerateMetric,
}

/// Trains a full and a top-`top_n` reduced forest and compares their
/// validation scores.
///
/// The reduced model is a fresh instance with the same configuration,
/// restricted to the `top_n` features the full model ranked highest. When
/// `top_n` exceeds the feature count, the selection clamps to every feature.
///
/// # Errors
///
/// Returns [`EvaluationError::TrainingFailed`] if either forest fails to fit
/// and [`EvaluationError::DegenerateMetric`] if the full model scores zero.
pub fn evaluate(
    data: &PartitionedDataset,
    config: &ForestConfig,
    top_n: usize,
) -> Result<EvaluationResult, EvaluationError> {
    let train = &data.train;
    let validation = &data.validation;

    info!(
        n_estimators = config.n_estimators,
        top_n,
        features = data.feature_names.len(),
        "training full model"
    );
    let full = RandomForestClassifier::fit(&train.records, &train.targets, config)?;
    let full_predictions = full.predict(&validation.records);
    let full_f1 = weighted_f1_score(&validation.targets, &full_predictions);

    let ranked = rank_features(&full.feature_importances());
    let selected_count = top_n.min(data.feature_names.len());
    let selected = &ranked[..selected_count];

    let top_features_list: Vec<String> = selected
        .iter()
        .map(|&feature| data.feature_names[feature].clone())
        .collect();

    debug!(selected = selected_count, "training reduced model");
    let reduced = RandomForestClassifier::fit(
        &train.records.select(Axis(1), selected),
        &train.targets,
        config,
    )?;
    let reduced_predictions = reduced.predict(&validation.records.select(Axis(1), selected));
    let reduced_f1 = weighted_f1_score(&validation.targets, &reduced_predictions);

    let f1_difference_percentage = degradation_percentage(full_f1, reduced_f1)?;

    Ok(EvaluationResult {
        full_model_f1_score: full_f1,
        reduced_model_f1_score: reduced_f1,
        f1_difference_percentage,
        total_features_evaluated: data.feature_names.len(),
        features_selected_count: selected_count,
        top_features_list,
    })
}

/// Feature indices sorted by descending importance. The sort is stable, so
/// equal importances keep their original column order.
fn rank_features(importances: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..importances.len()).collect();
    indices.sort_by(|&a, &b| {
        importances[b]
            .partial_cmp(&importances[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices
}

/// Relative score loss of the reduced model, as a percentage of the full
/// score. A zero full score has no defined relative loss.
fn degradation_percentage(full_f1: f64, reduced_f1: f64) -> Result<f64, EvaluationError> {
    if full_f1 == 0.0 {
        return Err(EvaluationError::DegenerateMetric);
    }
    Ok((full_f1 - reduced_f1) / full_f1 * 100.0)
}

#[cfg(test)]
mod tests {
    use dataset::Partition;
    use ndarray::{Array1, Array2};

    use super::*;

    /// Four-feature dataset where feature `f2` alone separates the classes
    /// and the others carry little signal.
    fn fixture() -> PartitionedDataset {
        let build = |n: usize, offset: f64| {
            let mut rows = Vec::new();
            let mut labels = Vec::new();
            for i in 0..n {
                let class = i % 2;
                let jitter = (i as f64).mul_add(0.01, offset);
                rows.extend_from_slice(&[
                    1.0,
                    jitter,
                    if class == 0 { -5.0 - jitter } else { 5.0 + jitter },
                    0.5,
                ]);
                labels.push(class);
            }
            Partition {
                records: Array2::from_shape_vec((n, 4), rows).expect("shape"),
                targets: Array1::from_vec(labels),
            }
        };

        PartitionedDataset {
            feature_names: vec![
                "f0".to_string(),
                "f1".to_string(),
                "f2".to_string(),
                "f3".to_string(),
            ],
            classes: vec!["benign".to_string(), "attack".to_string()],
            train: build(30, 0.0),
            validation: build(10, 0.003),
            test: build(10, 0.007),
        }
    }

    fn fast_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 8,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_selects_requested_feature_count() {
        let data = fixture();

        let result = evaluate(&data, &fast_config(), 2).expect("evaluate");

        assert_eq!(result.features_selected_count, 2);
        assert_eq!(result.top_features_list.len(), 2);
        assert_eq!(result.total_features_evaluated, 4);
    }

    #[test]
    fn test_top_features_are_distinct_known_names() {
        let data = fixture();

        let result = evaluate(&data, &fast_config(), 3).expect("evaluate");

        for name in &result.top_features_list {
            assert!(data.feature_names.contains(name));
        }
        let mut deduped = result.top_features_list.clone();
        deduped.dedup();
        assert_eq!(deduped, result.top_features_list);
    }

    #[test]
    fn test_informative_feature_ranks_first() {
        let data = fixture();

        let result = evaluate(&data, &fast_config(), 1).expect("evaluate");

        assert_eq!(result.top_features_list, vec!["f2"]);
        // A perfectly informative single feature keeps the score intact.
        assert!(result.f1_difference_percentage.abs() < 50.0);
    }

    #[test]
    fn test_oversized_top_n_clamps_to_feature_count() {
        let data = fixture();

        let result = evaluate(&data, &fast_config(), 1000).expect("evaluate");

        assert_eq!(result.features_selected_count, 4);
        assert_eq!(result.top_features_list.len(), 4);
    }

    #[test]
    fn test_scores_are_bounded_and_finite() {
        let data = fixture();

        let result = evaluate(&data, &fast_config(), 2).expect("evaluate");

        assert!((0.0..=1.0).contains(&result.full_model_f1_score));
        assert!((0.0..=1.0).contains(&result.reduced_model_f1_score));
        assert!(result.f1_difference_percentage.is_finite());
    }

    #[test]
    fn test_rank_features_breaks_ties_by_column_order() {
        let ranked = rank_features(&[0.5, 0.5, 0.9, 0.5]);

        assert_eq!(ranked, vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_zero_full_score_is_degenerate() {
        let err = degradation_percentage(0.0, 0.5).expect_err("zero full score must fail");

        assert!(matches!(err, EvaluationError::DegenerateMetric));
    }

    #[test]
    fn test_degradation_sign() {
        assert!(degradation_percentage(0.8, 0.6).expect("finite") > 0.0);
        assert!(degradation_percentage(0.6, 0.8).expect("finite") < 0.0);
    }
}
