//! Classification metrics.

use ndarray::Array1;

/// Weighted F1: per-class F1 scores averaged with each class weighted by its
/// share of the true labels.
///
/// Classes that never occur in `truth` contribute no weight. The result is
/// always in `[0, 1]`.
#[must_use]
pub fn weighted_f1_score(truth: &Array1<usize>, predictions: &Array1<usize>) -> f64 {
    debug_assert_eq!(truth.len(), predictions.len());
    if truth.is_empty() {
        return 0.0;
    }

    let n_classes = truth
        .iter()
        .chain(predictions.iter())
        .max()
        .map_or(0, |&max| max + 1);

    let mut true_positives = vec![0usize; n_classes];
    let mut false_positives = vec![0usize; n_classes];
    let mut false_negatives = vec![0usize; n_classes];
    let mut support = vec![0usize; n_classes];

    for (&actual, &predicted) in truth.iter().zip(predictions.iter()) {
        support[actual] += 1;
        if actual == predicted {
            true_positives[actual] += 1;
        } else {
            false_positives[predicted] += 1;
            false_negatives[actual] += 1;
        }
    }

    let total = truth.len() as f64;
    let mut score = 0.0;

    for class in 0..n_classes {
        if support[class] == 0 {
            continue;
        }

        let predicted_count = true_positives[class] + false_positives[class];
        let actual_count = true_positives[class] + false_negatives[class];

        let precision = if predicted_count == 0 {
            0.0
        } else {
            true_positives[class] as f64 / predicted_count as f64
        };
        let recall = if actual_count == 0 {
            0.0
        } else {
            true_positives[class] as f64 / actual_count as f64
        };

        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        score += f1 * (support[class] as f64 / total);
    }

    score
}
