//! Count-based precision/recall/F1 between predicted and expected labels
//!
//! Matching is per category count only. Two helmets predicted anywhere in the
//! image against two helmets expected count as two true positives; box
//! positions are never compared.

use serde::{Deserialize, Serialize};
use sitecheck_records::{round_to, Detection};
use std::collections::HashMap;

/// Labels that take part in scoring. Anything else is ignored.
pub const CATEGORIES: [&str; 4] = ["helmet", "vest", "no-helmet", "no-vest"];

const METRIC_DECIMALS: i32 = 3;

/// Predicted vs expected occurrences of one category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassCounts {
    pub predicted: usize,
    pub expected: usize,
}

impl ClassCounts {
    pub fn true_positives(&self) -> usize {
        self.predicted.min(self.expected)
    }

    pub fn false_positives(&self) -> usize {
        self.predicted.saturating_sub(self.expected)
    }

    pub fn false_negatives(&self) -> usize {
        self.expected.saturating_sub(self.predicted)
    }
}

/// Scores for a single test image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

/// Mean scores across successful test images
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
}

fn count_by_category(
    predictions: &[Detection],
    expected: &[Detection],
) -> HashMap<&'static str, ClassCounts> {
    let mut counts: HashMap<&'static str, ClassCounts> =
        CATEGORIES.iter().map(|c| (*c, ClassCounts::default())).collect();

    for p in predictions {
        if let Some(entry) = CATEGORIES
            .iter()
            .find(|c| **c == p.class)
            .and_then(|c| counts.get_mut(c))
        {
            entry.predicted += 1;
        }
    }
    for e in expected {
        if let Some(entry) = CATEGORIES
            .iter()
            .find(|c| **c == e.class)
            .and_then(|c| counts.get_mut(c))
        {
            entry.expected += 1;
        }
    }

    counts
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Score `predictions` against reviewer-supplied `expected` labels
pub fn evaluate(predictions: &[Detection], expected: &[Detection]) -> ValidationMetrics {
    if expected.is_empty() {
        return ValidationMetrics {
            accuracy: if predictions.is_empty() { 1.0 } else { 0.0 },
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            false_positives: predictions.len(),
            false_negatives: 0,
            true_positives: 0,
        };
    }

    let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
    for counts in count_by_category(predictions, expected).values() {
        tp += counts.true_positives();
        fp += counts.false_positives();
        fn_ += counts.false_negatives();
    }

    let precision = ratio(tp as f64, (tp + fp) as f64);
    let recall = ratio(tp as f64, (tp + fn_) as f64);
    let f1_score = ratio(2.0 * precision * recall, precision + recall);
    // Can go negative when the detector is badly off; kept as-is.
    let accuracy = (tp as f64 + (expected.len() as f64 - fp as f64 - fn_ as f64))
        / expected.len() as f64;

    ValidationMetrics {
        accuracy: round_to(accuracy, METRIC_DECIMALS),
        precision: round_to(precision, METRIC_DECIMALS),
        recall: round_to(recall, METRIC_DECIMALS),
        f1_score: round_to(f1_score, METRIC_DECIMALS),
        false_positives: fp,
        false_negatives: fn_,
        true_positives: tp,
    }
}

/// Unweighted mean of each metric; zeros when nothing succeeded
pub fn overall_metrics<'a, I>(results: I) -> OverallMetrics
where
    I: IntoIterator<Item = &'a ValidationMetrics>,
{
    let mut sum = OverallMetrics::default();
    let mut n = 0usize;
    for m in results {
        sum.accuracy += m.accuracy;
        sum.precision += m.precision;
        sum.recall += m.recall;
        sum.f1_score += m.f1_score;
        n += 1;
    }
    if n == 0 {
        return OverallMetrics::default();
    }

    let n = n as f64;
    OverallMetrics {
        accuracy: round_to(sum.accuracy / n, METRIC_DECIMALS),
        precision: round_to(sum.precision / n, METRIC_DECIMALS),
        recall: round_to(sum.recall / n, METRIC_DECIMALS),
        f1_score: round_to(sum.f1_score / n, METRIC_DECIMALS),
    }
}
