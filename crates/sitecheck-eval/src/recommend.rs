//! Rule table turning aggregate metrics into tuning advice

use crate::metrics::OverallMetrics;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Accuracy,
    Precision,
    Recall,
    #[serde(rename = "f1score")]
    F1Score,
    Success,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub message: String,
    pub severity: Severity,
}

struct Rule {
    kind: RecommendationKind,
    severity: Severity,
    fires: fn(&OverallMetrics) -> bool,
    message: &'static str,
}

const RULES: &[Rule] = &[
    Rule {
        kind: RecommendationKind::Accuracy,
        severity: Severity::High,
        fires: |m| m.accuracy < 0.80,
        message: "Model accuracy is below 80%. Consider retraining with more diverse data.",
    },
    Rule {
        kind: RecommendationKind::Precision,
        severity: Severity::Medium,
        fires: |m| m.precision < 0.70,
        message: "High false positive rate detected. Consider increasing confidence threshold.",
    },
    Rule {
        kind: RecommendationKind::Recall,
        severity: Severity::Medium,
        fires: |m| m.recall < 0.70,
        message: "High false negative rate detected. Consider decreasing confidence threshold.",
    },
    Rule {
        kind: RecommendationKind::F1Score,
        severity: Severity::High,
        fires: |m| m.f1_score < 0.75,
        message: "Overall F1 score is low. Model may need retraining or parameter tuning.",
    },
];

const ALL_CLEAR: &str = "Model performance is good. Continue monitoring with regular validation.";

/// Every rule that fires, in table order; a single low-severity all-clear otherwise
pub fn recommendations(metrics: &OverallMetrics) -> Vec<Recommendation> {
    let mut out: Vec<Recommendation> = RULES
        .iter()
        .filter(|rule| (rule.fires)(metrics))
        .map(|rule| Recommendation {
            kind: rule.kind,
            message: rule.message.to_string(),
            severity: rule.severity,
        })
        .collect();

    if out.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::Success,
            message: ALL_CLEAR.to_string(),
            severity: Severity::Low,
        });
    }
    out
}
