//! Detector validation metrics and recommendations

mod metrics;
mod recommend;

pub use metrics::{
    evaluate, overall_metrics, ClassCounts, OverallMetrics, ValidationMetrics, CATEGORIES,
};
pub use recommend::{recommendations, Recommendation, RecommendationKind, Severity};
