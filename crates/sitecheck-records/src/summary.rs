//! Compliance summary calculation

use crate::types::{ComplianceSummary, Detection};

impl ComplianceSummary {
    /// Count PPE labels by case-insensitive substring match.
    ///
    /// A label containing `no-` never counts as a positive, so `no-helmet`
    /// only feeds `no_helmet_count`. Labels outside the PPE vocabulary still
    /// count toward `total_detections`.
    pub fn from_detections(detections: &[Detection]) -> Self {
        let mut summary = Self {
            total_detections: detections.len(),
            ..Default::default()
        };

        for detection in detections {
            let class = detection.class.to_lowercase();
            let negated = class.contains("no-");
            if class.contains("helmet") && !negated {
                summary.helmet_count += 1;
            }
            if class.contains("vest") && !negated {
                summary.vest_count += 1;
            }
            if class.contains("no-helmet") {
                summary.no_helmet_count += 1;
            }
            if class.contains("no-vest") {
                summary.no_vest_count += 1;
            }
        }

        summary
    }

    /// Helmet compliance percentage, unrounded
    pub fn helmet_compliance(&self) -> f64 {
        compliance_rate(self.helmet_count, self.no_helmet_count)
    }

    /// Vest compliance percentage, unrounded
    pub fn vest_compliance(&self) -> f64 {
        compliance_rate(self.vest_count, self.no_vest_count)
    }
}

/// `positive / (positive + negative) * 100`, or 0 when both are 0
pub fn compliance_rate(positive: usize, negative: usize) -> f64 {
    let total = positive + negative;
    if total == 0 {
        return 0.0;
    }
    positive as f64 / total as f64 * 100.0
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
