//! Detection record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bounding-box prediction returned by the detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

impl Detection {
    /// Label-only detection, as supplied by a human reviewer
    pub fn labeled(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            confidence: 0.0,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Per-event compliance counts, derived once at insertion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceSummary {
    pub total_detections: usize,
    pub helmet_count: usize,
    pub vest_count: usize,
    pub no_helmet_count: usize,
    pub no_vest_count: usize,
}

/// One inspected image with its detections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<String>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    pub summary: ComplianceSummary,
}

/// Ingestion payload. Required fields are optional here so that a missing
/// field can be reported by name instead of as a generic parse failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDetectionEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub supervisor: Option<String>,
    #[serde(default)]
    pub detections: Option<Vec<Detection>>,
}

impl NewDetectionEvent {
    pub fn new(filename: impl Into<String>, detections: Vec<Detection>) -> Self {
        Self {
            filename: Some(filename.into()),
            detections: Some(detections),
            ..Default::default()
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_supervisor(mut self, supervisor: impl Into<String>) -> Self {
        self.supervisor = Some(supervisor.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Names of required fields that are absent. An empty filename counts as absent.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.filename.as_deref().is_none_or(str::is_empty) {
            missing.push("filename");
        }
        if self.detections.is_none() {
            missing.push("detections");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_uses_camel_case_wire_names() {
        let event = DetectionEvent {
            id: "det_1".to_string(),
            timestamp: "2025-03-01T08:00:00Z".parse().unwrap(),
            filename: "gate.jpg".to_string(),
            site: Some("North Yard".to_string()),
            supervisor: None,
            detections: vec![Detection::labeled("helmet")],
            summary: ComplianceSummary {
                total_detections: 1,
                helmet_count: 1,
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["summary"]["totalDetections"], 1);
        assert_eq!(json["summary"]["noHelmetCount"], 0);
        assert_eq!(json["site"], "North Yard");
        assert!(json.get("supervisor").is_none());
    }

    #[test]
    fn test_detection_parses_label_only() {
        let parsed: Detection = serde_json::from_str(r#"{"class":"no-vest"}"#).unwrap();
        assert_eq!(parsed, Detection::labeled("no-vest"));
    }

    #[test]
    fn test_detection_ignores_extra_detector_fields() {
        let raw = r#"{"x":320,"y":220,"width":180,"height":160,"class":"helmet","confidence":0.91,"class_id":0,"detection_id":"abc"}"#;
        let parsed: Detection = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.class, "helmet");
        assert_eq!(parsed.width, 180.0);
    }

    #[test]
    fn test_missing_fields_named() {
        let payload: NewDetectionEvent = serde_json::from_str(r#"{"site":"A"}"#).unwrap();
        assert_eq!(payload.missing_fields(), vec!["filename", "detections"]);

        let payload: NewDetectionEvent =
            serde_json::from_str(r#"{"filename":"a.jpg","detections":[]}"#).unwrap();
        assert!(payload.missing_fields().is_empty());
    }
}
