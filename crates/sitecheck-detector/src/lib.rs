//! Hosted detector client with batch, validation and health fan-out

mod batch;
pub mod client;
mod fanout;
mod health;
mod validate;

pub use batch::{
    run_batch, run_batch_from_paths, BatchItem, BatchReport, BatchSummary, MAX_BATCH_FILES,
};
pub use client::{
    detector_from_config, AnyDetector, Detector, ImageUpload, InferenceRequest,
    InferenceResponse, MockDetector, RoboflowDetector,
};
pub use health::{
    check_health, health_score, ConnectivityStatus, EnvironmentStatus, HealthReport,
    HealthStatus, HttpModelProbe, ModelProbe, SystemInfo,
};
pub use validate::{
    run_validation, HttpImageFetcher, ImageFetcher, TestCase, TestCaseResult, ValidationReport,
    ValidationSummary, VALIDATION_CONFIDENCE, VALIDATION_OVERLAP,
};
