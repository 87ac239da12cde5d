//! Labelled-image validation runs against the detector

use crate::client::{transport_error, Detector, ImageUpload, InferenceRequest};
use crate::fanout::fan_out;
use serde::{Deserialize, Serialize};
use sitecheck_core::{Config, CoreError, CoreResult};
use sitecheck_eval::{
    evaluate, overall_metrics, recommendations, Recommendation, ValidationMetrics,
};
use sitecheck_records::Detection;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Validation images are scored with a looser confidence than live traffic
pub const VALIDATION_CONFIDENCE: f64 = 0.3;
pub const VALIDATION_OVERLAP: f64 = 0.5;

/// Retrieves test images by URL
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = CoreResult<Vec<u8>>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpImageFetcher {
    pub fn new(config: &Config) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    async fn get(&self, url: &str) -> CoreResult<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoreError::Dependency {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        Ok(bytes.to_vec())
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = CoreResult<Vec<u8>>> + Send {
        self.get(url)
    }
}

/// One labelled image
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub expected_detections: Vec<Detection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_case_index: usize,
    pub image_url: Option<String>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<Detection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_detections: Option<Vec<Detection>>,
    pub validation: Option<ValidationMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestCaseResult {
    fn failed(index: usize, image_url: Option<String>, error: String) -> Self {
        Self {
            test_case_index: index,
            image_url,
            success: false,
            predictions: None,
            expected_detections: None,
            validation: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub total_tests: usize,
    pub successful_tests: usize,
    pub failed_tests: usize,
    pub overall_accuracy: f64,
    pub overall_precision: f64,
    pub overall_recall: f64,
    pub overall_f1_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub summary: ValidationSummary,
    pub results: Vec<TestCaseResult>,
    pub recommendations: Vec<Recommendation>,
}

async fn run_case<D, F>(
    index: usize,
    case: TestCase,
    detector: Arc<D>,
    fetcher: Arc<F>,
) -> TestCaseResult
where
    D: Detector,
    F: ImageFetcher,
{
    let Some(url) = case.image_url.clone().filter(|u| !u.trim().is_empty()) else {
        return TestCaseResult::failed(
            index,
            case.image_url,
            format!("Test case {index}: imageUrl is required"),
        );
    };

    let bytes = match fetcher.fetch(&url).await {
        Ok(bytes) => bytes,
        Err(e) => {
            return TestCaseResult::failed(
                index,
                Some(url.clone()),
                format!("Test case {index}: Failed to fetch image from {url}: {e}"),
            )
        }
    };

    let request = InferenceRequest {
        image: ImageUpload::new(format!("test_{index}.jpg"), "image/jpeg", bytes),
        confidence: VALIDATION_CONFIDENCE,
        overlap: VALIDATION_OVERLAP,
    };
    let predictions = match detector.detect(request).await {
        Ok(response) => response.predictions,
        Err(e) => {
            return TestCaseResult::failed(index, Some(url), format!("Test case {index}: {e}"))
        }
    };

    let validation = evaluate(&predictions, &case.expected_detections);
    TestCaseResult {
        test_case_index: index,
        image_url: Some(url),
        success: true,
        predictions: Some(predictions),
        expected_detections: Some(case.expected_detections),
        validation: Some(validation),
        error: None,
    }
}

/// Score the detector on every case. Failed cases are reported, never raised.
pub async fn run_validation<D, F>(
    detector: Arc<D>,
    fetcher: Arc<F>,
    cases: Vec<TestCase>,
    config: &Config,
) -> ValidationReport
where
    D: Detector + 'static,
    F: ImageFetcher + 'static,
{
    info!(cases = cases.len(), "running validation");
    let urls: Vec<Option<String>> = cases.iter().map(|c| c.image_url.clone()).collect();

    let outcomes = fan_out(cases, config.max_concurrency, |index, case| {
        run_case(index, case, Arc::clone(&detector), Arc::clone(&fetcher))
    })
    .await;

    let results: Vec<TestCaseResult> = outcomes
        .into_iter()
        .zip(urls)
        .enumerate()
        .map(|(index, (result, url))| {
            result.unwrap_or_else(|| TestCaseResult::failed(index, url, "Test failed".to_string()))
        })
        .collect();

    for failed in results.iter().filter(|r| !r.success) {
        warn!(
            case = failed.test_case_index,
            error = failed.error.as_deref().unwrap_or_default(),
            "validation case failed"
        );
    }

    let overall = overall_metrics(results.iter().filter_map(|r| r.validation.as_ref()));
    let successful_tests = results.iter().filter(|r| r.success).count();
    let summary = ValidationSummary {
        total_tests: results.len(),
        successful_tests,
        failed_tests: results.len() - successful_tests,
        overall_accuracy: overall.accuracy,
        overall_precision: overall.precision,
        overall_recall: overall.recall,
        overall_f1_score: overall.f1_score,
    };

    ValidationReport {
        summary,
        recommendations: recommendations(&overall),
        results,
    }
}
