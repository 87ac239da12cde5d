//! Multi-image inference with per-item outcomes

use crate::client::{upload_name, Detector, ImageUpload, InferenceRequest, InferenceResponse};
use crate::fanout::fan_out;
use serde::Serialize;
use sitecheck_core::{Config, CoreError, CoreResult};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub const MAX_BATCH_FILES: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub filename: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InferenceResponse>,
    pub detections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchItem {
    fn from_outcome(filename: String, outcome: CoreResult<InferenceResponse>) -> Self {
        match outcome {
            Ok(data) => Self {
                filename,
                success: true,
                detections: data.predictions.len(),
                data: Some(data),
                error: None,
            },
            Err(e) => Self::failed(filename, e.to_string()),
        }
    }

    fn failed(filename: String, error: String) -> Self {
        Self {
            filename,
            success: false,
            data: None,
            detections: 0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total_files: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_detections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub summary: BatchSummary,
    pub results: Vec<BatchItem>,
}

fn check_batch_size(count: usize) -> CoreResult<()> {
    if count == 0 {
        return Err(CoreError::validation("No files provided"));
    }
    if count > MAX_BATCH_FILES {
        return Err(CoreError::validation(format!(
            "Maximum {MAX_BATCH_FILES} files allowed per batch"
        )));
    }
    Ok(())
}

async fn infer_item<D: Detector>(
    detector: &D,
    image: ImageUpload,
    confidence: f64,
    overlap: f64,
) -> BatchItem {
    let filename = image.filename.clone();
    let request = InferenceRequest {
        image,
        confidence,
        overlap,
    };
    BatchItem::from_outcome(filename, detector.detect(request).await)
}

/// Infer every file concurrently. Item failures are reported, not raised.
pub async fn run_batch<D>(
    detector: Arc<D>,
    files: Vec<ImageUpload>,
    config: &Config,
) -> CoreResult<BatchReport>
where
    D: Detector + 'static,
{
    check_batch_size(files.len())?;
    info!(files = files.len(), "processing batch");
    let filenames: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();
    let (confidence, overlap) = (config.confidence, config.overlap);

    let outcomes = fan_out(files, config.max_concurrency, |_, image| {
        let detector = Arc::clone(&detector);
        async move { infer_item(&*detector, image, confidence, overlap).await }
    })
    .await;

    Ok(into_report(outcomes, filenames))
}

/// Like [`run_batch`], but each file is read inside its own task, so an
/// unreadable file becomes one failed item instead of failing the batch.
pub async fn run_batch_from_paths<D>(
    detector: Arc<D>,
    paths: Vec<PathBuf>,
    config: &Config,
) -> CoreResult<BatchReport>
where
    D: Detector + 'static,
{
    check_batch_size(paths.len())?;
    info!(files = paths.len(), "processing batch");
    let filenames: Vec<String> = paths.iter().map(|p| upload_name(p)).collect();
    let (confidence, overlap) = (config.confidence, config.overlap);

    let outcomes = fan_out(paths, config.max_concurrency, |_, path| {
        let detector = Arc::clone(&detector);
        async move {
            match ImageUpload::read(&path).await {
                Ok(image) => infer_item(&*detector, image, confidence, overlap).await,
                Err(e) => BatchItem::failed(
                    upload_name(&path),
                    format!("Failed to read {}: {e}", path.display()),
                ),
            }
        }
    })
    .await;

    Ok(into_report(outcomes, filenames))
}

fn into_report(outcomes: Vec<Option<BatchItem>>, filenames: Vec<String>) -> BatchReport {
    let results: Vec<BatchItem> = outcomes
        .into_iter()
        .zip(filenames)
        .map(|(item, filename)| {
            item.unwrap_or_else(|| BatchItem::failed(filename, "Processing failed".to_string()))
        })
        .collect();

    let successful = results.iter().filter(|r| r.success).count();
    let summary = BatchSummary {
        total_files: results.len(),
        successful,
        failed: results.len() - successful,
        total_detections: results.iter().map(|r| r.detections).sum(),
    };
    info!(
        successful = summary.successful,
        failed = summary.failed,
        "batch complete"
    );

    BatchReport { summary, results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockDetector;
    use std::future::Future;

    /// Fails any file whose name starts with `bad`
    struct Picky;

    impl Detector for Picky {
        fn detect(
            &self,
            request: InferenceRequest,
        ) -> impl Future<Output = CoreResult<InferenceResponse>> + Send {
            let outcome = if request.image.filename.starts_with("bad") {
                Err(CoreError::Dependency {
                    status: 500,
                    body: "{\"message\":\"model offline\"}".to_string(),
                })
            } else {
                Ok(MockDetector::response())
            };
            std::future::ready(outcome)
        }
    }

    fn image(name: &str) -> ImageUpload {
        ImageUpload::new(name, "image/jpeg", vec![0xff, 0xd8])
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let files = vec![image("a.jpg"), image("bad.jpg"), image("c.jpg")];
        let report = run_batch(Arc::new(Picky), files, &Config::new()).await.unwrap();

        assert_eq!(report.summary.total_files, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.total_detections, 4);

        let names: Vec<_> = report.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "bad.jpg", "c.jpg"]);
        assert!(!report.results[1].success);
        assert_eq!(report.results[1].detections, 0);
        assert!(report.results[1].error.as_deref().unwrap().contains("500"));
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let err = run_batch(Arc::new(MockDetector), vec![], &Config::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "validation error: No files provided");
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let files = (0..11).map(|i| image(&format!("{i}.jpg"))).collect();
        let err = run_batch(Arc::new(MockDetector), files, &Config::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Maximum 10 files allowed per batch"));
    }

    #[tokio::test]
    async fn test_item_wire_shape() {
        let report = run_batch(Arc::new(Picky), vec![image("bad.png")], &Config::new())
            .await
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["summary"]["totalFiles"], 1);
        assert!(json["results"][0].get("data").is_none());
        assert_eq!(json["results"][0]["success"], false);
    }

    #[tokio::test]
    async fn test_unreadable_path_fails_only_its_item() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.jpg");
        std::fs::write(&good, [0xff, 0xd8, 0xff]).unwrap();
        let missing = dir.path().join("missing.jpg");

        let report = run_batch_from_paths(
            Arc::new(MockDetector),
            vec![good, missing],
            &Config::new(),
        )
        .await
        .unwrap();

        assert_eq!(report.summary.total_files, 2);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.results[0].filename, "good.jpg");
        assert!(report.results[0].success);
        assert_eq!(report.results[1].filename, "missing.jpg");
        assert!(report.results[1]
            .error
            .as_deref()
            .unwrap()
            .starts_with("Failed to read"));
    }

    #[tokio::test]
    async fn test_path_batch_checks_size_first() {
        let err = run_batch_from_paths(Arc::new(MockDetector), vec![], &Config::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "validation error: No files provided");
    }
}
