//! Detector abstraction, the hosted HTTP client and the canned mock

use serde::{Deserialize, Serialize};
use sitecheck_core::{Config, CoreError, CoreResult};
use sitecheck_records::Detection;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Image bytes plus the metadata forwarded in the multipart part
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read an image from disk, guessing the content type from its extension
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_file_bytes(path, bytes))
    }

    /// Async read for use inside fan-out tasks
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self::from_file_bytes(path, bytes))
    }

    fn from_file_bytes(path: &Path, bytes: Vec<u8>) -> Self {
        let filename = upload_name(path);
        let content_type = content_type_for(&filename);
        Self::new(filename, content_type, bytes)
    }
}

/// Name reported for a file, whether or not it could be read
pub(crate) fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.jpg".to_string())
}

fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}

#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub image: ImageUpload,
    pub confidence: f64,
    pub overlap: f64,
}

impl InferenceRequest {
    /// Request using the configured thresholds
    pub fn with_config(image: ImageUpload, config: &Config) -> Self {
        Self {
            image,
            confidence: config.confidence,
            overlap: config.overlap,
        }
    }
}

/// Detector answer. Fields other than `predictions` and `time` are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    #[serde(default)]
    pub predictions: Vec<Detection>,
    #[serde(default)]
    pub time: f64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub trait Detector: Send + Sync {
    fn detect(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = CoreResult<InferenceResponse>> + Send;
}

/// Returns the same two predictions for every image
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDetector;

impl MockDetector {
    pub fn response() -> InferenceResponse {
        InferenceResponse {
            predictions: vec![
                Detection {
                    class: "helmet".to_string(),
                    confidence: 0.91,
                    x: 320.0,
                    y: 220.0,
                    width: 180.0,
                    height: 160.0,
                },
                Detection {
                    class: "vest".to_string(),
                    confidence: 0.84,
                    x: 315.0,
                    y: 360.0,
                    width: 220.0,
                    height: 240.0,
                },
            ],
            time: 42.0,
            extra: serde_json::Map::new(),
        }
    }
}

impl Detector for MockDetector {
    fn detect(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = CoreResult<InferenceResponse>> + Send {
        debug!(filename = %request.image.filename, "mock inference");
        std::future::ready(Ok(Self::response()))
    }
}

/// Hosted detector reached over HTTP
#[derive(Debug, Clone)]
pub struct RoboflowDetector {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_id: String,
    version: String,
    timeout: Duration,
}

impl RoboflowDetector {
    pub fn new(config: &Config) -> CoreResult<Self> {
        let (api_key, model_id) = config.require_credentials()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            version: config.model_version.clone(),
            timeout: config.request_timeout,
        })
    }

    fn endpoint(&self, confidence: f64, overlap: f64) -> CoreResult<reqwest::Url> {
        let base = format!("{}/{}/{}", self.base_url, self.model_id, self.version);
        reqwest::Url::parse_with_params(
            &base,
            [
                ("api_key", self.api_key.clone()),
                ("confidence", confidence.to_string()),
                ("overlap", overlap.to_string()),
            ],
        )
        .map_err(|e| CoreError::Configuration(format!("invalid detector URL {base}: {e}")))
    }

    async fn post(&self, request: InferenceRequest) -> CoreResult<InferenceResponse> {
        let url = self.endpoint(request.confidence, request.overlap)?;
        let filename = request.image.filename.clone();
        let part = reqwest::multipart::Part::bytes(request.image.bytes)
            .file_name(request.image.filename)
            .mime_str(&request.image.content_type)
            .map_err(|e| CoreError::validation(format!("invalid content type: {e}")))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!(%filename, model = %self.model_id, version = %self.version, "posting to detector");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !status.is_success() {
            warn!(%filename, status = status.as_u16(), "detector rejected image");
            return Err(CoreError::Dependency {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body)
            .map_err(|e| CoreError::Transport(format!("unreadable detector response: {e}")))
    }
}

impl Detector for RoboflowDetector {
    fn detect(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = CoreResult<InferenceResponse>> + Send {
        self.post(request)
    }
}

pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> CoreError {
    if err.is_timeout() {
        CoreError::DependencyTimeout(timeout)
    } else {
        CoreError::Transport(err.to_string())
    }
}

/// Either detector, chosen at runtime from configuration
#[derive(Debug, Clone)]
pub enum AnyDetector {
    Mock(MockDetector),
    Roboflow(RoboflowDetector),
}

impl Detector for AnyDetector {
    fn detect(
        &self,
        request: InferenceRequest,
    ) -> impl Future<Output = CoreResult<InferenceResponse>> + Send {
        async move {
            match self {
                AnyDetector::Mock(d) => d.detect(request).await,
                AnyDetector::Roboflow(d) => d.detect(request).await,
            }
        }
    }
}

/// Mock when `mock_inference` is set, otherwise the hosted client
pub fn detector_from_config(config: &Config) -> CoreResult<AnyDetector> {
    if config.mock_inference {
        return Ok(AnyDetector::Mock(MockDetector));
    }
    tracing::info!(
        api_key = %config.masked_api_key(),
        model = config.model_id.as_deref().unwrap_or("MISSING"),
        version = %config.model_version,
        "using hosted detector"
    );
    RoboflowDetector::new(config).map(AnyDetector::Roboflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::new();
        config.api_key = Some("secret-key".to_string());
        config.model_id = Some("ppe-detect".to_string());
        config.model_version = "3".to_string();
        config
    }

    #[test]
    fn test_endpoint_carries_thresholds() {
        let detector = RoboflowDetector::new(&configured()).unwrap();
        let url = detector.endpoint(0.3, 0.5).unwrap();
        assert_eq!(url.path(), "/ppe-detect/3");
        let query = url.query().unwrap();
        assert!(query.contains("api_key=secret-key"));
        assert!(query.contains("confidence=0.3"));
        assert!(query.contains("overlap=0.5"));
    }

    #[test]
    fn test_hosted_detector_requires_credentials() {
        let err = RoboflowDetector::new(&Config::new()).unwrap_err();
        assert!(matches!(err, CoreError::Configuration(_)));
    }

    #[test]
    fn test_mock_selected_without_credentials() {
        let mut config = Config::new();
        config.mock_inference = true;
        assert!(matches!(
            detector_from_config(&config).unwrap(),
            AnyDetector::Mock(_)
        ));
    }

    #[tokio::test]
    async fn test_mock_returns_canned_predictions() {
        let request = InferenceRequest::with_config(
            ImageUpload::new("yard.jpg", "image/jpeg", vec![1, 2, 3]),
            &Config::new(),
        );
        let response = MockDetector.detect(request).await.unwrap();
        assert_eq!(response.time, 42.0);
        assert_eq!(response.predictions.len(), 2);
        assert_eq!(response.predictions[0].class, "helmet");
        assert_eq!(response.predictions[1].confidence, 0.84);
    }

    #[test]
    fn test_response_keeps_unknown_fields() {
        let raw = r#"{"time":0.1,"image":{"width":640,"height":480},"predictions":[{"class":"vest","confidence":0.7,"x":1,"y":2,"width":3,"height":4}]}"#;
        let response: InferenceResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.predictions.len(), 1);
        assert_eq!(response.extra["image"]["width"], 640);
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("noext"), "image/jpeg");
    }

    mod wire {
        use super::*;
        use std::net::SocketAddr;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};
        use tokio::task::JoinHandle;

        /// Whether `buf` holds a full HTTP request, body included
        fn request_complete(buf: &[u8]) -> bool {
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                return false;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let body = &buf[end + 4..];
            let length = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok());
            match length {
                Some(length) => body.len() >= length,
                None if head.contains("transfer-encoding: chunked") => {
                    body.ends_with(b"0\r\n\r\n")
                }
                None => true,
            }
        }

        async fn read_request(stream: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request_complete(&buf) {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        /// Answers one request with `status` and a JSON `body`, returning the raw request
        async fn reply_once(
            status: &'static str,
            body: &'static str,
        ) -> (SocketAddr, JoinHandle<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                let request = read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).await.unwrap();
                stream.shutdown().await.ok();
                request
            });
            (addr, handle)
        }

        /// Accepts and reads a request but never answers it
        async fn never_reply() -> SocketAddr {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
                drop(stream);
            });
            addr
        }

        fn detector_at(addr: SocketAddr, timeout: Duration) -> RoboflowDetector {
            let mut config = configured();
            config.base_url = format!("http://{addr}");
            config.request_timeout = timeout;
            RoboflowDetector::new(&config).unwrap()
        }

        fn request() -> InferenceRequest {
            InferenceRequest {
                image: ImageUpload::new("gate.jpg", "image/jpeg", vec![0xff, 0xd8, 0xff]),
                confidence: 0.4,
                overlap: 0.5,
            }
        }

        #[tokio::test]
        async fn test_success_parses_predictions_and_sends_multipart() {
            let body = r#"{"time":0.2,"predictions":[{"class":"helmet","confidence":0.9,"x":1,"y":2,"width":3,"height":4}]}"#;
            let (addr, server) = reply_once("200 OK", body).await;

            let response = detector_at(addr, Duration::from_secs(5))
                .detect(request())
                .await
                .unwrap();
            assert_eq!(response.predictions.len(), 1);
            assert_eq!(response.predictions[0].class, "helmet");

            let raw = server.await.unwrap();
            assert!(raw.starts_with(
                "POST /ppe-detect/3?api_key=secret-key&confidence=0.4&overlap=0.5 "
            ));
            assert!(raw.contains("name=\"file\"; filename=\"gate.jpg\""));
            assert!(raw.to_ascii_lowercase().contains("multipart/form-data"));
        }

        #[tokio::test]
        async fn test_rejection_keeps_status_and_body_verbatim() {
            let body = r#"{"message":"Forbidden: invalid api_key"}"#;
            let (addr, server) = reply_once("403 Forbidden", body).await;

            let err = detector_at(addr, Duration::from_secs(5))
                .detect(request())
                .await
                .unwrap_err();
            match err {
                CoreError::Dependency { status, body: got } => {
                    assert_eq!(status, 403);
                    assert_eq!(got, body);
                }
                other => panic!("expected Dependency, got {other:?}"),
            }
            server.await.unwrap();
        }

        #[tokio::test]
        async fn test_silent_detector_times_out() {
            let addr = never_reply().await;
            let timeout = Duration::from_millis(100);

            let err = detector_at(addr, timeout).detect(request()).await.unwrap_err();
            assert!(
                matches!(err, CoreError::DependencyTimeout(t) if t == timeout),
                "expected DependencyTimeout, got {err:?}"
            );
        }

        #[tokio::test]
        async fn test_unparseable_success_body_is_transport_error() {
            let (addr, server) = reply_once("200 OK", "not json").await;
            let err = detector_at(addr, Duration::from_secs(5))
                .detect(request())
                .await
                .unwrap_err();
            assert!(matches!(err, CoreError::Transport(_)));
            server.await.unwrap();
        }
    }
}
