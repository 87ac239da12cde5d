//! Detector and store configuration

use crate::error::{CoreError, CoreResult};
use crate::store::DEFAULT_CAPACITY;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://detect.roboflow.com";
pub const DEFAULT_API_URL: &str = "https://api.roboflow.com";

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Detector API key
    pub api_key: Option<String>,

    /// Hosted model identifier
    pub model_id: Option<String>,

    /// Hosted model version
    pub model_version: String,

    /// Minimum confidence for returned predictions
    pub confidence: f64,

    /// NMS overlap threshold
    pub overlap: f64,

    /// Inference endpoint
    pub base_url: String,

    /// Model metadata endpoint used by the health probe
    pub api_url: String,

    /// Answer with canned predictions instead of calling the detector
    pub mock_inference: bool,

    /// Bound on every outbound detector call
    pub request_timeout: Duration,

    /// Max in-flight detector calls during batch and validation runs
    pub max_concurrency: usize,

    /// Max records kept by the store
    pub store_capacity: usize,
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_key: None,
            model_id: None,
            model_version: "1".to_string(),
            confidence: 0.4,
            overlap: 0.5,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            mock_inference: false,
            request_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            store_capacity: DEFAULT_CAPACITY,
        }
    }

    /// Read configuration from the process environment
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup. Unset or blank values keep defaults.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::new();

        config.api_key = get("ROBOFLOW_API_KEY");
        config.model_id = get("ROBOFLOW_MODEL_ID");
        if let Some(version) = get("ROBOFLOW_MODEL_VERSION") {
            config.model_version = version;
        }
        if let Some(raw) = get("ROBOFLOW_CONFIDENCE") {
            config.confidence = parse_value("ROBOFLOW_CONFIDENCE", &raw)?;
        }
        if let Some(raw) = get("ROBOFLOW_OVERLAP") {
            config.overlap = parse_value("ROBOFLOW_OVERLAP", &raw)?;
        }
        if let Some(url) = get("ROBOFLOW_BASE_URL") {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = get("ROBOFLOW_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        config.mock_inference = get("MOCK_INFER").as_deref() == Some("1");
        if let Some(raw) = get("SITECHECK_TIMEOUT_SECS") {
            config.request_timeout =
                Duration::from_secs(parse_value("SITECHECK_TIMEOUT_SECS", &raw)?);
        }
        if let Some(raw) = get("SITECHECK_MAX_CONCURRENCY") {
            config.max_concurrency = parse_value::<usize>("SITECHECK_MAX_CONCURRENCY", &raw)?.max(1);
        }
        config.store_capacity = Self::store_capacity_from_lookup(&lookup)?;

        Ok(config)
    }

    /// Store cap alone. Commands that never call the detector read only this,
    /// so a bad detector setting cannot block them.
    pub fn store_capacity_from_env() -> CoreResult<usize> {
        Self::store_capacity_from_lookup(|key| std::env::var(key).ok())
    }

    pub fn store_capacity_from_lookup<F>(lookup: F) -> CoreResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup("SITECHECK_STORE_CAPACITY").filter(|v| !v.trim().is_empty()) {
            Some(raw) => parse_value("SITECHECK_STORE_CAPACITY", &raw),
            None => Ok(DEFAULT_CAPACITY),
        }
    }

    /// Key and model id, or a configuration error naming what is missing
    pub fn require_credentials(&self) -> CoreResult<(&str, &str)> {
        match (self.api_key.as_deref(), self.model_id.as_deref()) {
            (Some(key), Some(model)) => Ok((key, model)),
            _ => Err(CoreError::Configuration(
                "Missing ROBOFLOW_API_KEY or ROBOFLOW_MODEL_ID".to_string(),
            )),
        }
    }

    /// API key reduced to a loggable prefix
    pub fn masked_api_key(&self) -> String {
        match &self.api_key {
            Some(key) => format!("{}...", key.chars().take(4).collect::<String>()),
            None => "MISSING".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, raw: &str) -> CoreResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Configuration(format!("{key} has an invalid value: {raw}")))
}
