//! Credential and connectivity probe with a 0-100 score

use chrono::{DateTime, Utc};
use serde::Serialize;
use sitecheck_core::{Config, CoreError, CoreResult};
use std::future::Future;
use std::time::Instant;
use tracing::{info, warn};

const FAST_RESPONSE_MS: u64 = 1000;
const SLOW_RESPONSE_MS: u64 = 3000;

/// Checks that the hosted model answers for the given credentials
pub trait ModelProbe: Send + Sync {
    /// `Err` carries a human-readable reason
    fn probe(
        &self,
        api_key: &str,
        model_id: &str,
        version: &str,
    ) -> impl Future<Output = Result<(), String>> + Send;
}

/// GET on the model metadata endpoint
#[derive(Debug, Clone)]
pub struct HttpModelProbe {
    client: reqwest::Client,
    api_url: String,
}

impl HttpModelProbe {
    pub fn new(config: &Config) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, api_key: &str, model_id: &str, version: &str) -> Result<(), String> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/{}/{}", self.api_url, model_id, version),
            [("api_key", api_key)],
        )
        .map_err(|e| e.to_string())?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
        }
    }
}

impl ModelProbe for HttpModelProbe {
    fn probe(
        &self,
        api_key: &str,
        model_id: &str,
        version: &str,
    ) -> impl Future<Output = Result<(), String>> + Send {
        self.get(api_key, model_id, version)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Which credentials are present. Values are never echoed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentStatus {
    pub api_key: bool,
    pub model_id: bool,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub connected: bool,
    /// Milliseconds; 0 when no request was made
    pub response_time: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub version: &'static str,
    pub platform: &'static str,
    pub arch: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub score: u8,
    pub timestamp: DateTime<Utc>,
    pub environment: EnvironmentStatus,
    pub roboflow: ConnectivityStatus,
    pub system: SystemInfo,
}

/// 20 per credential, 40 for connectivity, up to 10 more for a fast answer
pub fn health_score(env: &EnvironmentStatus, conn: &ConnectivityStatus) -> u8 {
    let mut score = 0u8;
    if env.api_key {
        score += 20;
    }
    if env.model_id {
        score += 20;
    }
    if conn.connected {
        score += 40;
        if conn.response_time < FAST_RESPONSE_MS {
            score += 10;
        } else if conn.response_time < SLOW_RESPONSE_MS {
            score += 5;
        }
    }
    score.min(100)
}

pub async fn check_health<P: ModelProbe>(config: &Config, prober: &P) -> HealthReport {
    let environment = EnvironmentStatus {
        api_key: config.api_key.is_some(),
        model_id: config.model_id.is_some(),
        version: config.model_version.clone(),
    };

    let roboflow = match config.require_credentials() {
        Ok((api_key, model_id)) => {
            let started = Instant::now();
            let outcome = prober.probe(api_key, model_id, &config.model_version).await;
            let response_time = started.elapsed().as_millis() as u64;
            match outcome {
                Ok(()) => ConnectivityStatus {
                    connected: true,
                    response_time,
                    error: None,
                },
                Err(error) => {
                    warn!(%error, "detector health probe failed");
                    ConnectivityStatus {
                        connected: false,
                        response_time,
                        error: Some(error),
                    }
                }
            }
        }
        Err(_) => ConnectivityStatus {
            connected: false,
            response_time: 0,
            error: Some("Missing API key or model ID".to_string()),
        },
    };

    let status = if roboflow.connected && environment.api_key && environment.model_id {
        HealthStatus::Healthy
    } else {
        HealthStatus::Unhealthy
    };
    let score = health_score(&environment, &roboflow);
    info!(?status, score, "health check");

    HealthReport {
        status,
        score,
        timestamp: Utc::now(),
        environment,
        roboflow,
        system: SystemInfo {
            version: env!("CARGO_PKG_VERSION"),
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
        },
    }
}
