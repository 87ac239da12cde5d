use super::{block_on, print_json, Workspace};
use serde::Deserialize;
use sitecheck_detector::{detector_from_config, run_validation, HttpImageFetcher, TestCase};
use std::path::Path;
use std::sync::Arc;

/// Either a bare array of cases or `{"testImages": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ValidationInput {
    Wrapped {
        #[serde(rename = "testImages")]
        test_images: Vec<TestCase>,
    },
    Bare(Vec<TestCase>),
}

pub fn run(ws: &Workspace, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let cases = match serde_json::from_str::<ValidationInput>(&raw) {
        Ok(ValidationInput::Wrapped { test_images }) => test_images,
        Ok(ValidationInput::Bare(cases)) => cases,
        Err(_) => anyhow::bail!("testImages array is required"),
    };

    let config = ws.detector_config()?;
    let detector = Arc::new(detector_from_config(&config)?);
    let fetcher = Arc::new(HttpImageFetcher::new(&config)?);
    let report = block_on(run_validation(detector, fetcher, cases, &config))?;
    print_json(&report)
}
