use super::{block_on, print_json, Workspace};
use sitecheck_detector::{detector_from_config, Detector, ImageUpload, InferenceRequest};
use sitecheck_records::NewDetectionEvent;
use std::path::Path;

pub fn run(
    ws: &Workspace,
    image: &Path,
    site: Option<String>,
    supervisor: Option<String>,
    record: bool,
) -> anyhow::Result<()> {
    let config = ws.detector_config()?;
    let detector = detector_from_config(&config)?;
    let upload = ImageUpload::from_path(image)?;
    let filename = upload.filename.clone();
    let request = InferenceRequest::with_config(upload, &config);
    let response = block_on(detector.detect(request))??;

    if !record {
        return print_json(&response);
    }

    let mut new = NewDetectionEvent::new(filename, response.predictions);
    new.site = site;
    new.supervisor = supervisor;
    let event = ws.update(|store| Ok(store.insert(new)?))?;
    print_json(&event)
}
