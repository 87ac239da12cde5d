use super::{block_on, print_json, Workspace};
use sitecheck_detector::{detector_from_config, run_batch_from_paths, MAX_BATCH_FILES};
use sitecheck_records::NewDetectionEvent;
use std::path::PathBuf;
use std::sync::Arc;

pub fn run(ws: &Workspace, images: &[PathBuf]) -> anyhow::Result<()> {
    if images.len() > MAX_BATCH_FILES {
        anyhow::bail!("Maximum {} files allowed per batch", MAX_BATCH_FILES);
    }
    let config = ws.detector_config()?;
    let detector = Arc::new(detector_from_config(&config)?);
    let report = block_on(run_batch_from_paths(detector, images.to_vec(), &config))??;

    let recorded: Vec<NewDetectionEvent> = report
        .results
        .iter()
        .filter(|r| r.success)
        .filter_map(|item| {
            let data = item.data.as_ref()?;
            Some(NewDetectionEvent::new(item.filename.clone(), data.predictions.clone()))
        })
        .collect();
    if !recorded.is_empty() {
        ws.update(|store| {
            for new in recorded {
                store.insert(new)?;
            }
            Ok(())
        })?;
    }
    print_json(&report)
}
