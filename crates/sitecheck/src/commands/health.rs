use super::{block_on, print_json, Workspace};
use sitecheck_detector::{check_health, HttpModelProbe};

pub fn run(ws: &Workspace) -> anyhow::Result<()> {
    let config = ws.detector_config()?;
    let probe = HttpModelProbe::new(&config)?;
    let report = block_on(check_health(&config, &probe))?;
    print_json(&report)
}
