use super::{print_json, Workspace};
use sitecheck_records::NewDetectionEvent;
use std::io::Read;
use std::path::Path;

pub fn run(ws: &Workspace, file: Option<&Path>) -> anyhow::Result<()> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let new: NewDetectionEvent = serde_json::from_str(&raw)?;
    let event = ws.update(|store| Ok(store.insert(new)?))?;
    print_json(&event)
}
