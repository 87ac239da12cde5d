use super::history::filter_from_args;
use super::Workspace;
use crate::cli::FilterArgs;
use chrono::Utc;
use sitecheck_core::export::render;
use sitecheck_core::query::sort_newest_first;
use sitecheck_core::ExportFormat;
use sitecheck_records::atomic_write;
use std::path::Path;

pub fn run(
    ws: &Workspace,
    format: &str,
    args: &FilterArgs,
    output: Option<&Path>,
    stdout: bool,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let filter = filter_from_args(args)?;
    let mut records = filter.apply(&ws.store.list());
    sort_newest_first(&mut records);

    let export = render(&records, format, Utc::now())?;
    if stdout {
        println!("{}", export.body);
        return Ok(());
    }

    let path = match output {
        Some(path) => path.to_path_buf(),
        None => {
            let dir = ws.paths.exports_dir();
            std::fs::create_dir_all(&dir)?;
            dir.join(&export.filename)
        }
    };
    atomic_write(&path, export.body.as_bytes())?;
    tracing::info!(records = records.len(), content_type = export.content_type, "export written");
    println!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}
