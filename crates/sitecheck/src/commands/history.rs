use super::{print_json, Workspace};
use crate::cli::FilterArgs;
use sitecheck_core::query::query_history;
use sitecheck_core::{Page, RecordFilter};

pub fn filter_from_args(args: &FilterArgs) -> sitecheck_core::CoreResult<RecordFilter> {
    RecordFilter::from_params(
        args.start_date.as_deref(),
        args.end_date.as_deref(),
        args.site.as_deref(),
        args.supervisor.as_deref(),
    )
}

pub fn run(
    ws: &Workspace,
    args: &FilterArgs,
    limit: Option<&str>,
    offset: Option<&str>,
) -> anyhow::Result<()> {
    let filter = filter_from_args(args)?;
    let page = Page::from_params(limit, offset)?;
    let records = ws.store.list();
    print_json(&query_history(&records, &filter, page))
}
