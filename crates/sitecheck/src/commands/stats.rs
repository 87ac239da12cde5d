use super::{print_json, Workspace};
use chrono::Utc;
use sitecheck_core::stats::compute_statistics;
use sitecheck_core::{Period, StatisticsQuery};

pub fn run(
    ws: &Workspace,
    period: &str,
    site: Option<String>,
    supervisor: Option<String>,
) -> anyhow::Result<()> {
    let query = StatisticsQuery {
        period: period.parse::<Period>()?,
        site: site.filter(|s| !s.trim().is_empty()),
        supervisor: supervisor.filter(|s| !s.trim().is_empty()),
    };
    let records = ws.store.list();
    print_json(&compute_statistics(&records, &query, Utc::now()))
}
