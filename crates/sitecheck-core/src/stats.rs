//! Compliance statistics over a filtered record snapshot
//!
//! Everything here is recomputed from the snapshot on each call. The store is
//! capped, so a full rescan stays cheap.

use crate::error::{CoreError, CoreResult};
use crate::query::RecordFilter;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sitecheck_records::{compliance_rate, round_to, DetectionEvent};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub const UNKNOWN_SITE: &str = "Unknown";
pub const MAX_SITES: usize = 10;
pub const MAX_TOP_DETECTIONS: usize = 5;

/// Relative aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Period {
    #[serde(rename = "1d")]
    Day,
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
    #[serde(rename = "all")]
    All,
}

impl Period {
    pub fn days(self) -> Option<i64> {
        match self {
            Period::Day => Some(1),
            Period::Week => Some(7),
            Period::Month => Some(30),
            Period::Quarter => Some(90),
            Period::All => None,
        }
    }

    /// Cutoff relative to `now`; `None` for `all`
    pub fn start_date(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.days().map(|d| now - Duration::days(d))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Day => "1d",
            Period::Week => "7d",
            Period::Month => "30d",
            Period::Quarter => "90d",
            Period::All => "all",
        }
    }
}

impl FromStr for Period {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Period::Day),
            "7d" => Ok(Period::Week),
            "30d" => Ok(Period::Month),
            "90d" => Ok(Period::Quarter),
            "all" => Ok(Period::All),
            other => Err(CoreError::validation(format!(
                "period must be one of 1d, 7d, 30d, 90d, all; got {other}"
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of a statistics request
#[derive(Debug, Clone, Default)]
pub struct StatisticsQuery {
    pub period: Period,
    pub site: Option<String>,
    pub supervisor: Option<String>,
}

impl StatisticsQuery {
    /// The record filter for this query at `now`
    pub fn filter(&self, now: DateTime<Utc>) -> RecordFilter {
        RecordFilter {
            start_date: self.period.start_date(now),
            end_date: None,
            site: self.site.clone(),
            supervisor: self.supervisor.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub period: Period,
    pub date_range: DateRange,
    pub summary: SummaryTotals,
    pub daily_trends: Vec<DailyBucket>,
    pub site_statistics: Vec<SiteRollup>,
    pub top_detections: TopDetections,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryTotals {
    pub total_scans: usize,
    pub total_detections: usize,
    pub total_helmets: usize,
    pub total_vests: usize,
    pub total_no_helmets: usize,
    pub total_no_vests: usize,
    pub helmet_compliance_rate: f64,
    pub vest_compliance_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyBucket {
    pub date: String,
    pub scans: usize,
    pub detections: usize,
    pub helmets: usize,
    pub vests: usize,
    pub no_helmets: usize,
    pub no_vests: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRollup {
    pub site: String,
    pub scans: usize,
    pub total_detections: usize,
    pub helmet_compliance: f64,
    pub vest_compliance: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopDetections {
    pub most_detections: Vec<TopDetection>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopDetection {
    pub id: String,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub detections: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

/// Apply the query filter to `records` and aggregate the result
pub fn compute_statistics(
    records: &[DetectionEvent],
    query: &StatisticsQuery,
    now: DateTime<Utc>,
) -> Statistics {
    let filter = query.filter(now);
    let filtered = filter.apply(records);

    tracing::debug!(
        period = %query.period,
        scanned = records.len(),
        matched = filtered.len(),
        "computing statistics"
    );

    Statistics {
        period: query.period,
        date_range: DateRange {
            start: filter.start_date,
            end: now,
        },
        summary: summary_totals(&filtered),
        daily_trends: daily_trends(&filtered),
        site_statistics: site_rollups(&filtered),
        top_detections: TopDetections {
            most_detections: top_detections(&filtered, MAX_TOP_DETECTIONS),
        },
    }
}

pub fn summary_totals(records: &[DetectionEvent]) -> SummaryTotals {
    let mut totals = SummaryTotals {
        total_scans: records.len(),
        ..Default::default()
    };
    for r in records {
        totals.total_detections += r.summary.total_detections;
        totals.total_helmets += r.summary.helmet_count;
        totals.total_vests += r.summary.vest_count;
        totals.total_no_helmets += r.summary.no_helmet_count;
        totals.total_no_vests += r.summary.no_vest_count;
    }
    totals.helmet_compliance_rate = round_to(
        compliance_rate(totals.total_helmets, totals.total_no_helmets),
        2,
    );
    totals.vest_compliance_rate =
        round_to(compliance_rate(totals.total_vests, totals.total_no_vests), 2);
    totals
}

/// One bucket per UTC calendar day, ascending by date
pub fn daily_trends(records: &[DetectionEvent]) -> Vec<DailyBucket> {
    let mut by_day: HashMap<String, DailyBucket> = HashMap::new();

    for r in records {
        let date = r.timestamp.format("%Y-%m-%d").to_string();
        let bucket = by_day.entry(date.clone()).or_insert_with(|| DailyBucket {
            date,
            ..Default::default()
        });
        bucket.scans += 1;
        bucket.detections += r.summary.total_detections;
        bucket.helmets += r.summary.helmet_count;
        bucket.vests += r.summary.vest_count;
        bucket.no_helmets += r.summary.no_helmet_count;
        bucket.no_vests += r.summary.no_vest_count;
    }

    let mut buckets: Vec<_> = by_day.into_values().collect();
    buckets.sort_by(|a, b| a.date.cmp(&b.date));
    buckets
}

#[derive(Default)]
struct SiteCounts {
    scans: usize,
    detections: usize,
    helmets: usize,
    no_helmets: usize,
    vests: usize,
    no_vests: usize,
}

/// Per-site rollup, busiest first, at most `MAX_SITES` entries.
///
/// Compliance is computed from each site's summed counts. Sites with equal
/// scan counts keep the order in which they first appear in `records`.
pub fn site_rollups(records: &[DetectionEvent]) -> Vec<SiteRollup> {
    let mut order: Vec<String> = Vec::new();
    let mut by_site: HashMap<String, SiteCounts> = HashMap::new();

    for r in records {
        let site = r
            .site
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SITE.to_string());
        let counts = by_site.entry(site.clone()).or_insert_with(|| {
            order.push(site);
            SiteCounts::default()
        });
        counts.scans += 1;
        counts.detections += r.summary.total_detections;
        counts.helmets += r.summary.helmet_count;
        counts.no_helmets += r.summary.no_helmet_count;
        counts.vests += r.summary.vest_count;
        counts.no_vests += r.summary.no_vest_count;
    }

    let mut rollups: Vec<SiteRollup> = order
        .into_iter()
        .filter_map(|site| {
            let counts = by_site.remove(&site)?;
            Some(SiteRollup {
                helmet_compliance: round_to(compliance_rate(counts.helmets, counts.no_helmets), 2),
                vest_compliance: round_to(compliance_rate(counts.vests, counts.no_vests), 2),
                scans: counts.scans,
                total_detections: counts.detections,
                site,
            })
        })
        .collect();

    rollups.sort_by_key(|s| std::cmp::Reverse(s.scans));
    rollups.truncate(MAX_SITES);
    rollups
}

/// The `n` records with the most detections; ties keep snapshot order
pub fn top_detections(records: &[DetectionEvent], n: usize) -> Vec<TopDetection> {
    let mut ranked: Vec<&DetectionEvent> = records.iter().collect();
    ranked.sort_by_key(|r| std::cmp::Reverse(r.summary.total_detections));
    ranked
        .into_iter()
        .take(n)
        .map(|r| TopDetection {
            id: r.id.clone(),
            filename: r.filename.clone(),
            timestamp: r.timestamp,
            detections: r.summary.total_detections,
            site: r.site.clone(),
        })
        .collect()
}
