//! Filtering, ordering and pagination over record snapshots

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sitecheck_records::DetectionEvent;

pub const DEFAULT_LIMIT: usize = 50;

/// Optional record filters. Date bounds are inclusive; text filters are
/// case-insensitive substring matches and never match a record without the field.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub site: Option<String>,
    pub supervisor: Option<String>,
}

impl RecordFilter {
    /// Build a filter from raw query parameters; empty values are ignored
    pub fn from_params(
        start_date: Option<&str>,
        end_date: Option<&str>,
        site: Option<&str>,
        supervisor: Option<&str>,
    ) -> CoreResult<Self> {
        Ok(Self {
            start_date: non_empty(start_date)
                .map(|raw| parse_date("startDate", raw))
                .transpose()?,
            end_date: non_empty(end_date)
                .map(|raw| parse_date("endDate", raw))
                .transpose()?,
            site: non_empty(site).map(str::to_string),
            supervisor: non_empty(supervisor).map(str::to_string),
        })
    }

    pub fn matches(&self, record: &DetectionEvent) -> bool {
        if let Some(start) = self.start_date {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if record.timestamp > end {
                return false;
            }
        }
        if let Some(ref site) = self.site {
            if !contains_ignore_case(record.site.as_deref(), site) {
                return false;
            }
        }
        if let Some(ref supervisor) = self.supervisor {
            if !contains_ignore_case(record.supervisor.as_deref(), supervisor) {
                return false;
            }
        }
        true
    }

    /// Records passing the filter, in their original relative order
    pub fn apply(&self, records: &[DetectionEvent]) -> Vec<DetectionEvent> {
        records.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(&needle.to_lowercase()))
}

/// Parse RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_date(field: &str, raw: &str) -> CoreResult<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| CoreError::validation(format!("{field} is not a valid date: {raw}")))
}

/// Stable sort by timestamp, newest first
pub fn sort_newest_first(records: &mut [DetectionEvent]) {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Requested window into a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Parse raw `limit`/`offset`. Absent values take defaults; negative or
    /// non-numeric values are rejected rather than silently defaulted.
    /// A zero limit never advances a pager, so it is rejected too.
    pub fn from_params(limit: Option<&str>, offset: Option<&str>) -> CoreResult<Self> {
        let limit = parse_count("limit", limit, DEFAULT_LIMIT)?;
        if limit == 0 {
            return Err(CoreError::validation("limit must be at least 1"));
        }
        Ok(Self {
            limit,
            offset: parse_count("offset", offset, 0)?,
        })
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, 0)
    }
}

fn parse_count(field: &str, raw: Option<&str>, default: usize) -> CoreResult<usize> {
    match non_empty(raw) {
        None => Ok(default),
        Some(raw) => raw.parse::<usize>().map_err(|_| {
            CoreError::validation(format!("{field} must be a non-negative integer, got {raw}"))
        }),
    }
}

/// One page of results plus the totals needed to fetch the next
#[derive(Debug, Clone, Serialize)]
pub struct Paged<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

/// Slice `[offset, offset + limit)` out of `records`
pub fn paginate<T: Clone>(records: &[T], page: Page) -> Paged<T> {
    let total = records.len();
    let start = page.offset.min(total);
    let end = page.offset.saturating_add(page.limit).min(total);
    Paged {
        data: records[start..end].to_vec(),
        pagination: Pagination {
            total,
            limit: page.limit,
            offset: page.offset,
            has_more: page.offset.saturating_add(page.limit) < total,
        },
    }
}

/// Filter, sort newest first and paginate in one step
pub fn query_history(
    records: &[DetectionEvent],
    filter: &RecordFilter,
    page: Page,
) -> Paged<DetectionEvent> {
    let mut filtered = filter.apply(records);
    sort_newest_first(&mut filtered);
    paginate(&filtered, page)
}
