//! Export formatters: full JSON, flattened CSV and a simplified tabular form

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sitecheck_records::DetectionEvent;
use std::str::FromStr;

const CSV_HEADERS: [&str; 13] = [
    "ID",
    "Timestamp",
    "Filename",
    "Site",
    "Supervisor",
    "Total Detections",
    "Helmet Count",
    "Vest Count",
    "No Helmet Count",
    "No Vest Count",
    "Helmet Compliance %",
    "Vest Compliance %",
    "Detections (JSON)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
    /// Spreadsheet-friendly rows, emitted as JSON
    Xlsx,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json | ExportFormat::Xlsx => "application/json",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx.json",
        }
    }

    /// `helmet-detections-YYYY-MM-DD.<ext>` for the UTC date of `now`
    pub fn filename(self, now: DateTime<Utc>) -> String {
        format!(
            "helmet-detections-{}.{}",
            now.format("%Y-%m-%d"),
            self.extension()
        )
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    /// Unknown formats fall back to JSON
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "csv" => ExportFormat::Csv,
            "xlsx" => ExportFormat::Xlsx,
            _ => ExportFormat::Json,
        })
    }
}

/// A rendered export ready to be written or sent
#[derive(Debug, Clone)]
pub struct Export {
    pub format: ExportFormat,
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Render `records` (already filtered and ordered) in `format`
pub fn render(
    records: &[DetectionEvent],
    format: ExportFormat,
    now: DateTime<Utc>,
) -> serde_json::Result<Export> {
    let body = match format {
        ExportFormat::Json => to_json(records, now)?,
        ExportFormat::Csv => to_csv(records)?,
        ExportFormat::Xlsx => to_tabular(records, now)?,
    };
    Ok(Export {
        format,
        filename: format.filename(now),
        content_type: format.content_type(),
        body,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    export_info: ExportInfo,
    detections: &'a [DetectionEvent],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportInfo {
    timestamp: DateTime<Utc>,
    total_records: usize,
    format: &'static str,
}

pub fn to_json(records: &[DetectionEvent], now: DateTime<Utc>) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&JsonExport {
        export_info: ExportInfo {
            timestamp: now,
            total_records: records.len(),
            format: "json",
        },
        detections: records,
    })
}

/// Every field double-quoted, embedded quotes doubled, rows joined by `\n`
pub fn to_csv(records: &[DetectionEvent]) -> serde_json::Result<String> {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(csv_row(CSV_HEADERS.iter().map(|h| h.to_string())));

    for r in records {
        let s = &r.summary;
        let fields = vec![
            r.id.clone(),
            r.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            r.filename.clone(),
            r.site.clone().unwrap_or_default(),
            r.supervisor.clone().unwrap_or_default(),
            s.total_detections.to_string(),
            s.helmet_count.to_string(),
            s.vest_count.to_string(),
            s.no_helmet_count.to_string(),
            s.no_vest_count.to_string(),
            format!("{:.2}", s.helmet_compliance()),
            format!("{:.2}", s.vest_compliance()),
            serde_json::to_string(&r.detections)?,
        ];
        lines.push(csv_row(fields.into_iter()));
    }

    Ok(lines.join("\n"))
}

fn csv_row(fields: impl Iterator<Item = String>) -> String {
    fields
        .map(|f| format!("\"{}\"", f.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabularExport {
    summary: TabularSummary,
    detections: Vec<TabularRow>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabularSummary {
    total_records: usize,
    export_date: DateTime<Utc>,
    format: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TabularRow {
    id: String,
    timestamp: DateTime<Utc>,
    filename: String,
    site: String,
    supervisor: String,
    total_detections: usize,
    helmet_count: usize,
    vest_count: usize,
    no_helmet_count: usize,
    no_vest_count: usize,
    helmet_compliance: String,
    vest_compliance: String,
}

/// Flat rows with percentages as fixed two-decimal strings
pub fn to_tabular(records: &[DetectionEvent], now: DateTime<Utc>) -> serde_json::Result<String> {
    let rows = records
        .iter()
        .map(|r| TabularRow {
            id: r.id.clone(),
            timestamp: r.timestamp,
            filename: r.filename.clone(),
            site: r.site.clone().unwrap_or_default(),
            supervisor: r.supervisor.clone().unwrap_or_default(),
            total_detections: r.summary.total_detections,
            helmet_count: r.summary.helmet_count,
            vest_count: r.summary.vest_count,
            no_helmet_count: r.summary.no_helmet_count,
            no_vest_count: r.summary.no_vest_count,
            helmet_compliance: format!("{:.2}", r.summary.helmet_compliance()),
            vest_compliance: format!("{:.2}", r.summary.vest_compliance()),
        })
        .collect();

    serde_json::to_string_pretty(&TabularExport {
        summary: TabularSummary {
            total_records: records.len(),
            export_date: now,
            format: "xlsx (simplified)",
        },
        detections: rows,
    })
}
