use csv::WriterBuilder;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Campaign, DailyMetric, MetricTotals, ReportFormat, ReportRow};

const CSV_HEADERS: [&str; 10] = [
    "date",
    "campaign_id",
    "campaign_name",
    "impressions",
    "clicks",
    "conversions",
    "spend",
    "ctr",
    "cpc",
    "conversion_rate",
];

/// Formats cents as a decimal currency amount, e.g. `12345` -> `"123.45"`.
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// One row per (campaign, day) with data, ordered by date then campaign name.
pub fn build_rows(campaigns: &[Campaign], metrics: &[DailyMetric]) -> Vec<ReportRow> {
    let names: HashMap<Uuid, &str> = campaigns.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut rows: Vec<ReportRow> = metrics
        .iter()
        .filter_map(|m| {
            let name = names.get(&m.campaign_id)?;
            let totals = MetricTotals::from_counts(m.impressions, m.clicks, m.conversions, m.spend_cents);
            Some(ReportRow {
                date: m.date,
                campaign_id: m.campaign_id,
                campaign_name: name.to_string(),
                impressions: m.impressions,
                clicks: m.clicks,
                conversions: m.conversions,
                spend: format_cents(m.spend_cents),
                ctr: totals.ctr,
                cpc: format_cents(totals.cpc_cents),
                conversion_rate: totals.conversion_rate,
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.campaign_name.cmp(&b.campaign_name))
    });
    rows
}

pub fn render(format: ReportFormat, rows: &[ReportRow]) -> AppResult<String> {
    match format {
        ReportFormat::Csv => render_csv(rows),
        ReportFormat::Json => serde_json::to_string_pretty(rows)
            .map_err(|e| AppError::Internal(format!("Failed to render JSON report: {e}"))),
    }
}

/// The header line is always written, so an empty report is still a valid CSV.
fn render_csv(rows: &[ReportRow]) -> AppResult<String> {
    let csv_error = |e: csv::Error| AppError::Internal(format!("Failed to write CSV row: {e}"));

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(vec![]);
    writer.write_record(CSV_HEADERS).map_err(csv_error)?;
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV is not UTF-8: {e}")))
}
