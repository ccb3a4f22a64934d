use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::aggregate;
use crate::data;
use crate::models::{CollectionEvent, Kpis, MetricRow};

/// Groups an integer's digits with dots, the locale's thousands separator.
fn group_thousands(value: i64) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Formats a value as a thousands-separated integer, truncating the
/// fractional part (the convention the weight and count charts use).
pub fn format_int(value: f64) -> String {
    group_thousands(value.trunc() as i64)
}

/// Formats with two decimals in the locale convention: dot for thousands,
/// comma for decimals.
pub fn format_decimal(value: f64) -> String {
    let text = format!("{:.2}", value.abs());
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let grouped = group_thousands(whole.parse::<i64>().unwrap_or(0));
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{grouped},{frac}")
}

fn period_date(period: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01/{period}"), "%d/%m/%Y").ok()
}

/// Periods in chronological order when the token parses as MM/YYYY, with
/// unparseable tokens last in lexicographic order.
pub fn periods_chronological(rows: &[MetricRow]) -> Vec<String> {
    let mut periods: Vec<String> = Vec::new();
    for row in rows {
        if !periods.iter().any(|p| p == &row.period) {
            periods.push(row.period.clone());
        }
    }
    periods.sort_by(|a, b| match (period_date(a), period_date(b)) {
        (Some(da), Some(db)) => da.cmp(&db),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.cmp(b),
    });
    periods
}

fn write_section<F>(
    output: &mut String,
    title: &str,
    rows: &[MetricRow],
    format: F,
    include_mean: bool,
) where
    F: Fn(f64) -> String,
{
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if rows.is_empty() {
        let _ = writeln!(output, "No rows for this selection.");
        return;
    }

    for period in periods_chronological(rows) {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {period}");
        for row in rows.iter().filter(|r| r.period == period) {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                row.name,
                row.registration,
                format(row.value)
            );
        }
        if include_mean {
            if let Some(mean) = aggregate::period_mean(rows, &period) {
                let _ = writeln!(output, "- mean: {}", format(mean));
            }
        }
    }
}

/// Builds the full markdown report over an already-filtered table: KPIs, the
/// scoring formula note, and the four ranked aggregates grouped by period.
pub fn build_report(
    scope: Option<&str>,
    events: &[CollectionEvent],
    include_mean: bool,
) -> String {
    let kpis = data::kpis(events);
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all employees");

    let _ = writeln!(output, "# Warehouse Collection Scoreboard");
    let _ = writeln!(
        output,
        "Generated for {} ({} rows)",
        scope_label,
        events.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Totals");
    let _ = writeln!(
        output,
        "- Quantity collected: {}",
        format_decimal(kpis.total_quantity)
    );
    let _ = writeln!(
        output,
        "- Weight collected (kg): {}",
        format_decimal(kpis.total_weight)
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Scoring");
    let _ = writeln!(
        output,
        "Score = (quantity + weight + valid SKU collections) / 10000, rounded to 2 decimals."
    );

    write_section(
        &mut output,
        "Score",
        &aggregate::score(events),
        format_decimal,
        false,
    );
    write_section(
        &mut output,
        "Quantity collected",
        &aggregate::quantity(events),
        format_int,
        include_mean,
    );
    write_section(
        &mut output,
        "Weight collected (tonnes)",
        &aggregate::weight(events),
        format_int,
        include_mean,
    );
    write_section(
        &mut output,
        "Valid SKU collections",
        &aggregate::sku_count(events),
        format_int,
        include_mean,
    );

    output
}

/// Machine-readable form of the same report: KPIs plus the four derived
/// tables, each already sorted descending by value.
#[derive(Debug, Serialize)]
pub struct ReportPayload {
    pub kpis: Kpis,
    pub score: Vec<MetricRow>,
    pub quantity: Vec<MetricRow>,
    pub weight: Vec<MetricRow>,
    pub sku_count: Vec<MetricRow>,
}

pub fn build_json(events: &[CollectionEvent]) -> anyhow::Result<String> {
    let payload = ReportPayload {
        kpis: data::kpis(events),
        score: aggregate::score(events),
        quantity: aggregate::quantity(events),
        weight: aggregate::weight(events),
        sku_count: aggregate::sku_count(events),
    };
    Ok(serde_json::to_string_pretty(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(
        registration: &str,
        name: &str,
        period: &str,
        recorded_at: &str,
        quantity: f64,
        weight: Option<f64>,
    ) -> CollectionEvent {
        CollectionEvent {
            registration: registration.to_string(),
            name: name.to_string(),
            period: period.to_string(),
            recorded_at: recorded_at.to_string(),
            sku: "S1".to_string(),
            quantity,
            weight,
        }
    }

    #[test]
    fn integers_group_with_dots() {
        assert_eq!(format_int(1234567.0), "1.234.567");
        assert_eq!(format_int(999.0), "999");
        assert_eq!(format_int(0.9), "0");
    }

    #[test]
    fn decimals_use_comma_and_dot_grouping() {
        assert_eq!(format_decimal(1234.5), "1.234,50");
        assert_eq!(format_decimal(0.02), "0,02");
        assert_eq!(format_decimal(-1000.25), "-1.000,25");
    }

    #[test]
    fn periods_sort_chronologically_not_lexically() {
        let row = |period: &str| MetricRow {
            registration: "E1".to_string(),
            name: "Alice".to_string(),
            period: period.to_string(),
            value: 1.0,
        };
        let rows = vec![row("01/2025"), row("12/2024"), row("02/2025")];
        assert_eq!(
            periods_chronological(&rows),
            vec!["12/2024", "01/2025", "02/2025"]
        );
    }

    #[test]
    fn unparseable_periods_sort_last() {
        let row = |period: &str| MetricRow {
            registration: "E1".to_string(),
            name: "Alice".to_string(),
            period: period.to_string(),
            value: 1.0,
        };
        let rows = vec![row("total"), row("01/2025")];
        assert_eq!(periods_chronological(&rows), vec!["01/2025", "total"]);
    }

    #[test]
    fn report_contains_all_four_sections() {
        let events = vec![event("E1", "Alice", "01/2024", "t1", 5.0, Some(2.5))];
        let report = build_report(None, &events, false);
        assert!(report.contains("## Score"));
        assert!(report.contains("## Quantity collected"));
        assert!(report.contains("## Weight collected (tonnes)"));
        assert!(report.contains("## Valid SKU collections"));
        assert!(report.contains("Alice (E1)"));
    }

    #[test]
    fn mean_lines_appear_only_when_enabled() {
        let events = vec![
            event("E1", "Alice", "01/2024", "t1", 4.0, Some(1.0)),
            event("E2", "Bob", "01/2024", "t2", 2.0, Some(1.0)),
        ];
        let with_mean = build_report(None, &events, true);
        let without_mean = build_report(None, &events, false);
        assert!(with_mean.contains("- mean: 3"));
        assert!(!without_mean.contains("- mean:"));
    }

    #[test]
    fn empty_input_renders_placeholders() {
        let report = build_report(Some("nobody"), &[], false);
        assert!(report.contains("Generated for nobody (0 rows)"));
        assert!(report.contains("No rows for this selection."));
    }

    #[test]
    fn json_payload_serializes_all_tables() {
        let events = vec![event("E1", "Alice", "01/2024", "t1", 5.0, Some(2.5))];
        let json = build_json(&events).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for table in ["score", "quantity", "weight", "sku_count"] {
            assert_eq!(value[table].as_array().unwrap().len(), 1);
        }
        assert_eq!(value["kpis"]["total_quantity"], 5.0);
    }
}
