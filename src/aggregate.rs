use std::collections::HashMap;

use crate::models::{CollectionEvent, Metric, MetricRow, PeriodSummary};

/// Rounds to two decimal places, the precision every displayed metric uses.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Periods in first-appearance order, so repeated runs over the same input
/// walk groups identically.
fn periods_in_order(events: &[CollectionEvent]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for event in events {
        if !seen.iter().any(|p| p == &event.period) {
            seen.push(event.period.clone());
        }
    }
    seen
}

/// One (registration, name) pair per employee, in first-appearance order.
fn employees_in_order<'a>(events: &[&'a CollectionEvent]) -> Vec<(&'a str, &'a str)> {
    let mut seen: Vec<(&str, &str)> = Vec::new();
    for event in events {
        if !seen.iter().any(|(reg, _)| *reg == event.registration) {
            seen.push((&event.registration, &event.name));
        }
    }
    seen
}

/// Sorts descending by value. The sort is stable, so equal values keep the
/// order the grouping produced.
fn rank_desc(mut rows: Vec<MetricRow>) -> Vec<MetricRow> {
    rows.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(std::cmp::Ordering::Equal));
    rows
}

/// The shared shape of all four aggregates: per period, reduce the period's
/// events to one row per employee, then rank the combined result.
fn per_period<F>(events: &[CollectionEvent], build: F) -> Vec<MetricRow>
where
    F: Fn(&str, &[&CollectionEvent]) -> Vec<MetricRow>,
{
    let mut rows = Vec::new();
    for period in periods_in_order(events) {
        let period_events: Vec<&CollectionEvent> =
            events.iter().filter(|e| e.period == period).collect();
        rows.extend(build(&period, &period_events));
    }
    rank_desc(rows)
}

/// Sums a field per employee within one period, one row per employee present.
fn sum_per_employee<F>(period: &str, events: &[&CollectionEvent], field: F) -> Vec<MetricRow>
where
    F: Fn(&CollectionEvent) -> f64,
{
    let mut sums: HashMap<&str, f64> = HashMap::new();
    for event in events {
        *sums.entry(&event.registration).or_insert(0.0) += field(event);
    }
    employees_in_order(events)
        .into_iter()
        .map(|(registration, name)| MetricRow {
            registration: registration.to_string(),
            name: name.to_string(),
            period: period.to_string(),
            value: sums.get(registration).copied().unwrap_or(0.0),
        })
        .collect()
}

/// Total quantity collected per employee per period.
pub fn quantity(events: &[CollectionEvent]) -> Vec<MetricRow> {
    per_period(events, |period, rows| {
        sum_per_employee(period, rows, |e| e.quantity)
    })
}

/// Total weight collected per employee per period, in tonnes. Missing
/// weights contribute 0; the kg sum is rounded to 2 decimals before the
/// /1000 scale, matching the source convention.
pub fn weight(events: &[CollectionEvent]) -> Vec<MetricRow> {
    per_period(events, |period, rows| {
        let mut summed = sum_per_employee(period, rows, |e| e.weight.unwrap_or(0.0));
        for row in &mut summed {
            row.value = round2(row.value) / 1000.0;
        }
        summed
    })
}

/// Counts of each (registration, sku, recorded_at) triple among the period's
/// positive-quantity events.
fn triple_counts<'a>(
    events: &[&'a CollectionEvent],
) -> HashMap<(&'a str, &'a str, &'a str), usize> {
    let mut counts = HashMap::new();
    for event in events {
        *counts
            .entry((
                event.registration.as_str(),
                event.sku.as_str(),
                event.recorded_at.as_str(),
            ))
            .or_insert(0) += 1;
    }
    counts
}

/// Valid collection rows per employee within one period. A row is valid iff
/// its (registration, sku, recorded_at) triple occurs exactly once among the
/// period's positive-quantity events; duplicated triples are excluded
/// entirely, not collapsed to one. Counts valid rows, not distinct SKUs.
fn valid_rows_per_employee<'a>(positive: &[&'a CollectionEvent]) -> HashMap<&'a str, usize> {
    let counts = triple_counts(positive);
    let mut valid: HashMap<&str, usize> = HashMap::new();
    for event in positive {
        let key = (
            event.registration.as_str(),
            event.sku.as_str(),
            event.recorded_at.as_str(),
        );
        if counts.get(&key) == Some(&1) {
            *valid.entry(&event.registration).or_insert(0) += 1;
        }
    }
    valid
}

/// Valid SKU collections per employee per period. Every employee with a
/// positive-quantity event in the period appears, value 0 when all of their
/// rows were duplicates.
pub fn sku_count(events: &[CollectionEvent]) -> Vec<MetricRow> {
    per_period(events, |period, rows| {
        let positive: Vec<&CollectionEvent> =
            rows.iter().copied().filter(|e| e.quantity > 0.0).collect();
        let valid = valid_rows_per_employee(&positive);
        employees_in_order(&positive)
            .into_iter()
            .map(|(registration, name)| MetricRow {
                registration: registration.to_string(),
                name: name.to_string(),
                period: period.to_string(),
                value: valid.get(registration).copied().unwrap_or(0) as f64,
            })
            .collect()
    })
}

/// Per-employee-per-period sums feeding the score formula, one summary per
/// employee present in the period's input (sku_count 0 when the employee has
/// no valid rows).
pub fn period_summaries(events: &[CollectionEvent]) -> Vec<PeriodSummary> {
    let mut summaries = Vec::new();
    for period in periods_in_order(events) {
        let rows: Vec<&CollectionEvent> =
            events.iter().filter(|e| e.period == period).collect();
        let positive: Vec<&CollectionEvent> =
            rows.iter().copied().filter(|e| e.quantity > 0.0).collect();
        let valid = valid_rows_per_employee(&positive);

        let mut qty_sums: HashMap<&str, f64> = HashMap::new();
        let mut weight_sums: HashMap<&str, f64> = HashMap::new();
        for event in &rows {
            *qty_sums.entry(&event.registration).or_insert(0.0) += event.quantity;
            *weight_sums.entry(&event.registration).or_insert(0.0) +=
                event.weight.unwrap_or(0.0);
        }

        for (registration, name) in employees_in_order(&rows) {
            summaries.push(PeriodSummary {
                registration: registration.to_string(),
                name: name.to_string(),
                period: period.clone(),
                qty_sum: qty_sums.get(registration).copied().unwrap_or(0.0),
                weight_sum: round2(weight_sums.get(registration).copied().unwrap_or(0.0)),
                sku_count: valid.get(registration).copied().unwrap_or(0),
            });
        }
    }
    summaries
}

/// Composite score per employee per period:
/// round((qty_sum + weight_sum + sku_count) / 10000, 2). The divisor is a
/// business rule normalizing the three magnitudes onto one display scale.
pub fn score(events: &[CollectionEvent]) -> Vec<MetricRow> {
    let rows = period_summaries(events)
        .into_iter()
        .map(|summary| MetricRow {
            value: round2(
                (summary.qty_sum + summary.weight_sum + summary.sku_count as f64) / 10000.0,
            ),
            registration: summary.registration,
            name: summary.name,
            period: summary.period,
        })
        .collect();
    rank_desc(rows)
}

/// Dispatch used by the CLI's `rank` command.
pub fn compute(metric: Metric, events: &[CollectionEvent]) -> Vec<MetricRow> {
    match metric {
        Metric::Score => score(events),
        Metric::Quantity => quantity(events),
        Metric::Weight => weight(events),
        Metric::SkuCount => sku_count(events),
    }
}

/// Arithmetic mean of a metric across the employees present in one period's
/// rows. None when the period has no rows. Rendered as the constant overlay
/// line under each period block.
pub fn period_mean(rows: &[MetricRow], period: &str) -> Option<f64> {
    let values: Vec<f64> = rows
        .iter()
        .filter(|row| row.period == period)
        .map(|row| row.value)
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
