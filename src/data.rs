use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use log::warn;
use serde::Deserialize;

use crate::models::{CollectionEvent, Kpis};

/// Raw row as it appears in the source file after header cleaning. Numeric
/// columns stay as strings so locale coercion can happen field by field.
#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(rename = "MATRÍCULA")]
    registration: String,
    #[serde(rename = "NOME")]
    name: String,
    #[serde(rename = "MÊS/ANO")]
    period: String,
    #[serde(rename = "DATA E HORA")]
    recorded_at: String,
    #[serde(rename = "SKU")]
    sku: String,
    #[serde(rename = "QTD COL")]
    quantity: String,
    #[serde(rename = "PESO COLETADO POR SKU")]
    weight: String,
}

/// Optional value selections for each filterable column. `None` means no
/// restriction on that column; an explicit set keeps only listed values.
#[derive(Debug, Default, Clone)]
pub struct FilterSpec {
    pub names: Option<Vec<String>>,
    pub registrations: Option<Vec<String>>,
    pub periods: Option<Vec<String>>,
}

impl FilterSpec {
    pub fn matches(&self, event: &CollectionEvent) -> bool {
        let selected = |set: &Option<Vec<String>>, value: &str| match set {
            Some(values) => values.iter().any(|v| v == value),
            None => true,
        };
        selected(&self.names, &event.name)
            && selected(&self.registrations, &event.registration)
            && selected(&self.periods, &event.period)
    }
}

/// Parses a number that may use a comma decimal separator. Returns None for
/// anything unparseable, including empty and "NaN"-style markers.
pub fn parse_locale_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => None,
    }
}

/// Strips stray apostrophes and padding left in column names by the export.
fn clean_header(raw: &str) -> String {
    raw.replace('\'', "").trim().to_string()
}

/// Loads the semicolon-delimited dataset, cleaning headers and coercing
/// numeric columns. Unparseable numbers degrade to a missing state per row
/// rather than failing the load; a missing column is fatal.
pub fn load_events(path: &Path) -> anyhow::Result<Vec<CollectionEvent>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open dataset {}", path.display()))?;

    let cleaned: csv::StringRecord = reader
        .headers()
        .with_context(|| format!("failed to read headers from {}", path.display()))?
        .iter()
        .map(clean_header)
        .collect();
    reader.set_headers(cleaned);

    let mut events = Vec::new();
    for (index, result) in reader.deserialize::<RawRow>().enumerate() {
        let row = result.with_context(|| {
            format!("malformed record {} in {}", index + 1, path.display())
        })?;

        let quantity = parse_locale_decimal(&row.quantity).unwrap_or_else(|| {
            warn!(
                "record {}: unparseable quantity {:?}, counting as 0",
                index + 1,
                row.quantity
            );
            0.0
        });
        let weight = parse_locale_decimal(&row.weight);
        if weight.is_none() {
            warn!(
                "record {}: unparseable weight {:?}, treating as missing",
                index + 1,
                row.weight
            );
        }

        events.push(CollectionEvent {
            registration: row.registration.trim().to_string(),
            name: row.name.trim().to_string(),
            period: row.period.trim().to_string(),
            recorded_at: row.recorded_at.trim().to_string(),
            sku: row.sku.trim().to_string(),
            quantity,
            weight,
        });
    }

    Ok(events)
}

pub fn filter_events(events: &[CollectionEvent], filter: &FilterSpec) -> Vec<CollectionEvent> {
    events
        .iter()
        .filter(|event| filter.matches(event))
        .cloned()
        .collect()
}

fn distinct_sorted<F>(events: &[CollectionEvent], field: F) -> Vec<String>
where
    F: Fn(&CollectionEvent) -> &str,
{
    let values: BTreeSet<&str> = events.iter().map(|e| field(e)).collect();
    values.into_iter().map(str::to_string).collect()
}

pub fn distinct_names(events: &[CollectionEvent]) -> Vec<String> {
    distinct_sorted(events, |e| &e.name)
}

pub fn distinct_registrations(events: &[CollectionEvent]) -> Vec<String> {
    distinct_sorted(events, |e| &e.registration)
}

pub fn distinct_periods(events: &[CollectionEvent]) -> Vec<String> {
    distinct_sorted(events, |e| &e.period)
}

/// Totals shown above the charts: overall quantity and weight, with missing
/// weights contributing 0.
pub fn kpis(events: &[CollectionEvent]) -> Kpis {
    Kpis {
        total_quantity: events.iter().map(|e| e.quantity).sum(),
        total_weight: events.iter().filter_map(|e| e.weight).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn sample_event(registration: &str, period: &str) -> CollectionEvent {
        CollectionEvent {
            registration: registration.to_string(),
            name: format!("Employee {registration}"),
            period: period.to_string(),
            recorded_at: "01/02/2024 08:00".to_string(),
            sku: "S1".to_string(),
            quantity: 1.0,
            weight: Some(1.0),
        }
    }

    #[test]
    fn locale_decimals_parse_with_comma_or_dot() {
        assert_eq!(parse_locale_decimal("2,5"), Some(2.5));
        assert_eq!(parse_locale_decimal("2.5"), Some(2.5));
        assert_eq!(parse_locale_decimal(" 10 "), Some(10.0));
        assert_eq!(parse_locale_decimal(""), None);
        assert_eq!(parse_locale_decimal("abc"), None);
        assert_eq!(parse_locale_decimal("NaN"), None);
    }

    #[test]
    fn load_cleans_headers_and_coerces_numbers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "'MATRÍCULA';'NOME' ;MÊS/ANO;DATA E HORA;SKU;QTD COL;PESO COLETADO POR SKU"
        )
        .unwrap();
        writeln!(file, "E1;Alice;01/2024;01/01/2024 09:00;S1;5;2,5").unwrap();
        writeln!(file, "E2;Bob;01/2024;01/01/2024 10:00;S2;10;oops").unwrap();

        let events = load_events(file.path()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].registration, "E1");
        assert_eq!(events[0].weight, Some(2.5));
        assert_eq!(events[1].quantity, 10.0);
        assert_eq!(events[1].weight, None);
    }

    #[test]
    fn load_fails_without_required_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MATRÍCULA;NOME;MÊS/ANO").unwrap();
        writeln!(file, "E1;Alice;01/2024").unwrap();

        assert!(load_events(file.path()).is_err());
    }

    #[test]
    fn filters_restrict_only_given_columns() {
        let events = vec![
            sample_event("E1", "01/2024"),
            sample_event("E2", "01/2024"),
            sample_event("E1", "02/2024"),
        ];

        let filter = FilterSpec {
            registrations: Some(vec!["E1".to_string()]),
            ..Default::default()
        };
        assert_eq!(filter_events(&events, &filter).len(), 2);

        let filter = FilterSpec {
            registrations: Some(vec!["E1".to_string()]),
            periods: Some(vec!["02/2024".to_string()]),
            ..Default::default()
        };
        assert_eq!(filter_events(&events, &filter).len(), 1);
    }

    #[test]
    fn unknown_filter_value_matches_nothing() {
        let events = vec![sample_event("E1", "01/2024")];
        let filter = FilterSpec {
            names: Some(vec!["Nobody".to_string()]),
            ..Default::default()
        };
        assert!(filter_events(&events, &filter).is_empty());
    }

    #[test]
    fn distinct_values_are_sorted_and_unique() {
        let events = vec![
            sample_event("E2", "02/2024"),
            sample_event("E1", "01/2024"),
            sample_event("E2", "01/2024"),
        ];
        assert_eq!(distinct_registrations(&events), vec!["E1", "E2"]);
        assert_eq!(distinct_periods(&events), vec!["01/2024", "02/2024"]);
    }

    #[test]
    fn kpis_treat_missing_weight_as_zero() {
        let mut events = vec![sample_event("E1", "01/2024"), sample_event("E2", "01/2024")];
        events[1].weight = None;
        events[1].quantity = 4.0;

        let totals = kpis(&events);
        assert_eq!(totals.total_quantity, 5.0);
        assert_eq!(totals.total_weight, 1.0);
    }
}
