use serde::Serialize;

/// One normalized row of the source dataset.
#[derive(Debug, Clone)]
pub struct CollectionEvent {
    pub registration: String,
    pub name: String,
    pub period: String,
    /// Timestamp token of the collection operation. Compared as an opaque
    /// key, never parsed as a date.
    pub recorded_at: String,
    pub sku: String,
    pub quantity: f64,
    /// None when the source value failed locale parsing; contributes 0 to sums.
    pub weight: Option<f64>,
}

/// One row of a ranked aggregate, keyed by employee within a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub registration: String,
    pub name: String,
    pub period: String,
    pub value: f64,
}

/// Per-employee-per-period sums feeding the score formula.
#[derive(Debug, Clone)]
pub struct PeriodSummary {
    pub registration: String,
    pub name: String,
    pub period: String,
    pub qty_sum: f64,
    pub weight_sum: f64,
    pub sku_count: usize,
}

/// Dataset totals over the filtered table.
#[derive(Debug, Clone, Serialize)]
pub struct Kpis {
    pub total_quantity: f64,
    pub total_weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Metric {
    Score,
    Quantity,
    Weight,
    SkuCount,
}

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Score => "Score",
            Metric::Quantity => "Quantity collected",
            Metric::Weight => "Weight collected (tonnes)",
            Metric::SkuCount => "Valid SKU collections",
        }
    }
}
