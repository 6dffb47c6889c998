use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Column names ──────────────────────────────────────────────────────────────

pub const COL_FLOW_NAME: &str = "Flow Name";
pub const COL_AMOUNT: &str = "Amount";
pub const COL_UNIT: &str = "Unit";
pub const COL_FLOW_DIRECTION: &str = "Flow Direction";
pub const COL_UEV: &str = "UEV";
pub const COL_CATEGORY: &str = "Category";

/// Every column a flow table must carry, in canonical order.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    COL_FLOW_NAME,
    COL_AMOUNT,
    COL_UNIT,
    COL_FLOW_DIRECTION,
    COL_UEV,
    COL_CATEGORY,
];

/// Unit attached to every emergy figure (solar emergy joules).
pub const EMERGY_UNIT: &str = "sej";

/// Synthetic key holding the grand total in [`EmergyTotals`].
pub const TOTAL_KEY: &str = "Total";

/// Category codes used by the sustainability ratios.
pub const RENEWABLE: &str = "R";
pub const NONRENEWABLE: &str = "N";
pub const PURCHASED: &str = "F";

// ── FlowDirection ─────────────────────────────────────────────────────────────

/// Direction of a flow relative to the studied system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowDirection {
    Input,
    Output,
}

impl FlowDirection {
    /// Case- and whitespace-insensitive parse. Anything else is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "input" => Some(FlowDirection::Input),
            "output" => Some(FlowDirection::Output),
            _ => None,
        }
    }
}

// ── FlowRecord ────────────────────────────────────────────────────────────────

/// One row of a canonical flow table.
///
/// `amount` and `uev` are `None` when the source cell was blank or could not
/// be read as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRecord {
    #[serde(rename = "Flow Name")]
    pub flow_name: String,
    #[serde(rename = "Amount")]
    pub amount: Option<f64>,
    #[serde(rename = "Unit")]
    pub unit: String,
    /// Raw direction text as it appeared in the source.
    #[serde(rename = "Flow Direction")]
    pub flow_direction: String,
    /// Unit Emergy Value.
    #[serde(rename = "UEV")]
    pub uev: Option<f64>,
    #[serde(rename = "Category")]
    pub category: String,
}

impl FlowRecord {
    pub fn direction(&self) -> Option<FlowDirection> {
        FlowDirection::parse(&self.flow_direction)
    }

    /// Whether the row counts as an input for aggregation.
    pub fn is_input(&self) -> bool {
        self.direction() == Some(FlowDirection::Input)
    }

    /// Exact, case-sensitive match against `"Output"`.
    ///
    /// Only these rows are exempt from the UEV requirement at validation;
    /// `" output"` or `"OUTPUT"` still need a UEV.
    pub fn is_literal_output(&self) -> bool {
        self.flow_direction == "Output"
    }

    /// Category code, trimmed and uppercased.
    pub fn category_code(&self) -> String {
        self.category.trim().to_uppercase()
    }

    /// `amount * uev`, or `None` when either side is missing.
    pub fn emergy(&self) -> Option<f64> {
        match (self.amount, self.uev) {
            (Some(amount), Some(uev)) => Some(amount * uev),
            _ => None,
        }
    }
}

// ── FlowTable ─────────────────────────────────────────────────────────────────

/// Ordered sequence of flow records, built once per request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowTable {
    records: Vec<FlowRecord>,
}

impl FlowTable {
    pub fn new(records: Vec<FlowRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FlowRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<FlowRecord> for FlowTable {
    fn from_iter<I: IntoIterator<Item = FlowRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FlowTable {
    type Item = &'a FlowRecord;
    type IntoIter = std::slice::Iter<'a, FlowRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

// ── EmergyTotals ──────────────────────────────────────────────────────────────

/// A formatted emergy figure, e.g. `{"value": "1.00E+07", "unit": "sej"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergyValue {
    pub value: String,
    pub unit: String,
}

impl EmergyValue {
    pub fn sej(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            unit: EMERGY_UNIT.to_string(),
        }
    }
}

/// Category code → formatted total, plus the synthetic `"Total"` key.
pub type EmergyTotals = BTreeMap<String, EmergyValue>;

// ── Sustainability ────────────────────────────────────────────────────────────

/// Ordinal sustainability scale derived from the ESI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SustainabilityClassification {
    Unsustainable,
    LowSustainability,
    Sustainable,
    HighlySustainable,
}

impl SustainabilityClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            SustainabilityClassification::Unsustainable => "UNSUSTAINABLE",
            SustainabilityClassification::LowSustainability => "LOW_SUSTAINABILITY",
            SustainabilityClassification::Sustainable => "SUSTAINABLE",
            SustainabilityClassification::HighlySustainable => "HIGHLY_SUSTAINABLE",
        }
    }
}

impl fmt::Display for SustainabilityClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emergy sustainability ratios, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SustainabilityIndicators {
    /// Emergy Yield Ratio, `(R + N + F) / F`.
    #[serde(rename = "EYR")]
    pub eyr: f64,
    /// Environmental Loading Ratio, `(N + F) / R`.
    #[serde(rename = "ELR")]
    pub elr: f64,
    /// Emergy Sustainability Index, `EYR / ELR`.
    #[serde(rename = "ESI")]
    pub esi: f64,
    pub classification: SustainabilityClassification,
}

/// Combined output of one calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergyReport {
    pub emergy: EmergyTotals,
    pub sustainability: SustainabilityIndicators,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
