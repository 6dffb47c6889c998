//! The pure calculation pipeline: flow table in, report out.

use emergy_core::calculations::SustainabilityAnalyzer;
use emergy_core::error::Result;
use emergy_core::models::{EmergyReport, FlowTable};

use crate::aggregator::EmergyAggregator;

/// Aggregate `table` by category, then derive the sustainability indicators
/// from the formatted totals.
pub fn analyze_flow_table(table: &FlowTable) -> Result<EmergyReport> {
    let emergy = EmergyAggregator::calculate(table)?;
    let sustainability = SustainabilityAnalyzer::analyze(&emergy)?;
    Ok(EmergyReport {
        emergy,
        sustainability,
    })
}
