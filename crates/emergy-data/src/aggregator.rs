//! Emergy aggregation by category.

use std::collections::BTreeMap;

use emergy_core::error::{EmergyError, Result};
use emergy_core::formatting::format_scientific;
use emergy_core::models::{EmergyTotals, EmergyValue, FlowRecord, FlowTable, TOTAL_KEY};
use tracing::{debug, info};

// ── CompensatedSum ────────────────────────────────────────────────────────────

/// Neumaier-compensated running sum, so totals do not drift with row order.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    pub fn add(&mut self, value: f64) {
        let t = self.sum + value;
        if !t.is_finite() {
            // Once the sum overflows there is nothing left to compensate.
            self.sum = t;
            return;
        }
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - t) + value;
        } else {
            self.compensation += (value - t) + self.sum;
        }
        self.sum = t;
    }

    pub fn value(&self) -> f64 {
        if !self.sum.is_finite() {
            return self.sum;
        }
        self.sum + self.compensation
    }
}

// ── EmergyAggregate ───────────────────────────────────────────────────────────

/// Unformatted result of an aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct EmergyAggregate {
    /// Normalised category code → summed emergy (sej).
    pub by_category: BTreeMap<String, f64>,
    /// Sum over every contributing row.
    pub total: f64,
    /// Number of rows that contributed.
    pub rows_used: usize,
}

impl EmergyAggregate {
    /// Format every sum, adding the synthetic `"Total"` entry.
    pub fn to_totals(&self) -> EmergyTotals {
        let mut totals: EmergyTotals = self
            .by_category
            .iter()
            .map(|(category, value)| (category.clone(), EmergyValue::sej(format_scientific(*value))))
            .collect();
        totals.insert(
            TOTAL_KEY.to_string(),
            EmergyValue::sej(format_scientific(self.total)),
        );
        totals
    }
}

// ── EmergyAggregator ──────────────────────────────────────────────────────────

/// Stateless helper that turns a flow table into per-category emergy totals.
pub struct EmergyAggregator;

impl EmergyAggregator {
    /// Aggregate `table` and format the result.
    pub fn calculate(table: &FlowTable) -> Result<EmergyTotals> {
        Ok(Self::aggregate(table)?.to_totals())
    }

    /// Rows whose direction reads as `input` once trimmed and lowercased.
    ///
    /// Fails with [`EmergyError::NoValidInputs`] when there are none.
    pub fn filter_valid_inputs(table: &FlowTable) -> Result<Vec<&FlowRecord>> {
        let inputs: Vec<&FlowRecord> = table.iter().filter(|r| r.is_input()).collect();
        if inputs.is_empty() {
            return Err(EmergyError::NoValidInputs);
        }
        Ok(inputs)
    }

    /// Filter, drop rows without both Amount and UEV, multiply and group.
    pub fn aggregate(table: &FlowTable) -> Result<EmergyAggregate> {
        let inputs = Self::filter_valid_inputs(table)?;

        let contributions: Vec<(String, f64)> = inputs
            .iter()
            .filter_map(|record| record.emergy().map(|e| (record.category_code(), e)))
            .collect();

        if contributions.is_empty() {
            return Err(EmergyError::NoValidAmountUev);
        }

        debug!(
            "{} input rows, {} with valid Amount and UEV",
            inputs.len(),
            contributions.len()
        );

        let mut sums: BTreeMap<String, CompensatedSum> = BTreeMap::new();
        let mut total = CompensatedSum::default();
        for (category, emergy) in &contributions {
            sums.entry(category.clone()).or_default().add(*emergy);
            total.add(*emergy);
        }

        let by_category: BTreeMap<String, f64> =
            sums.into_iter().map(|(k, s)| (k, s.value())).collect();

        info!("Emergy totals by category: {:?}", by_category);

        Ok(EmergyAggregate {
            by_category,
            total: total.value(),
            rows_used: contributions.len(),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use emergy_core::error::ErrorKind;
    use emergy_core::formatting::parse_scientific;
    use proptest::prelude::*;

    fn make_record(
        direction: &str,
        amount: Option<f64>,
        uev: Option<f64>,
        category: &str,
    ) -> FlowRecord {
        FlowRecord {
            flow_name: format!("{}-{}", category, direction),
            amount,
            unit: "kg".to_string(),
            flow_direction: direction.to_string(),
            uev,
            category: category.to_string(),
        }
    }

    fn reference_table() -> FlowTable {
        FlowTable::new(vec![
            make_record("Input", Some(10.0), Some(1e6), "R"),
            make_record("Input", Some(5.0), Some(2e6), "F"),
            make_record("Input", Some(2.0), Some(1e7), "N"),
        ])
    }

    // ── filter_valid_inputs ───────────────────────────────────────────────────

    #[test]
    fn test_filter_valid_inputs_returns_only_inputs() {
        let table = FlowTable::new(vec![
            make_record("Input", Some(10.0), Some(1e5), "F"),
            make_record("Output", Some(20.0), Some(2e5), "F"),
        ]);
        let inputs = EmergyAggregator::filter_valid_inputs(&table).unwrap();
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].flow_direction.to_lowercase(), "input");
    }

    #[test]
    fn test_filter_valid_inputs_is_lenient_on_case_and_space() {
        let table = FlowTable::new(vec![
            make_record(" INPUT ", Some(1.0), Some(1.0), "R"),
            make_record("input", Some(1.0), Some(1.0), "R"),
            make_record("Unknown", Some(1.0), Some(1.0), "R"),
        ]);
        assert_eq!(EmergyAggregator::filter_valid_inputs(&table).unwrap().len(), 2);
    }

    #[test]
    fn test_only_outputs_fails_with_no_valid_inputs() {
        let table = FlowTable::new(vec![
            make_record("Output", Some(20.0), Some(2e5), "F"),
            make_record("Output", Some(30.0), Some(3e5), "F"),
        ]);
        let err = EmergyAggregator::calculate(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoValidInputs);
        assert!(err.to_string().contains("Flow Direction"));
    }

    #[test]
    fn test_empty_table_fails_with_no_valid_inputs() {
        let err = EmergyAggregator::calculate(&FlowTable::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoValidInputs);
    }

    // ── aggregate / calculate ─────────────────────────────────────────────────

    #[test]
    fn test_calculate_reference_scenario() {
        let totals = EmergyAggregator::calculate(&reference_table()).unwrap();

        assert_eq!(totals["R"].value, "1.00E+07");
        assert_eq!(totals["F"].value, "1.00E+07");
        assert_eq!(totals["N"].value, "2.00E+07");
        assert_eq!(totals["Total"].value, "4.00E+07");
        assert_eq!(totals["Total"].unit, "sej");
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn test_rows_without_amount_or_uev_are_dropped() {
        let table = FlowTable::new(vec![
            make_record("Input", None, Some(1e6), "R"),
            make_record("Input", Some(5.0), None, "F"),
            make_record("Input", Some(2.0), Some(1e7), "N"),
        ]);
        let aggregate = EmergyAggregator::aggregate(&table).unwrap();
        assert_eq!(aggregate.rows_used, 1);
        assert_eq!(aggregate.by_category.len(), 1);
        assert_eq!(aggregate.total, 2e7);
    }

    #[test]
    fn test_all_rows_dropped_fails_with_no_valid_amount_uev() {
        let table = FlowTable::new(vec![
            make_record("Input", None, Some(1e6), "R"),
            make_record("Input", Some(5.0), None, "F"),
        ]);
        let err = EmergyAggregator::calculate(&table).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoValidAmountUev);
    }

    #[test]
    fn test_categories_are_normalised_before_grouping() {
        let table = FlowTable::new(vec![
            make_record("Input", Some(1.0), Some(1e6), " r"),
            make_record("Input", Some(1.0), Some(1e6), "R "),
            make_record("Input", Some(1.0), Some(1e6), "f"),
        ]);
        let totals = EmergyAggregator::calculate(&table).unwrap();
        assert_eq!(totals["R"].value, "2.00E+06");
        assert_eq!(totals["F"].value, "1.00E+06");
        assert!(!totals.contains_key("r"));
    }

    #[test]
    fn test_other_categories_are_kept() {
        let table = FlowTable::new(vec![
            make_record("Input", Some(1.0), Some(1e3), "R"),
            make_record("Input", Some(1.0), Some(2e3), "Services"),
        ]);
        let totals = EmergyAggregator::calculate(&table).unwrap();
        assert_eq!(totals["SERVICES"].value, "2.00E+03");
        assert_eq!(totals["Total"].value, "3.00E+03");
    }

    #[test]
    fn test_total_equals_sum_of_categories() {
        let table = FlowTable::new(vec![
            make_record("Input", Some(0.1), Some(123_456.0), "R"),
            make_record("Input", Some(0.2), Some(654_321.0), "N"),
            make_record("Input", Some(0.3), Some(111_111.0), "F"),
            make_record("Input", Some(7.0), Some(3.3), "R"),
        ]);
        let aggregate = EmergyAggregator::aggregate(&table).unwrap();
        let category_sum: f64 = aggregate.by_category.values().sum();
        assert!((aggregate.total - category_sum).abs() <= 1e-9 * aggregate.total.abs());
    }

    #[test]
    fn test_formatted_totals_round_trip_to_displayed_precision() {
        let aggregate = EmergyAggregator::aggregate(&reference_table()).unwrap();
        let totals = aggregate.to_totals();
        for (category, raw) in &aggregate.by_category {
            let parsed = parse_scientific(&totals[category].value).unwrap();
            assert!(((parsed - raw) / raw).abs() < 5e-3);
        }
    }

    #[test]
    fn test_calculate_is_idempotent() {
        let table = reference_table();
        let first = EmergyAggregator::calculate(&table).unwrap();
        let second = EmergyAggregator::calculate(&table).unwrap();
        assert_eq!(first, second);
    }

    // ── CompensatedSum ────────────────────────────────────────────────────────

    #[test]
    fn test_compensated_sum_recovers_small_terms() {
        let mut sum = CompensatedSum::default();
        sum.add(1e16);
        sum.add(1.0);
        sum.add(-1e16);
        assert_eq!(sum.value(), 1.0);
    }

    #[test]
    fn test_compensated_sum_overflow_stays_infinite() {
        let mut sum = CompensatedSum::default();
        sum.add(1e6);
        sum.add(f64::INFINITY);
        sum.add(2e6);
        assert_eq!(sum.value(), f64::INFINITY);
    }

    #[test]
    fn test_overflowing_product_is_reported_as_infinite_total() {
        let table = FlowTable::new(vec![
            make_record("Input", Some(1e200), Some(1e200), "R"),
            make_record("Input", Some(1.0), Some(1e6), "F"),
        ]);
        let totals = EmergyAggregator::calculate(&table).unwrap();
        assert_eq!(totals["R"].value, "INF");
        assert_eq!(totals["F"].value, "1.00E+06");
        assert_eq!(totals[TOTAL_KEY].value, "INF");
    }

    // ── Properties ────────────────────────────────────────────────────────────

    proptest! {
        #[test]
        fn prop_row_order_does_not_change_totals(
            rows in prop::collection::vec(
                (0.0f64..1e4, 1.0f64..1e9, prop::sample::select(vec!["R", "N", "F", "X"])),
                1..40,
            )
        ) {
            let records: Vec<FlowRecord> = rows
                .iter()
                .map(|(amount, uev, cat)| make_record("Input", Some(*amount), Some(*uev), cat))
                .collect();
            let mut reversed = records.clone();
            reversed.reverse();

            let forward = EmergyAggregator::calculate(&FlowTable::new(records)).unwrap();
            let backward = EmergyAggregator::calculate(&FlowTable::new(reversed)).unwrap();
            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn prop_total_matches_category_sum(
            rows in prop::collection::vec(
                (0.0f64..1e4, 1.0f64..1e9, prop::sample::select(vec!["R", "N", "F"])),
                1..40,
            )
        ) {
            let table: FlowTable = rows
                .iter()
                .map(|(amount, uev, cat)| make_record("Input", Some(*amount), Some(*uev), cat))
                .collect();
            let aggregate = EmergyAggregator::aggregate(&table).unwrap();
            let category_sum: f64 = aggregate.by_category.values().sum();
            prop_assert!((aggregate.total - category_sum).abs() <= 1e-9 * aggregate.total.abs().max(1.0));
        }
    }
}
