//! Data ingestion layer for the emergy calculator.
//!
//! Reads CSV and spreadsheet flow tables, validates them into canonical
//! [`FlowTable`](emergy_core::models::FlowTable)s, aggregates emergy by
//! category and runs the calculation pipeline.

pub mod aggregator;
pub mod analysis;
pub mod reader;
pub mod validator;

pub use emergy_core as core;
