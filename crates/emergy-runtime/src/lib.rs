//! Runtime layer for the emergy calculator.
//!
//! Connects flow-table suppliers (uploaded files, the remote LCI catalog) to
//! the calculation pipeline and applies the error propagation policy.

pub mod data_source;
pub mod lci_client;
pub mod service;

pub use emergy_core as core;
pub use emergy_data as data;
