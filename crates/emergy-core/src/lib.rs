//! Core domain types for the emergy calculator.
//!
//! Flow records and tables, formatted emergy totals, the sustainability
//! analyzer, the error taxonomy and the command-line settings shared by the
//! other crates.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{EmergyError, ErrorKind, Result};
