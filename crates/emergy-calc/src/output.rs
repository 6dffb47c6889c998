//! JSON documents printed by the CLI.

use std::path::Path;

use emergy_core::error::EmergyError;
use emergy_core::models::EmergyReport;
use serde::Serialize;

/// Result of `emergy-calc file <PATH>`.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub filename: String,
    #[serde(flatten)]
    pub report: EmergyReport,
}

impl FileReport {
    pub fn new(path: &Path, report: EmergyReport) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { filename, report }
    }
}

/// Result of `emergy-calc lci <PRODUCT_ID>`.
#[derive(Debug, Serialize)]
pub struct ProductReport {
    pub product_id: i64,
    #[serde(flatten)]
    pub report: EmergyReport,
}

/// Error document written to stderr.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    pub status: u16,
    pub detail: String,
}

impl From<&EmergyError> for ErrorReport {
    fn from(err: &EmergyError) -> Self {
        Self {
            status: err.status_code(),
            detail: err.detail(),
        }
    }
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
