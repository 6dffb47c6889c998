//! Request-level orchestration: fetch a flow table, then calculate.
//!
//! The service owns the error propagation policy. Validation and upstream
//! errors reach the caller untouched; everything else is logged in full and
//! replaced by an opaque internal error.

use std::path::PathBuf;
use std::sync::Arc;

use emergy_core::error::{EmergyError, ErrorKind, Result};
use emergy_core::models::EmergyReport;
use emergy_data::analysis::analyze_flow_table;
use tracing::{error, info};

use crate::data_source::{CatalogDataSource, DataSource, FileDataSource};
use crate::lci_client::FlowCatalog;

// ── EmergyService ─────────────────────────────────────────────────────────────

/// Runs one emergy calculation against a [`DataSource`].
///
/// # Example
/// ```no_run
/// use emergy_runtime::service::EmergyService;
///
/// # async fn run() -> emergy_core::Result<()> {
/// let report = EmergyService::for_file("flows.csv").calculate().await?;
/// println!("total: {}", report.emergy["Total"].value);
/// # Ok(())
/// # }
/// ```
pub struct EmergyService {
    source: Box<dyn DataSource>,
}

impl EmergyService {
    pub fn new<S: DataSource + 'static>(source: S) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Service over an uploaded file.
    pub fn for_file(path: impl Into<PathBuf>) -> Self {
        Self::new(FileDataSource::new(path))
    }

    /// Service over one catalog product.
    pub fn for_catalog_product<C: FlowCatalog + 'static>(product_id: i64, catalog: Arc<C>) -> Self {
        Self::new(CatalogDataSource::new(product_id, catalog))
    }

    /// Fetch the flow table and compute `{emergy, sustainability}`.
    ///
    /// The table is fetched completely before any calculation starts.
    pub async fn calculate(&self) -> Result<EmergyReport> {
        let table = self.source.fetch().await.map_err(into_boundary_error)?;
        info!("Calculating emergy for {} flow rows", table.len());
        analyze_flow_table(&table).map_err(into_boundary_error)
    }
}

// ── Error policy ──────────────────────────────────────────────────────────────

/// Apply the propagation policy to an error leaving the service.
pub fn into_boundary_error(err: EmergyError) -> EmergyError {
    if err.is_validation() || err.kind() == ErrorKind::UpstreamService {
        return err;
    }
    match err {
        EmergyError::Internal(cause) => {
            error!("Unexpected failure while calculating emergy: {:#}", cause);
            EmergyError::Internal(cause)
        }
        other => {
            error!("Unexpected failure while calculating emergy: {}", other);
            EmergyError::internal(other)
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
