//! Suppliers of flow tables for the calculation pipeline.
//!
//! Two variants exist: [`FileDataSource`] reads and validates an uploaded
//! CSV/spreadsheet, [`CatalogDataSource`] pulls a product's flows from the
//! LCI catalog.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use emergy_core::error::{EmergyError, Result};
use emergy_core::models::{FlowRecord, FlowTable};
use emergy_data::validator::parse_flow_file;
use tracing::debug;

use crate::lci_client::FlowCatalog;

/// Anything that can produce a complete [`FlowTable`].
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<FlowTable>;
}

// ── FileDataSource ────────────────────────────────────────────────────────────

/// Flow table read from a local `.csv`, `.xls` or `.xlsx` file.
///
/// The file is fully parsed and validated before anything is returned.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
}

impl FileDataSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    async fn fetch(&self) -> Result<FlowTable> {
        debug!("Parsing flow table from {}", self.path().display());
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || parse_flow_file(&path))
            .await
            .map_err(EmergyError::internal)?
    }
}

// ── CatalogDataSource ─────────────────────────────────────────────────────────

/// Flow table for one product of the LCI catalog.
///
/// Catalog flows are mapped field-by-field onto [`FlowRecord`] and are NOT
/// passed through the file validator: the catalog is trusted to deliver
/// typed values. Rows the catalog sends without a UEV are dropped later by
/// the aggregator rather than rejected here.
pub struct CatalogDataSource<C: FlowCatalog> {
    product_id: i64,
    catalog: Arc<C>,
}

impl<C: FlowCatalog> CatalogDataSource<C> {
    pub fn new(product_id: i64, catalog: Arc<C>) -> Self {
        Self {
            product_id,
            catalog,
        }
    }

    pub fn product_id(&self) -> i64 {
        self.product_id
    }
}

#[async_trait]
impl<C: FlowCatalog + 'static> DataSource for CatalogDataSource<C> {
    async fn fetch(&self) -> Result<FlowTable> {
        let flows = self.catalog.flows_for_product(self.product_id()).await?;
        debug!(
            product_id = self.product_id(),
            "Mapping {} catalog flows into a flow table",
            flows.len()
        );
        Ok(flows.into_iter().map(FlowRecord::from).collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
