mod bootstrap;
mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use emergy_core::error::EmergyError;
use emergy_core::settings::{Command, Settings};
use emergy_runtime::lci_client::{FlowCatalog, LciClient};
use emergy_runtime::service::{into_boundary_error, EmergyService};

use crate::output::{to_json, ErrorReport, FileReport, ProductReport};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::load();

    let log_file = if settings.no_log_file {
        None
    } else {
        match &settings.log_file {
            Some(path) => Some(path.clone()),
            None => {
                bootstrap::ensure_directories()?;
                Some(bootstrap::default_log_path())
            }
        }
    };
    bootstrap::setup_logging(&settings.log_level, log_file.as_deref())?;

    tracing::info!("emergy-calc v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Command: {:?}", settings.command);

    match run(&settings).await {
        Ok(json) => {
            println!("{}", json);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::warn!(status = err.status_code(), "Request failed: {}", err);
            eprintln!("{}", to_json(&ErrorReport::from(&err), settings.pretty)?);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Execute the selected subcommand and render its JSON document.
async fn run(settings: &Settings) -> emergy_core::Result<String> {
    let json = match &settings.command {
        Command::File { path } => {
            let report = EmergyService::for_file(path).calculate().await?;
            to_json(&FileReport::new(path, report), settings.pretty)
        }
        Command::Lci { product_id } => {
            let catalog = Arc::new(LciClient::new(&settings.lci_config()?)?);
            tracing::info!(
                "Fetching product {} from {}",
                product_id,
                catalog.api_url()
            );
            let report = EmergyService::for_catalog_product(*product_id, catalog)
                .calculate()
                .await?;
            to_json(
                &ProductReport {
                    product_id: *product_id,
                    report,
                },
                settings.pretty,
            )
        }
        Command::Products => {
            let catalog = LciClient::new(&settings.lci_config()?)?;
            let products = catalog
                .list_products()
                .await
                .map_err(into_boundary_error)?;
            to_json(&products, settings.pretty)
        }
    };
    json.map_err(EmergyError::internal)
}
