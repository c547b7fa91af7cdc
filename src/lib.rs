pub mod archive;
pub mod columns;
pub mod config;
pub mod dialect;
pub mod error;
pub mod logging;
pub mod merge;
pub mod metadata;
pub mod model;
pub mod styles;
pub mod utils;
pub mod workbook;

pub use archive::{ArchiveInventory, DatasetArchive};
pub use config::{CliArgs, Command, ExportConfig, ExportOptions, MissingSourcePolicy};
pub use error::{ErrorCode, ExportError, ExportResult, ResultExt};
pub use logging::{LoggingConfig, init_logging};
pub use model::{DatasetInfo, DatasetMetadata, Delimiter, Dialect, ExportOutcome, Language};
pub use workbook::{build_workbook, export_archive_bytes};

use anyhow::{Context, Result};
use std::path::Path;
use tracing::Instrument;

/// Reads an archive from disk and builds its workbook.
///
/// Parsing and workbook serialization run on the blocking pool.
pub async fn export_archive_file(path: &Path, options: ExportOptions) -> Result<ExportOutcome> {
    let entry = path.display().to_string();
    let span = logging::export_span(&entry);

    async move {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read archive {:?}", path))?;
        tracing::debug!(bytes = bytes.len(), "archive loaded");

        let current = tracing::Span::current();
        let outcome = tokio::task::spawn_blocking(move || {
            let _enter = current.enter();
            export_archive_bytes(bytes, &options)
        })
        .await
        .context("export task panicked")?
        .with_entry(&entry)?;

        tracing::info!(
            sheets = outcome.sheet_names.len(),
            skipped = outcome.skipped.len(),
            bytes = outcome.bytes.len(),
            "export complete"
        );
        Ok::<_, anyhow::Error>(outcome)
    }
    .instrument(span)
    .await
}

/// Reads an archive from disk and runs the inventory check on it.
pub async fn inspect_archive_file(path: &Path) -> Result<ArchiveInventory> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read archive {:?}", path))?;
    tokio::task::spawn_blocking(move || ArchiveInventory::from_bytes(bytes))
        .await
        .context("inspect task panicked")
}

pub async fn run(cli: CliArgs) -> Result<()> {
    match cli.command {
        Command::Export(args) => {
            let config = ExportConfig::from_args(args, cli.config.as_deref())?;
            config.validate()?;

            tracing::info!(
                input = %config.input.display(),
                missing_sources = %config.options.missing_sources,
                translate_headers = config.options.translate_headers,
                "starting export"
            );
            let outcome = export_archive_file(&config.input, config.options).await?;

            if config.base64 {
                println!("{}", utils::encode_base64_bytes(&outcome.bytes));
            } else {
                let output = config.output_path();
                tokio::fs::write(&output, &outcome.bytes)
                    .await
                    .with_context(|| format!("failed to write workbook {:?}", output))?;
                tracing::info!(output = %output.display(), "workbook written");
            }
            Ok(())
        }
        Command::Inspect(args) => {
            let inventory = inspect_archive_file(&args.input).await?;
            println!("{}", serde_json::to_string_pretty(&inventory)?);
            if !inventory.is_valid {
                anyhow::bail!(
                    "archive {:?} is not a valid export: {}",
                    args.input,
                    inventory.error.as_deref().unwrap_or("unknown reason")
                );
            }
            Ok(())
        }
    }
}
