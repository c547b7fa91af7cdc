use crate::error::ExportError;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_BASE_NAME: &str = "glucose-export";
pub const OUTPUT_EXTENSION: &str = "xlsx";

/// What to do with a dataset whose source file is not in the archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingSourcePolicy {
    /// Omit the sheet without telling anyone
    Skip,
    /// Omit the sheet and list it in the export outcome
    #[default]
    Report,
    /// Abort the whole export
    Fail,
}

impl std::fmt::Display for MissingSourcePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingSourcePolicy::Skip => write!(f, "skip"),
            MissingSourcePolicy::Report => write!(f, "report"),
            MissingSourcePolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Knobs the workbook builder reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    pub missing_sources: MissingSourcePolicy,
    /// Write canonical English headers for German datasets.
    pub translate_headers: bool,
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub base_name: String,
    pub base64: bool,
    pub options: ExportOptions,
}

impl ExportConfig {
    pub fn from_args(args: ExportArgs, config_file: Option<&Path>) -> Result<Self> {
        let ExportArgs {
            input,
            output_dir: cli_output_dir,
            base_name: cli_base_name,
            base64,
            missing_sources: cli_missing_sources,
            translate_headers: cli_translate_headers,
        } = args;

        let PartialConfig {
            output_dir: file_output_dir,
            base_name: file_base_name,
            missing_sources: file_missing_sources,
            translate_headers: file_translate_headers,
        } = match config_file {
            Some(path) => load_config_file(path)?,
            None => PartialConfig::default(),
        };

        let base_name = cli_base_name
            .or(file_base_name)
            .or_else(|| {
                input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string());

        let output_dir = cli_output_dir
            .or(file_output_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let missing_sources = cli_missing_sources
            .or(file_missing_sources)
            .unwrap_or_default();

        let translate_headers = cli_translate_headers
            .or(file_translate_headers)
            .unwrap_or(false);

        Ok(Self {
            input,
            output_dir,
            base_name: base_name.trim().to_string(),
            base64,
            options: ExportOptions {
                missing_sources,
                translate_headers,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.input.exists(),
            "input archive {:?} does not exist",
            self.input
        );
        anyhow::ensure!(
            self.input.is_file(),
            "input archive {:?} is not a file",
            self.input
        );
        if !self.base64 {
            anyhow::ensure!(
                self.output_dir.is_dir(),
                "output directory {:?} does not exist",
                self.output_dir
            );
        }
        anyhow::ensure!(!self.base_name.is_empty(), "base name must not be empty");
        anyhow::ensure!(
            !self.base_name.contains(['/', '\\']),
            "base name {:?} must not contain path separators",
            self.base_name
        );
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.base_name, OUTPUT_EXTENSION))
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "glucose-export",
    about = "Convert CGM/pump export archives into spreadsheet workbooks",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build a workbook from an export archive
    Export(ExportArgs),
    /// Print what the archive contains as JSON
    Inspect(InspectArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    #[arg(value_name = "ZIP", help = "Export archive to convert")]
    pub input: PathBuf,

    #[arg(
        long,
        env = "GLUCOSE_EXPORT_OUTPUT_DIR",
        value_name = "DIR",
        help = "Directory the workbook is written to"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "NAME",
        help = "Workbook file name without extension (defaults to the archive name)"
    )]
    pub base_name: Option<String>,

    #[arg(long, help = "Print the workbook as base64 on stdout instead of writing a file")]
    pub base64: bool,

    #[arg(
        long,
        env = "GLUCOSE_EXPORT_MISSING_SOURCES",
        value_enum,
        value_name = "POLICY",
        help = "How to handle datasets whose source file is missing"
    )]
    pub missing_sources: Option<MissingSourcePolicy>,

    #[arg(
        long,
        env = "GLUCOSE_EXPORT_TRANSLATE_HEADERS",
        value_name = "BOOL",
        num_args = 0..=1,
        default_missing_value = "true",
        help = "Write canonical English headers for German exports"
    )]
    pub translate_headers: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(value_name = "ZIP", help = "Export archive to inspect")]
    pub input: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    output_dir: Option<PathBuf>,
    base_name: Option<String>,
    missing_sources: Option<MissingSourcePolicy>,
    translate_headers: Option<bool>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => {
            return Err(ExportError::Config(format!("unsupported config extension: {other}")).into());
        }
    };
    Ok(parsed)
}
