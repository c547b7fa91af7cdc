use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Field separator of a dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Delimiter::Tab => '\t',
            Delimiter::Comma => ',',
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
        }
    }
}

impl std::fmt::Display for Delimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delimiter::Tab => write!(f, "tab"),
            Delimiter::Comma => write!(f, "comma"),
        }
    }
}

/// Language the column headers of an export were written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(rename = "en")]
    #[strum(to_string = "en", serialize = "english", ascii_case_insensitive)]
    English,
    #[serde(rename = "de")]
    #[strum(to_string = "de", serialize = "german", ascii_case_insensitive)]
    German,
}

/// Delimiter and language inferred once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub delimiter: Delimiter,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

impl std::fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields carried on the first line of a dataset file.
///
/// Every field is independently optional. Serializes to `{}` when nothing was
/// recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl DatasetMetadata {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.date_range.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
    }
}

/// One CSV entry pulled out of the uploaded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDatasetFile {
    pub file_name: String,
    pub content: String,
}

/// What the archive inventory knows about one logical dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub name: String,
    pub row_count: usize,
    pub column_names: Vec<String>,
    /// Shard file names in merge order. Empty when the dataset must be located
    /// by name pattern.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glucose_unit: Option<GlucoseUnit>,
    /// Dataset text supplied directly instead of read from the archive.
    #[serde(skip)]
    pub content: Option<String>,
}

impl DatasetInfo {
    pub fn new(name: impl Into<String>, row_count: usize) -> Self {
        Self {
            name: name.into(),
            row_count,
            column_names: Vec::new(),
            source_files: Vec::new(),
            dialect: None,
            glucose_unit: None,
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_source_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source_files = files.into_iter().map(Into::into).collect();
        self
    }

    /// True when the dataset's files are shards of one export.
    pub fn is_multi_file(&self) -> bool {
        self.source_files.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDataset {
    pub name: String,
    pub reason: String,
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub bytes: Vec<u8>,
    /// Sheet names in workbook order, Summary first.
    pub sheet_names: Vec<String>,
    pub skipped: Vec<SkippedDataset>,
}

impl ExportOutcome {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}
