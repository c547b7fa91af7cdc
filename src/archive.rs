//! ZIP access and the inventory check the exporter trusts.
//!
//! [`DatasetArchive`] owns one in-memory ZIP handle. Nothing here is shared
//! between exports: each export opens its own archive from its own bytes.

use crate::columns::glucose_unit;
use crate::dialect::{detect_dialect, header_line, split_header};
use crate::error::{ExportError, ExportResult};
use crate::merge::count_data_rows;
use crate::metadata::{is_valid_metadata, parse_metadata};
use crate::model::{DatasetInfo, DatasetMetadata, RawDatasetFile};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;
use zip::result::ZipError;

/// Entries larger than this are refused rather than inflated into memory.
pub const MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

static SHARD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(.+?)_data(?:_(\d+))?\.csv$").expect("shard name pattern"));

pub struct DatasetArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    entry_names: Vec<String>,
    /// Entries already inflated by [`DatasetArchive::inventory`]. Each is
    /// handed out once by `read_text`, then dropped.
    decoded: HashMap<String, String>,
}

impl DatasetArchive {
    pub fn from_bytes(bytes: Vec<u8>) -> ExportResult<Self> {
        let mut zip = ZipArchive::new(Cursor::new(bytes))?;
        let mut entry_names = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            entry_names.push(zip.by_index(index)?.name().to_string());
        }
        Ok(Self {
            zip,
            entry_names,
            decoded: HashMap::new(),
        })
    }

    /// Names of every CSV entry, in archive order.
    pub fn csv_file_names(&self) -> Vec<String> {
        self.entry_names
            .iter()
            .filter(|name| is_csv_entry(name))
            .cloned()
            .collect()
    }

    /// Text of an entry, `None` when the archive has no such entry.
    pub fn read_text(&mut self, name: &str) -> ExportResult<Option<String>> {
        if let Some(text) = self.decoded.remove(name) {
            return Ok(Some(text));
        }

        let mut entry = match self.zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let declared_size = entry.size();
        if declared_size > MAX_ENTRY_BYTES {
            return Err(ExportError::invalid_archive(format!(
                "entry {name} too large ({declared_size} bytes; max {MAX_ENTRY_BYTES} bytes)"
            )));
        }

        let mut buf = Vec::with_capacity(declared_size as usize);
        entry.read_to_end(&mut buf)?;
        Ok(Some(decode_text(&buf)))
    }

    pub fn read_csv_files(&mut self) -> ExportResult<Vec<RawDatasetFile>> {
        let names = self.csv_file_names();
        let mut files = Vec::with_capacity(names.len());
        for name in names {
            let Some(content) = self.read_text(&name)? else {
                continue;
            };
            files.push(RawDatasetFile {
                file_name: name,
                content,
            });
        }
        Ok(files)
    }

    /// Finds the entry for a dataset without declared sources:
    /// `<name>_data_<N>.csv` first, then any CSV whose name contains `name`.
    pub fn locate_source(&self, dataset: &str) -> Option<String> {
        let names = self.csv_file_names();
        let wanted = dataset.to_lowercase();
        names
            .iter()
            .find(|name| {
                SHARD_NAME_RE
                    .captures(base_name(name))
                    .is_some_and(|caps| caps[1].to_lowercase() == wanted && caps.get(2).is_some())
            })
            .or_else(|| {
                names
                    .iter()
                    .find(|name| base_name(name).to_lowercase().contains(&wanted))
            })
            .cloned()
    }

    /// Runs the validity check over every CSV entry. The decoded text is
    /// kept so the export that follows does not inflate the entries again.
    pub fn inventory(&mut self) -> ExportResult<ArchiveInventory> {
        let files = self.read_csv_files()?;
        let inventory = ArchiveInventory::from_files(&files);
        self.decoded.extend(
            files
                .into_iter()
                .map(|file| (file.file_name, file.content)),
        );
        Ok(inventory)
    }

    /// Number of entries decoded by `inventory` and not yet read back.
    pub fn cached_entries(&self) -> usize {
        self.decoded.len()
    }
}

/// Outcome of the archive check, consumed verbatim by the exporter.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveInventory {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_line: Option<String>,
    pub metadata: DatasetMetadata,
    pub datasets: Vec<DatasetInfo>,
}

impl ArchiveInventory {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Opens `bytes` as a ZIP and inventories it. A broken archive yields an
    /// invalid inventory, not an error.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let result = DatasetArchive::from_bytes(bytes).and_then(|mut archive| archive.inventory());
        match result {
            Ok(inventory) => inventory,
            Err(err) => {
                tracing::warn!(error = %err, "archive failed inventory check");
                Self::invalid(err.to_string())
            }
        }
    }

    pub fn from_files(files: &[RawDatasetFile]) -> Self {
        if files.is_empty() {
            return Self::invalid("no CSV files found in archive");
        }

        let mut groups: IndexMap<String, Vec<(Option<u32>, &RawDatasetFile)>> = IndexMap::new();
        for file in files {
            let name = dataset_name_for(&file.file_name);
            groups
                .entry(name)
                .or_default()
                .push((shard_index(&file.file_name), file));
        }

        let mut datasets = Vec::with_capacity(groups.len());
        for (name, mut shards) in groups {
            shards.sort_by(|(a_idx, a), (b_idx, b)| {
                a_idx
                    .cmp(b_idx)
                    .then_with(|| a.file_name.cmp(&b.file_name))
            });

            let first = shards[0].1;
            let dialect = detect_dialect(&first.content);
            let column_names = header_line(&first.content)
                .map(|line| split_header(line, dialect.delimiter))
                .unwrap_or_default();
            let row_count: usize = shards
                .iter()
                .map(|(_, file)| count_data_rows(&file.content))
                .sum();

            let mut info = DatasetInfo::new(name, row_count)
                .with_source_files(shards.iter().map(|(_, file)| file.file_name.clone()));
            info.glucose_unit = glucose_unit(&column_names);
            info.column_names = column_names;
            info.dialect = Some(dialect);
            datasets.push(info);
        }

        let metadata_line = files[0]
            .content
            .lines()
            .next()
            .map(|line| line.trim_end_matches('\r').to_string());
        let metadata = metadata_line
            .as_deref()
            .map(parse_metadata)
            .unwrap_or_default();
        if !is_valid_metadata(&metadata) {
            tracing::debug!(line = ?metadata_line, "archive has no recognizable metadata line");
        }

        Self {
            is_valid: true,
            error: None,
            metadata_line,
            metadata,
            datasets,
        }
    }

    pub fn total_rows(&self) -> usize {
        self.datasets.iter().map(|dataset| dataset.row_count).sum()
    }
}

fn is_csv_entry(name: &str) -> bool {
    !name.ends_with('/')
        && !name.starts_with("__MACOSX/")
        && !base_name(name).starts_with("._")
        && name.to_lowercase().ends_with(".csv")
}

fn base_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// `cgm_data_3.csv` -> `cgm`; names that do not follow the shard pattern use
/// their stem.
pub fn dataset_name_for(file_name: &str) -> String {
    let base = base_name(file_name);
    if let Some(caps) = SHARD_NAME_RE.captures(base) {
        return caps[1].to_string();
    }
    base.rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(base)
        .to_string()
}

fn shard_index(file_name: &str) -> Option<u32> {
    SHARD_NAME_RE
        .captures(base_name(file_name))
        .and_then(|caps| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
