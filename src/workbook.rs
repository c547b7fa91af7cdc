//! Builds the multi-sheet workbook from an inventoried archive.
//!
//! Layout: a `Summary` sheet first (dataset name and declared row count, in
//! inventory order), then one sheet per dataset whose source could be read.

use crate::archive::{ArchiveInventory, DatasetArchive};
use crate::columns::normalize_headers;
use crate::config::{ExportOptions, MissingSourcePolicy};
use crate::dialect::{detect_dialect, header_line};
use crate::error::{ExportError, ExportResult};
use crate::merge::{data_lines, merge_csv_files};
use crate::model::{DatasetInfo, Dialect, ExportOutcome, SkippedDataset};
use crate::styles::{
    MIN_COLUMN_WIDTH, SUMMARY_FIRST_COLUMN_MIN_WIDTH, SUMMARY_OTHER_COLUMN_MIN_WIDTH,
    ColumnFormat, apply_header_style, apply_numeric_style, apply_text_style, classify_column,
    column_width,
};
use crate::utils::{cell_address, column_number_to_name, parse_numeric_cell, unique_sheet_name};
use csv::ReaderBuilder;
use std::collections::HashSet;
use std::io::Cursor;
use std::time::Instant;
use umya_spreadsheet::{Spreadsheet, Worksheet};

pub const SUMMARY_SHEET_NAME: &str = "Summary";
const SUMMARY_HEADERS: [&str; 2] = ["Dataset", "Row Count"];

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn parse(raw: &str) -> Self {
        match parse_numeric_cell(raw) {
            Some(value) => CellValue::Number(value),
            None => CellValue::Text(raw.to_string()),
        }
    }

    /// Length used for column sizing. Numbers are measured in Rust's `f64`
    /// `Display` rendering (`5.5`, `120`, `1000000000000000000000`), not the
    /// cell's thousands-separated display format.
    pub fn display_len(&self) -> usize {
        match self {
            CellValue::Number(value) => value.to_string().chars().count(),
            CellValue::Text(text) => text.chars().count(),
        }
    }
}

/// A dataset split into header and typed data rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetTable {
    pub dialect: Dialect,
    pub header: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl DatasetTable {
    /// Parses dataset text line by line: line 1 is metadata and is skipped,
    /// line 2 is the header (even when blank), every later non-blank line is
    /// one data row. Quotes are ordinary characters, so a row never spans
    /// lines. The dialect is detected on `content` itself.
    pub fn parse(dataset: &str, content: &str) -> ExportResult<Self> {
        let dialect = detect_dialect(content);
        let header = header_line(content)
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                line.split(dialect.delimiter.as_char())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let body = data_lines(content).collect::<Vec<_>>().join("\n");
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .delimiter(dialect.delimiter.as_byte())
            .from_reader(body.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|source| ExportError::Csv {
                dataset: dataset.to_string(),
                source,
            })?;
            rows.push(record.iter().map(CellValue::parse).collect());
        }

        Ok(Self {
            dialect,
            header,
            rows,
        })
    }

    /// Headers in the canonical vocabulary, used for format decisions.
    pub fn normalized_header(&self) -> Vec<String> {
        normalize_headers(&self.header, self.dialect.language)
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.header.len()))
            .max()
            .unwrap_or(0)
    }
}

/// Inventories `bytes` and builds the workbook in one go.
pub fn export_archive_bytes(bytes: Vec<u8>, options: &ExportOptions) -> ExportResult<ExportOutcome> {
    let mut archive = DatasetArchive::from_bytes(bytes)?;
    let inventory = archive.inventory()?;
    build_workbook(&inventory, &mut archive, options)
}

/// Builds the workbook for a validated inventory.
///
/// Datasets whose source cannot be found are handled per
/// [`MissingSourcePolicy`]; every other failure aborts the export.
pub fn build_workbook(
    inventory: &ArchiveInventory,
    archive: &mut DatasetArchive,
    options: &ExportOptions,
) -> ExportResult<ExportOutcome> {
    if !inventory.is_valid {
        let reason = inventory
            .error
            .clone()
            .unwrap_or_else(|| "archive failed validation".to_string());
        return Err(ExportError::invalid_archive(reason));
    }

    let started = Instant::now();
    let mut book = umya_spreadsheet::new_file_empty_worksheet();
    let mut taken = HashSet::new();
    let mut sheet_names = Vec::with_capacity(inventory.datasets.len() + 1);
    let mut skipped = Vec::new();

    let summary_name = unique_sheet_name(SUMMARY_SHEET_NAME, &taken);
    write_summary_sheet(&mut book, &summary_name, &inventory.datasets)?;
    taken.insert(summary_name.to_lowercase());
    sheet_names.push(summary_name);

    for dataset in &inventory.datasets {
        let span = crate::logging::dataset_span(&dataset.name);
        let _enter = span.enter();

        let Some(content) = load_dataset_content(archive, dataset)? else {
            match options.missing_sources {
                MissingSourcePolicy::Fail => {
                    return Err(ExportError::missing_source(&dataset.name));
                }
                MissingSourcePolicy::Report => {
                    tracing::warn!(dataset = %dataset.name, "source file missing, sheet skipped");
                    skipped.push(SkippedDataset {
                        name: dataset.name.clone(),
                        reason: "source file not found in archive".to_string(),
                    });
                }
                MissingSourcePolicy::Skip => {
                    tracing::debug!(dataset = %dataset.name, "source file missing, sheet skipped");
                }
            }
            continue;
        };

        let table = DatasetTable::parse(&dataset.name, &content)?;
        let sheet_name = unique_sheet_name(&dataset.name, &taken);
        write_dataset_sheet(&mut book, &sheet_name, &table, options.translate_headers)?;
        tracing::debug!(
            sheet = %sheet_name,
            rows = table.rows.len(),
            declared_rows = dataset.row_count,
            "dataset sheet written"
        );
        taken.insert(sheet_name.to_lowercase());
        sheet_names.push(sheet_name);
    }

    let bytes = serialize_workbook(&book)?;
    crate::log_slow_operation!(
        started.elapsed(),
        2_000,
        sheets = sheet_names.len(),
        skipped = skipped.len(),
        bytes = bytes.len(),
        "workbook built"
    );

    Ok(ExportOutcome {
        bytes,
        sheet_names,
        skipped,
    })
}

/// Reads a dataset's text, merging shards when it has several.
fn load_dataset_content(
    archive: &mut DatasetArchive,
    dataset: &DatasetInfo,
) -> ExportResult<Option<String>> {
    if let Some(content) = &dataset.content {
        return Ok(Some(content.clone()));
    }

    if dataset.is_multi_file() {
        let mut shards = Vec::with_capacity(dataset.source_files.len());
        for file in &dataset.source_files {
            match archive.read_text(file)? {
                Some(text) => shards.push(text),
                None => {
                    tracing::warn!(file = %file, "declared shard missing from archive");
                    return Ok(None);
                }
            }
        }
        tracing::debug!(shards = shards.len(), "merging dataset shards");
        return Ok(Some(merge_csv_files(&shards)));
    }

    if let Some(file) = dataset.source_files.first() {
        if let Some(text) = archive.read_text(file)? {
            return Ok(Some(text));
        }
    }

    match archive.locate_source(&dataset.name) {
        Some(file) => archive.read_text(&file),
        None => Ok(None),
    }
}

fn new_sheet<'a>(book: &'a mut Spreadsheet, name: &str) -> ExportResult<&'a mut Worksheet> {
    book.new_sheet(name)
        .map_err(|e| ExportError::Spreadsheet(format!("failed to create sheet {name}: {e}")))
}

fn write_summary_sheet(
    book: &mut Spreadsheet,
    name: &str,
    datasets: &[DatasetInfo],
) -> ExportResult<()> {
    let sheet = new_sheet(book, name)?;

    for (idx, header) in SUMMARY_HEADERS.iter().enumerate() {
        let address = cell_address(idx as u32 + 1, 1);
        sheet.get_cell_mut(address.as_str()).set_value_string(*header);
        apply_header_style(sheet.get_style_mut(address.as_str()));
    }

    let mut name_len = SUMMARY_HEADERS[0].chars().count();
    let mut count_len = SUMMARY_HEADERS[1].chars().count();
    for (idx, dataset) in datasets.iter().enumerate() {
        let row = idx as u32 + 2;
        let name_addr = cell_address(1, row);
        let count_addr = cell_address(2, row);
        sheet
            .get_cell_mut(name_addr.as_str())
            .set_value_string(dataset.name.clone());
        apply_text_style(sheet.get_style_mut(name_addr.as_str()));
        sheet
            .get_cell_mut(count_addr.as_str())
            .set_value_number(dataset.row_count as f64);
        apply_numeric_style(
            sheet.get_style_mut(count_addr.as_str()),
            classify_column(SUMMARY_HEADERS[1]),
        );

        name_len = name_len.max(dataset.name.chars().count());
        count_len = count_len.max(dataset.row_count.to_string().len());
    }

    sheet
        .get_column_dimension_mut("A")
        .set_width(column_width(name_len, SUMMARY_FIRST_COLUMN_MIN_WIDTH));
    sheet
        .get_column_dimension_mut("B")
        .set_width(column_width(count_len, SUMMARY_OTHER_COLUMN_MIN_WIDTH));
    Ok(())
}

fn write_dataset_sheet(
    book: &mut Spreadsheet,
    name: &str,
    table: &DatasetTable,
    translate_headers: bool,
) -> ExportResult<()> {
    let sheet = new_sheet(book, name)?;
    let normalized = table.normalized_header();
    let header = if translate_headers {
        &normalized
    } else {
        &table.header
    };
    let formats: Vec<_> = normalized.iter().map(|h| classify_column(h)).collect();
    let mut widths = vec![0usize; table.column_count()];

    for (idx, text) in header.iter().enumerate() {
        let address = cell_address(idx as u32 + 1, 1);
        sheet.get_cell_mut(address.as_str()).set_value_string(text.clone());
        apply_header_style(sheet.get_style_mut(address.as_str()));
        widths[idx] = widths[idx].max(text.chars().count());
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_number = row_idx as u32 + 2;
        for (col_idx, value) in row.iter().enumerate() {
            let address = cell_address(col_idx as u32 + 1, row_number);
            match value {
                CellValue::Number(number) => {
                    sheet.get_cell_mut(address.as_str()).set_value_number(*number);
                    let format = formats
                        .get(col_idx)
                        .copied()
                        .unwrap_or(ColumnFormat::General);
                    apply_numeric_style(sheet.get_style_mut(address.as_str()), format);
                }
                CellValue::Text(text) => {
                    sheet
                        .get_cell_mut(address.as_str())
                        .set_value_string(text.clone());
                    apply_text_style(sheet.get_style_mut(address.as_str()));
                }
            }
            widths[col_idx] = widths[col_idx].max(value.display_len());
        }
    }

    for (idx, max_len) in widths.into_iter().enumerate() {
        let column = column_number_to_name(idx as u32 + 1);
        sheet
            .get_column_dimension_mut(&column)
            .set_width(column_width(max_len, MIN_COLUMN_WIDTH));
    }
    Ok(())
}

fn serialize_workbook(book: &Spreadsheet) -> ExportResult<Vec<u8>> {
    let mut cursor = Cursor::new(Vec::new());
    umya_spreadsheet::writer::xlsx::write_writer(book, &mut cursor)
        .map_err(|e| ExportError::Spreadsheet(format!("failed to serialize workbook: {e}")))?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Delimiter, Language};
    use assert_matches::assert_matches;

    const GERMAN: &str = "Name:Anna, Date Range:2025-01-01 - 2025-01-02\n\
Zeitstempel,Glukosewert (mg/dl),Seriennummer\n\
2025-01-01 08:00,120,1234567\n\
2025-01-01 08:05,,1234567\n";

    #[test]
    fn parses_typed_cells() {
        let table = DatasetTable::parse("bg", GERMAN).unwrap();
        assert_eq!(table.dialect.delimiter, Delimiter::Comma);
        assert_eq!(table.dialect.language, Language::German);
        assert_eq!(
            table.header,
            vec!["Zeitstempel", "Glukosewert (mg/dl)", "Seriennummer"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("2025-01-01 08:00".into()));
        assert_eq!(table.rows[0][1], CellValue::Number(120.0));
        assert_eq!(table.rows[1][1], CellValue::Text(String::new()));
        assert_eq!(
            table.normalized_header(),
            vec!["timestamp", "glucose value", "serial number"]
        );
    }

    #[test]
    fn tab_files_and_crlf_lines() {
        let text = "Name:x\r\nTimestamp\tGlucose Value (mmol/L)\r\n2025-01-01\t5.5\r\n\r\n";
        let table = DatasetTable::parse("cgm", text).unwrap();
        assert_eq!(table.header, vec!["Timestamp", "Glucose Value (mmol/L)"]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0][1], CellValue::Number(5.5));
    }

    #[test]
    fn metadata_only_text_has_no_rows() {
        let table = DatasetTable::parse("empty", "Name:x").unwrap();
        assert!(table.header.is_empty());
        assert!(table.rows.is_empty());
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn quotes_are_kept_verbatim_and_never_join_lines() {
        let text = "Name:x\nTimestamp\tNotes\tValue\n\
2025-01-01\t\"pizza\t5\n\
2025-01-02\t\"big\" pizza\t6\n\
2025-01-03\tok\t7\n";
        let table = DatasetTable::parse("notes", text).unwrap();
        assert_eq!(table.rows.len(), crate::merge::count_data_rows(text));
        assert_eq!(table.rows[0][1], CellValue::Text("\"pizza".into()));
        assert_eq!(table.rows[1][1], CellValue::Text("\"big\" pizza".into()));
        assert_eq!(table.rows[2][2], CellValue::Number(7.0));
    }

    #[test]
    fn blank_header_line_does_not_promote_first_row() {
        let text = "Name:x\n\n2025-01-01\t5\n2025-01-02\t6\n";
        let table = DatasetTable::parse("bare", text).unwrap();
        assert!(table.header.is_empty());
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][0], CellValue::Text("2025-01-01".into()));
        assert_eq!(table.rows[1][1], CellValue::Number(6.0));
    }

    #[test]
    fn header_cells_are_not_trimmed() {
        let text = "Name:x\nTimestamp \t Glucose Value (mg/dL)\n2025-01-01\t5\n";
        let table = DatasetTable::parse("cgm", text).unwrap();
        assert_eq!(table.header, vec!["Timestamp ", " Glucose Value (mg/dL)"]);
        assert_eq!(
            crate::styles::classify_column(&table.normalized_header()[1]),
            crate::styles::ColumnFormat::Decimal
        );
    }

    #[test]
    fn display_len_matches_rendered_numbers() {
        assert_eq!(CellValue::Number(120.0).display_len(), 3);
        assert_eq!(CellValue::Number(5.5).display_len(), 3);
        assert_eq!(CellValue::Number(1234.5).display_len(), 6);
        assert_eq!(CellValue::Number(1e21).display_len(), 22);
        assert_eq!(CellValue::Text("Irić".into()).display_len(), 4);
    }

    #[test]
    fn invalid_inventory_is_refused() {
        let inventory = ArchiveInventory::invalid("not a zip");
        let mut archive = DatasetArchive::from_bytes(empty_zip()).unwrap();
        let err = build_workbook(&inventory, &mut archive, &ExportOptions::default()).unwrap_err();
        assert_matches!(err, ExportError::InvalidArchive { ref reason } if reason == "not a zip");
    }

    fn empty_zip() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.finish().unwrap().into_inner()
    }
}
