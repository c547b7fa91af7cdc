#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use tempfile::{TempDir, tempdir};
use umya_spreadsheet::{Spreadsheet, Worksheet};
use zip::ZipWriter;
use zip::write::FileOptions;

pub const CGM_HEADER: &str = "Timestamp\tGlucose Value (mmol/L)\tSerial Number";
pub const CGM_METADATA: &str = "Name:Igor Irić\tDate Range:2025-01-01 - 2025-01-07";

/// Builds an in-memory ZIP with the given `(name, content)` entries, in order.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(content.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

/// One CGM shard with `rows` readings starting at `first_minute`.
pub fn cgm_shard(first_minute: usize, rows: usize) -> String {
    let mut text = format!("{CGM_METADATA}\n{CGM_HEADER}\n");
    for i in 0..rows {
        let minute = first_minute + i * 5;
        text.push_str(&format!(
            "2025-01-01 {:02}:{:02}\t{:.1}\t1234567\n",
            minute / 60,
            minute % 60,
            5.0 + i as f64 / 10.0
        ));
    }
    text
}

/// The three-shard CGM export used across the pipeline tests.
pub fn cgm_archive_entries() -> Vec<(String, String)> {
    vec![
        ("cgm_data_1.csv".to_string(), cgm_shard(0, 3)),
        ("cgm_data_2.csv".to_string(), cgm_shard(15, 2)),
        ("cgm_data_3.csv".to_string(), cgm_shard(25, 4)),
    ]
}

pub fn zip_owned(entries: &[(String, String)]) -> Vec<u8> {
    let borrowed: Vec<(&str, &str)> = entries
        .iter()
        .map(|(name, content)| (name.as_str(), content.as_str()))
        .collect();
    zip_bytes(&borrowed)
}

pub fn read_workbook(bytes: &[u8]) -> Spreadsheet {
    umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes.to_vec()), true)
        .expect("read workbook")
}

pub fn sheet_names(book: &Spreadsheet) -> Vec<String> {
    book.get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect()
}

pub fn sheet<'a>(book: &'a Spreadsheet, name: &str) -> &'a Worksheet {
    book.get_sheet_by_name(name)
        .unwrap_or_else(|| panic!("sheet {name} missing"))
}

/// Cell values of one row, from column A up to `columns`.
pub fn row_values(sheet: &Worksheet, row: u32, columns: u32) -> Vec<String> {
    (1..=columns)
        .map(|col| sheet.get_value((col, row)))
        .collect()
}

pub struct TestWorkspace {
    _tempdir: TempDir,
    root: PathBuf,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let tempdir = tempdir().expect("tempdir");
        let root = tempdir.path().to_path_buf();
        Self {
            _tempdir: tempdir,
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn write_archive(&self, name: &str, entries: &[(String, String)]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, zip_owned(entries)).expect("write archive");
        path
    }
}
