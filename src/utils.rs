use crate::error::{ExportError, ExportResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;

/// Hard limit of the XLSX format.
pub const MAX_SHEET_NAME_LEN: usize = 31;

const FORBIDDEN_SHEET_CHARS: &[char] = &['\\', '/', '*', '?', '[', ']', ':'];
const FALLBACK_SHEET_NAME: &str = "Sheet";

pub fn column_number_to_name(column: u32) -> String {
    let mut column = column;
    let mut name = String::new();
    while column > 0 {
        let rem = ((column - 1) % 26) as u8;
        name.insert(0, (b'A' + rem) as char);
        column = (column - 1) / 26;
    }
    name
}

/// A1-style address from 1-based column and row.
pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_number_to_name(column), row)
}

/// Replaces characters sheet names may not contain, then truncates to 31
/// characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '_' } else { c })
        .take(MAX_SHEET_NAME_LEN)
        .collect()
}

/// Sanitized name that is not yet in `taken` (compared case-insensitively),
/// suffixing `_2`, `_3`, ... while staying within the length limit.
pub fn unique_sheet_name(name: &str, taken: &HashSet<String>) -> String {
    let mut base = sanitize_sheet_name(name);
    if base.trim().is_empty() {
        base = FALLBACK_SHEET_NAME.to_string();
    }
    if !taken.contains(&base.to_lowercase()) {
        return base;
    }
    let mut counter = 2usize;
    loop {
        let suffix = format!("_{counter}");
        let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
        let candidate: String = base.chars().take(keep).chain(suffix.chars()).collect();
        if !taken.contains(&candidate.to_lowercase()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Parses a cell as a number with `.` as the only decimal separator.
///
/// Surrounding whitespace is ignored; anything else around the digits, and
/// non-finite spellings such as `inf` or `NaN`, make the cell text.
pub fn parse_numeric_cell(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
    {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn encode_base64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

pub fn decode_base64(encoded: &str) -> ExportResult<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| ExportError::Encoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
}

pub fn encode_base64_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
