//! Delimiter and header-language detection for dataset files.
//!
//! Line 1 of every export is the metadata line, so both detectors look at
//! line 2 (the header row). Detection happens once per file and the result is
//! applied to every row of that file.

use crate::model::{Delimiter, Dialect, Language};

/// Delimiter used when a file is too short to inspect or the counts tie.
pub const DEFAULT_DELIMITER: Delimiter = Delimiter::Tab;

/// Language used when no indicator wins a strict majority.
pub const DEFAULT_LANGUAGE: Language = Language::English;

pub const DEFAULT_DIALECT: Dialect = Dialect {
    delimiter: DEFAULT_DELIMITER,
    language: DEFAULT_LANGUAGE,
};

const GERMAN_INDICATORS: &[&str] = &["zeitstempel", "glukosewert", "insulin-typ", "seriennummer"];
const ENGLISH_INDICATORS: &[&str] = &["timestamp", "glucose value", "insulin type", "serial number"];

/// Header line of a dataset file, if it has one.
pub fn header_line(text: &str) -> Option<&str> {
    text.lines().nth(1)
}

/// Picks comma only when it strictly outnumbers tabs on the header line.
pub fn delimiter_for_counts(commas: usize, tabs: usize) -> Delimiter {
    if commas > tabs {
        Delimiter::Comma
    } else {
        DEFAULT_DELIMITER
    }
}

/// Picks German only on a strict majority of matched indicators.
pub fn language_for_counts(german: usize, english: usize) -> Language {
    if german > english {
        Language::German
    } else if english > german {
        Language::English
    } else {
        DEFAULT_LANGUAGE
    }
}

pub fn detect_delimiter(text: &str) -> Delimiter {
    let Some(header) = header_line(text) else {
        return DEFAULT_DELIMITER;
    };
    let commas = header.matches(',').count();
    let tabs = header.matches('\t').count();
    delimiter_for_counts(commas, tabs)
}

pub fn detect_language<S: AsRef<str>>(headers: &[S]) -> Language {
    let lowered: Vec<String> = headers
        .iter()
        .map(|header| header.as_ref().to_lowercase())
        .collect();
    let matches = |indicators: &[&str]| {
        indicators
            .iter()
            .filter(|indicator| lowered.iter().any(|header| header.contains(*indicator)))
            .count()
    };
    language_for_counts(matches(GERMAN_INDICATORS), matches(ENGLISH_INDICATORS))
}

/// Splits a single line on the given delimiter without quote handling.
pub fn split_header(line: &str, delimiter: Delimiter) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(delimiter.as_char())
        .map(|cell| cell.trim().to_string())
        .collect()
}

pub fn detect_dialect(text: &str) -> Dialect {
    let delimiter = detect_delimiter(text);
    let language = header_line(text)
        .map(|line| detect_language(&split_header(line, delimiter)))
        .unwrap_or(DEFAULT_LANGUAGE);
    Dialect {
        delimiter,
        language,
    }
}
