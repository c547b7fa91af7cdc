//! Cell styling for exported sheets.
//!
//! Numeric display formats are chosen per column from the (normalized)
//! header text; alignment follows the cell's stored type.

use umya_spreadsheet::structs::HorizontalAlignmentValues;
use umya_spreadsheet::{PatternValues, Style};

pub const HEADER_FILL_ARGB: &str = "FFD9E1F2";
pub const INTEGER_FORMAT: &str = "#,##0";
pub const DECIMAL_FORMAT: &str = "#,##0.0";

pub const COLUMN_PADDING: usize = 2;
pub const MIN_COLUMN_WIDTH: usize = 10;
pub const SUMMARY_FIRST_COLUMN_MIN_WIDTH: usize = 20;
pub const SUMMARY_OTHER_COLUMN_MIN_WIDTH: usize = 15;

const INTEGER_HINTS: &[&str] = &["count", "number of", "serial", "id"];
const DECIMAL_HINTS: &[&str] = &[
    "glucose", "insulin", "carb", "bg", "cgm", "dose", "value", "rate",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFormat {
    Integer,
    Decimal,
    General,
}

impl ColumnFormat {
    pub fn format_code(self) -> Option<&'static str> {
        match self {
            ColumnFormat::Integer => Some(INTEGER_FORMAT),
            ColumnFormat::Decimal => Some(DECIMAL_FORMAT),
            ColumnFormat::General => None,
        }
    }
}

/// Integer hints are checked before decimal hints.
pub fn classify_column(header: &str) -> ColumnFormat {
    let header = header.to_lowercase();
    if INTEGER_HINTS.iter().any(|hint| header.contains(hint)) {
        ColumnFormat::Integer
    } else if DECIMAL_HINTS.iter().any(|hint| header.contains(hint)) {
        ColumnFormat::Decimal
    } else {
        ColumnFormat::General
    }
}

pub fn apply_header_style(style: &mut Style) {
    style.get_font_mut().set_bold(true);
    style
        .get_fill_mut()
        .get_pattern_fill_mut()
        .set_pattern_type(PatternValues::Solid)
        .get_foreground_color_mut()
        .set_argb(HEADER_FILL_ARGB);
}

pub fn apply_numeric_style(style: &mut Style, format: ColumnFormat) {
    style
        .get_alignment_mut()
        .set_horizontal(HorizontalAlignmentValues::Right);
    if let Some(code) = format.format_code() {
        style.get_number_format_mut().set_format_code(code);
    }
}

pub fn apply_text_style(style: &mut Style) {
    style
        .get_alignment_mut()
        .set_horizontal(HorizontalAlignmentValues::Left);
}

/// Longest rendered cell plus padding, never below `min_width`.
pub fn column_width(max_len: usize, min_width: usize) -> f64 {
    (max_len + COLUMN_PADDING).max(min_width) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_integer_columns() {
        assert_eq!(classify_column("Serial Number"), ColumnFormat::Integer);
        assert_eq!(classify_column("Number of Readings"), ColumnFormat::Integer);
        assert_eq!(classify_column("Event ID"), ColumnFormat::Integer);
        assert_eq!(classify_column("Row Count"), ColumnFormat::Integer);
    }

    #[test]
    fn classifies_decimal_columns() {
        assert_eq!(classify_column("Glucose Value (mmol/L)"), ColumnFormat::Decimal);
        assert_eq!(classify_column("Insulin Type"), ColumnFormat::Decimal);
        assert_eq!(classify_column("Carbs (g)"), ColumnFormat::Decimal);
        assert_eq!(classify_column("Basal Rate"), ColumnFormat::Decimal);
        assert_eq!(classify_column("Dose (units)"), ColumnFormat::Decimal);
    }

    #[test]
    fn integer_hints_win_over_decimal_hints() {
        assert_eq!(classify_column("Glucose Count"), ColumnFormat::Integer);
    }

    #[test]
    fn other_columns_get_no_format() {
        assert_eq!(classify_column("Timestamp"), ColumnFormat::General);
        assert_eq!(classify_column("Notes"), ColumnFormat::General);
        assert_eq!(ColumnFormat::General.format_code(), None);
    }

    #[test]
    fn widths_are_padded_and_clamped() {
        assert_eq!(column_width(3, MIN_COLUMN_WIDTH), 10.0);
        assert_eq!(column_width(25, MIN_COLUMN_WIDTH), 27.0);
        assert_eq!(column_width(4, SUMMARY_FIRST_COLUMN_MIN_WIDTH), 20.0);
        assert_eq!(column_width(14, SUMMARY_OTHER_COLUMN_MIN_WIDTH), 16.0);
    }

    #[test]
    fn header_style_is_bold_and_shaded() {
        let mut style = Style::default();
        apply_header_style(&mut style);
        assert!(*style.get_font().unwrap().get_bold());
        let fill = style.get_fill().unwrap().get_pattern_fill().unwrap();
        assert_eq!(
            fill.get_foreground_color().unwrap().get_argb(),
            HEADER_FILL_ARGB
        );
    }

    #[test]
    fn numeric_style_right_aligns_with_format() {
        let mut style = Style::default();
        apply_numeric_style(&mut style, ColumnFormat::Decimal);
        assert_eq!(
            style.get_alignment().unwrap().get_horizontal(),
            &HorizontalAlignmentValues::Right
        );
        assert_eq!(
            style.get_number_format().unwrap().get_format_code(),
            DECIMAL_FORMAT
        );
    }
}
