//! Bilingual column vocabulary and glucose unit handling.
//!
//! The canonical vocabulary is English. German headers are translated by
//! substring lookup against [`COLUMN_MAPPINGS`]; English headers pass through
//! untouched.

use crate::model::{GlucoseUnit, Language};

/// mg/dL per mmol/L.
pub const MGDL_PER_MMOLL: f64 = 18.0182;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMapping {
    pub key: &'static str,
    /// Lower-case variants, the first one is the canonical header text.
    pub english: &'static [&'static str],
    pub german: &'static [&'static str],
}

impl ColumnMapping {
    pub fn canonical_header(&self) -> &'static str {
        self.english[0]
    }
}

/// Lookup order matters: the first mapping whose German variant is contained
/// in a header wins.
pub static COLUMN_MAPPINGS: &[ColumnMapping] = &[
    ColumnMapping {
        key: "timestamp",
        english: &["timestamp", "date", "time"],
        german: &["zeitstempel", "datum", "uhrzeit"],
    },
    ColumnMapping {
        key: "glucoseValue",
        english: &["glucose value", "glucose", "bg"],
        german: &["glukosewert", "glukose", "blutzucker"],
    },
    ColumnMapping {
        key: "insulinType",
        english: &["insulin type"],
        german: &["insulin-typ", "insulintyp"],
    },
    ColumnMapping {
        key: "dose",
        english: &["dose", "insulin delivered"],
        german: &["dosis", "abgegebenes insulin"],
    },
    ColumnMapping {
        key: "basalRate",
        english: &["basal rate", "rate"],
        german: &["basalrate", "basal-rate", "rate"],
    },
    ColumnMapping {
        key: "duration",
        english: &["duration"],
        german: &["dauer"],
    },
    ColumnMapping {
        key: "totalBolus",
        english: &["total bolus"],
        german: &["bolus gesamt", "gesamtbolus"],
    },
    ColumnMapping {
        key: "totalBasal",
        english: &["total basal"],
        german: &["basal gesamt", "gesamtbasal"],
    },
    ColumnMapping {
        key: "totalInsulin",
        english: &["total insulin"],
        german: &["insulin gesamt", "gesamtinsulin"],
    },
    ColumnMapping {
        key: "bolusType",
        english: &["bolus type"],
        german: &["bolustyp", "bolus-typ"],
    },
    ColumnMapping {
        key: "carbs",
        english: &["carbs", "carbohydrates"],
        german: &["kohlenhydrate"],
    },
    ColumnMapping {
        key: "foodDescription",
        english: &["food description", "food", "meal"],
        german: &["essensbeschreibung", "nahrungsmittel", "lebensmittel", "mahlzeit"],
    },
    ColumnMapping {
        key: "protein",
        english: &["protein"],
        german: &["protein", "eiweiß", "eiweiss"],
    },
    ColumnMapping {
        key: "fat",
        english: &["fat"],
        german: &["fett"],
    },
    ColumnMapping {
        key: "activityType",
        english: &["activity type", "activity"],
        german: &["aktivitätstyp", "aktivität"],
    },
    ColumnMapping {
        key: "intensity",
        english: &["intensity"],
        german: &["intensität"],
    },
    ColumnMapping {
        key: "medicationName",
        english: &["medication name", "medication"],
        german: &["medikamentenname", "medikament"],
    },
    ColumnMapping {
        key: "dosage",
        english: &["dosage"],
        german: &["dosierung"],
    },
    ColumnMapping {
        key: "alarmEvent",
        english: &["alarm/event", "alarm", "event"],
        german: &["alarm/ereignis", "alarm", "ereignis"],
    },
    ColumnMapping {
        key: "serialNumber",
        english: &["serial number"],
        german: &["seriennummer"],
    },
    ColumnMapping {
        key: "device",
        english: &["device"],
        german: &["gerät", "geraet"],
    },
    ColumnMapping {
        key: "notes",
        english: &["notes", "note", "comment"],
        german: &["notizen", "notiz", "kommentar", "anmerkung"],
    },
];

/// Mapping a German header resolves to, if any.
pub fn mapping_for_german(header: &str) -> Option<&'static ColumnMapping> {
    let needle = header.trim().to_lowercase();
    COLUMN_MAPPINGS
        .iter()
        .find(|mapping| mapping.german.iter().any(|variant| needle.contains(variant)))
}

/// Canonical English header for `header`, or the header unchanged.
pub fn normalize_column_name(header: &str, language: Language) -> String {
    match language {
        Language::English => header.to_string(),
        Language::German => mapping_for_german(header)
            .map(|mapping| mapping.canonical_header().to_string())
            .unwrap_or_else(|| header.to_string()),
    }
}

pub fn normalize_headers<S: AsRef<str>>(headers: &[S], language: Language) -> Vec<String> {
    headers
        .iter()
        .map(|header| normalize_column_name(header.as_ref(), language))
        .collect()
}

/// Unit named in the first parenthesised fragment of a header.
pub fn extract_unit(header: &str) -> Option<GlucoseUnit> {
    let open = header.find('(')?;
    let close = open + header[open..].find(')')?;
    let unit = header[open + 1..close].to_lowercase();
    if unit.contains("mg") && unit.contains("dl") {
        Some(GlucoseUnit::MgDl)
    } else if unit.contains("mmol") {
        Some(GlucoseUnit::MmolL)
    } else {
        None
    }
}

/// Index of the first header containing any candidate, case-insensitively.
pub fn find_column_index<S: AsRef<str>>(headers: &[S], candidates: &[&str]) -> Option<usize> {
    let candidates: Vec<String> = candidates.iter().map(|c| c.to_lowercase()).collect();
    headers.iter().position(|header| {
        let header = header.as_ref().to_lowercase();
        candidates
            .iter()
            .any(|candidate| header.contains(candidate.as_str()))
    })
}

/// Glucose unit of the first glucose column that names one.
pub fn glucose_unit<S: AsRef<str>>(headers: &[S]) -> Option<GlucoseUnit> {
    let index = find_column_index(headers, &["glucose", "glukose", "bg "])?;
    extract_unit(headers[index].as_ref())
}

pub fn convert_glucose(value: f64, from: GlucoseUnit, to: GlucoseUnit) -> f64 {
    match (from, to) {
        (GlucoseUnit::MmolL, GlucoseUnit::MgDl) => value * MGDL_PER_MMOLL,
        (GlucoseUnit::MgDl, GlucoseUnit::MmolL) => value / MGDL_PER_MMOLL,
        _ => value,
    }
}
