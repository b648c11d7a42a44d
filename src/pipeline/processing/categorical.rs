use super::corrections::{CorrectionTable, Corrections};
use super::{Stage, StageOutput, StageStats};
use crate::constants::{GENDER, INSURANCE_TYPE, PT_CITY, UNKNOWN_INSURANCE};
use crate::domain::{Cell, Table};
use crate::error::Result;

/// Title-case the way spreadsheet tools do it: a letter is upper-cased when
/// it follows a non-letter, lower-cased otherwise.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Trim, lower-case and map through the gender table. Unmapped values pass
/// through unchanged.
pub fn normalize_gender(cell: &Cell, table: &CorrectionTable) -> Cell {
    match cell {
        Cell::Text(raw) => {
            let key = raw.trim().to_lowercase();
            match table.lookup(&key) {
                Some(label) => Cell::text(label),
                None => cell.clone(),
            }
        }
        other => other.clone(),
    }
}

/// Trim, title-case and correct. Absent becomes the visible `Unknown` label.
pub fn normalize_insurance(cell: &Cell, table: &CorrectionTable) -> Cell {
    match cell {
        Cell::Text(raw) => match canonical_text(raw, table) {
            Some(label) => Cell::Text(label),
            None => Cell::text(UNKNOWN_INSURANCE),
        },
        Cell::Absent => Cell::text(UNKNOWN_INSURANCE),
        other => other.clone(),
    }
}

/// Trim, title-case and correct. Absent stays absent.
pub fn normalize_city(cell: &Cell, table: &CorrectionTable) -> Cell {
    match cell {
        Cell::Text(raw) => canonical_text(raw, table).map(Cell::Text).unwrap_or(Cell::Absent),
        other => other.clone(),
    }
}

fn canonical_text(raw: &str, table: &CorrectionTable) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    // canonical labels are fixed points, whatever their casing
    if table.is_canonical(trimmed) {
        return Some(trimmed.to_string());
    }
    let cased = title_case(trimmed);
    Some(table.lookup(&cased).map(str::to_string).unwrap_or(cased))
}

/// Canonicalizes the gender, insurance type and city columns
pub struct CategoricalNormalizer {
    corrections: Corrections,
}

impl CategoricalNormalizer {
    pub fn new(corrections: Corrections) -> Self {
        Self { corrections }
    }
}

impl Default for CategoricalNormalizer {
    fn default() -> Self {
        Self::new(Corrections::default())
    }
}

impl Stage for CategoricalNormalizer {
    fn name(&self) -> &'static str {
        "categorical"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        let columns: [(&str, fn(&Cell, &CorrectionTable) -> Cell, &CorrectionTable); 3] = [
            (GENDER, normalize_gender, &self.corrections.gender),
            (INSURANCE_TYPE, normalize_insurance, &self.corrections.insurance),
            (PT_CITY, normalize_city, &self.corrections.city),
        ];

        for (column, normalize, corrections) in columns {
            match table.map_column(column, |cell| normalize(cell, corrections)) {
                Some((next, changed)) => {
                    table = next;
                    stats.cells_changed += changed;
                }
                None => stats.note(format!("column '{}' not present, skipped", column)),
            }
        }

        Ok(StageOutput { table, stats })
    }
}
