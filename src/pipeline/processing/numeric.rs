use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::{Stage, StageOutput, StageStats};
use crate::constants;
use crate::domain::{Cell, Table};
use crate::error::Result;

static CURRENCY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$,]").expect("currency pattern compiles"));

/// Commas are only accepted as thousands separators in the integer part
static THOUSANDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+$]*\d{1,3}(,\d{3})+(\.\d+)?$").expect("thousands pattern compiles"));

/// Trim, strip `$` and thousands separators, then parse as a decimal.
/// Whitespace or `_` left inside the number makes it unparseable.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.contains(',') && !THOUSANDS.is_match(trimmed) {
        return None;
    }
    let cleaned = CURRENCY_NOISE.replace_all(trimmed, "");
    if cleaned.is_empty() || cleaned.chars().any(|c| c.is_whitespace() || c == '_') {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// Coerce a cell to an amount. The flag is true when text was present but
/// could not be parsed.
pub fn coerce_amount(cell: &Cell) -> (Cell, bool) {
    match cell {
        Cell::Amount(_) => (cell.clone(), false),
        Cell::Integer(n) => (Cell::Amount(Decimal::from(*n)), false),
        Cell::Text(raw) => match parse_amount(raw) {
            Some(d) => (Cell::Amount(d), false),
            None => (Cell::Absent, true),
        },
        Cell::Absent => (Cell::Absent, false),
        Cell::Date(_) | Cell::Payment(_) => (Cell::Absent, true),
    }
}

/// Coerces currency-formatted columns to decimals
pub struct NumericNormalizer {
    columns: Vec<String>,
}

impl NumericNormalizer {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl Default for NumericNormalizer {
    fn default() -> Self {
        Self::new(
            constants::amount_columns()
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

impl Stage for NumericNormalizer {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        for column in &self.columns {
            let mut failures = 0;
            let mapped = table.map_column(column, |cell| {
                let (next, failed) = coerce_amount(cell);
                if failed {
                    failures += 1;
                }
                next
            });
            match mapped {
                Some((next, changed)) => {
                    table = next;
                    stats.cells_changed += changed;
                    stats.parse_failures += failures;
                }
                None => stats.note(format!("column '{}' not present, skipped", column)),
            }
        }

        Ok(StageOutput { table, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawTable;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn strips_currency_formatting() {
        assert_eq!(parse_amount("$1,200.50"), Some(dec("1200.50")));
        assert_eq!(parse_amount(" 300 "), Some(dec("300")));
        assert_eq!(parse_amount("-$45.10"), Some(dec("-45.10")));
        assert_eq!(parse_amount("$1,000,000"), Some(dec("1000000")));
        assert_eq!(parse_amount("1.5e3"), Some(dec("1500")));
    }

    #[test]
    fn unparseable_text_is_absent() {
        assert_eq!(parse_amount("Pending"), None);
        assert_eq!(parse_amount("$"), None);
        assert_eq!(parse_amount("12 dollars"), None);
        assert_eq!(parse_amount("$ 1,000,000"), None);
        assert_eq!(coerce_amount(&Cell::text("n/a")), (Cell::Absent, true));
        assert_eq!(coerce_amount(&Cell::Absent), (Cell::Absent, false));
    }

    #[test]
    fn loose_digit_grouping_is_rejected() {
        assert_eq!(parse_amount("1 2 0 0"), None);
        assert_eq!(parse_amount("$1,2,0,0"), None);
        assert_eq!(parse_amount("1_000"), None);
        assert_eq!(parse_amount("12,34.5"), None);
        assert_eq!(coerce_amount(&Cell::text("1 2 0 0")), (Cell::Absent, true));
    }

    #[test]
    fn stage_coerces_configured_columns_and_counts_failures() {
        let input = Table::from_raw(RawTable {
            headers: vec!["Amount".into(), "Remaining Balance".into(), "Pt City".into()],
            rows: vec![
                vec!["$1,200.50".into(), "0".into(), "$5".into()],
                vec!["Pending".into(), "$12.00".into(), "Omaha".into()],
            ],
        });
        let out = NumericNormalizer::default().apply(&input).unwrap();
        let table = &out.table;
        assert_eq!(table.cell(0, "Amount"), Some(&Cell::Amount(dec("1200.50"))));
        assert_eq!(table.cell(1, "Amount"), Some(&Cell::Absent));
        assert_eq!(table.cell(1, "Remaining Balance"), Some(&Cell::Amount(dec("12"))));
        // untouched column keeps its text
        assert_eq!(table.cell(0, "Pt City"), Some(&Cell::text("$5")));
        assert_eq!(out.stats.parse_failures, 1);
        // income column is missing from this table
        assert_eq!(out.stats.notes.len(), 1);
    }

    #[test]
    fn already_numeric_cells_are_stable() {
        let (once, _) = coerce_amount(&Cell::text("$1,200.50"));
        let (twice, failed) = coerce_amount(&once);
        assert_eq!(once, twice);
        assert!(!failed);
        let reparsed = coerce_amount(&Cell::text(once.render())).0;
        assert_eq!(reparsed, once);
    }
}
