use chrono::{NaiveDate, NaiveDateTime};

use super::{Stage, StageOutput, StageStats};
use crate::constants::{DOB, GRANT_REQ_DATE, PAYMENT_SUBMITTED};
use crate::domain::{Cell, PaymentStatus, Table};
use crate::error::Result;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    // two-digit years first: %Y would read "24" as year 24
    "%m/%d/%y",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse a calendar date from the formats seen in manual data entry.
/// Date-time values keep only their date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Resolve the ternary payment field: "Yes", "No", or a submission date.
/// Returns `None` for text that is none of these.
pub fn parse_payment(raw: &str) -> Option<PaymentStatus> {
    let s = raw.trim();
    if s.eq_ignore_ascii_case("yes") {
        Some(PaymentStatus::Confirmed)
    } else if s.eq_ignore_ascii_case("no") {
        Some(PaymentStatus::NotSubmitted)
    } else {
        parse_date(s).map(PaymentStatus::SubmittedOn)
    }
}

/// Coerce a cell to a date; the flag marks text that failed to parse
pub fn coerce_date(cell: &Cell) -> (Cell, bool) {
    match cell {
        Cell::Date(_) | Cell::Absent => (cell.clone(), false),
        Cell::Payment(PaymentStatus::SubmittedOn(d)) => (Cell::Date(*d), false),
        Cell::Text(raw) => match parse_date(raw) {
            Some(d) => (Cell::Date(d), false),
            None => (Cell::Absent, true),
        },
        _ => (Cell::Absent, true),
    }
}

/// Coerce a cell to a payment status. Absent stays absent: downstream it
/// reads as "not yet submitted".
pub fn coerce_payment(cell: &Cell) -> (Cell, bool) {
    match cell {
        Cell::Payment(_) | Cell::Absent => (cell.clone(), false),
        Cell::Date(d) => (Cell::Payment(PaymentStatus::SubmittedOn(*d)), false),
        Cell::Text(raw) => match parse_payment(raw) {
            Some(status) => (Cell::Payment(status), false),
            None => (Cell::Absent, true),
        },
        _ => (Cell::Absent, true),
    }
}

/// Parses request dates, birth dates and the payment status field
pub struct TemporalNormalizer {
    date_columns: Vec<String>,
    payment_column: String,
}

impl TemporalNormalizer {
    pub fn new(date_columns: Vec<String>, payment_column: &str) -> Self {
        Self {
            date_columns,
            payment_column: payment_column.to_string(),
        }
    }
}

impl Default for TemporalNormalizer {
    fn default() -> Self {
        Self::new(
            vec![GRANT_REQ_DATE.to_string(), DOB.to_string()],
            PAYMENT_SUBMITTED,
        )
    }
}

impl Stage for TemporalNormalizer {
    fn name(&self) -> &'static str {
        "temporal"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        let jobs = self
            .date_columns
            .iter()
            .map(|c| (c.as_str(), coerce_date as fn(&Cell) -> (Cell, bool)))
            .chain(std::iter::once((
                self.payment_column.as_str(),
                coerce_payment as fn(&Cell) -> (Cell, bool),
            )));

        for (column, coerce) in jobs {
            let mut failures = 0;
            let mapped = table.map_column(column, |cell| {
                let (next, failed) = coerce(cell);
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
