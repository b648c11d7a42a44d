use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::numeric::parse_amount;
use super::temporal::{parse_date, parse_payment};
use super::{Stage, StageOutput, StageStats};
use crate::constants::{
    AGE, DAYS_TO_SUPPORT, DOB, GRANT_REQ_DATE, INCOME_RANGE, MISSING_BRACKET, MONTHLY_INCOME,
    PAYMENT_SUBMITTED,
};
use crate::domain::{Cell, PaymentStatus, Table};
use crate::error::Result;

/// Why a turnaround could not be computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turnaround {
    Days(i64),
    /// Payment absent, unparseable or not yet submitted
    NotSubmitted,
    /// Submission date known but the request date is absent
    MissingRequestDate,
    /// Submission dated before the request
    OutOfOrder,
}

impl Turnaround {
    pub fn days(self) -> Option<i64> {
        match self {
            Turnaround::Days(d) => Some(d),
            _ => None,
        }
    }
}

/// Days from grant request to support payment. A confirmed ("Yes") payment
/// is always one day, even without a request date.
pub fn turnaround(payment: Option<PaymentStatus>, requested: Option<NaiveDate>) -> Turnaround {
    match payment {
        None | Some(PaymentStatus::NotSubmitted) => Turnaround::NotSubmitted,
        Some(PaymentStatus::Confirmed) => Turnaround::Days(1),
        Some(PaymentStatus::SubmittedOn(paid)) => match requested {
            None => Turnaround::MissingRequestDate,
            Some(req) => {
                let days = (paid - req).num_days();
                if days < 0 {
                    Turnaround::OutOfOrder
                } else {
                    Turnaround::Days(days)
                }
            }
        },
    }
}

pub fn days_to_support(payment: Option<PaymentStatus>, requested: Option<NaiveDate>) -> Option<i64> {
    turnaround(payment, requested).days()
}

/// Whole years between `dob` and `as_of`, counted as floor(days / 365).
/// Birth dates after `as_of` give `None`.
pub fn age_years(dob: NaiveDate, as_of: NaiveDate) -> Option<i64> {
    let days = (as_of - dob).num_days();
    if days < 0 {
        None
    } else {
        Some(days / 365)
    }
}

/// Monthly household income brackets, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum IncomeBracket {
    Under2000,
    From2000,
    From4000,
    From6000,
    From8000,
    Missing,
}

impl IncomeBracket {
    pub const ALL: [IncomeBracket; 6] = [
        IncomeBracket::Under2000,
        IncomeBracket::From2000,
        IncomeBracket::From4000,
        IncomeBracket::From6000,
        IncomeBracket::From8000,
        IncomeBracket::Missing,
    ];

    /// Bin into half-open intervals [0,2000), [2000,4000), ... [8000,inf).
    /// Absent or negative income is `Missing`.
    pub fn from_income(income: Option<Decimal>) -> Self {
        let Some(value) = income else {
            return IncomeBracket::Missing;
        };
        if value < Decimal::ZERO {
            IncomeBracket::Missing
        } else if value < Decimal::from(2000) {
            IncomeBracket::Under2000
        } else if value < Decimal::from(4000) {
            IncomeBracket::From2000
        } else if value < Decimal::from(6000) {
            IncomeBracket::From4000
        } else if value < Decimal::from(8000) {
            IncomeBracket::From6000
        } else {
            IncomeBracket::From8000
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            IncomeBracket::Under2000 => "< $2,000",
            IncomeBracket::From2000 => "$2,000–3,999",
            IncomeBracket::From4000 => "$4,000–5,999",
            IncomeBracket::From6000 => "$6,000–7,999",
            IncomeBracket::From8000 => "$8,000+",
            IncomeBracket::Missing => MISSING_BRACKET,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|b| b.label() == label)
    }
}

fn payment_of(cell: &Cell) -> Option<PaymentStatus> {
    match cell {
        Cell::Payment(p) => Some(*p),
        Cell::Text(raw) => parse_payment(raw),
        Cell::Date(d) => Some(PaymentStatus::SubmittedOn(*d)),
        _ => None,
    }
}

fn date_of(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Text(raw) => parse_date(raw),
        _ => None,
    }
}

fn amount_of(cell: &Cell) -> Option<Decimal> {
    match cell {
        Cell::Amount(d) => Some(*d),
        Cell::Integer(n) => Some(Decimal::from(*n)),
        Cell::Text(raw) => parse_amount(raw),
        _ => None,
    }
}

/// Computes turnaround days, age and income bracket. Each derived value
/// depends only on cells of its own row.
pub struct DerivedFieldCalculator {
    as_of: NaiveDate,
}

impl DerivedFieldCalculator {
    pub fn new(as_of: NaiveDate) -> Self {
        Self { as_of }
    }

    fn derive_days_to_support(&self, table: &mut Table, stats: &mut StageStats) {
        let Some(pay_idx) = table.column_index(PAYMENT_SUBMITTED) else {
            stats.note(format!("column '{}' not present, '{}' not derived", PAYMENT_SUBMITTED, DAYS_TO_SUPPORT));
            return;
        };
        let req_idx = table.column_index(GRANT_REQ_DATE);
        if req_idx.is_none() {
            stats.note(format!("column '{}' not present, only confirmed payments get a turnaround", GRANT_REQ_DATE));
        }

        let mut out_of_order = 0;
        let cells: Vec<Cell> = table
            .rows
            .iter()
            .map(|row| {
                let payment = payment_of(&row.cells[pay_idx]);
                let requested = req_idx.and_then(|i| date_of(&row.cells[i]));
                match turnaround(payment, requested) {
                    Turnaround::Days(d) => Cell::Integer(d),
                    Turnaround::OutOfOrder => {
                        out_of_order += 1;
                        Cell::Absent
                    }
                    _ => Cell::Absent,
                }
            })
            .collect();

        if out_of_order > 0 {
            debug!(out_of_order, "Submissions dated before their request");
            stats.note(format!("{} submissions dated before request, turnaround left absent", out_of_order));
        }
        stats.cells_changed += count_changes(table, DAYS_TO_SUPPORT, &cells);
        table.set_column(DAYS_TO_SUPPORT, cells);
    }

    fn derive_age(&self, table: &mut Table, stats: &mut StageStats) {
        let Some(dob_idx) = table.column_index(DOB) else {
            stats.note(format!("column '{}' not present, '{}' not derived", DOB, AGE));
            return;
        };

        let cells: Vec<Cell> = table
            .rows
            .iter()
            .map(|row| match date_of(&row.cells[dob_idx]) {
                Some(dob) => match age_years(dob, self.as_of) {
                    Some(age) => Cell::Integer(age),
                    None => {
                        stats.parse_failures += 1;
                        Cell::Absent
                    }
                },
                None => Cell::Absent,
            })
            .collect();

        stats.cells_changed += count_changes(table, AGE, &cells);
        table.set_column(AGE, cells);
    }

    fn derive_income_range(&self, table: &mut Table, stats: &mut StageStats) {
        let Some(income_idx) = table.column_index(MONTHLY_INCOME) else {
            stats.note(format!("column '{}' not present, '{}' not derived", MONTHLY_INCOME, INCOME_RANGE));
            return;
        };

        let cells: Vec<Cell> = table
            .rows
            .iter()
            .map(|row| {
                let income = amount_of(&row.cells[income_idx]);
                if matches!(income, Some(v) if v < Decimal::ZERO) {
                    stats.parse_failures += 1;
                }
                Cell::text(IncomeBracket::from_income(income).label())
            })
            .collect();

        stats.cells_changed += count_changes(table, INCOME_RANGE, &cells);
        table.set_column(INCOME_RANGE, cells);
    }
}

fn count_changes(table: &Table, column: &str, next: &[Cell]) -> usize {
    match table.column(column) {
        Some(current) => current.zip(next).filter(|(a, b)| a != b).count(),
        None => next.len(),
    }
}

impl Stage for DerivedFieldCalculator {
    fn name(&self) -> &'static str {
        "derive"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        self.derive_days_to_support(&mut table, &mut stats);
        self.derive_age(&mut table, &mut stats);
        self.derive_income_range(&mut table, &mut stats);

        Ok(StageOutput { table, stats })
    }
}
