//! Aggregates over a cleaned table.
//!
//! Every function is pure and reads typed cells as the pipeline leaves them.
//! A required column that is missing logs a warning and yields an empty
//! result rather than an error.

use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use crate::constants::{
    AGE, AMOUNT, APPLICATION_SIGNED, DAYS_TO_SUPPORT, GENDER, GRANT_REQ_DATE, INCOME_RANGE, INSURANCE_TYPE,
    PT_CITY, REMAINING_BALANCE,
};
use crate::domain::{Cell, Table};
use crate::pipeline::processing::derive::IncomeBracket;

fn require(table: &Table, column: &str, view: &str) -> Option<usize> {
    let idx = table.column_index(column);
    if idx.is_none() {
        warn!(column, view, "Column missing, view skipped");
    }
    idx
}

/// Add to a running total, saturating at the `Decimal` bounds instead of
/// panicking on overflow
fn add_amount(total: Decimal, value: Decimal, view: &str) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        warn!(view, %total, %value, "Amount total overflowed, saturating");
        if value.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

fn mean(sum: Decimal, count: usize) -> Option<Decimal> {
    (count > 0).then(|| (sum / Decimal::from(count as u64)).round_dp(2))
}

/// Applications whose `Application Signed?` field is "Yes"
pub fn review_queue(table: &Table) -> Table {
    let Some(idx) = require(table, APPLICATION_SIGNED, "review_queue") else {
        return Table::new(table.columns.clone(), Vec::new());
    };
    let rows = table
        .rows
        .iter()
        .filter(|r| {
            r.cells[idx]
                .as_text()
                .is_some_and(|s| s.trim().eq_ignore_ascii_case("yes"))
        })
        .cloned()
        .collect();
    Table::new(table.columns.clone(), rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupTotal {
    pub group: String,
    /// Sum of `Amount`; absent amounts count as zero
    pub total: Decimal,
    pub applications: usize,
}

/// Total support per distinct value of `column`, ordered by group.
/// Income ranges follow bracket order instead of label order.
/// Rows with an absent group value are left out.
pub fn support_by(table: &Table, column: &str) -> Vec<GroupTotal> {
    let (Some(group_idx), Some(amount_idx)) = (
        require(table, column, "support_by"),
        require(table, AMOUNT, "support_by"),
    ) else {
        return Vec::new();
    };

    let mut groups: BTreeMap<String, (Decimal, usize)> = BTreeMap::new();
    for row in &table.rows {
        let key = &row.cells[group_idx];
        if key.is_absent() {
            continue;
        }
        let entry = groups.entry(key.render()).or_default();
        entry.0 = add_amount(entry.0, row.cells[amount_idx].as_amount().unwrap_or_default(), "support_by");
        entry.1 += 1;
    }

    let mut totals: Vec<GroupTotal> = groups
        .into_iter()
        .map(|(group, (total, applications))| GroupTotal {
            group,
            total,
            applications,
        })
        .collect();
    if column == INCOME_RANGE {
        totals.sort_by_key(|g| IncomeBracket::from_label(&g.group));
    }
    totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum AgeBucket {
    Under18,
    From18To34,
    From35To49,
    From50To64,
    Over65,
}

impl AgeBucket {
    pub fn from_age(age: i64) -> Self {
        match age {
            i64::MIN..=17 => AgeBucket::Under18,
            18..=34 => AgeBucket::From18To34,
            35..=49 => AgeBucket::From35To49,
            50..=64 => AgeBucket::From50To64,
            _ => AgeBucket::Over65,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgeBucket::Under18 => "Under 18",
            AgeBucket::From18To34 => "18-34",
            AgeBucket::From35To49 => "35-49",
            AgeBucket::From50To64 => "50-64",
            AgeBucket::Over65 => "65+",
        }
    }
}

/// Total support per age bucket, youngest first. Rows without an age are
/// left out; empty buckets are not listed.
pub fn support_by_age_bucket(table: &Table) -> Vec<GroupTotal> {
    let (Some(age_idx), Some(amount_idx)) = (
        require(table, AGE, "support_by_age_bucket"),
        require(table, AMOUNT, "support_by_age_bucket"),
    ) else {
        return Vec::new();
    };

    let mut buckets: BTreeMap<AgeBucket, (Decimal, usize)> = BTreeMap::new();
    for row in &table.rows {
        let Some(age) = row.cells[age_idx].as_integer() else {
            continue;
        };
        let entry = buckets.entry(AgeBucket::from_age(age)).or_default();
        entry.0 = add_amount(
            entry.0,
            row.cells[amount_idx].as_amount().unwrap_or_default(),
            "support_by_age_bucket",
        );
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(bucket, (total, applications))| GroupTotal {
            group: bucket.label().to_string(),
            total,
            applications,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTurnaround {
    pub year: i32,
    pub month: u32,
    pub mean_days: f64,
    /// Rows with both a request date and a turnaround
    pub applications: usize,
}

/// Mean `Days to Support` per request month, in calendar order
pub fn turnaround_by_month(table: &Table) -> Vec<MonthlyTurnaround> {
    let (Some(req_idx), Some(days_idx)) = (
        require(table, GRANT_REQ_DATE, "turnaround_by_month"),
        require(table, DAYS_TO_SUPPORT, "turnaround_by_month"),
    ) else {
        return Vec::new();
    };

    let mut months: BTreeMap<(i32, u32), (i64, usize)> = BTreeMap::new();
    for row in &table.rows {
        let (Some(date), Some(days)) = (row.cells[req_idx].as_date(), row.cells[days_idx].as_integer()) else {
            continue;
        };
        let entry = months.entry((date.year(), date.month())).or_default();
        entry.0 = entry.0.saturating_add(days);
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|((year, month), (sum, n))| MonthlyTurnaround {
            year,
            month,
            mean_days: sum as f64 / n as f64,
            applications: n,
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnusedGrants {
    /// Grants with a positive remaining balance
    pub count: usize,
    /// Rows having both an amount and a remaining balance
    pub considered: usize,
    pub percent: f64,
    pub average_remaining: Option<Decimal>,
}

pub fn unused_grants(table: &Table) -> UnusedGrants {
    let (Some(amount_idx), Some(balance_idx)) = (
        require(table, AMOUNT, "unused_grants"),
        require(table, REMAINING_BALANCE, "unused_grants"),
    ) else {
        return UnusedGrants::default();
    };

    let mut considered = 0;
    let mut count = 0;
    let mut remaining = Decimal::ZERO;
    for row in &table.rows {
        let (Some(_), Some(balance)) = (row.cells[amount_idx].as_amount(), row.cells[balance_idx].as_amount()) else {
            continue;
        };
        considered += 1;
        if balance > Decimal::ZERO {
            count += 1;
            remaining = add_amount(remaining, balance, "unused_grants");
        }
    }

    UnusedGrants {
        count,
        considered,
        percent: if considered > 0 {
            count as f64 / considered as f64 * 100.0
        } else {
            0.0
        },
        average_remaining: mean(remaining, count),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    /// `None` for absent values
    pub label: Option<String>,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub total_applications: usize,
    pub total_distributed: Decimal,
    pub average_award: Option<Decimal>,
    pub average_days_to_support: Option<f64>,
    pub cities_served: usize,
    /// Most frequent first, absent included
    pub gender_counts: Vec<LabelCount>,
    pub top_cities: Vec<LabelCount>,
}

const TOP_CITIES: usize = 5;

fn value_counts<'a>(cells: impl Iterator<Item = &'a Cell>, include_absent: bool) -> Vec<LabelCount> {
    let mut counts: HashMap<Option<String>, usize> = HashMap::new();
    for cell in cells {
        let label = (!cell.is_absent()).then(|| cell.render());
        if label.is_none() && !include_absent {
            continue;
        }
        *counts.entry(label).or_default() += 1;
    }
    let mut out: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount { label, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}

/// Headline figures for the whole table
pub fn impact_summary(table: &Table) -> ImpactSummary {
    let mut summary = ImpactSummary {
        total_applications: table.len(),
        ..Default::default()
    };

    if let Some(amounts) = require(table, AMOUNT, "impact_summary").and_then(|_| table.column(AMOUNT)) {
        let (sum, n) = amounts
            .filter_map(Cell::as_amount)
            .fold((Decimal::ZERO, 0usize), |(s, n), v| (add_amount(s, v, "impact_summary"), n + 1));
        summary.total_distributed = sum;
        summary.average_award = mean(sum, n);
    }

    if let Some(days) = require(table, DAYS_TO_SUPPORT, "impact_summary").and_then(|_| table.column(DAYS_TO_SUPPORT)) {
        let (sum, n) = days
            .filter_map(Cell::as_integer)
            .fold((0i64, 0usize), |(s, n), v| (s.saturating_add(v), n + 1));
        summary.average_days_to_support = (n > 0).then(|| sum as f64 / n as f64);
    }

    if let Some(cities) = require(table, PT_CITY, "impact_summary").and_then(|_| table.column(PT_CITY)) {
        let counts = value_counts(cities, false);
        summary.cities_served = counts.len();
        summary.top_cities = counts.into_iter().take(TOP_CITIES).collect();
    }

    if let Some(genders) = require(table, GENDER, "impact_summary").and_then(|_| table.column(GENDER)) {
        summary.gender_counts = value_counts(genders, true);
    }

    summary
}

/// Every view in one serializable bundle, for `report --json`
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub review_queue_size: usize,
    pub support_by_gender: Vec<GroupTotal>,
    pub support_by_insurance: Vec<GroupTotal>,
    pub support_by_city: Vec<GroupTotal>,
    pub support_by_income_range: Vec<GroupTotal>,
    pub support_by_age_bucket: Vec<GroupTotal>,
    pub turnaround_by_month: Vec<MonthlyTurnaround>,
    pub unused_grants: UnusedGrants,
    pub impact: ImpactSummary,
}

impl Report {
    pub fn build(table: &Table) -> Self {
        Self {
            review_queue_size: review_queue(table).len(),
            support_by_gender: support_by(table, GENDER),
            support_by_insurance: support_by(table, INSURANCE_TYPE),
            support_by_city: support_by(table, PT_CITY),
            support_by_income_range: support_by(table, INCOME_RANGE),
            support_by_age_bucket: support_by_age_bucket(table),
            turnaround_by_month: turnaround_by_month(table),
            unused_grants: unused_grants(table),
            impact: impact_summary(table),
        }
    }
}
