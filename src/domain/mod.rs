use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Raw rows as read from the source file, before any cleaning
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names exactly as the file claims them (possibly padded)
    pub headers: Vec<String>,
    /// Each data row, one string per field
    pub rows: Vec<Vec<String>>,
}

/// Three-way encoding of the `Payment Submitted?` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "date", rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Submitted with a fixed 1-day turnaround ("Yes")
    Confirmed,
    /// Not yet submitted ("No")
    NotSubmitted,
    /// Submitted on a known date
    SubmittedOn(NaiveDate),
}

/// A single typed value in the table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Absent,
    Text(String),
    Amount(Decimal),
    Date(NaiveDate),
    Payment(PaymentStatus),
    Integer(i64),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Cell::Absent)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            Cell::Amount(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_payment(&self) -> Option<PaymentStatus> {
        match self {
            Cell::Payment(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Cell::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form written to the persisted CSV. Chosen so that every rendering
    /// parses back to the same cell when the file is cleaned again.
    pub fn render(&self) -> String {
        match self {
            Cell::Absent => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Amount(d) => d.normalize().to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Payment(PaymentStatus::Confirmed) => "Yes".to_string(),
            Cell::Payment(PaymentStatus::NotSubmitted) => "No".to_string(),
            Cell::Payment(PaymentStatus::SubmittedOn(d)) => d.format("%Y-%m-%d").to_string(),
            Cell::Integer(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// One row of the table, positional by column index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub cells: Vec<Cell>,
}

/// An ordered sequence of records sharing one column set
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    /// Build a text-only table from raw rows. Short rows are padded with
    /// `Absent`, long rows are truncated to the header width.
    pub fn from_raw(raw: RawTable) -> Self {
        let width = raw.headers.len();
        let rows = raw
            .rows
            .into_iter()
            .enumerate()
            .map(|(i, fields)| {
                if fields.len() > width {
                    tracing::warn!(row = i, fields = fields.len(), width, "Row wider than header, extra fields dropped");
                }
                let mut cells: Vec<Cell> = fields.into_iter().take(width).map(Cell::Text).collect();
                cells.resize(width, Cell::Absent);
                Record { cells }
            })
            .collect();

        Self {
            columns: raw.headers,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `row` for the named column, `None` if the column is missing
    pub fn cell(&self, row: usize, name: &str) -> Option<&Cell> {
        let idx = self.column_index(name)?;
        self.rows.get(row).and_then(|r| r.cells.get(idx))
    }

    /// Iterate one column's cells, `None` if the column is missing
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Cell> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r.cells[idx]))
    }

    /// Return a copy of the table with `f` applied to every cell of the named
    /// column, plus the number of cells whose value changed. `None` when the
    /// column is missing.
    pub fn map_column<F>(&self, name: &str, mut f: F) -> Option<(Table, usize)>
    where
        F: FnMut(&Cell) -> Cell,
    {
        let idx = self.column_index(name)?;
        let mut changed = 0;
        let mut out = self.clone();
        for row in &mut out.rows {
            let next = f(&row.cells[idx]);
            if next != row.cells[idx] {
                changed += 1;
                row.cells[idx] = next;
            }
        }
        Some((out, changed))
    }

    /// Replace the named column, or append it when it does not exist yet
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.cells[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.cells.push(cell);
                }
            }
        }
    }

    /// Copy of the table without the columns at `indices`
    pub fn without_columns(&self, indices: &[usize]) -> Table {
        let keep = |i: &usize| !indices.contains(i);
        let columns = self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(i))
            .map(|(_, c)| c.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| Record {
                cells: r
                    .cells
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| keep(i))
                    .map(|(_, c)| c.clone())
                    .collect(),
            })
            .collect();
        Table { columns, rows }
    }

    /// Rows rendered to text, in column order
    pub fn rendered_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows
            .iter()
            .map(|r| r.cells.iter().map(Cell::render).collect())
    }

    /// SHA-256 over the rendered header and rows
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.columns.join("\u{1f}").as_bytes());
        for row in self.rendered_rows() {
            hasher.update(b"\x1e");
            hasher.update(row.join("\u{1f}").as_bytes());
        }
        hex::encode(hasher.finalize())
    }
}
