use tracing::debug;

use super::{Stage, StageOutput, StageStats};
use crate::config::SchemaConfig;
use crate::domain::{Cell, Table};
use crate::error::Result;

/// Trims column names and removes known junk columns left behind by the
/// source spreadsheet.
pub struct SchemaNormalizer {
    junk_columns: Vec<String>,
    drop_empty_unnamed: bool,
}

impl SchemaNormalizer {
    pub fn new(config: &SchemaConfig) -> Self {
        Self {
            junk_columns: config.junk_columns.iter().map(|c| c.trim().to_string()).collect(),
            drop_empty_unnamed: config.drop_empty_unnamed,
        }
    }

    /// A blank header at position N matches a `Unnamed: N` entry
    fn is_denied(&self, idx: usize, name: &str) -> bool {
        self.junk_columns.iter().any(|j| j == name)
            || (name.is_empty() && self.junk_columns.contains(&format!("Unnamed: {}", idx)))
    }

    fn is_unnamed(name: &str) -> bool {
        name.is_empty() || name.starts_with("Unnamed:")
    }

    fn is_all_empty(table: &Table, idx: usize) -> bool {
        table.rows.iter().all(|r| match &r.cells[idx] {
            Cell::Absent => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        })
    }
}

impl Default for SchemaNormalizer {
    fn default() -> Self {
        Self::new(&SchemaConfig::default())
    }
}

impl Stage for SchemaNormalizer {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        for column in &mut table.columns {
            let trimmed = column.trim();
            if trimmed.len() != column.len() {
                *column = trimmed.to_string();
                stats.cells_changed += 1;
            }
        }

        let drop: Vec<usize> = table
            .columns
            .iter()
            .enumerate()
            .filter(|(idx, name)| {
                self.is_denied(*idx, name)
                    || (self.drop_empty_unnamed
                        && Self::is_unnamed(name)
                        && Self::is_all_empty(&table, *idx))
            })
            .map(|(idx, _)| idx)
            .collect();

        for idx in &drop {
            debug!(column = %table.columns[*idx], "Dropping junk column");
            stats.note(format!("dropped column '{}'", table.columns[*idx]));
        }

        let table = if drop.is_empty() {
            table
        } else {
            table.without_columns(&drop)
        };

        Ok(StageOutput { table, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RawTable;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_raw(RawTable {
            headers: headers.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|r| r.iter().map(|s| s.to_string()).collect()).collect(),
        })
    }

    #[test]
    fn trims_padded_column_names() {
        let input = table(&[" Amount ", "Gender", "Pt City  "], &[&["1", "male", "Omaha"]]);
        let out = SchemaNormalizer::default().apply(&input).unwrap();
        assert_eq!(out.table.columns, vec!["Amount", "Gender", "Pt City"]);
        assert_eq!(out.stats.cells_changed, 2);
        // input is untouched
        assert_eq!(input.columns[0], " Amount ");
    }

    #[test]
    fn drops_denied_and_empty_unnamed_columns() {
        let input = table(
            &["Amount", "Unnamed: 30", "Unnamed: 31", "", "Notes"],
            &[&["1", "x", "", "", "n"], &["2", "", "", " ", ""]],
        );
        let out = SchemaNormalizer::default().apply(&input).unwrap();
        assert_eq!(out.table.columns, vec!["Amount", "Notes"]);
        assert_eq!(out.table.rows[0].cells, vec![Cell::text("1"), Cell::text("n")]);
        assert_eq!(out.stats.notes.len(), 3);
    }

    #[test]
    fn blank_header_matches_denied_position() {
        let mut headers = vec!["Col"; 30];
        headers.extend(["", "", "Notes"]);
        let mut row = vec!["v"; 30];
        row.extend(["stray", "also stray", "n"]);
        let input = table(&headers, &[row.as_slice()]);

        let out = SchemaNormalizer::default().apply(&input).unwrap();
        assert_eq!(out.table.columns.len(), 31);
        assert_eq!(out.table.columns[30], "Notes");
        assert_eq!(out.stats.notes.len(), 2);
    }

    #[test]
    fn keeps_unnamed_column_with_content_when_not_denied() {
        let input = table(&["Amount", ""], &[&["1", "keep me"]]);
        let out = SchemaNormalizer::default().apply(&input).unwrap();
        assert_eq!(out.table.columns.len(), 2);
    }

    #[test]
    fn absent_junk_columns_are_tolerated() {
        let input = table(&["Amount"], &[&["1"]]);
        let out = SchemaNormalizer::default().apply(&input).unwrap();
        assert_eq!(out.table, input);
        assert!(out.stats.notes.is_empty());
    }
}
