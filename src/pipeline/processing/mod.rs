// Pipeline processing: column-level repairs, coercions and derivations

pub mod categorical;
pub mod corrections;
pub mod derive;
pub mod numeric;
pub mod quality_gate;
pub mod schema;
pub mod sentinel;
pub mod temporal;

use serde::Serialize;

use crate::domain::Table;
use crate::error::Result;

/// Counters collected while a stage runs
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StageStats {
    pub stage: String,
    /// Cells (or headers, for the schema stage) whose value changed
    pub cells_changed: usize,
    /// Cells whose text could not be coerced and became absent
    pub parse_failures: usize,
    /// Free-form notes such as skipped columns
    pub notes: Vec<String>,
}

impl StageStats {
    pub fn new(stage: &str) -> Self {
        Self {
            stage: stage.to_string(),
            ..Default::default()
        }
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }
}

/// A stage's result: a new table plus what happened along the way
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub table: Table,
    pub stats: StageStats,
}

/// One ordered transform of the cleaning pipeline. Stages never mutate their
/// input; each returns a fresh table.
pub trait Stage: Send + Sync {
    /// Stable identifier used in logs, metrics and the pipeline config
    fn name(&self) -> &'static str;

    /// Transform `input` into a new table
    fn apply(&self, input: &Table) -> Result<StageOutput>;
}
