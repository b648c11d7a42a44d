use super::{Stage, StageOutput, StageStats};
use crate::config::SentinelConfig;
use crate::domain::{Cell, Table};
use crate::error::Result;

/// Replaces non-informative tokens with the absent marker in every column
pub struct SentinelResolver {
    values: Vec<String>,
}

impl SentinelResolver {
    pub fn new(config: &SentinelConfig) -> Self {
        Self {
            values: config.values.clone(),
        }
    }

    fn is_sentinel(&self, text: &str) -> bool {
        let trimmed = text.trim();
        self.values.iter().any(|v| v == trimmed)
    }
}

impl Default for SentinelResolver {
    fn default() -> Self {
        Self::new(&SentinelConfig::default())
    }
}

impl Stage for SentinelResolver {
    fn name(&self) -> &'static str {
        "sentinel"
    }

    fn apply(&self, input: &Table) -> Result<StageOutput> {
        let mut stats = StageStats::new(self.name());
        let mut table = input.clone();

        for row in &mut table.rows {
            for cell in &mut row.cells {
                if let Cell::Text(text) = cell {
                    if self.is_sentinel(text) {
                        *cell = Cell::Absent;
                        stats.cells_changed += 1;
                    }
                }
            }
        }

        Ok(StageOutput { table, stats })
    }
}
