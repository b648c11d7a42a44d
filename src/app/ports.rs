use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

use crate::domain::{RawTable, Table};
use crate::error::Result;

/// Where raw application rows come from. Any failure is reported as
/// `CleanerError::SourceUnavailable` and is fatal to the run.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<RawTable>;

    /// Human-readable location, used in logs
    fn describe(&self) -> String;
}

/// Where the cleaned table goes
#[async_trait]
pub trait TableSink: Send + Sync {
    async fn write(&self, table: &Table) -> Result<SinkReceipt>;
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SinkReceipt {
    pub rows: usize,
    pub bytes: usize,
    /// Final file location, for file-backed sinks
    pub path: Option<PathBuf>,
}
