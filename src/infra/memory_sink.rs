use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::app::ports::{SinkReceipt, TableSink};
use crate::domain::Table;
use crate::error::{CleanerError, Result};
use crate::pipeline::storage::to_csv_bytes;

/// Keeps the last written table in memory. Clones share the same slot.
#[derive(Clone, Default)]
pub struct MemorySink {
    last: Arc<Mutex<Option<Table>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<Table> {
        self.last.lock().ok().and_then(|slot| slot.clone())
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn write(&self, table: &Table) -> Result<SinkReceipt> {
        let bytes = to_csv_bytes(table)?.len();
        let mut slot = self
            .last
            .lock()
            .map_err(|e| CleanerError::Sink(format!("memory sink lock poisoned: {}", e)))?;
        *slot = Some(table.clone());
        Ok(SinkReceipt {
            rows: table.len(),
            bytes,
            path: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, Record};

    fn table() -> Table {
        Table::new(
            vec!["Amount".into()],
            vec![Record { cells: vec![Cell::text("5")] }],
        )
    }

    #[tokio::test]
    async fn clones_share_the_stored_table() {
        let sink = MemorySink::new();
        let receipt = sink.clone().write(&table()).await.unwrap();
        assert_eq!(receipt.rows, 1);
        assert_eq!(sink.last(), Some(table()));
    }

    #[tokio::test]
    async fn poisoned_lock_is_an_error() {
        let sink = MemorySink::new();
        let shared = sink.last.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.lock().unwrap();
            panic!("poison the slot");
        })
        .join();

        let err = sink.write(&table()).await.unwrap_err();
        assert!(matches!(err, CleanerError::Sink(_)));
    }
}
