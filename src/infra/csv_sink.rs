use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::app::ports::{SinkReceipt, TableSink};
use crate::domain::Table;
use crate::error::{CleanerError, Result};
use crate::pipeline::storage::to_csv_bytes;

/// Writes the cleaned table as CSV. The file is written to a temporary
/// sibling and renamed into place, so readers never see a partial file.
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn persist_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CleanerError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl TableSink for CsvFileSink {
    async fn write(&self, table: &Table) -> Result<SinkReceipt> {
        let bytes = to_csv_bytes(table)?;
        let len = bytes.len();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || persist_atomically(&path, &bytes))
            .await
            .map_err(|e| CleanerError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        info!(path = %self.path.display(), rows = table.len(), bytes = len, "Wrote cleaned CSV");
        Ok(SinkReceipt {
            rows: table.len(),
            bytes: len,
            path: Some(self.path.clone()),
        })
    }
}
