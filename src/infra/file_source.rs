use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::app::ports::DataSource;
use crate::domain::RawTable;
use crate::error::{CleanerError, Result};
use crate::pipeline::ingestion::read_csv_bytes;

/// Raw CSV on the local filesystem
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DataSource for FileSource {
    async fn fetch(&self) -> Result<RawTable> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| CleanerError::source_unavailable(self.path.display().to_string(), e))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Read source file");
        read_csv_bytes(&bytes)
            .map_err(|e| CleanerError::source_unavailable(self.path.display().to_string(), e))
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
