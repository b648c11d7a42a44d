// Adapters for the application ports

pub mod csv_sink;
pub mod file_source;
pub mod http_source;
pub mod memory_sink;

use crate::app::ports::DataSource;

pub use csv_sink::CsvFileSink;
pub use file_source::FileSource;
pub use http_source::HttpSource;
pub use memory_sink::MemorySink;

/// Pick a source adapter by location: http(s) URLs are fetched, anything
/// else is read as a local path
pub fn source_for(location: &str) -> Box<dyn DataSource> {
    let trimmed = location.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Box::new(HttpSource::new(trimmed))
    } else {
        Box::new(FileSource::new(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_adapter_by_scheme() {
        assert!(source_for("https://example.org/data.csv").describe().starts_with("https://"));
        assert!(source_for("HTTP://example.org/data.csv").describe().starts_with("HTTP://"));
        assert_eq!(source_for("data/raw.csv").describe(), "file data/raw.csv");
    }
}
