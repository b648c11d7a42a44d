// Pipeline ingestion: raw CSV bytes into a RawTable

use csv::ReaderBuilder;
use std::io::Read;
use tracing::debug;

use crate::domain::RawTable;
use crate::error::Result;

/// Read a CSV payload with a header row. Rows may be ragged; the table
/// model pads or truncates them later. Headers are kept verbatim apart
/// from a leading byte-order mark.
pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    if let Some(first) = headers.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "Parsed CSV payload");
    Ok(RawTable { headers, rows })
}

pub fn read_csv_bytes(bytes: &[u8]) -> Result<RawTable> {
    read_csv(bytes)
}
