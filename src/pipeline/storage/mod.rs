// Pipeline storage: rendering a cleaned table back to CSV

use csv::WriterBuilder;
use std::io::Write;

use crate::domain::Table;
use crate::error::Result;

/// Write the header and every rendered row. Absent cells become empty
/// fields so the output re-enters the pipeline unchanged.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(&table.columns)?;
    for row in table.rendered_rows() {
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cell, PaymentStatus, Record};
    use crate::pipeline::ingestion::read_csv_bytes;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn renders_typed_cells_as_plain_text() {
        let table = Table::new(
            vec!["Amount".into(), "Payment Submitted?".into(), "Pt City".into(), "Days to Support".into()],
            vec![
                Record {
                    cells: vec![
                        Cell::Amount(Decimal::from_str("1200.50").unwrap()),
                        Cell::Payment(PaymentStatus::SubmittedOn(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap())),
                        Cell::text("Omaha, NE"),
                        Cell::Integer(4),
                    ],
                },
                Record {
                    cells: vec![Cell::Absent, Cell::Payment(PaymentStatus::Confirmed), Cell::Absent, Cell::Integer(1)],
                },
            ],
        );
        let text = String::from_utf8(to_csv_bytes(&table).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Amount,Payment Submitted?,Pt City,Days to Support");
        assert_eq!(lines[1], "1200.5,2024-03-05,\"Omaha, NE\",4");
        assert_eq!(lines[2], ",Yes,,1");

        let reread = read_csv_bytes(text.as_bytes()).unwrap();
        assert_eq!(reread.headers, table.columns);
        assert_eq!(reread.rows[0][2], "Omaha, NE");
    }
}
