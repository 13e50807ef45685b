//! Recipient extraction from uploaded spreadsheets.

use serde::Serialize;

use crate::msisdn::normalize_msisdns;

/// Numbers pulled out of a CSV upload, plus how many rows could not be read.
///
/// Extraction never fails: undecodable bytes and broken rows are skipped and
/// counted so the caller can log them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CsvExtraction {
    pub numbers: Vec<String>,
    pub skipped_rows: usize,
}

/// Collect every cell that contains a digit, from every column, and normalize them.
///
/// The whole sheet is scanned rather than a fixed column, so a date or an
/// amount column will be picked up as well.
pub fn extract_numbers(bytes: &[u8]) -> CsvExtraction {
    let text = String::from_utf8_lossy(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut cells: Vec<String> = Vec::new();
    let mut skipped_rows = 0;
    for row in reader.records() {
        match row {
            Ok(row) => cells.extend(
                row.iter()
                    .filter(|cell| cell.chars().any(|c| c.is_ascii_digit()))
                    .map(str::to_string),
            ),
            Err(_) => skipped_rows += 1,
        }
    }

    CsvExtraction {
        numbers: normalize_msisdns(&cells.join("\n")),
        skipped_rows,
    }
}
