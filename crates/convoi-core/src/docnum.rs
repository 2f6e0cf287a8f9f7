//! Document number allocation.
//!
//! Numbers have the form `N/YEAR` and restart from 1 each calendar year:
//! the scan only counts current-year numbers, so `41/2023` never blocks
//! `1/2024`. A separately persisted counter keeps numbering monotonic even
//! when the history has been cleared or is momentarily empty.

use chrono::Datelike;

use crate::Declaration;

/// Parse a `digits/digits` document number into `(counter, year)`.
pub fn parse_document_number(s: &str) -> Option<(u32, i32)> {
    let (counter, year) = s.trim().split_once('/')?;
    if counter.is_empty() || year.is_empty() {
        return None;
    }
    if !counter.bytes().all(|b| b.is_ascii_digit()) || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((counter.parse().ok()?, year.parse().ok()?))
}

/// Allocate the next document number for `year`.
///
/// Takes the maximum of the current-year counters found in `declarations`
/// and the persisted `last_stored` counter, increments it, and returns the
/// formatted number together with the counter value the caller must persist.
pub fn next_document_number(
    declarations: &[Declaration],
    last_stored: u32,
    year: i32,
) -> (String, u32) {
    let mut max = last_stored;
    for decl in declarations {
        if let Some((counter, decl_year)) = parse_document_number(&decl.document_number) {
            if decl_year == year && counter > max {
                max = counter;
            }
        }
    }
    let next = max + 1;
    (format!("{next}/{year}"), next)
}

/// Current calendar year, local time.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
