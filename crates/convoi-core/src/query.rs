//! Read-side views over the declaration history: ordering, filtering, and
//! pagination for display.

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::Declaration;

/// Parse a stored timestamp into Unix milliseconds.
///
/// Accepts RFC 3339 with offset, a bare `T`-separated date-time, or a bare
/// date. Anything else yields `None` and the record sorts as oldest.
fn parse_timestamp(s: &str) -> Option<i64> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.timestamp_millis());
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc().timestamp_millis());
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
    }
    None
}

/// Stable sort, newest first. Unparseable timestamps sort as epoch 0.
pub fn sort_newest_first(records: &mut [Declaration]) {
    records.sort_by_key(|d| Reverse(parse_timestamp(&d.timestamp).unwrap_or(0)));
}

/// Render an ISO date (`2024-03-01`) in French day-first form (`01/03/2024`).
/// Other inputs pass through unchanged.
pub fn date_fr(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Everything a search hits: document number, localized date, the three
/// party names, destination, and the product lines.
fn search_blob(decl: &Declaration) -> String {
    let products = decl
        .products
        .iter()
        .map(|p| format!("{} {} {}", p.name, p.quantity, p.unit))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "{} {} {} {} {} {} {}",
        decl.document_number,
        date_fr(&decl.date),
        decl.client_name,
        decl.driver_name,
        decl.convoyeur_name,
        decl.destination,
        products,
    )
    .to_lowercase()
}

/// Case-insensitive substring filter. Blank text returns all records in
/// their current order.
pub fn filter(records: &[Declaration], text: &str) -> Vec<Declaration> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|d| search_blob(d).contains(&needle))
        .cloned()
        .collect()
}

/// Page slice plus total page count. `page` is 1-indexed; a page beyond
/// range returns an empty slice (clamping is the caller's job).
pub fn paginate<T: Clone>(records: &[T], page: usize, page_size: usize) -> (Vec<T>, usize) {
    let page_size = page_size.max(1);
    let total_pages = records.len().div_ceil(page_size);
    let Some(start) = page.checked_sub(1).map(|p| p * page_size) else {
        return (Vec::new(), total_pages);
    };
    if start >= records.len() {
        return (Vec::new(), total_pages);
    }
    let end = (start + page_size).min(records.len());
    (records[start..end].to_vec(), total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProductLine;

    fn decl(doc: &str, timestamp: &str) -> Declaration {
        Declaration {
            id: doc.len() as i64,
            timestamp: timestamp.into(),
            document_number: doc.into(),
            ..Declaration::default()
        }
    }

    #[test]
    fn sorts_newest_first() {
        let mut records = vec![
            decl("1/2024", "2024-01-01T08:00:00Z"),
            decl("3/2024", "2024-03-01T08:00:00Z"),
            decl("2/2024", "2024-02-01T08:00:00Z"),
        ];
        sort_newest_first(&mut records);
        let order: Vec<_> = records.iter().map(|d| d.document_number.as_str()).collect();
        assert_eq!(order, ["3/2024", "2/2024", "1/2024"]);
    }

    #[test]
    fn unparseable_timestamps_sort_oldest() {
        let mut records = vec![
            decl("bad", "not a date"),
            decl("good", "2024-01-01T00:00:00Z"),
        ];
        sort_newest_first(&mut records);
        assert_eq!(records[0].document_number, "good");
    }

    #[test]
    fn bare_dates_are_accepted() {
        assert!(parse_timestamp("2024-01-01").is_some());
        assert!(parse_timestamp("2024-01-01T08:30:00").is_some());
        assert!(parse_timestamp("2024-01-01T08:30:00.250Z").is_some());
    }

    #[test]
    fn filter_matches_any_field_case_insensitively() {
        let mut a = decl("5/2024", "2024-01-01T00:00:00Z");
        a.client_name = "SFI".into();
        let mut b = decl("6/2024", "2024-01-02T00:00:00Z");
        b.products = vec![ProductLine {
            name: "Produit A".into(),
            quantity: "10".into(),
            unit: "Kg".into(),
        }];
        let records = vec![a, b];

        assert_eq!(filter(&records, "sfi").len(), 1);
        assert_eq!(filter(&records, "produit a").len(), 1);
        assert_eq!(filter(&records, "5/2024").len(), 1);
        assert_eq!(filter(&records, "absent").len(), 0);
    }

    #[test]
    fn filter_matches_localized_date() {
        let mut a = decl("5/2024", "2024-01-01T00:00:00Z");
        a.date = "2024-03-01".into();
        let records = vec![a];
        assert_eq!(filter(&records, "01/03/2024").len(), 1);
    }

    #[test]
    fn blank_filter_returns_everything_in_order() {
        let records = vec![
            decl("2/2024", "2024-02-01T00:00:00Z"),
            decl("1/2024", "2024-01-01T00:00:00Z"),
        ];
        let out = filter(&records, "   ");
        assert_eq!(out, records);
    }

    #[test]
    fn pages_are_disjoint_and_cover_everything() {
        let records: Vec<i32> = (0..7).collect();
        let (_, total_pages) = paginate(&records, 1, 3);
        assert_eq!(total_pages, 3);

        let mut seen = Vec::new();
        for page in 1..=total_pages {
            let (slice, _) = paginate(&records, page, 3);
            seen.extend(slice);
        }
        assert_eq!(seen, records);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let records: Vec<i32> = (0..5).collect();
        let (slice, total_pages) = paginate(&records, 4, 2);
        assert!(slice.is_empty());
        assert_eq!(total_pages, 3);

        let (slice, _) = paginate(&records, 0, 2);
        assert!(slice.is_empty());
    }

    #[test]
    fn empty_input_has_zero_pages() {
        let (slice, total_pages) = paginate::<i32>(&[], 1, 10);
        assert!(slice.is_empty());
        assert_eq!(total_pages, 0);
    }
}
