//! Generic in-memory record store: cache-first hydration, id allocation,
//! and id-based merge semantics shared by all five entity collections.

use std::collections::HashSet;

use convoi_core::Record;
use serde::de::DeserializeOwned;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RecordStore<T> {
    records: Vec<T>,
}

impl<T> Default for RecordStore<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: Record + DeserializeOwned> RecordStore<T> {
    /// Hydrate from a cache payload, falling back to already-reconstructed
    /// spreadsheet records.
    ///
    /// A cache payload that parses to a non-empty sequence wins outright; a
    /// malformed payload is treated as absent, never raised.
    pub fn load(cache_payload: Option<&str>, sheet_records: Vec<T>) -> Self {
        if let Some(json) = cache_payload {
            match serde_json::from_str::<Vec<T>>(json) {
                Ok(parsed) if !parsed.is_empty() => return Self { records: parsed },
                Ok(_) => {}
                Err(err) => warn!(%err, "malformed cache payload, falling back"),
            }
        }
        Self {
            records: sheet_records,
        }
    }
}

impl<T: Record> RecordStore<T> {
    pub fn from_records(records: Vec<T>) -> Self {
        Self { records }
    }

    /// `1 + max(id)`, or `1` when empty. A deleted record's id may be
    /// skipped but is never reassigned to a new record.
    pub fn next_id(&self) -> i64 {
        self.records
            .iter()
            .map(Record::id)
            .max()
            .map_or(1, |max| max + 1)
    }

    pub fn push(&mut self, record: T) {
        self.records.push(record);
    }

    /// Replace the record with the same id, or append when there is none.
    pub fn upsert(&mut self, record: T) {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    pub fn remove_at(&mut self, index: usize) -> T {
        self.records.remove(index)
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.records
    }

    pub fn into_records(self) -> Vec<T> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Concatenate `base` then `incoming` and keep the first occurrence of each
/// id, so `base` entries win on collision. Returns the merged sequence and
/// the number of `incoming` records admitted.
pub fn merge_by_id<T: Record>(base: Vec<T>, incoming: Vec<T>) -> (Vec<T>, usize) {
    let mut seen: HashSet<i64> = HashSet::new();
    let mut merged: Vec<T> = base.into_iter().filter(|r| seen.insert(r.id())).collect();
    let mut admitted = 0;
    for record in incoming {
        if seen.insert(record.id()) {
            merged.push(record);
            admitted += 1;
        }
    }
    (merged, admitted)
}
