//! Spreadsheet mirror: the portable secondary copy of every store.
//!
//! The cache stays authoritative. A populated cache is never overwritten by
//! a stale file, and a failed workbook write degrades to the export
//! fallback and then to cache-only operation; it never blocks the user.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::StoreError;
use crate::sheet::{Sheet, SheetRecord, build_sheet, records_from_sheet};

/// Bytes to sheet and back; the external spreadsheet library boundary.
pub trait SheetCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Sheet, StoreError>;
    fn encode(&self, sheet: &Sheet) -> Result<Vec<u8>, StoreError>;
}

/// The user-granted directory capability the mirror writes through.
pub trait SheetDir {
    /// File contents, or `None` when the file does not exist.
    fn read(&self, file: &str) -> Result<Option<Vec<u8>>, StoreError>;
    fn write(&self, file: &str, bytes: &[u8]) -> Result<(), StoreError>;
}

#[derive(Debug)]
pub struct FsSheetDir {
    dir: PathBuf,
}

impl FsSheetDir {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl SheetDir for FsSheetDir {
    fn read(&self, file: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.dir.join(file)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, file: &str, bytes: &[u8]) -> Result<(), StoreError> {
        fs::write(self.dir.join(file), bytes)?;
        Ok(())
    }
}

pub struct SpreadsheetMirror {
    codec: Box<dyn SheetCodec>,
    data_dir: Box<dyn SheetDir>,
    /// Cleared when the user declines the direct-write consent prompt,
    /// which is a normal outcome, not a failure.
    write_granted: bool,
    /// "Download" fallback target used when direct writes are unavailable.
    export_dir: Option<Box<dyn SheetDir>>,
}

impl SpreadsheetMirror {
    pub fn new(codec: Box<dyn SheetCodec>, data_dir: Box<dyn SheetDir>) -> Self {
        Self {
            codec,
            data_dir,
            write_granted: true,
            export_dir: None,
        }
    }

    /// Run without the direct-write grant: reads still work, writes go to
    /// the export fallback or nowhere.
    pub fn without_direct_write(mut self) -> Self {
        self.write_granted = false;
        self
    }

    pub fn with_export_dir(mut self, dir: Box<dyn SheetDir>) -> Self {
        self.export_dir = Some(dir);
        self
    }

    /// Read and reconstruct every record of `T` from its workbook file.
    /// A missing or unreadable file yields an empty list, never an error.
    pub fn read_all<T: SheetRecord>(&self) -> Vec<T> {
        let bytes = match self.data_dir.read(T::FILE) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(file = T::FILE, %err, "unreadable workbook");
                return Vec::new();
            }
        };
        match self.codec.decode(&bytes) {
            Ok(sheet) => records_from_sheet(&sheet),
            Err(err) => {
                warn!(file = T::FILE, %err, "undecodable workbook, treating as empty");
                Vec::new()
            }
        }
    }

    /// Decode an externally supplied workbook (merge-import path). This is
    /// an explicitly file-centric action, so decode failures do surface.
    pub fn decode_records<T: SheetRecord>(&self, bytes: &[u8]) -> Result<Vec<T>, StoreError> {
        let sheet = self.codec.decode(bytes)?;
        Ok(records_from_sheet(&sheet))
    }

    /// Append one record to `T`'s workbook, skipping the append when a row
    /// with the same identity already exists, then rewrite the file.
    ///
    /// Returns `false`, never an error, when the direct-write grant is
    /// absent or any step fails; the caller falls back to [`write_all`].
    ///
    /// [`write_all`]: Self::write_all
    pub fn append_row<T: SheetRecord>(&self, record: &T) -> bool {
        if !self.write_granted {
            return false;
        }
        let mut records: Vec<T> = match self.data_dir.read(T::FILE) {
            Ok(Some(bytes)) => match self.codec.decode(&bytes) {
                Ok(sheet) => records_from_sheet(&sheet),
                Err(err) => {
                    warn!(file = T::FILE, %err, "cannot decode workbook for append");
                    return false;
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(file = T::FILE, %err, "cannot read workbook for append");
                return false;
            }
        };

        let identity = record.identity();
        let duplicate = records.iter().any(|existing| {
            existing.identity().iter().any(|(key, value)| {
                identity
                    .iter()
                    .any(|(k, v)| k == key && v == value && !v.is_empty())
            })
        });
        if duplicate {
            debug!(file = T::FILE, "row already present, skipping duplicate");
        } else {
            records.push(record.clone());
        }

        match self.encode_records(&records) {
            Ok(bytes) => match self.data_dir.write(T::FILE, &bytes) {
                Ok(()) => {
                    info!(file = T::FILE, rows = records.len(), "appended to workbook");
                    true
                }
                Err(err) => {
                    warn!(file = T::FILE, %err, "workbook append write failed");
                    false
                }
            },
            Err(err) => {
                warn!(file = T::FILE, %err, "workbook encode failed");
                false
            }
        }
    }

    /// Flatten every record and rewrite `T`'s workbook: direct write when
    /// granted, export fallback otherwise. Failure is non-fatal; the cache
    /// copy remains authoritative.
    pub fn write_all<T: SheetRecord>(&self, records: &[T]) -> bool {
        let bytes = match self.encode_records(records) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = T::FILE, %err, "workbook encode failed");
                return false;
            }
        };

        if self.write_granted {
            match self.data_dir.write(T::FILE, &bytes) {
                Ok(()) => {
                    info!(file = T::FILE, rows = records.len(), "workbook rewritten");
                    return true;
                }
                Err(err) => warn!(file = T::FILE, %err, "direct write failed, trying export"),
            }
        }

        if let Some(export) = &self.export_dir {
            match export.write(T::FILE, &bytes) {
                Ok(()) => {
                    info!(file = T::FILE, "workbook written to export fallback");
                    return true;
                }
                Err(err) => warn!(file = T::FILE, %err, "export fallback failed"),
            }
        }

        warn!(file = T::FILE, "no workbook target available, cache copy only");
        false
    }

    fn encode_records<T: SheetRecord>(&self, records: &[T]) -> Result<Vec<u8>, StoreError> {
        self.codec.encode(&build_sheet(records))
    }
}
