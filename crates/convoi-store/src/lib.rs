//! Storage layer: local key-value cache (authoritative), spreadsheet mirror
//! (portable secondary copy), and the application state that ties the five
//! record stores together.

mod error;
pub use error::StoreError;

pub mod app;
pub mod cache;
pub mod codec;
pub mod mirror;
pub mod sheet;
pub mod store;

pub use app::{App, DeclarationRequest, HistoryPage, NewClient, NewConvoyeur, NewDriver, NewProduct};
pub use cache::{CacheMirror, FsKvStore, KvStore, MemoryKv};
pub use codec::XlsxCodec;
pub use mirror::{FsSheetDir, SheetCodec, SheetDir, SpreadsheetMirror};
pub use sheet::{Sheet, SheetRecord};
pub use store::{RecordStore, merge_by_id};
