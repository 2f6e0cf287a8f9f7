use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workbook read error: {0}")]
    SheetRead(#[from] calamine::XlsxError),

    #[error("workbook write error: {0}")]
    SheetWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("no declaration at position {0}")]
    NoSuchIndex(usize),

    #[error("unknown {kind} id: {id}")]
    UnknownId { kind: &'static str, id: i64 },

    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
