use thiserror::Error;

/// Validation and contract errors exposed by `provender-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("barcode cannot be empty")]
    EmptyBarcode,
    #[error("barcode length {len} outside {min}..={max} digits")]
    BarcodeInvalidLength { len: usize, min: usize, max: usize },
    #[error("barcode contains non-digit character '{ch}' at index {index}")]
    BarcodeInvalidChar { ch: char, index: usize },

    #[error("product id cannot be empty")]
    EmptyProductId,
    #[error("product name cannot be empty")]
    EmptyProductName,

    #[error("invalid source '{value}', expected one of catalog, regulatory, websearch, synthesis")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("source_chain must contain at least one source")]
    EmptySourceChain,

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}
