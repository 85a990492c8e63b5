use thiserror::Error;

#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Report header lacks a column the normalizer needs.
    #[error("{report} report: missing column '{column}'")]
    MissingColumn { report: String, column: String },

    /// A cell could not be parsed as the expected type.
    #[error("{report} report, record {record}: cannot parse {field} '{value}'")]
    InvalidValue {
        report: String,
        record: u64,
        field: String,
        value: String,
    },

    /// CSV framing error (unbalanced quotes, ragged rows, bad UTF-8).
    #[error("{report} report: malformed CSV: {message}")]
    Csv { report: String, message: String },

    /// Kelkoo payload is not the expected JSON array of records.
    #[error("Kelkoo payload: {0}")]
    Json(String),

    /// Neither source produced rows for the reporting window.
    #[error("no data provided")]
    NoData,
}
