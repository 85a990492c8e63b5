//! Cost uploader: pull yesterday's ad costs from Criteo and Kelkoo, normalise
//! them into one table and publish it to a Google Sheet.
//!
//! The binary in `main.rs` is a thin shell over [`pipeline`]; everything that
//! talks to the network takes its base URL from `Settings` so tests can point
//! it at a mock server.

pub mod exit_codes;
pub mod fetch;
pub mod pipeline;

use cost_uploader_config::ConfigError;
use cost_uploader_normalize::NormalizeError;
use cost_uploader_sheets::SheetsError;

use exit_codes::{
    EXIT_CONFIG, EXIT_ERROR, EXIT_FETCH_PAYLOAD, EXIT_NO_DATA, EXIT_OUTPUT_IO,
    EXIT_SHEET_API, EXIT_SHEET_AUTH,
};

/// Prefix of every fatal message, so alerting can match on one string.
pub const FAILURE_PREFIX: &str = "Auto Cost Uploader has failed";

/// A failure carried up to `main`, which prints it and exits with `code`.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_OUTPUT_IO, msg)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn config(err: ConfigError) -> Self {
        let hint = match &err {
            ConfigError::Missing(_) => Some(format!(
                "set them in {} or via environment variables",
                cost_uploader_config::default_config_path().display()
            )),
            _ => None,
        };
        Self { code: EXIT_CONFIG, message: err.to_string(), hint }
    }

    /// Normalisation failures, attributed to the source whose payload broke.
    pub fn normalize(source: &str, err: NormalizeError) -> Self {
        match err {
            NormalizeError::NoData => Self::new(EXIT_NO_DATA, format!("{} - no data provided", FAILURE_PREFIX))
                .with_hint("neither Criteo nor Kelkoo returned rows for the window; the sheet was not touched"),
            other => Self::new(
                EXIT_FETCH_PAYLOAD,
                format!("{} - {} payload unusable: {}", FAILURE_PREFIX, source, other),
            ),
        }
    }

    pub fn sheets(err: SheetsError) -> Self {
        let code = if err.is_auth() { EXIT_SHEET_AUTH } else { EXIT_SHEET_API };
        let hint = match &err {
            SheetsError::Http(403, _) => {
                Some("share the spreadsheet with the service account's client_email".to_string())
            }
            SheetsError::Http(404, _) => Some("check the spreadsheet key (GSHEET_KEY)".to_string()),
            _ => None,
        };
        Self { code, message: format!("{} - Google Sheets: {}", FAILURE_PREFIX, err), hint }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}
