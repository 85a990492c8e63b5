/// Error type for sheet operations.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    /// Service-account JSON is unreadable or incomplete
    #[error("invalid service-account credentials: {0}")]
    Credentials(String),
    /// Token exchange was refused
    #[error("sheet authentication failed: {0}")]
    Auth(String),
    /// Transport failure
    #[error("network error: {0}")]
    Network(String),
    /// Non-success status from the Sheets API
    #[error("HTTP {0}: {1}")]
    Http(u16, String),
    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),
}

impl SheetsError {
    /// Credential and token failures, as opposed to API or transport failures.
    pub fn is_auth(&self) -> bool {
        matches!(self, SheetsError::Credentials(_) | SheetsError::Auth(_))
            || matches!(self, SheetsError::Http(401 | 403, _))
    }
}
