//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Schedulers that run the uploader branch on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args)               |
//! | 3-4     | local            | Configuration and output file errors     |
//! | 40-49   | sheet            | Google Sheets auth/write codes           |
//! | 50-59   | fetch            | Criteo, Kelkoo and Fixer                 |
//! | 60-69   | pipeline         | Merge outcome codes                      |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant `CliError` constructor

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Local (3-4)
// =============================================================================

/// Config file unreadable/invalid, or a required setting or secret is unset.
pub const EXIT_CONFIG: u8 = 3;

/// Cannot write the preview CSV.
pub const EXIT_OUTPUT_IO: u8 = 4;

// =============================================================================
// Sheet (40-49)
// =============================================================================

/// Service-account credentials invalid or token exchange refused.
pub const EXIT_SHEET_AUTH: u8 = 40;

/// Sheets API transport failure, non-success status or unexpected body.
pub const EXIT_SHEET_API: u8 = 41;

// =============================================================================
// Fetch (50-59): upstream reporting APIs
// =============================================================================

/// Auth rejected by upstream (401/403, failed OAuth exchange).
pub const EXIT_FETCH_AUTH: u8 = 51;

/// Request rejected by upstream (4xx other than auth).
pub const EXIT_FETCH_VALIDATION: u8 = 52;

/// Upstream error (5xx), other non-success status, or network failure.
pub const EXIT_FETCH_UPSTREAM: u8 = 54;

/// Upstream answered 200 with a body we cannot use.
pub const EXIT_FETCH_PAYLOAD: u8 = 55;

// =============================================================================
// Pipeline (60-69)
// =============================================================================

/// Neither Criteo nor Kelkoo had rows for the window. The sheet is left untouched.
pub const EXIT_NO_DATA: u8 = 60;

/// Exit code for an HTTP status from an upstream reporting API.
pub fn fetch_status_exit_code(status: u16) -> u8 {
    match status {
        401 | 403 => EXIT_FETCH_AUTH,
        400..=499 => EXIT_FETCH_VALIDATION,
        _ => EXIT_FETCH_UPSTREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(fetch_status_exit_code(401), EXIT_FETCH_AUTH);
        assert_eq!(fetch_status_exit_code(403), EXIT_FETCH_AUTH);
        assert_eq!(fetch_status_exit_code(400), EXIT_FETCH_VALIDATION);
        assert_eq!(fetch_status_exit_code(404), EXIT_FETCH_VALIDATION);
        assert_eq!(fetch_status_exit_code(429), EXIT_FETCH_VALIDATION);
        assert_eq!(fetch_status_exit_code(500), EXIT_FETCH_UPSTREAM);
        assert_eq!(fetch_status_exit_code(204), EXIT_FETCH_UPSTREAM);
    }
}
