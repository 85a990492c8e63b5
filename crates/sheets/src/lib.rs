//! Google Sheets client for the cost uploader.
//!
//! Covers exactly what publishing needs: service-account auth, locating the
//! first worksheet, clearing the data range and writing the new block.
//!
//! Blocking reqwest. No retries. No batching beyond a single write.

mod auth;
mod client;
mod error;

pub use auth::{ServiceAccount, AccessToken, SHEETS_SCOPE};
pub use client::{SheetsClient, UpdateSummary, DEFAULT_API_BASE, qualified_range};
pub use error::SheetsError;
