//! Sheets v4 values client (blocking).
//!
//! Publish flow: find first worksheet → batchClear the data range → write
//! the block at A1 with USER_ENTERED.

use std::time::Duration;

use serde::Deserialize;

use crate::auth::{http_client, ServiceAccount};
use crate::error::SheetsError;

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

/// Sheets API client bound to one access token.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

/// What the API reports back after a write.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateSummary {
    pub updated_range: String,
    pub updated_rows: u64,
    pub updated_columns: u64,
    pub updated_cells: u64,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
    #[serde(default)]
    index: u32,
}

/// Prefix an A1 range with a quoted worksheet title: `'My Sheet'!A:J`.
pub fn qualified_range(title: &str, range: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), range)
}

impl SheetsClient {
    /// Authenticate with service-account JSON and return a ready client.
    pub fn connect(
        credentials_json: &str,
        api_base: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SheetsError> {
        let account = ServiceAccount::from_json(credentials_json)?;
        let http = http_client(timeout)?;
        let token = account.fetch_token(&http)?;
        log::debug!("sheet token acquired for {}", account.client_email);
        Ok(Self::from_parts(http, api_base.unwrap_or(DEFAULT_API_BASE), token.access_token))
    }

    /// Client with an already-issued bearer token.
    pub fn with_token(token: &str, api_base: &str, timeout: Duration) -> Result<Self, SheetsError> {
        Ok(Self::from_parts(http_client(timeout)?, api_base, token.to_string()))
    }

    fn from_parts(http: reqwest::blocking::Client, api_base: &str, token: String) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Title of the worksheet at index 0.
    pub fn first_worksheet_title(&self, key: &str) -> Result<String, SheetsError> {
        let url = format!("{}/v4/spreadsheets/{}", self.api_base, key);
        let response = self.send(self.http.get(&url).query(&[("fields", "sheets.properties")]))?;
        let meta: SpreadsheetMeta = response.json().map_err(|e| SheetsError::Parse(e.to_string()))?;

        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .map(|p| p.title)
            .ok_or_else(|| SheetsError::Parse("spreadsheet has no worksheets".into()))
    }

    /// Clear values (not formatting) in `range`.
    pub fn clear(&self, key: &str, range: &str) -> Result<(), SheetsError> {
        let url = format!("{}/v4/spreadsheets/{}/values:batchClear", self.api_base, key);
        let body = serde_json::json!({ "ranges": [range] });
        self.send(self.http.post(&url).json(&body))?;
        Ok(())
    }

    /// Write `values` starting at `range`, parsed as if typed by a user.
    pub fn update(
        &self,
        key: &str,
        range: &str,
        values: &[Vec<serde_json::Value>],
    ) -> Result<UpdateSummary, SheetsError> {
        let mut url = reqwest::Url::parse(&format!("{}/v4/spreadsheets/{}/values", self.api_base, key))
            .map_err(|e| SheetsError::Parse(format!("invalid sheet URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| SheetsError::Parse("sheet URL cannot take a path".into()))?
            .push(range);

        let body = serde_json::json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": values,
        });
        let response = self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", "USER_ENTERED")])
                .json(&body),
        )?;
        response.json().map_err(|e| SheetsError::Parse(e.to_string()))
    }

    /// Replace the data block on the first worksheet: clear `clear_range`,
    /// then write `values` from A1.
    pub fn publish(
        &self,
        key: &str,
        clear_range: &str,
        values: &[Vec<serde_json::Value>],
    ) -> Result<UpdateSummary, SheetsError> {
        let title = self.first_worksheet_title(key)?;
        log::debug!("publishing to worksheet '{}'", title);
        self.clear(key, &qualified_range(&title, clear_range))?;
        self.update(key, &qualified_range(&title, "A1"), values)
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response, SheetsError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SheetsError::Http(status, api_message(&body)));
        }
        Ok(response)
    }
}

/// Pull `error.message` out of a Google error body, or fall back to the body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_plain_title() {
        assert_eq!(qualified_range("Sheet1", "A:J"), "'Sheet1'!A:J");
    }

    #[test]
    fn doubles_quotes_in_title() {
        assert_eq!(qualified_range("Bob's costs", "A1"), "'Bob''s costs'!A1");
    }

    #[test]
    fn api_message_extracts_google_error() {
        let body = r#"{"error":{"code":403,"message":"The caller does not have permission","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(api_message(body), "The caller does not have permission");
        assert_eq!(api_message("  upstream down \n"), "upstream down");
    }

    #[test]
    fn summary_tolerates_missing_fields() {
        let s: UpdateSummary = serde_json::from_str(r#"{"updatedRows":3}"#).unwrap();
        assert_eq!(s.updated_rows, 3);
        assert_eq!(s.updated_cells, 0);
    }
}
