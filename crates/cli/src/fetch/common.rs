//! Shared infrastructure for the upstream clients.
//!
//! Each client (fixer, criteo, kelkoo) reuses:
//! - `FetchClient`: blocking HTTP client with the configured timeout and
//!   status-to-exit-code classification
//! - `ReportWindow`: the two-day-prior to one-day-prior date range
//! - `strip_bom`: `utf-8-sig` decoding of text bodies
//!
//! There is no retry loop. A timeout, transport error or non-success status
//! aborts the run before the sheet is touched.

use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};

use crate::exit_codes::{self, fetch_status_exit_code};
use crate::{CliError, FAILURE_PREFIX};

// ── Constants ───────────────────────────────────────────────────────

pub(crate) const USER_AGENT: &str = concat!("cost-uploader/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body carried into a message.
const MAX_ERROR_BODY: usize = 300;

// ── Report window ───────────────────────────────────────────────────

/// Inclusive date range requested from both ad networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportWindow {
    /// Two days ago through yesterday, relative to `today`.
    pub fn trailing(today: NaiveDate) -> Self {
        Self {
            start: today - chrono::Days::new(2),
            end: today - chrono::Days::new(1),
        }
    }

    /// Trailing window for `now`, with "today" read on the clock that
    /// matches the Criteo report `timezone`: UTC days for a UTC zone, the
    /// host's local days for any named zone.
    pub fn current(timezone: &str, now: DateTime<Utc>) -> Self {
        Self::trailing(today_for(timezone, now))
    }

    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for ReportWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start_date(), self.end_date())
    }
}

// ── FetchClient ─────────────────────────────────────────────────────

/// Shared HTTP client that maps transport failures and HTTP statuses to the
/// standard exit codes.
///
/// Clients own their credentials and base URL; they hand a configured
/// `RequestBuilder` to [`FetchClient::send`].
pub(crate) struct FetchClient {
    pub(crate) http: reqwest::blocking::Client,
    source_name: &'static str,
}

impl FetchClient {
    pub(crate) fn new(source_name: &'static str, timeout: Duration) -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError::general(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, source_name })
    }

    pub(crate) fn source_name(&self) -> &'static str {
        self.source_name
    }

    /// Send the request; any non-2xx status becomes an error carrying the
    /// start of the response body.
    pub(crate) fn send(
        &self,
        what: &str,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, CliError> {
        let resp = req.send().map_err(|e| self.transport_error(what, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(self.status_error(what, status.as_u16(), &body));
        }
        Ok(resp)
    }

    /// Send and read the body as text, BOM stripped.
    pub(crate) fn send_text(
        &self,
        what: &str,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<String, CliError> {
        let resp = self.send(what, req)?;
        self.read_text(what, resp)
    }

    pub(crate) fn read_text(
        &self,
        what: &str,
        resp: reqwest::blocking::Response,
    ) -> Result<String, CliError> {
        let text = resp.text().map_err(|e| self.transport_error(what, &e))?;
        Ok(strip_bom(&text).to_string())
    }

    /// Error for a response whose status the caller will not accept.
    pub(crate) fn status_error(&self, what: &str, status: u16, body: &str) -> CliError {
        log::debug!("{} {} response body: {}", self.source_name, what, body);
        let detail = truncate(body.trim(), MAX_ERROR_BODY);
        let message = if detail.is_empty() {
            format!("{} - {} {} returned HTTP {}", FAILURE_PREFIX, self.source_name, what, status)
        } else {
            format!(
                "{} - {} {} returned HTTP {}: {}",
                FAILURE_PREFIX, self.source_name, what, status, detail
            )
        };
        CliError::new(fetch_status_exit_code(status), message)
    }

    pub(crate) fn transport_error(&self, what: &str, err: &reqwest::Error) -> CliError {
        let kind = if err.is_timeout() { "timed out" } else { "failed" };
        CliError::new(
            exit_codes::EXIT_FETCH_UPSTREAM,
            format!("{} - {} {} {}: {}", FAILURE_PREFIX, self.source_name, what, kind, err),
        )
    }

    /// Error for a 200 response that cannot be used.
    pub(crate) fn payload_error(&self, what: &str, detail: impl std::fmt::Display) -> CliError {
        CliError::new(
            exit_codes::EXIT_FETCH_PAYLOAD,
            format!("{} - {} {} response unusable: {}", FAILURE_PREFIX, self.source_name, what, detail),
        )
    }
}

fn is_utc_zone(timezone: &str) -> bool {
    matches!(
        timezone.trim().to_ascii_uppercase().as_str(),
        "UTC" | "ETC/UTC" | "GMT" | "ETC/GMT" | "Z"
    )
}

fn today_for(timezone: &str, now: DateTime<Utc>) -> NaiveDate {
    if is_utc_zone(timezone) {
        now.date_naive()
    } else {
        now.with_timezone(&Local).date_naive()
    }
}

// ── Text helpers ────────────────────────────────────────────────────

/// Drop a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Join a base URL and a path without doubling the slash.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
