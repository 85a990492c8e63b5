//! Criteo statistics reports: OAuth client-credentials token, then three
//! report pulls (USD full metrics, GBP and EUR cost-only).

use std::time::Duration;

use cost_uploader_config::CriteoSettings;
use cost_uploader_normalize::criteo::CurrencyRole;
use serde::Deserialize;

use crate::exit_codes;
use crate::CliError;

use super::common::{join_url, FetchClient, ReportWindow};

// ── Constants ───────────────────────────────────────────────────────

const CRITEO_API_BASE: &str = "https://api.criteo.com";
const TOKEN_PATH: &str = "oauth2/token";
const REPORT_PATH: &str = "2022-04/statistics/report";
const DIMENSIONS: [&str; 3] = ["Advertiser", "Day", "Device"];

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Raw CSV text of the three pulls, BOM stripped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriteoReports {
    pub usd: String,
    pub gbp: String,
    pub eur: String,
}

// ── Criteo client ───────────────────────────────────────────────────

pub struct CriteoClient {
    client: FetchClient,
    client_id: String,
    client_secret: String,
    timezone: String,
    base_url: String,
}

impl CriteoClient {
    pub fn from_settings(settings: &CriteoSettings, timeout: Duration) -> Result<Self, CliError> {
        let base_url = settings.base_url.clone().unwrap_or_else(|| CRITEO_API_BASE.to_string());
        Self::with_base_url(settings, base_url, timeout)
    }

    pub fn with_base_url(settings: &CriteoSettings, base_url: String, timeout: Duration) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Criteo", timeout)?,
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            timezone: settings.timezone.clone(),
            base_url,
        })
    }

    /// Exchange client credentials for a bearer token.
    pub fn authenticate(&self) -> Result<String, CliError> {
        let url = join_url(&self.base_url, TOKEN_PATH);
        let req = self.client.http.post(&url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ]);

        // A rejected exchange is an auth failure whatever 4xx Criteo picks.
        let resp = self.client.send("token", req).map_err(|mut e| {
            if e.code == exit_codes::EXIT_FETCH_VALIDATION {
                e.code = exit_codes::EXIT_FETCH_AUTH;
            }
            e
        })?;
        let body = self.client.read_text("token", resp)?;

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| self.client.payload_error("token", e))?;
        match token.access_token {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(CliError::new(
                exit_codes::EXIT_FETCH_AUTH,
                format!("{} - {} token response has no access_token", crate::FAILURE_PREFIX, self.client.source_name()),
            )),
        }
    }

    /// One report pull. `advertiser_ids` restricts the report; empty means
    /// every advertiser on the account.
    pub fn fetch_report(
        &self,
        token: &str,
        role: CurrencyRole,
        advertiser_ids: &[String],
        window: &ReportWindow,
    ) -> Result<String, CliError> {
        let url = join_url(&self.base_url, REPORT_PATH);
        let body = report_request(role, advertiser_ids, &self.timezone, window);
        log::debug!("Criteo {} report request: {}", role, body);

        let req = self
            .client
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "text/csv")
            .json(&body);
        let text = self.client.send_text(&format!("{} report", role), req)?;
        log::debug!("Criteo {} report: {} bytes", role, text.len());
        Ok(text)
    }

    /// Authenticate and pull all three reports. A currency whose allowlist
    /// is empty is not requested and comes back as an empty report.
    pub fn fetch_all(
        &self,
        gbp_advertiser_ids: &[String],
        eur_advertiser_ids: &[String],
        window: &ReportWindow,
    ) -> Result<CriteoReports, CliError> {
        let token = self.authenticate()?;

        let usd = self.fetch_report(&token, CurrencyRole::Usd, &[], window)?;
        let gbp = self.fetch_restricted(&token, CurrencyRole::Gbp, gbp_advertiser_ids, window)?;
        let eur = self.fetch_restricted(&token, CurrencyRole::Eur, eur_advertiser_ids, window)?;

        Ok(CriteoReports { usd, gbp, eur })
    }

    fn fetch_restricted(
        &self,
        token: &str,
        role: CurrencyRole,
        advertiser_ids: &[String],
        window: &ReportWindow,
    ) -> Result<String, CliError> {
        if advertiser_ids.is_empty() {
            log::info!("no {} advertisers configured, skipping {} report", role, role);
            return Ok(String::new());
        }
        self.fetch_report(token, role, advertiser_ids, window)
    }
}

/// JSON body of a statistics report request.
fn report_request(
    role: CurrencyRole,
    advertiser_ids: &[String],
    timezone: &str,
    window: &ReportWindow,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "dimensions": DIMENSIONS,
        "metrics": role.metrics(),
        "timezone": timezone,
        "format": "CSV",
        "startDate": window.start_date(),
        "endDate": window.end_date(),
        "currency": role.code(),
    });
    if !advertiser_ids.is_empty() {
        body["advertiserIds"] = serde_json::Value::String(advertiser_ids.join(","));
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use std::collections::BTreeMap;

    fn settings() -> CriteoSettings {
        CriteoSettings {
            client_id: "cid".into(),
            client_secret: "secret".into(),
            gbp_advertiser_ids: vec!["202".into(), "404".into()],
            eur_advertiser_ids: vec!["303".into()],
            market_replacements: BTreeMap::new(),
            timezone: "Europe/London".into(),
            base_url: None,
        }
    }

    fn window() -> ReportWindow {
        ReportWindow::trailing(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
    }

    fn client(server: &MockServer) -> CriteoClient {
        CriteoClient::with_base_url(&settings(), server.base_url(), Duration::from_secs(5)).unwrap()
    }

    fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST)
                .path("/oauth2/token")
                .body_includes("grant_type=client_credentials")
                .body_includes("client_id=cid")
                .body_includes("client_secret=secret");
            then.status(200).json_body(serde_json::json!({
                "access_token": "tok",
                "token_type": "Bearer",
                "expires_in": 900
            }));
        })
    }

    #[test]
    fn test_report_request_usd() {
        let body = report_request(CurrencyRole::Usd, &[], "UTC", &window());
        assert_eq!(
            body,
            serde_json::json!({
                "dimensions": ["Advertiser", "Day", "Device"],
                "metrics": ["Displays", "Clicks", "AdvertiserCost"],
                "timezone": "UTC",
                "format": "CSV",
                "startDate": "2024-03-01",
                "endDate": "2024-03-02",
                "currency": "USD"
            })
        );
    }

    #[test]
    fn test_report_request_restricted() {
        let ids = vec!["202".to_string(), "404".to_string()];
        let body = report_request(CurrencyRole::Gbp, &ids, "UTC", &window());
        assert_eq!(body["metrics"], serde_json::json!(["AdvertiserCost"]));
        assert_eq!(body["currency"], "GBP");
        assert_eq!(body["advertiserIds"], "202,404");
    }

    #[test]
    fn test_authenticate() {
        let server = MockServer::start();
        let mock = mock_token(&server);
        assert_eq!(client(&server).authenticate().unwrap(), "tok");
        mock.assert();
    }

    #[test]
    fn test_authenticate_rejected_is_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(400).json_body(serde_json::json!({ "error": "invalid_client" }));
        });
        let err = client(&server).authenticate().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.starts_with("Auto Cost Uploader has failed - Criteo token"));
    }

    #[test]
    fn test_authenticate_missing_token() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/oauth2/token");
            then.status(200).json_body(serde_json::json!({ "token_type": "Bearer" }));
        });
        let err = client(&server).authenticate().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
    }

    #[test]
    fn test_fetch_all_three_pulls() {
        let server = MockServer::start();
        mock_token(&server);
        let usd = server.mock(|when, then| {
            when.method(POST)
                .path("/2022-04/statistics/report")
                .header("authorization", "Bearer tok")
                .json_body_includes(r#"{"currency":"USD"}"#);
            then.status(200).body("\u{feff}AdvertiserId;Advertiser;Day;Device;Displays;Clicks;AdvertiserCost;Currency\n");
        });
        let gbp = server.mock(|when, then| {
            when.method(POST)
                .path("/2022-04/statistics/report")
                .json_body_includes(r#"{"currency":"GBP","advertiserIds":"202,404"}"#);
            then.status(200).body("AdvertiserId;Advertiser;Day;Device;AdvertiserCost;Currency\n");
        });
        let eur = server.mock(|when, then| {
            when.method(POST)
                .path("/2022-04/statistics/report")
                .json_body_includes(r#"{"currency":"EUR","advertiserIds":"303"}"#);
            then.status(200).body("AdvertiserId;Advertiser;Day;Device;AdvertiserCost;Currency\n");
        });

        let s = settings();
        let reports = client(&server)
            .fetch_all(&s.gbp_advertiser_ids, &s.eur_advertiser_ids, &window())
            .unwrap();

        usd.assert();
        gbp.assert();
        eur.assert();
        assert!(reports.usd.starts_with("AdvertiserId;"));
        assert!(reports.gbp.contains("AdvertiserCost;Currency"));
    }

    #[test]
    fn test_empty_allowlist_skips_pull() {
        let server = MockServer::start();
        mock_token(&server);
        let reports = server.mock(|when, then| {
            when.method(POST).path("/2022-04/statistics/report");
            then.status(200).body("AdvertiserId;Advertiser;Day;Device;Displays;Clicks;AdvertiserCost;Currency\n");
        });

        let out = client(&server).fetch_all(&[], &[], &window()).unwrap();
        reports.assert_calls(1);
        assert!(out.gbp.is_empty());
        assert!(out.eur.is_empty());
    }

    #[test]
    fn test_report_server_error() {
        let server = MockServer::start();
        mock_token(&server);
        server.mock(|when, then| {
            when.method(POST).path("/2022-04/statistics/report");
            then.status(502).body("bad gateway");
        });

        let err = client(&server).fetch_all(&[], &[], &window()).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("Criteo USD report returned HTTP 502: bad gateway"));
    }
}
