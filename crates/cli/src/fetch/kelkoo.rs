//! Kelkoo merchant category statistics for one campaign.

use std::time::Duration;

use cost_uploader_config::KelkooSettings;

use crate::CliError;

use super::common::{join_url, FetchClient, ReportWindow};

const KELKOO_API_BASE: &str = "https://api.kelkoogroup.net";

pub struct KelkooClient {
    client: FetchClient,
    campaign_id: String,
    token: String,
    base_url: String,
}

impl KelkooClient {
    pub fn from_settings(settings: &KelkooSettings, timeout: Duration) -> Result<Self, CliError> {
        let base_url = settings.base_url.clone().unwrap_or_else(|| KELKOO_API_BASE.to_string());
        Self::with_base_url(settings.campaign_id.clone(), settings.token.clone(), base_url, timeout)
    }

    pub fn with_base_url(
        campaign_id: String,
        token: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Kelkoo", timeout)?,
            campaign_id,
            token,
            base_url,
        })
    }

    /// Raw JSON body for the window. Only a 200 is accepted; `[]` is a valid
    /// "nothing to report" answer and is returned as-is.
    pub fn fetch(&self, window: &ReportWindow) -> Result<String, CliError> {
        let url = join_url(
            &self.base_url,
            &format!("merchant/statistics/v1/category/{}", self.campaign_id),
        );
        let req = self
            .client
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("startDate", window.start_date()), ("endDate", window.end_date())]);

        let resp = self.client.send("statistics", req)?;
        let status = resp.status().as_u16();
        if status != 200 {
            let body = resp.text().unwrap_or_default();
            return Err(self.client.status_error("statistics", status, &body));
        }
        let text = self.client.read_text("statistics", resp)?;
        log::debug!("Kelkoo statistics: {} bytes", text.len());
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use chrono::NaiveDate;
    use httpmock::prelude::*;

    fn window() -> ReportWindow {
        ReportWindow::trailing(NaiveDate::from_ymd_opt(2024, 3, 3).unwrap())
    }

    fn client(server: &MockServer) -> KelkooClient {
        KelkooClient::with_base_url("987".into(), "kk_token".into(), server.base_url(), Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_fetch_window_and_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/merchant/statistics/v1/category/987")
                .query_param("startDate", "2024-03-01")
                .query_param("endDate", "2024-03-02")
                .header("authorization", "Bearer kk_token");
            then.status(200).body(r#"[{"date":"2024-03-01","clicks":3,"cost":1.2,"currency":"GBP","deviceType":"Computer"}]"#);
        });

        let body = client(&server).fetch(&window()).unwrap();
        mock.assert();
        assert!(body.starts_with("[{"));
    }

    #[test]
    fn test_empty_sentinel_passes_through() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/merchant/statistics/v1/category/987");
            then.status(200).body("[]");
        });
        assert_eq!(client(&server).fetch(&window()).unwrap(), "[]");
    }

    #[test]
    fn test_non_200_success_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/merchant/statistics/v1/category/987");
            then.status(204);
        });
        let err = client(&server).fetch(&window()).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_UPSTREAM);
        assert!(err.message.contains("Kelkoo statistics returned HTTP 204"));
    }

    #[test]
    fn test_forbidden() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/merchant/statistics/v1/category/987");
            then.status(403).json_body(serde_json::json!({ "message": "Forbidden" }));
        });
        let err = client(&server).fetch(&window()).unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
    }
}
