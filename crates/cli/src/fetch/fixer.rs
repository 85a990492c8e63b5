//! Fixer (apilayer) GBP→USD rate.

use std::time::Duration;

use cost_uploader_config::FixerSettings;
use rust_decimal::Decimal;

use crate::CliError;

use super::common::{join_url, FetchClient};

const FIXER_API_BASE: &str = "https://api.apilayer.com";

pub struct FixerClient {
    client: FetchClient,
    api_key: String,
    base_url: String,
}

impl FixerClient {
    pub fn from_settings(settings: &FixerSettings, timeout: Duration) -> Result<Self, CliError> {
        let base_url = settings.base_url.clone().unwrap_or_else(|| FIXER_API_BASE.to_string());
        Self::with_base_url(settings.api_key.clone(), base_url, timeout)
    }

    pub fn with_base_url(api_key: String, base_url: String, timeout: Duration) -> Result<Self, CliError> {
        Ok(Self {
            client: FetchClient::new("Fixer", timeout)?,
            api_key,
            base_url,
        })
    }

    /// Current rate for 1 GBP in USD.
    pub fn usd_rate(&self) -> Result<Decimal, CliError> {
        let url = join_url(&self.base_url, "fixer/latest");
        let req = self
            .client
            .http
            .get(&url)
            .header("apikey", &self.api_key)
            .query(&[("symbols", "USD"), ("base", "GBP")]);

        let body = self.client.send_text("rate", req)?;
        let rate = parse_rate(&body).map_err(|detail| self.client.payload_error("rate", detail))?;
        log::debug!("GBP→USD rate {}", rate);
        Ok(rate)
    }
}

/// Pull `rates.USD` out of a latest-rates body.
fn parse_rate(body: &str) -> Result<Decimal, String> {
    let json: serde_json::Value = serde_json::from_str(body).map_err(|e| format!("invalid JSON: {}", e))?;

    if json["success"] == serde_json::Value::Bool(false) {
        let info = json["error"]["info"]
            .as_str()
            .or_else(|| json["error"]["type"].as_str())
            .unwrap_or("success=false");
        return Err(info.to_string());
    }

    let rate = match &json["rates"]["USD"] {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Null => return Err("missing rates.USD".into()),
        other => return Err(format!("rates.USD is not a number: {}", other)),
    };
    let rate = cost_uploader_normalize::amount::parse_decimal(&rate)?
        .ok_or_else(|| "rates.USD is empty".to_string())?;
    if rate <= Decimal::ZERO {
        return Err(format!("rates.USD is not positive: {}", rate));
    }
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;
    use httpmock::prelude::*;
    use rust_decimal_macros::dec;

    fn client(server: &MockServer) -> FixerClient {
        FixerClient::with_base_url("fx_test".into(), server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_parse_rate() {
        let body = r#"{"success":true,"timestamp":1704067200,"base":"GBP","date":"2024-01-01","rates":{"USD":1.272515}}"#;
        assert_eq!(parse_rate(body).unwrap(), dec!(1.272515));
    }

    #[test]
    fn test_parse_rate_failure_info() {
        let body = r#"{"success":false,"error":{"code":101,"type":"invalid_access_key","info":"You have not supplied a valid API Access Key."}}"#;
        assert_eq!(parse_rate(body).unwrap_err(), "You have not supplied a valid API Access Key.");
    }

    #[test]
    fn test_parse_rate_missing_usd() {
        let body = r#"{"success":true,"rates":{"EUR":1.16}}"#;
        assert!(parse_rate(body).unwrap_err().contains("missing rates.USD"));
        assert!(parse_rate(r#"{"rates":{"USD":"x"}}"#).is_err());
        assert!(parse_rate(r#"{"rates":{"USD":0}}"#).is_err());
    }

    #[test]
    fn test_fetch_sends_key_header_and_pair() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/fixer/latest")
                .query_param("symbols", "USD")
                .query_param("base", "GBP")
                .header("apikey", "fx_test");
            then.status(200).json_body(serde_json::json!({
                "success": true,
                "base": "GBP",
                "rates": { "USD": 1.27 }
            }));
        });

        assert_eq!(client(&server).usd_rate().unwrap(), dec!(1.27));
        mock.assert();
    }

    #[test]
    fn test_fetch_unauthorized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/fixer/latest");
            then.status(401).json_body(serde_json::json!({ "message": "Invalid authentication credentials" }));
        });

        let err = client(&server).usd_rate().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_AUTH);
        assert!(err.message.contains("Fixer rate returned HTTP 401"));
    }

    #[test]
    fn test_fetch_payload_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/fixer/latest");
            then.status(200).json_body(serde_json::json!({
                "success": false,
                "error": { "code": 104, "info": "Your monthly usage limit has been reached." }
            }));
        });

        let err = client(&server).usd_rate().unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_FETCH_PAYLOAD);
        assert!(err.message.contains("monthly usage limit"));
    }
}
