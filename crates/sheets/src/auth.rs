//! Service-account auth.
//!
//! Google service accounts authenticate with a self-signed RS256 JWT that is
//! exchanged at `token_uri` for a short-lived bearer token.

use std::time::Duration;

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::SheetsError;

/// OAuth scope for reading and writing spreadsheet values.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file that auth needs. Extra fields
/// (project id, client id, cert URLs) are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

/// Bearer token returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

impl ServiceAccount {
    /// Parse the JSON key file content. A key pasted into an environment
    /// variable often carries literal newlines inside `private_key`; those are
    /// accepted as if they had been escaped.
    pub fn from_json(json: &str) -> Result<Self, SheetsError> {
        let json = json.trim_start_matches('\u{feff}');
        let account: ServiceAccount = match serde_json::from_str(json) {
            Ok(account) => account,
            Err(strict) => {
                log::debug!("strict credentials parse failed ({}), retrying lenient", strict);
                serde_json::from_str(&escape_raw_controls(json))
                    .map_err(|_| SheetsError::Credentials(strict.to_string()))?
            }
        };
        if account.client_email.trim().is_empty() {
            return Err(SheetsError::Credentials("client_email is empty".into()));
        }
        if account.private_key.trim().is_empty() {
            return Err(SheetsError::Credentials("private_key is empty".into()));
        }
        Ok(account)
    }

    /// Build the signed assertion for the given issue time (unix seconds).
    pub fn assertion(&self, issued_at: i64) -> Result<String, SheetsError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SHEETS_SCOPE,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private_key: {}", e)))?;
        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| SheetsError::Credentials(format!("cannot sign assertion: {}", e)))
    }

    /// Exchange a fresh assertion for an access token.
    pub fn fetch_token(&self, http: &reqwest::blocking::Client) -> Result<AccessToken, SheetsError> {
        let assertion = self.assertion(chrono::Utc::now().timestamp())?;
        log::debug!("requesting sheet token for {}", self.client_email);

        let response = http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .map_err(|e| SheetsError::Network(e.to_string()))?;

        let status = response.status();
        let body = response.text().map_err(|e| SheetsError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(SheetsError::Auth(format!("token endpoint returned {}: {}", status.as_u16(), body)));
        }

        let token: AccessToken = serde_json::from_str(&body)
            .map_err(|e| SheetsError::Parse(format!("token response: {}", e)))?;
        if token.access_token.is_empty() {
            return Err(SheetsError::Auth("token endpoint returned an empty access_token".into()));
        }
        Ok(token)
    }
}

/// Escape raw `\n`, `\r` and `\t` that sit inside JSON string literals.
/// Characters outside strings are structural whitespace and are kept.
fn escape_raw_controls(json: &str) -> String {
    let mut out = String::with_capacity(json.len() + 16);
    let mut in_string = false;
    let mut escaped = false;
    for c in json.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else {
                match c {
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    '\n' => {
                        out.push_str("\\n");
                        continue;
                    }
                    '\r' => {
                        out.push_str("\\r");
                        continue;
                    }
                    '\t' => {
                        out.push_str("\\t");
                        continue;
                    }
                    _ => {}
                }
            }
        } else if c == '"' {
            in_string = true;
        }
        out.push(c);
    }
    out
}

/// Build the blocking client used for both token exchange and API calls.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client, SheetsError> {
    reqwest::blocking::Client::builder()
        .user_agent(format!("cost-uploader/{}", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .map_err(|e| SheetsError::Network(format!("failed to create HTTP client: {}", e)))
}
