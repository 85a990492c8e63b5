// Resolved run settings
// File values first, environment on top, then required values checked in one pass

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::file::SettingsFile;

pub const ENV_CRITEO_CLIENT_ID: &str = "CRITEO_CLIENT_ID";
pub const ENV_CRITEO_SECRET: &str = "CRITEO_SECRET";
pub const ENV_CRITEO_GBP_IDS: &str = "CRITEO_GBP_IDS";
pub const ENV_CRITEO_EUR_IDS: &str = "CRITEO_EUR_IDS";
pub const ENV_KELKOO_CAMPAIGN_ID: &str = "KELKOO_CAMPAIGN_ID";
pub const ENV_KELKOO_TOKEN: &str = "KELKOO_TOKEN";
pub const ENV_FIXER_KEY: &str = "FIXER_KEY";
pub const ENV_GSHEET: &str = "GSHEET";
pub const ENV_GSHEET_KEY: &str = "GSHEET_KEY";

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_SHEET_RANGE: &str = "A:J";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Settings {
    pub criteo: CriteoSettings,
    pub kelkoo: KelkooSettings,
    pub fixer: FixerSettings,
    pub sheet: SheetSettings,
    pub http: HttpSettings,
}

#[derive(Debug, Clone)]
pub struct CriteoSettings {
    pub client_id: String,
    pub client_secret: String,
    /// Advertisers billed in GBP; pulled separately in that currency.
    pub gbp_advertiser_ids: Vec<String>,
    /// Advertisers billed in EUR.
    pub eur_advertiser_ids: Vec<String>,
    /// Advertiser name → major market.
    pub market_replacements: BTreeMap<String, String>,
    /// Timezone the report days are cut in.
    pub timezone: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KelkooSettings {
    pub campaign_id: String,
    pub token: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FixerSettings {
    pub api_key: String,
    pub base_url: Option<String>,
}

/// Sheet settings stay unresolved until a command actually publishes, so a
/// preview run works without spreadsheet credentials.
#[derive(Debug, Clone)]
pub struct SheetSettings {
    pub key: Option<String>,
    pub credentials: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub range: String,
    pub api_base: Option<String>,
}

/// Everything needed to publish: spreadsheet key, service-account JSON, range.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub key: String,
    pub credentials_json: String,
    pub range: String,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct HttpSettings {
    pub timeout_secs: u64,
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Collects unset required values so they are all reported together.
struct Required {
    missing: Vec<String>,
}

impl Required {
    fn take(&mut self, value: Option<String>, name: &str, env_var: &str) -> String {
        match value {
            Some(v) => v,
            None => {
                self.missing.push(format!("{} ({})", name, env_var));
                String::new()
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_ids(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl Settings {
    /// Load from `path` (must exist) or the default location (optional),
    /// layered with process environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => SettingsFile::read(p)?,
            None => SettingsFile::read_default()?,
        };
        Self::resolve(file, |name| std::env::var(name).ok())
    }

    /// Overlay `env` on `file` and check required values.
    pub fn resolve(
        file: SettingsFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let env = |name: &str| non_empty(env(name));
        let mut required = Required { missing: Vec::new() };

        let criteo = file.criteo;
        let gbp_advertiser_ids = match env(ENV_CRITEO_GBP_IDS) {
            Some(ids) => split_ids(&ids),
            None => criteo.gbp_advertiser_ids,
        };
        let eur_advertiser_ids = match env(ENV_CRITEO_EUR_IDS) {
            Some(ids) => split_ids(&ids),
            None => criteo.eur_advertiser_ids,
        };
        let criteo = CriteoSettings {
            client_id: required.take(
                env(ENV_CRITEO_CLIENT_ID).or(non_empty(criteo.client_id)),
                "criteo.client_id",
                ENV_CRITEO_CLIENT_ID,
            ),
            client_secret: required.take(
                env(ENV_CRITEO_SECRET).or(non_empty(criteo.client_secret)),
                "criteo.client_secret",
                ENV_CRITEO_SECRET,
            ),
            gbp_advertiser_ids,
            eur_advertiser_ids,
            market_replacements: criteo.market_replacements,
            timezone: non_empty(criteo.timezone).unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            base_url: non_empty(criteo.base_url),
        };

        let kelkoo = KelkooSettings {
            campaign_id: required.take(
                env(ENV_KELKOO_CAMPAIGN_ID).or(non_empty(file.kelkoo.campaign_id)),
                "kelkoo.campaign_id",
                ENV_KELKOO_CAMPAIGN_ID,
            ),
            token: required.take(
                env(ENV_KELKOO_TOKEN).or(non_empty(file.kelkoo.token)),
                "kelkoo.token",
                ENV_KELKOO_TOKEN,
            ),
            base_url: non_empty(file.kelkoo.base_url),
        };

        let fixer = FixerSettings {
            api_key: required.take(
                env(ENV_FIXER_KEY).or(non_empty(file.fixer.api_key)),
                "fixer.api_key",
                ENV_FIXER_KEY,
            ),
            base_url: non_empty(file.fixer.base_url),
        };

        let sheet = SheetSettings {
            key: env(ENV_GSHEET_KEY).or(non_empty(file.sheet.key)),
            credentials: env(ENV_GSHEET).or(non_empty(file.sheet.credentials)),
            credentials_file: file.sheet.credentials_file,
            range: non_empty(file.sheet.range).unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string()),
            api_base: non_empty(file.sheet.api_base),
        };

        let timeout_secs = file.http.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "http.timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }

        if !required.missing.is_empty() {
            return Err(ConfigError::Missing(required.missing));
        }

        Ok(Self {
            criteo,
            kelkoo,
            fixer,
            sheet,
            http: HttpSettings { timeout_secs },
        })
    }
}

impl SheetSettings {
    /// Resolve the publish target. Inline credentials win over a credentials file.
    pub fn target(&self) -> Result<SheetTarget, ConfigError> {
        let mut missing = Vec::new();
        if self.key.is_none() {
            missing.push(format!("sheet.key ({})", ENV_GSHEET_KEY));
        }

        let credentials_json = match (&self.credentials, &self.credentials_file) {
            (Some(inline), _) => Some(inline.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
                path: path.clone(),
                message: e.to_string(),
            })?),
            (None, None) => {
                missing.push(format!("sheet.credentials ({}) or sheet.credentials_file", ENV_GSHEET));
                None
            }
        };

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(SheetTarget {
            key: self.key.clone().unwrap_or_default(),
            credentials_json: credentials_json.unwrap_or_default(),
            range: self.range.clone(),
            api_base: self.api_base.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            (ENV_CRITEO_CLIENT_ID, "cid"),
            (ENV_CRITEO_SECRET, "csecret"),
            (ENV_KELKOO_CAMPAIGN_ID, "999"),
            (ENV_KELKOO_TOKEN, "ktoken"),
            (ENV_FIXER_KEY, "fkey"),
        ]
    }

    #[test]
    fn env_only_resolves_with_defaults() {
        let s = Settings::resolve(SettingsFile::default(), env_of(&full_env())).unwrap();
        assert_eq!(s.criteo.client_id, "cid");
        assert_eq!(s.criteo.timezone, DEFAULT_TIMEZONE);
        assert_eq!(s.sheet.range, "A:J");
        assert_eq!(s.http.timeout(), Duration::from_secs(120));
        assert!(s.criteo.gbp_advertiser_ids.is_empty());
    }

    #[test]
    fn all_missing_reported_together() {
        let err = Settings::resolve(SettingsFile::default(), env_of(&[])).unwrap_err();
        match err {
            ConfigError::Missing(names) => {
                assert_eq!(names.len(), 5);
                assert!(names[0].contains("CRITEO_CLIENT_ID"));
                assert!(names.iter().any(|n| n.contains("FIXER_KEY")));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_wins_over_file() {
        let mut file = SettingsFile::default();
        file.criteo.client_id = Some("from-file".into());
        file.criteo.gbp_advertiser_ids = vec!["1".into()];
        let mut env = full_env();
        env.push((ENV_CRITEO_GBP_IDS, "10, 11 ,,12"));
        let s = Settings::resolve(file, env_of(&env)).unwrap();
        assert_eq!(s.criteo.client_id, "cid");
        assert_eq!(s.criteo.gbp_advertiser_ids, vec!["10", "11", "12"]);
    }

    #[test]
    fn blank_env_falls_back_to_file() {
        let mut file = SettingsFile::default();
        file.fixer.api_key = Some("file-key".into());
        let mut env: Vec<(&str, &str)> = full_env().into_iter().filter(|(k, _)| *k != ENV_FIXER_KEY).collect();
        env.push((ENV_FIXER_KEY, "   "));
        let s = Settings::resolve(file, env_of(&env)).unwrap();
        assert_eq!(s.fixer.api_key, "file-key");
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut file = SettingsFile::default();
        file.http.timeout_secs = Some(0);
        let err = Settings::resolve(file, env_of(&full_env())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn sheet_target_requires_key_and_credentials() {
        let s = Settings::resolve(SettingsFile::default(), env_of(&full_env())).unwrap();
        match s.sheet.target().unwrap_err() {
            ConfigError::Missing(names) => assert_eq!(names.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sheet_target_inline_credentials() {
        let mut env = full_env();
        env.push((ENV_GSHEET_KEY, "sheet-key"));
        env.push((ENV_GSHEET, "{\"client_email\":\"x\"}"));
        let s = Settings::resolve(SettingsFile::default(), env_of(&env)).unwrap();
        let target = s.sheet.target().unwrap();
        assert_eq!(target.key, "sheet-key");
        assert!(target.credentials_json.contains("client_email"));
        assert_eq!(target.range, "A:J");
    }

    #[test]
    fn sheet_target_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sa.json");
        std::fs::write(&path, "{\"client_email\":\"svc@example.iam\"}").unwrap();

        let mut file = SettingsFile::default();
        file.sheet.key = Some("k".into());
        file.sheet.credentials_file = Some(path);
        let s = Settings::resolve(file, env_of(&full_env())).unwrap();
        let target = s.sheet.target().unwrap();
        assert!(target.credentials_json.contains("svc@example.iam"));
    }
}
