use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// On-disk shape of `config.toml`. Every field is optional here; required
/// values are checked once the environment has been layered on top.
///
/// ```toml
/// [criteo]
/// client_id = "..."
/// gbp_advertiser_ids = ["12345"]
/// eur_advertiser_ids = ["67890"]
/// # Day boundaries for the Criteo report. Defaults to "UTC"; a named zone
/// # should match the host's local zone, which decides the report window.
/// timezone = "Europe/London"
///
/// [criteo.market_replacements]
/// "Acme UK" = "UK"
///
/// [kelkoo]
/// campaign_id = "100200300"
///
/// [sheet]
/// key = "1AbC..."
/// credentials_file = "/etc/cost-uploader/service-account.json"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub criteo: CriteoSection,
    pub kelkoo: KelkooSection,
    pub fixer: FixerSection,
    pub sheet: SheetSection,
    pub http: HttpSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CriteoSection {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub gbp_advertiser_ids: Vec<String>,
    pub eur_advertiser_ids: Vec<String>,
    pub market_replacements: BTreeMap<String, String>,
    pub timezone: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KelkooSection {
    pub campaign_id: Option<String>,
    pub token: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixerSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetSection {
    pub key: Option<String>,
    pub credentials: Option<String>,
    pub credentials_file: Option<PathBuf>,
    pub range: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSection {
    pub timeout_secs: Option<u64>,
}

/// `~/.config/cost-uploader/config.toml` (platform config dir).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cost-uploader")
        .join("config.toml")
}

impl SettingsFile {
    pub fn from_toml(path: &Path, content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read an explicit config file. It must exist.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(path, &content)
    }

    /// Read the default config file if present; otherwise start empty and
    /// rely on the environment.
    pub fn read_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::read(&path)
        } else {
            log::debug!("no config file at {}, using environment only", path.display());
            Ok(Self::default())
        }
    }
}
