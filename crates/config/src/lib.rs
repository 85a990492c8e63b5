// Configuration loading
// Read from ~/.config/cost-uploader/config.toml, secrets overridable from the environment

mod error;
mod file;
mod settings;

pub use error::ConfigError;
pub use file::{default_config_path, SettingsFile};
pub use settings::{
    CriteoSettings, FixerSettings, HttpSettings, KelkooSettings, Settings, SheetSettings, SheetTarget,
};
