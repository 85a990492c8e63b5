use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {message}", path.display())]
    Read { path: PathBuf, message: String },

    #[error("invalid config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Every required value that is unset, by its setting name.
    #[error("missing required settings: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid setting {name}: {message}")]
    Invalid { name: String, message: String },
}
