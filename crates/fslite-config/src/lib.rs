//! Configuration plumbing: the `Config` trait implemented by every
//! component config, and a hot-reloadable `ConfigManager`.

mod manager;

pub use manager::ConfigManager;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("field `{field}` expected {expected}")]
    TypeMismatch { field: String, expected: String },

    #[error("field `{field}` = {value} out of range [{}, {}]",
        .min.as_deref().unwrap_or("-inf"), .max.as_deref().unwrap_or("+inf"))]
    OutOfRange {
        field: String,
        value: String,
        min: Option<String>,
        max: Option<String>,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// A configuration section that can be parsed from TOML and partially
/// updated while the process is running.
pub trait Config: Sized + Send + Sync + 'static {
    fn from_toml(value: &toml::Value) -> Result<Self, ConfigError>;

    /// Copy the hot-updatable fields of `other` into `self`.
    fn hot_update(&mut self, other: &Self);

    /// Render the config back to TOML text.
    fn render(&self) -> String;

    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}
