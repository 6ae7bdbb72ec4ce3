//! Configuration error types.

use std::fmt;

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while assembling a [`crate::Settings`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {}", FieldErrors(.0))]
    Invalid(Vec<FieldError>),
}

impl ConfigError {
    /// Field problems, if this is a validation error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            ConfigError::Invalid(errors) => errors,
            _ => &[],
        }
    }
}

/// A single missing or malformed setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{field}={value:?} is malformed: {reason}")]
    Malformed {
        field: &'static str,
        value: String,
        reason: String,
    },
}

impl FieldError {
    /// Name of the environment variable this error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            FieldError::Missing(field) => field,
            FieldError::Malformed { field, .. } => field,
        }
    }
}

struct FieldErrors<'a>(&'a [FieldError]);

impl fmt::Display for FieldErrors<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}
