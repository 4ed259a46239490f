//! Adapter error type

use std::path::PathBuf;

use pamm_model::{MathError, PammError};

pub type Result<T> = std::result::Result<T, AdapterError>;

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    Pamm(#[from] PammError),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("oracle: {0}")]
    Oracle(String),

    #[error("supply: {0}")]
    Supply(String),

    #[error("config: {0}")]
    Config(String),
}

impl From<MathError> for AdapterError {
    fn from(err: MathError) -> Self {
        AdapterError::Pamm(PammError::Numeric(err))
    }
}

impl AdapterError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AdapterError::Io {
            path: path.into(),
            source,
        }
    }

    /// Shorthand for a caller-side precondition fault
    pub(crate) fn precondition(message: impl Into<String>) -> Self {
        AdapterError::Pamm(PammError::Precondition(message.into()))
    }
}
