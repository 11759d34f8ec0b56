use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = ConnectError> = std::result::Result<T, E>;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Every way a connect run can stop early.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("{0}")]
    NotFound(String),

    #[error("{context}")]
    Upstream {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("selection cancelled")]
    SelectionCancelled,

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("secret '{secret}' does not contain kubeconfig data under '{field}' key")]
    MalformedCredential { secret: String, field: &'static str },

    #[error("Loading management kubeconfig {}", path.display())]
    Kubeconfig {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Invalid settings: {0}")]
    Settings(String),
}

impl ConnectError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ConnectError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn upstream(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        ConnectError::Upstream {
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn kubeconfig(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        ConnectError::Kubeconfig {
            path: path.into(),
            source: source.into(),
        }
    }
}
