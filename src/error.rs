//! Error types for the Graph inbox client.

use std::io;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credential construction or token acquisition failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// A Graph call failed, either in transport or with an error status.
    #[error("Graph API error{}: {message}", status_suffix(.status))]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Reading the menu choice or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn api(status: Option<u16>, msg: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: msg.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::api(e.status().map(|s| s.as_u16()), e.to_string())
    }
}
