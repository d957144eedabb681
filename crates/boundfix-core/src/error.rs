// ── Core error types ──
//
// User-facing errors from boundfix-core. The `From<boundfix_api::Error>`
// impl translates transport-layer errors into domain-appropriate variants;
// consumers never match on reqwest or serde errors directly.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach boundary service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to boundary service timed out")]
    Timeout,

    // ── Service errors ───────────────────────────────────────────────
    #[error("Boundary service returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Unexpected response from boundary service: {message}")]
    Deserialization { message: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Unknown layer: {layer}")]
    UnknownLayer { layer: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status of the failed response, if the service answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<boundfix_api::Error> for CoreError {
    fn from(err: boundfix_api::Error) -> Self {
        match err {
            boundfix_api::Error::Http { status, body } => CoreError::Http {
                status,
                message: body,
            },
            boundfix_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if let Some(status) = e.status() {
                    CoreError::Http {
                        status: status.as_u16(),
                        message: e.to_string(),
                    }
                } else if e.is_decode() {
                    CoreError::Deserialization {
                        message: e.to_string(),
                    }
                } else {
                    CoreError::Internal(e.to_string())
                }
            }
            boundfix_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            boundfix_api::Error::CannotBeABase(url) => CoreError::Config {
                message: format!("URL cannot be used as a base: {url}"),
            },
            boundfix_api::Error::Deserialization { message, body: _ } => {
                CoreError::Deserialization { message }
            }
        }
    }
}
