//! Error types for the decoding session.

use thiserror::Error;

/// Errors raised while loading or validating a [`DecoderConfig`](crate::DecoderConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML document could not be parsed.
    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A frame rate string was not `N` or `N/D`.
    #[error("Invalid frame rate '{0}': expected N or N/D")]
    Framerate(String),

    /// A value is out of range.
    #[error("Configuration error: {0}")]
    Invalid(String),
}
