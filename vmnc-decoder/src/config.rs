//! Session configuration.
//!
//! Decoding itself needs no configuration. The optional frame rate only
//! stamps presentation times onto emitted frames. The buffer limit bounds
//! how much input may be held while waiting for a record to complete, and the
//! framebuffer limit bounds the storage a format rectangle may declare.
//!
//! ```toml
//! max_buffered_bytes = 16777216
//! max_framebuffer_bytes = 67108864
//!
//! [framerate]
//! numerator = 30
//! denominator = 1
//! ```

use crate::errors::ConfigError;
use anyhow::Context;
use rfb_encodings::DEFAULT_MAX_FRAMEBUFFER_BYTES;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Complete decoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Output frame rate used for frame timestamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framerate: Option<Framerate>,
    /// Largest record the session will buffer, in bytes.
    #[serde(default = "default_max_buffered_bytes")]
    pub max_buffered_bytes: usize,
    /// Largest framebuffer a format rectangle may allocate, in bytes.
    #[serde(default = "default_max_framebuffer_bytes")]
    pub max_framebuffer_bytes: usize,
}

fn default_max_buffered_bytes() -> usize {
    64 * 1024 * 1024
}

fn default_max_framebuffer_bytes() -> usize {
    DEFAULT_MAX_FRAMEBUFFER_BYTES
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            framerate: None,
            max_buffered_bytes: default_max_buffered_bytes(),
            max_framebuffer_bytes: default_max_framebuffer_bytes(),
        }
    }
}

impl DecoderConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> DecoderConfigBuilder {
        DecoderConfigBuilder::default()
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(framerate) = &self.framerate {
            framerate.validate()?;
        }

        if self.max_buffered_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_buffered_bytes must be greater than 0".to_string(),
            ));
        }

        if self.max_framebuffer_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_framebuffer_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Frame rate as a rational number of frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framerate {
    pub numerator: u32,
    #[serde(default = "default_denominator")]
    pub denominator: u32,
}

fn default_denominator() -> u32 {
    1
}

impl Framerate {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.numerator == 0 {
            return Err(ConfigError::Invalid(
                "Frame rate numerator cannot be 0".to_string(),
            ));
        }
        if self.denominator == 0 {
            return Err(ConfigError::Invalid(
                "Frame rate denominator cannot be 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Display duration of one frame.
    pub fn frame_duration(&self) -> Duration {
        self.pts(1)
    }

    /// Presentation time of frame `index`.
    ///
    /// Computed from the index rather than accumulated, so it never drifts.
    pub fn pts(&self, index: u64) -> Duration {
        if self.numerator == 0 {
            return Duration::ZERO;
        }
        let nanos = u128::from(index) * u128::from(self.denominator) * 1_000_000_000
            / u128::from(self.numerator);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

impl FromStr for Framerate {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::Framerate(s.to_string());
        let (numerator, denominator) = match s.split_once('/') {
            Some((n, d)) => (n.trim(), d.trim()),
            None => (s.trim(), "1"),
        };
        let framerate = Self::new(
            numerator.parse().map_err(|_| invalid())?,
            denominator.parse().map_err(|_| invalid())?,
        );
        framerate.validate()?;
        Ok(framerate)
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Builder for [`DecoderConfig`].
#[derive(Debug, Default)]
pub struct DecoderConfigBuilder {
    config: DecoderConfig,
}

impl DecoderConfigBuilder {
    /// Sets the output frame rate.
    #[must_use]
    pub fn framerate(mut self, framerate: Framerate) -> Self {
        self.config.framerate = Some(framerate);
        self
    }

    /// Sets the largest record the session will buffer.
    #[must_use]
    pub fn max_buffered_bytes(mut self, limit: usize) -> Self {
        self.config.max_buffered_bytes = limit;
        self
    }

    /// Sets the largest framebuffer a format rectangle may allocate.
    #[must_use]
    pub fn max_framebuffer_bytes(mut self, limit: usize) -> Self {
        self.config.max_framebuffer_bytes = limit;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<DecoderConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
