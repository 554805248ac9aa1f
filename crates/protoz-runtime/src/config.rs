// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Codec configuration (frame limits and root-trailer policy).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on a single frame payload (64 MiB).
pub const DEFAULT_MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Value parsed but is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables for [`FrameCodec`](crate::FrameCodec).
///
/// Missing JSON fields fall back to their defaults, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Largest payload accepted on write or read.
    pub max_frame_len: u32,
    /// Compare the root trailer against the frame's own varint prefix.
    pub verify_trailer: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            verify_trailer: true,
        }
    }
}

impl CodecConfig {
    /// Parse a config from JSON bytes.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the config as pretty JSON.
    pub fn to_json_vec(&self) -> Result<Vec<u8>, ConfigError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_frame_len == 0 {
            return Err(ConfigError::Invalid("max_frame_len must be non-zero".into()));
        }
        Ok(())
    }
}
