//! Vault configuration.

use std::path::PathBuf;

use chrono::Duration;
use paper_vault_core::{CipherSuite, DEFAULT_CHUNK_SIZE};
use paper_vault_render::WatermarkStyle;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Configuration for a [`Vault`](crate::Vault).
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory holding ciphertext at rest.
    pub artifact_dir: PathBuf,
    /// Directory for ephemeral plaintext and watermarked files.
    ///
    /// Must be dedicated to one vault: stale ephemeral files found here at
    /// startup are removed.
    pub scratch_dir: PathBuf,
    /// Cipher construction for new and existing ciphertext.
    pub cipher_suite: CipherSuite,
    /// Text drawn on every page of a download.
    pub marker_text: String,
    /// Window length used by `distribute`.
    #[serde(with = "duration_secs")]
    pub default_window: Duration,
    /// Streaming buffer size for encrypt/decrypt.
    pub chunk_size: usize,
    pub watermark: WatermarkStyle,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("artifacts"),
            scratch_dir: std::env::temp_dir().join("paper-vault"),
            cipher_suite: CipherSuite::default(),
            marker_text: "Confidential".to_string(),
            default_window: Duration::hours(2),
            chunk_size: DEFAULT_CHUNK_SIZE,
            watermark: WatermarkStyle::default(),
        }
    }
}

impl VaultConfig {
    /// Default configuration rooted at `dir`: `dir/artifacts` and `dir/scratch`.
    pub fn rooted_at(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            artifact_dir: dir.join("artifacts"),
            scratch_dir: dir.join("scratch"),
            ..Self::default()
        }
    }

    pub fn with_cipher_suite(mut self, suite: CipherSuite) -> Self {
        self.cipher_suite = suite;
        self
    }

    pub fn with_marker_text(mut self, text: impl Into<String>) -> Self {
        self.marker_text = text.into();
        self
    }

    /// Reject values the vault cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.default_window <= Duration::zero() {
            return Err(VaultError::Config("default_window must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(VaultError::Config("chunk_size must be non-zero".into()));
        }
        if self.marker_text.trim().is_empty() {
            return Err(VaultError::Config("marker_text must not be empty".into()));
        }
        if !(0.0..=1.0).contains(&self.watermark.opacity) {
            return Err(VaultError::Config("watermark opacity must be within 0..=1".into()));
        }
        if self.artifact_dir == self.scratch_dir {
            return Err(VaultError::Config(
                "artifact_dir and scratch_dir must differ".into(),
            ));
        }
        Ok(())
    }
}

/// `chrono::Duration` as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Duration::try_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom("duration out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VaultConfig::default();
        assert_eq!(config.marker_text, "Confidential");
        assert_eq!(config.default_window, Duration::hours(2));
        assert_eq!(config.cipher_suite, CipherSuite::Aes256Cbc);
        assert_eq!(config.watermark.font_size, 50.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_json() {
        let config: VaultConfig = serde_json::from_str(
            r#"{ "default_window": 5400, "cipher_suite": "aes256-cbc-blake3" }"#,
        )
        .unwrap();
        assert_eq!(config.default_window, Duration::minutes(90));
        assert_eq!(config.cipher_suite, CipherSuite::Aes256CbcBlake3);
        assert_eq!(config.marker_text, "Confidential");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = VaultConfig::rooted_at("/tmp/pv");
        config.default_window = Duration::zero();
        assert!(config.validate().is_err());

        let config = VaultConfig::rooted_at("/tmp/pv").with_marker_text("  ");
        assert!(config.validate().is_err());

        let mut config = VaultConfig::rooted_at("/tmp/pv");
        config.scratch_dir = config.artifact_dir.clone();
        assert!(config.validate().is_err());
    }
}
