use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{VaultError, VaultResult};

/// Top-level vault configuration (loaded from filevault.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub token: TokenConfig,
    pub kdf: KdfConfig,
}

/// Timestamp acceptance window applied on decryption.
///
/// Both bounds are off by default: encrypted files may be stored indefinitely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Reject tokens older than this many seconds
    pub max_age_secs: Option<u64>,
    /// Reject tokens stamped further than this many seconds in the future
    pub max_clock_skew_secs: Option<u64>,
}

/// Argon2id parameters for passphrase-derived keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl VaultConfig {
    pub fn from_toml_str(s: &str) -> VaultResult<Self> {
        toml::from_str(s).map_err(|e| VaultError::Config(format!("parsing config: {e}")))
    }

    pub fn to_toml_string(&self) -> VaultResult<String> {
        toml::to_string(self).map_err(|e| VaultError::Config(format!("serializing config: {e}")))
    }
}

/// Load a config file from disk.
pub fn load(path: &Path) -> VaultResult<VaultConfig> {
    let text = std::fs::read_to_string(path)?;
    let config = VaultConfig::from_toml_str(&text)?;
    tracing::debug!(path = %path.display(), "loaded vault config");
    Ok(config)
}
