//! Key derivation: Argon2id passphrase → vault key

use argon2::{Algorithm, Argon2, Params, Version};
use filevault_core::config::KdfConfig;
use filevault_core::{VaultError, VaultResult};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroize;

use crate::keys::VaultKey;
use crate::KEY_SIZE;

/// Size of the Argon2id salt stored next to passphrase-protected data
pub const SALT_SIZE: usize = 16;

/// Argon2id parameters for KDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            mem_cost_kib: config.argon2_mem_cost_kib,
            time_cost: config.argon2_time_cost,
            parallelism: config.argon2_parallelism,
        }
    }
}

/// Generate a random salt for [`derive_key_from_passphrase`].
pub fn generate_salt() -> VaultResult<[u8; SALT_SIZE]> {
    let mut salt = [0u8; SALT_SIZE];
    crate::keys::fill_random(&mut salt)?;
    Ok(salt)
}

/// Derive a 256-bit vault key from a passphrase and salt using Argon2id.
///
/// The salt is not secret but must be kept with the encrypted data; the
/// same passphrase, salt and params always yield the same key.
pub fn derive_key_from_passphrase(
    passphrase: &SecretString,
    salt: &[u8; SALT_SIZE],
    params: &KdfParams,
) -> VaultResult<VaultKey> {
    let argon2_params = Params::new(
        params.mem_cost_kib,
        params.time_cost,
        params.parallelism,
        Some(KEY_SIZE),
    )
    .map_err(|e| VaultError::Config(format!("invalid Argon2id params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut bytes = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut bytes)
        .map_err(|e| VaultError::Config(format!("Argon2id KDF failed: {e}")))?;

    let key = VaultKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}
