use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The OS random number generator could not be read.
    #[error("entropy source unavailable: {0}")]
    EntropySource(String),

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("malformed token: {0}")]
    MalformedToken(String),

    #[error("unsupported token version: 0x{0:02x}")]
    UnsupportedVersion(u8),

    /// Tag mismatch. Deliberately does not say whether the key was wrong or
    /// the data was modified.
    #[error("decryption failed: wrong key or corrupted/tampered data")]
    AuthenticationFailure,

    /// The AEAD primitive refused to encrypt (input beyond its length limit).
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("token expired: issued {age_secs}s ago")]
    TokenExpired { age_secs: u64 },

    #[error("token timestamp is {ahead_secs}s in the future")]
    TokenFromFuture { ahead_secs: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Whether a caller can reasonably retry with different input
    /// (another key, another file, a newer build).
    ///
    /// Only a missing entropy source is treated as fatal.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, VaultError::EntropySource(_))
    }
}
