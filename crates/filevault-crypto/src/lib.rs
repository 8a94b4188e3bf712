//! filevault-crypto: authenticated encryption core for the file vault
//!
//! Pipeline: plaintext → XChaCha20-Poly1305 (subkey via HKDF) → token → bytes
//!
//! Key handling:
//! ```text
//! Vault Key (256-bit, OsRng, or Argon2id from passphrase)
//!   ├── Key file: URL-safe base64, 44 chars (encryption_key.key)
//!   ├── Recovery phrase: 24-word BIP-39 (checksummed)
//!   ├── Fingerprint: BLAKE3 derive-key, 16 hex chars (safe to log)
//!   └── Token subkey v1 (HKDF-SHA256, info="filevault-token-v1")
//!       └── Token AEAD: XChaCha20-Poly1305 (nonce=random_192bit, AAD=token header)
//! ```

pub mod cipher;
pub mod codec;
pub mod kdf;
pub mod keys;
pub mod package;
pub mod recovery;
pub mod rotate;

pub use cipher::{decrypt, encrypt, TokenCipher, TokenPolicy};
pub use codec::{decode, encode, Token};
pub use filevault_core::{VaultError, VaultResult};
pub use kdf::{derive_key_from_passphrase, generate_salt, KdfParams};
pub use keys::{generate_key, validate_key, VaultKey};
pub use package::{open, open_with, seal, Package, PackageMember};
pub use recovery::{key_from_mnemonic, key_to_mnemonic};
pub use rotate::KeyRing;

/// Size of a vault key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_SIZE: usize = 24;

/// Size of a Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;

/// Current token layout version
pub const TOKEN_VERSION: u8 = 0x01;

/// version (1) + timestamp (8) + nonce (24) + ciphertext length (8)
pub const HEADER_SIZE: usize = 1 + 8 + NONCE_SIZE + 8;

/// Smallest valid encoded token: header + tag, empty ciphertext
pub const MIN_TOKEN_SIZE: usize = HEADER_SIZE + TAG_SIZE;
