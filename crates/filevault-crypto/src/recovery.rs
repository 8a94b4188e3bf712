//! BIP-39 mnemonic backup of a vault key
//!
//! The 256 key bits map directly onto a 24-word phrase. The BIP-39 checksum
//! word lets a mistyped phrase be rejected before it is ever used to decrypt.

use bip39::Mnemonic;
use filevault_core::{VaultError, VaultResult};
use zeroize::{Zeroize, Zeroizing};

use crate::keys::VaultKey;
use crate::KEY_SIZE;

/// Words in a phrase encoding 256 bits of entropy
pub const MNEMONIC_WORDS: usize = 24;

/// Encode a key as a 24-word BIP-39 phrase.
pub fn key_to_mnemonic(key: &VaultKey) -> VaultResult<Zeroizing<String>> {
    let mnemonic = Mnemonic::from_entropy(key.as_bytes())
        .map_err(|e| VaultError::InvalidKeyFormat(format!("BIP-39 encoding failed: {e}")))?;
    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Recover a key from its 24-word BIP-39 phrase.
pub fn key_from_mnemonic(words: &str) -> VaultResult<VaultKey> {
    let normalized = Zeroizing::new(words.split_whitespace().collect::<Vec<_>>().join(" "));
    let count = normalized.split(' ').filter(|w| !w.is_empty()).count();
    if count != MNEMONIC_WORDS {
        return Err(VaultError::InvalidKeyFormat(format!(
            "expected {MNEMONIC_WORDS} words, got {count}"
        )));
    }

    let mnemonic: Mnemonic = normalized
        .parse()
        .map_err(|e| VaultError::InvalidKeyFormat(format!("invalid BIP-39 mnemonic: {e}")))?;

    let (mut entropy, len) = mnemonic.to_entropy_array();
    if len != KEY_SIZE {
        entropy.zeroize();
        return Err(VaultError::InvalidKeyFormat(format!(
            "mnemonic encodes {len} bytes (expected {KEY_SIZE})"
        )));
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&entropy[..KEY_SIZE]);
    entropy.zeroize();
    let key = VaultKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}
