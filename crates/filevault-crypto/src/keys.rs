//! Vault keys: generation, key-file encoding, fingerprints, per-layout subkeys

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use filevault_core::{VaultError, VaultResult};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::KEY_SIZE;

/// Length of a key file's contents: base64 of 32 bytes, padded.
pub const ENCODED_KEY_LEN: usize = 44;

const FINGERPRINT_CONTEXT: &str = "filevault 2026 key fingerprint";

/// A 256-bit vault key. Zeroized on drop.
#[derive(Clone)]
pub struct VaultKey {
    bytes: [u8; KEY_SIZE],
}

impl VaultKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Key-file form: URL-safe base64 with padding, 44 ASCII characters.
    pub fn encode(&self) -> Zeroizing<String> {
        Zeroizing::new(URL_SAFE.encode(self.bytes))
    }

    /// Short non-secret identifier for logs and UIs.
    ///
    /// 16 hex chars of a BLAKE3 derive-key hash; reveals nothing about the key bytes.
    pub fn fingerprint(&self) -> String {
        let hash = blake3::Hasher::new_derive_key(FINGERPRINT_CONTEXT)
            .update(&self.bytes)
            .finalize();
        let hex = hash.to_hex().to_string();
        hex[..16].to_string()
    }
}

impl Drop for VaultKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for VaultKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit key from the OS CSPRNG.
pub fn generate_key() -> VaultResult<VaultKey> {
    let mut bytes = [0u8; KEY_SIZE];
    fill_random(&mut bytes)?;
    let key = VaultKey::from_bytes(bytes);
    bytes.zeroize();
    tracing::debug!(key = %key.fingerprint(), "generated vault key");
    Ok(key)
}

/// Parse key-file contents into a key.
///
/// Accepts the output of [`VaultKey::encode`], with surrounding ASCII
/// whitespace tolerated. Does not (and cannot) check that the key matches any
/// particular token.
pub fn validate_key(encoded: &[u8]) -> VaultResult<VaultKey> {
    let trimmed = encoded.trim_ascii();
    if trimmed.len() != ENCODED_KEY_LEN {
        return Err(VaultError::InvalidKeyFormat(format!(
            "expected {} base64 characters, got {}",
            ENCODED_KEY_LEN,
            trimmed.len()
        )));
    }

    let decoded = Zeroizing::new(
        URL_SAFE
            .decode(trimmed)
            .map_err(|e| VaultError::InvalidKeyFormat(format!("base64 decode: {e}")))?,
    );
    if decoded.len() != KEY_SIZE {
        return Err(VaultError::InvalidKeyFormat(format!(
            "decoded key has wrong size: {} bytes (expected {})",
            decoded.len(),
            KEY_SIZE
        )));
    }

    let mut bytes = [0u8; KEY_SIZE];
    bytes.copy_from_slice(&decoded);
    let key = VaultKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Fill `buf` from the OS CSPRNG, surfacing RNG failure as an error.
pub(crate) fn fill_random(buf: &mut [u8]) -> VaultResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| VaultError::EntropySource(e.to_string()))
}

/// Derive the AEAD key for a token layout version via HKDF-SHA256.
pub(crate) fn derive_token_subkey(
    key: &VaultKey,
    version: u8,
) -> VaultResult<Zeroizing<[u8; KEY_SIZE]>> {
    let info = format!("filevault-token-v{version}");
    let hkdf = Hkdf::<Sha256>::new(None, key.as_bytes());
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hkdf.expand(info.as_bytes(), &mut okm[..])
        .map_err(|e| VaultError::Encryption(format!("HKDF expand failed: {e}")))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let k1 = generate_key().unwrap();
        let k2 = generate_key().unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes(), "random keys must differ");
    }

    #[test]
    fn test_encode_validate_roundtrip() {
        let key = generate_key().unwrap();
        let encoded = key.encode();
        assert_eq!(encoded.len(), ENCODED_KEY_LEN);

        let parsed = validate_key(encoded.as_bytes()).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_validate_tolerates_trailing_newline() {
        let key = VaultKey::from_bytes([7u8; KEY_SIZE]);
        let mut file = key.encode().as_bytes().to_vec();
        file.extend_from_slice(b"\r\n");

        let parsed = validate_key(&file).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let result = validate_key(b"dGVzdA==");
        assert!(matches!(result, Err(VaultError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_validate_rejects_raw_bytes() {
        let result = validate_key(&[1u8; KEY_SIZE]);
        assert!(matches!(result, Err(VaultError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_validate_rejects_bad_alphabet() {
        // Standard-alphabet '+' and '/' are not URL-safe base64
        let bad = "++++++++++++++++++++++++++++++++++++++++///=";
        assert_eq!(bad.len(), ENCODED_KEY_LEN);
        let result = validate_key(bad.as_bytes());
        assert!(matches!(result, Err(VaultError::InvalidKeyFormat(_))));
    }

    #[test]
    fn test_debug_is_redacted() {
        let key = VaultKey::from_bytes([0xAB; KEY_SIZE]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("171"), "raw byte values must not appear");
        assert!(!dbg.to_lowercase().contains("abab"));
    }

    #[test]
    fn test_fingerprint_stable_and_distinct() {
        let k1 = VaultKey::from_bytes([1u8; KEY_SIZE]);
        let k2 = VaultKey::from_bytes([2u8; KEY_SIZE]);

        assert_eq!(k1.fingerprint(), k1.clone().fingerprint());
        assert_eq!(k1.fingerprint().len(), 16);
        assert_ne!(k1.fingerprint(), k2.fingerprint());
        assert!(!k1.encode().starts_with(&k1.fingerprint()));
    }

    #[test]
    fn test_subkeys_differ_per_version() {
        let key = VaultKey::from_bytes([42u8; KEY_SIZE]);
        let v1 = derive_token_subkey(&key, 1).unwrap();
        let v2 = derive_token_subkey(&key, 2).unwrap();

        assert_ne!(*v1, *v2, "different layouts must use different subkeys");
        assert_ne!(&*v1, key.as_bytes(), "subkey must not equal the key");
    }
}
