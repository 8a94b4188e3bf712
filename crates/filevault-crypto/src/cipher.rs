//! Token encryption/decryption with XChaCha20-Poly1305
//!
//! AAD = version (1 byte) || timestamp (8 bytes BE) || nonce (24 bytes)
//!       || ciphertext length (8 bytes BE)
//!
//! Any change to version, timestamp, nonce, ciphertext or tag fails
//! verification. Poly1305 is checked in constant time before a single
//! plaintext byte is produced.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    Tag, XChaCha20Poly1305, XNonce,
};
use filevault_core::config::TokenConfig;
use filevault_core::{VaultError, VaultResult};
use tracing::debug;
use zeroize::Zeroize;

use crate::codec::{self, Token};
use crate::keys::{derive_token_subkey, fill_random, VaultKey};
use crate::{NONCE_SIZE, TAG_SIZE, TOKEN_VERSION};

/// Timestamp acceptance window, checked after the tag verifies.
///
/// The default enforces nothing: a token is valid for as long as its key is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenPolicy {
    /// Reject tokens older than this
    pub max_age: Option<Duration>,
    /// Reject tokens stamped further than this into the future
    pub max_clock_skew: Option<Duration>,
}

impl From<&TokenConfig> for TokenPolicy {
    fn from(config: &TokenConfig) -> Self {
        Self {
            max_age: config.max_age_secs.map(Duration::from_secs),
            max_clock_skew: config.max_clock_skew_secs.map(Duration::from_secs),
        }
    }
}

impl TokenPolicy {
    fn check(&self, timestamp: u64, now: u64) -> VaultResult<()> {
        if let Some(max_age) = self.max_age {
            let age_secs = now.saturating_sub(timestamp);
            if age_secs > max_age.as_secs() {
                return Err(VaultError::TokenExpired { age_secs });
            }
        }
        if let Some(skew) = self.max_clock_skew {
            let ahead_secs = timestamp.saturating_sub(now);
            if ahead_secs > skew.as_secs() {
                return Err(VaultError::TokenFromFuture { ahead_secs });
            }
        }
        Ok(())
    }
}

/// Authenticated cipher for vault tokens. Stateless apart from its policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCipher {
    policy: TokenPolicy,
}

impl TokenCipher {
    pub fn new(policy: TokenPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    /// Encrypt `plaintext` under `key`, stamped with the current time.
    pub fn encrypt(&self, plaintext: &[u8], key: &VaultKey) -> VaultResult<Token> {
        self.encrypt_at(plaintext, key, unix_now())
    }

    /// Encrypt with an explicit creation timestamp (seconds since the epoch).
    pub fn encrypt_at(&self, plaintext: &[u8], key: &VaultKey, timestamp: u64) -> VaultResult<Token> {
        let mut nonce = [0u8; NONCE_SIZE];
        fill_random(&mut nonce)?;

        let cipher = token_cipher(key, TOKEN_VERSION)?;
        let aad = codec::header(TOKEN_VERSION, timestamp, &nonce, plaintext.len());

        let mut ciphertext = plaintext.to_vec();
        let tag = match cipher.encrypt_in_place_detached(XNonce::from_slice(&nonce), &aad, &mut ciphertext) {
            Ok(tag) => tag,
            Err(e) => {
                ciphertext.zeroize();
                return Err(VaultError::Encryption(format!("token encryption failed: {e}")));
            }
        };

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);

        debug!(key = %key.fingerprint(), bytes = plaintext.len(), timestamp, "encrypted token");

        Ok(Token {
            version: TOKEN_VERSION,
            timestamp,
            nonce,
            ciphertext,
            tag: tag_bytes,
        })
    }

    /// Authenticate and decrypt `token`, then apply the timestamp policy.
    pub fn decrypt(&self, token: &Token, key: &VaultKey) -> VaultResult<Vec<u8>> {
        self.decrypt_at(token, key, unix_now())
    }

    /// Decrypt with an explicit notion of "now" (seconds since the epoch).
    pub fn decrypt_at(&self, token: &Token, key: &VaultKey, now: u64) -> VaultResult<Vec<u8>> {
        let mut plaintext = open_token(token, key)?;

        if let Err(e) = self.policy.check(token.timestamp, now) {
            plaintext.zeroize();
            debug!(key = %key.fingerprint(), timestamp = token.timestamp, now, "token rejected by policy: {e}");
            return Err(e);
        }

        debug!(key = %key.fingerprint(), bytes = plaintext.len(), "decrypted token");
        Ok(plaintext)
    }

    /// The token's creation time, returned only once its tag verifies.
    ///
    /// The timestamp policy is not applied.
    pub fn verified_timestamp(&self, token: &Token, key: &VaultKey) -> VaultResult<u64> {
        let mut plaintext = open_token(token, key)?;
        plaintext.zeroize();
        Ok(token.timestamp)
    }
}

/// Encrypt with the default cipher (no timestamp policy).
pub fn encrypt(plaintext: &[u8], key: &VaultKey) -> VaultResult<Token> {
    TokenCipher::default().encrypt(plaintext, key)
}

/// Decrypt with the default cipher (no timestamp policy).
pub fn decrypt(token: &Token, key: &VaultKey) -> VaultResult<Vec<u8>> {
    TokenCipher::default().decrypt(token, key)
}

/// Version check + AEAD verify/decrypt. No policy.
fn open_token(token: &Token, key: &VaultKey) -> VaultResult<Vec<u8>> {
    if token.version != TOKEN_VERSION {
        return Err(VaultError::UnsupportedVersion(token.version));
    }

    let cipher = token_cipher(key, token.version)?;
    let aad = token.header();

    let mut buffer = token.ciphertext.clone();
    cipher
        .decrypt_in_place_detached(
            XNonce::from_slice(&token.nonce),
            &aad,
            &mut buffer,
            Tag::from_slice(&token.tag),
        )
        .map_err(|_| {
            debug!(key = %key.fingerprint(), "token authentication failed");
            VaultError::AuthenticationFailure
        })?;

    Ok(buffer)
}

fn token_cipher(key: &VaultKey, version: u8) -> VaultResult<XChaCha20Poly1305> {
    let subkey = derive_token_subkey(key, version)?;
    Ok(XChaCha20Poly1305::new((&*subkey).into()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::generate_key;
    use crate::{HEADER_SIZE, KEY_SIZE, MIN_TOKEN_SIZE};
    use proptest::prelude::*;

    fn test_key() -> VaultKey {
        VaultKey::from_bytes([42u8; KEY_SIZE])
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = generate_key().unwrap();
        let plaintext = b"hello, encrypted world!";

        let token = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&token, &key).unwrap();

        assert_eq!(&decrypted, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = generate_key().unwrap();

        let token = encrypt(b"", &key).unwrap();
        assert!(token.ciphertext.is_empty());

        let decrypted = decrypt(&token, &key).unwrap();
        assert_eq!(decrypted, b"");
    }

    #[test]
    fn test_ciphertext_same_length_as_plaintext() {
        let key = test_key();
        let token = encrypt(&[0u8; 1000], &key).unwrap();
        assert_eq!(token.ciphertext.len(), 1000);
        assert_eq!(token.encode().len(), MIN_TOKEN_SIZE + 1000);
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = generate_key().unwrap();
        let key2 = generate_key().unwrap();

        let token = encrypt(b"secret data", &key1).unwrap();
        let result = decrypt(&token, &key2);

        assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let key = test_key();
        let t1 = encrypt(b"same input", &key).unwrap();
        let t2 = encrypt(b"same input", &key).unwrap();

        assert_ne!(t1.nonce, t2.nonce);
        assert_ne!(t1.encode(), t2.encode());
    }

    #[test]
    fn test_tampered_timestamp() {
        let key = test_key();
        let mut token = encrypt(b"secret data", &key).unwrap();
        token.timestamp ^= 1;

        let result = decrypt(&token, &key);
        assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    }

    #[test]
    fn test_tampered_nonce() {
        let key = test_key();
        let mut token = encrypt(b"secret data", &key).unwrap();
        token.nonce[0] ^= 0x01;

        let result = decrypt(&token, &key);
        assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    }

    #[test]
    fn test_unknown_version_rejected_before_authentication() {
        let key = test_key();
        let mut token = encrypt(b"secret data", &key).unwrap();
        token.version = 0x02;

        let result = decrypt(&token, &key);
        assert!(matches!(result, Err(VaultError::UnsupportedVersion(0x02))));
    }

    #[test]
    fn test_default_policy_accepts_ancient_tokens() {
        let key = test_key();
        let token = TokenCipher::default().encrypt_at(b"old", &key, 0).unwrap();

        let decrypted = TokenCipher::default().decrypt_at(&token, &key, u64::MAX).unwrap();
        assert_eq!(decrypted, b"old");
    }

    #[test]
    fn test_max_age_policy() {
        let key = test_key();
        let cipher = TokenCipher::new(TokenPolicy {
            max_age: Some(Duration::from_secs(60)),
            max_clock_skew: None,
        });
        let token = cipher.encrypt_at(b"fresh", &key, 1_000).unwrap();

        assert!(cipher.decrypt_at(&token, &key, 1_060).is_ok());
        let result = cipher.decrypt_at(&token, &key, 1_061);
        assert!(matches!(result, Err(VaultError::TokenExpired { age_secs: 61 })));
    }

    #[test]
    fn test_clock_skew_policy() {
        let key = test_key();
        let cipher = TokenCipher::new(TokenPolicy {
            max_age: None,
            max_clock_skew: Some(Duration::from_secs(30)),
        });
        let token = cipher.encrypt_at(b"early", &key, 2_000).unwrap();

        assert!(cipher.decrypt_at(&token, &key, 1_970).is_ok());
        let result = cipher.decrypt_at(&token, &key, 1_969);
        assert!(matches!(result, Err(VaultError::TokenFromFuture { ahead_secs: 31 })));
    }

    #[test]
    fn test_policy_not_consulted_for_wrong_key() {
        let cipher = TokenCipher::new(TokenPolicy {
            max_age: Some(Duration::from_secs(1)),
            max_clock_skew: Some(Duration::from_secs(1)),
        });
        let token = cipher.encrypt_at(b"x", &test_key(), 0).unwrap();
        let other = VaultKey::from_bytes([7u8; KEY_SIZE]);

        let result = cipher.decrypt_at(&token, &other, 10_000);
        assert!(matches!(result, Err(VaultError::AuthenticationFailure)));
    }

    #[test]
    fn test_policy_from_config() {
        let config = TokenConfig {
            max_age_secs: Some(3600),
            max_clock_skew_secs: None,
        };
        let policy = TokenPolicy::from(&config);
        assert_eq!(policy.max_age, Some(Duration::from_secs(3600)));
        assert_eq!(policy.max_clock_skew, None);
        assert_eq!(TokenPolicy::from(&TokenConfig::default()), TokenPolicy::default());
    }

    #[test]
    fn test_verified_timestamp() {
        let key = test_key();
        let cipher = TokenCipher::default();
        let token = cipher.encrypt_at(b"stamp", &key, 1_234_567).unwrap();

        assert_eq!(cipher.verified_timestamp(&token, &key).unwrap(), 1_234_567);

        let other = VaultKey::from_bytes([1u8; KEY_SIZE]);
        assert!(matches!(
            cipher.verified_timestamp(&token, &other),
            Err(VaultError::AuthenticationFailure)
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn roundtrip_any_plaintext(data in proptest::collection::vec(any::<u8>(), 0..=2048)) {
            let key = test_key();
            let token = encrypt(&data, &key).unwrap();
            prop_assert_eq!(decrypt(&token, &key).unwrap(), data);
        }

        #[test]
        fn any_bit_flip_fails_authentication(
            data in proptest::collection::vec(any::<u8>(), 0..=256),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let key = test_key();
            let mut bytes = encrypt(&data, &key).unwrap().encode();
            // Timestamp, nonce, ciphertext and tag; version and length
            // changes are caught by the decoder instead
            let flippable: Vec<usize> = (1..HEADER_SIZE - 8).chain(HEADER_SIZE..bytes.len()).collect();
            let i = flippable[position.index(flippable.len())];
            bytes[i] ^= 1 << bit;

            let token = Token::decode(&bytes).unwrap();
            prop_assert!(matches!(decrypt(&token, &key), Err(VaultError::AuthenticationFailure)));
        }
    }
}
