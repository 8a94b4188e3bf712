//! Key rotation: open tokens under any known key, re-seal under the newest
//!
//! Keys are tried in order, primary first. Rotation keeps the token's
//! original timestamp so age-based policies still see the file's real age.

use filevault_core::{VaultError, VaultResult};
use zeroize::Zeroizing;

use crate::cipher::TokenCipher;
use crate::codec::Token;
use crate::keys::VaultKey;

#[derive(Debug, Clone)]
pub struct KeyRing {
    keys: Vec<VaultKey>,
    cipher: TokenCipher,
}

impl KeyRing {
    /// `primary` encrypts; `older` keys are only used to decrypt.
    pub fn new(primary: VaultKey, older: impl IntoIterator<Item = VaultKey>) -> Self {
        let mut keys = vec![primary];
        keys.extend(older);
        Self {
            keys,
            cipher: TokenCipher::default(),
        }
    }

    /// Use `cipher`'s timestamp policy for [`KeyRing::decrypt`].
    pub fn with_cipher(mut self, cipher: TokenCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn primary(&self) -> &VaultKey {
        &self.keys[0]
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> VaultResult<Token> {
        self.cipher.encrypt(plaintext, self.primary())
    }

    /// Decrypt with the first key whose tag verifies.
    pub fn decrypt(&self, token: &Token) -> VaultResult<Vec<u8>> {
        decrypt_any(&self.cipher, &self.keys, token)
    }

    /// Re-encrypt `token` under the primary key with a fresh nonce.
    ///
    /// The timestamp policy is not applied: an expired token can still be
    /// rotated.
    pub fn rotate(&self, token: &Token) -> VaultResult<Token> {
        let plaintext = Zeroizing::new(decrypt_any(&TokenCipher::default(), &self.keys, token)?);
        let rotated = self
            .cipher
            .encrypt_at(&plaintext, self.primary(), token.timestamp)?;
        tracing::debug!(
            key = %self.primary().fingerprint(),
            timestamp = token.timestamp,
            "rotated token to primary key"
        );
        Ok(rotated)
    }
}

fn decrypt_any(cipher: &TokenCipher, keys: &[VaultKey], token: &Token) -> VaultResult<Vec<u8>> {
    for key in keys {
        match cipher.decrypt(token, key) {
            Err(VaultError::AuthenticationFailure) => continue,
            other => return other,
        }
    }
    Err(VaultError::AuthenticationFailure)
}
