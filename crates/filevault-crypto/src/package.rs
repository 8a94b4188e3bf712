//! Encrypted file + key bundle handed to the caller for download
//!
//! The core decides what goes in the bundle and what each member is called;
//! writing the actual archive is left to the caller.

use filevault_core::VaultResult;
use zeroize::Zeroizing;

use crate::cipher::TokenCipher;
use crate::codec::Token;
use crate::keys::{generate_key, VaultKey};

/// Archive member holding the encoded token
pub const ENCRYPTED_MEMBER_NAME: &str = "encrypted_file.enc";
/// Archive member holding the key file
pub const KEY_MEMBER_NAME: &str = "encryption_key.key";
/// Suggested name for the archive bundling both members
pub const ARCHIVE_NAME: &str = "encrypted_package.zip";
/// Suggested name for a decrypted output file
pub const DECRYPTED_FILE_NAME: &str = "decrypted_file";

/// One named file inside a package archive.
pub struct PackageMember {
    pub name: &'static str,
    pub contents: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for PackageMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageMember")
            .field("name", &self.name)
            .field("len", &self.contents.len())
            .finish()
    }
}

/// An encoded token paired with the key that opens it.
#[derive(Debug, Clone)]
pub struct Package {
    token: Vec<u8>,
    key: VaultKey,
}

impl Package {
    /// The encoded token (contents of [`ENCRYPTED_MEMBER_NAME`]).
    pub fn token_bytes(&self) -> &[u8] {
        &self.token
    }

    pub fn key(&self) -> &VaultKey {
        &self.key
    }

    /// The key file (contents of [`KEY_MEMBER_NAME`]).
    pub fn key_file(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.key.encode().as_bytes().to_vec())
    }

    /// Both archive members, token first.
    pub fn members(&self) -> [PackageMember; 2] {
        [
            PackageMember {
                name: ENCRYPTED_MEMBER_NAME,
                contents: Zeroizing::new(self.token.clone()),
            },
            PackageMember {
                name: KEY_MEMBER_NAME,
                contents: self.key_file(),
            },
        ]
    }

    pub fn into_parts(self) -> (Vec<u8>, VaultKey) {
        (self.token, self.key)
    }
}

/// Encrypt `plaintext` into a package, generating a key if none is supplied.
pub fn seal(plaintext: &[u8], key: Option<VaultKey>) -> VaultResult<Package> {
    let key = match key {
        Some(key) => key,
        None => generate_key()?,
    };
    let token = TokenCipher::default().encrypt(plaintext, &key)?;
    tracing::debug!(key = %key.fingerprint(), bytes = plaintext.len(), "sealed package");
    Ok(Package {
        token: token.encode(),
        key,
    })
}

/// Decode and decrypt an encoded token with the default cipher.
pub fn open(token_bytes: &[u8], key: &VaultKey) -> VaultResult<Vec<u8>> {
    open_with(&TokenCipher::default(), token_bytes, key)
}

/// Decode and decrypt an encoded token, applying `cipher`'s timestamp policy.
pub fn open_with(cipher: &TokenCipher, token_bytes: &[u8], key: &VaultKey) -> VaultResult<Vec<u8>> {
    let token = Token::decode(token_bytes)?;
    cipher.decrypt(&token, key)
}
