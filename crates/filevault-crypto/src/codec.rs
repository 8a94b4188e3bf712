//! Token wire format
//!
//! Version 1 layout (binary):
//! ```text
//! [1 byte: version = 0x01][8 bytes: timestamp, BE seconds][24 bytes: nonce]
//! [8 bytes: ciphertext length N, BE][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! ```
//!
//! Everything before the ciphertext is the header, authenticated as AAD.
//! The explicit length lets a truncated or padded token be rejected here,
//! without a key. Encoding and decoding never touch key material.

use filevault_core::{VaultError, VaultResult};

use crate::{HEADER_SIZE, MIN_TOKEN_SIZE, NONCE_SIZE, TAG_SIZE, TOKEN_VERSION};

const TIMESTAMP_OFFSET: usize = 1;
const NONCE_OFFSET: usize = TIMESTAMP_OFFSET + 8;
const LENGTH_OFFSET: usize = NONCE_OFFSET + NONCE_SIZE;

/// A decoded token: everything needed to authenticate and decrypt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub version: u8,
    /// Creation time, seconds since the UNIX epoch
    pub timestamp: u64,
    pub nonce: [u8; NONCE_SIZE],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_SIZE],
}

impl Token {
    /// Header bytes as they appear on the wire; the AEAD's associated data.
    pub fn header(&self) -> [u8; HEADER_SIZE] {
        header(self.version, self.timestamp, &self.nonce, self.ciphertext.len())
    }

    /// Size of the encoded form in bytes.
    pub fn encoded_len(&self) -> usize {
        MIN_TOKEN_SIZE + self.ciphertext.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.header());
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    pub fn decode(bytes: &[u8]) -> VaultResult<Self> {
        if bytes.len() < MIN_TOKEN_SIZE {
            return Err(VaultError::MalformedToken(format!(
                "token too short: {} bytes (minimum {})",
                bytes.len(),
                MIN_TOKEN_SIZE
            )));
        }

        let version = bytes[0];
        if version != TOKEN_VERSION {
            return Err(VaultError::MalformedToken(format!(
                "unknown layout version 0x{version:02x}"
            )));
        }

        let (header, rest) = bytes.split_at(HEADER_SIZE);
        let (ciphertext, tag_bytes) = rest.split_at(rest.len() - TAG_SIZE);

        let mut length = [0u8; 8];
        length.copy_from_slice(&header[LENGTH_OFFSET..]);
        let declared = u64::from_be_bytes(length);
        if declared != ciphertext.len() as u64 {
            return Err(VaultError::MalformedToken(format!(
                "ciphertext length field says {declared} bytes, token carries {}",
                ciphertext.len()
            )));
        }

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&header[TIMESTAMP_OFFSET..NONCE_OFFSET]);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&header[NONCE_OFFSET..LENGTH_OFFSET]);
        let mut tag = [0u8; TAG_SIZE];
        tag.copy_from_slice(tag_bytes);

        Ok(Self {
            version,
            timestamp: u64::from_be_bytes(timestamp),
            nonce,
            ciphertext: ciphertext.to_vec(),
            tag,
        })
    }
}

/// Serialize a token to bytes.
pub fn encode(token: &Token) -> Vec<u8> {
    token.encode()
}

/// Parse bytes into a token without authenticating it.
pub fn decode(bytes: &[u8]) -> VaultResult<Token> {
    Token::decode(bytes)
}

/// `version || timestamp (BE) || nonce || ciphertext length (BE)`
pub(crate) fn header(
    version: u8,
    timestamp: u64,
    nonce: &[u8; NONCE_SIZE],
    ciphertext_len: usize,
) -> [u8; HEADER_SIZE] {
    let mut out = [0u8; HEADER_SIZE];
    out[0] = version;
    out[TIMESTAMP_OFFSET..NONCE_OFFSET].copy_from_slice(&timestamp.to_be_bytes());
    out[NONCE_OFFSET..LENGTH_OFFSET].copy_from_slice(nonce);
    out[LENGTH_OFFSET..].copy_from_slice(&(ciphertext_len as u64).to_be_bytes());
    out
}
