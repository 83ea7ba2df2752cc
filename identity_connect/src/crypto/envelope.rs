//! Encrypted payload envelopes exchanged between identities

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};

use super::{
    CryptoError, SecretBuffer,
    aes_cbc::{self, IV_SIZE, KeyHeader},
};

/// Hybrid envelope: a fresh AES key header wrapped with RSA-OAEP to the key
/// identified by `crc32`, and the body encrypted under that key header.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsaEncryptedPayload {
    pub crc32: u32,
    #[serde_as(as = "Base64")]
    pub rsa_encrypted_key_header: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub key_header_encrypted_data: Vec<u8>,
}

impl RsaEncryptedPayload {
    /// Encrypt `data` under a new key header and wrap the header with `wrap`.
    /// `wrap` receives the 32 byte `key || iv` and returns `(crc32, cipher_text)`.
    pub fn seal<E>(
        data: &[u8],
        wrap: impl FnOnce(&[u8]) -> Result<(u32, Vec<u8>), E>,
    ) -> Result<Self, E>
    where
        E: From<CryptoError>,
    {
        let header = KeyHeader::new_random16();
        let key_header_encrypted_data = header.encrypt_data(data)?;
        let (crc32, rsa_encrypted_key_header) = wrap(header.combine().as_slice())?;

        Ok(Self {
            crc32,
            rsa_encrypted_key_header,
            key_header_encrypted_data,
        })
    }

    /// Decrypt the body given the already RSA-unwrapped key header
    pub fn open(&self, key_header: &SecretBuffer) -> Result<Vec<u8>, CryptoError> {
        let header = KeyHeader::from_combined_bytes(key_header.as_slice())?;
        header.decrypt_data(&self.key_header_encrypted_data)
    }
}

/// Body encrypted with AES-CBC under a secret both sides already share
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedSecretEncryptedPayload {
    #[serde_as(as = "Base64")]
    pub iv: [u8; IV_SIZE],
    #[serde_as(as = "Base64")]
    pub data: Vec<u8>,
}

impl SharedSecretEncryptedPayload {
    pub fn encrypt(data: &[u8], shared_secret: &SecretBuffer) -> Result<Self, CryptoError> {
        let iv = aes_cbc::random_iv();
        let data = aes_cbc::encrypt(data, shared_secret, &iv)?;

        Ok(Self { iv, data })
    }

    pub fn decrypt(&self, shared_secret: &SecretBuffer) -> Result<Vec<u8>, CryptoError> {
        aes_cbc::decrypt(&self.data, shared_secret, &self.iv)
    }
}
