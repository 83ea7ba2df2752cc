//! Symmetric key wrapping: a key encrypted under another key (AES) and a key split
//! into two halves (XOR).

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use subtle::ConstantTimeEq;

use super::{
    CryptoError, KEY_SIZE, SecretBuffer,
    aes_cbc::{self, IV_SIZE},
    digest::reduced_sha256,
};

/// `secret` encrypted with AES-CBC under an encryption key. The reduced hash of
/// the encryption key is kept so a wrong key is detected before decrypting.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricKeyEncryptedAes {
    #[serde_as(as = "Base64")]
    pub key_iv: [u8; IV_SIZE],
    #[serde_as(as = "Base64")]
    pub key_encrypted: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub key_hash: [u8; 16],
}

impl SymmetricKeyEncryptedAes {
    pub fn new(
        encryption_key: &SecretBuffer,
        secret: &SecretBuffer,
    ) -> Result<Self, CryptoError> {
        let key_iv = aes_cbc::random_iv();
        let key_encrypted = aes_cbc::encrypt(secret.as_slice(), encryption_key, &key_iv)?;

        Ok(Self {
            key_iv,
            key_encrypted,
            key_hash: reduced_sha256(encryption_key.as_slice()),
        })
    }

    /// Returns a fresh copy of the wrapped secret
    pub fn decrypt_key_clone(
        &self,
        encryption_key: &SecretBuffer,
    ) -> Result<SecretBuffer, CryptoError> {
        if !bool::from(reduced_sha256(encryption_key.as_slice())[..].ct_eq(&self.key_hash[..])) {
            return Err(CryptoError::IncorrectKey);
        }

        let key = aes_cbc::decrypt(&self.key_encrypted, encryption_key, &self.key_iv)?;

        Ok(SecretBuffer::new(key))
    }
}

/// A secret split into two halves: this (server retained) half stores
/// `secret XOR half_key`, the caller receives `half_key`. Only both halves
/// together yield the secret; the reduced hash of the secret detects a
/// mismatched half.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymmetricKeyEncryptedXor {
    #[serde_as(as = "Base64")]
    pub key_encrypted: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub key_hash: [u8; 16],
}

impl SymmetricKeyEncryptedXor {
    /// Split `secret`, returning the retained half and the half for the client
    pub fn new(secret: &SecretBuffer) -> Result<(Self, SecretBuffer), CryptoError> {
        if secret.len() != KEY_SIZE {
            return Err(CryptoError::InvalidLength);
        }

        let half_key = SecretBuffer::random_key();
        let key_encrypted = xor(secret.as_slice(), half_key.as_slice());

        Ok((
            Self {
                key_encrypted,
                key_hash: reduced_sha256(secret.as_slice()),
            },
            half_key,
        ))
    }

    /// Recombine the halves. Fails with [`CryptoError::ChecksumMismatch`] when
    /// `half_key` was not issued together with this half.
    pub fn decrypt_key_clone(&self, half_key: &SecretBuffer) -> Result<SecretBuffer, CryptoError> {
        if half_key.len() != self.key_encrypted.len() {
            return Err(CryptoError::InvalidLength);
        }

        let secret = SecretBuffer::new(xor(&self.key_encrypted, half_key.as_slice()));

        if !bool::from(reduced_sha256(secret.as_slice())[..].ct_eq(&self.key_hash[..])) {
            return Err(CryptoError::ChecksumMismatch);
        }

        Ok(secret)
    }
}

fn xor(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aes_wrap_unwrap() {
        let kek = SecretBuffer::random_key();
        let secret = SecretBuffer::random_key();

        let wrapped = SymmetricKeyEncryptedAes::new(&kek, &secret).unwrap();
        let unwrapped = wrapped.decrypt_key_clone(&kek).unwrap();

        assert_eq!(secret.as_slice(), unwrapped.as_slice());
    }

    #[test]
    fn aes_wrong_key_is_detected() {
        let kek = SecretBuffer::random_key();
        let wrapped =
            SymmetricKeyEncryptedAes::new(&kek, &SecretBuffer::random_key()).unwrap();

        let err = wrapped
            .decrypt_key_clone(&SecretBuffer::random_key())
            .unwrap_err();
        assert!(matches!(err, CryptoError::IncorrectKey));
    }

    #[test]
    fn xor_split_recombines() {
        let secret = SecretBuffer::random_key();
        let (server_half, client_half) = SymmetricKeyEncryptedXor::new(&secret).unwrap();

        assert_ne!(server_half.key_encrypted, secret.as_slice());

        let recombined = server_half.decrypt_key_clone(&client_half).unwrap();
        assert_eq!(recombined.as_slice(), secret.as_slice());
    }

    #[test]
    fn xor_foreign_half_fails_checksum() {
        let (server_half, _) = SymmetricKeyEncryptedXor::new(&SecretBuffer::random_key()).unwrap();
        let (_, other_client_half) =
            SymmetricKeyEncryptedXor::new(&SecretBuffer::random_key()).unwrap();

        let err = server_half.decrypt_key_clone(&other_client_half).unwrap_err();
        assert!(matches!(err, CryptoError::ChecksumMismatch));
    }

    #[test]
    fn serializes_as_base64() {
        let wrapped =
            SymmetricKeyEncryptedAes::new(&SecretBuffer::random_key(), &SecretBuffer::random_key())
                .unwrap();
        let json = serde_json::to_string(&wrapped).unwrap();

        assert!(json.contains("keyIv"));
        let back: SymmetricKeyEncryptedAes = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wrapped);
    }
}
