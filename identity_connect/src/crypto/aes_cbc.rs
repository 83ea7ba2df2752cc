//! AES-128-CBC with PKCS7 padding, and the key header used by hybrid envelopes

use aes::Aes128;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::RngCore;

use super::{CryptoError, KEY_SIZE, SecretBuffer};

pub const IV_SIZE: usize = 16;

type Encryptor = cbc::Encryptor<Aes128>;
type Decryptor = cbc::Decryptor<Aes128>;

pub fn random_iv() -> [u8; IV_SIZE] {
    let mut iv = [0u8; IV_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

pub fn encrypt(data: &[u8], key: &SecretBuffer, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Encryptor::new_from_slices(key.as_slice(), iv)?;
    Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(data))
}

pub fn decrypt(cipher_text: &[u8], key: &SecretBuffer, iv: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Decryptor::new_from_slices(key.as_slice(), iv)?;
    Ok(cipher.decrypt_padded_vec_mut::<Pkcs7>(cipher_text)?)
}

/// A random AES key plus IV, transported RSA-wrapped as `key || iv`
#[derive(Debug)]
pub struct KeyHeader {
    pub aes_key: SecretBuffer,
    pub iv: [u8; IV_SIZE],
}

impl KeyHeader {
    pub fn new_random16() -> Self {
        Self {
            aes_key: SecretBuffer::random_key(),
            iv: random_iv(),
        }
    }

    pub fn combine(&self) -> SecretBuffer {
        let mut combined = Vec::with_capacity(KEY_SIZE + IV_SIZE);
        combined.extend_from_slice(self.aes_key.as_slice());
        combined.extend_from_slice(&self.iv);
        SecretBuffer::new(combined)
    }

    pub fn from_combined_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != KEY_SIZE + IV_SIZE {
            return Err(CryptoError::InvalidLength);
        }

        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&bytes[KEY_SIZE..]);

        Ok(Self {
            aes_key: SecretBuffer::from_slice(&bytes[..KEY_SIZE]),
            iv,
        })
    }

    pub fn encrypt_data(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        encrypt(data, &self.aes_key, &self.iv)
    }

    pub fn decrypt_data(&self, cipher_text: &[u8]) -> Result<Vec<u8>, CryptoError> {
        decrypt(cipher_text, &self.aes_key, &self.iv)
    }
}
