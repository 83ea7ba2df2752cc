//! CRC tagged asymmetric key pairs whose private half is stored AES-wrapped.
//!
//! Two kinds are supported:
//!   - RSA (OAEP with SHA-256) for encrypting key headers to an identity
//!   - Ed25519 for signatures
//!
//! Public keys are kept DER encoded (SubjectPublicKeyInfo); the CRC32 of that
//! encoding identifies the key inside a key set.

use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::Signer;
use rsa::{
    Oaep, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{
    CryptoError, SecretBuffer,
    aes_cbc::{self, IV_SIZE},
    digest::{key_crc, reduced_sha256},
};

/// Upper bound for how long an expired key is kept around for decryption
pub const MAX_DEAD_GRACE_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    Rsa,
    Ed25519,
}

impl KeyKind {
    fn name(self) -> &'static str {
        match self {
            KeyKind::Rsa => "rsa",
            KeyKind::Ed25519 => "ed25519",
        }
    }
}

/// Publicly shareable part of a key pair, as served by the public key endpoint
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyData {
    pub kind: KeyKind,
    #[serde_as(as = "Base64")]
    pub public_key: Vec<u8>,
    pub crc32: u32,
    pub expiration: DateTime<Utc>,
}

impl PublicKeyData {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiration
    }

    /// RSA-OAEP-SHA256 encrypt `data` to this key
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if self.kind != KeyKind::Rsa {
            return Err(CryptoError::UnexpectedKeyKind("rsa"));
        }

        let public = RsaPublicKey::from_public_key_der(&self.public_key)?;
        Ok(public.encrypt(&mut rand::rngs::OsRng, Oaep::new::<Sha256>(), data)?)
    }

    /// Verify an Ed25519 signature made by the owner of this key
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
        if self.kind != KeyKind::Ed25519 {
            return Err(CryptoError::UnexpectedKeyKind("ed25519"));
        }

        let verifying_key = ed25519_dalek::VerifyingKey::from_public_key_der(&self.public_key)?;
        let signature = ed25519_dalek::Signature::from_slice(signature)?;

        Ok(verifying_key.verify_strict(data, &signature)?)
    }
}

/// A full key pair; the private key is DER (PKCS#8) encrypted under a wrapping key
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsymmetricKeyPair {
    pub kind: KeyKind,
    pub crc32: u32,
    #[serde_as(as = "Base64")]
    pub public_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    stored_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    iv: [u8; IV_SIZE],
    #[serde_as(as = "Base64")]
    key_hash: [u8; 16],
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AsymmetricKeyPair {
    /// Generate a new RSA key pair of `bits` size, wrapping the private key under `wrapping_key`
    pub fn generate_rsa(
        wrapping_key: &SecretBuffer,
        bits: usize,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let private = RsaPrivateKey::new(&mut rand::rngs::OsRng, bits)?;
        let public_der = RsaPublicKey::from(&private).to_public_key_der()?;
        let private_der = SecretBuffer::from_slice(private.to_pkcs8_der()?.as_bytes());

        Self::assemble(
            KeyKind::Rsa,
            wrapping_key,
            public_der.as_bytes().to_vec(),
            &private_der,
            lifetime,
            now,
        )
    }

    /// Generate a new Ed25519 signing key pair
    pub fn generate_ed25519(
        wrapping_key: &SecretBuffer,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rand::rngs::OsRng);
        let public_der = signing_key.verifying_key().to_public_key_der()?;
        let private_der = SecretBuffer::from_slice(signing_key.to_pkcs8_der()?.as_bytes());

        Self::assemble(
            KeyKind::Ed25519,
            wrapping_key,
            public_der.as_bytes().to_vec(),
            &private_der,
            lifetime,
            now,
        )
    }

    fn assemble(
        kind: KeyKind,
        wrapping_key: &SecretBuffer,
        public_key: Vec<u8>,
        private_der: &SecretBuffer,
        lifetime: Duration,
        now: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let expires_at = now + lifetime;
        if expires_at <= now {
            return Err(CryptoError::KeyEncoding(
                "key lifetime must be positive".to_string(),
            ));
        }

        let iv = aes_cbc::random_iv();
        let stored_key = aes_cbc::encrypt(private_der.as_slice(), wrapping_key, &iv)?;

        Ok(Self {
            kind,
            crc32: key_crc(&public_key),
            public_key,
            stored_key,
            iv,
            key_hash: reduced_sha256(wrapping_key.as_slice()),
            created_at: now,
            expires_at,
        })
    }

    pub fn public_key_data(&self) -> PublicKeyData {
        PublicKeyData {
            kind: self.kind,
            public_key: self.public_key.clone(),
            crc32: self.crc32,
            expiration: self.expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Dead keys are past twice their lifetime, and never kept more than a day
    pub fn is_dead(&self, now: DateTime<Utc>) -> bool {
        let lifetime = self.expires_at - self.created_at;
        let grace = std::cmp::min(lifetime * 2, Duration::hours(MAX_DEAD_GRACE_HOURS));

        now > self.created_at + grace
    }

    /// Whether `wrapping_key` is the key this pair's private key is stored under
    pub fn is_wrapped_by(&self, wrapping_key: &SecretBuffer) -> bool {
        reduced_sha256(wrapping_key.as_slice())[..]
            .ct_eq(&self.key_hash[..])
            .into()
    }

    fn private_der(&self, wrapping_key: &SecretBuffer) -> Result<SecretBuffer, CryptoError> {
        if !self.is_wrapped_by(wrapping_key) {
            return Err(CryptoError::IncorrectKey);
        }

        Ok(SecretBuffer::new(aes_cbc::decrypt(
            &self.stored_key,
            wrapping_key,
            &self.iv,
        )?))
    }

    /// RSA-OAEP-SHA256 encrypt with the public half
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.public_key_data().encrypt(data)
    }

    /// RSA-OAEP-SHA256 decrypt with the private half
    pub fn decrypt(
        &self,
        wrapping_key: &SecretBuffer,
        cipher_text: &[u8],
    ) -> Result<SecretBuffer, CryptoError> {
        if self.kind != KeyKind::Rsa {
            return Err(CryptoError::UnexpectedKeyKind(KeyKind::Rsa.name()));
        }

        let der = self.private_der(wrapping_key)?;
        let private = RsaPrivateKey::from_pkcs8_der(der.as_slice())?;

        Ok(SecretBuffer::new(
            private.decrypt(Oaep::new::<Sha256>(), cipher_text)?,
        ))
    }

    /// Ed25519 sign `data`
    pub fn sign(&self, wrapping_key: &SecretBuffer, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if self.kind != KeyKind::Ed25519 {
            return Err(CryptoError::UnexpectedKeyKind(KeyKind::Ed25519.name()));
        }

        let der = self.private_der(wrapping_key)?;
        let signing_key = ed25519_dalek::SigningKey::from_pkcs8_der(der.as_slice())?;

        Ok(signing_key.sign(data).to_bytes().to_vec())
    }

    /// Re-encrypt the private key under a new wrapping key
    pub fn re_wrap(
        &mut self,
        old_key: &SecretBuffer,
        new_key: &SecretBuffer,
    ) -> Result<(), CryptoError> {
        let der = self.private_der(old_key)?;
        let iv = aes_cbc::random_iv();

        self.stored_key = aes_cbc::encrypt(der.as_slice(), new_key, &iv)?;
        self.iv = iv;
        self.key_hash = reduced_sha256(new_key.as_slice());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // small keys keep the tests fast, OAEP-SHA256 still fits a 32 byte key header
    const TEST_BITS: usize = 1024;

    fn rsa_pair(key: &SecretBuffer) -> AsymmetricKeyPair {
        AsymmetricKeyPair::generate_rsa(key, TEST_BITS, Duration::hours(1), Utc::now()).unwrap()
    }

    #[test]
    fn rsa_encrypt_decrypt() {
        let key = SecretBuffer::random_key();
        let pair = rsa_pair(&key);

        let cipher_text = pair.encrypt(&[1, 2, 3, 4, 5]).unwrap();
        let plain = pair.decrypt(&key, &cipher_text).unwrap();

        assert_eq!(plain.as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(pair.crc32, key_crc(&pair.public_key));
    }

    #[test]
    fn rsa_wrong_wrapping_key() {
        let key = SecretBuffer::random_key();
        let pair = rsa_pair(&key);
        let cipher_text = pair.encrypt(b"data").unwrap();

        let err = pair
            .decrypt(&SecretBuffer::random_key(), &cipher_text)
            .unwrap_err();
        assert!(matches!(err, CryptoError::IncorrectKey));
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        let key = SecretBuffer::random_key();
        let result = AsymmetricKeyPair::generate_ed25519(&key, Duration::zero(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn expiry_and_death() {
        let key = SecretBuffer::random_key();
        let now = Utc::now();
        let pair = AsymmetricKeyPair::generate_ed25519(&key, Duration::seconds(2), now).unwrap();

        assert!(!pair.is_expired(now));
        assert!(!pair.is_dead(now));

        let later = now + Duration::seconds(3);
        assert!(pair.is_expired(later));
        assert!(!pair.is_dead(later));

        let much_later = now + Duration::seconds(6);
        assert!(pair.is_dead(much_later));
    }

    #[test]
    fn long_lived_keys_die_after_a_day() {
        let key = SecretBuffer::random_key();
        let now = Utc::now();
        let pair = AsymmetricKeyPair::generate_ed25519(&key, Duration::hours(48), now).unwrap();

        assert!(!pair.is_dead(now + Duration::hours(23)));
        assert!(pair.is_dead(now + Duration::hours(25)));
    }

    #[test]
    fn sign_verify() {
        let key = SecretBuffer::random_key();
        let pair = AsymmetricKeyPair::generate_ed25519(&key, Duration::hours(1), Utc::now()).unwrap();

        let signature = pair.sign(&key, b"attested").unwrap();
        let public = pair.public_key_data();

        public.verify(b"attested", &signature).unwrap();
        assert!(public.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn re_wrap_moves_private_key() {
        let old = SecretBuffer::random_key();
        let new = SecretBuffer::random_key();
        let mut pair =
            AsymmetricKeyPair::generate_ed25519(&old, Duration::hours(1), Utc::now()).unwrap();

        pair.re_wrap(&old, &new).unwrap();

        assert!(pair.is_wrapped_by(&new));
        assert!(pair.sign(&old, b"x").is_err());
        assert!(pair.sign(&new, b"x").is_ok());
    }
}
