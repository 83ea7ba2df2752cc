//! Cryptographic building blocks: zeroizing secrets, AES-CBC, key wrapping,
//! RSA/Ed25519 key pairs and the payload envelopes built on top of them.

mod aes_cbc;
mod asymmetric;
mod digest;
mod envelope;
pub mod error;
mod secret;
mod symmetric;

pub use aes_cbc::{IV_SIZE, KeyHeader};
pub use asymmetric::{AsymmetricKeyPair, KeyKind, MAX_DEAD_GRACE_HOURS, PublicKeyData};
pub use digest::{key_crc, reduced_sha256, sha256};
pub use envelope::{RsaEncryptedPayload, SharedSecretEncryptedPayload};
pub use error::CryptoError;
pub use secret::{KEY_SIZE, SecretBuffer};
pub use symmetric::{SymmetricKeyEncryptedAes, SymmetricKeyEncryptedXor};

