//! Zeroizing byte buffer used for every piece of key material in this crate.

use std::fmt;

use rand::RngCore;
use subtle::{Choice, ConstantTimeEq};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of every symmetric key handled by this crate (AES-128)
pub const KEY_SIZE: usize = 16;

/// An owned byte buffer whose contents are overwritten with zeroes when it is
/// dropped or explicitly wiped.
///
/// There is intentionally no `Clone` implementation: copying key material has to
/// go through [`SecretBuffer::clone_secret`], which leaves a trace in the logs.
#[derive(Zeroize, ZeroizeOnDrop, Default)]
pub struct SecretBuffer(Vec<u8>);

impl SecretBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Copy `bytes` into a new buffer; the caller stays responsible for the source
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }

    /// Generate `len` bytes from the operating system RNG
    pub fn random(len: usize) -> Self {
        let mut bytes = vec![0u8; len];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Generate a fresh 16 byte key
    pub fn random_key() -> Self {
        Self::random(KEY_SIZE)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A buffer is considered wiped once it is empty or all of its bytes are zero
    pub fn is_wiped(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }

    /// Overwrite the contents with zeroes and truncate the buffer
    pub fn wipe(&mut self) {
        self.0.zeroize();
    }

    /// Explicit copy of the key material
    pub fn clone_secret(&self) -> Self {
        tracing::debug!(len = self.0.len(), "cloning secret buffer");
        Self(self.0.clone())
    }

    /// Run `f` with a buffer holding `bytes`; the buffer is wiped on every exit
    /// path of `f`, including early returns through `?`
    pub fn with_secret<T>(bytes: Vec<u8>, f: impl FnOnce(&SecretBuffer) -> T) -> T {
        let secret = SecretBuffer::new(bytes);
        f(&secret)
    }
}

impl From<Vec<u8>> for SecretBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SecretBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ConstantTimeEq for SecretBuffer {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0.as_slice().ct_eq(other.0.as_slice())
    }
}

/// Compares in constant time for buffers of equal length
impl PartialEq for SecretBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SecretBuffer {}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBuffer([REDACTED; {}])", self.0.len())
    }
}
