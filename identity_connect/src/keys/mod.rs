//! Local asymmetric keys per role, and the cache of public keys published by
//! other identities.

mod key_set;
mod remote_cache;
mod store;

pub use key_set::AsymmetricKeySet;
pub use remote_cache::{RemoteKeyCache, RemoteKeyCacheEntry};
pub use store::{AsymmetricKeyStore, OFFLINE_WRAPPING_KEY, RsaEncryptedBlob};
