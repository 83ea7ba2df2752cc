//! Keyed persistence consumed by the key store and the connection services.
//!
//! Records live in a *category* (a logical table) under a string key; values
//! are opaque bytes, typically JSON produced by the typed helpers on
//! `dyn Storage`.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::Error;

#[cfg(feature = "askar")]
mod askar;
mod memory;

#[cfg(feature = "askar")]
pub use askar::AskarStorage;
pub use memory::MemoryStorage;

pub const CONNECTION_REQUESTS_SENT: &str = "connection_requests_sent";
pub const CONNECTION_REQUESTS_PENDING: &str = "connection_requests_pending";
pub const REMOTE_PUBLIC_KEYS: &str = "remote_public_keys";
pub const KEY_SETS: &str = "asymmetric_key_sets";
pub const ICR_KEYS: &str = "icr_keys";
pub const CONNECTIONS: &str = "connections";

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    #[cfg(feature = "askar")]
    #[error("askar: {0}")]
    Askar(#[from] aries_askar::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

// ANCHOR: storage-trait
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the record stored under `key`
    async fn get(&self, category: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or replace the record stored under `key`
    async fn upsert(&self, category: &str, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Remove the record stored under `key`; removing a missing record succeeds
    async fn delete(&self, category: &str, key: &str) -> Result<(), StorageError>;

    /// All `(key, value)` records of a category
    async fn list(&self, category: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError>;
}
// ANCHOR_END: storage-trait

impl dyn Storage {
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        category: &str,
        key: &str,
    ) -> Result<Option<T>, Error> {
        match self.get(category, key).await? {
            Some(bytes) => Ok(Some(decode(category, &bytes)?)),
            None => Ok(None),
        }
    }

    pub async fn upsert_json<T: Serialize + Sync>(
        &self,
        category: &str,
        key: &str,
        value: &T,
    ) -> Result<(), Error> {
        let bytes = serde_json::to_vec(value)?;
        self.upsert(category, key, &bytes).await?;

        Ok(())
    }

    pub async fn list_json<T: DeserializeOwned>(&self, category: &str) -> Result<Vec<T>, Error> {
        self.list(category)
            .await?
            .iter()
            .map(|(_, bytes)| decode(category, bytes))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(category: &str, bytes: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::error!(category, "could not decode stored record: {e}");
        Error::Corrupt(format!("record in '{category}' could not be decoded"))
    })
}
