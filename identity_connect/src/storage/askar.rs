use aries_askar::{ErrorKind, StoreKeyMethod, entry::EntryOperation};
use async_trait::async_trait;

use super::{Storage, StorageError};

/// Storage in an encrypted Aries Askar store (sqlite or postgres)
pub struct AskarStorage {
    inner: aries_askar::Store,
    url: String,
}

impl AskarStorage {
    /// Provision a new store at `url`
    pub async fn new(url: &str, password: &[u8]) -> Result<Self, StorageError> {
        let pass_key = aries_askar::Store::new_raw_key(Some(password))?;

        let inner =
            aries_askar::Store::provision(url, StoreKeyMethod::RawKey, pass_key, None, true)
                .await?;

        Ok(Self {
            inner,
            url: url.to_string(),
        })
    }

    /// Open an existing store
    pub async fn open(url: &str, password: &[u8]) -> Result<Self, StorageError> {
        let pass_key = aries_askar::Store::new_raw_key(Some(password))?;

        let inner =
            aries_askar::Store::open(url, Some(StoreKeyMethod::RawKey), pass_key, None).await?;

        Ok(Self {
            inner,
            url: url.to_string(),
        })
    }

    pub async fn close(self) -> Result<(), StorageError> {
        self.inner.close().await?;

        Ok(())
    }

    /// Close and delete the store
    pub async fn destroy(self) -> Result<(), StorageError> {
        self.inner.close().await?;
        aries_askar::Store::remove(&self.url).await?;

        Ok(())
    }
}

#[async_trait]
impl Storage for AskarStorage {
    async fn get(&self, category: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let mut conn = self.inner.session(None).await?;
        let value = conn
            .fetch(category, key, false)
            .await?
            .map(|e| e.value.to_vec());
        conn.commit().await?;

        Ok(value)
    }

    async fn upsert(&self, category: &str, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut conn = self.inner.session(None).await?;

        if let Err(e) = conn.insert(category, key, value, None, None).await {
            if e.kind() == ErrorKind::Duplicate {
                conn.update(EntryOperation::Replace, category, key, Some(value), None, None)
                    .await?;
            } else {
                Err(StorageError::from(e))?;
            }
        }

        conn.commit().await?;

        Ok(())
    }

    async fn delete(&self, category: &str, key: &str) -> Result<(), StorageError> {
        let mut conn = self.inner.session(None).await?;

        if let Err(e) = conn.remove(category, key).await {
            if e.kind() != ErrorKind::NotFound {
                Err(StorageError::from(e))?;
            }
        }

        conn.commit().await?;

        Ok(())
    }

    async fn list(&self, category: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let mut conn = self.inner.session(None).await?;
        let results = conn
            .fetch_all(Some(category), None, None, None, false, false)
            .await?;
        conn.commit().await?;

        Ok(results
            .iter()
            .map(|entry| (entry.name.clone(), entry.value.to_vec()))
            .collect())
    }
}
