use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;

use super::{Storage, StorageError};

type Category = BTreeMap<String, Vec<u8>>;

/// Storage backed by process memory, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, Category>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of records in a category
    pub fn count(&self, category: &str) -> Result<usize, StorageError> {
        Ok(self
            .inner
            .read()?
            .get(category)
            .map(|records| records.len())
            .unwrap_or_default())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, category: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self
            .inner
            .read()?
            .get(category)
            .and_then(|records| records.get(key))
            .cloned())
    }

    async fn upsert(&self, category: &str, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.inner
            .write()?
            .entry(category.to_string())
            .or_default()
            .insert(key.to_string(), value.to_vec());

        Ok(())
    }

    async fn delete(&self, category: &str, key: &str) -> Result<(), StorageError> {
        if let Some(records) = self.inner.write()?.get_mut(category) {
            records.remove(key);
        }

        Ok(())
    }

    async fn list(&self, category: &str) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        Ok(self
            .inner
            .read()?
            .get(category)
            .map(|records| {
                records
                    .iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}
