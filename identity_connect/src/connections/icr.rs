//! The identity's inter-connection-registration (ICR) key. Client access
//! tokens received from connected peers are stored encrypted under it; at
//! rest the key itself is wrapped under the master key.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    Error,
    crypto::{SecretBuffer, SymmetricKeyEncryptedAes},
    storage::{ICR_KEYS, Storage},
};

const CURRENT: &str = "current";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IcrKeyRecord {
    master_key_encrypted_icr_key: SymmetricKeyEncryptedAes,
    created_at: DateTime<Utc>,
}

pub struct IcrKeyRing {
    storage: Arc<dyn Storage>,
    lock: AsyncMutex<()>,
}

impl IcrKeyRing {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            lock: AsyncMutex::new(()),
        }
    }

    /// Unwrap the ICR key, if one was created
    pub async fn get(&self, master_key: &SecretBuffer) -> Result<Option<SecretBuffer>, Error> {
        let record: Option<IcrKeyRecord> = self.storage.get_json(ICR_KEYS, CURRENT).await?;

        record
            .map(|record| {
                record
                    .master_key_encrypted_icr_key
                    .decrypt_key_clone(master_key)
                    .map_err(Error::from)
            })
            .transpose()
    }

    /// Unwrap the ICR key, creating it on first use
    pub async fn get_or_create(&self, master_key: &SecretBuffer) -> Result<SecretBuffer, Error> {
        let _guard = self.lock.lock().await;

        if let Some(icr_key) = self.get(master_key).await? {
            return Ok(icr_key);
        }

        let icr_key = SecretBuffer::random_key();
        let record = IcrKeyRecord {
            master_key_encrypted_icr_key: SymmetricKeyEncryptedAes::new(master_key, &icr_key)?,
            created_at: Utc::now(),
        };
        self.storage.upsert_json(ICR_KEYS, CURRENT, &record).await?;
        tracing::info!("created icr key");

        Ok(icr_key)
    }
}
