use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::{
    Error,
    config::RemoteKeyCacheConfig,
    crypto::{KeyKind, PublicKeyData, key_crc},
    definitions::{Identity, KeyRole},
    storage::{REMOTE_PUBLIC_KEYS, Storage},
    transport::{RemoteClient, RemoteRequest, Route},
};

/// Public key of another identity as it was last fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteKeyCacheEntry {
    pub owner_identity: Identity,
    pub role: KeyRole,
    pub public_key: PublicKeyData,
}

impl RemoteKeyCacheEntry {
    pub fn crc32(&self) -> u32 {
        self.public_key.crc32
    }
}

fn cache_key(role: KeyRole, identity: &Identity) -> String {
    format!("{role}:{identity}")
}

/// Fetches and caches public keys of remote identities.
///
/// Lookups and invalidations of one role are serialized, so concurrent
/// callers resolving the same missing key cause a single fetch.
pub struct RemoteKeyCache {
    storage: Arc<dyn Storage>,
    client: Arc<dyn RemoteClient>,
    config: RemoteKeyCacheConfig,
    offline: AsyncMutex<()>,
    online: AsyncMutex<()>,
    signing: AsyncMutex<()>,
}

impl RemoteKeyCache {
    pub fn new(
        storage: Arc<dyn Storage>,
        client: Arc<dyn RemoteClient>,
        config: RemoteKeyCacheConfig,
    ) -> Self {
        Self {
            storage,
            client,
            config,
            offline: AsyncMutex::new(()),
            online: AsyncMutex::new(()),
            signing: AsyncMutex::new(()),
        }
    }

    fn lock(&self, role: KeyRole) -> &AsyncMutex<()> {
        match role {
            KeyRole::Offline => &self.offline,
            KeyRole::Online => &self.online,
            KeyRole::Signing => &self.signing,
        }
    }

    /// Cached key of `remote`, fetching it when allowed. An expired cached key
    /// is refetched; whatever the remote then serves is used, expired or not.
    /// A key that cannot be resolved is `Ok(None)`, or [`Error::MissingKey`]
    /// when `fail_if_missing` is set.
    pub async fn resolve(
        &self,
        role: KeyRole,
        remote: &Identity,
        allow_fetch: bool,
        fail_if_missing: bool,
    ) -> Result<Option<PublicKeyData>, Error> {
        let _guard = self.lock(role).lock().await;
        let key = cache_key(role, remote);

        let cached: Option<RemoteKeyCacheEntry> =
            self.storage.get_json(REMOTE_PUBLIC_KEYS, &key).await?;

        if let Some(entry) = cached {
            if !entry.public_key.is_expired(Utc::now()) {
                return Ok(Some(entry.public_key));
            }

            tracing::debug!(%role, %remote, "cached key expired");
        }

        let fetched = if allow_fetch && self.config.allow_fetch {
            self.fetch(role, remote).await
        } else {
            None
        };

        match fetched {
            Some(public_key) => {
                let entry = RemoteKeyCacheEntry {
                    owner_identity: remote.clone(),
                    role,
                    public_key,
                };
                self.storage
                    .upsert_json(REMOTE_PUBLIC_KEYS, &key, &entry)
                    .await?;

                Ok(Some(entry.public_key))
            }
            None if fail_if_missing => Err(Error::MissingKey {
                role,
                identity: remote.clone(),
            }),
            None => Ok(None),
        }
    }

    async fn fetch(&self, role: KeyRole, remote: &Identity) -> Option<PublicKeyData> {
        let request = RemoteRequest::new(Route::PublicKey(role), Vec::new());

        let response = match self.client.send(remote, request).await {
            Ok(response) if response.is_success() => response,
            Ok(response) => {
                tracing::warn!(%role, %remote, status = response.status, "public key fetch rejected");
                return None;
            }
            Err(e) => {
                tracing::warn!(%role, %remote, "public key fetch failed: {e}");
                return None;
            }
        };

        let public_key: PublicKeyData = match serde_json::from_slice(&response.body) {
            Ok(public_key) => public_key,
            Err(e) => {
                tracing::warn!(%role, %remote, "malformed public key response: {e}");
                return None;
            }
        };

        let expected_kind = match role {
            KeyRole::Signing => KeyKind::Ed25519,
            _ => KeyKind::Rsa,
        };

        if public_key.kind != expected_kind || public_key.crc32 != key_crc(&public_key.public_key) {
            tracing::warn!(%role, %remote, crc32 = public_key.crc32, "rejecting fetched public key");
            return None;
        }

        // the remote always holds the private half of the key it serves as current
        if public_key.is_expired(Utc::now()) {
            tracing::debug!(%role, %remote, crc32 = public_key.crc32, "remote serves an expired key");
        }

        tracing::info!(%role, %remote, crc32 = public_key.crc32, "fetched public key");

        Some(public_key)
    }

    /// Drop every cached key of `remote`, forcing a fetch on next use
    pub async fn invalidate(&self, remote: &Identity) -> Result<(), Error> {
        for role in KeyRole::ALL {
            let _guard = self.lock(role).lock().await;
            self.storage
                .delete(REMOTE_PUBLIC_KEYS, &cache_key(role, remote))
                .await?;
        }

        tracing::warn!(%remote, "invalidated cached public keys");

        Ok(())
    }
}
