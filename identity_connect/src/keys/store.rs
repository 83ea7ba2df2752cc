use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use tokio::sync::Mutex as AsyncMutex;

use super::AsymmetricKeySet;
use crate::{
    Error,
    config::KeyStoreConfig,
    crypto::{
        AsymmetricKeyPair, CryptoError, PublicKeyData, RsaEncryptedPayload, SecretBuffer,
    },
    definitions::KeyRole,
    storage::{KEY_SETS, Storage},
};

/// Wrapping key of the offline role. Offline private keys are usable without
/// the owner, so only storage access control protects them.
pub const OFFLINE_WRAPPING_KEY: [u8; 16] = [0; 16];

/// RSA ciphertext plus the CRC of the key that produced it
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsaEncryptedBlob {
    pub crc32: u32,
    #[serde_as(as = "Base64")]
    pub cipher_text: Vec<u8>,
}

#[derive(Default)]
struct RoleLocks {
    offline: AsyncMutex<()>,
    online: AsyncMutex<()>,
    signing: AsyncMutex<()>,
}

impl RoleLocks {
    fn get(&self, role: KeyRole) -> &AsyncMutex<()> {
        match role {
            KeyRole::Offline => &self.offline,
            KeyRole::Online => &self.online,
            KeyRole::Signing => &self.signing,
        }
    }
}

/// Owner of this identity's asymmetric keys, one [`AsymmetricKeySet`] per role.
///
/// Creation and rotation of a role's set happen under that role's lock, so
/// two concurrent rotations can never both commit a current key.
pub struct AsymmetricKeyStore {
    storage: Arc<dyn Storage>,
    config: KeyStoreConfig,
    locks: RoleLocks,
    last_rotation_check: Mutex<Option<Instant>>,
}

impl AsymmetricKeyStore {
    pub fn new(storage: Arc<dyn Storage>, config: KeyStoreConfig) -> Self {
        Self {
            storage,
            config,
            locks: RoleLocks::default(),
            last_rotation_check: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &KeyStoreConfig {
        &self.config
    }

    /// Stored key set of a role
    pub async fn key_set(&self, role: KeyRole) -> Result<Option<AsymmetricKeySet>, Error> {
        self.storage.get_json(KEY_SETS, role.as_str()).await
    }

    async fn save(&self, role: KeyRole, set: &AsymmetricKeySet) -> Result<(), Error> {
        self.storage.upsert_json(KEY_SETS, role.as_str(), set).await
    }

    /// Current key of `role`. The offline set is created on first use and its
    /// key rotated once expired. Online and signing keys need the master key,
    /// so they come from [`Self::rotate_or_create`] and an expired one is
    /// served until the owner is back.
    pub async fn get_current(&self, role: KeyRole) -> Result<AsymmetricKeyPair, Error> {
        if let Some(current) = self.key_set(role).await?.and_then(|set| set.current().cloned()) {
            if role != KeyRole::Offline || !current.is_expired(Utc::now()) {
                return Ok(current);
            }
        }

        match role {
            KeyRole::Offline => self.rotate_or_create(role, None).await,
            _ => Err(Error::KeysNotInitialized(role)),
        }
    }

    /// Generate a new current key when there is none, it expired, or it is
    /// older than the rotation interval. The updated set is only persisted
    /// after the new key was generated and wrapped.
    pub async fn rotate_or_create(
        &self,
        role: KeyRole,
        master_key: Option<&SecretBuffer>,
    ) -> Result<AsymmetricKeyPair, Error> {
        let _guard = self.locks.get(role).lock().await;
        let now = Utc::now();

        let mut set = self.key_set(role).await?.unwrap_or_default();
        let max_age = chrono::Duration::from_std(self.config.rotation_interval)
            .map_err(|_| Error::InvalidOperation("rotation interval out of range".into()))?;

        if !set.needs_rotation(now, max_age) {
            if let Some(current) = set.current() {
                return Ok(current.clone());
            }
        }

        let current = with_wrapping_key(role, master_key, |wrapping_key| {
            if let Some(current) = set.current() {
                if !current.is_wrapped_by(wrapping_key) {
                    return Err(Error::Security(format!(
                        "{role} keys are not protected by the given master key"
                    )));
                }
            }

            self.generate_into(role, &mut set, wrapping_key)
        })?;

        self.save(role, &set).await?;
        tracing::info!(%role, crc32 = current.crc32, keys = set.len(), "rotated key");

        Ok(current)
    }

    fn generate_into(
        &self,
        role: KeyRole,
        set: &mut AsymmetricKeySet,
        wrapping_key: &SecretBuffer,
    ) -> Result<AsymmetricKeyPair, Error> {
        let now = Utc::now();
        let lifetime = chrono::Duration::from_std(self.config.key_ttl)
            .map_err(|_| Error::InvalidOperation("key ttl out of range".into()))?;

        // a CRC collision with a key still in the set is astronomically rare; regenerate
        for _ in 0..3 {
            let key = match role {
                KeyRole::Offline | KeyRole::Online => AsymmetricKeyPair::generate_rsa(
                    wrapping_key,
                    self.config.rsa_key_bits,
                    lifetime,
                    now,
                )?,
                KeyRole::Signing => AsymmetricKeyPair::generate_ed25519(wrapping_key, lifetime, now)?,
            };

            match set.rotate(key.clone(), self.config.max_keys, now) {
                Ok(()) => return Ok(key),
                Err(_) => tracing::warn!(%role, crc32 = key.crc32, "crc collision, regenerating"),
            }
        }

        Err(Error::Internal)
    }

    /// Create the key sets of every role for a new identity
    pub async fn create_initial_keys(&self, master_key: &SecretBuffer) -> Result<(), Error> {
        for role in [KeyRole::Online, KeyRole::Signing] {
            if self.key_set(role).await?.is_some() {
                return Err(Error::Security(format!("{role} keys already exist")));
            }
        }

        self.rotate_or_create(KeyRole::Offline, None).await?;
        self.rotate_or_create(KeyRole::Online, Some(master_key))
            .await?;
        self.rotate_or_create(KeyRole::Signing, Some(master_key))
            .await?;

        Ok(())
    }

    /// Public half of the current key of `role`
    pub async fn public_key(&self, role: KeyRole) -> Result<PublicKeyData, Error> {
        Ok(self.get_current(role).await?.public_key_data())
    }

    /// RSA-OAEP decrypt `cipher_text` with the key of `role` whose public key has CRC `crc32`
    pub async fn decrypt_with(
        &self,
        role: KeyRole,
        crc32: u32,
        cipher_text: &[u8],
        master_key: Option<&SecretBuffer>,
    ) -> Result<SecretBuffer, Error> {
        let set = self.key_set(role).await?.unwrap_or_default();
        let Some(key) = set.find(crc32) else {
            tracing::warn!(%role, crc32, "no key matches crc");
            return Err(Error::InvalidPublicKey { role, crc32 });
        };

        with_wrapping_key(role, master_key, |wrapping_key| {
            key.decrypt(wrapping_key, cipher_text).map_err(|e| match e {
                CryptoError::IncorrectKey | CryptoError::Unpad | CryptoError::KeyEncoding(_) => {
                    tracing::warn!(%role, crc32, "private key could not be recovered: {e}");
                    Error::InvalidPublicKey { role, crc32 }
                }
                e => Error::from(e),
            })
        })
    }

    /// RSA-OAEP encrypt with the current key of `role`
    pub async fn encrypt_for_role(
        &self,
        role: KeyRole,
        plain_text: &[u8],
    ) -> Result<RsaEncryptedBlob, Error> {
        let current = self.get_current(role).await?;

        Ok(RsaEncryptedBlob {
            crc32: current.crc32,
            cipher_text: current.encrypt(plain_text)?,
        })
    }

    /// Hybrid encrypt `data` to the current key of `role`
    pub async fn encrypt_payload(
        &self,
        role: KeyRole,
        data: &[u8],
    ) -> Result<RsaEncryptedPayload, Error> {
        let current = self.get_current(role).await?;

        RsaEncryptedPayload::seal(data, |key_header| {
            Ok::<_, Error>((current.crc32, current.encrypt(key_header)?))
        })
    }

    pub async fn decrypt_payload(
        &self,
        role: KeyRole,
        payload: &RsaEncryptedPayload,
        master_key: Option<&SecretBuffer>,
    ) -> Result<Vec<u8>, Error> {
        let key_header = self
            .decrypt_with(role, payload.crc32, &payload.rsa_encrypted_key_header, master_key)
            .await?;

        Ok(payload.open(&key_header)?)
    }

    /// Re-wrap the key header of `payload` to the current key of `role`, so
    /// it stays readable after the key it was encrypted to is trimmed. The
    /// encrypted body is left untouched.
    pub async fn upgrade_payload(
        &self,
        role: KeyRole,
        payload: &RsaEncryptedPayload,
        master_key: Option<&SecretBuffer>,
    ) -> Result<RsaEncryptedPayload, Error> {
        let current = self.get_current(role).await?;
        if current.crc32 == payload.crc32 {
            return Ok(payload.clone());
        }

        let key_header = self
            .decrypt_with(role, payload.crc32, &payload.rsa_encrypted_key_header, master_key)
            .await?;

        Ok(RsaEncryptedPayload {
            crc32: current.crc32,
            rsa_encrypted_key_header: current.encrypt(key_header.as_slice())?,
            key_header_encrypted_data: payload.key_header_encrypted_data.clone(),
        })
    }

    /// Ed25519 sign with the current signing key
    pub async fn sign(&self, master_key: &SecretBuffer, data: &[u8]) -> Result<Vec<u8>, Error> {
        let current = self.get_current(KeyRole::Signing).await?;

        Ok(current.sign(master_key, data)?)
    }

    pub fn verify(public_key: &PublicKeyData, data: &[u8], signature: &[u8]) -> Result<(), Error> {
        Ok(public_key.verify(data, signature)?)
    }

    /// Re-encrypt every master key protected private key after a master key change
    pub async fn re_wrap(
        &self,
        old_master_key: &SecretBuffer,
        new_master_key: &SecretBuffer,
    ) -> Result<(), Error> {
        for role in [KeyRole::Online, KeyRole::Signing] {
            let _guard = self.locks.get(role).lock().await;

            let Some(mut set) = self.key_set(role).await? else {
                continue;
            };

            for key in set.iter_mut() {
                key.re_wrap(old_master_key, new_master_key)?;
            }

            self.save(role, &set).await?;
            tracing::info!(%role, keys = set.len(), "re-wrapped keys under new master key");
        }

        Ok(())
    }

    /// Hook for owner activity: rotates the keys of every role when due,
    /// checking at most once per rotation check interval. Returns whether a
    /// check ran.
    pub async fn handle_owner_online(&self, master_key: &SecretBuffer) -> Result<bool, Error> {
        {
            let mut last_check = self.last_rotation_check.lock()?;
            if let Some(last) = *last_check {
                if last.elapsed() < self.config.rotation_check_interval {
                    return Ok(false);
                }
            }
            *last_check = Some(Instant::now());
        }

        self.rotate_or_create(KeyRole::Offline, None).await?;
        self.rotate_or_create(KeyRole::Online, Some(master_key))
            .await?;
        self.rotate_or_create(KeyRole::Signing, Some(master_key))
            .await?;

        Ok(true)
    }
}

/// Run `f` with the wrapping key of `role`: the public constant for offline
/// keys, the caller's master key otherwise
fn with_wrapping_key<T>(
    role: KeyRole,
    master_key: Option<&SecretBuffer>,
    f: impl FnOnce(&SecretBuffer) -> Result<T, Error>,
) -> Result<T, Error> {
    match (role, master_key) {
        (KeyRole::Offline, _) => SecretBuffer::with_secret(OFFLINE_WRAPPING_KEY.to_vec(), f),
        (_, Some(master_key)) => f(master_key),
        (_, None) => Err(Error::Security(format!("{role} keys require the master key"))),
    }
}
