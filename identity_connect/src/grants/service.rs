use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use super::{
    AccessRegistration, ClientAccessToken, ClientAuthenticationToken, DriveAccess, DriveGrant,
    DriveResolver, ExchangeGrant, PermissionContext, PermissionContextOptions,
};
use crate::{
    Error,
    crypto::{SecretBuffer, SymmetricKeyEncryptedAes, SymmetricKeyEncryptedXor},
    definitions::{ClientTokenType, DriveGrantRequest, PermissionSet},
};

/// Issues exchange grants and the split tokens that unlock them
pub struct ExchangeGrantService {
    drives: Arc<dyn DriveResolver>,
}

impl ExchangeGrantService {
    pub fn new(drives: Arc<dyn DriveResolver>) -> Self {
        Self { drives }
    }

    /// Build a grant whose drive storage keys and ICR key are wrapped under
    /// `keystore_key`. Every drive is resolved before anything is wrapped, so
    /// an unknown drive fails the whole call.
    pub async fn create_exchange_grant(
        &self,
        keystore_key: &SecretBuffer,
        permission_set: &PermissionSet,
        drive_grant_requests: &[DriveGrantRequest],
        master_key: Option<&SecretBuffer>,
        icr_key: Option<&SecretBuffer>,
    ) -> Result<ExchangeGrant, Error> {
        let mut resolved = Vec::with_capacity(drive_grant_requests.len());
        for request in drive_grant_requests {
            let target = request.permissioned_drive.drive;
            let Some(drive) = self.drives.resolve_drive(&target).await? else {
                tracing::warn!(alias = %target.alias, "grant requested for unknown drive");
                return Err(Error::InvalidDrive(target.alias.to_string()));
            };

            resolved.push((request, drive));
        }

        let mut drive_grants = Vec::with_capacity(resolved.len());
        for (request, drive) in resolved {
            let keystore_key_encrypted_storage_key =
                if request.permissioned_drive.permission.has_read() {
                    let Some(master_key) = master_key else {
                        return Err(Error::Security(
                            "read access to a drive requires the master key".into(),
                        ));
                    };

                    let storage_key = drive
                        .master_key_encrypted_storage_key
                        .decrypt_key_clone(master_key)?;

                    Some(SymmetricKeyEncryptedAes::new(keystore_key, &storage_key)?)
                } else {
                    None
                };

            drive_grants.push(DriveGrant {
                drive_id: drive.id,
                permissioned_drive: request.permissioned_drive,
                keystore_key_encrypted_storage_key,
            });
        }

        let now = Utc::now();

        Ok(ExchangeGrant {
            created_at: now,
            modified_at: now,
            master_key_encrypted_keystore_key: master_key
                .map(|master_key| SymmetricKeyEncryptedAes::new(master_key, keystore_key))
                .transpose()?,
            is_revoked: false,
            drive_grants,
            permission_set: permission_set.clone(),
            keystore_key_encrypted_icr_key: icr_key
                .map(|icr_key| SymmetricKeyEncryptedAes::new(keystore_key, icr_key))
                .transpose()?,
        })
    }

    /// Split a fresh keystore key between an [`AccessRegistration`] kept by
    /// this identity and a [`ClientAccessToken`] handed to the client. The
    /// shared secret is generated unless one is given.
    pub fn create_client_access_token(
        &self,
        grant_keystore_key: Option<&SecretBuffer>,
        client_type: ClientTokenType,
        shared_secret: Option<SecretBuffer>,
    ) -> Result<(AccessRegistration, ClientAccessToken), Error> {
        let keystore_key = SecretBuffer::random_key();
        let shared_secret = shared_secret.unwrap_or_else(SecretBuffer::random_key);

        let (client_half_encrypted_keystore_key, access_token_half_key) =
            SymmetricKeyEncryptedXor::new(&keystore_key)?;

        let registration = AccessRegistration {
            id: Uuid::new_v4(),
            client_type,
            created_at: Utc::now(),
            client_half_encrypted_keystore_key,
            keystore_key_encrypted_shared_secret: SymmetricKeyEncryptedAes::new(
                &keystore_key,
                &shared_secret,
            )?,
            keystore_key_encrypted_grant_keystore_key: grant_keystore_key
                .map(|grant_key| SymmetricKeyEncryptedAes::new(&keystore_key, grant_key))
                .transpose()?,
            is_revoked: false,
        };

        let token = ClientAccessToken {
            id: registration.id,
            access_token_half_key,
            shared_secret,
            client_token_type: client_type,
        };

        Ok((registration, token))
    }

    /// Recombine the caller's keys and collect what its grants allow.
    /// Revoked grants contribute nothing.
    pub fn create_permission_context(
        &self,
        auth_token: &ClientAuthenticationToken,
        grants: &HashMap<String, ExchangeGrant>,
        access_registration: &AccessRegistration,
        options: PermissionContextOptions,
    ) -> Result<PermissionContext, Error> {
        if access_registration.is_revoked {
            return Err(Error::Revoked);
        }

        let (keystore_key, shared_secret) = access_registration.decrypt_shared_secret(auth_token)?;

        let grant_keystore_key = access_registration
            .keystore_key_encrypted_grant_keystore_key
            .as_ref()
            .map(|wrapped| wrapped.decrypt_key_clone(&keystore_key))
            .transpose()?;

        let mut permission_set = PermissionSet::default();
        let mut drives = HashMap::new();

        for (name, grant) in grants {
            if grant.is_revoked {
                tracing::debug!(grant = %name, "skipping revoked grant");
                continue;
            }

            permission_set.merge(&grant.permission_set);

            for drive_grant in &grant.drive_grants {
                let storage_key = match (
                    options.include_storage_keys,
                    &grant_keystore_key,
                    &drive_grant.keystore_key_encrypted_storage_key,
                ) {
                    (true, Some(grant_key), Some(wrapped)) => {
                        Some(wrapped.decrypt_key_clone(grant_key)?)
                    }
                    _ => None,
                };

                let access = drives.entry(drive_grant.drive_id).or_insert(DriveAccess {
                    permission: Default::default(),
                    storage_key: None,
                });
                access.permission =
                    access.permission | drive_grant.permissioned_drive.permission;
                if access.storage_key.is_none() {
                    access.storage_key = storage_key;
                }
            }
        }

        Ok(PermissionContext {
            shared_secret,
            permission_set,
            drives,
        })
    }
}
