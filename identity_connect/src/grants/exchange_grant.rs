use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::SymmetricKeyEncryptedAes,
    definitions::{DriveId, PermissionSet, PermissionedDrive},
};

/// Access to one drive. The storage key is only present for grants that
/// include read access, and is wrapped under the owning grant's keystore key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveGrant {
    pub drive_id: DriveId,
    pub permissioned_drive: PermissionedDrive,
    pub keystore_key_encrypted_storage_key: Option<SymmetricKeyEncryptedAes>,
}

/// Bundle of permissions and drive access, independent of any client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeGrant {
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub master_key_encrypted_keystore_key: Option<SymmetricKeyEncryptedAes>,
    pub is_revoked: bool,
    pub drive_grants: Vec<DriveGrant>,
    pub permission_set: PermissionSet,
    pub keystore_key_encrypted_icr_key: Option<SymmetricKeyEncryptedAes>,
}

impl ExchangeGrant {
    pub fn revoke(&mut self) {
        self.is_revoked = true;
        self.modified_at = Utc::now();
    }

    pub fn drive_grant(&self, drive_id: &DriveId) -> Option<&DriveGrant> {
        self.drive_grants
            .iter()
            .find(|grant| &grant.drive_id == drive_id)
    }
}
