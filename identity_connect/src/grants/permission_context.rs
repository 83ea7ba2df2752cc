use std::collections::HashMap;

use crate::{
    crypto::SecretBuffer,
    definitions::{DriveId, DrivePermission, PermissionSet},
};

/// What a caller may access on one drive
#[derive(Debug)]
pub struct DriveAccess {
    pub permission: DrivePermission,
    /// Present only for read access when storage keys were requested
    pub storage_key: Option<SecretBuffer>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PermissionContextOptions {
    /// Unwrap drive storage keys, needed to read encrypted drive content
    pub include_storage_keys: bool,
}

/// Authorization state of a caller, derived from its token and grants.
/// Key material is wiped when the context is dropped.
#[derive(Debug)]
pub struct PermissionContext {
    pub shared_secret: SecretBuffer,
    pub permission_set: PermissionSet,
    pub drives: HashMap<DriveId, DriveAccess>,
}

impl PermissionContext {
    pub fn has_permission(&self, key: u32) -> bool {
        self.permission_set.has_key(key)
    }

    pub fn drive_permission(&self, drive_id: &DriveId) -> DrivePermission {
        self.drives
            .get(drive_id)
            .map(|access| access.permission)
            .unwrap_or(DrivePermission::NONE)
    }

    pub fn can_read(&self, drive_id: &DriveId) -> bool {
        self.drive_permission(drive_id).has_read()
    }

    pub fn storage_key(&self, drive_id: &DriveId) -> Option<&SecretBuffer> {
        self.drives
            .get(drive_id)
            .and_then(|access| access.storage_key.as_ref())
    }
}
