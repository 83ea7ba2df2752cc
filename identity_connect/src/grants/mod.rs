//! Exchange grants and the access tokens issued against them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    crypto::SymmetricKeyEncryptedAes,
    definitions::{DriveId, TargetDrive},
};

mod exchange_grant;
mod permission_context;
mod service;
mod token;

pub use exchange_grant::{DriveGrant, ExchangeGrant};
pub use permission_context::{DriveAccess, PermissionContext, PermissionContextOptions};
pub use service::ExchangeGrantService;
pub use token::{AccessRegistration, ClientAccessToken, ClientAuthenticationToken};

/// A drive as known to the storage layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveDescriptor {
    pub id: DriveId,
    pub target: TargetDrive,
    pub master_key_encrypted_storage_key: SymmetricKeyEncryptedAes,
}

/// Lookup of drives by their target address
#[async_trait]
pub trait DriveResolver: Send + Sync {
    async fn resolve_drive(&self, drive: &TargetDrive) -> Result<Option<DriveDescriptor>, Error>;
}

/// Fixed set of drives, for tests and embedded use
#[derive(Debug, Clone, Default)]
pub struct StaticDriveResolver {
    drives: Vec<DriveDescriptor>,
}

impl StaticDriveResolver {
    pub fn new(drives: Vec<DriveDescriptor>) -> Self {
        Self { drives }
    }
}

#[async_trait]
impl DriveResolver for StaticDriveResolver {
    async fn resolve_drive(&self, drive: &TargetDrive) -> Result<Option<DriveDescriptor>, Error> {
        Ok(self.drives.iter().find(|d| &d.target == drive).cloned())
    }
}
