use core::fmt;
use std::{
    collections::BTreeSet,
    fmt::{Debug, Display},
    ops::{BitOr, Deref},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type DriveId = Uuid;
pub type CircleId = Uuid;

/// Domain name of a self-hosted identity, e.g. `frodo.example.com`.
/// Stored lowercase; two identities are equal when their domains are.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(domain: impl AsRef<str>) -> Self {
        Identity(domain.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Identity {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Identity::new(value)
    }
}

/// Lifecycle an asymmetric key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyRole {
    /// Long lived, usable before the owner authenticated
    Offline,
    /// Rotated while the owner is active, protected by the master key
    Online,
    /// Ed25519 key for integrity proofs
    Signing,
}

impl KeyRole {
    pub const ALL: [KeyRole; 3] = [KeyRole::Offline, KeyRole::Online, KeyRole::Signing];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::Offline => "offline",
            KeyRole::Online => "online",
            KeyRole::Signing => "signing",
        }
    }
}

impl Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyRole {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(KeyRole::Offline),
            "online" => Ok(KeyRole::Online),
            "signing" => Ok(KeyRole::Signing),
            _ => Err(()),
        }
    }
}

/// Kind of client a token was issued to; encoded as one byte in portable tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ClientTokenType {
    Other = 0,
    IdentityConnectionRegistration = 1,
    YouAuth = 2,
    RemoteNotificationSubscriber = 3,
    AutomatedPasswordRecovery = 4,
    App = 5,
}

impl TryFrom<u8> for ClientTokenType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ClientTokenType::Other,
            1 => ClientTokenType::IdentityConnectionRegistration,
            2 => ClientTokenType::YouAuth,
            3 => ClientTokenType::RemoteNotificationSubscriber,
            4 => ClientTokenType::AutomatedPasswordRecovery,
            5 => ClientTokenType::App,
            other => return Err(other),
        })
    }
}

/// Set of permission keys granted to a holder, independent of drives
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    pub keys: BTreeSet<u32>,
}

impl PermissionSet {
    pub fn new(keys: impl IntoIterator<Item = u32>) -> Self {
        PermissionSet {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn has_key(&self, key: u32) -> bool {
        self.keys.contains(&key)
    }

    /// Union of two sets
    pub fn merge(&mut self, other: &PermissionSet) {
        self.keys.extend(other.keys.iter().copied());
    }
}

/// Flags granted on a single drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DrivePermission(u32);

impl DrivePermission {
    pub const NONE: DrivePermission = DrivePermission(0);
    pub const READ: DrivePermission = DrivePermission(1);
    pub const WRITE: DrivePermission = DrivePermission(2);
    pub const REACT: DrivePermission = DrivePermission(4);
    pub const COMMENT: DrivePermission = DrivePermission(8);
    pub const READ_WRITE: DrivePermission = DrivePermission(1 | 2);
    pub const ALL: DrivePermission = DrivePermission(1 | 2 | 4 | 8);

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: DrivePermission) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn has_read(&self) -> bool {
        self.contains(Self::READ)
    }
}

impl BitOr for DrivePermission {
    type Output = DrivePermission;

    fn bitor(self, rhs: Self) -> Self::Output {
        DrivePermission(self.0 | rhs.0)
    }
}

/// Address of a drive: an alias plus the type of drive it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDrive {
    pub alias: Uuid,
    pub drive_type: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionedDrive {
    pub drive: TargetDrive,
    pub permission: DrivePermission,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveGrantRequest {
    pub permissioned_drive: PermissionedDrive,
}

impl DriveGrantRequest {
    pub fn new(drive: TargetDrive, permission: DrivePermission) -> Self {
        DriveGrantRequest {
            permissioned_drive: PermissionedDrive { drive, permission },
        }
    }
}

/// Profile details shared with the counterpart of a connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactData {
    pub name: Option<String>,
    pub image_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_normalized() {
        assert_eq!(Identity::new(" Frodo.Example.COM "), Identity::from("frodo.example.com"));
    }

    #[test]
    fn drive_permission_flags() {
        let permission = DrivePermission::READ | DrivePermission::REACT;

        assert!(permission.has_read());
        assert!(!permission.contains(DrivePermission::WRITE));
        assert!(DrivePermission::ALL.contains(permission));
        assert!(!DrivePermission::WRITE.has_read());
    }

    #[test]
    fn token_type_byte() {
        for token_type in [
            ClientTokenType::Other,
            ClientTokenType::IdentityConnectionRegistration,
            ClientTokenType::App,
        ] {
            assert_eq!(ClientTokenType::try_from(token_type as u8), Ok(token_type));
        }
        assert_eq!(ClientTokenType::try_from(200), Err(200));
    }

    #[test]
    fn key_role_names() {
        for role in KeyRole::ALL {
            assert_eq!(role.as_str().parse::<KeyRole>(), Ok(role));
        }
    }
}
