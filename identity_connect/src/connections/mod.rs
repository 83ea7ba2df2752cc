//! The connection request protocol between two identities.
//!
//! The sender delivers an RSA encrypted request to the recipient, which keeps
//! it encrypted until its owner accepts. The acceptance is sent back encrypted
//! under the shared secret the sender chose, and both sides end up with a
//! [`ConnectionRecord`] bound to that secret.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;

use crate::{
    Error,
    crypto::{RsaEncryptedPayload, SymmetricKeyEncryptedAes},
    definitions::{CircleId, ContactData, DriveGrantRequest, Identity, PermissionSet},
    grants::{AccessRegistration, ExchangeGrant},
    storage::{CONNECTIONS, Storage},
};

mod icr;
mod machine;
mod service;
mod wire;

pub use icr::IcrKeyRing;
pub use machine::{ConnectionMachine, ConnectionState, RequestEvent, StateError};
pub use service::{Collaborators, ConnectionRequestService};

/// What the owner fills in to send a request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRequestHeader {
    pub id: Uuid,
    pub recipient: Identity,
    pub message: String,
    pub contact_data: Option<ContactData>,
    /// Circles the recipient is granted once connected
    #[serde(default)]
    pub circle_ids: Vec<CircleId>,
}

/// What the owner fills in to accept a pending request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequestHeader {
    pub sender: Identity,
    #[serde(default)]
    pub circle_ids: Vec<CircleId>,
    pub contact_data: Option<ContactData>,
}

/// A request this identity sent, waiting for the recipient's reply.
/// It holds the server half of the token handed to the recipient, never the
/// client half or the shared secret.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentConnectionRequest {
    pub id: Uuid,
    pub sender: Identity,
    pub recipient: Identity,
    pub message: String,
    pub contact_data: ContactData,
    pub sent_at: DateTime<Utc>,
    pub circle_ids: Vec<CircleId>,
    pub pending_access_grant: ExchangeGrant,
    pub access_registration: AccessRegistration,
    /// ICR key wrapped under the temporary key shipped in the request
    pub temp_encrypted_icr_key: SymmetricKeyEncryptedAes,
    #[serde_as(as = "Base64")]
    pub verification_hash: [u8; 32],
}

/// A request delivered by a peer, stored as it arrived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingConnectionRequest {
    pub id: Uuid,
    pub sender: Identity,
    pub received_at: DateTime<Utc>,
    pub payload: RsaEncryptedPayload,
}

/// Body of the deliver route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveredConnectionRequest {
    pub id: Uuid,
    pub payload: RsaEncryptedPayload,
}

/// Decrypted view of a pending request, without its key material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub id: Uuid,
    pub sender: Identity,
    pub recipient: Identity,
    pub message: String,
    pub contact_data: Option<ContactData>,
    pub received_at: DateTime<Utc>,
}

/// An established connection, as handed to the [`ConnectionStore`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRecord {
    pub peer: Identity,
    pub contact_data: Option<ContactData>,
    pub circle_ids: Vec<CircleId>,
    /// What the peer may access here
    pub access_grant: ExchangeGrant,
    /// Server half of the token the peer holds
    pub access_registration: AccessRegistration,
    /// Token issued by the peer, encrypted under our ICR key
    pub icr_encrypted_client_access_token: SymmetricKeyEncryptedAes,
    pub connected_at: DateTime<Utc>,
}

/// Permissions and drives a connection receives by being in a circle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircleDefinition {
    pub id: CircleId,
    pub name: String,
    pub permission_set: PermissionSet,
    pub drive_grants: Vec<DriveGrantRequest>,
}

#[async_trait]
pub trait CircleDefinitions: Send + Sync {
    async fn get_circle(&self, id: &CircleId) -> Result<Option<CircleDefinition>, Error>;
}

/// Fixed set of circles
#[derive(Debug, Clone, Default)]
pub struct StaticCircleDefinitions {
    circles: Vec<CircleDefinition>,
}

impl StaticCircleDefinitions {
    pub fn new(circles: Vec<CircleDefinition>) -> Self {
        Self { circles }
    }
}

#[async_trait]
impl CircleDefinitions for StaticCircleDefinitions {
    async fn get_circle(&self, id: &CircleId) -> Result<Option<CircleDefinition>, Error> {
        Ok(self.circles.iter().find(|c| &c.id == id).cloned())
    }
}

/// Receiver of finished connections
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    async fn connect(&self, record: ConnectionRecord) -> Result<(), Error>;

    async fn get(&self, peer: &Identity) -> Result<Option<ConnectionRecord>, Error>;
}

/// Keeps connections in the `connections` storage category
pub struct StorageConnectionStore {
    storage: Arc<dyn Storage>,
}

impl StorageConnectionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ConnectionStore for StorageConnectionStore {
    async fn connect(&self, record: ConnectionRecord) -> Result<(), Error> {
        self.storage
            .upsert_json(CONNECTIONS, record.peer.as_str(), &record)
            .await
    }

    async fn get(&self, peer: &Identity) -> Result<Option<ConnectionRecord>, Error> {
        self.storage.get_json(CONNECTIONS, peer.as_str()).await
    }
}
