#![deny(rustdoc::broken_intra_doc_links)]

//! # Identity connections
//!
//! Two independently hosted identities establish an encrypted, mutually
//! authenticated connection without sharing a secret up front, and hand each
//! other revocable access tokens scoped to a set of permissions and drives.
//!
//! The primary API this crate exposes is the
//! [`ConnectionRequestService`](connections::ConnectionRequestService), which
//! sends, receives, accepts and establishes connection requests. It is built on
//!
//! - the [`AsymmetricKeyStore`](keys::AsymmetricKeyStore), which generates and
//!   rotates this identity's RSA and Ed25519 keys,
//! - the [`RemoteKeyCache`](keys::RemoteKeyCache), which fetches and caches
//!   the public keys other identities publish, and
//! - the [`ExchangeGrantService`](grants::ExchangeGrantService), which wraps
//!   drive keys into grants and splits access secrets between a server half
//!   and a client half.
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "http")]
//! # mod example {
//! use std::sync::Arc;
//!
//! use identity_connect::{
//!     Error,
//!     config::Config,
//!     connections::{
//!         Collaborators, ConnectionRequestHeader, ConnectionRequestService,
//!         StaticCircleDefinitions, StorageConnectionStore,
//!     },
//!     crypto::SecretBuffer,
//!     definitions::{ContactData, Identity},
//!     events::NoopPublisher,
//!     grants::StaticDriveResolver,
//!     storage::MemoryStorage,
//!     transport::HttpRemoteClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = Config::default();
//!     let storage = Arc::new(MemoryStorage::new());
//!
//!     let service = ConnectionRequestService::new(
//!         Identity::new("frodo.example.com"),
//!         config.clone(),
//!         Collaborators {
//!             storage: storage.clone(),
//!             client: Arc::new(HttpRemoteClient::new(config.http_timeout)),
//!             drives: Arc::new(StaticDriveResolver::default()),
//!             circles: Arc::new(StaticCircleDefinitions::default()),
//!             connections: Arc::new(StorageConnectionStore::new(storage)),
//!             events: Arc::new(NoopPublisher),
//!         },
//!     );
//!
//!     let master_key = SecretBuffer::random_key();
//!     service.keys().create_initial_keys(&master_key).await?;
//!
//!     service
//!         .send_connection_request(
//!             ConnectionRequestHeader {
//!                 id: uuid::Uuid::new_v4(),
//!                 recipient: Identity::new("sam.example.com"),
//!                 message: "let's connect".into(),
//!                 contact_data: Some(ContactData {
//!                     name: Some("Frodo".into()),
//!                     image_id: None,
//!                 }),
//!                 circle_ids: vec![],
//!             },
//!             &master_key,
//!         )
//!         .await
//! }
//! # }
//! ```

/// Zeroizing secrets, symmetric key wrapping, RSA and Ed25519 key pairs and
/// the envelopes exchanged between identities.
pub mod crypto;

/// Identities, key roles, permissions and drive addresses shared by every module.
pub mod definitions;

/// Keyed persistence: an in-memory backend and an
/// [Askar](https://github.com/openwallet-foundation/askar) backend.
pub mod storage;

/// Outbound calls to other identities.
pub mod transport;

/// This identity's asymmetric keys and the cached keys of other identities.
pub mod keys;

/// Exchange grants, access registrations and client access tokens.
pub mod grants;

/// The connection request protocol.
pub mod connections;

pub mod config;
pub mod events;
pub mod retry;

mod error;
#[cfg(feature = "http")]
mod http_client;

#[cfg(test)]
mod test;

pub use error::{Error, ErrorCategory};
