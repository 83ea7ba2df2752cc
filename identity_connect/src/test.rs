use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, RwLock,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

use crate::{
    Error, ErrorCategory,
    config::{Config, KeyStoreConfig},
    connections::{
        AcceptRequestHeader, CircleDefinition, Collaborators, ConnectionRecord,
        ConnectionRequestHeader, ConnectionRequestService, ConnectionStore,
        DeliveredConnectionRequest, PendingConnectionRequest, StaticCircleDefinitions, StorageConnectionStore,
    },
    crypto::{SecretBuffer, SymmetricKeyEncryptedAes},
    definitions::{
        ContactData, DriveGrantRequest, DrivePermission, Identity, KeyRole, PermissionSet,
        TargetDrive,
    },
    events::{ChannelPublisher, ConnectionEvent},
    grants::{ClientAccessToken, DriveDescriptor, PermissionContextOptions, StaticDriveResolver},
    retry::RetryPolicy,
    storage::{CONNECTION_REQUESTS_PENDING, CONNECTION_REQUESTS_SENT, MemoryStorage, Storage},
    transport::{RemoteClient, RemoteRequest, RemoteResponse, Route, TransportError},
};

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_connect=debug".into()),
        )
        .try_init();
}

/// In-process network: a call to an identity is served by its service
#[derive(Default)]
struct Network {
    nodes: RwLock<HashMap<Identity, Arc<ConnectionRequestService>>>,
    offline: RwLock<HashSet<Identity>>,
    calls: AtomicUsize,
}

impl Network {
    fn set_online(&self, identity: &Identity, online: bool) {
        let mut offline = self.offline.write().unwrap();
        if online {
            offline.remove(identity);
        } else {
            offline.insert(identity.clone());
        }
    }
}

struct LoopbackClient {
    caller: Identity,
    network: Arc<Network>,
}

#[async_trait]
impl RemoteClient for LoopbackClient {
    async fn send(
        &self,
        recipient: &Identity,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError> {
        self.network.calls.fetch_add(1, Ordering::SeqCst);

        let node = {
            if self.network.offline.read().unwrap().contains(recipient) {
                None
            } else {
                self.network.nodes.read().unwrap().get(recipient).cloned()
            }
        };

        let Some(node) = node else {
            return Err(TransportError::Unreachable(recipient.to_string()));
        };

        Ok(node.handle_peer_request(&self.caller, request).await)
    }
}

struct Node {
    identity: Identity,
    service: Arc<ConnectionRequestService>,
    storage: Arc<MemoryStorage>,
    connections: Arc<StorageConnectionStore>,
    master_key: SecretBuffer,
    events: UnboundedReceiver<ConnectionEvent>,
    drive: DriveDescriptor,
    storage_key: SecretBuffer,
    circle: CircleDefinition,
}

fn test_config() -> Config {
    Config {
        keys: KeyStoreConfig {
            rsa_key_bits: 1024,
            ..Default::default()
        },
        retry: RetryPolicy::immediate(1),
        ..Default::default()
    }
}

async fn node(network: &Arc<Network>, name: &str, config: Config) -> Node {
    let identity = Identity::new(name);
    let storage = Arc::new(MemoryStorage::new());
    let connections = Arc::new(StorageConnectionStore::new(storage.clone()));
    let master_key = SecretBuffer::random_key();
    let storage_key = SecretBuffer::random_key();
    let (events, receiver) = ChannelPublisher::new();

    let drive = DriveDescriptor {
        id: Uuid::new_v4(),
        target: TargetDrive {
            alias: Uuid::new_v4(),
            drive_type: Uuid::new_v4(),
        },
        master_key_encrypted_storage_key: SymmetricKeyEncryptedAes::new(&master_key, &storage_key)
            .unwrap(),
    };

    let circle = CircleDefinition {
        id: Uuid::new_v4(),
        name: "friends".into(),
        permission_set: PermissionSet::new([10]),
        drive_grants: vec![DriveGrantRequest::new(
            drive.target,
            DrivePermission::READ | DrivePermission::COMMENT,
        )],
    };

    let service = Arc::new(ConnectionRequestService::new(
        identity.clone(),
        config,
        Collaborators {
            storage: storage.clone(),
            client: Arc::new(LoopbackClient {
                caller: identity.clone(),
                network: network.clone(),
            }),
            drives: Arc::new(StaticDriveResolver::new(vec![drive.clone()])),
            circles: Arc::new(StaticCircleDefinitions::new(vec![circle.clone()])),
            connections: connections.clone(),
            events: Arc::new(events),
        },
    ));

    service.keys().create_initial_keys(&master_key).await.unwrap();

    network
        .nodes
        .write()
        .unwrap()
        .insert(identity.clone(), service.clone());

    Node {
        identity,
        service,
        storage,
        connections,
        master_key,
        events: receiver,
        drive,
        storage_key,
        circle,
    }
}

fn request_to(recipient: &Node, circle: &CircleDefinition) -> ConnectionRequestHeader {
    ConnectionRequestHeader {
        id: Uuid::new_v4(),
        recipient: recipient.identity.clone(),
        message: "let's connect".into(),
        contact_data: Some(ContactData {
            name: Some("Frodo".into()),
            image_id: None,
        }),
        circle_ids: vec![circle.id],
    }
}

fn accept_from(sender: &Node, circle: &CircleDefinition) -> AcceptRequestHeader {
    AcceptRequestHeader {
        sender: sender.identity.clone(),
        circle_ids: vec![circle.id],
        contact_data: Some(ContactData {
            name: Some("Sam".into()),
            image_id: None,
        }),
    }
}

/// Token the peer issued to `node`, unwrapped with `node`'s ICR key
async fn peer_token(node: &Node, record: &ConnectionRecord) -> ClientAccessToken {
    let icr_key = node
        .service
        .icr()
        .get(&node.master_key)
        .await
        .unwrap()
        .unwrap();
    let bytes = record
        .icr_encrypted_client_access_token
        .decrypt_key_clone(&icr_key)
        .unwrap();

    ClientAccessToken::from_portable_bytes(bytes.as_slice()).unwrap()
}

fn request_count(storage: &MemoryStorage) -> usize {
    storage.count(CONNECTION_REQUESTS_SENT).unwrap()
        + storage.count(CONNECTION_REQUESTS_PENDING).unwrap()
}

#[tokio::test]
async fn test_connection_flow() {
    init_tracing();
    let network = Arc::new(Network::default());
    let mut frodo = node(&network, "frodo.example", test_config()).await;
    let mut sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    let sent = frodo
        .service
        .get_sent_request(&sam.identity)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frodo.service.get_sent_requests().await.unwrap().len(), 1);

    let Some(ConnectionEvent::RequestReceived { sender, request_id }) = sam.events.recv().await
    else {
        panic!("sam did not receive a connection request")
    };
    assert_eq!(sender, frodo.identity);
    assert_eq!(request_id, sent.id);

    let request = sam
        .service
        .get_pending_request(&frodo.identity, &sam.master_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.message, "let's connect");
    assert_eq!(request.recipient, sam.identity);

    sam.service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();

    // no requests are left on either side
    assert_eq!(request_count(&frodo.storage), 0);
    assert_eq!(request_count(&sam.storage), 0);

    assert_eq!(
        sam.events.recv().await,
        Some(ConnectionEvent::RequestAccepted {
            sender: frodo.identity.clone()
        })
    );
    assert_eq!(
        frodo.events.recv().await,
        Some(ConnectionEvent::ConnectionAccepted {
            recipient: sam.identity.clone()
        })
    );
    assert_eq!(
        frodo.events.recv().await,
        Some(ConnectionEvent::ConnectionFinalized {
            peer: sam.identity.clone()
        })
    );

    let frodo_record = frodo.connections.get(&sam.identity).await.unwrap().unwrap();
    let sam_record = sam.connections.get(&frodo.identity).await.unwrap().unwrap();
    assert_eq!(frodo_record.circle_ids, vec![frodo.circle.id]);
    assert_eq!(sam_record.circle_ids, vec![sam.circle.id]);

    // each side holds the other's token; both recombine to one shared secret
    let token_from_sam = peer_token(&frodo, &frodo_record).await;
    let token_from_frodo = peer_token(&sam, &sam_record).await;
    assert_eq!(
        token_from_sam.shared_secret.as_slice(),
        token_from_frodo.shared_secret.as_slice()
    );

    let sam_context = sam
        .service
        .grants()
        .create_permission_context(
            &token_from_sam.to_authentication_token(),
            &HashMap::from([("connection".to_string(), sam_record.access_grant.clone())]),
            &sam_record.access_registration,
            PermissionContextOptions {
                include_storage_keys: true,
            },
        )
        .unwrap();
    assert_eq!(
        sam_context.shared_secret.as_slice(),
        token_from_sam.shared_secret.as_slice()
    );
    assert!(sam_context.has_permission(10));
    assert!(sam_context.can_read(&sam.drive.id));
    assert_eq!(
        sam_context.storage_key(&sam.drive.id).unwrap().as_slice(),
        sam.storage_key.as_slice()
    );

    let frodo_context = frodo
        .service
        .grants()
        .create_permission_context(
            &token_from_frodo.to_authentication_token(),
            &HashMap::from([("connection".to_string(), frodo_record.access_grant.clone())]),
            &frodo_record.access_registration,
            PermissionContextOptions {
                include_storage_keys: true,
            },
        )
        .unwrap();
    assert_eq!(
        frodo_context.shared_secret.as_slice(),
        sam_context.shared_secret.as_slice()
    );
    assert_eq!(
        frodo_context.storage_key(&frodo.drive.id).unwrap().as_slice(),
        frodo.storage_key.as_slice()
    );
}

#[tokio::test]
async fn test_sent_request_holds_no_secret() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    assert_eq!(frodo.storage.count(CONNECTION_REQUESTS_SENT).unwrap(), 1);

    // read the token sam received
    let pending = sam.service.get_pending_requests().await.unwrap().remove(0);
    let body = sam
        .service
        .keys()
        .decrypt_payload(KeyRole::Online, &pending.payload, Some(&sam.master_key))
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let token =
        ClientAccessToken::from_portable_base64(body["clientAccessToken64"].as_str().unwrap())
            .unwrap();

    let stored = (frodo.storage.clone() as Arc<dyn Storage>)
        .get(CONNECTION_REQUESTS_SENT, sam.identity.as_str())
        .await
        .unwrap()
        .unwrap();
    let stored = String::from_utf8(stored).unwrap();

    for secret in [&token.shared_secret, &token.access_token_half_key] {
        assert!(!stored.contains(&Base64::encode_string(secret.as_slice())));
    }

    // the stored server half still matches the token handed out
    let sent = frodo
        .service
        .get_sent_request(&sam.identity)
        .await
        .unwrap()
        .unwrap();
    let (_, shared_secret) = sent
        .access_registration
        .decrypt_shared_secret(&token.to_authentication_token())
        .unwrap();
    assert_eq!(shared_secret.as_slice(), token.shared_secret.as_slice());
}

#[tokio::test]
async fn test_crossing_requests() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    let err = sam
        .service
        .send_connection_request(request_to(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExistingIncomingRequest(_)));
    assert_eq!(err.category(), ErrorCategory::Client);
    assert_eq!(sam.storage.count(CONNECTION_REQUESTS_SENT).unwrap(), 0);

    let err = frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateRequest(_)));

    // a request arriving while ours is outstanding is turned away
    let response = frodo
        .service
        .handle_peer_request(
            &sam.identity,
            RemoteRequest::new(
                Route::DeliverConnectionRequest,
                serde_json::to_vec(&DeliveredConnectionRequest {
                    id: Uuid::new_v4(),
                    payload: sam.service.get_pending_requests().await.unwrap()[0]
                        .payload
                        .clone(),
                })
                .unwrap(),
            ),
        )
        .await;
    assert_eq!(response.status, 400);
    assert_eq!(frodo.storage.count(CONNECTION_REQUESTS_PENDING).unwrap(), 0);
}

#[tokio::test]
async fn test_delivery_failure() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    network.set_online(&sam.identity, false);

    let err = frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConnectionRequestFailed(_)));
    assert_eq!(err.category(), ErrorCategory::Remote);
    // one key fetch per attempt
    assert_eq!(network.calls.load(Ordering::SeqCst), 2);
    assert_eq!(request_count(&frodo.storage), 0);
    assert_eq!(request_count(&sam.storage), 0);

    // the next attempt goes through
    network.set_online(&sam.identity, true);
    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();
    assert_eq!(sam.storage.count(CONNECTION_REQUESTS_PENDING).unwrap(), 1);
}

#[tokio::test]
async fn test_request_to_replaced_key_is_unreadable() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    // cache sam's key, then replace sam by a node with fresh keys
    frodo
        .service
        .remote_keys()
        .resolve(KeyRole::Online, &sam.identity, true, true)
        .await
        .unwrap()
        .unwrap();

    let fresh_sam = node(&network, "sam.example", test_config()).await;
    drop(sam);

    frodo
        .service
        .send_connection_request(request_to(&fresh_sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    // delivery itself does not decrypt, so the stale key only shows on accept
    let err = fresh_sam
        .service
        .accept_connection_request(accept_from(&frodo, &fresh_sam.circle), &fresh_sam.master_key)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPublicKey { .. }));
    assert_eq!(err.category(), ErrorCategory::Security);
    assert_eq!(
        fresh_sam
            .storage
            .count(CONNECTION_REQUESTS_PENDING)
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_failed_accept_keeps_pending() {
    init_tracing();
    let network = Arc::new(Network::default());
    let mut frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    network.set_online(&frodo.identity, false);

    let err = sam
        .service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ConnectionRequestFailed(_)));
    assert_eq!(sam.storage.count(CONNECTION_REQUESTS_PENDING).unwrap(), 1);
    assert!(sam.connections.get(&frodo.identity).await.unwrap().is_none());

    network.set_online(&frodo.identity, true);

    sam.service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();

    assert_eq!(request_count(&sam.storage), 0);
    assert_eq!(request_count(&frodo.storage), 0);
    assert_eq!(
        frodo.events.recv().await,
        Some(ConnectionEvent::ConnectionAccepted {
            recipient: sam.identity.clone()
        })
    );
}

#[tokio::test]
async fn test_establish_with_foreign_token() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    let (_, foreign) = frodo
        .service
        .grants()
        .create_client_access_token(
            None,
            crate::definitions::ClientTokenType::IdentityConnectionRegistration,
            None,
        )
        .unwrap();

    let reply = crate::crypto::SharedSecretEncryptedPayload::encrypt(b"{}", &foreign.shared_secret)
        .unwrap();
    let response = frodo
        .service
        .handle_peer_request(
            &sam.identity,
            RemoteRequest::new(Route::EstablishConnection, serde_json::to_vec(&reply).unwrap())
                .with_auth_token(foreign.to_authentication_token().to_portable_base64()),
        )
        .await;

    assert_eq!(response.status, 403);
    assert_eq!(frodo.storage.count(CONNECTION_REQUESTS_SENT).unwrap(), 1);
}

#[tokio::test]
async fn test_rotation_keeps_pending_readable() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;

    let mut rotating = test_config();
    rotating.keys.rotation_interval = std::time::Duration::ZERO;
    rotating.keys.rotation_check_interval = std::time::Duration::ZERO;
    let sam = node(&network, "sam.example", rotating).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();
    let original_crc = sam.service.get_pending_requests().await.unwrap()[0]
        .payload
        .crc32;

    // rotates and moves the request to the new key
    sam.service
        .handle_owner_online(&sam.master_key)
        .await
        .unwrap();
    let current = sam.service.keys().get_current(KeyRole::Online).await.unwrap();
    assert_ne!(current.crc32, original_crc);
    assert_eq!(
        sam.service.get_pending_requests().await.unwrap()[0]
            .payload
            .crc32,
        current.crc32
    );

    // one more rotation pushes the original key out of the set
    sam.service
        .keys()
        .rotate_or_create(KeyRole::Online, Some(&sam.master_key))
        .await
        .unwrap();
    let set = sam
        .service
        .keys()
        .key_set(KeyRole::Online)
        .await
        .unwrap()
        .unwrap();
    assert!(!set.contains(original_crc));

    sam.service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();
    assert_eq!(request_count(&sam.storage), 0);
}

#[tokio::test]
async fn test_silent_deletes() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();
    let calls = network.calls.load(Ordering::SeqCst);

    for _ in 0..2 {
        frodo.service.delete_sent_request(&sam.identity).await.unwrap();
        sam.service.delete_pending_request(&frodo.identity).await.unwrap();
    }

    assert_eq!(request_count(&frodo.storage), 0);
    assert_eq!(request_count(&sam.storage), 0);
    // the counterpart is never told
    assert_eq!(network.calls.load(Ordering::SeqCst), calls);

    // once both sides forgot, either may start over
    sam.service
        .send_connection_request(request_to(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();
    assert_eq!(frodo.storage.count(CONNECTION_REQUESTS_PENDING).unwrap(), 1);
}

#[tokio::test]
async fn test_establish_over_stray_pending() {
    init_tracing();
    let network = Arc::new(Network::default());
    let mut frodo = node(&network, "frodo.example", test_config()).await;
    let sam = node(&network, "sam.example", test_config()).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    // left behind by a request of sam's that crossed ours
    let stray = PendingConnectionRequest {
        id: Uuid::new_v4(),
        sender: sam.identity.clone(),
        received_at: chrono::Utc::now(),
        payload: sam.service.get_pending_requests().await.unwrap()[0]
            .payload
            .clone(),
    };
    frodo
        .storage
        .upsert(
            CONNECTION_REQUESTS_PENDING,
            sam.identity.as_str(),
            &serde_json::to_vec(&stray).unwrap(),
        )
        .await
        .unwrap();

    sam.service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();

    assert_eq!(request_count(&frodo.storage), 0);
    assert!(frodo.connections.get(&sam.identity).await.unwrap().is_some());
    assert_eq!(
        frodo.events.recv().await,
        Some(ConnectionEvent::ConnectionAccepted {
            recipient: sam.identity.clone()
        })
    );
}

#[tokio::test]
async fn test_request_to_idle_recipient_with_expired_key() {
    init_tracing();
    let network = Arc::new(Network::default());
    let frodo = node(&network, "frodo.example", test_config()).await;

    let mut short_lived = test_config();
    short_lived.keys.key_ttl = std::time::Duration::from_secs(1);
    let sam = node(&network, "sam.example", short_lived).await;
    let online = sam.service.keys().get_current(KeyRole::Online).await.unwrap();

    // sam's owner stays away, so the online key is never rotated
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();
    assert_eq!(
        sam.service.get_pending_requests().await.unwrap()[0]
            .payload
            .crc32,
        online.crc32
    );

    sam.service
        .accept_connection_request(accept_from(&frodo, &sam.circle), &sam.master_key)
        .await
        .unwrap();
    assert!(frodo.connections.get(&sam.identity).await.unwrap().is_some());
}

#[tokio::test]
async fn test_offline_request_key_rotates_after_expiry() {
    init_tracing();
    let network = Arc::new(Network::default());

    let mut offline = test_config();
    offline.request_key_role = KeyRole::Offline;
    let frodo = node(&network, "frodo.example", offline.clone()).await;

    offline.keys.key_ttl = std::time::Duration::from_secs(1);
    let sam = node(&network, "sam.example", offline).await;
    let expired = sam.service.keys().get_current(KeyRole::Offline).await.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

    frodo
        .service
        .send_connection_request(request_to(&sam, &frodo.circle), &frodo.master_key)
        .await
        .unwrap();

    let crc = sam.service.get_pending_requests().await.unwrap()[0]
        .payload
        .crc32;
    assert_ne!(crc, expired.crc32);
    assert_eq!(
        sam.service.keys().get_current(KeyRole::Offline).await.unwrap().crc32,
        crc
    );

    let request = sam
        .service
        .get_pending_request(&frodo.identity, &sam.master_key)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(request.sender, frodo.identity);
}
