use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{
    AcceptRequestHeader, CircleDefinitions, ConnectionMachine, ConnectionRecord,
    ConnectionRequest, ConnectionRequestHeader, ConnectionState, ConnectionStore,
    DeliveredConnectionRequest, IcrKeyRing, PendingConnectionRequest, RequestEvent,
    SentConnectionRequest, StateError,
    wire::{ConnectionRequestReply, RequestPayload, verification_hash},
};
use crate::{
    Error, ErrorCategory,
    config::Config,
    crypto::{
        RsaEncryptedPayload, SecretBuffer, SharedSecretEncryptedPayload, SymmetricKeyEncryptedAes,
    },
    definitions::{CircleId, ClientTokenType, DriveGrantRequest, Identity, PermissionSet},
    events::{ConnectionEvent, EventPublisher},
    grants::{ClientAccessToken, ClientAuthenticationToken, DriveResolver, ExchangeGrantService},
    keys::{AsymmetricKeyStore, RemoteKeyCache},
    storage::{CONNECTION_REQUESTS_PENDING, CONNECTION_REQUESTS_SENT, Storage},
    transport::{RemoteClient, RemoteRequest, RemoteResponse, Route},
};

/// External services a [`ConnectionRequestService`] is built on
pub struct Collaborators {
    pub storage: Arc<dyn Storage>,
    pub client: Arc<dyn RemoteClient>,
    pub drives: Arc<dyn DriveResolver>,
    pub circles: Arc<dyn CircleDefinitions>,
    pub connections: Arc<dyn ConnectionStore>,
    pub events: Arc<dyn EventPublisher>,
}

/// Orchestrates sending, receiving, accepting and establishing connection
/// requests for one identity.
pub struct ConnectionRequestService {
    identity: Identity,
    config: Config,
    storage: Arc<dyn Storage>,
    client: Arc<dyn RemoteClient>,
    keys: AsymmetricKeyStore,
    remote_keys: RemoteKeyCache,
    grants: ExchangeGrantService,
    icr: IcrKeyRing,
    circles: Arc<dyn CircleDefinitions>,
    connections: Arc<dyn ConnectionStore>,
    events: Arc<dyn EventPublisher>,
}

impl ConnectionRequestService {
    pub fn new(identity: Identity, config: Config, collaborators: Collaborators) -> Self {
        let Collaborators {
            storage,
            client,
            drives,
            circles,
            connections,
            events,
        } = collaborators;

        Self {
            keys: AsymmetricKeyStore::new(storage.clone(), config.keys.clone()),
            remote_keys: RemoteKeyCache::new(
                storage.clone(),
                client.clone(),
                config.remote_keys.clone(),
            ),
            grants: ExchangeGrantService::new(drives),
            icr: IcrKeyRing::new(storage.clone()),
            identity,
            config,
            storage,
            client,
            circles,
            connections,
            events,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn keys(&self) -> &AsymmetricKeyStore {
        &self.keys
    }

    pub fn remote_keys(&self) -> &RemoteKeyCache {
        &self.remote_keys
    }

    pub fn grants(&self) -> &ExchangeGrantService {
        &self.grants
    }

    pub fn icr(&self) -> &IcrKeyRing {
        &self.icr
    }

    /// Send a connection request to `header.recipient`.
    ///
    /// Nothing is persisted unless the recipient accepted the delivery. The
    /// stored request keeps only the server half of the token handed out.
    pub async fn send_connection_request(
        &self,
        header: ConnectionRequestHeader,
        master_key: &SecretBuffer,
    ) -> Result<(), Error> {
        let recipient = header.recipient.clone();
        if recipient == self.identity {
            return Err(Error::ConnectionRequestToYourself);
        }

        let Some(contact_data) = header.contact_data.clone() else {
            return Err(Error::MissingField("contactData"));
        };

        self.transition(
            &recipient,
            RequestEvent::Send {
                request_id: header.id,
            },
        )
        .await?;

        let (permission_set, drive_grants) = self.resolve_circles(&header.circle_ids).await?;

        let keystore_key = SecretBuffer::random_key();
        let icr_key = self.icr.get_or_create(master_key).await?;
        let temp_raw_key = SecretBuffer::random_key();
        let temp_encrypted_icr_key = SymmetricKeyEncryptedAes::new(&temp_raw_key, &icr_key)?;

        let pending_access_grant = self
            .grants
            .create_exchange_grant(
                &keystore_key,
                &permission_set,
                &drive_grants,
                Some(master_key),
                Some(&icr_key),
            )
            .await?;

        let (access_registration, mut token) = self.grants.create_client_access_token(
            Some(&keystore_key),
            ClientTokenType::IdentityConnectionRegistration,
            None,
        )?;

        let verification_code = SecretBuffer::random_key();

        let body = {
            let payload = RequestPayload {
                id: header.id,
                sender: self.identity.clone(),
                recipient: recipient.clone(),
                message: header.message.clone(),
                contact_data: Some(contact_data.clone()),
                client_access_token64: token.to_portable_base64().as_str().to_owned(),
                temp_raw_key: temp_raw_key.as_slice().to_vec(),
                verification_code: verification_code.as_slice().to_vec(),
            };

            Zeroizing::new(serde_json::to_vec(&payload)?)
        };

        self.deliver(&recipient, header.id, &body).await?;

        let verification_hash =
            verification_hash(verification_code.as_slice(), &token.shared_secret);
        token.wipe();

        let sent = SentConnectionRequest {
            id: header.id,
            sender: self.identity.clone(),
            recipient: recipient.clone(),
            message: header.message,
            contact_data,
            sent_at: Utc::now(),
            circle_ids: header.circle_ids,
            pending_access_grant,
            access_registration,
            temp_encrypted_icr_key,
            verification_hash,
        };

        self.storage
            .upsert_json(CONNECTION_REQUESTS_SENT, recipient.as_str(), &sent)
            .await?;

        tracing::info!(%recipient, request_id = %sent.id, "sent connection request");

        Ok(())
    }

    /// Store a request delivered by `caller` without decrypting it
    pub async fn receive_connection_request(
        &self,
        caller: &Identity,
        delivered: DeliveredConnectionRequest,
    ) -> Result<(), Error> {
        if caller == &self.identity {
            return Err(Error::ConnectionRequestToYourself);
        }

        self.transition(
            caller,
            RequestEvent::Receive {
                request_id: delivered.id,
            },
        )
        .await?;

        let pending = PendingConnectionRequest {
            id: delivered.id,
            sender: caller.clone(),
            received_at: Utc::now(),
            payload: delivered.payload,
        };

        self.storage
            .upsert_json(CONNECTION_REQUESTS_PENDING, caller.as_str(), &pending)
            .await?;

        tracing::info!(sender = %caller, request_id = %pending.id, "received connection request");

        self.events
            .publish(ConnectionEvent::RequestReceived {
                sender: caller.clone(),
                request_id: pending.id,
            })
            .await;

        Ok(())
    }

    /// Accept the pending request of `header.sender` and reply to its
    /// establish endpoint. A failed reply leaves the pending request in place.
    pub async fn accept_connection_request(
        &self,
        header: AcceptRequestHeader,
        master_key: &SecretBuffer,
    ) -> Result<(), Error> {
        let sender = header.sender.clone();

        self.transition(&sender, RequestEvent::Accept).await?;

        let Some(pending) = self.get_pending(&sender).await? else {
            return Err(Error::InvalidOperation(format!(
                "no pending request from {sender}"
            )));
        };

        let payload = self.open_pending(&pending, master_key).await?;

        let remote_token = ClientAccessToken::from_portable_base64(&payload.client_access_token64)
            .map_err(|e| {
                tracing::warn!(%sender, "malformed client access token: {e}");
                Error::InvalidToken("client access token")
            })?;

        let (permission_set, drive_grants) = self.resolve_circles(&header.circle_ids).await?;

        let keystore_key = SecretBuffer::random_key();
        let icr_key = self.icr.get_or_create(master_key).await?;

        let access_grant = self
            .grants
            .create_exchange_grant(
                &keystore_key,
                &permission_set,
                &drive_grants,
                Some(master_key),
                Some(&icr_key),
            )
            .await?;

        let (access_registration, token) = self.grants.create_client_access_token(
            Some(&keystore_key),
            ClientTokenType::IdentityConnectionRegistration,
            Some(remote_token.shared_secret.clone_secret()),
        )?;

        let icr_encrypted_client_access_token =
            SymmetricKeyEncryptedAes::new(&icr_key, &remote_token.to_portable_bytes())?;

        let encrypted_reply = {
            let reply = ConnectionRequestReply {
                sender: self.identity.clone(),
                contact_data: header.contact_data.clone(),
                client_access_token_reply64: token.to_portable_base64().as_str().to_owned(),
                temp_key: payload.temp_raw_key.clone(),
                verification_hash: verification_hash(
                    &payload.verification_code,
                    &remote_token.shared_secret,
                ),
            };
            let body = Zeroizing::new(serde_json::to_vec(&reply)?);

            SharedSecretEncryptedPayload::encrypt(&body, &remote_token.shared_secret)?
        };

        let auth_token = remote_token.to_authentication_token().to_portable_base64();
        let request = RemoteRequest::new(
            Route::EstablishConnection,
            serde_json::to_vec(&encrypted_reply)?,
        )
        .with_auth_token(auth_token.clone());

        self.post_with_retry(&sender, request).await?;

        self.connections
            .connect(ConnectionRecord {
                peer: sender.clone(),
                contact_data: payload.contact_data.clone(),
                circle_ids: header.circle_ids,
                access_grant,
                access_registration,
                icr_encrypted_client_access_token,
                connected_at: Utc::now(),
            })
            .await?;

        self.delete_pending_request(&sender).await?;
        self.delete_sent_request(&sender).await?;

        tracing::info!(%sender, request_id = %pending.id, "accepted connection request");

        self.notify_finalized(&sender, auth_token).await;
        self.events
            .publish(ConnectionEvent::RequestAccepted { sender })
            .await;

        Ok(())
    }

    /// Handle the reply of a peer that accepted our request
    pub async fn establish_connection(
        &self,
        caller: &Identity,
        reply: &SharedSecretEncryptedPayload,
        auth_token64: &str,
    ) -> Result<(), Error> {
        self.transition(caller, RequestEvent::Establish).await?;

        let Some(sent) = self.get_sent_request(caller).await? else {
            return Err(Error::InvalidOperation(format!(
                "no connection request was sent to {caller}"
            )));
        };

        let auth_token = ClientAuthenticationToken::from_portable_base64(auth_token64)
            .map_err(|_| Error::InvalidToken("authentication token"))?;

        let (_keystore_key, shared_secret) =
            sent.access_registration.decrypt_shared_secret(&auth_token)?;

        let body = Zeroizing::new(reply.decrypt(&shared_secret).map_err(|e| {
            tracing::warn!(%caller, "reply could not be decrypted: {e}");
            Error::Security("reply is not encrypted under the shared secret".into())
        })?);

        let reply: ConnectionRequestReply = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(%caller, "malformed reply: {e}");
            Error::Security("malformed connection reply".into())
        })?;

        if &reply.sender != caller {
            return Err(Error::Security(format!(
                "reply from {caller} claims to come from {}",
                reply.sender
            )));
        }

        if !bool::from(reply.verification_hash[..].ct_eq(&sent.verification_hash[..])) {
            tracing::warn!(%caller, "verification hash mismatch");
            return Err(Error::Security("reply verification failed".into()));
        }

        let icr_key = SecretBuffer::with_secret(reply.temp_key.clone(), |temp_key| {
            sent.temp_encrypted_icr_key.decrypt_key_clone(temp_key)
        })?;

        let remote_token = ClientAccessToken::from_portable_base64(
            &reply.client_access_token_reply64,
        )
        .map_err(|_| Error::InvalidToken("client access token"))?;

        if !bool::from(remote_token.shared_secret.ct_eq(&shared_secret)) {
            return Err(Error::Security(
                "peer token is bound to another shared secret".into(),
            ));
        }

        let record = ConnectionRecord {
            peer: caller.clone(),
            contact_data: reply.contact_data.clone(),
            circle_ids: sent.circle_ids,
            access_grant: sent.pending_access_grant,
            access_registration: sent.access_registration,
            icr_encrypted_client_access_token: SymmetricKeyEncryptedAes::new(
                &icr_key,
                &remote_token.to_portable_bytes(),
            )?,
            connected_at: Utc::now(),
        };
        self.connections.connect(record).await?;

        self.delete_sent_request(caller).await?;
        self.delete_pending_request(caller).await?;

        tracing::info!(recipient = %caller, request_id = %sent.id, "connection established");

        self.events
            .publish(ConnectionEvent::ConnectionAccepted {
                recipient: caller.clone(),
            })
            .await;

        Ok(())
    }

    /// Handle the peer's confirmation that it recorded the connection
    pub async fn finalize_connection(
        &self,
        caller: &Identity,
        auth_token64: &str,
    ) -> Result<(), Error> {
        let Some(record) = self.connections.get(caller).await? else {
            return Err(Error::InvalidOperation(format!(
                "no connection with {caller}"
            )));
        };

        let auth_token = ClientAuthenticationToken::from_portable_base64(auth_token64)
            .map_err(|_| Error::InvalidToken("authentication token"))?;
        record
            .access_registration
            .decrypt_using_client_token(&auth_token)?;

        tracing::info!(peer = %caller, "connection finalized");

        self.events
            .publish(ConnectionEvent::ConnectionFinalized {
                peer: caller.clone(),
            })
            .await;

        Ok(())
    }

    /// Drop the pending request of `sender`, if any. The sender is not told.
    pub async fn delete_pending_request(&self, sender: &Identity) -> Result<(), Error> {
        self.storage
            .delete(CONNECTION_REQUESTS_PENDING, sender.as_str())
            .await?;
        tracing::debug!(%sender, "deleted pending request");

        Ok(())
    }

    /// Drop the request sent to `recipient`, if any. The recipient is not told.
    pub async fn delete_sent_request(&self, recipient: &Identity) -> Result<(), Error> {
        self.storage
            .delete(CONNECTION_REQUESTS_SENT, recipient.as_str())
            .await?;
        tracing::debug!(%recipient, "deleted sent request");

        Ok(())
    }

    /// Decrypted pending request of `sender`
    pub async fn get_pending_request(
        &self,
        sender: &Identity,
        master_key: &SecretBuffer,
    ) -> Result<Option<ConnectionRequest>, Error> {
        let Some(pending) = self.get_pending(sender).await? else {
            return Ok(None);
        };

        let payload = self.open_pending(&pending, master_key).await?;

        Ok(Some(ConnectionRequest {
            id: pending.id,
            sender: pending.sender,
            recipient: payload.recipient.clone(),
            message: payload.message.clone(),
            contact_data: payload.contact_data.clone(),
            received_at: pending.received_at,
        }))
    }

    /// Pending requests as stored, still encrypted
    pub async fn get_pending_requests(&self) -> Result<Vec<PendingConnectionRequest>, Error> {
        self.storage.list_json(CONNECTION_REQUESTS_PENDING).await
    }

    pub async fn get_sent_request(
        &self,
        recipient: &Identity,
    ) -> Result<Option<SentConnectionRequest>, Error> {
        self.storage
            .get_json(CONNECTION_REQUESTS_SENT, recipient.as_str())
            .await
    }

    pub async fn get_sent_requests(&self) -> Result<Vec<SentConnectionRequest>, Error> {
        self.storage.list_json(CONNECTION_REQUESTS_SENT).await
    }

    /// Owner activity hook: rotates keys when due, then moves pending
    /// requests to the current key so they outlive the key they were
    /// encrypted to.
    pub async fn handle_owner_online(&self, master_key: &SecretBuffer) -> Result<(), Error> {
        if self.keys.handle_owner_online(master_key).await? {
            self.upgrade_pending_requests(master_key).await?;
        }

        Ok(())
    }

    /// Re-wrap every pending request to the current request key. Returns how
    /// many were upgraded.
    pub async fn upgrade_pending_requests(&self, master_key: &SecretBuffer) -> Result<usize, Error> {
        let role = self.config.request_key_role;
        let mut upgraded = 0;

        for mut pending in self.get_pending_requests().await? {
            let payload = match self
                .keys
                .upgrade_payload(role, &pending.payload, Some(master_key))
                .await
            {
                Ok(payload) => payload,
                Err(e @ Error::InvalidPublicKey { .. }) => {
                    tracing::warn!(sender = %pending.sender, "pending request is unreadable: {e}");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if payload.crc32 != pending.payload.crc32 {
                pending.payload = payload;
                self.storage
                    .upsert_json(CONNECTION_REQUESTS_PENDING, pending.sender.as_str(), &pending)
                    .await?;
                upgraded += 1;
            }
        }

        if upgraded > 0 {
            tracing::info!(upgraded, "upgraded pending requests to the current key");
        }

        Ok(upgraded)
    }

    /// Serve a call made by another identity. Errors become negative
    /// responses; internal details are not returned to the caller.
    pub async fn handle_peer_request(
        &self,
        caller: &Identity,
        request: RemoteRequest,
    ) -> RemoteResponse {
        let route = request.route;

        match self.dispatch(caller, request).await {
            Ok(body) => RemoteResponse::ok(body),
            Err(e) => {
                let status = match e.category() {
                    ErrorCategory::Client => 400,
                    ErrorCategory::Security => 403,
                    ErrorCategory::Remote => 502,
                    ErrorCategory::System => 500,
                };
                tracing::warn!(%caller, ?route, status, "peer request failed: {e}");

                match e.category() {
                    ErrorCategory::System => RemoteResponse::error(status, "internal error"),
                    _ => RemoteResponse::error(status, &e.to_string()),
                }
            }
        }
    }

    async fn dispatch(&self, caller: &Identity, request: RemoteRequest) -> Result<Vec<u8>, Error> {
        match request.route {
            Route::PublicKey(role) => {
                let public_key = self.keys.public_key(role).await?;
                Ok(serde_json::to_vec(&public_key)?)
            }
            Route::DeliverConnectionRequest => {
                let delivered = parse_body(&request.body)?;
                self.receive_connection_request(caller, delivered).await?;
                Ok(Vec::new())
            }
            Route::EstablishConnection => {
                let auth_token = request
                    .auth_token
                    .as_deref()
                    .ok_or(Error::MissingField("authToken"))?;
                let reply: SharedSecretEncryptedPayload = parse_body(&request.body)?;
                self.establish_connection(caller, &reply, auth_token).await?;
                Ok(Vec::new())
            }
            Route::FinalizeConnection => {
                let auth_token = request
                    .auth_token
                    .as_deref()
                    .ok_or(Error::MissingField("authToken"))?;
                self.finalize_connection(caller, auth_token).await?;
                Ok(Vec::new())
            }
        }
    }

    async fn get_pending(&self, sender: &Identity) -> Result<Option<PendingConnectionRequest>, Error> {
        self.storage
            .get_json(CONNECTION_REQUESTS_PENDING, sender.as_str())
            .await
    }

    /// State of `peer` as seen by `event`. A reply to our request wins over a
    /// stray pending request, which establishing the connection removes.
    async fn state_of(&self, peer: &Identity, event: RequestEvent) -> Result<ConnectionState, Error> {
        let pending = self.get_pending(peer).await?;
        let sent = self.get_sent_request(peer).await?;

        Ok(match (pending, sent) {
            (Some(_), Some(sent)) if event == RequestEvent::Establish => {
                tracing::warn!(%peer, "establishing over a stray pending request");
                ConnectionState::Sent {
                    request_id: sent.id,
                }
            }
            (Some(pending), sent) => {
                if sent.is_some() {
                    tracing::warn!(%peer, "both a sent and a pending request exist");
                }
                ConnectionState::Pending {
                    request_id: pending.id,
                }
            }
            (None, Some(sent)) => ConnectionState::Sent {
                request_id: sent.id,
            },
            (None, None) => match self.connections.get(peer).await? {
                Some(_) => ConnectionState::Connected,
                None => ConnectionState::None,
            },
        })
    }

    async fn transition(
        &self,
        peer: &Identity,
        event: RequestEvent,
    ) -> Result<ConnectionState, Error> {
        let current = self.state_of(peer, event).await?;

        ConnectionMachine::transition(&current, event).map_err(|e| {
            tracing::warn!(%peer, ?current, ?event, "rejected: {e}");

            match e {
                StateError::DuplicateRequest => Error::DuplicateRequest(peer.clone()),
                StateError::ExistingIncomingRequest => {
                    Error::ExistingIncomingRequest(peer.clone())
                }
                StateError::ConcurrencyConflict | StateError::InvalidTransition { .. } => {
                    Error::InvalidOperation(format!("{e} ({peer})"))
                }
            }
        })
    }

    async fn resolve_circles(
        &self,
        circle_ids: &[CircleId],
    ) -> Result<(PermissionSet, Vec<DriveGrantRequest>), Error> {
        let mut permission_set = PermissionSet::default();
        let mut drive_grants = Vec::new();

        for id in circle_ids {
            let Some(circle) = self.circles.get_circle(id).await? else {
                return Err(Error::InvalidOperation(format!("unknown circle {id}")));
            };

            permission_set.merge(&circle.permission_set);
            drive_grants.extend(circle.drive_grants);
        }

        Ok((permission_set, drive_grants))
    }

    /// Decrypt a pending request and check it is addressed to us by its sender
    async fn open_pending(
        &self,
        pending: &PendingConnectionRequest,
        master_key: &SecretBuffer,
    ) -> Result<RequestPayload, Error> {
        let bytes = Zeroizing::new(
            self.keys
                .decrypt_payload(
                    self.config.request_key_role,
                    &pending.payload,
                    Some(master_key),
                )
                .await?,
        );

        let payload: RequestPayload = serde_json::from_slice(&bytes).map_err(|e| {
            tracing::warn!(sender = %pending.sender, "malformed connection request: {e}");
            Error::Security("malformed connection request".into())
        })?;

        if payload.sender != pending.sender || payload.recipient != self.identity {
            return Err(Error::Security(format!(
                "request delivered by {} was written by {} for {}",
                pending.sender, payload.sender, payload.recipient
            )));
        }

        if payload.client_access_token64.is_empty() {
            return Err(Error::MissingField("clientAccessToken64"));
        }
        if payload.temp_raw_key.is_empty() {
            return Err(Error::MissingField("tempRawKey"));
        }
        if payload.verification_code.is_empty() {
            return Err(Error::MissingField("verificationCode"));
        }

        Ok(payload)
    }

    /// Seal `body` to the recipient's published key and deliver it. A failed
    /// attempt drops the cached key so the next one fetches it again.
    async fn deliver(&self, recipient: &Identity, request_id: Uuid, body: &[u8]) -> Result<(), Error> {
        let retry = self.config.retry;

        for attempt in 0..retry.attempts() {
            retry.wait(attempt).await;

            match self.try_deliver(recipient, request_id, body).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(%recipient, attempt, "delivering connection request failed: {e}");
                    self.remote_keys.invalidate(recipient).await?;
                }
            }
        }

        Err(Error::ConnectionRequestFailed(recipient.clone()))
    }

    async fn try_deliver(
        &self,
        recipient: &Identity,
        request_id: Uuid,
        body: &[u8],
    ) -> Result<(), Error> {
        let role = self.config.request_key_role;
        let public_key = self
            .remote_keys
            .resolve(role, recipient, true, true)
            .await?
            .ok_or_else(|| Error::MissingKey {
                role,
                identity: recipient.clone(),
            })?;

        let payload = RsaEncryptedPayload::seal(body, |key_header| {
            Ok::<_, Error>((public_key.crc32, public_key.encrypt(key_header)?))
        })?;

        let delivered = DeliveredConnectionRequest {
            id: request_id,
            payload,
        };
        let request =
            RemoteRequest::new(Route::DeliverConnectionRequest, serde_json::to_vec(&delivered)?);

        let response = self.client.send(recipient, request).await?;
        if !response.is_success() {
            tracing::warn!(%recipient, status = response.status, "delivery rejected");
            return Err(Error::ConnectionRequestFailed(recipient.clone()));
        }

        Ok(())
    }

    async fn post_with_retry(
        &self,
        recipient: &Identity,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, Error> {
        let retry = self.config.retry;

        for attempt in 0..retry.attempts() {
            retry.wait(attempt).await;

            match self.client.send(recipient, request.clone()).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => {
                    tracing::warn!(%recipient, attempt, status = response.status, route = ?request.route, "call rejected")
                }
                Err(e) => tracing::warn!(%recipient, attempt, route = ?request.route, "call failed: {e}"),
            }
        }

        Err(Error::ConnectionRequestFailed(recipient.clone()))
    }

    async fn notify_finalized(&self, peer: &Identity, auth_token: String) {
        let request =
            RemoteRequest::new(Route::FinalizeConnection, Vec::new()).with_auth_token(auth_token);

        match self.client.send(peer, request).await {
            Ok(response) if response.is_success() => {
                tracing::debug!(%peer, "peer finalized connection")
            }
            Ok(response) => {
                tracing::warn!(%peer, status = response.status, "finalize rejected")
            }
            Err(e) => tracing::warn!(%peer, "finalize failed: {e}"),
        }
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::warn!("malformed peer request: {e}");
        Error::InvalidOperation("malformed request body".into())
    })
}
