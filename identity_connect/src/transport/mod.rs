use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::definitions::{Identity, KeyRole};

pub mod error;

#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpRemoteClient;

/// Peer endpoints one identity calls on another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Route {
    /// Fetch the currently published public key of a role
    PublicKey(KeyRole),
    /// Deliver an RSA encrypted connection request
    DeliverConnectionRequest,
    /// Reply to a connection request the caller sent us
    EstablishConnection,
    /// Tell the other side both ends recorded the connection
    FinalizeConnection,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::PublicKey(role) => format!("security/publickey/{role}"),
            Route::DeliverConnectionRequest => "connections/requests/deliver".to_string(),
            Route::EstablishConnection => "connections/establish".to_string(),
            Route::FinalizeConnection => "connections/finalize".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    pub route: Route,
    /// Base64 portable authentication token, when the route requires one
    pub auth_token: Option<String>,
    pub body: Vec<u8>,
}

impl RemoteRequest {
    pub fn new(route: Route, body: Vec<u8>) -> Self {
        RemoteRequest {
            route,
            auth_token: None,
            body,
        }
    }

    pub fn with_auth_token(mut self, auth_token: String) -> Self {
        self.auth_token = Some(auth_token);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResponse {
    /// HTTP style status code
    pub status: u16,
    pub body: Vec<u8>,
}

impl RemoteResponse {
    pub fn ok(body: Vec<u8>) -> Self {
        RemoteResponse { status: 200, body }
    }

    pub fn error(status: u16, message: &str) -> Self {
        RemoteResponse {
            status,
            body: message.as_bytes().to_vec(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound network client used to call other identities.
/// Timeouts are the client's concern and are reported as errors.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn send(
        &self,
        recipient: &Identity,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError>;
}
