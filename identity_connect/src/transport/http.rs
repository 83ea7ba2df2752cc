use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::{RemoteClient, RemoteRequest, RemoteResponse, Route, TransportError};
use crate::definitions::Identity;

pub(crate) const SCHEME_HTTPS: &str = "https";

const PEER_API_ROOT: &str = "api/peer";

/// Calls other identities at `https://{identity}/api/peer/{route}`
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    scheme: String,
    timeout: Duration,
}

impl HttpRemoteClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            scheme: SCHEME_HTTPS.to_string(),
            timeout,
        }
    }

    /// Use another scheme, e.g. plain `http` for local testing
    pub fn with_scheme(mut self, scheme: &str) -> Self {
        self.scheme = scheme.to_string();
        self
    }

    pub(crate) fn url(&self, recipient: &Identity, route: &Route) -> Result<Url, TransportError> {
        let address = format!("{}://{recipient}/{PEER_API_ROOT}/{}", self.scheme, route.path());

        Url::parse(&address).map_err(|_| TransportError::InvalidTransportAddress(address))
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn send(
        &self,
        recipient: &Identity,
        request: RemoteRequest,
    ) -> Result<RemoteResponse, TransportError> {
        let url = self.url(recipient, &request.route)?;
        let client = crate::http_client::reqwest_client()
            .map_err(|e| TransportError::Http(e.context.to_string(), e.source))?;

        let builder = match request.route {
            Route::PublicKey(_) => client.get(url.clone()),
            _ => client.post(url.clone()).body(request.body),
        };

        let builder = match request.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(url.to_string())
            } else {
                TransportError::Http(url.to_string(), e)
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(url.to_string(), e))?;

        let response = RemoteResponse {
            status,
            body: body.to_vec(),
        };

        if !response.is_success() {
            tracing::error!(%url, status, "{}", String::from_utf8_lossy(&response.body));
        }

        Ok(response)
    }
}
