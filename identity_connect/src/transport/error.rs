#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[cfg(feature = "http")]
    #[error("fetching '{0}' failed: {1}")]
    Http(String, reqwest::Error),
    #[error("invalid address '{0}'")]
    InvalidTransportAddress(String),
    #[error("'{0}' is unreachable")]
    Unreachable(String),
    #[error("request to '{0}' timed out")]
    Timeout(String),
    #[error("internal error")]
    Internal,
}
