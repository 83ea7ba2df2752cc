use crate::definitions::{Identity, KeyRole};

/// Error originating from the connection and key management services
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error: {0}")]
    Crypto(#[from] crate::crypto::CryptoError),
    #[error("Error: {0}")]
    Transport(#[from] crate::transport::TransportError),
    #[error("Error: {0}")]
    Storage(#[from] crate::storage::StorageError),
    #[error("Error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Error: a connection request to {0} was already sent")]
    DuplicateRequest(Identity),
    #[error("Error: {0} already sent you a connection request")]
    ExistingIncomingRequest(Identity),
    #[error("Error: cannot send a connection request to yourself")]
    ConnectionRequestToYourself,
    #[error("Error: missing field {0}")]
    MissingField(&'static str),
    #[error("Error: invalid drive {0}")]
    InvalidDrive(String),
    #[error("Error: invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Error: invalid token: {0}")]
    InvalidToken(&'static str),
    #[error("Error: no {role} key matches crc {crc32}")]
    InvalidPublicKey { role: KeyRole, crc32: u32 },
    #[error("Error: security violation: {0}")]
    Security(String),
    #[error("Error: access was revoked")]
    Revoked,
    #[error("Error: connection request to {0} failed")]
    ConnectionRequestFailed(Identity),
    #[error("Error: missing {role} key for {identity}")]
    MissingKey { role: KeyRole, identity: Identity },
    #[error("Error: no {0} keys have been created yet")]
    KeysNotInitialized(KeyRole),
    #[error("Error: corrupted record: {0}")]
    Corrupt(String),
    #[error("Internal error")]
    Internal,
}

/// Coarse classification of an [`Error`], used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The request is malformed or violates a precondition, never retried
    Client,
    /// Decryption, checksum, revocation or stale key failures
    Security,
    /// Talking to a counterpart identity failed
    Remote,
    /// Internal invariant violations and storage failures
    System,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        use Error::*;

        match self {
            DuplicateRequest(_)
            | ExistingIncomingRequest(_)
            | ConnectionRequestToYourself
            | MissingField(_)
            | InvalidDrive(_)
            | InvalidOperation(_)
            | InvalidToken(_) => ErrorCategory::Client,
            Crypto(_) | InvalidPublicKey { .. } | Security(_) | Revoked => ErrorCategory::Security,
            Transport(_) | ConnectionRequestFailed(_) | MissingKey { .. } => ErrorCategory::Remote,
            Storage(_) | Serde(_) | KeysNotInitialized(_) | Corrupt(_) | Internal => {
                ErrorCategory::System
            }
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        Self::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(
            Error::DuplicateRequest(Identity::new("bob.example")).category(),
            ErrorCategory::Client
        );
        assert_eq!(
            Error::InvalidPublicKey {
                role: KeyRole::Online,
                crc32: 7
            }
            .category(),
            ErrorCategory::Security
        );
        assert_eq!(
            Error::Crypto(crate::crypto::CryptoError::ChecksumMismatch).category(),
            ErrorCategory::Security
        );
        assert_eq!(
            Error::ConnectionRequestFailed(Identity::new("bob.example")).category(),
            ErrorCategory::Remote
        );
        assert_eq!(Error::Internal.category(), ErrorCategory::System);
    }
}
