//! The two halves of a split access secret: [`AccessRegistration`] stays with
//! the issuing identity, [`ClientAccessToken`] is handed to the client.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::{
    Error,
    crypto::{
        CryptoError, KEY_SIZE, SecretBuffer, SymmetricKeyEncryptedAes, SymmetricKeyEncryptedXor,
    },
    definitions::ClientTokenType,
};

const ID_SIZE: usize = 16;
const AUTH_TOKEN_SIZE: usize = ID_SIZE + KEY_SIZE + 1;
const ACCESS_TOKEN_SIZE: usize = AUTH_TOKEN_SIZE + KEY_SIZE;

/// Server retained half of a client's split keystore key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRegistration {
    pub id: Uuid,
    pub client_type: ClientTokenType,
    pub created_at: DateTime<Utc>,
    pub client_half_encrypted_keystore_key: SymmetricKeyEncryptedXor,
    pub keystore_key_encrypted_shared_secret: SymmetricKeyEncryptedAes,
    pub keystore_key_encrypted_grant_keystore_key: Option<SymmetricKeyEncryptedAes>,
    pub is_revoked: bool,
}

impl AccessRegistration {
    /// Recombine the keystore key from this half and the client's half
    pub fn decrypt_using_client_token(
        &self,
        token: &ClientAuthenticationToken,
    ) -> Result<SecretBuffer, Error> {
        if token.id != self.id {
            return Err(Error::Security(
                "token was not issued for this registration".into(),
            ));
        }

        self.client_half_encrypted_keystore_key
            .decrypt_key_clone(&token.access_token_half_key)
            .map_err(|e| match e {
                CryptoError::ChecksumMismatch | CryptoError::InvalidLength => {
                    Error::Security("client half does not match the registration".into())
                }
                e => Error::from(e),
            })
    }

    /// Keystore key and shared secret, recombined with the client's half
    pub fn decrypt_shared_secret(
        &self,
        token: &ClientAuthenticationToken,
    ) -> Result<(SecretBuffer, SecretBuffer), Error> {
        let keystore_key = self.decrypt_using_client_token(token)?;
        let shared_secret = self
            .keystore_key_encrypted_shared_secret
            .decrypt_key_clone(&keystore_key)?;

        Ok((keystore_key, shared_secret))
    }

    pub fn revoke(&mut self) {
        self.is_revoked = true;
    }
}

/// Client retained half plus the shared secret for symmetric traffic
#[derive(Debug)]
pub struct ClientAccessToken {
    pub id: Uuid,
    pub access_token_half_key: SecretBuffer,
    pub shared_secret: SecretBuffer,
    pub client_token_type: ClientTokenType,
}

impl ClientAccessToken {
    /// `id || half_key || token_type || shared_secret`
    pub fn to_portable_bytes(&self) -> SecretBuffer {
        let mut bytes = Vec::with_capacity(ACCESS_TOKEN_SIZE);
        bytes.extend_from_slice(self.id.as_bytes());
        bytes.extend_from_slice(self.access_token_half_key.as_slice());
        bytes.push(self.client_token_type as u8);
        bytes.extend_from_slice(self.shared_secret.as_slice());

        SecretBuffer::new(bytes)
    }

    pub fn from_portable_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != ACCESS_TOKEN_SIZE {
            return Err(CryptoError::MalformedToken("access token must be 49 bytes"));
        }

        let auth = ClientAuthenticationToken::from_portable_bytes(&bytes[..AUTH_TOKEN_SIZE])?;

        Ok(Self {
            id: auth.id,
            access_token_half_key: auth.access_token_half_key,
            shared_secret: SecretBuffer::from_slice(&bytes[AUTH_TOKEN_SIZE..]),
            client_token_type: auth.client_token_type,
        })
    }

    pub fn to_portable_base64(&self) -> Zeroizing<String> {
        Zeroizing::new(Base64::encode_string(self.to_portable_bytes().as_slice()))
    }

    pub fn from_portable_base64(token: &str) -> Result<Self, CryptoError> {
        let bytes = SecretBuffer::new(Base64::decode_vec(token)?);
        Self::from_portable_bytes(bytes.as_slice())
    }

    /// The part of the token that authenticates the client, without the shared secret
    pub fn to_authentication_token(&self) -> ClientAuthenticationToken {
        ClientAuthenticationToken {
            id: self.id,
            access_token_half_key: self.access_token_half_key.clone_secret(),
            client_token_type: self.client_token_type,
        }
    }

    pub fn wipe(&mut self) {
        self.access_token_half_key.wipe();
        self.shared_secret.wipe();
    }

    pub fn is_wiped(&self) -> bool {
        self.access_token_half_key.is_wiped() && self.shared_secret.is_wiped()
    }
}

#[derive(Debug)]
pub struct ClientAuthenticationToken {
    pub id: Uuid,
    pub access_token_half_key: SecretBuffer,
    pub client_token_type: ClientTokenType,
}

impl ClientAuthenticationToken {
    /// `id || half_key || token_type`
    pub fn to_portable_bytes(&self) -> SecretBuffer {
        let mut bytes = Vec::with_capacity(AUTH_TOKEN_SIZE);
        bytes.extend_from_slice(self.id.as_bytes());
        bytes.extend_from_slice(self.access_token_half_key.as_slice());
        bytes.push(self.client_token_type as u8);

        SecretBuffer::new(bytes)
    }

    pub fn from_portable_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != AUTH_TOKEN_SIZE {
            return Err(CryptoError::MalformedToken(
                "authentication token must be 33 bytes",
            ));
        }

        let id = Uuid::from_slice(&bytes[..ID_SIZE])
            .map_err(|_| CryptoError::MalformedToken("invalid token id"))?;
        let client_token_type = ClientTokenType::try_from(bytes[AUTH_TOKEN_SIZE - 1])
            .map_err(|_| CryptoError::MalformedToken("unknown client token type"))?;

        Ok(Self {
            id,
            access_token_half_key: SecretBuffer::from_slice(&bytes[ID_SIZE..ID_SIZE + KEY_SIZE]),
            client_token_type,
        })
    }

    pub fn to_portable_base64(&self) -> String {
        Base64::encode_string(self.to_portable_bytes().as_slice())
    }

    pub fn from_portable_base64(token: &str) -> Result<Self, CryptoError> {
        let bytes = SecretBuffer::new(Base64::decode_vec(token)?);
        Self::from_portable_bytes(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ClientAccessToken {
        ClientAccessToken {
            id: Uuid::new_v4(),
            access_token_half_key: SecretBuffer::random_key(),
            shared_secret: SecretBuffer::random_key(),
            client_token_type: ClientTokenType::IdentityConnectionRegistration,
        }
    }

    #[test]
    fn portable_access_token() {
        let original = token();
        let bytes = original.to_portable_bytes();
        assert_eq!(bytes.len(), 49);

        let restored = ClientAccessToken::from_portable_bytes(bytes.as_slice()).unwrap();

        assert_eq!(restored.id, original.id);
        assert_eq!(
            restored.access_token_half_key.as_slice(),
            original.access_token_half_key.as_slice()
        );
        assert_eq!(restored.client_token_type, original.client_token_type);
        assert_eq!(
            restored.shared_secret.as_slice(),
            original.shared_secret.as_slice()
        );
    }

    #[test]
    fn authentication_token_is_a_prefix() {
        let access = token();
        let auth = access.to_authentication_token();
        let encoded = auth.to_portable_base64();

        let decoded = ClientAuthenticationToken::from_portable_base64(&encoded).unwrap();
        assert_eq!(decoded.to_portable_bytes().len(), 33);
        assert_eq!(
            decoded.to_portable_bytes().as_slice(),
            &access.to_portable_bytes().as_slice()[..33]
        );
    }

    #[test]
    fn malformed_tokens() {
        assert!(matches!(
            ClientAccessToken::from_portable_bytes(&[0; 48]),
            Err(CryptoError::MalformedToken(_))
        ));

        let mut bytes = token().to_portable_bytes().as_slice().to_vec();
        bytes[32] = 0xff;
        assert!(ClientAccessToken::from_portable_bytes(&bytes).is_err());

        assert!(ClientAuthenticationToken::from_portable_base64("***").is_err());
    }

    #[test]
    fn wipe_clears_both_secrets() {
        let mut access = token();
        access.wipe();

        assert!(access.is_wiped());
    }
}
