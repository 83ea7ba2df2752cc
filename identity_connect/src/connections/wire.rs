//! Plaintext bodies exchanged inside the encrypted envelopes. Both carry key
//! material and are zeroed when dropped.

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::{
    crypto::{SecretBuffer, sha256},
    definitions::{ContactData, Identity},
};

/// Sealed to the recipient's public key
#[serde_as]
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestPayload {
    #[zeroize(skip)]
    pub id: Uuid,
    #[zeroize(skip)]
    pub sender: Identity,
    #[zeroize(skip)]
    pub recipient: Identity,
    #[zeroize(skip)]
    pub message: String,
    #[zeroize(skip)]
    pub contact_data: Option<ContactData>,
    /// Portable token the recipient uses to call us back
    #[serde(default)]
    pub client_access_token64: String,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub temp_raw_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    #[serde(default)]
    pub verification_code: Vec<u8>,
}

/// Encrypted under the shared secret chosen by the sender
#[serde_as]
#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConnectionRequestReply {
    #[zeroize(skip)]
    pub sender: Identity,
    #[zeroize(skip)]
    pub contact_data: Option<ContactData>,
    pub client_access_token_reply64: String,
    /// Echo of the request's `temp_raw_key`
    #[serde_as(as = "Base64")]
    pub temp_key: Vec<u8>,
    #[serde_as(as = "Base64")]
    pub verification_hash: [u8; 32],
}

/// Binds the request's random code to the shared secret; proves the reply
/// was produced by someone who read the request
pub(crate) fn verification_hash(code: &[u8], shared_secret: &SecretBuffer) -> [u8; 32] {
    let mut bytes = Zeroizing::new(Vec::with_capacity(code.len() + shared_secret.len()));
    bytes.extend_from_slice(code);
    bytes.extend_from_slice(shared_secret.as_slice());

    sha256(&bytes)
}
