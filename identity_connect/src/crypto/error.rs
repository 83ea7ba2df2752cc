#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("rsa operation failed: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("could not encode key material: {0}")]
    KeyEncoding(String),
    #[error("signature verification failed: {0}")]
    Verify(#[from] ed25519_dalek::SignatureError),
    #[error("invalid key or iv length")]
    InvalidLength,
    #[error("decryption failed, wrong key or corrupted data")]
    Unpad,
    #[error("incorrect key")]
    IncorrectKey,
    #[error("checksum mismatch, key halves do not belong together")]
    ChecksumMismatch,
    #[error("key pair is not of kind {0}")]
    UnexpectedKeyKind(&'static str),
    #[error("malformed portable token: {0}")]
    MalformedToken(&'static str),
    #[error("base64 decoding failed")]
    Base64,
}

impl From<aes::cipher::InvalidLength> for CryptoError {
    fn from(_: aes::cipher::InvalidLength) -> Self {
        CryptoError::InvalidLength
    }
}

impl From<cbc::cipher::block_padding::UnpadError> for CryptoError {
    fn from(_: cbc::cipher::block_padding::UnpadError) -> Self {
        CryptoError::Unpad
    }
}

impl From<base64ct::Error> for CryptoError {
    fn from(_: base64ct::Error) -> Self {
        CryptoError::Base64
    }
}

impl From<rsa::pkcs8::Error> for CryptoError {
    fn from(e: rsa::pkcs8::Error) -> Self {
        CryptoError::KeyEncoding(e.to_string())
    }
}

impl From<rsa::pkcs8::spki::Error> for CryptoError {
    fn from(e: rsa::pkcs8::spki::Error) -> Self {
        CryptoError::KeyEncoding(e.to_string())
    }
}
