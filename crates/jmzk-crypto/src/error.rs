use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("sign failed: {0}")]
    SignFailed(String),
    #[error("bad signature: {0}")]
    BadSignature(String),
}

impl From<CryptoError> for jmzk_chain_core::JmzkError {
    fn from(e: CryptoError) -> Self {
        jmzk_chain_core::JmzkError::InvalidArgument(e.to_string())
    }
}
