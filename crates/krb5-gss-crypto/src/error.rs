use picky_krb::crypto::KerberosCryptoError;
use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("unsupported enc-type {0}")]
    UnsupportedEncType(i32),
    #[error("invalid key length: got {got} bytes, expected {expected}")]
    KeyLength { got: usize, expected: usize },
    #[error("invalid cipher text length: got {got} bytes, need at least {min}")]
    CipherLength { got: usize, min: usize },
    #[error("input length {0} is not a multiple of the cipher block size")]
    BlockAlignment(usize),
    #[error("HMAC key rejected")]
    HmacKey,
    #[error("integrity check failed")]
    IntegrityCheck,
    #[error("kerberos crypto: {0}")]
    Kerberos(String),
}

impl From<KerberosCryptoError> for CryptoError {
    fn from(error: KerberosCryptoError) -> Self {
        match error {
            KerberosCryptoError::KeyLength(got, expected) => Self::KeyLength { got, expected },
            KerberosCryptoError::CipherLength(got, min) => Self::CipherLength { got, min },
            KerberosCryptoError::IntegrityCheck => Self::IntegrityCheck,
            other => Self::Kerberos(other.to_string()),
        }
    }
}
