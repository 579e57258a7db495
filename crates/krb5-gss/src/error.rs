use core::fmt;

use krb5_gss_core::{CodecErrorKind, DecodeError, EncodeError};
use krb5_gss_crypto::CryptoError;

pub type GssResult<T> = Result<T, GssError>;

pub type GssError = krb5_gss_core::Error<GssErrorKind>;

/// Major status of a failed GSS-API call.
#[non_exhaustive]
#[derive(Debug)]
pub enum GssErrorKind {
    /// Unknown or unimplemented enc-type, signing algorithm or QOP.
    UnsupportedAlgorithm,
    /// Malformed wire structure.
    DefectiveToken,
    /// Checksum, direction or sequence check failed.
    ///
    /// Which sub-check failed is deliberately not recorded.
    BadMic,
    /// Channel bindings do not match the local ones.
    BadBindings,
    Encode(EncodeError),
    Failure,
}

impl fmt::Display for GssErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GssErrorKind::UnsupportedAlgorithm => write!(f, "unsupported algorithm"),
            GssErrorKind::DefectiveToken => write!(f, "defective token"),
            GssErrorKind::BadMic => write!(f, "bad MIC"),
            GssErrorKind::BadBindings => write!(f, "channel bindings mismatch"),
            GssErrorKind::Encode(_) => write!(f, "encode error"),
            GssErrorKind::Failure => write!(f, "failure"),
        }
    }
}

impl core::error::Error for GssErrorKind {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            GssErrorKind::Encode(e) => Some(e),
            GssErrorKind::UnsupportedAlgorithm
            | GssErrorKind::DefectiveToken
            | GssErrorKind::BadMic
            | GssErrorKind::BadBindings
            | GssErrorKind::Failure => None,
        }
    }
}

pub trait GssErrorExt {
    fn unsupported_algorithm(context: &'static str) -> Self;
    fn defective_token(context: &'static str) -> Self;
    fn bad_mic(context: &'static str) -> Self;
    fn bad_bindings(context: &'static str) -> Self;
    fn failure(context: &'static str) -> Self;
    fn encode(error: EncodeError) -> Self;
    /// A token that failed to decode is a defective token, unless it names an unknown algorithm.
    ///
    /// The decode error is kept as source.
    fn decode(error: DecodeError) -> Self;
    fn crypto(context: &'static str, error: CryptoError) -> Self;
    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: core::error::Error + Sync + Send + 'static;
}

impl GssErrorExt for GssError {
    fn unsupported_algorithm(context: &'static str) -> Self {
        Self::new(context, GssErrorKind::UnsupportedAlgorithm)
    }

    fn defective_token(context: &'static str) -> Self {
        Self::new(context, GssErrorKind::DefectiveToken)
    }

    fn bad_mic(context: &'static str) -> Self {
        Self::new(context, GssErrorKind::BadMic)
    }

    fn bad_bindings(context: &'static str) -> Self {
        Self::new(context, GssErrorKind::BadBindings)
    }

    fn failure(context: &'static str) -> Self {
        Self::new(context, GssErrorKind::Failure)
    }

    fn encode(error: EncodeError) -> Self {
        Self::new("encode error", GssErrorKind::Encode(error))
    }

    fn decode(error: DecodeError) -> Self {
        let kind = match error.kind() {
            CodecErrorKind::UnsupportedValue { .. } => GssErrorKind::UnsupportedAlgorithm,
            _ => GssErrorKind::DefectiveToken,
        };

        Self::new("decode error", kind).with_source(error)
    }

    fn crypto(context: &'static str, error: CryptoError) -> Self {
        let kind = match error {
            CryptoError::UnsupportedEncType(_) => GssErrorKind::UnsupportedAlgorithm,
            CryptoError::IntegrityCheck => return Self::new(context, GssErrorKind::BadMic),
            CryptoError::CipherLength { .. } | CryptoError::BlockAlignment(_) => GssErrorKind::DefectiveToken,
            CryptoError::KeyLength { .. } | CryptoError::HmacKey | CryptoError::Kerberos(_) => GssErrorKind::Failure,
        };

        Self::new(context, kind).with_source(error)
    }

    fn custom<E>(context: &'static str, e: E) -> Self
    where
        E: core::error::Error + Sync + Send + 'static,
    {
        Self::new(context, GssErrorKind::Failure).with_source(e)
    }
}
