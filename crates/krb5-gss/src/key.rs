use core::fmt;

use krb5_gss_crypto::{CipherSuite, CryptoError, EncType};
use rand::RngCore as _;

use crate::{GssError, GssErrorExt as _, GssResult};

/// Key material of a context, tagged with its enc-type.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKey {
    enc_type: EncType,
    bytes: Vec<u8>,
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey")
            .field("enc_type", &self.enc_type)
            .finish_non_exhaustive()
    }
}

impl SessionKey {
    pub fn new(enc_type: EncType, bytes: Vec<u8>) -> GssResult<Self> {
        if bytes.len() != enc_type.key_length() {
            return Err(GssError::crypto(
                "SessionKey::new",
                CryptoError::KeyLength {
                    got: bytes.len(),
                    expected: enc_type.key_length(),
                },
            ));
        }

        Ok(Self { enc_type, bytes })
    }

    /// Builds a key from an on-the-wire enc-type number.
    pub fn from_raw(enc_type: i32, bytes: Vec<u8>) -> GssResult<Self> {
        let enc_type = EncType::from_raw(enc_type).map_err(|e| GssError::crypto("SessionKey::from_raw", e))?;
        Self::new(enc_type, bytes)
    }

    /// Fresh random key of the given enc-type.
    ///
    /// DES parity and weak keys are not corrected; only RFC 4121 enc-types generate subkeys.
    pub fn generate(enc_type: EncType) -> Self {
        let mut bytes = vec![0; enc_type.key_length()];
        rand::rng().fill_bytes(&mut bytes);

        Self { enc_type, bytes }
    }

    pub fn enc_type(&self) -> EncType {
        self.enc_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn cipher_suite(&self) -> GssResult<CipherSuite> {
        CipherSuite::new(self.enc_type, &self.bytes).map_err(|e| GssError::crypto("cipher suite", e))
    }
}

/// Which of the negotiated keys protects per-message tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    SessionKey,
    InitiatorSubkey,
    AcceptorSubkey,
}
