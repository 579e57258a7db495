use krb5_gss_core::{decode_exact, encode_vec};
use krb5_gss_crypto::{constant_time_eq, ProtocolGeneration};
use rand::RngCore as _;

use super::{
    AcceptSecContextToken, ApAcceptor, ApReqInfo, ChannelBindings, InitSecContextToken, OverloadedChecksum,
    GSS_CHECKSUM_TYPE,
};
use crate::{
    ContextFlags, ContextParams, GssConfig, GssError, GssErrorExt as _, GssResult, KeySource, Role, SecurityContext,
    SessionKey,
};

/// Initial acceptor sequence numbers stay below 2^30.
const SEQUENCE_NUMBER_MASK: u32 = 0x3FFF_FFFF;

/// Result of [`Acceptor::accept`].
#[derive(Debug)]
pub struct AcceptorOutcome {
    /// AP-REP token to send back, present when mutual authentication was requested.
    pub token: Option<Vec<u8>>,
    pub context: SecurityContext,
    /// Decrypted KRB-CRED forwarded by the initiator.
    pub delegated: Option<Vec<u8>>,
}

/// Drives the acceptor side of context establishment.
#[derive(Debug)]
pub struct Acceptor<A> {
    acceptor: A,
    config: GssConfig,
    bindings: Option<ChannelBindings>,
}

impl<A: ApAcceptor> Acceptor<A> {
    pub fn new(acceptor: A, config: GssConfig, bindings: Option<ChannelBindings>) -> Self {
        Self {
            acceptor,
            config,
            bindings,
        }
    }

    pub fn acceptor(&self) -> &A {
        &self.acceptor
    }

    pub fn accept(&mut self, token: &[u8]) -> GssResult<AcceptorOutcome> {
        let token = decode_exact::<InitSecContextToken>(token).map_err(GssError::decode)?;
        let info = self.acceptor.read_ap_req(&token.ap_req)?;

        if info.checksum_type != GSS_CHECKSUM_TYPE {
            warn!(checksum_type = info.checksum_type, "Authenticator checksum is not a GSS checksum");
            return Err(defective_token_err!("authenticator checksum type"));
        }

        let checksum = decode_exact::<OverloadedChecksum>(&info.checksum).map_err(GssError::decode)?;

        // Bindings sent by the initiator are ignored when none are configured locally.
        if let Some(bindings) = &self.bindings {
            if !constant_time_eq(&bindings.digest(), &checksum.channel_binding_digest) {
                warn!("Channel bindings mismatch");
                return Err(GssError::bad_bindings("channel bindings"));
            }
        }

        let mut flags = ContextFlags::from_gss_flags(checksum.flags);
        let delegated = self.open_delegation(checksum.delegation.as_deref(), &info)?;
        if delegated.is_none() {
            flags.remove(ContextFlags::DELEGATE);
        }

        let ApReqInfo {
            session_key,
            subkey,
            sequence_number: peer_sequence,
            mutual_required,
            ..
        } = info;

        let (key, key_source) = match subkey {
            Some(subkey) => (subkey, KeySource::InitiatorSubkey),
            None => (session_key, KeySource::SessionKey),
        };

        let (token, key, key_source, local_sequence) = if mutual_required {
            let local_sequence = rand::rng().next_u32() & SEQUENCE_NUMBER_MASK;
            let acceptor_subkey = self.acceptor_subkey(&key);

            let ap_rep = self.acceptor.build_ap_rep(acceptor_subkey.as_ref(), local_sequence)?;
            let token = encode_vec(&AcceptSecContextToken::ApRep(ap_rep)).map_err(GssError::encode)?;

            match acceptor_subkey {
                Some(subkey) => (Some(token), subkey, KeySource::AcceptorSubkey, local_sequence),
                None => (Some(token), key, key_source, local_sequence),
            }
        } else {
            (None, key, key_source, peer_sequence)
        };

        debug!(?flags, mutual_required, ?key_source, local_sequence, peer_sequence, "Accepted AP-REQ");

        let context = SecurityContext::new(
            ContextParams {
                role: Role::Acceptor,
                key,
                key_source,
                flags,
                local_sequence,
                peer_sequence,
            },
            &self.config,
        )?;

        Ok(AcceptorOutcome {
            token,
            context,
            delegated,
        })
    }

    fn open_delegation(&mut self, blob: Option<&[u8]>, info: &ApReqInfo) -> GssResult<Option<Vec<u8>>> {
        let Some(blob) = blob else {
            return Ok(None);
        };

        if !self.config.allow_delegation {
            debug!("Delegated credentials ignored");
            return Ok(None);
        }

        match (self.acceptor.open_credentials(blob, &info.session_key), &info.subkey) {
            (Ok(credentials), _) => Ok(Some(credentials)),
            (Err(error), Some(subkey)) => {
                debug!(error = %error.report(), "Retrying delegated credentials with the initiator subkey");
                self.acceptor.open_credentials(blob, subkey).map(Some)
            }
            (Err(error), None) => Err(error),
        }
    }

    fn acceptor_subkey(&self, key: &SessionKey) -> Option<SessionKey> {
        if !self.config.acceptor_subkey {
            return None;
        }

        if key.enc_type().generation() != ProtocolGeneration::Rfc4121 {
            debug!(enc_type = %key.enc_type(), "Acceptor subkey ignored for a legacy enc-type");
            return None;
        }

        let subkey = SessionKey::generate(key.enc_type());
        debug!(enc_type = %subkey.enc_type(), "Generated acceptor subkey");

        Some(subkey)
    }
}
