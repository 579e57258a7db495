use core::mem;

use krb5_gss_core::{decode_exact, encode_vec};

use super::{AcceptSecContextToken, ApRequestor, ChannelBindings, InitSecContextToken, OverloadedChecksum};
use crate::{
    ContextFlags, ContextParams, GssConfig, GssError, GssErrorExt as _, GssResult, KeySource, Role, SecurityContext,
    SessionKey,
};

/// Outcome of [`Initiator::step`].
#[derive(Debug)]
pub enum InitiatorStep {
    /// Send `token` and call `step` again with the acceptor's reply.
    Continue { token: Vec<u8> },
    /// The context is established; `token`, if any, still has to reach the acceptor.
    Complete {
        token: Option<Vec<u8>>,
        context: SecurityContext,
    },
}

#[derive(Default, Debug)]
enum InitiatorState {
    #[default]
    Consumed,

    SendApReq,
    WaitApRep {
        key: SessionKey,
        key_source: KeySource,
        flags: ContextFlags,
        local_sequence: u32,
    },
    Established,
}

/// Drives the initiator side of context establishment.
#[derive(Debug)]
pub struct Initiator<R> {
    requestor: R,
    config: GssConfig,
    flags: ContextFlags,
    bindings: Option<ChannelBindings>,
    state: InitiatorState,
}

impl<R: ApRequestor> Initiator<R> {
    pub fn new(requestor: R, config: GssConfig, flags: ContextFlags, bindings: Option<ChannelBindings>) -> Self {
        Self {
            requestor,
            config,
            flags,
            bindings,
            state: InitiatorState::SendApReq,
        }
    }

    pub fn requestor(&self) -> &R {
        &self.requestor
    }

    pub fn is_established(&self) -> bool {
        matches!(self.state, InitiatorState::Established)
    }

    /// Advances the exchange. `input` is `None` for the first call and the acceptor's token afterwards.
    pub fn step(&mut self, input: Option<&[u8]>) -> GssResult<InitiatorStep> {
        match (mem::take(&mut self.state), input) {
            (InitiatorState::SendApReq, None) => self.send_ap_req(),
            (
                InitiatorState::WaitApRep {
                    key,
                    key_source,
                    flags,
                    local_sequence,
                },
                Some(input),
            ) => self.read_ap_rep(input, key, key_source, flags, local_sequence),
            (InitiatorState::SendApReq, Some(_)) => Err(GssError::failure("unexpected input before the AP-REQ")),
            (InitiatorState::WaitApRep { .. }, None) => Err(defective_token_err!("AP-REP token expected")),
            (InitiatorState::Established, _) => Err(GssError::failure("context is already established")),
            (InitiatorState::Consumed, _) => Err(GssError::failure("initiator state is consumed (this is a bug)")),
        }
    }

    fn send_ap_req(&mut self) -> GssResult<InitiatorStep> {
        let mut flags = self.flags;

        let delegation = if flags.contains(ContextFlags::DELEGATE) && self.config.allow_delegation {
            let session_key = self.requestor.session_key().clone();
            Some(self.requestor.seal_credentials(&session_key)?)
        } else {
            if flags.contains(ContextFlags::DELEGATE) {
                debug!("Delegation requested but not allowed; credentials are not forwarded");
            }
            flags.remove(ContextFlags::DELEGATE);
            None
        };

        let checksum = OverloadedChecksum::new(self.bindings.as_ref(), flags.to_gss_flags(), delegation);
        let checksum = encode_vec(&checksum).map_err(GssError::encode)?;

        let mutual = flags.contains(ContextFlags::MUTUAL);
        let output = self.requestor.build_ap_req(&checksum, mutual)?;

        let token = encode_vec(&InitSecContextToken { ap_req: output.ap_req }).map_err(GssError::encode)?;

        let (key, key_source) = match output.subkey {
            Some(subkey) => (subkey, KeySource::InitiatorSubkey),
            None => (self.requestor.session_key().clone(), KeySource::SessionKey),
        };

        debug!(?flags, mutual, ?key_source, sequence_number = output.sequence_number, "Send AP-REQ");

        if mutual {
            self.state = InitiatorState::WaitApRep {
                key,
                key_source,
                flags,
                local_sequence: output.sequence_number,
            };

            return Ok(InitiatorStep::Continue { token });
        }

        let context = self.establish(key, key_source, flags, output.sequence_number, output.sequence_number)?;

        Ok(InitiatorStep::Complete {
            token: Some(token),
            context,
        })
    }

    fn read_ap_rep(
        &mut self,
        input: &[u8],
        key: SessionKey,
        key_source: KeySource,
        flags: ContextFlags,
        local_sequence: u32,
    ) -> GssResult<InitiatorStep> {
        let reply = decode_exact::<AcceptSecContextToken>(input).map_err(GssError::decode)?;

        let ap_rep = match reply {
            AcceptSecContextToken::ApRep(ap_rep) => ap_rep,
            AcceptSecContextToken::KrbError(_) => {
                warn!("Acceptor replied with KRB-ERROR");
                return Err(GssError::failure("acceptor replied with KRB-ERROR"));
            }
        };

        let info = self.requestor.read_ap_rep(&ap_rep)?;

        let (key, key_source) = match info.subkey {
            Some(subkey) => {
                debug!(enc_type = %subkey.enc_type(), "Acceptor subkey received");
                (subkey, KeySource::AcceptorSubkey)
            }
            None => (key, key_source),
        };

        let context = self.establish(key, key_source, flags, local_sequence, info.sequence_number)?;

        Ok(InitiatorStep::Complete { token: None, context })
    }

    fn establish(
        &mut self,
        key: SessionKey,
        key_source: KeySource,
        flags: ContextFlags,
        local_sequence: u32,
        peer_sequence: u32,
    ) -> GssResult<SecurityContext> {
        let context = SecurityContext::new(
            ContextParams {
                role: Role::Initiator,
                key,
                key_source,
                flags,
                local_sequence,
                peer_sequence,
            },
            &self.config,
        )?;

        self.state = InitiatorState::Established;

        Ok(context)
    }
}
