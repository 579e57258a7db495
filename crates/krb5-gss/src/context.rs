use std::sync::{Mutex, MutexGuard};

use krb5_gss_core::{decode_exact, encode_vec, Encode as _};
use krb5_gss_crypto::{CipherSuite, EncType, ProtocolGeneration, SEQUENCE_BLOCK_SIZE};
use rand::RngCore as _;

use crate::framing::MAX_FRAMING_SIZE;
use crate::sequence::{ReplayWindow, SequenceCounter};
use crate::token::legacy::MAX_PADDING;
use crate::token::{
    legacy, rfc4121, Opened, Token, LEGACY_CONFOUNDER_SIZE, LEGACY_HEADER_SIZE, RFC4121_CONFOUNDER_SIZE,
    RFC4121_HEADER_SIZE,
};
use crate::{
    ContextFlags, ContextParams, GssConfig, GssError, GssErrorExt as _, GssResult, KeySource, Role,
    SupplementaryStatus,
};

/// Extra room kept by [`SecurityContext::get_size_limit`] on top of the computed overhead.
const SIZE_LIMIT_MARGIN: usize = 8;

/// Quality of protection requested for an outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageProp {
    /// Only the default QOP, 0, is supported.
    pub qop: u32,
    pub confidential: bool,
}

impl MessageProp {
    pub fn confidential() -> Self {
        Self {
            qop: 0,
            confidential: true,
        }
    }

    pub fn integrity_only() -> Self {
        Self {
            qop: 0,
            confidential: false,
        }
    }
}

impl Default for MessageProp {
    fn default() -> Self {
        Self::confidential()
    }
}

/// Application data recovered from a Wrap token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unwrapped {
    pub data: Vec<u8>,
    pub confidential: bool,
    pub qop: u32,
    pub status: SupplementaryStatus,
}

/// An established Kerberos security context.
///
/// Per-message operations take `&self` and may run concurrently from several threads.
/// Sending and receiving each serialize on their own lock.
pub struct SecurityContext {
    role: Role,
    suite: CipherSuite,
    key_source: KeySource,
    flags: ContextFlags,
    local: Mutex<SequenceCounter>,
    peer: Mutex<ReplayWindow>,
}

impl core::fmt::Debug for SecurityContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SecurityContext")
            .field("role", &self.role)
            .field("enc_type", &self.suite.enc_type())
            .field("key_source", &self.key_source)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

impl SecurityContext {
    pub fn new(params: ContextParams, config: &GssConfig) -> GssResult<Self> {
        let suite = params.key.cipher_suite()?;

        debug!(
            role = ?params.role,
            enc_type = %suite.enc_type(),
            key_source = ?params.key_source,
            flags = ?params.flags,
            local_sequence = params.local_sequence,
            peer_sequence = params.peer_sequence,
            "Security context established"
        );

        Ok(Self {
            role: params.role,
            suite,
            key_source: params.key_source,
            flags: params.flags,
            local: Mutex::new(SequenceCounter::new(params.local_sequence)),
            peer: Mutex::new(ReplayWindow::new(params.peer_sequence, config.replay_window)),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn enc_type(&self) -> EncType {
        self.suite.enc_type()
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    pub fn flags(&self) -> ContextFlags {
        self.flags
    }

    /// Sequence number the next outgoing token will carry.
    pub fn local_sequence(&self) -> u32 {
        self.lock_local().peek()
    }

    /// Next in-order sequence number expected from the peer.
    pub fn expected_peer_sequence(&self) -> u32 {
        self.lock_peer().expected()
    }

    /// Protects `data` into a Wrap token.
    ///
    /// Confidentiality is dropped, not refused, when the context did not negotiate it.
    pub fn wrap(&self, data: &[u8], prop: MessageProp) -> GssResult<Vec<u8>> {
        ensure_default_qop(prop.qop)?;

        let confidential = prop.confidential && self.flags.contains(ContextFlags::CONFIDENTIALITY);
        if prop.confidential && !confidential {
            debug!("Confidentiality was not negotiated; wrapping with integrity only");
        }

        let mut local = self.lock_local();
        let sequence_number = local.peek();

        let token = match self.suite.generation() {
            ProtocolGeneration::Legacy => Token::LegacyWrap(legacy::wrap(
                &self.suite,
                self.role,
                sequence_number,
                data,
                confidential,
                random_bytes(),
            )?),
            ProtocolGeneration::Rfc4121 => Token::Rfc4121Wrap(rfc4121::wrap(
                &self.suite,
                self.role,
                self.uses_acceptor_subkey(),
                sequence_number,
                data,
                confidential,
            )?),
        };

        let bytes = encode_vec(&token).map_err(GssError::encode)?;
        local.commit(sequence_number);

        trace!(token = token.name(), sequence_number, confidential, "Wrapped message");

        Ok(bytes)
    }

    /// Verifies and opens a Wrap token received from the peer.
    pub fn unwrap(&self, token: &[u8]) -> GssResult<Unwrapped> {
        let token = decode_exact::<Token>(token).map_err(|e| reject(GssError::decode(e)))?;

        let opened = match (&token, self.suite.generation()) {
            (Token::LegacyWrap(wrap), ProtocolGeneration::Legacy) => legacy::unwrap(&self.suite, self.role.peer(), wrap),
            (Token::Rfc4121Wrap(wrap), ProtocolGeneration::Rfc4121) => {
                rfc4121::unwrap(&self.suite, self.role.peer(), self.uses_acceptor_subkey(), wrap)
            }
            _ => Err(defective_token_err!("not a Wrap token for this context")),
        }
        .map_err(reject)?;

        let Opened {
            data,
            confidential,
            sequence_number,
        } = opened;

        let status = self.observe_peer_sequence(sequence_number)?;

        trace!(token = token.name(), sequence_number, confidential, ?status, "Unwrapped message");

        Ok(Unwrapped {
            data,
            confidential,
            qop: 0,
            status,
        })
    }

    /// Computes a MIC token over `data`.
    pub fn get_mic(&self, data: &[u8], qop: u32) -> GssResult<Vec<u8>> {
        ensure_default_qop(qop)?;

        let mut local = self.lock_local();
        let sequence_number = local.peek();

        let token = match self.suite.generation() {
            ProtocolGeneration::Legacy => {
                Token::LegacyMic(legacy::get_mic(&self.suite, self.role, sequence_number, data)?)
            }
            ProtocolGeneration::Rfc4121 => Token::Rfc4121Mic(rfc4121::get_mic(
                &self.suite,
                self.role,
                self.uses_acceptor_subkey(),
                sequence_number,
                data,
            )?),
        };

        let bytes = encode_vec(&token).map_err(GssError::encode)?;
        local.commit(sequence_number);

        trace!(token = token.name(), sequence_number, "Computed MIC");

        Ok(bytes)
    }

    /// Checks a MIC token received from the peer against `data`.
    pub fn verify_mic(&self, token: &[u8], data: &[u8]) -> GssResult<SupplementaryStatus> {
        let token = decode_exact::<Token>(token).map_err(|e| reject(GssError::decode(e)))?;

        let sequence_number = match (&token, self.suite.generation()) {
            (Token::LegacyMic(mic), ProtocolGeneration::Legacy) => {
                legacy::verify_mic(&self.suite, self.role.peer(), mic, data)
            }
            (Token::Rfc4121Mic(mic), ProtocolGeneration::Rfc4121) => rfc4121::verify_mic(
                &self.suite,
                self.role.peer(),
                self.uses_acceptor_subkey(),
                mic,
                data,
            ),
            _ => Err(defective_token_err!("not a MIC token for this context")),
        }
        .map_err(reject)?;

        let status = self.observe_peer_sequence(sequence_number)?;

        trace!(token = token.name(), sequence_number, ?status, "Verified MIC");

        Ok(status)
    }

    /// Largest message that [`SecurityContext::wrap`] turns into a token of at most `max_token_size` bytes.
    ///
    /// The bound is conservative: framing is counted at its largest and a few spare bytes are kept.
    pub fn get_size_limit(&self, qop: u32, conf_req: bool, max_token_size: usize) -> GssResult<usize> {
        ensure_default_qop(qop)?;

        let confidential = conf_req && self.flags.contains(ContextFlags::CONFIDENTIALITY);
        let checksum = self.suite.checksum_length();

        let overhead = match self.suite.generation() {
            ProtocolGeneration::Legacy => {
                MAX_FRAMING_SIZE
                    + LEGACY_HEADER_SIZE
                    + SEQUENCE_BLOCK_SIZE
                    + checksum
                    + LEGACY_CONFOUNDER_SIZE
                    + MAX_PADDING
            }
            ProtocolGeneration::Rfc4121 if confidential => {
                RFC4121_HEADER_SIZE + RFC4121_CONFOUNDER_SIZE + RFC4121_HEADER_SIZE + checksum
            }
            ProtocolGeneration::Rfc4121 => RFC4121_HEADER_SIZE + checksum,
        };

        Ok(max_token_size.saturating_sub(overhead + SIZE_LIMIT_MARGIN))
    }

    fn uses_acceptor_subkey(&self) -> bool {
        self.key_source == KeySource::AcceptorSubkey
    }

    /// Records a verified peer sequence number and turns the outcome into supplementary status.
    fn observe_peer_sequence(&self, sequence_number: u32) -> GssResult<SupplementaryStatus> {
        let check = self.lock_peer().observe(sequence_number);

        if check.is_replay() {
            if self.flags.contains(ContextFlags::REPLAY_DETECT) {
                warn!(sequence_number, ?check, "Rejected replayed token");
                return Err(bad_mic_err!("replay detection"));
            }

            if self.flags.contains(ContextFlags::SEQUENCE_DETECT) {
                return Ok(check.status());
            }

            return Ok(SupplementaryStatus::empty());
        }

        if self.flags.contains(ContextFlags::SEQUENCE_DETECT) {
            Ok(check.status())
        } else {
            Ok(SupplementaryStatus::empty())
        }
    }

    fn lock_local(&self) -> MutexGuard<'_, SequenceCounter> {
        match self.local.lock() {
            Ok(local) => local,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_peer(&self) -> MutexGuard<'_, ReplayWindow> {
        match self.peer.lock() {
            Ok(peer) => peer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn ensure_default_qop(qop: u32) -> GssResult<()> {
    if qop != 0 {
        return Err(unsupported_err!("only the default QOP is supported"));
    }

    Ok(())
}

fn reject(error: GssError) -> GssError {
    warn!(error = %error.report(), "Rejected incoming token");
    error
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
