use bitflags::bitflags;

use crate::flags::GssFlags;
use crate::key::{KeySource, SessionKey};

bitflags! {
    /// Context options negotiated through the authenticator checksum.
    ///
    /// Bits share the values of the matching [`GssFlags`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextFlags: u32 {
        const DELEGATE = 0x0001;
        const MUTUAL = 0x0002;
        const REPLAY_DETECT = 0x0004;
        const SEQUENCE_DETECT = 0x0008;
        const CONFIDENTIALITY = 0x0010;
        const INTEGRITY = 0x0020;
    }
}

impl ContextFlags {
    pub fn from_gss_flags(flags: GssFlags) -> Self {
        Self::from_bits_truncate(flags.bits())
    }

    pub fn to_gss_flags(self) -> GssFlags {
        GssFlags::from_bits_truncate(self.bits())
    }
}

impl Default for ContextFlags {
    fn default() -> Self {
        Self::MUTUAL | Self::REPLAY_DETECT | Self::SEQUENCE_DETECT | Self::CONFIDENTIALITY | Self::INTEGRITY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Acceptor,
}

impl Role {
    pub fn is_initiator(self) -> bool {
        matches!(self, Role::Initiator)
    }

    #[must_use]
    pub fn peer(self) -> Self {
        match self {
            Role::Initiator => Role::Acceptor,
            Role::Acceptor => Role::Initiator,
        }
    }
}

/// Process-independent settings, handed to every context at construction.
#[derive(Debug, Clone)]
pub struct GssConfig {
    /// Acceptor generates its own subkey for RFC 4121 enc-types.
    pub acceptor_subkey: bool,
    /// Number of peer sequence numbers remembered below the highest one seen.
    pub replay_window: usize,
    /// Credentials are forwarded (initiator) or accepted (acceptor) when DELEGATE is requested.
    pub allow_delegation: bool,
}

impl Default for GssConfig {
    fn default() -> Self {
        Self {
            acceptor_subkey: false,
            replay_window: 64,
            allow_delegation: true,
        }
    }
}

/// Everything needed to build a [`SecurityContext`](crate::SecurityContext).
#[derive(Debug, Clone)]
pub struct ContextParams {
    pub role: Role,
    pub key: SessionKey,
    pub key_source: KeySource,
    pub flags: ContextFlags,
    /// First sequence number this side sends.
    pub local_sequence: u32,
    /// First sequence number expected from the peer.
    pub peer_sequence: u32,
}
