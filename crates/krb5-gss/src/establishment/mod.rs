//! Security context establishment over a single AP-REQ / AP-REP exchange.
//!
//! Ticket handling and the DER encoding of Kerberos messages are left to the caller,
//! through [`ApRequestor`] on the initiator side and [`ApAcceptor`] on the acceptor side.

mod acceptor;
mod checksum;
mod initiator;
mod token;

pub use self::acceptor::{Acceptor, AcceptorOutcome};
pub use self::checksum::{ChannelBindings, OverloadedChecksum, GSS_CHECKSUM_TYPE};
pub use self::initiator::{Initiator, InitiatorStep};
pub use self::token::{AcceptSecContextToken, InitSecContextToken};

use crate::{GssResult, SessionKey};

/// AP-REQ built by an [`ApRequestor`].
#[derive(Debug, Clone)]
pub struct ApReqOutput {
    /// DER-encoded AP-REQ.
    pub ap_req: Vec<u8>,
    /// Subkey placed in the authenticator, if any.
    pub subkey: Option<SessionKey>,
    /// Sequence number placed in the authenticator.
    pub sequence_number: u32,
}

/// Fields of a verified AP-REP.
#[derive(Debug, Clone)]
pub struct ApRepInfo {
    pub subkey: Option<SessionKey>,
    pub sequence_number: u32,
}

/// Fields of a verified AP-REQ and its authenticator.
#[derive(Debug, Clone)]
pub struct ApReqInfo {
    pub checksum_type: i32,
    pub checksum: Vec<u8>,
    pub session_key: SessionKey,
    pub subkey: Option<SessionKey>,
    pub sequence_number: u32,
    /// The AP-REQ carries the `mutual-required` option.
    pub mutual_required: bool,
}

/// Kerberos services needed by the initiator.
pub trait ApRequestor {
    /// Session key of the service ticket.
    fn session_key(&self) -> &SessionKey;

    /// Builds an AP-REQ whose authenticator carries `checksum` as a 0x8003 checksum.
    fn build_ap_req(&mut self, checksum: &[u8], mutual: bool) -> GssResult<ApReqOutput>;

    /// Decrypts and verifies the AP-REP.
    fn read_ap_rep(&mut self, ap_rep: &[u8]) -> GssResult<ApRepInfo>;

    /// Produces a KRB-CRED for the forwarded ticket, encrypted with `key`.
    fn seal_credentials(&mut self, key: &SessionKey) -> GssResult<Vec<u8>>;
}

/// Kerberos services needed by the acceptor.
pub trait ApAcceptor {
    /// Decrypts and verifies the AP-REQ against the service keys.
    fn read_ap_req(&mut self, ap_req: &[u8]) -> GssResult<ApReqInfo>;

    fn build_ap_rep(&mut self, subkey: Option<&SessionKey>, sequence_number: u32) -> GssResult<Vec<u8>>;

    /// Decrypts a KRB-CRED received in the authenticator checksum.
    fn open_credentials(&mut self, blob: &[u8], key: &SessionKey) -> GssResult<Vec<u8>>;
}
