//! Fixtures shared by the integration tests: deterministic keys, ready-made context pairs,
//! and in-memory stand-ins for the Kerberos side of context establishment.

// No need to be as strict as in production libraries
#![allow(clippy::panic)]

use krb5_gss::establishment::{ApAcceptor, ApRepInfo, ApReqInfo, ApReqOutput, ApRequestor, GSS_CHECKSUM_TYPE};
use krb5_gss::{
    ContextFlags, ContextParams, EncType, GssConfig, GssError, GssErrorExt as _, GssResult, KeySource, Role,
    SecurityContext, SessionKey,
};

/// Plaintext sealed by [`MockRequestor::seal_credentials`].
pub const FORWARDED_TGT: &[u8] = b"KRB-CRED forwarded TGT";

pub const INITIATOR_SEQUENCE: u32 = 0x0102_0304;

/// Deterministic key material; `seed` tells keys of the same enc-type apart.
///
/// # Panics
///
/// Never for the enc-types in [`EncType::ALL`].
pub fn test_key(enc_type: EncType, seed: u8) -> SessionKey {
    let bytes = (0..=u8::MAX)
        .take(enc_type.key_length())
        .map(|i| i.wrapping_mul(31).wrapping_add(seed))
        .collect();

    match SessionKey::new(enc_type, bytes) {
        Ok(key) => key,
        Err(e) => panic!("test key for {enc_type}: {}", e.report()),
    }
}

/// Initiator and acceptor contexts sharing the session key of `enc_type`.
///
/// # Panics
///
/// Never for the enc-types in [`EncType::ALL`].
pub fn context_pair(enc_type: EncType, flags: ContextFlags) -> (SecurityContext, SecurityContext) {
    context_pair_with(enc_type, flags, 0, 0)
}

/// Same as [`context_pair`], with explicit sequence baselines.
///
/// # Panics
///
/// Never for the enc-types in [`EncType::ALL`].
pub fn context_pair_with(
    enc_type: EncType,
    flags: ContextFlags,
    initiator_sequence: u32,
    acceptor_sequence: u32,
) -> (SecurityContext, SecurityContext) {
    let key = test_key(enc_type, 1);
    let config = GssConfig::default();

    let build = |role, local_sequence, peer_sequence| {
        let params = ContextParams {
            role,
            key: key.clone(),
            key_source: KeySource::SessionKey,
            flags,
            local_sequence,
            peer_sequence,
        };

        match SecurityContext::new(params, &config) {
            Ok(context) => context,
            Err(e) => panic!("context for {enc_type}: {}", e.report()),
        }
    };

    (
        build(Role::Initiator, initiator_sequence, acceptor_sequence),
        build(Role::Acceptor, acceptor_sequence, initiator_sequence),
    )
}

fn xor_with_key(data: &[u8], key: &SessionKey) -> Vec<u8> {
    data.iter()
        .zip(key.as_bytes().iter().cycle())
        .map(|(byte, key)| byte ^ key)
        .collect()
}

/// Initiator-side Kerberos stand-in.
///
/// The "AP-REQ" it produces is `mutual (1) | sequence (4, BE) | has subkey (1) | [subkey] | checksum`,
/// and the "AP-REP" it reads is `has subkey (1) | [subkey] | sequence (4, BE)`.
#[derive(Debug)]
pub struct MockRequestor {
    pub session_key: SessionKey,
    pub subkey: Option<SessionKey>,
    pub sequence_number: u32,
    /// Seal forwarded credentials with the subkey instead of the key passed in.
    pub seal_with_subkey: bool,
    pub sealed_credentials: usize,
}

impl MockRequestor {
    pub fn new(session_key: SessionKey) -> Self {
        Self {
            session_key,
            subkey: None,
            sequence_number: INITIATOR_SEQUENCE,
            seal_with_subkey: false,
            sealed_credentials: 0,
        }
    }
}

impl ApRequestor for MockRequestor {
    fn session_key(&self) -> &SessionKey {
        &self.session_key
    }

    fn build_ap_req(&mut self, checksum: &[u8], mutual: bool) -> GssResult<ApReqOutput> {
        let mut ap_req = vec![u8::from(mutual)];
        ap_req.extend_from_slice(&self.sequence_number.to_be_bytes());

        match &self.subkey {
            Some(subkey) => {
                ap_req.push(1);
                ap_req.extend_from_slice(subkey.as_bytes());
            }
            None => ap_req.push(0),
        }

        ap_req.extend_from_slice(checksum);

        Ok(ApReqOutput {
            ap_req,
            subkey: self.subkey.clone(),
            sequence_number: self.sequence_number,
        })
    }

    fn read_ap_rep(&mut self, ap_rep: &[u8]) -> GssResult<ApRepInfo> {
        let enc_type = self.session_key.enc_type();

        let (subkey, rest) = match ap_rep.split_first() {
            Some((1, rest)) if rest.len() >= enc_type.key_length() => {
                let (key, rest) = rest.split_at(enc_type.key_length());
                (Some(SessionKey::new(enc_type, key.to_vec())?), rest)
            }
            Some((0, rest)) => (None, rest),
            _ => return Err(GssError::failure("malformed AP-REP")),
        };

        let sequence_number = <[u8; 4]>::try_from(rest)
            .map(u32::from_be_bytes)
            .map_err(|_| GssError::failure("malformed AP-REP"))?;

        Ok(ApRepInfo {
            subkey,
            sequence_number,
        })
    }

    fn seal_credentials(&mut self, key: &SessionKey) -> GssResult<Vec<u8>> {
        self.sealed_credentials += 1;

        let key = match (&self.subkey, self.seal_with_subkey) {
            (Some(subkey), true) => subkey,
            _ => key,
        };

        Ok(xor_with_key(FORWARDED_TGT, key))
    }
}

/// Acceptor-side counterpart of [`MockRequestor`].
#[derive(Debug)]
pub struct MockAcceptor {
    pub session_key: SessionKey,
    /// Checksum type reported for every authenticator.
    pub checksum_type: i32,
    pub sequence_number_sent: Option<u32>,
    pub subkey_sent: Option<SessionKey>,
    pub credential_attempts: usize,
}

impl MockAcceptor {
    pub fn new(session_key: SessionKey) -> Self {
        Self {
            session_key,
            checksum_type: GSS_CHECKSUM_TYPE,
            sequence_number_sent: None,
            subkey_sent: None,
            credential_attempts: 0,
        }
    }
}

impl ApAcceptor for MockAcceptor {
    fn read_ap_req(&mut self, ap_req: &[u8]) -> GssResult<ApReqInfo> {
        let malformed = || GssError::failure("malformed AP-REQ");
        let enc_type = self.session_key.enc_type();

        if ap_req.len() < 6 {
            return Err(malformed());
        }

        let mutual_required = ap_req[0] == 1;
        let sequence_number = u32::from_be_bytes([ap_req[1], ap_req[2], ap_req[3], ap_req[4]]);

        let (subkey, checksum) = match ap_req[5] {
            1 if ap_req.len() >= 6 + enc_type.key_length() => {
                let (key, checksum) = ap_req[6..].split_at(enc_type.key_length());
                (Some(SessionKey::new(enc_type, key.to_vec())?), checksum)
            }
            0 => (None, &ap_req[6..]),
            _ => return Err(malformed()),
        };

        Ok(ApReqInfo {
            checksum_type: self.checksum_type,
            checksum: checksum.to_vec(),
            session_key: self.session_key.clone(),
            subkey,
            sequence_number,
            mutual_required,
        })
    }

    fn build_ap_rep(&mut self, subkey: Option<&SessionKey>, sequence_number: u32) -> GssResult<Vec<u8>> {
        self.sequence_number_sent = Some(sequence_number);
        self.subkey_sent = subkey.cloned();

        let mut ap_rep = Vec::new();
        match subkey {
            Some(subkey) => {
                ap_rep.push(1);
                ap_rep.extend_from_slice(subkey.as_bytes());
            }
            None => ap_rep.push(0),
        }
        ap_rep.extend_from_slice(&sequence_number.to_be_bytes());

        Ok(ap_rep)
    }

    fn open_credentials(&mut self, blob: &[u8], key: &SessionKey) -> GssResult<Vec<u8>> {
        self.credential_attempts += 1;

        let credentials = xor_with_key(blob, key);
        if credentials != FORWARDED_TGT {
            return Err(GssError::failure("KRB-CRED decryption"));
        }

        Ok(credentials)
    }
}
