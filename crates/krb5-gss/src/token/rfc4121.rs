//! RFC 4121 section 4.2 per-message tokens.
//!
//! ```text
//! MIC:  04 04 | flags | FF FF FF FF FF | SND_SEQ (8) | checksum
//! Wrap: 05 04 | flags | FF | EC (2) | RRC (2) | SND_SEQ (8) | data
//! ```

use krb5_gss_core::{
    ensure_fixed_part_size, ensure_size, invalid_field_err, unexpected_message_type_err, Decode, DecodeResult,
    Encode, EncodeResult, ReadCursor, WriteCursor,
};
use krb5_gss_crypto::key_usage::rfc4121_usage;
use krb5_gss_crypto::{constant_time_eq, CipherSuite, CryptoError};

use super::Opened;
use crate::{GssError, GssErrorExt as _, GssResult, Role, TokenFlags};

pub const RFC4121_HEADER_SIZE: usize = 16;

pub const RFC4121_CONFOUNDER_SIZE: usize = 16;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rfc4121TokenId {
    Mic = 0x0404,
    Wrap = 0x0504,
}

impl Rfc4121TokenId {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0404 => Some(Self::Mic),
            0x0504 => Some(Self::Wrap),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rfc4121Header {
    pub token_id: Rfc4121TokenId,
    pub flags: TokenFlags,
    /// Extra count. Always zero in MIC tokens.
    pub ec: u16,
    /// Right rotation count. Always zero in MIC tokens.
    pub rrc: u16,
    pub sequence_number: u64,
}

impl Rfc4121Header {
    const NAME: &'static str = "Rfc4121Header";

    const FIXED_PART_SIZE: usize = RFC4121_HEADER_SIZE;

    const FILLER: u8 = 0xFF;

    pub fn mic(flags: TokenFlags, sequence_number: u64) -> Self {
        Self {
            token_id: Rfc4121TokenId::Mic,
            flags,
            ec: 0,
            rrc: 0,
            sequence_number,
        }
    }

    pub fn wrap(flags: TokenFlags, ec: u16, sequence_number: u64) -> Self {
        Self {
            token_id: Rfc4121TokenId::Wrap,
            flags,
            ec,
            rrc: 0,
            sequence_number,
        }
    }

    pub fn to_bytes(&self) -> [u8; RFC4121_HEADER_SIZE] {
        let mut out = [Self::FILLER; RFC4121_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.token_id.as_u16().to_be_bytes());
        out[2] = self.flags.bits();

        if self.token_id == Rfc4121TokenId::Wrap {
            out[4..6].copy_from_slice(&self.ec.to_be_bytes());
            out[6..8].copy_from_slice(&self.rrc.to_be_bytes());
        }

        out[8..16].copy_from_slice(&self.sequence_number.to_be_bytes());
        out
    }

    /// Header bytes as covered by checksums: EC and RRC are zeroed in Wrap tokens.
    fn protected_bytes(&self) -> [u8; RFC4121_HEADER_SIZE] {
        Self {
            ec: 0,
            rrc: 0,
            ..*self
        }
        .to_bytes()
    }

    /// Header bytes as encrypted inside a sealed Wrap token: RRC is zeroed.
    fn sealed_copy_bytes(&self) -> [u8; RFC4121_HEADER_SIZE] {
        Self { rrc: 0, ..*self }.to_bytes()
    }
}

impl Encode for Rfc4121Header {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_fixed_part_size!(in: dst);
        dst.write_array(self.to_bytes());
        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl<'de> Decode<'de> for Rfc4121Header {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let raw_id = src.read_u16_be();
        let token_id =
            Rfc4121TokenId::from_u16(raw_id).ok_or_else(|| unexpected_message_type_err!(Self::NAME, raw_id))?;

        let flags = TokenFlags::from_bits_retain(src.read_u8());

        if src.read_u8() != Self::FILLER {
            return Err(invalid_field_err!(Self::NAME, "filler", "must be 0xFF"));
        }

        let (ec, rrc) = match token_id {
            Rfc4121TokenId::Mic => {
                if src.read_array::<4>() != [Self::FILLER; 4] {
                    return Err(invalid_field_err!(Self::NAME, "filler", "must be 0xFF"));
                }
                (0, 0)
            }
            Rfc4121TokenId::Wrap => (src.read_u16_be(), src.read_u16_be()),
        };

        let sequence_number = src.read_u64_be();

        Ok(Self {
            token_id,
            flags,
            ec,
            rrc,
            sequence_number,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc4121MicToken {
    pub header: Rfc4121Header,
    pub checksum: Vec<u8>,
}

impl Rfc4121MicToken {
    const NAME: &'static str = "Rfc4121MicToken";
}

impl Encode for Rfc4121MicToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        self.header.encode(dst)?;
        dst.write_slice(&self.checksum);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        RFC4121_HEADER_SIZE + self.checksum.len()
    }
}

impl<'de> Decode<'de> for Rfc4121MicToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let header = Rfc4121Header::decode(src)?;
        if header.token_id != Rfc4121TokenId::Mic {
            return Err(unexpected_message_type_err!(Self::NAME, header.token_id.as_u16()));
        }

        let checksum = src.read_remaining().to_vec();

        Ok(Self { header, checksum })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rfc4121WrapToken {
    pub header: Rfc4121Header,
    /// Everything after the header, still rotated by `header.rrc`.
    pub data: Vec<u8>,
}

impl Rfc4121WrapToken {
    const NAME: &'static str = "Rfc4121WrapToken";

    pub fn is_sealed(&self) -> bool {
        self.header.flags.contains(TokenFlags::SEALED)
    }

    /// Token data with the sender's right rotation undone.
    pub fn unrotated_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();

        if !data.is_empty() {
            let rotation = usize::from(self.header.rrc) % data.len();
            data.rotate_left(rotation);
        }

        data
    }
}

impl Encode for Rfc4121WrapToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        self.header.encode(dst)?;
        dst.write_slice(&self.data);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        RFC4121_HEADER_SIZE + self.data.len()
    }
}

impl<'de> Decode<'de> for Rfc4121WrapToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let header = Rfc4121Header::decode(src)?;
        if header.token_id != Rfc4121TokenId::Wrap {
            return Err(unexpected_message_type_err!(Self::NAME, header.token_id.as_u16()));
        }

        let data = src.read_remaining().to_vec();

        Ok(Self { header, data })
    }
}

fn token_flags(sender: Role, acceptor_subkey: bool) -> TokenFlags {
    let mut flags = TokenFlags::empty();
    flags.set(TokenFlags::SENT_BY_ACCEPTOR, sender == Role::Acceptor);
    flags.set(TokenFlags::ACCEPTOR_SUBKEY, acceptor_subkey);
    flags
}

/// Rejects tokens whose direction or key flags disagree with the context.
fn ensure_flags(flags: TokenFlags, sender: Role, acceptor_subkey: bool) -> GssResult<()> {
    if flags.contains(TokenFlags::SENT_BY_ACCEPTOR) != (sender == Role::Acceptor) {
        return Err(defective_token_err!("SentByAcceptor flag does not match the peer"));
    }

    if flags.contains(TokenFlags::ACCEPTOR_SUBKEY) != acceptor_subkey {
        return Err(defective_token_err!("AcceptorSubkey flag does not match the context key"));
    }

    Ok(())
}

fn sequence_number(header: &Rfc4121Header) -> GssResult<u32> {
    u32::try_from(header.sequence_number).map_err(|_| defective_token_err!("sequence number above 32 bits"))
}

pub(crate) fn wrap(
    suite: &CipherSuite,
    sender: Role,
    acceptor_subkey: bool,
    sequence_number: u32,
    data: &[u8],
    confidential: bool,
) -> GssResult<Rfc4121WrapToken> {
    let to_gss = |e| GssError::crypto("RFC 4121 wrap", e);
    let key_usage = rfc4121_usage(sender == Role::Acceptor, true);
    let flags = token_flags(sender, acceptor_subkey);

    if confidential {
        let header = Rfc4121Header::wrap(flags | TokenFlags::SEALED, 0, u64::from(sequence_number));

        let mut plaintext = Vec::with_capacity(data.len() + RFC4121_HEADER_SIZE);
        plaintext.extend_from_slice(data);
        plaintext.extend_from_slice(&header.to_bytes());

        let data = suite.encrypt(key_usage, &plaintext).map_err(to_gss)?;

        Ok(Rfc4121WrapToken { header, data })
    } else {
        let ec = u16::try_from(suite.checksum_length()).map_err(|e| custom_err!("RFC 4121 wrap", e))?;
        let header = Rfc4121Header::wrap(flags, ec, u64::from(sequence_number));

        let checksum = suite
            .checksum(key_usage, &[data, header.protected_bytes().as_slice()])
            .map_err(to_gss)?;

        let mut token_data = Vec::with_capacity(data.len() + checksum.len());
        token_data.extend_from_slice(data);
        token_data.extend_from_slice(&checksum);

        Ok(Rfc4121WrapToken {
            header,
            data: token_data,
        })
    }
}

/// Opens a Wrap token sent by `sender`.
pub(crate) fn unwrap(
    suite: &CipherSuite,
    sender: Role,
    acceptor_subkey: bool,
    token: &Rfc4121WrapToken,
) -> GssResult<Opened> {
    let header = &token.header;
    ensure_flags(header.flags, sender, acceptor_subkey)?;

    let key_usage = rfc4121_usage(sender == Role::Acceptor, true);
    let data = token.unrotated_data();
    let ec = usize::from(header.ec);

    let payload = if token.is_sealed() {
        let plaintext = suite.decrypt(key_usage, &data).map_err(|e| match e {
            CryptoError::IntegrityCheck => bad_mic_err!("RFC 4121 unwrap"),
            other => GssError::crypto("RFC 4121 unwrap", other),
        })?;

        let Some(payload_len) = plaintext.len().checked_sub(ec + RFC4121_HEADER_SIZE) else {
            return Err(defective_token_err!("sealed wrap shorter than EC and header copy"));
        };

        let header_copy = &plaintext[plaintext.len() - RFC4121_HEADER_SIZE..];
        if !constant_time_eq(header_copy, &header.sealed_copy_bytes()) {
            return Err(bad_mic_err!("RFC 4121 unwrap"));
        }

        plaintext[..payload_len].to_vec()
    } else {
        if ec != suite.checksum_length() {
            return Err(defective_token_err!("EC does not match the checksum length"));
        }

        let Some(payload_len) = data.len().checked_sub(ec) else {
            return Err(defective_token_err!("wrap shorter than its checksum"));
        };

        let (payload, checksum) = data.split_at(payload_len);
        let expected = suite
            .checksum(key_usage, &[payload, header.protected_bytes().as_slice()])
            .map_err(|e| GssError::crypto("RFC 4121 unwrap", e))?;

        if !constant_time_eq(&expected, checksum) {
            return Err(bad_mic_err!("RFC 4121 unwrap"));
        }

        payload.to_vec()
    };

    Ok(Opened {
        data: payload,
        confidential: token.is_sealed(),
        sequence_number: sequence_number(header)?,
    })
}

pub(crate) fn get_mic(
    suite: &CipherSuite,
    sender: Role,
    acceptor_subkey: bool,
    sequence_number: u32,
    data: &[u8],
) -> GssResult<Rfc4121MicToken> {
    let header = Rfc4121Header::mic(token_flags(sender, acceptor_subkey), u64::from(sequence_number));

    let checksum = suite
        .checksum(
            rfc4121_usage(sender == Role::Acceptor, false),
            &[data, header.to_bytes().as_slice()],
        )
        .map_err(|e| GssError::crypto("RFC 4121 get_mic", e))?;

    Ok(Rfc4121MicToken { header, checksum })
}

/// Verifies a MIC token sent by `sender` and returns its sequence number.
pub(crate) fn verify_mic(
    suite: &CipherSuite,
    sender: Role,
    acceptor_subkey: bool,
    token: &Rfc4121MicToken,
    data: &[u8],
) -> GssResult<u32> {
    ensure_flags(token.header.flags, sender, acceptor_subkey)?;

    let expected = suite
        .checksum(
            rfc4121_usage(sender == Role::Acceptor, false),
            &[data, token.header.to_bytes().as_slice()],
        )
        .map_err(|e| GssError::crypto("RFC 4121 verify_mic", e))?;

    if !constant_time_eq(&expected, &token.checksum) {
        return Err(bad_mic_err!("RFC 4121 verify_mic"));
    }

    sequence_number(&token.header)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use krb5_gss_core::{decode, encode_vec};
    use krb5_gss_crypto::EncType;
    use rstest::rstest;

    use super::*;
    use crate::GssErrorKind;

    fn suite(enc_type: EncType) -> CipherSuite {
        CipherSuite::new(enc_type, &vec![0x3C; enc_type.key_length()]).unwrap()
    }

    #[test]
    fn mic_header_layout() {
        let header = Rfc4121Header::mic(TokenFlags::SENT_BY_ACCEPTOR | TokenFlags::ACCEPTOR_SUBKEY, 1_448_744_421);

        assert_eq!(header.to_bytes(), hex!("0404 05 ff ffffffff 00000000565a15e5"));
        assert_eq!(decode::<Rfc4121Header>(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn wrap_header_layout() {
        let header = Rfc4121Header {
            rrc: 28,
            ..Rfc4121Header::wrap(TokenFlags::SEALED, 0, 2)
        };

        assert_eq!(header.to_bytes(), hex!("0504 02 ff 0000 001c 0000000000000002"));
        assert_eq!(header.sealed_copy_bytes(), hex!("0504 02 ff 0000 0000 0000000000000002"));
    }

    #[test]
    fn mic_filler_is_checked() {
        let error = decode::<Rfc4121Header>(&hex!("0404 00 ff ffff00ff 0000000000000000")).unwrap_err();
        assert_eq!(
            error.kind,
            krb5_gss_core::CodecErrorKind::InvalidField {
                field: "filler",
                reason: "must be 0xFF",
            }
        );
    }

    #[test]
    fn sealed_wrap_size() {
        let suite = suite(EncType::Aes128CtsHmacSha196);
        let token = wrap(&suite, Role::Initiator, false, 0, b"hello", true).unwrap();

        assert_eq!(token.data.len(), 16 + 5 + 16 + 12);
        assert_eq!(encode_vec(&token).unwrap().len(), 16 + 16 + 5 + 16 + 12);
    }

    #[rstest]
    #[case(EncType::Aes128CtsHmacSha196, true)]
    #[case(EncType::Aes256CtsHmacSha196, false)]
    #[case(EncType::Aes128CtsHmacSha256128, true)]
    #[case(EncType::Aes256CtsHmacSha384192, false)]
    fn wrap_unwrap(#[case] enc_type: EncType, #[case] confidential: bool) {
        let suite = suite(enc_type);
        let token = wrap(&suite, Role::Acceptor, true, 41, b"payload", confidential).unwrap();

        let decoded = decode::<Rfc4121WrapToken>(&encode_vec(&token).unwrap()).unwrap();
        let opened = unwrap(&suite, Role::Acceptor, true, &decoded).unwrap();

        assert_eq!(opened.data, b"payload");
        assert_eq!(opened.confidential, confidential);
        assert_eq!(opened.sequence_number, 41);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn rotated_token_is_accepted(#[case] confidential: bool) {
        let suite = suite(EncType::Aes256CtsHmacSha196);
        let mut token = wrap(&suite, Role::Initiator, false, 3, b"rotate me", confidential).unwrap();

        // 28 is what Windows uses; anything larger than the data wraps around.
        for rrc in [1_u16, 28, 1000] {
            let mut rotated = token.clone();
            let shift = usize::from(rrc) % rotated.data.len();
            rotated.data.rotate_right(shift);
            rotated.header.rrc = rrc;

            let opened = unwrap(&suite, Role::Initiator, false, &rotated).unwrap();
            assert_eq!(opened.data, b"rotate me");
        }

        token.header.rrc = 5;
        let error = unwrap(&suite, Role::Initiator, false, &token).unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::BadMic));
    }

    #[test]
    fn extra_count_mismatch_is_defective() {
        let suite = suite(EncType::Aes128CtsHmacSha196);
        let mut token = wrap(&suite, Role::Initiator, false, 0, b"data", false).unwrap();
        token.header.ec = 11;

        let error = unwrap(&suite, Role::Initiator, false, &token).unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::DefectiveToken));
    }

    #[test]
    fn direction_flag_is_checked() {
        let suite = suite(EncType::Aes128CtsHmacSha196);
        let token = get_mic(&suite, Role::Initiator, false, 0, b"data").unwrap();

        let error = verify_mic(&suite, Role::Acceptor, false, &token, b"data").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::DefectiveToken));
    }

    #[test]
    fn acceptor_subkey_flag_is_checked() {
        let suite = suite(EncType::Aes128CtsHmacSha196);
        let token = get_mic(&suite, Role::Acceptor, true, 0, b"data").unwrap();

        let error = verify_mic(&suite, Role::Acceptor, false, &token, b"data").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::DefectiveToken));
    }

    #[test]
    fn mic_checksum_is_checked() {
        let suite = suite(EncType::Aes256CtsHmacSha384192);
        let token = get_mic(&suite, Role::Acceptor, false, 9, b"data").unwrap();
        assert_eq!(token.checksum.len(), 24);

        assert_eq!(verify_mic(&suite, Role::Acceptor, false, &token, b"data").unwrap(), 9);

        let error = verify_mic(&suite, Role::Acceptor, false, &token, b"dat4").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::BadMic));
    }
}
