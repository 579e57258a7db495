//! RFC 1964 per-message tokens, as used with DES, DES3 and RC4-HMAC (RFC 4757) keys.
//!
//! ```text
//! framing | TOK_ID | SGN_ALG | SEAL_ALG | 0xFFFF | SND_SEQ (8) | SGN_CKSUM | [confounder | data | padding]
//! ```

use krb5_gss_core::{
    ensure_fixed_part_size, ensure_size, invalid_field_err, unexpected_message_type_err, unsupported_value_err,
    Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};
use krb5_gss_crypto::{constant_time_eq, CipherSuite, EncType, SealAlgorithm, SignAlgorithm, SEQUENCE_BLOCK_SIZE};

use super::Opened;
use crate::framing::{framed_size, read_framing, write_framing};
use crate::{GssError, GssErrorExt as _, GssResult, Role};

pub const LEGACY_HEADER_SIZE: usize = 8;

pub const LEGACY_CONFOUNDER_SIZE: usize = 8;

pub(crate) const MAX_PADDING: usize = 8;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegacyTokenId {
    Mic = 0x0101,
    Wrap = 0x0201,
}

impl LegacyTokenId {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0101 => Some(Self::Mic),
            0x0201 => Some(Self::Wrap),
            _ => None,
        }
    }

    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// The 8 bytes every legacy token starts with, after the framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyHeader {
    pub token_id: LegacyTokenId,
    pub sign_algorithm: SignAlgorithm,
    pub seal_algorithm: SealAlgorithm,
}

impl LegacyHeader {
    const NAME: &'static str = "LegacyHeader";

    const FIXED_PART_SIZE: usize = LEGACY_HEADER_SIZE;

    const FILLER: u16 = 0xFFFF;

    pub fn to_bytes(&self) -> [u8; LEGACY_HEADER_SIZE] {
        let mut out = [0; LEGACY_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.token_id.as_u16().to_be_bytes());
        out[2..4].copy_from_slice(&self.sign_algorithm.as_u16().to_be_bytes());
        out[4..6].copy_from_slice(&self.seal_algorithm.as_u16().to_be_bytes());
        out[6..8].copy_from_slice(&Self::FILLER.to_be_bytes());
        out
    }
}

impl Encode for LegacyHeader {
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

impl<'de> Decode<'de> for LegacyHeader {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        let raw_id = src.read_u16_be();
        let token_id = LegacyTokenId::from_u16(raw_id).ok_or_else(|| unexpected_message_type_err!(Self::NAME, raw_id))?;

        let raw_sign = src.read_u16_be();
        let sign_algorithm = SignAlgorithm::from_u16(raw_sign)
            .ok_or_else(|| unsupported_value_err!(Self::NAME, "SGN_ALG", format!("0x{raw_sign:04X}")))?;

        let raw_seal = src.read_u16_be();
        let seal_algorithm = SealAlgorithm::from_u16(raw_seal)
            .ok_or_else(|| unsupported_value_err!(Self::NAME, "SEAL_ALG", format!("0x{raw_seal:04X}")))?;

        if src.read_u16_be() != Self::FILLER {
            return Err(invalid_field_err!(Self::NAME, "filler", "must be 0xFFFF"));
        }

        Ok(Self {
            token_id,
            sign_algorithm,
            seal_algorithm,
        })
    }
}

/// Header, encrypted sequence number and checksum shared by legacy Wrap and MIC tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMessageToken {
    pub header: LegacyHeader,
    pub encrypted_sequence: [u8; SEQUENCE_BLOCK_SIZE],
    pub checksum: Vec<u8>,
}

impl LegacyMessageToken {
    const NAME: &'static str = "LegacyMessageToken";

    fn size(&self) -> usize {
        LEGACY_HEADER_SIZE + SEQUENCE_BLOCK_SIZE + self.checksum.len()
    }

    fn write(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(ctx: Self::NAME, in: dst, size: self.size());

        self.header.encode(dst)?;
        dst.write_array(self.encrypted_sequence);
        dst.write_slice(&self.checksum);

        Ok(())
    }

    fn read(src: &mut ReadCursor<'_>, expected: LegacyTokenId) -> DecodeResult<Self> {
        let header = LegacyHeader::decode(src)?;
        if header.token_id != expected {
            return Err(unexpected_message_type_err!(Self::NAME, header.token_id.as_u16()));
        }

        let checksum_length = header.sign_algorithm.checksum_length();
        ensure_size!(ctx: Self::NAME, in: src, size: SEQUENCE_BLOCK_SIZE + checksum_length);

        let encrypted_sequence = src.read_array();
        let checksum = src.read_slice(checksum_length).to_vec();

        Ok(Self {
            header,
            encrypted_sequence,
            checksum,
        })
    }

    /// Checksums `header | body` and encrypts the sequence number block under the result.
    fn sign(
        suite: &CipherSuite,
        header: LegacyHeader,
        sender: Role,
        sequence_number: u32,
        key_usage: i32,
        body: &[u8],
    ) -> GssResult<Self> {
        let checksum = suite
            .checksum(key_usage, &[header.to_bytes().as_slice(), body])
            .map_err(|e| GssError::crypto("legacy checksum", e))?;

        let block = sequence_block(suite.enc_type(), sequence_number, sender);
        let encrypted_sequence = suite
            .encrypt_sequence(&checksum, &block)
            .map_err(|e| GssError::crypto("legacy sequence number", e))?;

        Ok(Self {
            header,
            encrypted_sequence,
            checksum,
        })
    }

    /// Decrypts the sequence number; the flag tells whether the direction marker names `sender`.
    fn open_sequence(&self, suite: &CipherSuite, sender: Role) -> GssResult<(u32, bool)> {
        let block = suite
            .decrypt_sequence(&self.checksum, &self.encrypted_sequence)
            .map_err(|e| GssError::crypto("legacy sequence number", e))?;

        let number = [block[0], block[1], block[2], block[3]];
        let sequence_number = if suite.enc_type() == EncType::Rc4Hmac {
            u32::from_be_bytes(number)
        } else {
            u32::from_le_bytes(number)
        };

        let direction_matches = block[4..] == direction_marker(sender)[..];

        Ok((sequence_number, direction_matches))
    }

    fn checksum_matches(&self, suite: &CipherSuite, key_usage: i32, body: &[u8]) -> GssResult<bool> {
        let expected = suite
            .checksum(key_usage, &[self.header.to_bytes().as_slice(), body])
            .map_err(|e| GssError::crypto("legacy checksum", e))?;

        Ok(constant_time_eq(&expected, &self.checksum))
    }

    fn ensure_algorithms(&self, suite: &CipherSuite) -> GssResult<()> {
        if self.header.sign_algorithm != suite.sign_algorithm().map_err(|e| GssError::crypto(Self::NAME, e))? {
            return Err(unsupported_err!("SGN_ALG does not match the context key"));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyMicToken {
    pub message: LegacyMessageToken,
}

impl LegacyMicToken {
    const NAME: &'static str = "LegacyMicToken";
}

impl Encode for LegacyMicToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        write_framing(dst, self.message.size())?;
        self.message.write(dst)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        framed_size(self.message.size())
    }
}

impl<'de> Decode<'de> for LegacyMicToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let inner_len = read_framing(src)?;
        let mut inner = ReadCursor::new(src.read_slice(inner_len));

        let message = LegacyMessageToken::read(&mut inner, LegacyTokenId::Mic)?;
        if !inner.is_empty() {
            return Err(invalid_field_err!(Self::NAME, "length", "trailing bytes after checksum"));
        }

        Ok(Self { message })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyWrapToken {
    pub message: LegacyMessageToken,
    /// `confounder | data | padding`, encrypted when SEAL_ALG is not `None`.
    pub payload: Vec<u8>,
}

impl LegacyWrapToken {
    const NAME: &'static str = "LegacyWrapToken";

    fn inner_size(&self) -> usize {
        self.message.size() + self.payload.len()
    }

    pub fn is_sealed(&self) -> bool {
        self.message.header.seal_algorithm != SealAlgorithm::None
    }
}

impl Encode for LegacyWrapToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        write_framing(dst, self.inner_size())?;
        self.message.write(dst)?;
        dst.write_slice(&self.payload);

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        framed_size(self.inner_size())
    }
}

impl<'de> Decode<'de> for LegacyWrapToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let inner_len = read_framing(src)?;
        let mut inner = ReadCursor::new(src.read_slice(inner_len));

        let message = LegacyMessageToken::read(&mut inner, LegacyTokenId::Wrap)?;
        let payload = inner.read_remaining().to_vec();

        Ok(Self { message, payload })
    }
}

/// Number of padding bytes appended to `data_len` bytes of application data.
///
/// Always at least one byte; RC4-HMAC always uses exactly one.
pub fn padding_length(enc_type: EncType, data_len: usize) -> usize {
    if enc_type == EncType::Rc4Hmac {
        1
    } else {
        MAX_PADDING - data_len % MAX_PADDING
    }
}

fn direction_marker(sender: Role) -> [u8; 4] {
    match sender {
        Role::Initiator => [0x00; 4],
        Role::Acceptor => [0xFF; 4],
    }
}

fn sequence_block(enc_type: EncType, sequence_number: u32, sender: Role) -> [u8; SEQUENCE_BLOCK_SIZE] {
    let number = if enc_type == EncType::Rc4Hmac {
        sequence_number.to_be_bytes()
    } else {
        sequence_number.to_le_bytes()
    };

    let mut block = [0; SEQUENCE_BLOCK_SIZE];
    block[..4].copy_from_slice(&number);
    block[4..].copy_from_slice(&direction_marker(sender));
    block
}

pub(crate) fn wrap(
    suite: &CipherSuite,
    sender: Role,
    sequence_number: u32,
    data: &[u8],
    confidential: bool,
    confounder: [u8; LEGACY_CONFOUNDER_SIZE],
) -> GssResult<LegacyWrapToken> {
    let to_gss = |e| GssError::crypto("legacy wrap", e);

    let seal_algorithm = if confidential {
        suite.seal_algorithm().map_err(to_gss)?
    } else {
        SealAlgorithm::None
    };

    let header = LegacyHeader {
        token_id: LegacyTokenId::Wrap,
        sign_algorithm: suite.sign_algorithm().map_err(to_gss)?,
        seal_algorithm,
    };

    let padding = padding_length(suite.enc_type(), data.len());
    let pad_byte = u8::try_from(padding).map_err(|e| custom_err!("legacy padding", e))?;

    let mut plaintext = Vec::with_capacity(LEGACY_CONFOUNDER_SIZE + data.len() + padding);
    plaintext.extend_from_slice(&confounder);
    plaintext.extend_from_slice(data);
    plaintext.resize(plaintext.len() + padding, pad_byte);

    let message = LegacyMessageToken::sign(
        suite,
        header,
        sender,
        sequence_number,
        suite.legacy_sign_usage(false),
        &plaintext,
    )?;

    let payload = if confidential {
        suite.encrypt_legacy(sequence_number, &plaintext).map_err(to_gss)?
    } else {
        plaintext
    };

    Ok(LegacyWrapToken { message, payload })
}

/// Opens a Wrap token sent by `sender`.
///
/// Checksum and direction marker are both checked before either can fail the call, and the
/// padding is only looked at once the checksum is known good.
pub(crate) fn unwrap(suite: &CipherSuite, sender: Role, token: &LegacyWrapToken) -> GssResult<Opened> {
    let to_gss = |e| GssError::crypto("legacy unwrap", e);

    token.message.ensure_algorithms(suite)?;

    let confidential = match token.message.header.seal_algorithm {
        SealAlgorithm::None => false,
        algorithm if algorithm == suite.seal_algorithm().map_err(to_gss)? => true,
        _ => return Err(unsupported_err!("SEAL_ALG does not match the context key")),
    };

    let payload_len = token.payload.len();
    if payload_len < LEGACY_CONFOUNDER_SIZE + 1 || payload_len % suite.block_size() != 0 {
        return Err(defective_token_err!("legacy wrap payload length"));
    }

    let (sequence_number, direction_matches) = token.message.open_sequence(suite, sender)?;

    let plaintext = if confidential {
        suite.decrypt_legacy(sequence_number, &token.payload).map_err(to_gss)?
    } else {
        token.payload.clone()
    };

    let checksum_matches = token
        .message
        .checksum_matches(suite, suite.legacy_sign_usage(false), &plaintext)?;

    if !(checksum_matches && direction_matches) {
        return Err(bad_mic_err!("legacy unwrap"));
    }

    let padding = plaintext.last().map_or(0, |&pad| usize::from(pad));
    if padding == 0 || padding > MAX_PADDING || padding > plaintext.len() - LEGACY_CONFOUNDER_SIZE {
        return Err(defective_token_err!("legacy wrap padding"));
    }

    Ok(Opened {
        data: plaintext[LEGACY_CONFOUNDER_SIZE..plaintext.len() - padding].to_vec(),
        confidential,
        sequence_number,
    })
}

pub(crate) fn get_mic(suite: &CipherSuite, sender: Role, sequence_number: u32, data: &[u8]) -> GssResult<LegacyMicToken> {
    let header = LegacyHeader {
        token_id: LegacyTokenId::Mic,
        sign_algorithm: suite.sign_algorithm().map_err(|e| GssError::crypto("legacy MIC", e))?,
        seal_algorithm: SealAlgorithm::None,
    };

    let message = LegacyMessageToken::sign(suite, header, sender, sequence_number, suite.legacy_sign_usage(true), data)?;

    Ok(LegacyMicToken { message })
}

/// Verifies a MIC token sent by `sender` and returns its sequence number.
pub(crate) fn verify_mic(suite: &CipherSuite, sender: Role, token: &LegacyMicToken, data: &[u8]) -> GssResult<u32> {
    token.message.ensure_algorithms(suite)?;

    if token.message.header.seal_algorithm != SealAlgorithm::None {
        return Err(defective_token_err!("MIC token with SEAL_ALG"));
    }

    let (sequence_number, direction_matches) = token.message.open_sequence(suite, sender)?;
    let checksum_matches = token
        .message
        .checksum_matches(suite, suite.legacy_sign_usage(true), data)?;

    if !(checksum_matches && direction_matches) {
        return Err(bad_mic_err!("legacy verify_mic"));
    }

    Ok(sequence_number)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use krb5_gss_core::{decode, encode_vec};
    use rstest::rstest;

    use super::*;
    use crate::GssErrorKind;

    fn suite(enc_type: EncType) -> CipherSuite {
        let key: Vec<u8> = (1..=enc_type.key_length()).map(|i| u8::try_from(i).unwrap()).collect();
        CipherSuite::new(enc_type, &key).unwrap()
    }

    #[test]
    fn header_layout() {
        let header = LegacyHeader {
            token_id: LegacyTokenId::Wrap,
            sign_algorithm: SignAlgorithm::HmacSha1Des3Kd,
            seal_algorithm: SealAlgorithm::Des3Kd,
        };

        assert_eq!(header.to_bytes(), hex!("0201 0400 0200 ffff"));
        assert_eq!(decode::<LegacyHeader>(&header.to_bytes()).unwrap(), header);
    }

    #[test]
    fn header_rejects_bad_filler() {
        let error = decode::<LegacyHeader>(&hex!("0101 1100 ffff fffe")).unwrap_err();
        assert_eq!(
            error.kind,
            krb5_gss_core::CodecErrorKind::InvalidField {
                field: "filler",
                reason: "must be 0xFFFF",
            }
        );
    }

    #[test]
    fn header_rejects_unknown_sign_algorithm() {
        let error = decode::<LegacyHeader>(&hex!("0101 0900 ffff ffff")).unwrap_err();
        assert!(matches!(
            error.kind,
            krb5_gss_core::CodecErrorKind::UnsupportedValue { name: "SGN_ALG", .. }
        ));
    }

    #[rstest]
    #[case(EncType::DesCbcMd5, 0, 8)]
    #[case(EncType::DesCbcMd5, 1, 7)]
    #[case(EncType::Des3CbcSha1Kd, 7, 1)]
    #[case(EncType::Des3CbcSha1Kd, 8, 8)]
    #[case(EncType::DesCbcCrc, 13, 3)]
    #[case(EncType::Rc4Hmac, 0, 1)]
    #[case(EncType::Rc4Hmac, 8, 1)]
    fn padding_rule(#[case] enc_type: EncType, #[case] data_len: usize, #[case] expected: usize) {
        assert_eq!(padding_length(enc_type, data_len), expected);
    }

    #[test]
    fn sequence_block_endianness() {
        assert_eq!(
            sequence_block(EncType::DesCbcMd5, 0x0102_0304, Role::Initiator),
            hex!("04030201 00000000")
        );
        assert_eq!(
            sequence_block(EncType::Rc4Hmac, 0x0102_0304, Role::Acceptor),
            hex!("01020304 ffffffff")
        );
    }

    #[rstest]
    #[case(EncType::DesCbcMd5, true)]
    #[case(EncType::DesCbcMd5, false)]
    #[case(EncType::Des3CbcSha1Kd, true)]
    #[case(EncType::Rc4Hmac, true)]
    #[case(EncType::Rc4Hmac, false)]
    fn wrap_unwrap(#[case] enc_type: EncType, #[case] confidential: bool) {
        let suite = suite(enc_type);
        let token = wrap(&suite, Role::Initiator, 7, b"legacy data", confidential, [0x5A; 8]).unwrap();
        assert_eq!(token.is_sealed(), confidential);

        let bytes = encode_vec(&token).unwrap();
        let decoded = decode::<LegacyWrapToken>(&bytes).unwrap();
        assert_eq!(decoded, token);

        let opened = unwrap(&suite, Role::Initiator, &decoded).unwrap();
        assert_eq!(opened.data, b"legacy data");
        assert_eq!(opened.confidential, confidential);
        assert_eq!(opened.sequence_number, 7);
    }

    #[test]
    fn plaintext_wrap_layout() {
        let suite = suite(EncType::DesCbcMd5);
        let token = wrap(&suite, Role::Acceptor, 0, b"abc", false, [0x11; 8]).unwrap();

        assert_eq!(token.payload, hex!("1111111111111111 616263 0505050505"));
    }

    #[test]
    fn direction_is_checked() {
        let suite = suite(EncType::Des3CbcSha1Kd);
        let token = wrap(&suite, Role::Initiator, 1, b"reflected", true, [0; 8]).unwrap();

        let error = unwrap(&suite, Role::Acceptor, &token).unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::BadMic));
    }

    #[test]
    fn mic_round_trip_and_tamper() {
        let suite = suite(EncType::Rc4Hmac);
        let token = get_mic(&suite, Role::Acceptor, 99, b"signed").unwrap();
        assert_eq!(token.message.checksum.len(), 8);

        let decoded = decode::<LegacyMicToken>(&encode_vec(&token).unwrap()).unwrap();
        assert_eq!(verify_mic(&suite, Role::Acceptor, &decoded, b"signed").unwrap(), 99);

        let error = verify_mic(&suite, Role::Acceptor, &decoded, b"signet").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::BadMic));
    }

    #[test]
    fn foreign_sign_algorithm_is_unsupported() {
        let token = get_mic(&suite(EncType::DesCbcMd5), Role::Initiator, 0, b"x").unwrap();

        let error = verify_mic(&suite(EncType::Rc4Hmac), Role::Initiator, &token, b"x").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::UnsupportedAlgorithm));
    }

    #[test]
    fn foreign_seal_algorithm_is_unsupported() {
        let suite = suite(EncType::Des3CbcSha1Kd);
        let mut token = wrap(&suite, Role::Initiator, 3, b"sealed", true, [0; 8]).unwrap();
        token.message.header.seal_algorithm = SealAlgorithm::Arcfour;

        let error = unwrap(&suite, Role::Initiator, &token).unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::UnsupportedAlgorithm));
    }

    #[test]
    fn mic_with_seal_algorithm_is_defective() {
        let suite = suite(EncType::DesCbcMd5);
        let mut token = get_mic(&suite, Role::Initiator, 0, b"x").unwrap();
        token.message.header.seal_algorithm = SealAlgorithm::Des;

        let error = verify_mic(&suite, Role::Initiator, &token, b"x").unwrap_err();
        assert!(matches!(error.kind(), GssErrorKind::DefectiveToken));
    }
}
