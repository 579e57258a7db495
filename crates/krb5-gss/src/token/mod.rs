pub(crate) mod legacy;
pub(crate) mod rfc4121;

use krb5_gss_core::{
    ensure_size, unexpected_message_type_err, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};
use krb5_gss_crypto::ProtocolGeneration;

pub use self::legacy::{
    padding_length, LegacyHeader, LegacyMessageToken, LegacyMicToken, LegacyTokenId, LegacyWrapToken,
    LEGACY_CONFOUNDER_SIZE, LEGACY_HEADER_SIZE,
};
pub use self::rfc4121::{
    Rfc4121Header, Rfc4121MicToken, Rfc4121TokenId, Rfc4121WrapToken, RFC4121_CONFOUNDER_SIZE, RFC4121_HEADER_SIZE,
};
use crate::framing;

/// Result of opening a Wrap token.
#[derive(Debug)]
pub(crate) struct Opened {
    pub(crate) data: Vec<u8>,
    pub(crate) confidential: bool,
    pub(crate) sequence_number: u32,
}

/// Any per-message token, as found on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    LegacyWrap(LegacyWrapToken),
    LegacyMic(LegacyMicToken),
    Rfc4121Wrap(Rfc4121WrapToken),
    Rfc4121Mic(Rfc4121MicToken),
}

impl Token {
    const NAME: &'static str = "Token";

    pub fn generation(&self) -> ProtocolGeneration {
        match self {
            Token::LegacyWrap(_) | Token::LegacyMic(_) => ProtocolGeneration::Legacy,
            Token::Rfc4121Wrap(_) | Token::Rfc4121Mic(_) => ProtocolGeneration::Rfc4121,
        }
    }

    pub fn is_wrap(&self) -> bool {
        matches!(self, Token::LegacyWrap(_) | Token::Rfc4121Wrap(_))
    }

    fn as_encode(&self) -> &dyn Encode {
        match self {
            Token::LegacyWrap(token) => token,
            Token::LegacyMic(token) => token,
            Token::Rfc4121Wrap(token) => token,
            Token::Rfc4121Mic(token) => token,
        }
    }
}

impl Encode for Token {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        self.as_encode().encode(dst)
    }

    fn name(&self) -> &'static str {
        self.as_encode().name()
    }

    fn size(&self) -> usize {
        self.as_encode().size()
    }
}

impl<'de> Decode<'de> for Token {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        if framing::is_framed(src.remaining()) {
            let mut probe = src.clone();
            framing::read_framing(&mut probe)?;
            ensure_size!(ctx: Self::NAME, in: probe, size: 2);

            let raw_id = probe.peek_u16_be();
            match LegacyTokenId::from_u16(raw_id) {
                Some(LegacyTokenId::Wrap) => LegacyWrapToken::decode(src).map(Token::LegacyWrap),
                Some(LegacyTokenId::Mic) => LegacyMicToken::decode(src).map(Token::LegacyMic),
                None => Err(unexpected_message_type_err!(Self::NAME, raw_id)),
            }
        } else {
            ensure_size!(ctx: Self::NAME, in: src, size: 2);

            let raw_id = src.peek_u16_be();
            match Rfc4121TokenId::from_u16(raw_id) {
                Some(Rfc4121TokenId::Wrap) => Rfc4121WrapToken::decode(src).map(Token::Rfc4121Wrap),
                Some(Rfc4121TokenId::Mic) => Rfc4121MicToken::decode(src).map(Token::Rfc4121Mic),
                None => Err(unexpected_message_type_err!(Self::NAME, raw_id)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use krb5_gss_core::decode;

    use super::*;

    #[test]
    fn dispatches_on_token_id() {
        let mic = hex!("0404 00 ff ffffffff 0000000000000001 0102030405060708090a0b0c");
        let token = decode::<Token>(&mic).unwrap();

        assert!(matches!(token, Token::Rfc4121Mic(_)));
        assert_eq!(token.generation(), ProtocolGeneration::Rfc4121);
        assert!(!token.is_wrap());
        assert_eq!(token.size(), mic.len());
    }

    #[test]
    fn legacy_token_is_recognised_through_framing() {
        let token = hex!(
            "6023 06092a864886f712010202"
            "0101 0000 ffff ffff"
            "0000000000000000"
            "0000000000000000"
        );

        let token = decode::<Token>(&token).unwrap();
        assert!(matches!(token, Token::LegacyMic(_)));
    }

    #[test]
    fn unknown_token_id() {
        let error = decode::<Token>(&hex!("0303 00 ff ffffffff 0000000000000001")).unwrap_err();
        assert_eq!(error.kind, krb5_gss_core::CodecErrorKind::UnexpectedMessageType { got: 0x0303 });
    }
}
