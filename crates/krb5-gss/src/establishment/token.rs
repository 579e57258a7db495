//! Context establishment tokens (RFC 1964 section 1.1).

use krb5_gss_core::{
    ensure_size, unexpected_message_type_err, Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor,
};

use crate::framing::{framed_size, read_framing, write_framing};

const TOKEN_ID_SIZE: usize = 2;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContextTokenId {
    ApReq = 0x0100,
    ApRep = 0x0200,
    KrbError = 0x0300,
}

impl ContextTokenId {
    fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0100 => Some(Self::ApReq),
            0x0200 => Some(Self::ApRep),
            0x0300 => Some(Self::KrbError),
            _ => None,
        }
    }
}

fn encode_context_token(dst: &mut WriteCursor<'_>, id: ContextTokenId, message: &[u8]) -> EncodeResult<()> {
    ensure_size!(in: dst, size: framed_size(TOKEN_ID_SIZE + message.len()));

    write_framing(dst, TOKEN_ID_SIZE + message.len())?;
    dst.write_u16_be(id as u16);
    dst.write_slice(message);

    Ok(())
}

fn decode_context_token<'de>(src: &mut ReadCursor<'de>) -> DecodeResult<(u16, &'de [u8])> {
    let inner_len = read_framing(src)?;
    let mut inner = ReadCursor::new(src.read_slice(inner_len));
    ensure_size!(in: inner, size: TOKEN_ID_SIZE);

    let id = inner.read_u16_be();

    Ok((id, inner.read_remaining()))
}

/// First token sent by the initiator: the framed AP-REQ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitSecContextToken {
    /// DER-encoded AP-REQ.
    pub ap_req: Vec<u8>,
}

impl InitSecContextToken {
    const NAME: &'static str = "InitSecContextToken";
}

impl Encode for InitSecContextToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        encode_context_token(dst, ContextTokenId::ApReq, &self.ap_req)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        framed_size(TOKEN_ID_SIZE + self.ap_req.len())
    }
}

impl<'de> Decode<'de> for InitSecContextToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let (id, message) = decode_context_token(src)?;

        match ContextTokenId::from_u16(id) {
            Some(ContextTokenId::ApReq) => Ok(Self {
                ap_req: message.to_vec(),
            }),
            _ => Err(unexpected_message_type_err!(Self::NAME, id)),
        }
    }
}

/// Reply of the acceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptSecContextToken {
    /// DER-encoded AP-REP.
    ApRep(Vec<u8>),
    /// DER-encoded KRB-ERROR.
    KrbError(Vec<u8>),
}

impl AcceptSecContextToken {
    const NAME: &'static str = "AcceptSecContextToken";

    fn parts(&self) -> (ContextTokenId, &[u8]) {
        match self {
            Self::ApRep(message) => (ContextTokenId::ApRep, message),
            Self::KrbError(message) => (ContextTokenId::KrbError, message),
        }
    }
}

impl Encode for AcceptSecContextToken {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        let (id, message) = self.parts();
        encode_context_token(dst, id, message)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        framed_size(TOKEN_ID_SIZE + self.parts().1.len())
    }
}

impl<'de> Decode<'de> for AcceptSecContextToken {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        let (id, message) = decode_context_token(src)?;

        match ContextTokenId::from_u16(id) {
            Some(ContextTokenId::ApRep) => Ok(Self::ApRep(message.to_vec())),
            Some(ContextTokenId::KrbError) => Ok(Self::KrbError(message.to_vec())),
            _ => Err(unexpected_message_type_err!(Self::NAME, id)),
        }
    }
}
