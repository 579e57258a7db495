use core::fmt;

use crate::{Error, ReadCursor, Source, WriteCursor};

/// Result of a decoding operation.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Error produced while decoding a wire structure.
pub type DecodeError = Error<CodecErrorKind>;

/// Result of an encoding operation.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// Error produced while encoding a wire structure.
pub type EncodeError = Error<CodecErrorKind>;

/// Kind of a codec failure.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecErrorKind {
    /// The buffer is shorter than the structure requires.
    NotEnoughBytes {
        /// Number of bytes available.
        received: usize,
        /// Number of bytes required.
        expected: usize,
    },
    /// A field holds a value that breaks the structure's rules.
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// A token or message identifier did not match.
    UnexpectedMessageType {
        /// Identifier that was found.
        got: u16,
    },
    /// A value is well-formed but not supported.
    UnsupportedValue {
        /// Name of the value.
        name: &'static str,
        /// The value, formatted.
        value: String,
    },
    /// Input continues past the end of the structure.
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },
}

impl std::error::Error for CodecErrorKind {}

impl fmt::Display for CodecErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotEnoughBytes { received, expected } => write!(
                f,
                "not enough bytes provided: received {received} bytes, expected {expected} bytes"
            ),
            Self::InvalidField { field, reason } => {
                write!(f, "invalid `{field}`: {reason}")
            }
            Self::UnexpectedMessageType { got } => {
                write!(f, "invalid message type (0x{got:04X})")
            }
            Self::UnsupportedValue { name, value } => {
                write!(f, "unsupported {name} ({value})")
            }
            Self::TrailingBytes { count } => {
                write!(f, "{count} trailing bytes after structure")
            }
        }
    }
}

#[doc(hidden)]
#[cold]
pub fn not_enough_bytes_err(context: &'static str, received: usize, expected: usize) -> Error<CodecErrorKind> {
    Error::new(context, CodecErrorKind::NotEnoughBytes { received, expected })
}

#[doc(hidden)]
#[cold]
pub fn invalid_field_err(context: &'static str, field: &'static str, reason: &'static str) -> Error<CodecErrorKind> {
    Error::new(context, CodecErrorKind::InvalidField { field, reason })
}

#[doc(hidden)]
#[cold]
pub fn invalid_field_err_with_source<E: Source>(
    context: &'static str,
    field: &'static str,
    reason: &'static str,
    source: E,
) -> Error<CodecErrorKind> {
    invalid_field_err(context, field, reason).with_source(source)
}

#[doc(hidden)]
#[cold]
pub fn unexpected_message_type_err(context: &'static str, got: u16) -> Error<CodecErrorKind> {
    Error::new(context, CodecErrorKind::UnexpectedMessageType { got })
}

#[doc(hidden)]
#[cold]
pub fn unsupported_value_err(context: &'static str, name: &'static str, value: String) -> Error<CodecErrorKind> {
    Error::new(context, CodecErrorKind::UnsupportedValue { name, value })
}

#[doc(hidden)]
#[cold]
pub fn trailing_bytes_err(context: &'static str, count: usize) -> Error<CodecErrorKind> {
    Error::new(context, CodecErrorKind::TrailingBytes { count })
}

/// PDU that can be encoded into its binary form.
///
/// The resulting binary payload is a fully encoded token that may be sent to the peer.
pub trait Encode {
    /// Encodes this structure in-place using the provided `WriteCursor`.
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()>;

    /// Returns the associated structure name.
    fn name(&self) -> &'static str;

    /// Computes the size in bytes for this structure.
    fn size(&self) -> usize;
}

/// Encodes the given structure in-place into the provided buffer and returns the number of bytes written.
pub fn encode<T>(pdu: &T, dst: &mut [u8]) -> EncodeResult<usize>
where
    T: Encode + ?Sized,
{
    let mut cursor = WriteCursor::new(dst);
    encode_cursor(pdu, &mut cursor)?;
    Ok(cursor.pos())
}

/// Encodes the given structure in-place using the provided `WriteCursor`.
pub fn encode_cursor<T>(pdu: &T, dst: &mut WriteCursor<'_>) -> EncodeResult<()>
where
    T: Encode + ?Sized,
{
    let expected = pdu.size();

    if dst.len() < expected {
        return Err(not_enough_bytes_err(pdu.name(), dst.len(), expected));
    }

    pdu.encode(dst)
}

/// Encodes the given structure into a freshly allocated buffer.
pub fn encode_vec<T>(pdu: &T) -> EncodeResult<Vec<u8>>
where
    T: Encode + ?Sized,
{
    let mut buf = vec![0; pdu.size()];
    let written = encode(pdu, buf.as_mut_slice())?;
    debug_assert_eq!(written, buf.len());
    Ok(buf)
}

/// Structure that can be decoded from a binary input.
pub trait Decode<'de>: Sized {
    /// Decodes an instance of `Self` from the given byte stream.
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self>;
}

/// Decodes a structure from a byte slice.
pub fn decode<'de, T>(src: &'de [u8]) -> DecodeResult<T>
where
    T: Decode<'de>,
{
    let mut cursor = ReadCursor::new(src);
    T::decode(&mut cursor)
}

/// Decodes a structure that must span the whole byte slice.
pub fn decode_exact<'de, T>(src: &'de [u8]) -> DecodeResult<T>
where
    T: Decode<'de>,
{
    let mut cursor = ReadCursor::new(src);
    let value = T::decode(&mut cursor)?;

    if !cursor.is_empty() {
        return Err(trailing_bytes_err(core::any::type_name::<T>(), cursor.len()));
    }

    Ok(value)
}
