//! RFC 2743 section 3.1 token framing.
//!
//! ```text
//! 0x60 | DER length | 0x06 0x09 | 1.2.840.113554.1.2.2 | inner token
//! ```

use krb5_gss_core::{
    cast_length, ensure_size, invalid_field_err, unexpected_message_type_err, DecodeResult, EncodeResult, ReadCursor,
    WriteCursor,
};

/// DER encoding of the Kerberos 5 mechanism OID, 1.2.840.113554.1.2.2.
pub const KRB5_MECH_OID: [u8; 9] = [0x2A, 0x86, 0x48, 0x86, 0xF7, 0x12, 0x01, 0x02, 0x02];

const APPLICATION_0: u8 = 0x60;
const OID_TAG: u8 = 0x06;
const MECH_SIZE: usize = 2 + KRB5_MECH_OID.len();

/// Upper bound of the bytes [`write_framing`] adds in front of an inner token.
pub(crate) const MAX_FRAMING_SIZE: usize = 1 + 5 + MECH_SIZE;

/// Whether `token` starts like an RFC 2743 framed token.
pub(crate) fn is_framed(token: &[u8]) -> bool {
    token.first() == Some(&APPLICATION_0)
}

pub(crate) fn framed_size(inner_len: usize) -> usize {
    let body = MECH_SIZE + inner_len;
    1 + der_length_size(body) + body
}

pub(crate) fn write_framing(dst: &mut WriteCursor<'_>, inner_len: usize) -> EncodeResult<()> {
    ensure_size!(in: dst, size: framed_size(inner_len) - inner_len);

    dst.write_u8(APPLICATION_0);
    write_der_length(dst, cast_length!("length", MECH_SIZE + inner_len)?);
    dst.write_u8(OID_TAG);
    dst.write_u8(0x09);
    dst.write_array(KRB5_MECH_OID);

    Ok(())
}

/// Reads the framing and returns the length of the inner token, which is known to be available.
pub(crate) fn read_framing(src: &mut ReadCursor<'_>) -> DecodeResult<usize> {
    ensure_size!(in: src, size: 1);
    let tag = src.read_u8();
    if tag != APPLICATION_0 {
        return Err(unexpected_message_type_err!(u16::from(tag)));
    }

    let body = read_der_length(src)?;
    ensure_size!(in: src, size: body);

    if body < MECH_SIZE {
        return Err(invalid_field_err!("length", "shorter than the mechanism OID"));
    }

    let oid_tag = src.read_u8();
    let oid_len = src.read_u8();
    let oid = src.read_slice(KRB5_MECH_OID.len());
    if oid_tag != OID_TAG || oid_len != 0x09 || oid != KRB5_MECH_OID.as_slice() {
        return Err(invalid_field_err!("mech", "not the Kerberos 5 mechanism"));
    }

    Ok(body - MECH_SIZE)
}

fn der_length_octets(length: usize) -> u8 {
    match length {
        0..=0x7F => 0,
        0x80..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn der_length_size(length: usize) -> usize {
    1 + usize::from(der_length_octets(length))
}

fn write_der_length(dst: &mut WriteCursor<'_>, length: u32) {
    let bytes = length.to_be_bytes();

    match der_length_octets(usize::try_from(length).unwrap_or(usize::MAX)) {
        0 => dst.write_u8(bytes[3]),
        octets => {
            dst.write_u8(0x80 | octets);
            dst.write_slice(&bytes[4 - usize::from(octets)..]);
        }
    }
}

fn read_der_length(src: &mut ReadCursor<'_>) -> DecodeResult<usize> {
    ensure_size!(in: src, size: 1);
    let first = src.read_u8();

    if first & 0x80 == 0 {
        return Ok(usize::from(first));
    }

    let octets = usize::from(first & 0x7F);
    if octets == 0 || octets > 4 {
        return Err(invalid_field_err!("length", "invalid length of the length"));
    }

    ensure_size!(in: src, size: octets);
    let mut bytes = [0u8; 4];
    bytes[4 - octets..].copy_from_slice(src.read_slice(octets));

    cast_length!("length", u32::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn frame(inner: &[u8]) -> Vec<u8> {
        let mut buf = vec![0; framed_size(inner.len())];
        let mut dst = WriteCursor::new(&mut buf);
        write_framing(&mut dst, inner.len()).unwrap();
        dst.write_slice(inner);
        buf
    }

    #[test]
    fn short_form_length() {
        let framed = frame(&[0x01, 0x00, 0xAA]);

        assert_eq!(
            framed,
            [0x60, 0x0E, 0x06, 0x09, 0x2A, 0x86, 0x48, 0x86, 0xF7, 0x12, 0x01, 0x02, 0x02, 0x01, 0x00, 0xAA]
        );
        assert!(is_framed(&framed));
    }

    #[rstest]
    #[case(0x74, &[0x7F])]
    #[case(0x75, &[0x81, 0x80])]
    #[case(0xFFF4, &[0x82, 0xFF, 0xFF])]
    #[case(0xFFF5, &[0x83, 0x01, 0x00, 0x00])]
    fn long_form_length(#[case] inner_len: usize, #[case] expected: &[u8]) {
        let framed = frame(&vec![0; inner_len]);

        assert_eq!(&framed[1..=expected.len()], expected);
        assert_eq!(framed.len(), 1 + expected.len() + 11 + inner_len);

        let mut src = ReadCursor::new(&framed);
        assert_eq!(read_framing(&mut src).unwrap(), inner_len);
        assert_eq!(src.len(), inner_len);
    }

    #[test]
    fn wrong_mechanism_is_rejected() {
        let mut framed = frame(&[0; 4]);
        framed[12] = 0x03;

        let error = read_framing(&mut ReadCursor::new(&framed)).unwrap_err();
        assert_eq!(
            error.kind,
            krb5_gss_core::CodecErrorKind::InvalidField {
                field: "mech",
                reason: "not the Kerberos 5 mechanism",
            }
        );
    }

    #[test]
    fn truncated_body_is_rejected() {
        let framed = frame(&[0; 4]);
        assert!(read_framing(&mut ReadCursor::new(&framed[..framed.len() - 1])).is_err());
    }

    #[test]
    fn wrong_tag_is_rejected() {
        let error = read_framing(&mut ReadCursor::new(&[0x30, 0x00])).unwrap_err();
        assert_eq!(error.kind, krb5_gss_core::CodecErrorKind::UnexpectedMessageType { got: 0x30 });
    }
}
