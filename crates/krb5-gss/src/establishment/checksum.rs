//! The 0x8003 authenticator checksum (RFC 4121 section 4.1.1).
//!
//! ```text
//! Lgth (16, LE) | Bnd (16) | Flags (LE) | [DlgOpt (1, LE) | Dlgth (LE) | Deleg] | [Exts]
//! ```

use krb5_gss_core::{
    cast_length, ensure_fixed_part_size, ensure_size, invalid_field_err, Decode, DecodeResult, Encode, EncodeResult,
    ReadCursor, WriteCursor,
};
use md5::{Digest as _, Md5};

use crate::GssFlags;

/// Checksum type carrying GSS-API data inside a Kerberos authenticator.
pub const GSS_CHECKSUM_TYPE: i32 = 0x8003;

const BINDINGS_LENGTH: u32 = 16;
const DELEGATION_OPTION: u16 = 1;

/// Channel bindings, as hashed into the `Bnd` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    pub initiator_addr_type: u32,
    pub initiator_address: Vec<u8>,
    pub acceptor_addr_type: u32,
    pub acceptor_address: Vec<u8>,
    pub application_data: Vec<u8>,
}

impl ChannelBindings {
    /// Bindings that only carry application data, e.g. a TLS channel binding.
    pub fn from_application_data(application_data: Vec<u8>) -> Self {
        Self {
            application_data,
            ..Self::default()
        }
    }

    pub fn digest(&self) -> [u8; 16] {
        let mut hasher = Md5::new();

        hasher.update(self.initiator_addr_type.to_le_bytes());
        update_with_length(&mut hasher, &self.initiator_address);
        hasher.update(self.acceptor_addr_type.to_le_bytes());
        update_with_length(&mut hasher, &self.acceptor_address);
        update_with_length(&mut hasher, &self.application_data);

        hasher.finalize().into()
    }
}

fn update_with_length(hasher: &mut Md5, field: &[u8]) {
    // Wire lengths are 32-bit.
    let length = u32::try_from(field.len()).unwrap_or(u32::MAX);
    hasher.update(length.to_le_bytes());
    hasher.update(field);
}

/// Body of a 0x8003 checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadedChecksum {
    /// MD5 of the channel bindings, or zeroes when there are none.
    pub channel_binding_digest: [u8; 16],
    pub flags: GssFlags,
    /// Encrypted KRB-CRED, present exactly when `flags` contains `DELEG`.
    pub delegation: Option<Vec<u8>>,
}

impl OverloadedChecksum {
    const NAME: &'static str = "OverloadedChecksum";

    const FIXED_PART_SIZE: usize = 4 /* Lgth */ + 16 /* Bnd */ + 4 /* Flags */;

    pub fn new(bindings: Option<&ChannelBindings>, flags: GssFlags, delegation: Option<Vec<u8>>) -> Self {
        let mut flags = flags;
        flags.set(GssFlags::DELEG, delegation.is_some());

        Self {
            channel_binding_digest: bindings.map(ChannelBindings::digest).unwrap_or_default(),
            flags,
            delegation,
        }
    }
}

impl Encode for OverloadedChecksum {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ensure_size!(in: dst, size: self.size());

        dst.write_u32(BINDINGS_LENGTH);
        dst.write_array(self.channel_binding_digest);
        dst.write_u32(self.flags.bits());

        if let Some(delegation) = &self.delegation {
            dst.write_u16(DELEGATION_OPTION);
            dst.write_u16(cast_length!("Dlgth", delegation.len())?);
            dst.write_slice(delegation);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE + self.delegation.as_ref().map_or(0, |delegation| 4 + delegation.len())
    }
}

impl<'de> Decode<'de> for OverloadedChecksum {
    fn decode(src: &mut ReadCursor<'de>) -> DecodeResult<Self> {
        ensure_fixed_part_size!(in: src);

        if src.read_u32() != BINDINGS_LENGTH {
            return Err(invalid_field_err!("Lgth", "unexpected channel binding length"));
        }

        let channel_binding_digest = src.read_array();
        let flags = GssFlags::from_bits_retain(src.read_u32());

        let delegation = if flags.contains(GssFlags::DELEG) {
            ensure_size!(in: src, size: 4);

            if src.read_u16() != DELEGATION_OPTION {
                return Err(invalid_field_err!("DlgOpt", "unexpected delegation option"));
            }

            let length = usize::from(src.read_u16());
            ensure_size!(in: src, size: length);

            Some(src.read_slice(length).to_vec())
        } else {
            None
        };

        // Extensions are not interpreted.
        src.read_remaining();

        Ok(Self {
            channel_binding_digest,
            flags,
            delegation,
        })
    }
}
