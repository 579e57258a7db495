//! Key usage numbers and derivation constants.
//!
//! [RFC 4121 §2](https://www.rfc-editor.org/rfc/rfc4121#section-2) for the per-message usages,
//! [RFC 3961 §5.3](https://www.rfc-editor.org/rfc/rfc3961#section-5.3) for the derivation constants.

pub const KG_USAGE_ACCEPTOR_SEAL: i32 = 22;
pub const KG_USAGE_ACCEPTOR_SIGN: i32 = 23;
pub const KG_USAGE_INITIATOR_SEAL: i32 = 24;
pub const KG_USAGE_INITIATOR_SIGN: i32 = 25;

/// Legacy (RFC 1964) usages. DES3-KD derives its checksum key from `KG_USAGE_SIGN`.
pub const KG_USAGE_SEAL: i32 = 22;
pub const KG_USAGE_SIGN: i32 = 23;
pub const KG_USAGE_SEQ: i32 = 24;

/// Usage RC4-HMAC MIC tokens sign with. Other implementations expect 15 here, not 23.
pub const KG_USAGE_SIGN_MS: i32 = 15;

const CHECKSUM_CONSTANT: u8 = 0x99;
const ENCRYPTION_CONSTANT: u8 = 0xAA;
const INTEGRITY_CONSTANT: u8 = 0x55;

/// usage | 0x99
pub fn usage_kc(usage: i32) -> [u8; 5] {
    well_known(usage, CHECKSUM_CONSTANT)
}

/// usage | 0xAA
pub fn usage_ke(usage: i32) -> [u8; 5] {
    well_known(usage, ENCRYPTION_CONSTANT)
}

/// usage | 0x55
pub fn usage_ki(usage: i32) -> [u8; 5] {
    well_known(usage, INTEGRITY_CONSTANT)
}

fn well_known(usage: i32, constant: u8) -> [u8; 5] {
    let mut out = [0; 5];
    out[..4].copy_from_slice(&usage.to_be_bytes());
    out[4] = constant;
    out
}

/// RFC 4757 §3 usage translation for RC4-HMAC.
pub fn arcfour_translate_usage(usage: i32) -> i32 {
    match usage {
        3 => 8,
        9 => 8,
        23 => 13,
        other => other,
    }
}

/// Usage selecting the RFC 4121 checksum or encryption key for a token.
pub fn rfc4121_usage(sent_by_acceptor: bool, seal: bool) -> i32 {
    match (sent_by_acceptor, seal) {
        (true, true) => KG_USAGE_ACCEPTOR_SEAL,
        (true, false) => KG_USAGE_ACCEPTOR_SIGN,
        (false, true) => KG_USAGE_INITIATOR_SEAL,
        (false, false) => KG_USAGE_INITIATOR_SIGN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_constants() {
        assert_eq!(usage_kc(23), [0, 0, 0, 23, 0x99]);
        assert_eq!(usage_ke(24), [0, 0, 0, 24, 0xAA]);
        assert_eq!(usage_ki(22), [0, 0, 0, 22, 0x55]);
    }

    #[test]
    fn arcfour_usages() {
        assert_eq!(arcfour_translate_usage(KG_USAGE_SIGN), 13);
        assert_eq!(arcfour_translate_usage(KG_USAGE_SIGN_MS), 15);
        assert_eq!(arcfour_translate_usage(3), 8);
    }
}
