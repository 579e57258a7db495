//! des3-cbc-sha1-kd ([RFC 3961 §6.3](https://www.rfc-editor.org/rfc/rfc3961#section-6.3)) checksum used by RFC 1964 tokens.

use picky_krb::crypto::des::derive_key;

use crate::key_usage::usage_kc;
use crate::utils::hmac_sha1;
use crate::CryptoResult;

pub(crate) use picky_krb::crypto::des::DES3_KEY_SIZE;

/// HMAC-SHA1-DES3-KD, untruncated (20 bytes).
///
/// Keyed with Kc = DK(key, usage | 0x99). `ChecksumSuite::HmacSha1Des3Kd` keys with Ki instead.
pub(crate) fn checksum(key: &[u8], usage: i32, parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
    let kc = derive_key(key, &usage_kc(usage))?;
    hmac_sha1(&kc, parts)
}
