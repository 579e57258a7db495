//! RC4-HMAC GSS-API algorithms ([RFC 4757 §7](https://www.rfc-editor.org/rfc/rfc4757#section-7)).

use md5::{Digest, Md5};

use crate::key_usage::arcfour_translate_usage;
use crate::rc4::Rc4;
use crate::utils::hmac_md5;
use crate::CryptoResult;

pub(crate) const ARCFOUR_CHECKSUM_SIZE: usize = 8;

const SIGNATURE_KEY: &[u8] = b"signaturekey\0";
const ZERO_SALT: [u8; 4] = [0; 4];

/// `HMAC(Ksign, MD5(usage | parts))`, truncated to 8 bytes.
pub(crate) fn checksum(key: &[u8], usage: i32, parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
    let ksign = hmac_md5(key, &[SIGNATURE_KEY])?;

    let mut hasher = Md5::new();
    hasher.update(arcfour_translate_usage(usage).to_le_bytes());
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();

    let mut mac = hmac_md5(&ksign, &[digest.as_slice()])?;
    mac.truncate(ARCFOUR_CHECKSUM_SIZE);

    Ok(mac)
}

/// Kseq = HMAC(HMAC(K, 0), checksum). RC4 is its own inverse.
pub(crate) fn apply_sequence_keystream(key: &[u8], checksum: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
    let kseq = hmac_md5(key, &[ZERO_SALT.as_slice()])?;
    let kseq = hmac_md5(&kseq, &[&checksum[..ARCFOUR_CHECKSUM_SIZE.min(checksum.len())]])?;

    Ok(Rc4::new(&kseq).process(data))
}

/// Kcrypt = HMAC(HMAC(K ^ 0xF0, 0), seq_number as big-endian).
pub(crate) fn apply_data_keystream(key: &[u8], sequence_number: u32, data: &[u8]) -> CryptoResult<Vec<u8>> {
    let klocal: Vec<u8> = key.iter().map(|byte| byte ^ 0xF0).collect();

    let kcrypt = hmac_md5(&klocal, &[ZERO_SALT.as_slice()])?;
    let kcrypt = hmac_md5(&kcrypt, &[sequence_number.to_be_bytes().as_slice()])?;

    Ok(Rc4::new(&kcrypt).process(data))
}
