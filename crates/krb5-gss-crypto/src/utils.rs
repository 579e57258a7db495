use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha256, Sha384};

use crate::{CryptoError, CryptoResult};

macro_rules! hmac_over_parts {
    ($name:ident, $digest:ty) => {
        pub(crate) fn $name(key: &[u8], parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
            let mut mac = Hmac::<$digest>::new_from_slice(key).map_err(|_| CryptoError::HmacKey)?;

            for part in parts {
                mac.update(part);
            }

            Ok(mac.finalize().into_bytes().to_vec())
        }
    };
}

hmac_over_parts!(hmac_sha1, Sha1);
hmac_over_parts!(hmac_md5, Md5);
hmac_over_parts!(hmac_sha256, Sha256);
hmac_over_parts!(hmac_sha384, Sha384);

/// Compares two byte strings without an early exit on the first difference.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub(crate) fn ensure_key_length(key: &[u8], expected: usize) -> CryptoResult<()> {
    if key.len() != expected {
        return Err(CryptoError::KeyLength {
            got: key.len(),
            expected,
        });
    }

    Ok(())
}
