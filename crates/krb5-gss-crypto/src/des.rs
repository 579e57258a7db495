//! Single DES, as used by RFC 1964 tokens: DES-MAC-MD5 signatures and DES-CBC sealing.

use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};

use crate::{CryptoError, CryptoResult};

pub(crate) const DES_BLOCK_SIZE: usize = 8;
pub(crate) const DES_KEY_SIZE: usize = 8;

pub(crate) const ZERO_IV: [u8; DES_BLOCK_SIZE] = [0; DES_BLOCK_SIZE];

macro_rules! cbc_mode {
    ($encrypt:ident, $decrypt:ident, $cipher:ty, $key_size:expr) => {
        pub(crate) fn $encrypt(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
            ensure_block_aligned(data)?;

            let mut buf = data.to_vec();
            let len = buf.len();

            cbc::Encryptor::<$cipher>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::KeyLength {
                    got: key.len(),
                    expected: $key_size,
                })?
                .encrypt_padded_mut::<NoPadding>(&mut buf, len)
                .map_err(|_| CryptoError::BlockAlignment(len))?;

            Ok(buf)
        }

        pub(crate) fn $decrypt(key: &[u8], iv: &[u8], data: &[u8]) -> CryptoResult<Vec<u8>> {
            ensure_block_aligned(data)?;

            let mut buf = data.to_vec();

            cbc::Decryptor::<$cipher>::new_from_slices(key, iv)
                .map_err(|_| CryptoError::KeyLength {
                    got: key.len(),
                    expected: $key_size,
                })?
                .decrypt_padded_mut::<NoPadding>(&mut buf)
                .map_err(|_| CryptoError::BlockAlignment(data.len()))?;

            Ok(buf)
        }
    };
}

cbc_mode!(des_cbc_encrypt, des_cbc_decrypt, ::des::Des, DES_KEY_SIZE);
cbc_mode!(des3_cbc_encrypt, des3_cbc_decrypt, ::des::TdesEde3, crate::des3::DES3_KEY_SIZE);

fn ensure_block_aligned(data: &[u8]) -> CryptoResult<()> {
    if data.len() % DES_BLOCK_SIZE != 0 {
        return Err(CryptoError::BlockAlignment(data.len()));
    }

    Ok(())
}

/// Key used for DES sealing: every byte XOR-ed with 0xF0 ([RFC 1964 §1.2.2](https://www.rfc-editor.org/rfc/rfc1964#section-1.2.2)).
pub fn des_encryption_key(key: &[u8]) -> Vec<u8> {
    key.iter().map(|byte| byte ^ 0xF0).collect()
}

/// DES-MAC-MD5: MD5 over the parts, DES-CBC with a zero IV over the digest, last block kept.
pub(crate) fn mac_md5(key: &[u8], parts: &[&[u8]]) -> CryptoResult<Vec<u8>> {
    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part);
    }
    let digest = hasher.finalize();

    let encrypted = des_cbc_encrypt(key, &ZERO_IV, &digest)?;

    Ok(encrypted[encrypted.len() - DES_BLOCK_SIZE..].to_vec())
}
