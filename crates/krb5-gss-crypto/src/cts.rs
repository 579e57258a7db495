//! AES in CBC mode with ciphertext stealing, as profiled by
//! [RFC 3962 §5](https://www.rfc-editor.org/rfc/rfc3962#section-5): the last two blocks are always swapped.
//!
//! Runs on a standard CBC interface with a zero IV: zero-pad to whole blocks, encrypt, swap the
//! last two blocks, truncate to the input length.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use picky_krb::crypto::aes::swap_two_last_blocks;

use crate::{CryptoError, CryptoResult};

pub(crate) const AES_BLOCK_SIZE: usize = 16;

const ZERO_IV: [u8; AES_BLOCK_SIZE] = [0; AES_BLOCK_SIZE];

fn key_length_error(key: &[u8]) -> CryptoError {
    CryptoError::KeyLength {
        got: key.len(),
        expected: if key.len() < 32 { 16 } else { 32 },
    }
}

fn cbc_encrypt<E: KeyIvInit + BlockEncryptMut>(key: &[u8], data: &mut [u8]) -> CryptoResult<()> {
    let len = data.len();

    E::new_from_slices(key, &ZERO_IV)
        .map_err(|_| key_length_error(key))?
        .encrypt_padded_mut::<NoPadding>(data, len)
        .map_err(|_| CryptoError::BlockAlignment(len))?;

    Ok(())
}

fn cbc_decrypt<D: KeyIvInit + BlockDecryptMut>(key: &[u8], data: &mut [u8]) -> CryptoResult<()> {
    let len = data.len();

    D::new_from_slices(key, &ZERO_IV)
        .map_err(|_| key_length_error(key))?
        .decrypt_padded_mut::<NoPadding>(data)
        .map_err(|_| CryptoError::BlockAlignment(len))?;

    Ok(())
}

fn encrypt_blocks(key: &[u8], data: &mut [u8]) -> CryptoResult<()> {
    match key.len() {
        16 => cbc_encrypt::<cbc::Encryptor<Aes128>>(key, data),
        32 => cbc_encrypt::<cbc::Encryptor<Aes256>>(key, data),
        _ => Err(key_length_error(key)),
    }
}

fn decrypt_blocks(key: &[u8], data: &mut [u8]) -> CryptoResult<()> {
    match key.len() {
        16 => cbc_decrypt::<cbc::Decryptor<Aes128>>(key, data),
        32 => cbc_decrypt::<cbc::Decryptor<Aes256>>(key, data),
        _ => Err(key_length_error(key)),
    }
}

fn ensure_one_block(len: usize) -> CryptoResult<()> {
    if len < AES_BLOCK_SIZE {
        return Err(CryptoError::CipherLength {
            got: len,
            min: AES_BLOCK_SIZE,
        });
    }

    Ok(())
}

pub(crate) fn encrypt(key: &[u8], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let len = plaintext.len();
    ensure_one_block(len)?;

    let mut out = plaintext.to_vec();
    out.resize(len.next_multiple_of(AES_BLOCK_SIZE), 0);

    encrypt_blocks(key, &mut out)?;

    if out.len() >= 2 * AES_BLOCK_SIZE {
        swap_two_last_blocks(&mut out)?;
    }

    out.truncate(len);

    Ok(out)
}

pub(crate) fn decrypt(key: &[u8], ciphertext: &[u8]) -> CryptoResult<Vec<u8>> {
    let len = ciphertext.len();
    ensure_one_block(len)?;

    let mut data = ciphertext.to_vec();

    if len == AES_BLOCK_SIZE {
        decrypt_blocks(key, &mut data)?;
        return Ok(data);
    }

    let stolen = len.next_multiple_of(AES_BLOCK_SIZE) - len;

    if stolen != 0 {
        // the bytes missing from the penultimate cipher block end D(Cn)
        let last_start = len + stolen - 2 * AES_BLOCK_SIZE;
        let mut last = ciphertext[last_start..last_start + AES_BLOCK_SIZE].to_vec();
        decrypt_blocks(key, &mut last)?;
        data.extend_from_slice(&last[AES_BLOCK_SIZE - stolen..]);
    }

    swap_two_last_blocks(&mut data)?;
    decrypt_blocks(key, &mut data)?;

    data.truncate(len);

    Ok(data)
}

#[cfg(test)]
mod tests {
    use hex_literal::hex;
    use rstest::rstest;

    use super::*;

    const KEY: [u8; 16] = hex!("636869636b656e207465726979616b69");
    const INPUT: &[u8] = b"I would like the General Gau's Chicken, please, and wonton soup.";

    // RFC 3962 Appendix B
    #[rstest]
    #[case(17, &hex!("c6353568f2bf8cb4d8a580362da7ff7f97"))]
    #[case(31, &hex!("fc00783e0efdb2c1d445d4c8eff7ed2297687268d6ecccc0c07b25e25ecfe5"))]
    #[case(32, &hex!("39312523a78662d5be7fcbcc98ebf5a897687268d6ecccc0c07b25e25ecfe584"))]
    #[case(47, &hex!("97687268d6ecccc0c07b25e25ecfe584b3fffd940c16a18c1b5549d2f838029e39312523a78662d5be7fcbcc98ebf5"))]
    #[case(48, &hex!("97687268d6ecccc0c07b25e25ecfe5849dad8bbb96c4cdc03bc103e1a194bbd839312523a78662d5be7fcbcc98ebf5a8"))]
    #[case(64, &hex!("97687268d6ecccc0c07b25e25ecfe58439312523a78662d5be7fcbcc98ebf5a84807efe836ee89a526730dbc2f7bc8409dad8bbb96c4cdc03bc103e1a194bbd8"))]
    fn rfc3962_vectors(#[case] len: usize, #[case] expected: &[u8]) {
        let encrypted = encrypt(&KEY, &INPUT[..len]).unwrap();
        assert_eq!(encrypted, expected);

        let decrypted = decrypt(&KEY, &encrypted).unwrap();
        assert_eq!(decrypted, &INPUT[..len]);
    }

    #[test]
    fn single_block_is_plain_cbc() {
        let encrypted = encrypt(&KEY, &INPUT[..16]).unwrap();
        assert_eq!(decrypt(&KEY, &encrypted).unwrap(), &INPUT[..16]);
    }

    #[test]
    fn short_input_is_rejected() {
        assert_eq!(encrypt(&KEY, b"short"), Err(CryptoError::CipherLength { got: 5, min: 16 }));
        assert_eq!(decrypt(&KEY, b"short"), Err(CryptoError::CipherLength { got: 5, min: 16 }));
    }

    #[test]
    fn key_length_is_checked() {
        assert_eq!(
            encrypt(&[0; 24], &INPUT[..20]),
            Err(CryptoError::KeyLength { got: 24, expected: 16 })
        );
    }
}
