use core::fmt;

use crate::{CryptoError, CryptoResult};

/// Token format family an enc-type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolGeneration {
    /// RFC 1964 tokens (DES, DES3, RC4-HMAC).
    Legacy,
    /// RFC 4121 tokens (AES families).
    Rfc4121,
}

/// RFC 1964 SGN_ALG values, as they appear on the wire (big-endian).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignAlgorithm {
    DesMacMd5 = 0x0000,
    DesMac = 0x0200,
    HmacSha1Des3Kd = 0x0400,
    HmacMd5Arcfour = 0x1100,
}

impl SignAlgorithm {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::DesMacMd5),
            0x0200 => Some(Self::DesMac),
            0x0400 => Some(Self::HmacSha1Des3Kd),
            0x1100 => Some(Self::HmacMd5Arcfour),
            _ => None,
        }
    }

    /// Length of the SGN_CKSUM field this algorithm produces.
    pub fn checksum_length(self) -> usize {
        match self {
            Self::DesMacMd5 | Self::DesMac | Self::HmacMd5Arcfour => 8,
            Self::HmacSha1Des3Kd => 20,
        }
    }
}

/// RFC 1964 SEAL_ALG values, as they appear on the wire (big-endian).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SealAlgorithm {
    Des = 0x0000,
    Des3Kd = 0x0200,
    Arcfour = 0x1000,
    None = 0xFFFF,
}

impl SealAlgorithm {
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0000 => Some(Self::Des),
            0x0200 => Some(Self::Des3Kd),
            0x1000 => Some(Self::Arcfour),
            0xFFFF => Some(Self::None),
            _ => None,
        }
    }
}

/// Kerberos encryption type of the negotiated context key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncType {
    DesCbcCrc,
    DesCbcMd4,
    DesCbcMd5,
    Des3CbcSha1Kd,
    Aes128CtsHmacSha196,
    Aes256CtsHmacSha196,
    Aes128CtsHmacSha256128,
    Aes256CtsHmacSha384192,
    Rc4Hmac,
}

impl EncType {
    pub const ALL: [EncType; 9] = [
        EncType::DesCbcCrc,
        EncType::DesCbcMd4,
        EncType::DesCbcMd5,
        EncType::Des3CbcSha1Kd,
        EncType::Aes128CtsHmacSha196,
        EncType::Aes256CtsHmacSha196,
        EncType::Aes128CtsHmacSha256128,
        EncType::Aes256CtsHmacSha384192,
        EncType::Rc4Hmac,
    ];

    pub fn from_raw(value: i32) -> CryptoResult<Self> {
        match value {
            1 => Ok(Self::DesCbcCrc),
            2 => Ok(Self::DesCbcMd4),
            3 => Ok(Self::DesCbcMd5),
            16 => Ok(Self::Des3CbcSha1Kd),
            17 => Ok(Self::Aes128CtsHmacSha196),
            18 => Ok(Self::Aes256CtsHmacSha196),
            19 => Ok(Self::Aes128CtsHmacSha256128),
            20 => Ok(Self::Aes256CtsHmacSha384192),
            23 => Ok(Self::Rc4Hmac),
            _ => Err(CryptoError::UnsupportedEncType(value)),
        }
    }

    pub fn as_raw(self) -> i32 {
        match self {
            Self::DesCbcCrc => 1,
            Self::DesCbcMd4 => 2,
            Self::DesCbcMd5 => 3,
            Self::Des3CbcSha1Kd => 16,
            Self::Aes128CtsHmacSha196 => 17,
            Self::Aes256CtsHmacSha196 => 18,
            Self::Aes128CtsHmacSha256128 => 19,
            Self::Aes256CtsHmacSha384192 => 20,
            Self::Rc4Hmac => 23,
        }
    }

    pub fn generation(self) -> ProtocolGeneration {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 | Self::Des3CbcSha1Kd | Self::Rc4Hmac => {
                ProtocolGeneration::Legacy
            }
            Self::Aes128CtsHmacSha196
            | Self::Aes256CtsHmacSha196
            | Self::Aes128CtsHmacSha256128
            | Self::Aes256CtsHmacSha384192 => ProtocolGeneration::Rfc4121,
        }
    }

    /// Protocol key length in bytes.
    pub fn key_length(self) -> usize {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 => 8,
            Self::Des3CbcSha1Kd => 24,
            Self::Aes128CtsHmacSha196 | Self::Aes128CtsHmacSha256128 | Self::Rc4Hmac => 16,
            Self::Aes256CtsHmacSha196 | Self::Aes256CtsHmacSha384192 => 32,
        }
    }

    /// Length of the per-message token checksum.
    pub fn checksum_length(self) -> usize {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 | Self::Rc4Hmac => 8,
            Self::Des3CbcSha1Kd => 20,
            Self::Aes128CtsHmacSha196 | Self::Aes256CtsHmacSha196 => 12,
            Self::Aes128CtsHmacSha256128 => 16,
            Self::Aes256CtsHmacSha384192 => 24,
        }
    }

    pub fn confounder_size(self) -> usize {
        match self.generation() {
            ProtocolGeneration::Legacy => 8,
            ProtocolGeneration::Rfc4121 => 16,
        }
    }

    /// Cipher block size. RC4 reports 1 since it is a stream cipher.
    pub fn block_size(self) -> usize {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 | Self::Des3CbcSha1Kd => 8,
            Self::Rc4Hmac => 1,
            Self::Aes128CtsHmacSha196
            | Self::Aes256CtsHmacSha196
            | Self::Aes128CtsHmacSha256128
            | Self::Aes256CtsHmacSha384192 => 16,
        }
    }

    pub fn sign_algorithm(self) -> Option<SignAlgorithm> {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 => Some(SignAlgorithm::DesMacMd5),
            Self::Des3CbcSha1Kd => Some(SignAlgorithm::HmacSha1Des3Kd),
            Self::Rc4Hmac => Some(SignAlgorithm::HmacMd5Arcfour),
            _ => None,
        }
    }

    pub fn seal_algorithm(self) -> Option<SealAlgorithm> {
        match self {
            Self::DesCbcCrc | Self::DesCbcMd4 | Self::DesCbcMd5 => Some(SealAlgorithm::Des),
            Self::Des3CbcSha1Kd => Some(SealAlgorithm::Des3Kd),
            Self::Rc4Hmac => Some(SealAlgorithm::Arcfour),
            _ => None,
        }
    }
}

impl TryFrom<i32> for EncType {
    type Error = CryptoError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::from_raw(value)
    }
}

impl fmt::Display for EncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DesCbcCrc => "des-cbc-crc",
            Self::DesCbcMd4 => "des-cbc-md4",
            Self::DesCbcMd5 => "des-cbc-md5",
            Self::Des3CbcSha1Kd => "des3-cbc-sha1-kd",
            Self::Aes128CtsHmacSha196 => "aes128-cts-hmac-sha1-96",
            Self::Aes256CtsHmacSha196 => "aes256-cts-hmac-sha1-96",
            Self::Aes128CtsHmacSha256128 => "aes128-cts-hmac-sha256-128",
            Self::Aes256CtsHmacSha384192 => "aes256-cts-hmac-sha384-192",
            Self::Rc4Hmac => "rc4-hmac",
        };

        f.write_str(name)
    }
}
