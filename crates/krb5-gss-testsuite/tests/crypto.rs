use hex_literal::hex;
use krb5_gss_crypto::key_usage::{rfc4121_usage, KG_USAGE_SIGN, KG_USAGE_SIGN_MS};
use krb5_gss_crypto::{des_encryption_key, CipherSuite, EncType, ProtocolGeneration};
use proptest::prelude::*;
use rstest::rstest;

proptest! {
    #[test]
    fn des_encryption_key_flips_high_nibbles(key in any::<[u8; 8]>()) {
        let transformed = des_encryption_key(&key);

        prop_assert_eq!(transformed.len(), 8);
        for (original, transformed) in key.iter().zip(&transformed) {
            prop_assert_eq!(*transformed, original ^ 0xF0);
        }
    }
}

#[test]
fn des_encryption_key_vector() {
    assert_eq!(
        des_encryption_key(&hex!("0123456789abcdef")),
        hex!("f1d3b59779 5b3d1f").to_vec()
    );
}

#[rstest]
#[case(false, false, 25)]
#[case(false, true, 24)]
#[case(true, false, 23)]
#[case(true, true, 22)]
fn rfc4121_key_usages(#[case] sent_by_acceptor: bool, #[case] seal: bool, #[case] expected: i32) {
    assert_eq!(rfc4121_usage(sent_by_acceptor, seal), expected);
}

#[rstest]
#[case(EncType::Rc4Hmac, true, KG_USAGE_SIGN_MS)]
#[case(EncType::Rc4Hmac, false, KG_USAGE_SIGN)]
#[case(EncType::Des3CbcSha1Kd, true, KG_USAGE_SIGN)]
#[case(EncType::DesCbcMd5, true, KG_USAGE_SIGN)]
fn legacy_sign_usages(#[case] enc_type: EncType, #[case] mic: bool, #[case] expected: i32) {
    let suite = CipherSuite::new(enc_type, &vec![0x11; enc_type.key_length()]).unwrap();
    assert_eq!(suite.legacy_sign_usage(mic), expected);
}

#[test]
fn enc_type_table() {
    let legacy: Vec<i32> = EncType::ALL
        .iter()
        .filter(|enc_type| enc_type.generation() == ProtocolGeneration::Legacy)
        .map(|enc_type| enc_type.as_raw())
        .collect();

    assert_eq!(legacy, [1, 2, 3, 16, 23]);
    assert!(EncType::from_raw(24).is_err());
}
