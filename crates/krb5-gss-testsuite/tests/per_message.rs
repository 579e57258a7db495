use krb5_gss::token::{padding_length, Rfc4121WrapToken};
use krb5_gss::{ContextFlags, EncType, GssErrorKind, MessageProp, ProtocolGeneration, SupplementaryStatus, Token};
use krb5_gss_core::decode;
use krb5_gss_testsuite::{context_pair, context_pair_with};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

fn message(len: usize) -> Vec<u8> {
    (0..=u8::MAX).cycle().take(len).collect()
}

fn lengths(enc_type: EncType) -> [usize; 6] {
    let block_size = enc_type.block_size();
    [0, 1, block_size - 1, block_size, block_size + 1, 1024]
}

#[rstest]
fn wrap_round_trip(
    #[values(
        EncType::DesCbcCrc,
        EncType::DesCbcMd4,
        EncType::DesCbcMd5,
        EncType::Des3CbcSha1Kd,
        EncType::Aes128CtsHmacSha196,
        EncType::Aes256CtsHmacSha196,
        EncType::Aes128CtsHmacSha256128,
        EncType::Aes256CtsHmacSha384192,
        EncType::Rc4Hmac
    )]
    enc_type: EncType,
    #[values(true, false)] confidential: bool,
) {
    let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

    for len in lengths(enc_type) {
        let data = message(len);
        let prop = MessageProp {
            qop: 0,
            confidential,
        };

        let token = initiator.wrap(&data, prop).unwrap();
        let unwrapped = acceptor.unwrap(&token).unwrap();
        assert_eq!(unwrapped.data, data, "{enc_type}, {len} bytes");
        assert_eq!(unwrapped.confidential, confidential);
        assert_eq!(unwrapped.status, SupplementaryStatus::empty());

        let token = acceptor.wrap(&data, prop).unwrap();
        assert_eq!(initiator.unwrap(&token).unwrap().data, data, "{enc_type}, {len} bytes");
    }
}

#[rstest]
fn mic_round_trip(
    #[values(
        EncType::DesCbcCrc,
        EncType::DesCbcMd4,
        EncType::DesCbcMd5,
        EncType::Des3CbcSha1Kd,
        EncType::Aes128CtsHmacSha196,
        EncType::Aes256CtsHmacSha196,
        EncType::Aes128CtsHmacSha256128,
        EncType::Aes256CtsHmacSha384192,
        EncType::Rc4Hmac
    )]
    enc_type: EncType,
) {
    let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

    for len in lengths(enc_type) {
        let data = message(len);

        let token = initiator.get_mic(&data, 0).unwrap();
        assert_eq!(acceptor.verify_mic(&token, &data).unwrap(), SupplementaryStatus::empty());

        let token = acceptor.get_mic(&data, 0).unwrap();
        initiator.verify_mic(&token, &data).unwrap();
    }
}

#[rstest]
#[case(EncType::Aes128CtsHmacSha196)]
#[case(EncType::Aes256CtsHmacSha384192)]
fn rfc4121_sequence_numbers_are_consecutive(#[case] enc_type: EncType) {
    let (initiator, _) = context_pair(enc_type, ContextFlags::default());

    for expected in 0..16u64 {
        let token = initiator.wrap(b"payload", MessageProp::default()).unwrap();
        let Token::Rfc4121Wrap(Rfc4121WrapToken { header, .. }) = decode::<Token>(&token).unwrap() else {
            panic!("not an RFC 4121 Wrap token");
        };
        assert_eq!(header.sequence_number, expected);
    }
}

#[rstest]
#[case(EncType::DesCbcMd5)]
#[case(EncType::Des3CbcSha1Kd)]
#[case(EncType::Rc4Hmac)]
fn legacy_sequence_numbers_are_consecutive(#[case] enc_type: EncType) {
    let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

    for expected in 1..=16 {
        let token = initiator.wrap(b"payload", MessageProp::default()).unwrap();
        let unwrapped = acceptor.unwrap(&token).unwrap();

        assert_eq!(unwrapped.status, SupplementaryStatus::empty());
        assert_eq!(acceptor.expected_peer_sequence(), expected);
    }
    assert_eq!(initiator.local_sequence(), 16);
}

#[test]
fn sequence_number_wraps_around() {
    let (initiator, acceptor) = context_pair_with(EncType::Aes128CtsHmacSha196, ContextFlags::default(), u32::MAX, 0);

    for _ in 0..3 {
        let token = initiator.get_mic(b"data", 0).unwrap();
        assert_eq!(acceptor.verify_mic(&token, b"data").unwrap(), SupplementaryStatus::empty());
    }
    assert_eq!(initiator.local_sequence(), 2);
}

#[rstest]
fn replayed_tokens_are_rejected(
    #[values(
        EncType::DesCbcCrc,
        EncType::DesCbcMd4,
        EncType::DesCbcMd5,
        EncType::Des3CbcSha1Kd,
        EncType::Aes128CtsHmacSha196,
        EncType::Aes256CtsHmacSha196,
        EncType::Aes128CtsHmacSha256128,
        EncType::Aes256CtsHmacSha384192,
        EncType::Rc4Hmac
    )]
    enc_type: EncType,
) {
    let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

    let wrap = initiator.wrap(b"once", MessageProp::default()).unwrap();
    acceptor.unwrap(&wrap).unwrap();
    let error = acceptor.unwrap(&wrap).unwrap_err();
    assert!(matches!(error.kind(), GssErrorKind::BadMic), "{enc_type}: {error}");

    let mic = initiator.get_mic(b"once", 0).unwrap();
    acceptor.verify_mic(&mic, b"once").unwrap();
    let error = acceptor.verify_mic(&mic, b"once").unwrap_err();
    assert!(matches!(error.kind(), GssErrorKind::BadMic), "{enc_type}: {error}");
}

#[test]
fn replay_is_reported_when_only_sequencing_is_on() {
    let flags = ContextFlags::SEQUENCE_DETECT | ContextFlags::CONFIDENTIALITY | ContextFlags::INTEGRITY;
    let (initiator, acceptor) = context_pair(EncType::Aes256CtsHmacSha196, flags);

    let first = initiator.get_mic(b"a", 0).unwrap();
    assert_eq!(acceptor.verify_mic(&first, b"a").unwrap(), SupplementaryStatus::empty());
    assert_eq!(
        acceptor.verify_mic(&first, b"a").unwrap(),
        SupplementaryStatus::DUPLICATE_TOKEN
    );
}

#[test]
fn tokens_outside_the_window_are_old() {
    let flags = ContextFlags::SEQUENCE_DETECT | ContextFlags::INTEGRITY;
    let (initiator, acceptor) = context_pair(EncType::Aes128CtsHmacSha256128, flags);

    let stale = initiator.get_mic(b"stale", 0).unwrap();
    let mut last = Vec::new();
    for _ in 0..100 {
        last = initiator.get_mic(b"fresh", 0).unwrap();
    }

    assert_eq!(acceptor.verify_mic(&last, b"fresh").unwrap(), SupplementaryStatus::GAP_TOKEN);
    assert_eq!(acceptor.verify_mic(&stale, b"stale").unwrap(), SupplementaryStatus::OLD_TOKEN);
}

#[rstest]
#[case(EncType::DesCbcMd5)]
#[case(EncType::Des3CbcSha1Kd)]
#[case(EncType::Rc4Hmac)]
fn legacy_padding(#[case] enc_type: EncType) {
    let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

    for len in 1..=16 {
        let data = message(len);
        let token = initiator.wrap(&data, MessageProp::integrity_only()).unwrap();

        let expected_pad = if enc_type == EncType::Rc4Hmac { 1 } else { 8 - len % 8 };
        assert_eq!(padding_length(enc_type, len), expected_pad);

        // Integrity-only payloads end with the clear padding.
        let pad = &token[token.len() - expected_pad..];
        assert!(pad.iter().all(|&byte| usize::from(byte) == expected_pad), "{enc_type}, {len} bytes");

        assert_eq!(acceptor.unwrap(&token).unwrap().data.len(), len);
    }
}

#[test]
fn aes128_hello_layout() {
    let (initiator, acceptor) = context_pair(EncType::Aes128CtsHmacSha196, ContextFlags::default());

    let token = initiator.wrap(b"hello", MessageProp::confidential()).unwrap();

    assert_eq!(token.len(), 16 + (16 + 5 + 16) + 12);
    assert_eq!(&token[..2], [0x05, 0x04]);
    assert_eq!(acceptor.unwrap(&token).unwrap().data, b"hello");
}

#[test]
fn tokens_do_not_cross_generations() {
    let (legacy, _) = context_pair(EncType::Des3CbcSha1Kd, ContextFlags::default());
    let (_, modern) = context_pair(EncType::Aes128CtsHmacSha196, ContextFlags::default());

    let token = legacy.wrap(b"data", MessageProp::default()).unwrap();
    assert_eq!(decode::<Token>(&token).unwrap().generation(), ProtocolGeneration::Legacy);

    let error = modern.unwrap(&token).unwrap_err();
    assert!(matches!(error.kind(), GssErrorKind::DefectiveToken));
}

#[test]
fn concurrent_senders_use_distinct_sequence_numbers() {
    let (initiator, acceptor) = context_pair(EncType::Aes256CtsHmacSha196, ContextFlags::SEQUENCE_DETECT);

    let tokens: Vec<Vec<u8>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| (0..25).map(|_| initiator.get_mic(b"shared", 0).unwrap()).collect::<Vec<_>>()))
            .collect();

        handles.into_iter().flat_map(|handle| handle.join().unwrap()).collect()
    });

    let mut numbers: Vec<u64> = tokens
        .iter()
        .map(|token| match decode::<Token>(token).unwrap() {
            Token::Rfc4121Mic(mic) => mic.header.sequence_number,
            other => panic!("unexpected token {other:?}"),
        })
        .collect();
    numbers.sort_unstable();
    assert_eq!(numbers, (0..100).collect::<Vec<u64>>());

    for token in &tokens {
        acceptor.verify_mic(token, b"shared").unwrap();
    }
}

proptest! {
    #[test]
    fn size_limit_bounds_the_token(
        enc_type in prop::sample::select(EncType::ALL.to_vec()),
        max in 128usize..4096,
        confidential in any::<bool>(),
    ) {
        let (initiator, _) = context_pair(enc_type, ContextFlags::default());

        let limit = initiator.get_size_limit(0, confidential, max).unwrap();
        let prop = MessageProp { qop: 0, confidential };
        let token = initiator.wrap(&vec![0xA5; limit], prop).unwrap();

        prop_assert!(token.len() <= max, "{} > {}", token.len(), max);
    }

    #[test]
    fn round_trip_any_message(
        enc_type in prop::sample::select(EncType::ALL.to_vec()),
        data in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let (initiator, acceptor) = context_pair(enc_type, ContextFlags::default());

        let token = initiator.wrap(&data, MessageProp::default()).unwrap();
        prop_assert_eq!(acceptor.unwrap(&token).unwrap().data, data);
    }
}
