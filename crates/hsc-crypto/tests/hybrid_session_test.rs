//! End-to-end tests for the hybrid session: key pair generation, session-key
//! wrapping, file encryption and decryption through real files on disk.

use hsc_core::{HscError, PaddingPolicy};
use hsc_crypto::{
    generate_keypair, unwrap_key, wrap_key, CodecOptions, FileCodec, HybridSession, PaddingStatus,
    RsaKeyPair, SerpentCipher, SessionKey, SessionOptions, WrappedKey,
};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tempfile::TempDir;

const SIXTY_BYTES: &[u8] = b"Hybrid RSA + Serpent session test: sixty bytes of plaintext.";

fn keypair_1024() -> &'static RsaKeyPair {
    static KEY: OnceLock<RsaKeyPair> = OnceLock::new();
    KEY.get_or_init(|| {
        generate_keypair(1024, &mut StdRng::seed_from_u64(1024)).expect("1024-bit keygen")
    })
}

fn session_with(padding: PaddingPolicy) -> HybridSession {
    let options = SessionOptions {
        session_bits: 256,
        codec: CodecOptions {
            padding,
            parallel: false,
        },
    };
    HybridSession::new(keypair_1024().clone(), options).expect("valid session")
}

fn write_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write test file");
    path
}

#[test]
fn key_exchange_then_file_roundtrip() {
    assert_eq!(SIXTY_BYTES.len(), 60);
    let tmp = TempDir::new().unwrap();
    let keypair = keypair_1024();
    assert!((1023..=1025).contains(&keypair.modulus_bits()));

    let mut rng = StdRng::seed_from_u64(60);
    let k = SessionKey::generate(256, &mut rng).unwrap();
    let recovered = unwrap_key(keypair, &wrap_key(keypair, &k).unwrap()).unwrap();
    assert_eq!(recovered, k);

    let cipher = SerpentCipher::with_key(recovered.as_integer());
    let codec = FileCodec::new(&cipher, CodecOptions::default());

    let src = write_test_file(tmp.path(), "plain.txt", SIXTY_BYTES);
    let enc = tmp.path().join("after_encrypt.serpent");
    let dec = tmp.path().join("after_decrypt.txt");

    let report = codec.encrypt_file(&src, &enc).unwrap();
    assert_eq!(report.bytes_written, 64);
    assert_eq!(std::fs::metadata(&enc).unwrap().len(), 64);

    codec.decrypt_file(&enc, &dec).unwrap();
    assert_eq!(std::fs::read(&dec).unwrap(), SIXTY_BYTES);
}

#[test]
fn hybrid_session_file_roundtrip_with_persisted_keys() {
    let tmp = TempDir::new().unwrap();
    let key_path = tmp.path().join("rsa_keypair.txt");
    let wrapped_path = tmp.path().join("session.key");

    let sender = session_with(PaddingPolicy::Strict);
    sender.keypair().save(&key_path).unwrap();

    let src = write_test_file(tmp.path(), "plain.txt", SIXTY_BYTES);
    let enc = tmp.path().join("plain.txt.serpent");
    let mut rng = StdRng::seed_from_u64(61);
    let sealed = sender.encrypt_file(&src, &enc, &mut rng).unwrap();
    sealed.wrapped_key.save(&wrapped_path).unwrap();
    assert_eq!(sealed.report.padding, PaddingStatus::Added(4));

    // receiver side: everything comes from disk
    let receiver = HybridSession::new(
        RsaKeyPair::load(&key_path).unwrap(),
        SessionOptions::default(),
    )
    .unwrap();
    let wrapped = WrappedKey::load(&wrapped_path).unwrap();
    let dec = tmp.path().join("plain.out.txt");
    let report = receiver.decrypt_file(&wrapped, &enc, &dec).unwrap();

    assert_eq!(report.bytes_written, 60);
    assert_eq!(report.padding, PaddingStatus::Stripped(4));
    assert_eq!(std::fs::read(&dec).unwrap(), SIXTY_BYTES);
}

#[test]
fn malformed_ciphertext_length_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let session = session_with(PaddingPolicy::Strict);
    let mut rng = StdRng::seed_from_u64(62);
    let (_, wrapped) = session.seal_session_key(&mut rng).unwrap();

    let bad = write_test_file(tmp.path(), "bad.serpent", &[0xA5u8; 17]);
    let out = tmp.path().join("bad.out");

    for padding in [PaddingPolicy::Strict, PaddingPolicy::Lenient] {
        let err = session_with(padding)
            .decrypt_file(&wrapped, &bad, &out)
            .unwrap_err();
        assert!(matches!(err, HscError::MalformedInput(_)), "{padding:?}: {err}");
        assert!(!out.exists());
    }
}

#[test]
fn empty_file_roundtrip_and_empty_ciphertext() {
    let tmp = TempDir::new().unwrap();
    let session = session_with(PaddingPolicy::Strict);
    let mut rng = StdRng::seed_from_u64(63);

    let src = write_test_file(tmp.path(), "empty.txt", b"");
    let enc = tmp.path().join("empty.serpent");
    let dec = tmp.path().join("empty.out");
    let sealed = session.encrypt_file(&src, &enc, &mut rng).unwrap();
    assert_eq!(std::fs::metadata(&enc).unwrap().len(), 16);
    session.decrypt_file(&sealed.wrapped_key, &enc, &dec).unwrap();
    assert!(std::fs::read(&dec).unwrap().is_empty());

    // a zero-length ciphertext has no padding block at all
    let empty_ct = write_test_file(tmp.path(), "zero.serpent", b"");
    let zero_out = tmp.path().join("zero.out");
    assert!(matches!(
        session.decrypt_file(&sealed.wrapped_key, &empty_ct, &zero_out),
        Err(HscError::MalformedInput(_))
    ));
    let report = session_with(PaddingPolicy::Lenient)
        .decrypt_file(&sealed.wrapped_key, &empty_ct, &zero_out)
        .unwrap();
    assert_eq!(report.padding, PaddingStatus::Empty);
    assert_eq!(std::fs::metadata(&zero_out).unwrap().len(), 0);
}

#[test]
fn lenient_keeps_untruncated_output_on_bad_padding() {
    let tmp = TempDir::new().unwrap();
    let key = BigUint::from(0xC0FF_EEu32);
    let cipher = SerpentCipher::with_key(&key);

    // a single raw block whose final byte (0x40) is not a valid pad length
    let block = cipher.encrypt_block([0, 0, 0, 0x4000_0000]).unwrap();
    let ct: Vec<u8> = block.iter().flat_map(|w| w.to_le_bytes()).collect();
    let enc = write_test_file(tmp.path(), "odd.serpent", &ct);
    let out = tmp.path().join("odd.out");

    let strict = FileCodec::new(&cipher, CodecOptions::default());
    assert!(matches!(
        strict.decrypt_file(&enc, &out),
        Err(HscError::PaddingAnomaly(0x40))
    ));
    assert!(!out.exists());

    let lenient = FileCodec::new(
        &cipher,
        CodecOptions {
            padding: PaddingPolicy::Lenient,
            parallel: false,
        },
    );
    let report = lenient.decrypt_file(&enc, &out).unwrap();
    assert_eq!(report.padding, PaddingStatus::Anomalous(0x40));
    let written = std::fs::read(&out).unwrap();
    assert_eq!(written.len(), 16);
    assert_eq!(written[15], 0x40);
}

#[test]
fn parallel_session_matches_sequential_output() {
    let tmp = TempDir::new().unwrap();
    let content: Vec<u8> = (0..100_000u32).map(|i| (i.wrapping_mul(31) >> 3) as u8).collect();
    let src = write_test_file(tmp.path(), "big.bin", &content);

    let key = SessionKey::generate(256, &mut StdRng::seed_from_u64(64)).unwrap();
    let cipher = SerpentCipher::with_key(key.as_integer());
    let seq_out = tmp.path().join("seq.serpent");
    let par_out = tmp.path().join("par.serpent");

    FileCodec::new(&cipher, CodecOptions::default())
        .encrypt_file(&src, &seq_out)
        .unwrap();
    FileCodec::new(
        &cipher,
        CodecOptions {
            padding: PaddingPolicy::Strict,
            parallel: true,
        },
    )
    .encrypt_file(&src, &par_out)
    .unwrap();

    assert_eq!(
        std::fs::read(&seq_out).unwrap(),
        std::fs::read(&par_out).unwrap()
    );
}
