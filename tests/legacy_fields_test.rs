//! Integration tests for reading PHI fields written with or without an
//! explicit "encrypted" flag

use phiscribe::crypto::{
    looks_encrypted, protect, read_protected, BlobCodec, EncryptionKey, FieldCipher,
    ProtectedField, RevealOrigin,
};
use phiscribe::domain::CryptoError;

fn codec() -> FieldCipher {
    FieldCipher::new(&EncryptionKey::generate())
}

#[test]
fn test_flagged_field_roundtrip() {
    let codec = codec();
    let field = protect(&codec, "Therapist: patient reports anxiety").unwrap();
    assert_eq!(field.encrypted, Some(true));

    let revealed = read_protected(&codec, &field).unwrap();
    assert_eq!(revealed.text, "Therapist: patient reports anxiety");
    assert_eq!(revealed.origin, RevealOrigin::Decrypted);
}

#[test]
fn test_flagged_field_hard_fails_with_wrong_key() {
    let field = protect(&codec(), "x".repeat(200).as_str()).unwrap();
    assert_eq!(
        read_protected(&codec(), &field),
        Err(CryptoError::AuthenticationFailed)
    );
}

#[test]
fn test_legacy_plaintext_transcript() {
    let transcript = "Therapist: How have you been sleeping?\nClient: Not well.";
    assert!(!looks_encrypted(transcript));

    let revealed = read_protected(&codec(), &ProtectedField::legacy(transcript)).unwrap();
    assert_eq!(revealed.text, transcript);
    assert_eq!(revealed.origin, RevealOrigin::Plaintext);
}

#[test]
fn test_legacy_ciphertext_is_decrypted_with_audit_origin() {
    let codec = codec();
    let plaintext = "a long note that will produce a blob comfortably above one hundred characters once encrypted";
    let blob = codec.encrypt(plaintext).unwrap();
    assert!(looks_encrypted(&blob));

    let revealed = read_protected(&codec, &ProtectedField::legacy(blob)).unwrap();
    assert_eq!(revealed.text, plaintext);
    assert_eq!(revealed.origin, RevealOrigin::HeuristicDecrypted);
}

#[test]
fn test_legacy_base64_shaped_plaintext_falls_back() {
    // Looks like ciphertext, is not
    let value = "QmFzZTY0U2hhcGVkUGxhaW50ZXh0".repeat(5);
    assert!(looks_encrypted(&value));

    let revealed = read_protected(&codec(), &ProtectedField::legacy(value.clone())).unwrap();
    assert_eq!(revealed.text, value);
    assert_eq!(revealed.origin, RevealOrigin::HeuristicPlaintextFallback);
}

#[test]
fn test_legacy_read_with_unconfigured_codec_propagates() {
    let blob = codec().encrypt(&"y".repeat(120)).unwrap();
    assert_eq!(
        read_protected(&FieldCipher::unconfigured(), &ProtectedField::legacy(blob)),
        Err(CryptoError::NotConfigured)
    );
}
