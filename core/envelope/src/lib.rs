//! Sealed transport of the pool's secret state.
//!
//! [`seal`] produces a self-describing ciphertext using a hybrid public-key
//! encryption scheme: an ECDH key-encapsulation step over NIST P-256,
//! followed by an `AES-256-GCM` AEAD step over the plaintext. [`open`]
//! reverses it. [`digest`] hashes the resulting envelope bytes so the
//! Handshake Engine can bind the ciphertext into an attestation's
//! `user_data` field without re-transmitting it.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use p256::{
    ecdh::diffie_hellman, elliptic_curve::sec1::ToEncodedPoint, PublicKey as P256PublicKey,
    SecretKey as P256SecretKey,
};
use rand_core::{OsRng, RngCore};
use sha2::Sha256;
use zeroize::Zeroizing;

/// Errors produced while sealing or opening a [`SecretState`] envelope.
///
/// These map onto the `CryptoError` kind in the protocol's error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    /// The envelope is shorter than the fixed header, or its algorithm id is
    /// unrecognized.
    #[error("malformed envelope: {0}")]
    Malformed(&'static str),
    /// The sender's ephemeral public key embedded in the envelope header is
    /// not a valid P-256 point.
    #[error("invalid sender public key in envelope header")]
    InvalidSenderKey,
    /// AEAD decryption failed: either the key is wrong or the ciphertext (or
    /// its header) was tampered with. Callers MUST abort and zeroize on this
    /// error; it deliberately does not distinguish the two causes.
    #[error("envelope decryption failed")]
    DecryptionFailed,
}

/// Algorithm identifier for the sole supported envelope format. Embedding
/// this in the header lets a future scheme change be recognized instead of
/// silently misparsed.
const ALG_P256_HKDF_SHA256_AES256GCM: u8 = 0x01;

const PUBLIC_KEY_LEN: usize = 65; // SEC1 uncompressed P-256 point
const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 1 + PUBLIC_KEY_LEN + NONCE_LEN;

const HKDF_INFO: &[u8] = b"keysync-envelope-v1";

/// Encrypt `plaintext` to `recipient_public` under the hybrid scheme
/// described in the module docs. Returns self-describing envelope bytes.
pub fn seal(plaintext: &[u8], recipient_public: &P256PublicKey) -> Result<Vec<u8>, EnvelopeError> {
    let sender_secret = P256SecretKey::random(&mut OsRng);
    let sender_public = sender_secret.public_key();

    let shared = diffie_hellman(
        sender_secret.to_nonzero_scalar(),
        recipient_public.as_affine(),
    );
    let aead_key = derive_aead_key(shared.raw_secret_bytes());

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let mut header = Vec::with_capacity(HEADER_LEN);
    header.push(ALG_P256_HKDF_SHA256_AES256GCM);
    header.extend_from_slice(sender_public.to_encoded_point(false).as_bytes());
    header.extend_from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new((&*aead_key).into());
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| EnvelopeError::DecryptionFailed)?;

    let mut envelope = header;
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decapsulate and decrypt `envelope_bytes` using `recipient_secret`.
///
/// Returns a zeroizing buffer: callers should let it drop as soon as they
/// have installed the plaintext into the Secret State Store.
pub fn open(
    envelope_bytes: &[u8],
    recipient_secret: &P256SecretKey,
) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if envelope_bytes.len() < HEADER_LEN {
        return Err(EnvelopeError::Malformed("envelope shorter than header"));
    }
    if envelope_bytes[0] != ALG_P256_HKDF_SHA256_AES256GCM {
        return Err(EnvelopeError::Malformed("unrecognized algorithm id"));
    }

    let header = &envelope_bytes[..HEADER_LEN];
    let sender_pub_bytes = &envelope_bytes[1..1 + PUBLIC_KEY_LEN];
    let nonce_bytes = &envelope_bytes[1 + PUBLIC_KEY_LEN..HEADER_LEN];
    let ciphertext = &envelope_bytes[HEADER_LEN..];

    let sender_public =
        P256PublicKey::from_sec1_bytes(sender_pub_bytes).map_err(|_| EnvelopeError::InvalidSenderKey)?;

    let shared = diffie_hellman(
        recipient_secret.to_nonzero_scalar(),
        sender_public.as_affine(),
    );
    let aead_key = derive_aead_key(shared.raw_secret_bytes());

    let cipher = Aes256Gcm::new((&*aead_key).into());
    let nonce = Nonce::from_slice(nonce_bytes);
    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| EnvelopeError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}

/// Fixed collision-resistant hash of the full envelope, used as the
/// transcript-binding value in the Leader's final attestation.
pub fn digest(envelope_bytes: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(envelope_bytes);
    hasher.finalize().into()
}

fn derive_aead_key(shared_secret: &[u8]) -> Zeroizing<[u8; 32]> {
    let hk = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = Zeroizing::new([0u8; 32]);
    // HKDF expand only fails if the requested length exceeds 255 * hash_len,
    // which 32 bytes never does.
    hk.expand(HKDF_INFO, &mut *key)
        .expect("32-byte AEAD key is within HKDF-SHA256 expand limits");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let plaintext = b"quorum key shares live here".to_vec();

        let env = seal(&plaintext, &recipient.public_key()).expect("seal");
        let opened = open(&env, &recipient).expect("open");

        assert_eq!(&*opened, &plaintext);
    }

    #[test]
    fn round_trip_empty_state() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let env = seal(&[], &recipient.public_key()).expect("seal empty");
        let opened = open(&env, &recipient).expect("open empty");
        assert!(opened.is_empty());
    }

    #[test]
    fn wrong_key_fails() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let intruder = P256SecretKey::random(&mut OsRng);
        let env = seal(b"secret", &recipient.public_key()).expect("seal");

        let err = open(&env, &intruder).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed));
    }

    #[test]
    fn single_byte_flip_fails_closed() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let mut env = seal(b"secret", &recipient.public_key()).expect("seal");

        let last = env.len() - 1;
        env[last] ^= 0x01;

        let err = open(&env, &recipient).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed));
    }

    #[test]
    fn tampered_header_fails_closed() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let mut env = seal(b"secret", &recipient.public_key()).expect("seal");

        // Flip a nonce byte: AAD mismatch, AEAD tag check must fail.
        env[HEADER_LEN - 1] ^= 0x01;

        let err = open(&env, &recipient).unwrap_err();
        assert!(matches!(err, EnvelopeError::DecryptionFailed));
    }

    #[test]
    fn digest_is_stable_and_sensitive_to_tampering() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let env = seal(b"secret", &recipient.public_key()).expect("seal");

        let d1 = digest(&env);
        let d2 = digest(&env);
        assert_eq!(d1, d2);

        let mut tampered = env.clone();
        let last = tampered.len() - 1;
        tampered[last] ^= 0x01;
        assert_ne!(d1, digest(&tampered));
    }

    #[test]
    fn truncated_envelope_is_malformed() {
        let err = open(&[0x01, 0x02, 0x03], &P256SecretKey::random(&mut OsRng)).unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }

    #[test]
    fn unknown_algorithm_id_is_malformed() {
        let recipient = P256SecretKey::random(&mut OsRng);
        let mut env = seal(b"secret", &recipient.public_key()).expect("seal");
        env[0] = 0xff;

        let err = open(&env, &recipient).unwrap_err();
        assert!(matches!(err, EnvelopeError::Malformed(_)));
    }
}
