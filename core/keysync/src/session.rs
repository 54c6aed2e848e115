//! The Leader and Follower sides of the two-round handshake.
//!
//! Both roles are linear, blocking functions over a `Stream: Read + Write`:
//! there is no concurrency within a session. A node hosting many sessions
//! runs one of these per accepted connection
//! (or, for the Follower, per outbound dial), typically one per OS thread.

use std::io::{Cursor, Read, Write};

use p256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey as P256PublicKey, SecretKey as P256SecretKey};
use rand_core::{OsRng, RngCore};

use attestation::{AttestationError, AttestationProvider, NitroVerifier};
use committee::CommitteeOracle;
use secret_store::SecretStateStore;

use crate::error::KeySyncError;
use crate::framing::{read_frame, write_frame};

const NONCE_LEN: usize = 32;

/// Terminal success state of a session. The aborted state is represented by
/// `Err(KeySyncError)` instead of a variant here, since every abort carries
/// a distinct error kind the caller needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Leader terminal state: the secret state was exported successfully.
    Completed,
    /// Follower terminal state: the secret state was installed.
    Installed,
}

/// Run one Leader session over `stream` against a single Follower.
///
/// `store` is read once (step 4); nothing is written to it. `oracle` and
/// `attestor` are shared, reusable handles the caller owns across sessions.
pub fn run_leader<S: Read + Write>(
    stream: &mut S,
    attestor: &dyn AttestationProvider,
    verifier: &NitroVerifier,
    oracle: &dyn CommitteeOracle,
    store: &dyn SecretStateStore,
) -> Result<SessionOutcome, KeySyncError> {
    tracing::info!(role = "leader", event = "start");

    let mut leader_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut leader_nonce);
    write_frame(stream, &leader_nonce)?;

    let m2 = read_frame(stream)?;
    let follower_att = verifier.verify(&m2, &leader_nonce, None)?;
    tracing::info!(role = "leader", event = "peer-verified");

    let follower_nonce = follower_att
        .user_data
        .as_deref()
        .ok_or(KeySyncError::Internal(
            "follower attestation is missing the user_data (follower_nonce) field",
        ))?;
    let follower_pub_bytes = follower_att.public_key.as_deref().ok_or(KeySyncError::Internal(
        "follower attestation is missing the public_key (ephemeral) field",
    ))?;
    let follower_pub = P256PublicKey::from_sec1_bytes(follower_pub_bytes)
        .map_err(|_| KeySyncError::Internal("follower public_key is not a valid P-256 point"))?;

    committee::authorize_attestation(oracle, &follower_att)?;
    tracing::info!(role = "leader", event = "authorized");

    let state = store.read_for_export()?;
    let envelope_bytes = envelope::seal(&state, &follower_pub)?;
    let digest = envelope::digest(&envelope_bytes);
    tracing::info!(role = "leader", event = "sealed");

    let leader_att = attestor.attest(Some(follower_nonce), None, Some(&digest))?;

    let mut m3 = Vec::new();
    write_frame(&mut m3, &envelope_bytes)?;
    write_frame(&mut m3, &leader_att)?;
    write_frame(stream, &m3)?;

    tracing::info!(role = "leader", event = "completed");
    Ok(SessionOutcome::Completed)
}

/// Run one Follower session over `stream` against a single Leader.
///
/// The ephemeral P-256 secret generated here is never written anywhere; it
/// is dropped (and zeroized by `p256`'s `SecretKey`, which is
/// `ZeroizeOnDrop`) at the end of this function on every return path,
/// success or error.
pub fn run_follower<S: Read + Write>(
    stream: &mut S,
    attestor: &dyn AttestationProvider,
    verifier: &NitroVerifier,
    oracle: &dyn CommitteeOracle,
    store: &dyn SecretStateStore,
) -> Result<SessionOutcome, KeySyncError> {
    tracing::info!(role = "follower", event = "start");

    let ephemeral_secret = P256SecretKey::random(&mut OsRng);
    let ephemeral_public_bytes = ephemeral_secret
        .public_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();

    let mut follower_nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut follower_nonce);

    let leader_nonce = read_frame(stream)?;

    let follower_att = attestor.attest(
        Some(&leader_nonce),
        Some(&ephemeral_public_bytes),
        Some(&follower_nonce),
    )?;
    write_frame(stream, &follower_att)?;

    let m3 = read_frame(stream)?;
    let mut cursor = Cursor::new(m3);
    let envelope_bytes = read_frame(&mut cursor)?;
    let leader_att_bytes = read_frame(&mut cursor)?;

    let digest = envelope::digest(&envelope_bytes);
    let leader_att = verifier.verify(&leader_att_bytes, &follower_nonce, Some(&digest))?;

    if leader_att.public_key.is_some() {
        return Err(AttestationError::MalformedField(
            "leader attestation's public_key field must be empty",
        )
        .into());
    }
    tracing::info!(role = "follower", event = "peer-verified");

    committee::authorize_attestation(oracle, &leader_att)?;
    tracing::info!(role = "follower", event = "authorized");

    let plaintext = envelope::open(&envelope_bytes, &ephemeral_secret)?;
    store.install(plaintext.to_vec())?;
    tracing::info!(role = "follower", event = "installed");

    Ok(SessionOutcome::Installed)
}
