//! The Handshake Engine (root): drives the two-round, length-prefixed
//! Leader/Follower protocol, composing attestation, committee authorization,
//! envelope encryption, and the secret state store.

mod error;
mod framing;
mod session;

pub use error::{KeySyncError, TransportError};
pub use session::{run_follower, run_leader, SessionOutcome};

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Duration;

    use attestation::mock::MockAttestationProvider;
    use attestation::{AttestationProvider, Measurements, NitroVerifier};
    use committee::mock::MockCommitteeOracle;
    use committee::{code_string, instance_string};
    use secret_store::InMemorySecretStore;

    use super::*;

    fn measurements(tag: u8) -> Measurements {
        Measurements {
            pcr0: vec![tag; 48],
            pcr1: vec![tag; 48],
            pcr2: vec![tag; 48],
            pcr4: vec![tag.wrapping_add(1); 48],
        }
    }

    fn authorize_all(oracle: &MockCommitteeOracle, measurements: &Measurements) {
        oracle.approve(code_string(measurements));
        oracle.approve(instance_string(measurements));
    }

    /// Drives one full M1/M2/M3 exchange over an in-process duplex pipe,
    /// mirroring the `e2e` crate's use of `UnixStream::pair()` as the
    /// stand-in for "a reliable bidirectional byte stream".
    struct Harness {
        leader_provider: MockAttestationProvider,
        follower_provider: MockAttestationProvider,
        leader_verifier: NitroVerifier,
        follower_verifier: NitroVerifier,
        leader_oracle: MockCommitteeOracle,
        follower_oracle: MockCommitteeOracle,
    }

    impl Harness {
        fn new() -> Self {
            let leader_provider = MockAttestationProvider::generate(measurements(0xaa));
            let follower_provider = MockAttestationProvider::generate(measurements(0xbb));

            let leader_verifier =
                NitroVerifier::new(follower_provider.root_cert_der().to_vec(), Duration::from_secs(300));
            let follower_verifier =
                NitroVerifier::new(leader_provider.root_cert_der().to_vec(), Duration::from_secs(300));

            Self {
                leader_provider,
                follower_provider,
                leader_verifier,
                follower_verifier,
                leader_oracle: MockCommitteeOracle::new(),
                follower_oracle: MockCommitteeOracle::new(),
            }
        }

        fn authorize_both(&self) {
            authorize_all(&self.leader_oracle, &measurements(0xbb));
            authorize_all(&self.follower_oracle, &measurements(0xaa));
        }
    }

    fn run_pair(
        harness: &Harness,
        leader_store: InMemorySecretStore,
        follower_store: InMemorySecretStore,
    ) -> (Result<SessionOutcome, KeySyncError>, Result<SessionOutcome, KeySyncError>) {
        let (mut leader_sock, mut follower_sock) = UnixStream::pair().expect("socket pair");

        let leader_verifier = &harness.leader_verifier;
        let leader_provider = &harness.leader_provider;
        let leader_oracle = &harness.leader_oracle;

        let follower_verifier = &harness.follower_verifier;
        let follower_provider = &harness.follower_provider;
        let follower_oracle = &harness.follower_oracle;

        thread::scope(|scope| {
            let leader_handle = scope.spawn(move || {
                run_leader(
                    &mut leader_sock,
                    leader_provider,
                    leader_verifier,
                    leader_oracle,
                    &leader_store,
                )
            });
            let follower_handle = scope.spawn(move || {
                run_follower(
                    &mut follower_sock,
                    follower_provider,
                    follower_verifier,
                    follower_oracle,
                    &follower_store,
                )
            });

            (
                leader_handle.join().expect("leader thread panicked"),
                follower_handle.join().expect("follower thread panicked"),
            )
        })
    }

    #[test]
    fn happy_path_installs_matching_state() {
        let harness = Harness::new();
        harness.authorize_both();

        let leader_store = InMemorySecretStore::with_state(vec![0x41, 0x42, 0x43]);
        let follower_store = InMemorySecretStore::new();

        let (leader_result, follower_result) = run_pair(&harness, leader_store, follower_store);

        assert_eq!(leader_result.unwrap(), SessionOutcome::Completed);
        assert_eq!(follower_result.unwrap(), SessionOutcome::Installed);
    }

    #[test]
    fn empty_secret_state_round_trips() {
        let harness = Harness::new();
        harness.authorize_both();

        let leader_store = InMemorySecretStore::with_state(vec![]);
        let follower_store = InMemorySecretStore::new();

        let (leader_result, follower_result) = run_pair(&harness, leader_store, follower_store);
        leader_result.unwrap();
        follower_result.unwrap();
    }

    #[test]
    fn revoked_follower_code_aborts_leader_before_m3() {
        let harness = Harness::new();
        let follower_measurements = measurements(0xbb);
        authorize_all(&harness.leader_oracle, &follower_measurements);
        harness.leader_oracle.revoke(code_string(&follower_measurements));
        authorize_all(&harness.follower_oracle, &measurements(0xaa));

        let leader_store = InMemorySecretStore::with_state(vec![0x41]);
        let follower_store = InMemorySecretStore::new();

        let (leader_result, follower_result) = run_pair(&harness, leader_store, follower_store);

        assert!(matches!(
            leader_result.unwrap_err(),
            KeySyncError::Authorization(committee::CommitteeError::CodeNotAuthorized)
        ));
        assert!(follower_result.is_err());
    }

    #[test]
    fn oracle_unavailable_aborts_leader_without_sending_m3() {
        let harness = Harness::new();
        authorize_all(&harness.leader_oracle, &measurements(0xbb));
        harness.leader_oracle.fail_next();
        authorize_all(&harness.follower_oracle, &measurements(0xaa));

        let leader_store = InMemorySecretStore::with_state(vec![0x41]);
        let follower_store = InMemorySecretStore::new();

        let (leader_result, follower_result) = run_pair(&harness, leader_store, follower_store);

        assert!(matches!(
            leader_result.unwrap_err(),
            KeySyncError::Authorization(committee::CommitteeError::OracleUnavailable(_))
        ));
        assert!(follower_result.is_err());
    }

    #[test]
    fn unauthorized_follower_instance_aborts_leader_before_m3() {
        let harness = Harness::new();
        let follower_measurements = measurements(0xbb);
        harness.leader_oracle.approve(code_string(&follower_measurements));
        authorize_all(&harness.follower_oracle, &measurements(0xaa));

        let leader_store = InMemorySecretStore::with_state(vec![0x41]);
        let follower_store = InMemorySecretStore::new();

        let (leader_result, follower_result) = run_pair(&harness, leader_store, follower_store);

        assert!(matches!(
            leader_result.unwrap_err(),
            KeySyncError::Authorization(committee::CommitteeError::InstanceNotAuthorized)
        ));
        assert!(follower_result.is_err());
    }

    /// Unit-level version of end-to-end scenario 3: a tampered envelope
    /// makes the Follower's freshly computed digest disagree with the one
    /// the Leader bound into its attestation, so `Verify` fails before any
    /// decryption is attempted.
    #[test]
    fn tampered_envelope_fails_follower_verify_without_decrypting() {
        let leader_provider = MockAttestationProvider::generate(measurements(0xaa));
        let follower_verifier =
            NitroVerifier::new(leader_provider.root_cert_der().to_vec(), Duration::from_secs(300));

        let follower_nonce = [0x22u8; 32];
        let ephemeral_secret = p256::SecretKey::random(&mut rand_core::OsRng);

        let mut envelope_bytes =
            envelope::seal(&[0x41, 0x42, 0x43], &ephemeral_secret.public_key()).expect("seal");
        let digest_at_seal_time = envelope::digest(&envelope_bytes);
        let leader_att = leader_provider
            .attest(Some(&follower_nonce), None, Some(&digest_at_seal_time))
            .expect("attest");

        let last = envelope_bytes.len() - 1;
        envelope_bytes[last] ^= 0x01;
        let digest_after_tamper = envelope::digest(&envelope_bytes);

        let err = follower_verifier
            .verify(&leader_att, &follower_nonce, Some(&digest_after_tamper))
            .unwrap_err();
        assert!(matches!(err, attestation::AttestationError::UserDataMismatch));
    }

    #[test]
    fn replayed_m3_nonce_mismatch_is_rejected() {
        let harness = Harness::new();

        let stale_nonce = [0x10u8; 32];
        let envelope_bytes = envelope::seal(
            &[0x41],
            &p256::SecretKey::random(&mut rand_core::OsRng).public_key(),
        )
        .expect("seal");
        let digest = envelope::digest(&envelope_bytes);
        let stale_leader_att = harness
            .leader_provider
            .attest(Some(&stale_nonce), None, Some(&digest))
            .expect("attest");

        let fresh_nonce = [0x11u8; 32];
        let err = harness
            .follower_verifier
            .verify(&stale_leader_att, &fresh_nonce, Some(&digest))
            .unwrap_err();
        assert!(matches!(err, attestation::AttestationError::NonceMismatch));
    }
}
