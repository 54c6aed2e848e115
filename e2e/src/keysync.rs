//! Harness for the key-sync stack's end-to-end scenarios.
//!
//! This composes `keysync_app`/`keysync_host` as libraries in-process
//! rather than spawning compiled binaries as separate subprocesses. The
//! Leader and Follower sides each need a
//! `NitroVerifier` pinned to the *other* side's mock root certificate
//! (see `attestation::mock::MockAttestationProvider`), and those roots only
//! exist once both providers are generated; bootstrapping that across two
//! separately-spawned binaries would mean serializing generated signing
//! keys out to files and teaching the app a second, file-loaded mock
//! attestation mode just for tests. Driving `keysync_app::run_with_providers`
//! directly keeps every other layer of the stack real: the `qos_core`
//! control-plane proxying (through `qos_simulator`), the `prost` encoding
//! on the wire, and the `tonic` gRPC surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tempdir::TempDir;
use tonic::transport::Channel;

use attestation::mock::MockAttestationProvider;
use attestation::{AttestationProvider, Measurements, NitroVerifier};
use committee::mock::MockCommitteeOracle;
use committee::{code_string, instance_string, CommitteeOracle};
use secret_store::{InMemorySecretStore, SecretStateStore};

use qos_core::io::SocketAddress;
use keysync_app::Role;
use keysync_proto::key_sync_service_client::KeySyncServiceClient;

use crate::qos_simulator;
use crate::{GRPC_MAX_RECV_MSG_SIZE, LOCAL_HOST};

/// Fixed measurement values, analogous to `core/keysync`'s own unit test
/// fixtures: distinct tags for the Leader and Follower sides.
pub fn measurements(tag: u8) -> Measurements {
    Measurements {
        pcr0: vec![tag; 48],
        pcr1: vec![tag; 48],
        pcr2: vec![tag; 48],
        pcr4: vec![tag.wrapping_add(1); 48],
    }
}

/// What one side's committee oracle should say about the peer's
/// measurements for a given scenario.
pub struct Authorization {
    pub code: bool,
    pub instance: bool,
    pub revoke_code: bool,
    pub oracle_down: bool,
}

impl Default for Authorization {
    fn default() -> Self {
        Self {
            code: true,
            instance: true,
            revoke_code: false,
            oracle_down: false,
        }
    }
}

fn apply(oracle: &MockCommitteeOracle, measurements: &Measurements, authz: &Authorization) {
    if authz.code {
        oracle.approve(code_string(measurements));
    }
    if authz.instance {
        oracle.approve(instance_string(measurements));
    }
    if authz.revoke_code {
        oracle.revoke(code_string(measurements));
    }
    if authz.oracle_down {
        oracle.fail_next();
    }
}

/// One scenario's fixed inputs.
pub struct Scenario {
    pub leader_secret: Vec<u8>,
    /// The Leader's oracle judging the Follower's measurements.
    pub leader_authorizes_follower: Authorization,
    /// The Follower's oracle judging the Leader's measurements.
    pub follower_authorizes_leader: Authorization,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            leader_secret: vec![0x41, 0x42, 0x43],
            leader_authorizes_follower: Authorization::default(),
            follower_authorizes_leader: Authorization::default(),
        }
    }
}

/// Arguments passed to the user test callback.
pub struct TestArgs {
    /// Key-sync gRPC client, talking to the Follower's host.
    pub client: KeySyncServiceClient<Channel>,
    /// The Follower's secret store, readable after `TriggerSync` returns so
    /// tests can assert on what actually got installed.
    pub follower_store: Arc<InMemorySecretStore>,
}

/// Bring up a Leader/Follower pair realizing `scenario`, run `test`, then
/// tear down.
pub async fn execute<F, T>(scenario: Scenario, test: F)
where
    F: FnOnce(TestArgs) -> T,
    T: std::future::Future<Output = ()>,
{
    let tmp_dir = TempDir::new("keysync-e2e").unwrap();

    let leader_provider = MockAttestationProvider::generate(measurements(0xaa));
    let follower_provider = MockAttestationProvider::generate(measurements(0xbb));
    let leader_root = leader_provider.root_cert_der().to_vec();
    let follower_root = follower_provider.root_cert_der().to_vec();

    let leader_verifier = Arc::new(NitroVerifier::new(follower_root, Duration::from_secs(300)));
    let follower_verifier = Arc::new(NitroVerifier::new(leader_root, Duration::from_secs(300)));

    let leader_attestor: Arc<dyn AttestationProvider> = Arc::new(leader_provider);
    let follower_attestor: Arc<dyn AttestationProvider> = Arc::new(follower_provider);

    let leader_oracle = Arc::new(MockCommitteeOracle::new());
    apply(&leader_oracle, &measurements(0xbb), &scenario.leader_authorizes_follower);
    let follower_oracle = Arc::new(MockCommitteeOracle::new());
    apply(&follower_oracle, &measurements(0xaa), &scenario.follower_authorizes_leader);

    let leader_store = Arc::new(InMemorySecretStore::with_state(scenario.leader_secret));
    let follower_store = Arc::new(InMemorySecretStore::new());

    let leader_app_sock = tmp_dir.path().join(".leader.app.sock");
    let leader_enc_sock = tmp_dir.path().join(".leader.enclave.sock");
    let follower_app_sock = tmp_dir.path().join(".follower.app.sock");
    let follower_enc_sock = tmp_dir.path().join(".follower.enclave.sock");

    let peer_port = qos_test_primitives::find_free_port().expect("find free port");
    let peer_addr = format!("{LOCAL_HOST}:{peer_port}");

    {
        let attestor = Arc::clone(&leader_attestor);
        let verifier = Arc::clone(&leader_verifier);
        let oracle: Arc<dyn CommitteeOracle> = leader_oracle;
        let store: Arc<dyn SecretStateStore> = leader_store;
        let control_addr = SocketAddress::new_unix(leader_app_sock.to_str().unwrap());
        let role = Role::Leader {
            peer_listen_addr: peer_addr.clone(),
        };
        std::thread::spawn(move || {
            keysync_app::run_with_providers(control_addr, role, attestor, verifier, oracle, store);
        });
    }

    {
        let attestor = Arc::clone(&follower_attestor);
        let verifier = Arc::clone(&follower_verifier);
        let oracle: Arc<dyn CommitteeOracle> = follower_oracle;
        let store: Arc<dyn SecretStateStore> = Arc::clone(&follower_store);
        let control_addr = SocketAddress::new_unix(follower_app_sock.to_str().unwrap());
        let role = Role::Follower {
            default_peer_addr: peer_addr,
        };
        std::thread::spawn(move || {
            keysync_app::run_with_providers(control_addr, role, attestor, verifier, oracle, store);
        });
    }

    // Give both control-plane servers and the Leader's peer listener a
    // moment to bind before the simulators dial them.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let _leader_sim = qos_simulator::spawn_qos_simulator(qos_simulator::QosSimulatorConfig {
        enclave_sock: leader_enc_sock.to_str().unwrap().to_string(),
        app_sock: leader_app_sock.to_str().unwrap().to_string(),
    })
    .await;
    let _follower_sim = qos_simulator::spawn_qos_simulator(qos_simulator::QosSimulatorConfig {
        enclave_sock: follower_enc_sock.to_str().unwrap().to_string(),
        app_sock: follower_app_sock.to_str().unwrap().to_string(),
    })
    .await;

    let host_port = qos_test_primitives::find_free_port().expect("find free port");
    let host_listen_addr: SocketAddr = format!("{LOCAL_HOST}:{host_port}").parse().unwrap();
    let enclave_addr = SocketAddress::new_unix(follower_enc_sock.to_str().unwrap());
    tokio::spawn(async move {
        let _ = keysync_host::run(keysync_host::KeySyncHostConfig {
            listen_addr: host_listen_addr,
            enclave_addr,
        })
        .await;
    });
    qos_test_primitives::wait_until_port_is_bound(host_port);

    let host_addr = format!("http://{LOCAL_HOST}:{host_port}");
    let client = KeySyncServiceClient::connect(host_addr)
        .await
        .unwrap()
        .max_decoding_message_size(GRPC_MAX_RECV_MSG_SIZE);

    let test_args = TestArgs { client, follower_store };

    let res = std::panic::AssertUnwindSafe(test(test_args)).catch_unwind().await;
    assert!(res.is_ok(), "test body panicked");
}
