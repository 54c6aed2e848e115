//! Enclave-side key-sync app: wires the `core/keysync` Handshake Engine to
//! real (or mock, for tests) attestation/committee/state providers, and
//! exposes two surfaces:
//!
//! - a `qos_core` control-plane socket, proxied from `keysync_host`, that
//!   accepts `TriggerSync`/health requests via `qos_core::server::SocketServer`;
//! - for the Leader role only, a plain TCP listener that accepts Follower
//!   connections and runs `keysync::run_leader` per connection. This can't
//!   reuse `SocketServer`, since the Handshake Engine requires the Leader to
//!   speak first (send M1 unprompted) on an accepted connection, which
//!   `RequestProcessor`'s "read a request, return a response" contract
//!   cannot express. See `DESIGN.md` for the full rationale.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use qos_core::io::SocketAddress;
use qos_core::server::SocketServer;

use attestation::{AttestationProvider, NitroAttestationProvider, NitroVerifier};
use committee::{AlloySafeOracle, CommitteeError, CommitteeOracle};
use secret_store::{FileSecretStore, SecretStateStore};

pub mod cli;
mod control;
mod peer;

/// Role-specific configuration. `peer_listen_addr`/`default_peer_addr` are
/// plain `SocketAddr` strings: the cross-enclave leg is cleartext TCP, with
/// any host-side hypervisor-socket bridging out of scope for this app.
#[derive(Clone, Debug)]
pub enum Role {
    Leader { peer_listen_addr: String },
    Follower { default_peer_addr: String },
}

/// Fully parsed app configuration, independent of how it was parsed.
pub struct AppConfig {
    pub control_plane_addr: SocketAddress,
    pub role: Role,
    pub state_file: String,
    pub platform_profile: String,
    pub root_cert_file: String,
    pub committee_rpc_url: String,
    pub committee_contract: String,
    pub committee_min_signers: u32,
    pub max_attestation_age: Duration,
    pub mock_nsm: bool,
    pub mock_committee: bool,
}

/// An oracle that authorizes every measurement. Stands in for the on-chain
/// registry in `--mock-committee` runs, the way `qos_nsm::mock::MockNsm`
/// stands in for the real NSM device.
struct AllowAllOracle;

impl CommitteeOracle for AllowAllOracle {
    fn is_authorized(&self, _canonical_string: &str) -> Result<bool, CommitteeError> {
        Ok(true)
    }
}

/// Assemble providers from `config` and run the app. Never returns on
/// success; both the control-plane server and the Leader's peer listener run
/// their accept loops for the lifetime of the process.
pub fn run(config: AppConfig) {
    tracing_subscriber::fmt::init();

    if config.platform_profile != "nitro" {
        panic!(
            "unsupported platform profile {:?}: only \"nitro\" is implemented",
            config.platform_profile
        );
    }

    let attestor: Arc<dyn AttestationProvider> = if config.mock_nsm {
        #[cfg(feature = "mock")]
        {
            Arc::new(NitroAttestationProvider::new(Box::new(qos_nsm::mock::MockNsm)))
        }
        #[cfg(not(feature = "mock"))]
        panic!("--mock-nsm requires the \"mock\" feature");
    } else {
        Arc::new(NitroAttestationProvider::new(Box::new(qos_nsm::Nsm)))
    };

    let root_der = fs::read(&config.root_cert_file)
        .unwrap_or_else(|e| panic!("reading --root-cert-file {:?}: {e}", config.root_cert_file));
    let verifier = Arc::new(NitroVerifier::new(root_der, config.max_attestation_age));

    let oracle: Arc<dyn CommitteeOracle> = if config.mock_committee {
        Arc::new(AllowAllOracle)
    } else {
        tracing::info!(
            committee_min_signers = config.committee_min_signers,
            "committee multisig threshold is enforced on-chain by the registry contract"
        );
        let registry = config
            .committee_contract
            .parse()
            .unwrap_or_else(|e| panic!("invalid --committee-contract address: {e}"));
        Arc::new(
            AlloySafeOracle::connect(&config.committee_rpc_url, registry)
                .unwrap_or_else(|e| panic!("connecting to committee registry: {e}")),
        )
    };

    let store: Arc<dyn SecretStateStore> = Arc::new(FileSecretStore::new(config.state_file.clone()));

    run_with_providers(config.control_plane_addr, config.role, attestor, verifier, oracle, store);
}

/// Core run loop, decoupled from how providers were constructed. `cli::Cli`
/// builds real providers from flags and calls this; tests can instead pass
/// `attestation::mock`/`committee::mock` providers directly, sidestepping the
/// real NSM device and on-chain registry entirely. Never returns on success.
pub fn run_with_providers(
    control_plane_addr: SocketAddress,
    role: Role,
    attestor: Arc<dyn AttestationProvider>,
    verifier: Arc<NitroVerifier>,
    oracle: Arc<dyn CommitteeOracle>,
    store: Arc<dyn SecretStateStore>,
) {
    match role {
        Role::Leader { peer_listen_addr } => {
            let attestor = Arc::clone(&attestor);
            let verifier = Arc::clone(&verifier);
            let oracle = Arc::clone(&oracle);
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                peer::run_leader_listener(&peer_listen_addr, attestor, verifier, oracle, store);
            });

            let processor = control::ControlProcessor::leader();
            tracing::info!("control plane listening (leader role)");
            SocketServer::listen(control_plane_addr, processor).expect("control-plane socket server failed");
        }
        Role::Follower { default_peer_addr } => {
            let processor =
                control::ControlProcessor::follower(default_peer_addr, attestor, verifier, oracle, store);
            tracing::info!("control plane listening (follower role)");
            SocketServer::listen(control_plane_addr, processor).expect("control-plane socket server failed");
        }
    }
}
