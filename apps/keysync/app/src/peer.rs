//! Leader's peer-to-peer listener: accepts Follower connections and runs
//! one `keysync::run_leader` session per connection, one OS thread each.

use std::net::TcpListener;
use std::sync::Arc;

use attestation::{AttestationProvider, NitroVerifier};
use committee::CommitteeOracle;
use secret_store::SecretStateStore;

pub fn run_leader_listener(
    listen_addr: &str,
    attestor: Arc<dyn AttestationProvider>,
    verifier: Arc<NitroVerifier>,
    oracle: Arc<dyn CommitteeOracle>,
    store: Arc<dyn SecretStateStore>,
) {
    let listener = TcpListener::bind(listen_addr)
        .unwrap_or_else(|e| panic!("binding peer listen address {listen_addr:?}: {e}"));
    tracing::info!(addr = listen_addr, "leader peer listener bound");

    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "accepting peer connection");
                continue;
            }
        };

        let attestor = Arc::clone(&attestor);
        let verifier = Arc::clone(&verifier);
        let oracle = Arc::clone(&oracle);
        let store = Arc::clone(&store);

        std::thread::spawn(move || {
            let peer = stream.peer_addr().ok();
            match keysync::run_leader(&mut stream, attestor.as_ref(), &verifier, oracle.as_ref(), store.as_ref()) {
                Ok(outcome) => tracing::info!(?peer, ?outcome, "leader session completed"),
                Err(e) => tracing::warn!(?peer, error = %e, "leader session aborted"),
            }
        });
    }
}
