//! Control-plane `RequestProcessor`: decodes the `EnclaveRequest` the host
//! proxies in from `keysync_host`, and for the Follower role, dials the
//! Leader and drives one `keysync::run_follower` session. A `RequestProcessor`
//! wrapping cached/injected state, decoding `prost` bytes directly since the
//! same message types cross both the gRPC and the proxy wire (see
//! `keysync_proto`).

use std::net::TcpStream;
use std::sync::Arc;

use prost::Message;
use qos_core::server::RequestProcessor;

use attestation::{AttestationProvider, NitroVerifier};
use committee::CommitteeOracle;
use secret_store::SecretStateStore;

use keysync_proto::{enclave_request, enclave_response, EnclaveRequest, EnclaveResponse, HealthCheckResponse, TriggerSyncResponse};

enum RoleState {
    Leader,
    Follower {
        default_peer_addr: String,
        attestor: Arc<dyn AttestationProvider>,
        verifier: Arc<NitroVerifier>,
        oracle: Arc<dyn CommitteeOracle>,
        store: Arc<dyn SecretStateStore>,
    },
}

pub struct ControlProcessor {
    role: RoleState,
}

impl ControlProcessor {
    pub fn leader() -> Self {
        Self { role: RoleState::Leader }
    }

    pub fn follower(
        default_peer_addr: String,
        attestor: Arc<dyn AttestationProvider>,
        verifier: Arc<NitroVerifier>,
        oracle: Arc<dyn CommitteeOracle>,
        store: Arc<dyn SecretStateStore>,
    ) -> Self {
        Self {
            role: RoleState::Follower {
                default_peer_addr,
                attestor,
                verifier,
                oracle,
                store,
            },
        }
    }

    fn handle(&mut self, request: EnclaveRequest) -> EnclaveResponse {
        match request.kind {
            Some(enclave_request::Kind::Health(_)) => EnclaveResponse {
                kind: Some(enclave_response::Kind::Health(HealthCheckResponse { ok: true })),
            },
            Some(enclave_request::Kind::TriggerSync(req)) => {
                let outcome = self.trigger_sync(req.peer_addr);
                EnclaveResponse {
                    kind: Some(enclave_response::Kind::TriggerSync(outcome)),
                }
            }
            None => EnclaveResponse {
                kind: Some(enclave_response::Kind::TriggerSync(TriggerSyncResponse {
                    outcome: Some(keysync_proto::generated::trigger_sync_response::Outcome::Error(
                        "empty request".to_string(),
                    )),
                })),
            },
        }
    }

    fn trigger_sync(&mut self, peer_addr: String) -> TriggerSyncResponse {
        use keysync_proto::generated::trigger_sync_response::Outcome;

        let RoleState::Follower {
            default_peer_addr,
            attestor,
            verifier,
            oracle,
            store,
        } = &self.role
        else {
            return TriggerSyncResponse {
                outcome: Some(Outcome::Error("TriggerSync is only valid for the follower role".to_string())),
            };
        };

        let addr = if peer_addr.is_empty() { default_peer_addr.clone() } else { peer_addr };

        let mut stream = match TcpStream::connect(&addr) {
            Ok(s) => s,
            Err(e) => return TriggerSyncResponse { outcome: Some(Outcome::Error(format!("dialing {addr}: {e}"))) },
        };

        match keysync::run_follower(&mut stream, attestor.as_ref(), verifier, oracle.as_ref(), store.as_ref()) {
            Ok(_) => TriggerSyncResponse { outcome: Some(Outcome::Completed(true)) },
            Err(e) => TriggerSyncResponse { outcome: Some(Outcome::Error(e.to_string())) },
        }
    }
}

impl RequestProcessor for ControlProcessor {
    fn process(&mut self, request: Vec<u8>) -> Vec<u8> {
        let decoded = match EnclaveRequest::decode(&*request) {
            Ok(r) => r,
            Err(_) => {
                return EnclaveResponse {
                    kind: Some(enclave_response::Kind::TriggerSync(TriggerSyncResponse {
                        outcome: Some(keysync_proto::generated::trigger_sync_response::Outcome::Error(
                            "malformed EnclaveRequest".to_string(),
                        )),
                    })),
                }
                .encode_to_vec()
            }
        };

        self.handle(decoded).encode_to_vec()
    }
}
