//! The `Attest` operation: produce a signed attestation document binding
//! the caller's nonce, public key, and user data.

use qos_nsm::types::{NsmRequest, NsmResponse};
use qos_nsm::NsmProvider;

use crate::error::AttestationError;

/// Produces attestation documents for this node's own enclave.
///
/// Implementations of `attest` MUST bind all three fields verbatim into the
/// signed payload; a field that is `None` is carried absent, never as an
/// empty-but-present value, so the Follower's strictness check on the
/// Leader's M3 `public_key` can tell "absent" from "empty bytes".
pub trait AttestationProvider: Send + Sync {
    /// Request a signed attestation document from the platform.
    fn attest(
        &self,
        nonce: Option<&[u8]>,
        public_key: Option<&[u8]>,
        user_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, AttestationError>;
}

/// [`AttestationProvider`] backed by the pack's `qos_nsm` crate, which talks
/// to the real NSM device (`qos_nsm::Nsm`) or a deterministic in-process
/// stand-in (`qos_nsm::mock::MockNsm`, behind the `mock` feature) depending
/// on which [`NsmProvider`] it is constructed with.
pub struct NitroAttestationProvider {
    nsm: Box<dyn NsmProvider>,
}

impl NitroAttestationProvider {
    /// Wrap an [`NsmProvider`]. Pass `Box::new(qos_nsm::Nsm)` in production
    /// or `Box::new(qos_nsm::mock::MockNsm)` under the `mock` feature.
    pub fn new(nsm: Box<dyn NsmProvider>) -> Self {
        Self { nsm }
    }
}

impl AttestationProvider for NitroAttestationProvider {
    fn attest(
        &self,
        nonce: Option<&[u8]>,
        public_key: Option<&[u8]>,
        user_data: Option<&[u8]>,
    ) -> Result<Vec<u8>, AttestationError> {
        let request = NsmRequest::Attestation {
            nonce: nonce.map(<[u8]>::to_vec),
            public_key: public_key.map(<[u8]>::to_vec),
            user_data: user_data.map(<[u8]>::to_vec),
        };

        match self.nsm.nsm_process_request(request) {
            NsmResponse::Attestation { document } => Ok(document),
            other => Err(AttestationError::AttestationUnavailable(format!(
                "unexpected NSM response: {other:?}"
            ))),
        }
    }
}
