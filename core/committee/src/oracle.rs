//! The Committee Authorization Oracle: `IsAuthorized` and
//! `AuthorizeAttestation`.

use attestation::VerifiedAttestation;

use crate::canonical::{code_string, instance_string};
use crate::error::CommitteeError;

/// Abstracts the on-chain registry so the Handshake Engine never depends on
/// `alloy` directly, analogous to how the pack's `qos_nsm::NsmProvider`
/// abstracts the NSM device from callers of the Attestation Provider.
pub trait CommitteeOracle: Send + Sync {
    /// True iff a live (non-revoked) committee approval exists for
    /// `canonical_string`. Revocation is authoritative: an oracle that
    /// finds both an approval and a revocation for the same string MUST
    /// return `false`.
    fn is_authorized(&self, canonical_string: &str) -> Result<bool, CommitteeError>;
}

/// `AuthorizeAttestation`: extract the code and instance canonical strings
/// from `verified` and require both to be currently authorized.
pub fn authorize_attestation(
    oracle: &dyn CommitteeOracle,
    verified: &VerifiedAttestation,
) -> Result<(), CommitteeError> {
    let code = code_string(&verified.measurements);
    if !oracle.is_authorized(&code)? {
        return Err(CommitteeError::CodeNotAuthorized);
    }

    let instance = instance_string(&verified.measurements);
    if !oracle.is_authorized(&instance)? {
        return Err(CommitteeError::InstanceNotAuthorized);
    }

    Ok(())
}
