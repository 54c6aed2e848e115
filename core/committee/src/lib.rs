//! Committee Authorization Oracle: checks a peer's verified attestation
//! measurements against an on-chain Safe-style M-of-N multisig registry.

mod alloy_oracle;
mod canonical;
mod error;
mod oracle;

pub mod mock;

pub use alloy_oracle::AlloySafeOracle;
pub use canonical::{code_string, instance_string, revocation_string};
pub use error::CommitteeError;
pub use oracle::{authorize_attestation, CommitteeOracle};

#[cfg(test)]
mod tests {
    use attestation::Measurements;

    use super::*;
    use crate::mock::MockCommitteeOracle;

    fn measurements() -> Measurements {
        Measurements {
            pcr0: vec![0xaa; 48],
            pcr1: vec![0xbb; 48],
            pcr2: vec![0xcc; 48],
            pcr4: vec![0xdd; 48],
        }
    }

    fn verified(measurements: Measurements) -> attestation::VerifiedAttestation {
        attestation::VerifiedAttestation {
            measurements,
            public_key: None,
            user_data: None,
        }
    }

    #[test]
    fn unapproved_measurement_is_rejected() {
        let oracle = MockCommitteeOracle::new();
        let err = authorize_attestation(&oracle, &verified(measurements())).unwrap_err();
        assert!(matches!(err, CommitteeError::CodeNotAuthorized));
    }

    #[test]
    fn approved_code_and_instance_pass() {
        let m = measurements();
        let oracle = MockCommitteeOracle::new();
        oracle.approve(code_string(&m));
        oracle.approve(instance_string(&m));
        authorize_attestation(&oracle, &verified(m)).unwrap();
    }

    #[test]
    fn approved_code_but_unapproved_instance_is_rejected() {
        let m = measurements();
        let oracle = MockCommitteeOracle::new();
        oracle.approve(code_string(&m));
        let err = authorize_attestation(&oracle, &verified(m)).unwrap_err();
        assert!(matches!(err, CommitteeError::InstanceNotAuthorized));
    }

    #[test]
    fn revocation_overrides_prior_approval() {
        let m = measurements();
        let oracle = MockCommitteeOracle::new();
        let code = code_string(&m);
        oracle.approve(code.clone());
        oracle.approve(instance_string(&m));
        oracle.revoke(code);

        let err = authorize_attestation(&oracle, &verified(m)).unwrap_err();
        assert!(matches!(err, CommitteeError::CodeNotAuthorized));
    }

    #[test]
    fn oracle_unavailable_is_fail_closed() {
        let m = measurements();
        let oracle = MockCommitteeOracle::new();
        oracle.approve(code_string(&m));
        oracle.approve(instance_string(&m));
        oracle.fail_next();

        let err = authorize_attestation(&oracle, &verified(m)).unwrap_err();
        assert!(matches!(err, CommitteeError::OracleUnavailable(_)));
    }
}
