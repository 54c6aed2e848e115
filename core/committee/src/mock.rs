//! A table-driven [`CommitteeOracle`], analogous to the pack's
//! `qos_nsm::mock::MockNsm`: stands in for the on-chain registry in unit
//! and `e2e` tests.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::canonical::revocation_string;
use crate::error::CommitteeError;
use crate::oracle::CommitteeOracle;

/// In-memory committee registry. `approve`/`revoke` mutate the table;
/// [`MockCommitteeOracle::fail_next`] makes the next lookup return
/// `OracleUnavailable`, for exercising the fail-closed path.
#[derive(Default)]
pub struct MockCommitteeOracle {
    approved: Mutex<HashSet<String>>,
    revoked: Mutex<HashSet<String>>,
    unavailable: Mutex<bool>,
}

impl MockCommitteeOracle {
    /// An oracle with no approvals at all; every lookup is `false`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a live committee approval for `canonical_string`.
    pub fn approve(&self, canonical_string: impl Into<String>) -> &Self {
        self.approved
            .lock()
            .expect("mock oracle mutex poisoned")
            .insert(canonical_string.into());
        self
    }

    /// Record a committee-signed revocation of a previously approved
    /// string, using the `"REVOKE: "`-prefixed encoding.
    pub fn revoke(&self, authorization_string: impl Into<String>) -> &Self {
        self.revoked
            .lock()
            .expect("mock oracle mutex poisoned")
            .insert(revocation_string(&authorization_string.into()));
        self
    }

    /// Make the next `is_authorized` call fail with `OracleUnavailable`,
    /// simulating an unreachable chain.
    pub fn fail_next(&self) {
        *self.unavailable.lock().expect("mock oracle mutex poisoned") = true;
    }
}

impl CommitteeOracle for MockCommitteeOracle {
    fn is_authorized(&self, canonical_string: &str) -> Result<bool, CommitteeError> {
        let mut unavailable = self.unavailable.lock().expect("mock oracle mutex poisoned");
        if *unavailable {
            *unavailable = false;
            return Err(CommitteeError::OracleUnavailable(
                "simulated chain outage".to_string(),
            ));
        }
        drop(unavailable);

        let revoked_key = revocation_string(canonical_string);
        if self
            .revoked
            .lock()
            .expect("mock oracle mutex poisoned")
            .contains(&revoked_key)
        {
            return Ok(false);
        }

        Ok(self
            .approved
            .lock()
            .expect("mock oracle mutex poisoned")
            .contains(canonical_string))
    }
}
