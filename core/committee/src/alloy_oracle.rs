//! [`CommitteeOracle`] backed by a Safe-style M-of-N multisig registry read
//! through `alloy`, grounded on the provider/`sol!` plumbing in the pack's
//! x402 facilitator (`chain/evm.rs`).

use std::str::FromStr;

use alloy_primitives::{keccak256, Address, B256};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_sol_types::sol;

use crate::error::CommitteeError;
use crate::oracle::CommitteeOracle;

sol! {
    #[sol(rpc)]
    interface ICommitteeRegistry {
        function isApproved(bytes32 measurementHash) external view returns (bool);
        function isRevoked(bytes32 measurementHash) external view returns (bool);
    }
}

/// Reads committee approvals/revocations from an on-chain registry contract.
///
/// `is_authorized` is a synchronous trait method (the Handshake Engine is
/// written blocking-style, mirroring `qos_nsm::NsmProvider::nsm_process_request`),
/// so this type owns a dedicated single-threaded Tokio runtime and bridges
/// every call through `block_on` rather than making callers async.
pub struct AlloySafeOracle {
    runtime: tokio::runtime::Runtime,
    provider: RootProvider,
    registry: Address,
}

impl AlloySafeOracle {
    /// Connect to `rpc_url` and target the registry contract at `registry`.
    pub fn connect(rpc_url: &str, registry: Address) -> Result<Self, CommitteeError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CommitteeError::OracleUnavailable(format!("runtime init: {e}")))?;

        let url = url::Url::from_str(rpc_url)
            .map_err(|e| CommitteeError::OracleUnavailable(format!("invalid rpc url: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);

        Ok(Self {
            runtime,
            provider,
            registry,
        })
    }

    fn measurement_hash(canonical_string: &str) -> B256 {
        keccak256(canonical_string.as_bytes())
    }
}

impl CommitteeOracle for AlloySafeOracle {
    fn is_authorized(&self, canonical_string: &str) -> Result<bool, CommitteeError> {
        let measurement_hash = Self::measurement_hash(canonical_string);
        let contract = ICommitteeRegistry::new(self.registry, self.provider.clone());

        self.runtime.block_on(async {
            let revoked = contract
                .isRevoked(measurement_hash)
                .call()
                .await
                .map_err(|e| CommitteeError::OracleUnavailable(format!("isRevoked: {e}")))?;
            if revoked {
                return Ok(false);
            }

            contract
                .isApproved(measurement_hash)
                .call()
                .await
                .map_err(|e| CommitteeError::OracleUnavailable(format!("isApproved: {e}")))
        })
    }
}
