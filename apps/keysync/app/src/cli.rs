//! CLI for the key-sync enclave app.
//!
//! This binary is parsed with `clap` rather than `qos_core`'s own parser,
//! since it takes a richer set of options than the bundled apps do.

use std::time::Duration;

use clap::{Parser, ValueEnum};
use qos_core::io::SocketAddress;

use crate::{AppConfig, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Leader,
    Follower,
}

/// Key-sync enclave app.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Unix socket the control-plane (host-facing) server listens on.
    #[arg(long)]
    usock: Option<String>,
    /// vsock CID for the control-plane server. Requires `port`, forbids `usock`.
    #[arg(long)]
    cid: Option<u32>,
    /// vsock port for the control-plane server.
    #[arg(long)]
    port: Option<u32>,
    /// Configure the vsock control-plane socket with `VMADDR_FLAG_TO_HOST`.
    #[arg(long, default_value_t = false)]
    vsock_to_host: bool,

    #[arg(long, value_enum)]
    role: RoleArg,

    /// Leader address to dial. Required for the Follower role; used as the
    /// default peer when a `TriggerSync` request doesn't override it.
    #[arg(long)]
    peer_addr: Option<String>,
    /// TCP address the Leader's peer-to-peer listener binds. Leader role only.
    #[arg(long, default_value = "0.0.0.0:7500")]
    peer_listen_addr: String,

    #[arg(long)]
    state_file: String,

    #[arg(long, default_value = "nitro")]
    platform_profile: String,

    /// DER-encoded root certificate(s) for attestation chain validation.
    #[arg(long)]
    root_cert_file: String,

    #[arg(long)]
    committee_rpc_url: String,
    #[arg(long)]
    committee_contract: String,
    #[arg(long)]
    committee_min_signers: u32,

    #[arg(long, default_value_t = 300)]
    max_attestation_age_secs: u64,

    /// Use `qos_nsm::mock::MockNsm` instead of the real NSM device. Should
    /// never be used in production.
    #[arg(long, default_value_t = false)]
    mock_nsm: bool,
    /// Use an in-memory committee oracle seeded by test code, instead of
    /// `AlloySafeOracle`. Should never be used in production.
    #[arg(long, default_value_t = false)]
    mock_committee: bool,
}

impl Args {
    fn control_plane_addr(&self) -> SocketAddress {
        match (self.cid, self.port, &self.usock) {
            #[cfg(feature = "vsock")]
            (Some(c), Some(p), None) => SocketAddress::new_vsock(c, p, self.vsock_to_host_flag()),
            (None, None, Some(u)) => SocketAddress::new_unix(u),
            _ => panic!("invalid socket options: specify exactly one of --usock or --cid+--port"),
        }
    }

    #[cfg(feature = "vsock")]
    fn vsock_to_host_flag(&self) -> u8 {
        if self.vsock_to_host {
            qos_core::io::VMADDR_FLAG_TO_HOST
        } else {
            qos_core::io::VMADDR_NO_FLAGS
        }
    }

    fn role(&self) -> Role {
        match self.role {
            RoleArg::Leader => Role::Leader {
                peer_listen_addr: self.peer_listen_addr.clone(),
            },
            RoleArg::Follower => Role::Follower {
                default_peer_addr: self
                    .peer_addr
                    .clone()
                    .expect("--peer-addr is required for the follower role"),
            },
        }
    }
}

/// Key-sync app CLI.
pub struct Cli;
impl Cli {
    /// Parse `std::env::args()` and run the app. Panics if configuration or
    /// startup fails, so the app fails fast rather than serving from a bad
    /// state.
    pub fn execute() {
        let args = Args::parse();

        let config = AppConfig {
            control_plane_addr: args.control_plane_addr(),
            role: args.role(),
            state_file: args.state_file.clone(),
            platform_profile: args.platform_profile.clone(),
            root_cert_file: args.root_cert_file.clone(),
            committee_rpc_url: args.committee_rpc_url.clone(),
            committee_contract: args.committee_contract.clone(),
            committee_min_signers: args.committee_min_signers,
            max_attestation_age: Duration::from_secs(args.max_attestation_age_secs),
            mock_nsm: args.mock_nsm,
            mock_committee: args.mock_committee,
        };

        crate::run(config);
    }
}
