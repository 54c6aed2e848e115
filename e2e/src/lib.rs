//! Utils for e2e tests. See `/tests` for e2e tests.

pub mod keysync;
pub mod qos_simulator;

/// Local host IP address.
pub const LOCAL_HOST: &str = "127.0.0.1";
/// Max gRPC message size (25MB).
pub const GRPC_MAX_RECV_MSG_SIZE: usize = 26_214_400;
