//! gRPC key-sync host service: bridges `KeySyncService`/`TriggerSync` gRPC
//! calls to the enclave app over `qos_core`'s proxy protocol, queueing
//! requests onto a channel a single consumer task drains against the
//! enclave's unix/vsock socket.

use qos_core::io::SocketAddress;

pub mod cli;
mod host;

/// Configuration for running the key-sync gRPC host.
pub struct KeySyncHostConfig {
    pub listen_addr: std::net::SocketAddr,
    pub enclave_addr: SocketAddress,
}

/// Run the key-sync gRPC host.
pub async fn run(
    KeySyncHostConfig {
        listen_addr,
        enclave_addr,
    }: KeySyncHostConfig,
) -> Result<(), tonic::transport::Error> {
    host::listen(listen_addr, enclave_addr).await
}
