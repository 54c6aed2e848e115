//! Generated protobuf/tonic bindings for the key-sync control plane,
//! shared by `keysync_app` and `keysync_host` so the gRPC-facing
//! `TriggerSyncRequest`/`TriggerSyncResponse` types are also exactly what
//! crosses the host/enclave queue, with no intermediate conversion.

#![allow(missing_docs)]

pub mod generated {
    include!(concat!(env!("OUT_DIR"), "/services.keysync.v1.rs"));

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        include_bytes!(concat!(env!("OUT_DIR"), "/keysync_descriptor.bin"));
}

pub use generated::{
    enclave_request, enclave_response, key_sync_service_client, key_sync_service_server,
    EnclaveRequest, EnclaveResponse, HealthCheckRequest, HealthCheckResponse, TriggerSyncRequest,
    TriggerSyncResponse,
};
