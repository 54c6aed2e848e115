use qos_core::io::SocketAddress;
use tokio::sync::{mpsc, oneshot};

use health_check::AppHealthCheckable;
use host_primitives::{spawn_queue_consumer, wait_for_sigterm, ENCLAVE_QUEUE_CAPACITY, GRPC_MAX_RECV_MSG_SIZE};

use keysync_proto::generated::key_sync_service_server::{KeySyncService, KeySyncServiceServer};
use keysync_proto::{enclave_request, enclave_response, EnclaveRequest, EnclaveResponse, HealthCheckRequest, TriggerSyncRequest, TriggerSyncResponse};

type EnclaveQueueMsg = host_primitives::EnclaveQueueMsg<EnclaveRequest, EnclaveResponse>;

/// Host `gRPC` server.
#[derive(Debug)]
pub struct Host {
    queue_tx: mpsc::Sender<Box<EnclaveQueueMsg>>,
}

impl Host {
    fn new(queue_tx: mpsc::Sender<Box<EnclaveQueueMsg>>) -> Self {
        Self { queue_tx }
    }

    /// Start the host server.
    pub async fn listen(
        listen_addr: std::net::SocketAddr,
        enclave_addr: SocketAddress,
    ) -> Result<(), tonic::transport::Error> {
        let reflection_service = tonic_reflection::server::Builder::configure()
            .register_encoded_file_descriptor_set(keysync_proto::generated::FILE_DESCRIPTOR_SET)
            .build()
            .expect("failed to start reflection service");

        let (queue_tx, queue_rx) = mpsc::channel::<Box<EnclaveQueueMsg>>(ENCLAVE_QUEUE_CAPACITY);

        let app_checker = Health {
            queue_tx: queue_tx.clone(),
        };

        let host = Host::new(queue_tx);
        spawn_queue_consumer(enclave_addr, queue_rx);

        let health_server = health_check::spawn_k8s_health_checker(std::sync::Arc::new(app_checker)).await;

        tracing::info!(%listen_addr, "key-sync host listening");

        let (sigterm_sender, sigterm_receiver) = oneshot::channel();
        tokio::task::spawn(wait_for_sigterm(sigterm_sender));

        tonic::transport::Server::builder()
            .add_service(reflection_service)
            .add_service(health_server)
            .add_service(KeySyncServiceServer::new(host).max_decoding_message_size(GRPC_MAX_RECV_MSG_SIZE))
            .serve_with_shutdown(listen_addr, async {
                sigterm_receiver.await.ok();
                tracing::info!("SIGTERM received");
            })
            .await
    }
}

#[tonic::async_trait]
impl KeySyncService for Host {
    async fn trigger_sync(
        &self,
        request: tonic::Request<TriggerSyncRequest>,
    ) -> Result<tonic::Response<TriggerSyncResponse>, tonic::Status> {
        let enclave_request = EnclaveRequest {
            kind: Some(enclave_request::Kind::TriggerSync(request.into_inner())),
        };

        let enclave_response = host_primitives::send_queue_msg(enclave_request, &self.queue_tx).await?;

        match enclave_response.kind {
            Some(enclave_response::Kind::TriggerSync(resp)) => Ok(tonic::Response::new(resp)),
            _ => Err(tonic::Status::internal("unexpected enclave response to TriggerSync")),
        }
    }
}

struct Health {
    queue_tx: mpsc::Sender<Box<EnclaveQueueMsg>>,
}

#[tonic::async_trait]
impl AppHealthCheckable for Health {
    async fn app_health_check(&self) -> Result<tonic::Response<health_check::AppHealthResponse>, tonic::Status> {
        let enclave_request = EnclaveRequest {
            kind: Some(enclave_request::Kind::Health(HealthCheckRequest {})),
        };

        let enclave_response = host_primitives::send_queue_msg(enclave_request, &self.queue_tx).await?;

        let ok = matches!(
            enclave_response.kind,
            Some(enclave_response::Kind::Health(r)) if r.ok
        );

        Ok(tonic::Response::new(health_check::AppHealthResponse {
            code: if ok { 200 } else { 503 },
        }))
    }
}
