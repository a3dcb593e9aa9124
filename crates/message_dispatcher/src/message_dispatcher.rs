use crate::domain::{DispatchConfig, DispatchService, InMemoryDispatchJobStore};
use crate::http::{message_router, AuthorizationServiceClient, DeviceServiceClient, MessageApiState};
use crate::mqtt::{MqttDevicePublisher, MqttPublisherConfig};
use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct MessageDispatcherConfig {
    pub http_host: String,
    pub http_port: u16,
    pub device_service_base_url: String,
    pub authorization_service_base_url: String,
    pub http_client_timeout: Duration,
    pub mqtt: MqttPublisherConfig,
    pub dispatch: DispatchConfig,
    /// Finished and pending jobs kept for status lookups
    pub job_retention: usize,
}

pub struct MessageDispatcher {
    router: Router,
    addr: SocketAddr,
}

impl MessageDispatcher {
    pub fn new(config: MessageDispatcherConfig) -> anyhow::Result<Self> {
        debug!("initializing message dispatcher");

        let addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port)
            .parse()
            .with_context(|| {
                format!(
                    "invalid HTTP listen address {}:{}",
                    config.http_host, config.http_port
                )
            })?;

        let device_service = Arc::new(DeviceServiceClient::new(
            &config.device_service_base_url,
            config.http_client_timeout,
        )?);
        let authorization_service = Arc::new(AuthorizationServiceClient::new(
            &config.authorization_service_base_url,
            config.http_client_timeout,
        )?);
        let publisher = Arc::new(MqttDevicePublisher::new(config.mqtt)?);
        let job_store = Arc::new(InMemoryDispatchJobStore::new(config.job_retention));

        let dispatch_service = DispatchService::new(
            device_service.clone(),
            device_service,
            publisher,
            job_store,
            config.dispatch,
        )?;

        let router = message_router(MessageApiState {
            dispatch_service: Arc::new(dispatch_service),
            identity_provider: authorization_service,
        });

        Ok(Self { router, addr })
    }

    pub fn into_runner_process(
        self,
    ) -> impl FnOnce(
        CancellationToken,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>,
    > {
        move |ctx| Box::pin(async move { run_http_server(self.router, self.addr, ctx).await })
    }
}

async fn run_http_server(
    router: Router,
    addr: SocketAddr,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", addr))?;
    info!(address = %addr, "message intake listening");

    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        cancellation_token.cancelled().await;
        debug!("HTTP server shutdown signal received");
    });

    match serve.await {
        Ok(()) => {
            debug!("HTTP server stopped gracefully");
            Ok(())
        }
        Err(e) => {
            error!("HTTP server error: {}", e);
            Err(e.into())
        }
    }
}
