mod config;

use common::telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig, TelemetryProviders};
use config::ServiceConfig;
use message_dispatcher::domain::DispatchConfig;
use message_dispatcher::message_dispatcher::{MessageDispatcher, MessageDispatcherConfig};
use message_dispatcher::mqtt::MqttPublisherConfig;
use messaging_runner::Runner;
use std::time::Duration;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let telemetry_providers: Option<TelemetryProviders> = match init_telemetry(&TelemetryConfig {
        service_name: config.otel_service_name.clone(),
        otel_endpoint: config.otel_endpoint.clone(),
        otel_enabled: config.otel_enabled,
        log_level: config.log_level.clone(),
    }) {
        Ok(providers) => providers,
        Err(e) => {
            eprintln!("Failed to initialize telemetry: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        otel_enabled = config.otel_enabled,
        http_port = config.http_port,
        "Starting messaging service"
    );
    debug!("Configuration: {:?}", config);

    let message_dispatcher = match MessageDispatcher::new(dispatcher_config(&config)) {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            error!("Failed to initialize message dispatcher: {:#}", e);
            shutdown_telemetry(telemetry_providers);
            std::process::exit(1);
        }
    };

    Runner::new()
        .with_named_process("message_dispatcher", message_dispatcher.into_runner_process())
        .with_closer(move || async move {
            info!("Running cleanup tasks...");
            shutdown_telemetry(telemetry_providers);
            Ok(())
        })
        .with_closer_timeout(Duration::from_secs(config.closer_timeout_secs))
        .run_and_exit()
        .await;
}

fn dispatcher_config(config: &ServiceConfig) -> MessageDispatcherConfig {
    MessageDispatcherConfig {
        http_host: config.http_host.clone(),
        http_port: config.http_port,
        device_service_base_url: config.device_service_base_url.clone(),
        authorization_service_base_url: config.authorization_service_base_url.clone(),
        http_client_timeout: Duration::from_secs(config.http_client_timeout_secs),
        mqtt: MqttPublisherConfig {
            broker_url: config.mqtt_broker_url.clone(),
            keep_alive: Duration::from_secs(config.mqtt_keep_alive_secs),
            session_timeout: Duration::from_secs(config.mqtt_session_timeout_secs),
        },
        dispatch: DispatchConfig {
            page_size: config.inventory_page_size,
            publish_concurrency: config.publish_concurrency,
        },
        job_retention: config.dispatch_job_retention,
    }
}
