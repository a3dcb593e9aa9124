use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // OpenTelemetry configuration
    /// Export traces and logs over OTLP
    #[serde(default)]
    pub otel_enabled: bool,

    /// OTLP gRPC collector endpoint
    #[serde(default = "default_otel_endpoint")]
    pub otel_endpoint: String,

    #[serde(default = "default_otel_service_name")]
    pub otel_service_name: String,

    // HTTP intake
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    // Remote services
    /// Device inventory service base URL
    #[serde(default = "default_device_service_base_url")]
    pub device_service_base_url: String,

    /// Authorization (token translation) service base URL
    #[serde(default = "default_authorization_service_base_url")]
    pub authorization_service_base_url: String,

    /// Connect and request timeout for both remote services
    #[serde(default = "default_http_client_timeout_secs")]
    pub http_client_timeout_secs: u64,

    // MQTT broker
    /// Broker URL (mqtt://host:port, tcp://host:port or host:port)
    #[serde(default = "default_mqtt_broker_url")]
    pub mqtt_broker_url: String,

    #[serde(default = "default_mqtt_keep_alive_secs")]
    pub mqtt_keep_alive_secs: u64,

    /// Upper bound on one connect-publish-disconnect session
    #[serde(default = "default_mqtt_session_timeout_secs")]
    pub mqtt_session_timeout_secs: u64,

    // Dispatch
    /// Devices requested per inventory page
    #[serde(default = "default_inventory_page_size")]
    pub inventory_page_size: u32,

    /// Publishes in flight while draining one page
    #[serde(default = "default_publish_concurrency")]
    pub publish_concurrency: usize,

    /// Dispatch jobs kept for status lookups
    #[serde(default = "default_dispatch_job_retention")]
    pub dispatch_job_retention: usize,

    /// Graceful shutdown budget for closers
    #[serde(default = "default_closer_timeout_secs")]
    pub closer_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_otel_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_otel_service_name() -> String {
    "messaging-service".to_string()
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_device_service_base_url() -> String {
    "http://localhost:8084".to_string()
}

fn default_authorization_service_base_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_http_client_timeout_secs() -> u64 {
    10
}

fn default_mqtt_broker_url() -> String {
    "mqtt://localhost:1883".to_string()
}

fn default_mqtt_keep_alive_secs() -> u64 {
    30
}

fn default_mqtt_session_timeout_secs() -> u64 {
    30
}

fn default_inventory_page_size() -> u32 {
    100
}

fn default_publish_concurrency() -> usize {
    1
}

fn default_dispatch_job_retention() -> usize {
    1000
}

fn default_closer_timeout_secs() -> u64 {
    10
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("MESSAGING"))
            .build()?
            .try_deserialize()
    }
}
