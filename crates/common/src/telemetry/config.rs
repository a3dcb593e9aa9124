use opentelemetry_sdk::{logs::LoggerProvider, trace::TracerProvider as SdkTracerProvider};

/// Console logging level and optional OTLP export target
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Reported as `service.name` on exported spans and logs
    pub service_name: String,
    /// OTLP/gRPC collector, only dialed when `otel_enabled` is set
    pub otel_endpoint: String,
    pub otel_enabled: bool,
    /// Fallback directive when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "messaging-service".to_string(),
            otel_endpoint: "http://localhost:4317".to_string(),
            otel_enabled: false,
            log_level: "info".to_string(),
        }
    }
}

/// Exporting providers of an OTLP-enabled process; flushed by `shutdown_telemetry`
pub struct TelemetryProviders {
    pub tracer_provider: SdkTracerProvider,
    pub logger_provider: LoggerProvider,
}
