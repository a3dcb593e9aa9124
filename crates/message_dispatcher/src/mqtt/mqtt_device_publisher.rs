use crate::mqtt::{device_topic, sender_client_id};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use common::domain::{CallerIdentity, DevicePublisher, DomainError, DomainResult};
use rumqttc::{AsyncClient, Event, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info, instrument};

const DEFAULT_MQTT_PORT: u16 = 1883;

#[derive(Debug, Clone)]
pub struct MqttPublisherConfig {
    /// `mqtt://host:port`, `tcp://host:port` or `host:port`
    pub broker_url: String,
    pub keep_alive: Duration,
    /// Upper bound on one whole connect, publish, disconnect session
    pub session_timeout: Duration,
}

impl Default for MqttPublisherConfig {
    fn default() -> Self {
        Self {
            broker_url: "mqtt://localhost:1883".to_string(),
            keep_alive: Duration::from_secs(30),
            session_timeout: Duration::from_secs(30),
        }
    }
}

/// Delivers each message over its own short-lived broker session.
///
/// Every call connects with a clean session under the client id
/// `{api_key}.{device_id}.sender`, subscribes to the device topic, publishes
/// at QoS 1, waits for the broker acknowledgement and disconnects. Calls share
/// no connection state, so concurrent publishes never interfere. A transport
/// failure during disconnect fails the call even though the broker already
/// acknowledged the message.
pub struct MqttDevicePublisher {
    host: String,
    port: u16,
    keep_alive: Duration,
    session_timeout: Duration,
}

impl MqttDevicePublisher {
    pub fn new(config: MqttPublisherConfig) -> DomainResult<Self> {
        let (host, port) = parse_broker_url(&config.broker_url)?;
        info!(host = %host, port, "configured MQTT device publisher");

        Ok(Self {
            host: host.to_string(),
            port,
            keep_alive: config.keep_alive,
            session_timeout: config.session_timeout,
        })
    }

    async fn run_session(
        &self,
        client_id: String,
        topic: &str,
        message: &Bytes,
        retained: bool,
    ) -> anyhow::Result<()> {
        let mut mqtt_options = MqttOptions::new(client_id, self.host.clone(), self.port);
        mqtt_options.set_keep_alive(self.keep_alive);
        mqtt_options.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(mqtt_options, 10);

        client
            .subscribe(topic, QoS::AtLeastOnce)
            .await
            .context("failed to queue subscribe")?;
        client
            .publish(topic, QoS::AtLeastOnce, retained, message.to_vec())
            .await
            .context("failed to queue publish")?;

        let mut acknowledged = false;
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    debug!("connected to MQTT broker");
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    debug!("subscription acknowledged");
                }
                Ok(Event::Incoming(Packet::PubAck(_))) if !acknowledged => {
                    acknowledged = true;
                    debug!("publish acknowledged");
                    client
                        .disconnect()
                        .await
                        .context("failed to queue disconnect")?;
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => return Ok(()),
                Ok(_) => {}
                Err(e) if acknowledged => {
                    return Err(anyhow::anyhow!(
                        "MQTT connection failed while disconnecting after acknowledgement: {}",
                        e
                    ))
                }
                Err(e) => return Err(anyhow::anyhow!("MQTT event loop error: {}", e)),
            }
        }
    }
}

#[async_trait]
impl DevicePublisher for MqttDevicePublisher {
    #[instrument(
        name = "mqtt_publish",
        skip_all,
        fields(owner_id = %owner.id, device_id = %device_id, retained)
    )]
    async fn publish(
        &self,
        owner: &CallerIdentity,
        device_id: &str,
        message: &Bytes,
        retained: bool,
    ) -> DomainResult<()> {
        let topic = device_topic(&owner.api_key, device_id)?;
        let client_id = sender_client_id(&owner.api_key, device_id);

        let session = self.run_session(client_id, &topic, message, retained);
        match tokio::time::timeout(self.session_timeout, session).await {
            Ok(Ok(())) => {
                debug!(payload_len = message.len(), "message published");
                Ok(())
            }
            Ok(Err(e)) => Err(DomainError::BrokerPublishFailed {
                device_id: device_id.to_string(),
                reason: format!("{:#}", e),
            }),
            Err(_) => Err(DomainError::BrokerPublishFailed {
                device_id: device_id.to_string(),
                reason: format!("session timed out after {:?}", self.session_timeout),
            }),
        }
    }
}

/// Parse broker URL in format mqtt://host:port or tcp://host:port or host:port
pub fn parse_broker_url(url: &str) -> DomainResult<(&str, u16)> {
    let address = url.trim_start_matches("mqtt://");
    let address = address.trim_start_matches("tcp://");
    let address = address.trim_end_matches('/');

    let parts: Vec<&str> = address.split(':').collect();
    let (host, port) = match parts.len() {
        1 => (parts[0], DEFAULT_MQTT_PORT),
        2 => {
            let port = parts[1].parse::<u16>().map_err(|_| {
                DomainError::InvalidConfig(format!("Invalid port in broker URL: {}", parts[1]))
            })?;
            (parts[0], port)
        }
        _ => {
            return Err(DomainError::InvalidConfig(format!(
                "Invalid broker URL format: {}",
                url
            )))
        }
    };

    if host.is_empty() {
        return Err(DomainError::InvalidConfig(format!(
            "Missing host in broker URL: {}",
            url
        )));
    }
    Ok((host, port))
}
