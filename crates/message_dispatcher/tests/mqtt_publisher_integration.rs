#![cfg(feature = "integration-tests")]

use bytes::Bytes;
use common::domain::{CallerIdentity, DevicePublisher};
use common::telemetry::{init_telemetry, TelemetryConfig};
use message_dispatcher::mqtt::{MqttDevicePublisher, MqttPublisherConfig};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mosquitto::Mosquitto;
use tokio::time::timeout;

struct TestBroker {
    _container: ContainerAsync<Mosquitto>,
    broker_url: String,
    host: String,
    port: u16,
}

async fn start_broker() -> TestBroker {
    // Only the first test in the binary installs the subscriber
    let _ = init_telemetry(&TelemetryConfig {
        service_name: "messaging-service-test".to_string(),
        otel_endpoint: String::new(),
        otel_enabled: false,
        log_level: "debug".to_string(),
    });

    let container = Mosquitto::default().start().await.unwrap();
    let host = container.get_host().await.unwrap().to_string();
    let port = container.get_host_port_ipv4(1883).await.unwrap();

    TestBroker {
        broker_url: format!("mqtt://{}:{}", host, port),
        host,
        port,
        _container: container,
    }
}

fn publisher(broker: &TestBroker) -> MqttDevicePublisher {
    MqttDevicePublisher::new(MqttPublisherConfig {
        broker_url: broker.broker_url.clone(),
        keep_alive: Duration::from_secs(5),
        session_timeout: Duration::from_secs(10),
    })
    .unwrap()
}

/// Subscribe as a device would and return the first message delivered on `topic`
async fn receive_one(broker: &TestBroker, client_id: &str, topic: &str) -> (Bytes, bool) {
    let mut options = MqttOptions::new(client_id, broker.host.clone(), broker.port);
    options.set_keep_alive(Duration::from_secs(5));
    let (client, mut eventloop) = AsyncClient::new(options, 10);
    client.subscribe(topic, QoS::AtLeastOnce).await.unwrap();

    let received = timeout(Duration::from_secs(10), async {
        loop {
            if let Event::Incoming(Packet::Publish(publish)) = eventloop.poll().await.unwrap() {
                return (publish.payload, publish.retain);
            }
        }
    })
    .await
    .unwrap();

    let _ = client.disconnect().await;
    received
}

#[tokio::test]
async fn test_retained_message_reaches_device_topic() {
    let broker = start_broker().await;
    let publisher = publisher(&broker);
    let owner = CallerIdentity::new("user-1", "key-1");

    publisher
        .publish(&owner, "dev-a", &Bytes::from_static(b"reboot"), true)
        .await
        .unwrap();

    let (payload, retained) = receive_one(&broker, "dev-a-listener", "key-1/dev-a").await;
    assert_eq!(payload.as_ref(), b"reboot");
    assert!(retained);
}

#[tokio::test]
async fn test_live_subscriber_receives_non_retained_message() {
    let broker = start_broker().await;
    let publisher = publisher(&broker);
    let owner = CallerIdentity::new("user-1", "key-1");

    let listener = {
        let broker_host = broker.host.clone();
        let broker_port = broker.port;
        tokio::spawn(async move {
            let mut options = MqttOptions::new("dev-b-listener", broker_host, broker_port);
            options.set_keep_alive(Duration::from_secs(5));
            let (client, mut eventloop) = AsyncClient::new(options, 10);
            client.subscribe("key-1/dev-b", QoS::AtLeastOnce).await.unwrap();
            loop {
                match eventloop.poll().await.unwrap() {
                    Event::Incoming(Packet::Publish(publish)) => return publish.payload,
                    _ => continue,
                }
            }
        })
    };
    // Give the listener time to subscribe
    tokio::time::sleep(Duration::from_millis(500)).await;

    publisher
        .publish(&owner, "dev-b", &Bytes::from_static(b"hello"), false)
        .await
        .unwrap();

    let payload = timeout(Duration::from_secs(10), listener)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload.as_ref(), b"hello");
}

#[tokio::test]
async fn test_concurrent_publishes_use_isolated_sessions() {
    let broker = start_broker().await;
    let publisher = publisher(&broker);
    let owner = CallerIdentity::new("user-1", "key-1");

    let message = Bytes::from_static(b"firmware");
    let results = futures::future::join_all(
        ["dev-1", "dev-2", "dev-3"]
            .into_iter()
            .map(|device_id| publisher.publish(&owner, device_id, &message, true)),
    )
    .await;

    assert!(results.iter().all(|r| r.is_ok()));
    for device_id in ["dev-1", "dev-2", "dev-3"] {
        let (payload, _) = receive_one(
            &broker,
            &format!("{}-listener", device_id),
            &format!("key-1/{}", device_id),
        )
        .await;
        assert_eq!(payload.as_ref(), b"firmware");
    }
}
