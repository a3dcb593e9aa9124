mod mqtt_device_publisher;
mod topic;

pub use mqtt_device_publisher::{parse_broker_url, MqttDevicePublisher, MqttPublisherConfig};
pub use topic::{device_topic, sender_client_id};
