use crate::domain::identity::CallerIdentity;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use bytes::Bytes;

/// Publishes one message to one device of an owner
///
/// Implementations should:
/// - Derive the topic from the owner's key and the device ID
/// - Publish with at-least-once delivery, honoring `retained`
/// - Keep every call isolated from other calls (no shared session)
/// - Return `DomainError::BrokerPublishFailed` on any transport failure
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DevicePublisher: Send + Sync {
    async fn publish(
        &self,
        owner: &CallerIdentity,
        device_id: &str,
        message: &Bytes,
        retained: bool,
    ) -> DomainResult<()>;
}
