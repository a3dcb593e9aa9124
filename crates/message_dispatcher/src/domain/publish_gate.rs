use common::domain::{DomainError, DomainResult};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Admission control for the broker sessions of one dispatch.
///
/// At most `concurrency` sessions are open at once across every branch. Every
/// session for a device connects with the same client ID, so a device reached
/// by more than one route is published to one session at a time.
pub struct PublishGate {
    sessions: Semaphore,
    devices: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl PublishGate {
    pub fn new(concurrency: usize) -> Self {
        Self {
            sessions: Semaphore::new(concurrency.max(1)),
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Run `publish` once a session slot and the device's lock are both held.
    ///
    /// The session slot is taken first; a holder of a device lock therefore
    /// always holds a slot and can finish.
    pub async fn run<F>(&self, device_id: &str, publish: F) -> DomainResult<()>
    where
        F: Future<Output = DomainResult<()>>,
    {
        let _session = self
            .sessions
            .acquire()
            .await
            .map_err(|_| gate_closed(device_id))?;

        let device_lock = self.device_lock(device_id)?;
        let result = match device_lock.acquire().await {
            Ok(_device) => publish.await,
            Err(_) => Err(gate_closed(device_id)),
        };

        drop(device_lock);
        self.release_device(device_id);
        result
    }

    fn device_lock(&self, device_id: &str) -> DomainResult<Arc<Semaphore>> {
        let mut devices = self.devices.lock().map_err(|_| gate_closed(device_id))?;
        Ok(devices
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(1)))
            .clone())
    }

    /// Forget the device once no publish holds or waits on its lock
    fn release_device(&self, device_id: &str) {
        if let Ok(mut devices) = self.devices.lock() {
            if devices
                .get(device_id)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                devices.remove(device_id);
            }
        }
    }

    #[cfg(test)]
    fn tracked_devices(&self) -> usize {
        self.devices.lock().map(|d| d.len()).unwrap_or_default()
    }
}

fn gate_closed(device_id: &str) -> DomainError {
    DomainError::BrokerPublishFailed {
        device_id: device_id.to_string(),
        reason: "publish gate unavailable".to_string(),
    }
}
