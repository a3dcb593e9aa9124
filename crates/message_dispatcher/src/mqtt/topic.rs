use common::domain::{DomainError, DomainResult};

/// Topic a device listens on: `{api_key}/{device_id}`
///
/// Both segments must be non-empty and free of `/` and MQTT wildcards so the
/// topic addresses exactly one device.
pub fn device_topic(api_key: &str, device_id: &str) -> DomainResult<String> {
    validate_segment(api_key, "API key")?;
    validate_segment(device_id, "Device ID")?;
    Ok(format!("{}/{}", api_key, device_id))
}

/// Client identifier of the short-lived sender session for one device
pub fn sender_client_id(api_key: &str, device_id: &str) -> String {
    format!("{}.{}.sender", api_key, device_id)
}

fn validate_segment(segment: &str, what: &str) -> DomainResult<()> {
    if segment.trim().is_empty() {
        return Err(DomainError::InvalidDeviceId(format!(
            "{} cannot be empty in topic",
            what
        )));
    }
    if segment.trim() != segment {
        return Err(DomainError::InvalidDeviceId(format!(
            "{} '{}' must not have surrounding whitespace",
            what, segment
        )));
    }
    if segment.contains(['/', '+', '#']) {
        return Err(DomainError::InvalidDeviceId(format!(
            "{} '{}' must not contain '/', '+' or '#'",
            what, segment
        )));
    }
    Ok(())
}
