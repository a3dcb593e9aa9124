use bytes::Bytes;
use serde::Serialize;

/// Who should receive a message and what to send them.
///
/// With both lists empty the message goes to every device of the caller.
/// A device reachable both by an explicit ID and through a filter receives
/// the message once per route.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub device_ids: Vec<String>,
    pub filter_names: Vec<String>,
    pub message: Bytes,
    pub retained: bool,
}

impl DispatchRequest {
    pub fn targets_all_devices(&self) -> bool {
        self.device_ids.is_empty() && self.filter_names.is_empty()
    }
}

/// Aggregate result of one dispatch: success only if every lookup and every publish succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchOutcome {
    Succeeded,
    Failed,
}

impl DispatchOutcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            DispatchOutcome::Succeeded
        } else {
            DispatchOutcome::Failed
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DispatchOutcome::Succeeded)
    }

    /// Reduce branch outcomes; an empty set of branches succeeds
    pub fn all<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = DispatchOutcome>,
    {
        Self::from_success(outcomes.into_iter().all(|o| o.is_success()))
    }
}
