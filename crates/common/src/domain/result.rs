use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Filter lookup failed for '{filter_name}' (status {status:?}): {reason}")]
    FilterLookupFailed {
        filter_name: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("Inventory lookup failed on page {page_index} (status {status:?}): {reason}")]
    InventoryLookupFailed {
        page_index: u32,
        status: Option<u16>,
        reason: String,
    },

    #[error("Broker publish failed for device {device_id}: {reason}")]
    BrokerPublishFailed { device_id: String, reason: String },

    #[error("Publish failed for {failed} of {attempted} devices")]
    PartialPublishFailure { failed: usize, attempted: usize },

    #[error("Invalid device ID: {0}")]
    InvalidDeviceId(String),

    #[error("Invalid filter name: {0}")]
    InvalidFilterName(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dispatch job not found: {0}")]
    DispatchJobNotFound(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),
}

impl DomainError {
    /// True for the remote-call failures that fold into a failed dispatch outcome
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            DomainError::FilterLookupFailed { .. }
                | DomainError::InventoryLookupFailed { .. }
                | DomainError::BrokerPublishFailed { .. }
                | DomainError::PartialPublishFailure { .. }
                | DomainError::RepositoryError(_)
        )
    }
}
