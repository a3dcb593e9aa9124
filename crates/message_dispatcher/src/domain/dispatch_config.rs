use common::domain::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Devices requested per inventory page (default: 100)
    pub page_size: u32,

    /// Publishes in flight at once while draining a page (default: 1, sequential)
    pub publish_concurrency: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            publish_concurrency: 1,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> DomainResult<()> {
        if self.page_size == 0 {
            return Err(DomainError::InvalidConfig(
                "page_size must be at least 1".to_string(),
            ));
        }
        if self.publish_concurrency == 0 {
            return Err(DomainError::InvalidConfig(
                "publish_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
