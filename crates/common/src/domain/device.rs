use crate::domain::query::Query;
use crate::domain::result::DomainResult;
use async_trait::async_trait;

/// Sort order requested from the inventory listing.
///
/// Only ascending first-seen order is used: combined with the first-seen time
/// bound it keeps page boundaries stable across sequential fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSort {
    FirstSeenAscending,
}

impl DeviceSort {
    /// Value of the inventory `sort` query parameter
    pub fn as_query_param(&self) -> &'static str {
        match self {
            DeviceSort::FirstSeenAscending => "firstSeen,asc",
        }
    }
}

/// One page request against the device inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_index: u32,
    pub page_size: u32,
    pub sort: DeviceSort,
}

impl PageRequest {
    pub fn first_seen_ascending(page_index: u32, page_size: u32) -> Self {
        Self {
            page_index,
            page_size,
            sort: DeviceSort::FirstSeenAscending,
        }
    }
}

/// Ordered batch of device identifiers plus pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DevicePage {
    pub device_ids: Vec<String>,
    pub page_index: u32,
    pub total_pages: u32,
}

/// Paginated device listing of the inventory service
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceInventory: Send + Sync {
    /// Fetch one page of the owner's devices matching `query`
    ///
    /// Fails with `DomainError::InventoryLookupFailed` on any remote error.
    async fn list_devices(
        &self,
        owner_id: &str,
        query: &Query,
        page: PageRequest,
    ) -> DomainResult<DevicePage>;
}
