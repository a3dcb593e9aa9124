use common::domain::{DeviceInventory, DomainResult, PageRequest, Query};
use futures::{stream, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Counters for one completed inventory walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageWalkSummary {
    pub pages_fetched: u32,
    pub devices_visited: usize,
    pub failed_devices: usize,
}

impl PageWalkSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed_devices == 0
    }
}

/// Walks the paginated device inventory in ascending first-seen order.
///
/// Each page is fully drained before the next one is requested. A failing
/// device callback is counted and the walk goes on; a failing page fetch ends
/// the walk with that error.
pub struct InventoryPager {
    inventory: Arc<dyn DeviceInventory>,
    page_size: u32,
    concurrency: usize,
}

impl InventoryPager {
    pub fn new(inventory: Arc<dyn DeviceInventory>, page_size: u32, concurrency: usize) -> Self {
        Self {
            inventory,
            page_size: page_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    #[instrument(skip_all, fields(owner_id = %owner_id, page_size = self.page_size))]
    pub async fn for_each_device<F, Fut>(
        &self,
        owner_id: &str,
        query: &Query,
        on_device: F,
    ) -> DomainResult<PageWalkSummary>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = DomainResult<()>>,
    {
        let mut summary = PageWalkSummary::default();
        let mut page_index = 0u32;

        loop {
            let page = self
                .inventory
                .list_devices(
                    owner_id,
                    query,
                    PageRequest::first_seen_ascending(page_index, self.page_size),
                )
                .await?;
            summary.pages_fetched += 1;

            debug!(
                page_index,
                total_pages = page.total_pages,
                device_count = page.device_ids.len(),
                "fetched inventory page"
            );

            let results: Vec<DomainResult<()>> = stream::iter(page.device_ids)
                .map(&on_device)
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

            for result in results {
                summary.devices_visited += 1;
                if let Err(e) = result {
                    summary.failed_devices += 1;
                    warn!(page_index, error = %e, "device callback failed");
                }
            }

            if !has_next_page(page_index, page.total_pages) {
                break;
            }
            page_index += 1;
        }

        debug!(
            pages_fetched = summary.pages_fetched,
            devices_visited = summary.devices_visited,
            failed_devices = summary.failed_devices,
            "inventory walk complete"
        );
        Ok(summary)
    }
}

/// The walk continues while the page just fetched is not the last one
fn has_next_page(fetched_index: u32, total_pages: u32) -> bool {
    fetched_index.saturating_add(1) < total_pages
}
