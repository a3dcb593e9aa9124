use async_trait::async_trait;
use common::domain::{
    DeviceInventory, DevicePage, DomainError, DomainResult, Filter, FilterRepository, PageRequest,
    Query,
};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// HAL page returned by the device listing endpoint
#[derive(Debug, Deserialize)]
struct HalDevicePage {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedDevices>,
    page: PageMetadata,
}

#[derive(Debug, Deserialize)]
struct EmbeddedDevices {
    #[serde(default)]
    devices: Vec<DeviceSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceSummary {
    unit_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageMetadata {
    total_pages: u32,
    number: u32,
}

impl From<HalDevicePage> for DevicePage {
    fn from(page: HalDevicePage) -> Self {
        DevicePage {
            device_ids: page
                .embedded
                .map(|embedded| embedded.devices.into_iter().map(|d| d.unit_id).collect())
                .unwrap_or_default(),
            page_index: page.page.number,
            total_pages: page.page.total_pages,
        }
    }
}

/// REST client for the device inventory service (device listing and stored filters)
pub struct DeviceServiceClient {
    base_url: String,
    client: Client,
}

impl DeviceServiceClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| DomainError::InvalidConfig(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| {
            DomainError::InvalidConfig(format!("Invalid device service URL '{}': {}", base_url, e))
        })?;

        Ok(Self { base_url, client })
    }

    /// `{base}/owners/{owner_id}/{resource...}` with every segment percent-encoded
    fn owner_url(&self, owner_id: &str, resource: &[&str]) -> DomainResult<Url> {
        let mut url = Url::parse(&self.base_url).map_err(|e| {
            DomainError::InvalidConfig(format!("Invalid device service URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                DomainError::InvalidConfig(format!(
                    "Device service URL cannot be a base: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .push("owners")
            .push(owner_id)
            .extend(resource);
        Ok(url)
    }
}

#[async_trait]
impl DeviceInventory for DeviceServiceClient {
    #[instrument(
        skip(self, query),
        fields(owner_id = %owner_id, page_index = page.page_index, page_size = page.page_size)
    )]
    async fn list_devices(
        &self,
        owner_id: &str,
        query: &Query,
        page: PageRequest,
    ) -> DomainResult<DevicePage> {
        let lookup_failed = |status: Option<StatusCode>, reason: String| {
            DomainError::InventoryLookupFailed {
                page_index: page.page_index,
                status: status.map(|s| s.as_u16()),
                reason,
            }
        };

        let url = self.owner_url(owner_id, &["devices"])?;
        let response = self
            .client
            .get(url)
            .query(&[
                ("query", query.to_json_string()),
                ("page", page.page_index.to_string()),
                ("size", page.page_size.to_string()),
                ("sort", page.sort.as_query_param().to_string()),
            ])
            .send()
            .await
            .map_err(|e| lookup_failed(e.status(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(lookup_failed(
                Some(status),
                format!("device service error: status {}", status),
            ));
        }

        let body: HalDevicePage = response
            .json()
            .await
            .map_err(|e| lookup_failed(Some(status), format!("invalid device page: {}", e)))?;
        let device_page = DevicePage::from(body);

        debug!(
            device_count = device_page.device_ids.len(),
            total_pages = device_page.total_pages,
            "listed devices"
        );
        Ok(device_page)
    }
}

#[async_trait]
impl FilterRepository for DeviceServiceClient {
    #[instrument(skip(self), fields(owner_id = %owner_id, filter_name = %filter_name))]
    async fn get_filter(&self, owner_id: &str, filter_name: &str) -> DomainResult<Filter> {
        let lookup_failed = |status: Option<StatusCode>, reason: String| {
            DomainError::FilterLookupFailed {
                filter_name: filter_name.to_string(),
                status: status.map(|s| s.as_u16()),
                reason,
            }
        };

        let url = self.owner_url(owner_id, &["filters", filter_name])?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| lookup_failed(e.status(), e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<Filter>()
                .await
                .map_err(|e| lookup_failed(Some(status), format!("invalid filter: {}", e))),
            StatusCode::NOT_FOUND => Err(lookup_failed(
                Some(StatusCode::NOT_FOUND),
                "filter not found".to_string(),
            )),
            status => Err(lookup_failed(
                Some(status),
                format!("device service error: status {}", status),
            )),
        }
    }
}
