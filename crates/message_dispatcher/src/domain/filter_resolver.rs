use common::domain::{DomainError, DomainResult, Filter, FilterRepository};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches a caller's named filter, translating every failure into a filter lookup error
pub struct FilterResolver {
    filters: Arc<dyn FilterRepository>,
}

impl FilterResolver {
    pub fn new(filters: Arc<dyn FilterRepository>) -> Self {
        Self { filters }
    }

    #[instrument(skip(self), fields(owner_id = %owner_id, filter_name = %filter_name))]
    pub async fn resolve_filter(&self, owner_id: &str, filter_name: &str) -> DomainResult<Filter> {
        if filter_name.trim().is_empty() {
            return Err(DomainError::InvalidFilterName(
                "Filter name cannot be empty".to_string(),
            ));
        }

        let filter = self
            .filters
            .get_filter(owner_id, filter_name)
            .await
            .map_err(|e| match e {
                DomainError::FilterLookupFailed { .. } => e,
                other => DomainError::FilterLookupFailed {
                    filter_name: filter_name.to_string(),
                    status: None,
                    reason: other.to_string(),
                },
            })?;

        debug!("resolved filter");
        Ok(filter)
    }
}
