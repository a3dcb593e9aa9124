use crate::domain::query::Query;
use crate::domain::result::DomainResult;
use async_trait::async_trait;
use serde::Deserialize;

/// Named, stored device predicate owned by a caller.
///
/// Read-only here; the inventory service owns its lifecycle.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Filter {
    pub name: String,
    pub query: Query,
}

/// Filter lookup on the inventory service
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FilterRepository: Send + Sync {
    /// Fetch the owner's filter by name
    ///
    /// Fails with `DomainError::FilterLookupFailed` when the filter does not
    /// exist, the owner cannot access it, or the remote call errors.
    async fn get_filter(&self, owner_id: &str, filter_name: &str) -> DomainResult<Filter>;
}
