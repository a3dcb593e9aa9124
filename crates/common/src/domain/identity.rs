use crate::domain::result::DomainResult;
use async_trait::async_trait;
use std::fmt;

/// Authenticated caller on whose behalf devices are targeted.
///
/// `api_key` is the caller's secret key and namespaces every broker topic;
/// it is redacted from `Debug` output so it never reaches the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub id: String,
    pub api_key: String,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            api_key: api_key.into(),
        }
    }
}

impl fmt::Debug for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallerIdentity")
            .field("id", &self.id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Translates a caller-presented credential token into a caller identity.
///
/// Implementations return `DomainError::Unauthenticated` when the token is
/// missing, invalid, or cannot be verified.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn identity_from_token(&self, token: &str) -> DomainResult<CallerIdentity>;
}
