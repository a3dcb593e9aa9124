pub mod domain;
pub mod telemetry;

// Re-export mocks when testing feature is enabled
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDeviceInventory;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockDevicePublisher;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockFilterRepository;
#[cfg(any(test, feature = "testing"))]
pub use domain::MockIdentityProvider;
