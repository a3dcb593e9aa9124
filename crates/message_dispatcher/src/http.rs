mod authorization_service_client;
mod device_service_client;
mod message_api;

pub use authorization_service_client::{AuthorizationServiceClient, AUTH_TOKEN_HEADER};
pub use device_service_client::DeviceServiceClient;
pub use message_api::{message_router, DispatchParams, MessageApiState};
