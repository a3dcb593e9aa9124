pub mod domain;
pub mod http;
pub mod message_dispatcher;
pub mod mqtt;
