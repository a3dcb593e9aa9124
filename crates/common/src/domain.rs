mod device;
mod filter;
mod identity;
mod publisher;
mod query;
mod result;

pub use device::*;
pub use filter::*;
pub use identity::*;
pub use publisher::*;
pub use query::*;
pub use result::*;
