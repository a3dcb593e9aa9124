mod dispatch_config;
mod dispatch_job_store;
mod dispatch_outcome;
mod dispatch_service;
mod eligibility_query;
mod filter_resolver;
mod inventory_pager;
mod publish_gate;

pub use dispatch_config::*;
pub use dispatch_job_store::*;
pub use dispatch_outcome::*;
pub use dispatch_service::*;
pub use eligibility_query::*;
pub use filter_resolver::*;
pub use inventory_pager::*;
pub use publish_gate::*;
