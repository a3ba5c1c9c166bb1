//! Crawl engine
//!
//! One orchestrator per run, one frontier per domain, two admission gates
//! per fetch. Domains are crawled by isolated tasks; a failure inside one
//! domain never crosses into another.

mod frontier;
mod gates;
mod orchestrator;

pub use frontier::DomainFrontier;
pub use gates::{AdmissionGates, FetchPermit};
pub use orchestrator::crawl_domains;
