//! # Tenant Module
//!
//! A tenant is an isolated identity context ("wallet") served by this agent. Many tenants share
//! one network endpoint, so an inbound envelope never names its tenant: it has to be resolved.
//!
//! ## Module Structure
//!
//! - [`types`] - [`TenantID`], [`TenantError`] and the [`RoutingTable`], [`TenantDirectory`], [`TenantResolver`] seams
//! - [`tenant`] - the [`Tenant`] context itself, minting keys always registers them for routing
//! - [`domain`] - the agent's own [`Domain`] context which removes the outermost forward layer
//! - [`pool`] - reference counted [`TenantHandle`]s, released on drop
//! - [`resolver`] - [`RoutingResolver`], routing table first, trial decryption as a bounded fallback
//! - [`memory`] - in-memory routing table and tenant directory
//!
//! ## Resolution
//!
//! ```text
//! wire envelope
//!   ├── domain key opens it?  yes -> forward{to, msg} -> routing table[to] -> tenant
//!   │                         no  -> trial decryption with every tenant's primary key
//!   └── while the decrypted message is a forward: routing table[to] -> open the next layer
//! ```
pub mod domain;
pub mod memory;
pub mod pool;
pub mod resolver;
#[allow(clippy::module_inception)]
pub mod tenant;
pub mod types;

pub use domain::Domain;
pub use memory::{MemoryRoutes, MemoryTenants};
pub use pool::{HandlePool, TenantHandle};
pub use resolver::RoutingResolver;
pub use tenant::Tenant;
pub use types::{Resolved, RoutingTable, TenantDirectory, TenantError, TenantID, TenantResolver};
