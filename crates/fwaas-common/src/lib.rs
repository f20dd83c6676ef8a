//! Common infrastructure for the FWaaS control-plane orchestrator.
//!
//! This crate provides what every part of the orchestrator shares:
//!
//! - [`error`]: the `FwaasError` taxonomy surfaced to request callers
//! - [`store`]: the persistence collaborator interface ([`FirewallStore`]
//!   and its transaction view [`StoreTxn`])
//! - [`services`]: network-facing collaborator traits ([`RouterLookup`],
//!   [`AgentBroadcast`])
//! - [`memory`]: a reference in-memory transactional store for tests and
//!   single-process deployments
//!
//! # Architecture
//!
//! The orchestrator never owns durable state or a message bus; it reaches
//! both through the traits defined here, injected at construction time. The
//! store's transaction closure is the only serialization primitive in the
//! system: one closure invocation is one atomic unit, which is where the
//! per-firewall read-status-then-write guard gets its atomicity.

pub mod error;
pub mod memory;
pub mod services;
pub mod store;

pub use error::{FwaasError, FwaasResult};
pub use memory::MemoryStore;
pub use services::{AgentBroadcast, RouterLookup};
pub use store::{FirewallStore, StoreTxn};
