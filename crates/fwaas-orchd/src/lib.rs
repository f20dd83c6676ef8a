//! fworchd - FWaaS control-plane orchestrator daemon.
//!
//! Owns the authoritative lifecycle state of firewalls, firewall policies,
//! and firewall rules. CRUD requests are validated against the lifecycle
//! state machine, translated into enforcement instructions broadcast to
//! agents (fire-and-forget), and reconciled later from the agents'
//! asynchronous acknowledgments:
//!
//! - [`attachment`]: router set resolution, claim validation, diffing
//! - [`dispatch`]: the three-operation agent notification contract
//! - [`callbacks`]: the inbound acknowledgment/reconciliation surface
//! - [`plugin`]: the orchestrator composing all of the above
//! - [`topics`]: topic and method name constants of the wire contract

pub mod attachment;
pub mod callbacks;
pub mod dispatch;
pub mod plugin;
pub mod topics;

pub use attachment::{diff, AttachmentDiff, AttachmentResolver};
pub use callbacks::FirewallCallbacks;
pub use dispatch::{FanoutDispatcher, FirewallAgentApi};
pub use plugin::FirewallPlugin;
