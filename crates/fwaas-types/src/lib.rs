//! Common FWaaS types for firewall control-plane orchestration.
//!
//! This crate provides type-safe representations of the entities the
//! orchestrator manages and the payloads it exchanges with agents:
//!
//! - [`FirewallId`], [`PolicyId`], [`RuleId`], [`RouterId`], [`TenantId`]:
//!   newtyped identities
//! - [`FirewallStatus`]: the firewall lifecycle state machine's states
//! - [`Firewall`], [`FirewallPolicy`], [`FirewallRule`]: authoritative records
//! - [`FirewallSpec`], [`FirewallUpdate`], [`RouterRequest`]: request bodies
//! - [`FirewallWithRules`], [`AgentMessage`]: the agent notification wire
//!   contract

mod firewall;
mod id;
mod payload;
mod status;

pub use firewall::{
    Firewall, FirewallPolicy, FirewallPolicyUpdate, FirewallRule, FirewallRuleUpdate,
    FirewallSpec, FirewallUpdate, FirewallWithRouters, RuleAction, RulePlacement,
};
pub use id::{FirewallId, PolicyId, RouterId, RuleId, TenantId};
pub use payload::{AgentMessage, AgentMethod, FirewallWithRules, RouterRequest};
pub use status::FirewallStatus;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid firewall status: {0}")]
    InvalidStatus(String),

    #[error("invalid rule action: {0}")]
    InvalidRuleAction(String),
}
