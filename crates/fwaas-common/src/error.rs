//! Error types for orchestrator operations.
//!
//! Validation and concurrency-guard failures are raised synchronously to the
//! request caller before any persistence or dispatch happens. Reconciliation
//! anomalies reported by agents are never raised (there is no caller to
//! raise them to) and are absorbed into the firewall's `ERROR` status
//! instead.

use fwaas_types::{FirewallId, FirewallStatus, PolicyId, RouterId, RuleId, TenantId};
use thiserror::Error;

/// Result type alias for orchestrator operations.
pub type FwaasResult<T> = Result<T, FwaasError>;

/// Errors that can occur during orchestrator operations.
#[derive(Debug, Clone, Error)]
pub enum FwaasError {
    /// A mutation was attempted while a prior mutation is still in flight.
    ///
    /// Only one in-flight mutation per firewall is allowed; there is no
    /// queueing, the caller must retry once an agent acknowledgment settles
    /// the firewall.
    #[error(
        "Operation cannot be performed since firewall {firewall_id} \
         is in {pending_state}"
    )]
    FirewallInPendingState {
        /// The firewall with the in-flight mutation.
        firewall_id: FirewallId,
        /// Its current pending status.
        pending_state: FirewallStatus,
    },

    /// Requested attachment points already belong to another firewall.
    #[error("Routers already associated with another firewall: {router_ids:?}")]
    RoutersInUse {
        /// The conflicting routers.
        router_ids: Vec<RouterId>,
    },

    /// The tenant-scoped firewall limit was exceeded.
    ///
    /// The reference policy supports exactly one firewall per tenant.
    #[error(
        "Exceeded allowed count of firewalls for tenant {tenant_id}. \
         Only one firewall is supported per tenant"
    )]
    FirewallCountExceeded {
        /// The tenant at its limit.
        tenant_id: TenantId,
    },

    /// The rule is already held by a policy and cannot be inserted into
    /// another one.
    #[error("Firewall rule {rule_id} is already associated with policy {firewall_policy_id}")]
    RuleInUse {
        /// The contested rule.
        rule_id: RuleId,
        /// The policy currently holding it.
        firewall_policy_id: PolicyId,
    },

    /// The rule is not part of the policy it was asked to be removed from.
    #[error("Firewall rule {rule_id} is not associated with policy {firewall_policy_id}")]
    RuleNotInPolicy {
        /// The rule named in the request.
        rule_id: RuleId,
        /// The policy it is not part of.
        firewall_policy_id: PolicyId,
    },

    /// Firewall record not found.
    #[error("Firewall {firewall_id} could not be found")]
    FirewallNotFound {
        /// The missing firewall.
        firewall_id: FirewallId,
    },

    /// Firewall policy record not found.
    #[error("Firewall policy {firewall_policy_id} could not be found")]
    PolicyNotFound {
        /// The missing policy.
        firewall_policy_id: PolicyId,
    },

    /// Firewall rule record not found.
    #[error("Firewall rule {firewall_rule_id} could not be found")]
    RuleNotFound {
        /// The missing rule.
        firewall_rule_id: RuleId,
    },

    /// The persistence collaborator failed.
    #[error("Store operation failed: {operation}: {message}")]
    Store {
        /// The operation that failed (e.g., "transaction", "insert").
        operation: String,
        /// Error message from the store.
        message: String,
    },

    /// The router lookup collaborator failed.
    #[error("Router lookup failed: {message}")]
    Lookup {
        /// Error message from the lookup service.
        message: String,
    },

    /// The message transport failed to accept a broadcast.
    ///
    /// The dispatcher logs and swallows this; unreachable agents are not
    /// observable at this layer.
    #[error("Transport broadcast failed: {message}")]
    Transport {
        /// Error message from the transport.
        message: String,
    },
}

impl FwaasError {
    /// Creates a pending-state guard error.
    pub fn pending(firewall_id: FirewallId, pending_state: FirewallStatus) -> Self {
        Self::FirewallInPendingState {
            firewall_id,
            pending_state,
        }
    }

    /// Creates a store error.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a lookup error.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup {
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if this error is a request conflict the caller can
    /// resolve by retrying later or changing the request.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            FwaasError::FirewallInPendingState { .. }
                | FwaasError::RoutersInUse { .. }
                | FwaasError::FirewallCountExceeded { .. }
                | FwaasError::RuleInUse { .. }
        )
    }
}
