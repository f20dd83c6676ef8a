//! Firewall lifecycle status.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a firewall record.
///
/// Transitions are driven from two sides: the orchestrator moves a firewall
/// into a `Pending*` state when it dispatches work to agents, and the
/// acknowledgment handler moves it to a settled state when an agent reports
/// back. A firewall with no attached routers never leaves [`Inactive`]
/// through the agent path.
///
/// [`Inactive`]: FirewallStatus::Inactive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirewallStatus {
    /// No routers attached; nothing is enforced anywhere.
    #[serde(rename = "INACTIVE")]
    Inactive,
    /// At least one agent reported the firewall as applied and passing
    /// traffic per its rules.
    #[serde(rename = "ACTIVE")]
    Active,
    /// Applied but administratively down.
    #[serde(rename = "DOWN")]
    Down,
    /// Creation dispatched, no acknowledgment yet.
    #[serde(rename = "PENDING_CREATE")]
    PendingCreate,
    /// Update dispatched, no acknowledgment yet.
    #[serde(rename = "PENDING_UPDATE")]
    PendingUpdate,
    /// Deletion dispatched, waiting for agents to tear down.
    #[serde(rename = "PENDING_DELETE")]
    PendingDelete,
    /// An agent reported something unexpected. Recoverable: the next
    /// successful mutation clears it, and deletion is always permitted.
    #[serde(rename = "ERROR")]
    Error,
}

impl FirewallStatus {
    /// Returns true if a mutation is currently in flight.
    ///
    /// A pending firewall rejects further mutating requests until an agent
    /// acknowledgment settles it (the per-firewall concurrency guard).
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            FirewallStatus::PendingCreate
                | FirewallStatus::PendingUpdate
                | FirewallStatus::PendingDelete
        )
    }

    /// Returns the wire spelling of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            FirewallStatus::Inactive => "INACTIVE",
            FirewallStatus::Active => "ACTIVE",
            FirewallStatus::Down => "DOWN",
            FirewallStatus::PendingCreate => "PENDING_CREATE",
            FirewallStatus::PendingUpdate => "PENDING_UPDATE",
            FirewallStatus::PendingDelete => "PENDING_DELETE",
            FirewallStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for FirewallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FirewallStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "INACTIVE" => FirewallStatus::Inactive,
            "ACTIVE" => FirewallStatus::Active,
            "DOWN" => FirewallStatus::Down,
            "PENDING_CREATE" => FirewallStatus::PendingCreate,
            "PENDING_UPDATE" => FirewallStatus::PendingUpdate,
            "PENDING_DELETE" => FirewallStatus::PendingDelete,
            "ERROR" => FirewallStatus::Error,
            other => return Err(ParseError::InvalidStatus(other.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_is_pending() {
        assert!(FirewallStatus::PendingCreate.is_pending());
        assert!(FirewallStatus::PendingUpdate.is_pending());
        assert!(FirewallStatus::PendingDelete.is_pending());
        assert!(!FirewallStatus::Active.is_pending());
        assert!(!FirewallStatus::Inactive.is_pending());
        assert!(!FirewallStatus::Error.is_pending());
    }

    #[test]
    fn test_wire_spelling_roundtrip() {
        for status in [
            FirewallStatus::Inactive,
            FirewallStatus::Active,
            FirewallStatus::Down,
            FirewallStatus::PendingCreate,
            FirewallStatus::PendingUpdate,
            FirewallStatus::PendingDelete,
            FirewallStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<FirewallStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_invalid_status() {
        assert!("BOGUS".parse::<FirewallStatus>().is_err());
    }

    #[test]
    fn test_serde_uses_wire_spelling() {
        let json = serde_json::to_string(&FirewallStatus::PendingCreate).unwrap();
        assert_eq!(json, "\"PENDING_CREATE\"");
    }
}
