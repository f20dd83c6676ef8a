//! Wire payloads exchanged with enforcement agents.

use crate::firewall::{Firewall, FirewallRule};
use crate::id::RouterId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attachment points requested on firewall creation.
///
/// Distinguishes "caller said nothing" (attach every router the tenant owns)
/// from "caller said none" (attach nothing, stay `INACTIVE`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouterRequest {
    /// No router list in the request; resolve to all tenant routers.
    #[default]
    Unspecified,
    /// Explicit router list, possibly empty.
    Routers(Vec<RouterId>),
}

impl RouterRequest {
    /// Explicit empty list (attach nothing).
    pub const fn none() -> Self {
        RouterRequest::Routers(Vec::new())
    }
}

impl From<Vec<RouterId>> for RouterRequest {
    fn from(routers: Vec<RouterId>) -> Self {
        RouterRequest::Routers(routers)
    }
}

/// Full firewall payload broadcast to agents.
///
/// Carries the firewall core fields, the resolved rule list from its policy,
/// and the attachment diff the agents must act on. `last-router` is only set
/// on the update path and tells agents the final attachment is being removed,
/// so their acknowledgment should carry terminal `DOWN`/`INACTIVE` semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallWithRules {
    /// Firewall core fields, flattened into the payload.
    #[serde(flatten)]
    pub firewall: Firewall,
    /// Resolved rules from the firewall's policy, in enforcement order.
    pub firewall_rule_list: Vec<FirewallRule>,
    /// Routers the firewall is being attached to.
    #[serde(rename = "add-router-ids")]
    pub add_router_ids: Vec<RouterId>,
    /// Routers the firewall is being detached from.
    #[serde(rename = "del-router-ids")]
    pub del_router_ids: Vec<RouterId>,
    /// True when the update removes the final attachment.
    #[serde(rename = "last-router", default, skip_serializing_if = "Option::is_none")]
    pub last_router: Option<bool>,
}

impl FirewallWithRules {
    /// Wraps a firewall and its rules with an empty attachment diff.
    pub fn new(firewall: Firewall, firewall_rule_list: Vec<FirewallRule>) -> Self {
        Self {
            firewall,
            firewall_rule_list,
            add_router_ids: Vec::new(),
            del_router_ids: Vec::new(),
            last_router: None,
        }
    }
}

/// The three operations the dispatcher may ask agents to perform.
///
/// The contract is fixed; there is no open-ended method dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentMethod {
    /// Apply a new firewall on the added routers.
    #[serde(rename = "create_firewall")]
    CreateFirewall,
    /// Reconcile rule set and attachment diff.
    #[serde(rename = "update_firewall")]
    UpdateFirewall,
    /// Tear the firewall down everywhere and report deletion.
    #[serde(rename = "delete_firewall")]
    DeleteFirewall,
}

impl AgentMethod {
    /// Returns the wire spelling of this method.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentMethod::CreateFirewall => "create_firewall",
            AgentMethod::UpdateFirewall => "update_firewall",
            AgentMethod::DeleteFirewall => "delete_firewall",
        }
    }
}

impl fmt::Display for AgentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fanout envelope broadcast to every agent on the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    /// Operation requested of the agents.
    pub method: AgentMethod,
    /// Host name of the orchestrator that issued the message.
    pub host: String,
    /// Full firewall payload.
    pub firewall: FirewallWithRules,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FirewallSpec, FirewallStatus, TenantId};
    use pretty_assertions::assert_eq;

    fn sample_payload() -> FirewallWithRules {
        let fw = Firewall::from_spec(
            TenantId::new("t1"),
            &FirewallSpec::default(),
            FirewallStatus::PendingCreate,
        );
        FirewallWithRules::new(fw, vec![])
    }

    #[test]
    fn test_router_request_default_is_unspecified() {
        assert_eq!(RouterRequest::default(), RouterRequest::Unspecified);
        assert_eq!(RouterRequest::none(), RouterRequest::Routers(vec![]));
    }

    #[test]
    fn test_payload_wire_field_names() {
        let mut payload = sample_payload();
        payload.add_router_ids.push(RouterId::new());
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("add-router-ids").is_some());
        assert!(json.get("del-router-ids").is_some());
        assert!(json.get("firewall_rule_list").is_some());
        // flattened firewall core fields sit at the top level
        assert!(json.get("tenant_id").is_some());
        assert_eq!(json["status"], "PENDING_CREATE");
        // last-router is omitted unless the update path sets it
        assert!(json.get("last-router").is_none());
    }

    #[test]
    fn test_last_router_serialized_when_set() {
        let mut payload = sample_payload();
        payload.last_router = Some(true);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["last-router"], true);
    }

    #[test]
    fn test_agent_message_roundtrip() {
        let msg = AgentMessage {
            method: AgentMethod::UpdateFirewall,
            host: "orch-1".to_string(),
            firewall: sample_payload(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"update_firewall\""));
        let back: AgentMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }
}
