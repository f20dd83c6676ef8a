//! Authoritative firewall, policy, and rule records plus request bodies.

use crate::id::{FirewallId, PolicyId, RouterId, RuleId, TenantId};
use crate::payload::RouterRequest;
use crate::status::FirewallStatus;
use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A logical firewall.
///
/// The record is mutated only by the orchestrator (during request handling)
/// and the acknowledgment handler (during reconciliation). Agents never
/// write it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firewall {
    /// Firewall identity.
    pub id: FirewallId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Administrative state; agents report `DOWN` for admin-down firewalls.
    pub admin_state_up: bool,
    /// Policy whose rules this firewall enforces.
    pub firewall_policy_id: Option<PolicyId>,
    /// Current lifecycle status.
    pub status: FirewallStatus,
}

/// An ordered collection of firewall rules.
///
/// The firewalls referencing a policy are not stored here; the store derives
/// that back-reference so it can never drift from the firewall records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallPolicy {
    /// Policy identity.
    pub id: PolicyId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Set once an operator has reviewed the rule set; cleared by any edit.
    pub audited: bool,
    /// Rule identities in enforcement order.
    pub firewall_rules: Vec<RuleId>,
}

/// Verdict a rule applies to matching traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleAction {
    /// Permit matching traffic.
    #[serde(rename = "allow")]
    Allow,
    /// Drop matching traffic.
    #[serde(rename = "deny")]
    Deny,
}

impl RuleAction {
    /// Returns the wire spelling of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleAction::Allow => "allow",
            RuleAction::Deny => "deny",
        }
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleAction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "allow" => RuleAction::Allow,
            "deny" => RuleAction::Deny,
            other => return Err(ParseError::InvalidRuleAction(other.to_string())),
        })
    }
}

/// A single match/action rule.
///
/// The match fields are carried through to agents untouched; the orchestrator
/// only cares about the rule's identity and which policy holds it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallRule {
    /// Rule identity.
    pub id: RuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable name.
    pub name: String,
    /// Policy currently holding this rule, if any.
    pub firewall_policy_id: Option<PolicyId>,
    /// Disabled rules are shipped to agents but not enforced.
    pub enabled: bool,
    /// Verdict for matching traffic.
    pub action: RuleAction,
    /// IP protocol name ("tcp", "udp", "icmp"), if constrained.
    pub protocol: Option<String>,
    /// Source address or CIDR, if constrained.
    pub source_ip_address: Option<String>,
    /// Destination address or CIDR, if constrained.
    pub destination_ip_address: Option<String>,
    /// Source port or port range, if constrained.
    pub source_port: Option<String>,
    /// Destination port or port range, if constrained.
    pub destination_port: Option<String>,
}

/// Request body for creating a firewall.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallSpec {
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Administrative state, up unless stated otherwise.
    #[serde(default = "default_admin_state")]
    pub admin_state_up: bool,
    /// Policy to enforce.
    #[serde(default)]
    pub firewall_policy_id: Option<PolicyId>,
    /// Requested attachment points. [`RouterRequest::Unspecified`] attaches
    /// every router the tenant owns; an explicit empty list attaches none.
    #[serde(default)]
    pub router_ids: RouterRequest,
}

fn default_admin_state() -> bool {
    true
}

/// Request body for updating a firewall. Absent fields keep their value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New administrative state.
    #[serde(default)]
    pub admin_state_up: Option<bool>,
    /// New policy reference. `Some(None)` clears the policy.
    #[serde(default)]
    pub firewall_policy_id: Option<Option<PolicyId>>,
    /// New attachment set; `None` keeps existing attachments, `Some(vec![])`
    /// detaches everything.
    #[serde(default)]
    pub router_ids: Option<Vec<RouterId>>,
}

/// Request body for updating a policy. Absent fields keep their value.
///
/// Replacing `firewall_rules` re-homes rule membership: rules dropped from
/// the list are released, rules added must not be held by another policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallPolicyUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New ordered rule list.
    #[serde(default)]
    pub firewall_rules: Option<Vec<RuleId>>,
    /// New audited flag. Any edit that does not set it explicitly clears it.
    #[serde(default)]
    pub audited: Option<bool>,
}

/// Request body for updating a rule. Absent fields keep their value; the
/// optional match fields cannot be cleared through this body, only replaced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirewallRuleUpdate {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New enabled flag.
    #[serde(default)]
    pub enabled: Option<bool>,
    /// New verdict.
    #[serde(default)]
    pub action: Option<RuleAction>,
    /// New protocol constraint.
    #[serde(default)]
    pub protocol: Option<String>,
    /// New source address constraint.
    #[serde(default)]
    pub source_ip_address: Option<String>,
    /// New destination address constraint.
    #[serde(default)]
    pub destination_ip_address: Option<String>,
    /// New source port constraint.
    #[serde(default)]
    pub source_port: Option<String>,
    /// New destination port constraint.
    #[serde(default)]
    pub destination_port: Option<String>,
}

/// A firewall record augmented with its live attachment set.
///
/// Read operations always overlay the association table onto the persisted
/// record before returning it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirewallWithRouters {
    /// The persisted firewall record.
    #[serde(flatten)]
    pub firewall: Firewall,
    /// Routers currently attached.
    pub router_ids: Vec<RouterId>,
}

/// Placement of a rule inserted into a policy.
///
/// `before` wins when both references are given; neither means append at the
/// end of the policy's rule list.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RulePlacement {
    /// Insert immediately before this rule.
    #[serde(default)]
    pub before: Option<RuleId>,
    /// Insert immediately after this rule.
    #[serde(default)]
    pub after: Option<RuleId>,
}

impl RulePlacement {
    /// Appends at the end of the rule list.
    pub const fn append() -> Self {
        Self {
            before: None,
            after: None,
        }
    }

    /// Inserts immediately before the given rule.
    pub const fn before(rule: RuleId) -> Self {
        Self {
            before: Some(rule),
            after: None,
        }
    }

    /// Inserts immediately after the given rule.
    pub const fn after(rule: RuleId) -> Self {
        Self {
            before: None,
            after: Some(rule),
        }
    }
}

impl Firewall {
    /// Creates a firewall record from a create request.
    ///
    /// The initial status is decided by the orchestrator once attachments
    /// are resolved, so it is passed in rather than defaulted.
    pub fn from_spec(tenant_id: TenantId, spec: &FirewallSpec, status: FirewallStatus) -> Self {
        Self {
            id: FirewallId::new(),
            tenant_id,
            name: spec.name.clone(),
            description: spec.description.clone(),
            admin_state_up: spec.admin_state_up,
            firewall_policy_id: spec.firewall_policy_id,
            status,
        }
    }

    /// Applies the non-attachment fields of an update request.
    pub fn apply_update(&mut self, update: &FirewallUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(admin_state_up) = update.admin_state_up {
            self.admin_state_up = admin_state_up;
        }
        if let Some(policy) = update.firewall_policy_id {
            self.firewall_policy_id = policy;
        }
    }
}

impl FirewallPolicy {
    /// Creates an empty, unaudited policy.
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: PolicyId::new(),
            tenant_id,
            name: name.into(),
            description: String::new(),
            audited: false,
            firewall_rules: Vec::new(),
        }
    }

    /// Applies an update request. Any edit clears the audited flag unless
    /// the request sets it explicitly.
    pub fn apply_update(&mut self, update: &FirewallPolicyUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(rules) = &update.firewall_rules {
            self.firewall_rules = rules.clone();
        }
        self.audited = update.audited.unwrap_or(false);
    }
}

impl FirewallRule {
    /// Creates an enabled allow-all rule, the minimal useful rule.
    pub fn allow_all(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: RuleId::new(),
            tenant_id,
            name: name.into(),
            firewall_policy_id: None,
            enabled: true,
            action: RuleAction::Allow,
            protocol: None,
            source_ip_address: None,
            destination_ip_address: None,
            source_port: None,
            destination_port: None,
        }
    }

    /// Applies an update request.
    pub fn apply_update(&mut self, update: &FirewallRuleUpdate) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(action) = update.action {
            self.action = action;
        }
        if let Some(protocol) = &update.protocol {
            self.protocol = Some(protocol.clone());
        }
        if let Some(source) = &update.source_ip_address {
            self.source_ip_address = Some(source.clone());
        }
        if let Some(destination) = &update.destination_ip_address {
            self.destination_ip_address = Some(destination.clone());
        }
        if let Some(port) = &update.source_port {
            self.source_port = Some(port.clone());
        }
        if let Some(port) = &update.destination_port {
            self.destination_port = Some(port.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_firewall_from_spec() {
        let spec = FirewallSpec {
            name: "edge".to_string(),
            admin_state_up: true,
            ..Default::default()
        };
        let fw = Firewall::from_spec(TenantId::new("t1"), &spec, FirewallStatus::Inactive);
        assert_eq!(fw.name, "edge");
        assert_eq!(fw.status, FirewallStatus::Inactive);
        assert!(fw.firewall_policy_id.is_none());
    }

    #[test]
    fn test_apply_update_keeps_absent_fields() {
        let spec = FirewallSpec {
            name: "edge".to_string(),
            description: "perimeter".to_string(),
            ..Default::default()
        };
        let mut fw = Firewall::from_spec(TenantId::new("t1"), &spec, FirewallStatus::Active);
        fw.apply_update(&FirewallUpdate {
            description: Some("dmz".to_string()),
            ..Default::default()
        });
        assert_eq!(fw.name, "edge");
        assert_eq!(fw.description, "dmz");
    }

    #[test]
    fn test_apply_update_clears_policy() {
        let policy = PolicyId::new();
        let spec = FirewallSpec {
            firewall_policy_id: Some(policy),
            ..Default::default()
        };
        let mut fw = Firewall::from_spec(TenantId::new("t1"), &spec, FirewallStatus::Active);
        assert_eq!(fw.firewall_policy_id, Some(policy));
        fw.apply_update(&FirewallUpdate {
            firewall_policy_id: Some(None),
            ..Default::default()
        });
        assert_eq!(fw.firewall_policy_id, None);
    }

    #[test]
    fn test_rule_action_roundtrip() {
        assert_eq!("allow".parse::<RuleAction>().unwrap(), RuleAction::Allow);
        assert_eq!("deny".parse::<RuleAction>().unwrap(), RuleAction::Deny);
        assert!("drop".parse::<RuleAction>().is_err());
    }

    #[test]
    fn test_spec_defaults_admin_up() {
        let spec: FirewallSpec = serde_json::from_str("{}").unwrap();
        assert!(spec.admin_state_up);
        assert!(matches!(spec.router_ids, RouterRequest::Unspecified));
    }
}
