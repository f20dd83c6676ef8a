//! Topic and inbound method name constants for the agent wire contract.

/// Fanout topic enforcement agents subscribe to for firewall instructions.
pub const FIREWALL_AGENT_TOPIC: &str = "l3_agent";

/// Topic on which this orchestrator accepts inbound agent calls.
pub const FIREWALL_PLUGIN_TOPIC: &str = "q-firewall-plugin";

/// Names under which agents invoke the acknowledgment handler's operations.
///
/// The transport's inbound registration maps these names onto
/// `FirewallCallbacks`; no other methods are dispatchable.
pub mod callback_methods {
    /// Report an applied status for a firewall.
    pub const SET_FIREWALL_STATUS: &str = "set_firewall_status";

    /// Report that a firewall's teardown finished everywhere.
    pub const FIREWALL_DELETED: &str = "firewall_deleted";

    /// List a tenant's firewalls with resolved rule lists.
    pub const GET_FIREWALLS_FOR_TENANT: &str = "get_firewalls_for_tenant";

    /// List a tenant's firewalls without rules.
    pub const GET_FIREWALLS_FOR_TENANT_WITHOUT_RULES: &str =
        "get_firewalls_for_tenant_without_rules";

    /// List the tenants that currently have any firewall.
    pub const GET_TENANTS_WITH_FIREWALLS: &str = "get_tenants_with_firewalls";
}
