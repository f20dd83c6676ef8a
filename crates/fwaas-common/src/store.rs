//! Persistence collaborator interface.
//!
//! The orchestrator and the acknowledgment handler reach all durable state
//! through [`FirewallStore`]. One [`transaction`] call is one atomic unit:
//! everything the closure reads and writes commits together or not at all.
//! That property is what makes the per-firewall pending-state guard safe:
//! two concurrent mutations cannot both observe a non-pending status and
//! race each other into `PENDING_UPDATE`.
//!
//! [`transaction`]: FirewallStore::transaction

use crate::error::FwaasResult;
use fwaas_types::{
    Firewall, FirewallId, FirewallPolicy, FirewallRule, PolicyId, RouterId, RuleId, TenantId,
};

/// Transaction-scoped view of the firewall tables.
///
/// All reads observe writes made earlier in the same transaction. Record
/// mutation is clone-out/put-back: read with [`firewall`], modify, commit
/// with [`put_firewall`].
///
/// [`firewall`]: StoreTxn::firewall
/// [`put_firewall`]: StoreTxn::put_firewall
pub trait StoreTxn {
    // -- firewalls --

    /// Inserts a new firewall record.
    fn insert_firewall(&mut self, firewall: Firewall) -> FwaasResult<()>;

    /// Returns the firewall record, or `FirewallNotFound`.
    fn firewall(&self, id: &FirewallId) -> FwaasResult<Firewall>;

    /// Writes back a modified firewall record, or `FirewallNotFound`.
    fn put_firewall(&mut self, firewall: Firewall) -> FwaasResult<()>;

    /// Permanently removes a firewall record and its router associations.
    fn remove_firewall(&mut self, id: &FirewallId) -> FwaasResult<()>;

    /// Lists firewalls, optionally scoped to one tenant.
    fn firewalls(&self, tenant: Option<&TenantId>) -> Vec<Firewall>;

    /// Counts the firewalls a tenant currently has.
    fn firewall_count_for_tenant(&self, tenant: &TenantId) -> usize;

    /// Returns the distinct tenants that currently have any firewall.
    fn tenants_with_firewalls(&self) -> Vec<TenantId>;

    /// Returns the firewalls referencing a policy (the fanout set for
    /// policy and rule edits).
    fn firewalls_for_policy(&self, policy: &PolicyId) -> Vec<FirewallId>;

    // -- policies --

    /// Inserts a new policy record.
    fn insert_policy(&mut self, policy: FirewallPolicy) -> FwaasResult<()>;

    /// Returns the policy record, or `PolicyNotFound`.
    fn policy(&self, id: &PolicyId) -> FwaasResult<FirewallPolicy>;

    /// Writes back a modified policy record, or `PolicyNotFound`.
    fn put_policy(&mut self, policy: FirewallPolicy) -> FwaasResult<()>;

    // -- rules --

    /// Inserts a new rule record.
    fn insert_rule(&mut self, rule: FirewallRule) -> FwaasResult<()>;

    /// Returns the rule record, or `RuleNotFound`.
    fn rule(&self, id: &RuleId) -> FwaasResult<FirewallRule>;

    /// Writes back a modified rule record, or `RuleNotFound`.
    fn put_rule(&mut self, rule: FirewallRule) -> FwaasResult<()>;

    // -- router associations --

    /// Returns the routers currently attached to a firewall, in attachment
    /// order.
    fn firewall_routers(&self, id: &FirewallId) -> Vec<RouterId>;

    /// Replaces a firewall's attachment set.
    fn set_firewall_routers(&mut self, id: &FirewallId, routers: Vec<RouterId>);

    /// Returns the subset of `routers` already attached to a firewall other
    /// than `exclude`.
    ///
    /// Backs the invariant that a router belongs to at most one firewall.
    fn routers_in_use(&self, routers: &[RouterId], exclude: Option<&FirewallId>)
        -> Vec<RouterId>;
}

/// The external transactional store.
///
/// Implementations must guarantee that concurrent `transaction` calls
/// touching the same firewall serialize against each other; the reference
/// [`MemoryStore`](crate::memory::MemoryStore) does so with a single lock,
/// a database-backed implementation would use row-level transactions.
pub trait FirewallStore: Send + Sync {
    /// Runs `f` as one atomic unit, rolling every write back if it returns
    /// an error.
    fn transaction<R>(&self, f: impl FnOnce(&mut dyn StoreTxn) -> FwaasResult<R>)
        -> FwaasResult<R>;
}
