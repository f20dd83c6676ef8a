//! Reference in-memory transactional store.
//!
//! Backs tests and single-process deployments. A transaction takes the table
//! lock for its whole duration and snapshots the tables first, so an error
//! anywhere in the closure rolls every write back: the same all-or-nothing
//! unit a database-backed store would provide, with one global lock instead
//! of row-level ones.

use crate::error::{FwaasError, FwaasResult};
use crate::store::{FirewallStore, StoreTxn};
use fwaas_types::{
    Firewall, FirewallId, FirewallPolicy, FirewallRule, PolicyId, RouterId, RuleId, TenantId,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Tables {
    firewalls: HashMap<FirewallId, Firewall>,
    policies: HashMap<PolicyId, FirewallPolicy>,
    rules: HashMap<RuleId, FirewallRule>,
    /// Router associations, attachment order preserved per firewall.
    associations: HashMap<FirewallId, Vec<RouterId>>,
}

impl StoreTxn for Tables {
    fn insert_firewall(&mut self, firewall: Firewall) -> FwaasResult<()> {
        if self.firewalls.contains_key(&firewall.id) {
            return Err(FwaasError::store(
                "insert_firewall",
                format!("duplicate firewall id {}", firewall.id),
            ));
        }
        self.firewalls.insert(firewall.id, firewall);
        Ok(())
    }

    fn firewall(&self, id: &FirewallId) -> FwaasResult<Firewall> {
        self.firewalls
            .get(id)
            .cloned()
            .ok_or(FwaasError::FirewallNotFound { firewall_id: *id })
    }

    fn put_firewall(&mut self, firewall: Firewall) -> FwaasResult<()> {
        match self.firewalls.get_mut(&firewall.id) {
            Some(slot) => {
                *slot = firewall;
                Ok(())
            }
            None => Err(FwaasError::FirewallNotFound {
                firewall_id: firewall.id,
            }),
        }
    }

    fn remove_firewall(&mut self, id: &FirewallId) -> FwaasResult<()> {
        self.firewalls
            .remove(id)
            .ok_or(FwaasError::FirewallNotFound { firewall_id: *id })?;
        self.associations.remove(id);
        Ok(())
    }

    fn firewalls(&self, tenant: Option<&TenantId>) -> Vec<Firewall> {
        let mut list: Vec<Firewall> = self
            .firewalls
            .values()
            .filter(|fw| tenant.map_or(true, |t| &fw.tenant_id == t))
            .cloned()
            .collect();
        list.sort_by_key(|fw| *fw.id.as_uuid());
        list
    }

    fn firewall_count_for_tenant(&self, tenant: &TenantId) -> usize {
        self.firewalls
            .values()
            .filter(|fw| &fw.tenant_id == tenant)
            .count()
    }

    fn tenants_with_firewalls(&self) -> Vec<TenantId> {
        let tenants: BTreeSet<TenantId> = self
            .firewalls
            .values()
            .map(|fw| fw.tenant_id.clone())
            .collect();
        tenants.into_iter().collect()
    }

    fn firewalls_for_policy(&self, policy: &PolicyId) -> Vec<FirewallId> {
        let mut list: Vec<FirewallId> = self
            .firewalls
            .values()
            .filter(|fw| fw.firewall_policy_id.as_ref() == Some(policy))
            .map(|fw| fw.id)
            .collect();
        list.sort_by_key(|id| *id.as_uuid());
        list
    }

    fn insert_policy(&mut self, policy: FirewallPolicy) -> FwaasResult<()> {
        if self.policies.contains_key(&policy.id) {
            return Err(FwaasError::store(
                "insert_policy",
                format!("duplicate policy id {}", policy.id),
            ));
        }
        self.policies.insert(policy.id, policy);
        Ok(())
    }

    fn policy(&self, id: &PolicyId) -> FwaasResult<FirewallPolicy> {
        self.policies
            .get(id)
            .cloned()
            .ok_or(FwaasError::PolicyNotFound {
                firewall_policy_id: *id,
            })
    }

    fn put_policy(&mut self, policy: FirewallPolicy) -> FwaasResult<()> {
        match self.policies.get_mut(&policy.id) {
            Some(slot) => {
                *slot = policy;
                Ok(())
            }
            None => Err(FwaasError::PolicyNotFound {
                firewall_policy_id: policy.id,
            }),
        }
    }

    fn insert_rule(&mut self, rule: FirewallRule) -> FwaasResult<()> {
        if self.rules.contains_key(&rule.id) {
            return Err(FwaasError::store(
                "insert_rule",
                format!("duplicate rule id {}", rule.id),
            ));
        }
        self.rules.insert(rule.id, rule);
        Ok(())
    }

    fn rule(&self, id: &RuleId) -> FwaasResult<FirewallRule> {
        self.rules.get(id).cloned().ok_or(FwaasError::RuleNotFound {
            firewall_rule_id: *id,
        })
    }

    fn put_rule(&mut self, rule: FirewallRule) -> FwaasResult<()> {
        match self.rules.get_mut(&rule.id) {
            Some(slot) => {
                *slot = rule;
                Ok(())
            }
            None => Err(FwaasError::RuleNotFound {
                firewall_rule_id: rule.id,
            }),
        }
    }

    fn firewall_routers(&self, id: &FirewallId) -> Vec<RouterId> {
        self.associations.get(id).cloned().unwrap_or_default()
    }

    fn set_firewall_routers(&mut self, id: &FirewallId, routers: Vec<RouterId>) {
        if routers.is_empty() {
            self.associations.remove(id);
        } else {
            self.associations.insert(*id, routers);
        }
    }

    fn routers_in_use(
        &self,
        routers: &[RouterId],
        exclude: Option<&FirewallId>,
    ) -> Vec<RouterId> {
        routers
            .iter()
            .filter(|router| {
                self.associations
                    .iter()
                    .any(|(fw, attached)| Some(fw) != exclude && attached.contains(router))
            })
            .copied()
            .collect()
    }
}

/// In-memory [`FirewallStore`] with snapshot rollback.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FirewallStore for MemoryStore {
    fn transaction<R>(
        &self,
        f: impl FnOnce(&mut dyn StoreTxn) -> FwaasResult<R>,
    ) -> FwaasResult<R> {
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = tables.clone();
        match f(&mut *tables) {
            Ok(value) => Ok(value),
            Err(err) => {
                debug!(error = %err, "transaction rolled back");
                *tables = snapshot;
                Err(err)
            }
        }
    }
}
