//! Acknowledgment handler: the single inbound surface agents call.
//!
//! Calls arrive at any time, any number of times, from any agent, with no
//! ordering guarantee. Every handler resolves races against the firewall's
//! persisted status inside one store transaction. Anomalies are absorbed
//! into `ERROR` status rather than raised; the caller is an agent, not a
//! user.

use crate::plugin::make_firewall_with_rules;
use fwaas_common::{FirewallStore, FwaasResult};
use fwaas_types::{Firewall, FirewallId, FirewallStatus, FirewallWithRules, TenantId};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, instrument, warn};

/// Inbound agent callbacks.
///
/// The boolean results are acknowledgment flags for the calling agent:
/// `false` means the report was ignored or recorded as an anomaly, not that
/// the call failed.
#[derive(Debug)]
pub struct FirewallCallbacks<S> {
    store: Arc<S>,
    /// Firewall ids whose deletion this instance has already confirmed.
    deleted_ids: Mutex<HashSet<FirewallId>>,
}

impl<S: FirewallStore> FirewallCallbacks<S> {
    /// Creates the handler over the injected store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            deleted_ids: Mutex::new(HashSet::new()),
        }
    }

    /// Agent reports a firewall's applied status.
    ///
    /// A firewall in `PENDING_DELETE` ignores the report: the delete
    /// request always wins over a late status report, so a firewall being
    /// torn down cannot be resurrected. `ACTIVE` and `DOWN` are persisted;
    /// anything else is coerced to `ERROR`.
    #[instrument(skip(self))]
    pub fn set_firewall_status(
        &self,
        firewall_id: FirewallId,
        status: FirewallStatus,
    ) -> FwaasResult<bool> {
        self.store.transaction(|txn| {
            let mut firewall = txn.firewall(&firewall_id)?;
            if firewall.status == FirewallStatus::PendingDelete {
                debug!(
                    %firewall_id,
                    reported = %status,
                    "firewall in PENDING_DELETE, ignoring status report"
                );
                return Ok(false);
            }
            match status {
                FirewallStatus::Active | FirewallStatus::Down => {
                    firewall.status = status;
                    txn.put_firewall(firewall)?;
                    Ok(true)
                }
                other => {
                    warn!(%firewall_id, reported = %other, "unexpected status report");
                    firewall.status = FirewallStatus::Error;
                    txn.put_firewall(firewall)?;
                    Ok(false)
                }
            }
        })
    }

    /// Agent reports that a firewall's teardown finished everywhere.
    ///
    /// Idempotent: the first receipt destroys the record if the firewall
    /// was in `PENDING_DELETE` or `ERROR`; a repeat receipt re-validates
    /// that the record is gone but never re-runs destruction. A deletion
    /// reported from any other state is an anomaly and forces `ERROR`.
    #[instrument(skip(self))]
    pub fn firewall_deleted(&self, firewall_id: FirewallId) -> FwaasResult<bool> {
        let first_receipt = self
            .deleted_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(firewall_id);
        if !first_receipt {
            debug!(%firewall_id, "deletion already confirmed");
            return self
                .store
                .transaction(|txn| Ok(txn.firewall(&firewall_id).is_err()));
        }
        self.store.transaction(|txn| {
            let mut firewall = txn.firewall(&firewall_id)?;
            match firewall.status {
                FirewallStatus::PendingDelete | FirewallStatus::Error => {
                    txn.remove_firewall(&firewall_id)?;
                    debug!(%firewall_id, "firewall destroyed");
                    Ok(true)
                }
                status => {
                    warn!(
                        %firewall_id,
                        %status,
                        "firewall unexpectedly deleted by agent"
                    );
                    firewall.status = FirewallStatus::Error;
                    txn.put_firewall(firewall)?;
                    Ok(false)
                }
            }
        })
    }

    /// Returns a tenant's firewalls with their resolved rule lists; used by
    /// agents on (re)connect to reconcile local enforcement state.
    pub fn get_firewalls_for_tenant(
        &self,
        tenant: &TenantId,
    ) -> FwaasResult<Vec<FirewallWithRules>> {
        self.store.transaction(|txn| {
            txn.firewalls(Some(tenant))
                .iter()
                .map(|firewall| make_firewall_with_rules(&*txn, firewall))
                .collect()
        })
    }

    /// Returns a tenant's firewalls without rules.
    pub fn get_firewalls_for_tenant_without_rules(
        &self,
        tenant: &TenantId,
    ) -> FwaasResult<Vec<Firewall>> {
        self.store.transaction(|txn| Ok(txn.firewalls(Some(tenant))))
    }

    /// Returns the distinct tenants that currently have any firewall; used
    /// by agents to scope their polling.
    pub fn get_tenants_with_firewalls(&self) -> FwaasResult<Vec<TenantId>> {
        self.store.transaction(|txn| Ok(txn.tenants_with_firewalls()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwaas_common::{MemoryStore, StoreTxn};
    use fwaas_types::FirewallSpec;
    use pretty_assertions::assert_eq;

    fn seeded(status: FirewallStatus) -> (Arc<MemoryStore>, FirewallId) {
        let store = Arc::new(MemoryStore::new());
        let firewall = Firewall::from_spec(TenantId::new("t1"), &FirewallSpec::default(), status);
        let id = firewall.id;
        store
            .transaction(|txn| txn.insert_firewall(firewall))
            .unwrap();
        (store, id)
    }

    fn status_of(store: &MemoryStore, id: FirewallId) -> FirewallStatus {
        store
            .transaction(|txn| txn.firewall(&id))
            .unwrap()
            .status
    }

    #[test]
    fn test_set_status_active() {
        let (store, id) = seeded(FirewallStatus::PendingCreate);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(callbacks
            .set_firewall_status(id, FirewallStatus::Active)
            .unwrap());
        assert_eq!(status_of(&store, id), FirewallStatus::Active);
    }

    #[test]
    fn test_set_status_ignored_during_pending_delete() {
        let (store, id) = seeded(FirewallStatus::PendingDelete);
        let callbacks = FirewallCallbacks::new(store.clone());
        for reported in [
            FirewallStatus::Active,
            FirewallStatus::Down,
            FirewallStatus::Error,
        ] {
            assert!(!callbacks.set_firewall_status(id, reported).unwrap());
            assert_eq!(status_of(&store, id), FirewallStatus::PendingDelete);
        }
    }

    #[test]
    fn test_set_status_coerces_unexpected_to_error() {
        let (store, id) = seeded(FirewallStatus::PendingUpdate);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(!callbacks
            .set_firewall_status(id, FirewallStatus::PendingCreate)
            .unwrap());
        assert_eq!(status_of(&store, id), FirewallStatus::Error);
    }

    #[test]
    fn test_firewall_deleted_from_pending_delete() {
        let (store, id) = seeded(FirewallStatus::PendingDelete);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(callbacks.firewall_deleted(id).unwrap());
        assert!(store.transaction(|txn| txn.firewall(&id)).is_err());
    }

    #[test]
    fn test_firewall_deleted_allowed_from_error() {
        let (store, id) = seeded(FirewallStatus::Error);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(callbacks.firewall_deleted(id).unwrap());
        assert!(store.transaction(|txn| txn.firewall(&id)).is_err());
    }

    #[test]
    fn test_firewall_deleted_idempotent() {
        let (store, id) = seeded(FirewallStatus::PendingDelete);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(callbacks.firewall_deleted(id).unwrap());
        // second receipt observes the deletion already confirmed
        assert!(callbacks.firewall_deleted(id).unwrap());
    }

    #[test]
    fn test_unexpected_deletion_flags_error() {
        let (store, id) = seeded(FirewallStatus::Active);
        let callbacks = FirewallCallbacks::new(store.clone());
        assert!(!callbacks.firewall_deleted(id).unwrap());
        assert_eq!(status_of(&store, id), FirewallStatus::Error);
        // repeat receipt re-validates: record still present, not confirmed
        assert!(!callbacks.firewall_deleted(id).unwrap());
        assert_eq!(status_of(&store, id), FirewallStatus::Error);
    }

    #[test]
    fn test_tenant_queries() {
        let (store, _) = seeded(FirewallStatus::Active);
        let callbacks = FirewallCallbacks::new(store.clone());
        let tenants = callbacks.get_tenants_with_firewalls().unwrap();
        assert_eq!(tenants, vec![TenantId::new("t1")]);
        let firewalls = callbacks
            .get_firewalls_for_tenant_without_rules(&TenantId::new("t1"))
            .unwrap();
        assert_eq!(firewalls.len(), 1);
        let with_rules = callbacks
            .get_firewalls_for_tenant(&TenantId::new("t1"))
            .unwrap();
        assert_eq!(with_rules.len(), 1);
        assert!(with_rules[0].firewall_rule_list.is_empty());
        assert!(callbacks
            .get_firewalls_for_tenant(&TenantId::new("t2"))
            .unwrap()
            .is_empty());
    }
}
