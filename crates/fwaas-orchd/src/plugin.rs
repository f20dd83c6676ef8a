//! The orchestrator: firewall CRUD flows and policy/rule fanout.
//!
//! Every mutating flow follows the same shape: open one store transaction
//! (guard check, attachment validation, status and association writes, and
//! payload build commit or roll back together), then dispatch the built
//! payloads to agents fire-and-forget after the transaction committed. No
//! partial state is ever visible to agents, and no dispatch happens for a
//! request that failed validation.

use crate::attachment::{diff, AttachmentResolver};
use crate::callbacks::FirewallCallbacks;
use crate::dispatch::FirewallAgentApi;
use fwaas_common::{FirewallStore, FwaasError, FwaasResult, RouterLookup, StoreTxn};
use fwaas_types::{
    Firewall, FirewallId, FirewallPolicy, FirewallPolicyUpdate, FirewallRule, FirewallRuleUpdate,
    FirewallSpec, FirewallStatus, FirewallUpdate, FirewallWithRouters, FirewallWithRules,
    PolicyId, RuleId, RulePlacement, TenantId,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Reference policy: a tenant gets exactly one firewall.
const MAX_FIREWALLS_PER_TENANT: usize = 1;

/// Builds the full agent payload for a firewall: its core fields plus the
/// resolved rule list from its policy, with an empty attachment diff.
pub(crate) fn make_firewall_with_rules(
    txn: &dyn StoreTxn,
    firewall: &Firewall,
) -> FwaasResult<FirewallWithRules> {
    let rules = match firewall.firewall_policy_id {
        Some(policy_id) => {
            let policy = txn.policy(&policy_id)?;
            policy
                .firewall_rules
                .iter()
                .map(|rule_id| txn.rule(rule_id))
                .collect::<FwaasResult<Vec<FirewallRule>>>()?
        }
        None => Vec::new(),
    };
    Ok(FirewallWithRules::new(firewall.clone(), rules))
}

/// The control-plane orchestrator for logical firewalls.
///
/// Composes the persistence store, the router lookup, and the agent
/// dispatch API, all injected at construction. The acknowledgment handler
/// shares the same store and is exposed via [`callbacks`](Self::callbacks)
/// for the transport's inbound registration.
#[derive(Debug)]
pub struct FirewallPlugin<S, L, A> {
    store: Arc<S>,
    resolver: AttachmentResolver<L>,
    agent_rpc: A,
    callbacks: Arc<FirewallCallbacks<S>>,
}

impl<S, L, A> FirewallPlugin<S, L, A>
where
    S: FirewallStore,
    L: RouterLookup,
    A: FirewallAgentApi,
{
    /// Creates the orchestrator over its three collaborators.
    pub fn new(store: Arc<S>, lookup: Arc<L>, agent_rpc: A) -> Self {
        let callbacks = Arc::new(FirewallCallbacks::new(store.clone()));
        Self {
            store,
            resolver: AttachmentResolver::new(lookup),
            agent_rpc,
            callbacks,
        }
    }

    /// The inbound acknowledgment handler agents call.
    pub fn callbacks(&self) -> Arc<FirewallCallbacks<S>> {
        self.callbacks.clone()
    }

    // -- firewall CRUD --

    /// Creates a firewall.
    ///
    /// With no resolved attachments the record is persisted as `INACTIVE`
    /// and no agent is notified. Otherwise it starts in `PENDING_CREATE`
    /// and a `create` instruction carrying the full resolved router set is
    /// broadcast.
    #[instrument(skip(self, spec))]
    pub async fn create_firewall(
        &self,
        tenant_id: TenantId,
        spec: FirewallSpec,
    ) -> FwaasResult<FirewallWithRouters> {
        let candidates = self
            .resolver
            .resolve_for_create(&tenant_id, &spec.router_ids)
            .await?;

        let (view, payload) = self.store.transaction(|txn| {
            if txn.firewall_count_for_tenant(&tenant_id) >= MAX_FIREWALLS_PER_TENANT {
                return Err(FwaasError::FirewallCountExceeded {
                    tenant_id: tenant_id.clone(),
                });
            }
            AttachmentResolver::<L>::validate_unclaimed(&*txn, &candidates, None)?;

            let status = if candidates.is_empty() {
                FirewallStatus::Inactive
            } else {
                FirewallStatus::PendingCreate
            };
            let firewall = Firewall::from_spec(tenant_id.clone(), &spec, status);
            txn.insert_firewall(firewall.clone())?;
            txn.set_firewall_routers(&firewall.id, candidates.clone());

            let payload = if candidates.is_empty() {
                None
            } else {
                let mut payload = make_firewall_with_rules(&*txn, &firewall)?;
                payload.add_router_ids = candidates.clone();
                Some(payload)
            };
            Ok((
                FirewallWithRouters {
                    firewall,
                    router_ids: candidates.clone(),
                },
                payload,
            ))
        })?;

        info!(
            firewall_id = %view.firewall.id,
            status = %view.firewall.status,
            routers = view.router_ids.len(),
            "firewall created"
        );
        if let Some(payload) = payload {
            self.agent_rpc.create_firewall(payload).await;
        }
        Ok(view)
    }

    /// Updates a firewall.
    ///
    /// Rejected with `FirewallInPendingState` while a prior mutation is in
    /// flight. `router_ids: None` keeps the current attachments; an
    /// explicit list (including empty) replaces them. When both current
    /// and new attachment sets are empty the firewall settles in `INACTIVE`
    /// without agent traffic; otherwise it enters `PENDING_UPDATE` and an
    /// `update` carrying the attachment diff and the `last-router` hint is
    /// broadcast.
    #[instrument(skip(self, update))]
    pub async fn update_firewall(
        &self,
        firewall_id: FirewallId,
        update: FirewallUpdate,
    ) -> FwaasResult<FirewallWithRouters> {
        let (view, payload) = self.store.transaction(|txn| {
            let mut firewall = txn.firewall(&firewall_id)?;
            if firewall.status.is_pending() {
                return Err(FwaasError::pending(firewall_id, firewall.status));
            }

            let current = txn.firewall_routers(&firewall_id);
            let desired = match &update.router_ids {
                Some(routers) => {
                    AttachmentResolver::<L>::validate_unclaimed(
                        &*txn,
                        routers,
                        Some(&firewall_id),
                    )?;
                    routers.clone()
                }
                None => current.clone(),
            };
            firewall.apply_update(&update);

            if current.is_empty() && desired.is_empty() {
                firewall.status = FirewallStatus::Inactive;
                txn.put_firewall(firewall.clone())?;
                return Ok((
                    FirewallWithRouters {
                        firewall,
                        router_ids: desired,
                    },
                    None,
                ));
            }

            firewall.status = FirewallStatus::PendingUpdate;
            txn.put_firewall(firewall.clone())?;
            txn.set_firewall_routers(&firewall_id, desired.clone());

            let attachment_diff = diff(&current, &desired);
            let mut payload = make_firewall_with_rules(&*txn, &firewall)?;
            payload.add_router_ids = attachment_diff.added;
            payload.del_router_ids = attachment_diff.removed;
            // tells agents the final attachment is going away, so their
            // acknowledgment should carry terminal DOWN/INACTIVE semantics
            payload.last_router = Some(desired.is_empty());
            Ok((
                FirewallWithRouters {
                    firewall,
                    router_ids: desired,
                },
                Some(payload),
            ))
        })?;

        debug!(
            %firewall_id,
            status = %view.firewall.status,
            "firewall updated"
        );
        if let Some(payload) = payload {
            self.agent_rpc.update_firewall(payload).await;
        }
        Ok(view)
    }

    /// Deletes a firewall.
    ///
    /// Always permitted, whatever the current status. The record first
    /// moves to `PENDING_DELETE`; with no routers to detach it is destroyed
    /// in the same transaction, otherwise a `delete` instruction is
    /// broadcast and the record waits for `firewall_deleted`
    /// acknowledgment.
    #[instrument(skip(self))]
    pub async fn delete_firewall(&self, firewall_id: FirewallId) -> FwaasResult<()> {
        let payload = self.store.transaction(|txn| {
            let mut firewall = txn.firewall(&firewall_id)?;
            firewall.status = FirewallStatus::PendingDelete;
            txn.put_firewall(firewall.clone())?;

            let attached = txn.firewall_routers(&firewall_id);
            if attached.is_empty() {
                // nothing was ever enforced, no agent round trip needed
                txn.remove_firewall(&firewall_id)?;
                return Ok(None);
            }
            let mut payload = make_firewall_with_rules(&*txn, &firewall)?;
            payload.del_router_ids = attached;
            Ok(Some(payload))
        })?;

        match payload {
            Some(payload) => {
                info!(%firewall_id, "firewall delete dispatched, awaiting acknowledgment");
                self.agent_rpc.delete_firewall(payload).await;
            }
            None => info!(%firewall_id, "firewall deleted synchronously"),
        }
        Ok(())
    }

    /// Returns a firewall with its live attachment set.
    pub fn get_firewall(&self, firewall_id: FirewallId) -> FwaasResult<FirewallWithRouters> {
        self.store.transaction(|txn| {
            let firewall = txn.firewall(&firewall_id)?;
            let router_ids = txn.firewall_routers(&firewall_id);
            Ok(FirewallWithRouters {
                firewall,
                router_ids,
            })
        })
    }

    /// Lists firewalls with their live attachment sets, optionally scoped
    /// to one tenant.
    pub fn get_firewalls(&self, tenant: Option<&TenantId>) -> FwaasResult<Vec<FirewallWithRouters>> {
        self.store.transaction(|txn| {
            Ok(txn
                .firewalls(tenant)
                .into_iter()
                .map(|firewall| {
                    let router_ids = txn.firewall_routers(&firewall.id);
                    FirewallWithRouters {
                        firewall,
                        router_ids,
                    }
                })
                .collect())
        })
    }

    // -- policies and rules --

    /// Creates a policy. Rules named in its list are claimed by the policy;
    /// a rule already held by another policy fails the create.
    pub fn create_firewall_policy(&self, policy: FirewallPolicy) -> FwaasResult<FirewallPolicy> {
        self.store.transaction(|txn| {
            Self::claim_rules(txn, &policy.id, &[], &policy.firewall_rules)?;
            txn.insert_policy(policy.clone())?;
            Ok(policy.clone())
        })
    }

    /// Creates a rule. Rules are born unattached; `insert_rule` places them
    /// into a policy.
    pub fn create_firewall_rule(&self, rule: FirewallRule) -> FwaasResult<FirewallRule> {
        self.store.transaction(|txn| {
            txn.insert_rule(rule.clone())?;
            Ok(rule.clone())
        })
    }

    /// Returns a policy record.
    pub fn get_firewall_policy(&self, policy_id: PolicyId) -> FwaasResult<FirewallPolicy> {
        self.store.transaction(|txn| txn.policy(&policy_id))
    }

    /// Returns a rule record.
    pub fn get_firewall_rule(&self, rule_id: RuleId) -> FwaasResult<FirewallRule> {
        self.store.transaction(|txn| txn.rule(&rule_id))
    }

    /// Updates a policy and pushes the refreshed rule set to every firewall
    /// referencing it.
    ///
    /// The whole edit fails with `FirewallInPendingState` if any
    /// referencing firewall already has a mutation in flight.
    #[instrument(skip(self, update))]
    pub async fn update_firewall_policy(
        &self,
        policy_id: PolicyId,
        update: FirewallPolicyUpdate,
    ) -> FwaasResult<FirewallPolicy> {
        let (policy, payloads) = self.store.transaction(|txn| {
            Self::ensure_policy_not_pending(&*txn, &policy_id)?;
            let mut policy = txn.policy(&policy_id)?;
            if let Some(new_rules) = &update.firewall_rules {
                let old_rules = policy.firewall_rules.clone();
                Self::claim_rules(txn, &policy_id, &old_rules, new_rules)?;
            }
            policy.apply_update(&update);
            txn.put_policy(policy.clone())?;
            let payloads = Self::fanout_payloads(txn, &policy_id)?;
            Ok((policy, payloads))
        })?;

        self.dispatch_fanout(payloads).await;
        Ok(policy)
    }

    /// Updates a rule and, if the rule is held by a policy, pushes the
    /// refreshed rule set to every firewall referencing that policy.
    #[instrument(skip(self, update))]
    pub async fn update_firewall_rule(
        &self,
        rule_id: RuleId,
        update: FirewallRuleUpdate,
    ) -> FwaasResult<FirewallRule> {
        let (rule, payloads) = self.store.transaction(|txn| {
            let mut rule = txn.rule(&rule_id)?;
            if let Some(policy_id) = rule.firewall_policy_id {
                Self::ensure_policy_not_pending(&*txn, &policy_id)?;
            }
            rule.apply_update(&update);
            txn.put_rule(rule.clone())?;
            let payloads = match rule.firewall_policy_id {
                Some(policy_id) => Self::fanout_payloads(txn, &policy_id)?,
                None => Vec::new(),
            };
            Ok((rule, payloads))
        })?;

        self.dispatch_fanout(payloads).await;
        Ok(rule)
    }

    /// Inserts a rule into a policy at the requested placement and fans the
    /// refreshed rule set out to referencing firewalls.
    #[instrument(skip(self))]
    pub async fn insert_rule(
        &self,
        policy_id: PolicyId,
        rule_id: RuleId,
        placement: RulePlacement,
    ) -> FwaasResult<FirewallPolicy> {
        let (policy, payloads) = self.store.transaction(|txn| {
            Self::ensure_policy_not_pending(&*txn, &policy_id)?;
            let mut policy = txn.policy(&policy_id)?;
            let mut rule = txn.rule(&rule_id)?;
            if let Some(holder) = rule.firewall_policy_id {
                return Err(FwaasError::RuleInUse {
                    rule_id,
                    firewall_policy_id: holder,
                });
            }

            let position = Self::placement_index(&policy, &placement, &policy_id)?;
            policy.firewall_rules.insert(position, rule_id);
            policy.audited = false;
            rule.firewall_policy_id = Some(policy_id);
            txn.put_rule(rule)?;
            txn.put_policy(policy.clone())?;
            let payloads = Self::fanout_payloads(txn, &policy_id)?;
            Ok((policy, payloads))
        })?;

        self.dispatch_fanout(payloads).await;
        Ok(policy)
    }

    /// Removes a rule from a policy and fans the refreshed rule set out to
    /// referencing firewalls.
    #[instrument(skip(self))]
    pub async fn remove_rule(
        &self,
        policy_id: PolicyId,
        rule_id: RuleId,
    ) -> FwaasResult<FirewallPolicy> {
        let (policy, payloads) = self.store.transaction(|txn| {
            Self::ensure_policy_not_pending(&*txn, &policy_id)?;
            let mut policy = txn.policy(&policy_id)?;
            let mut rule = txn.rule(&rule_id)?;
            let position = policy
                .firewall_rules
                .iter()
                .position(|id| *id == rule_id)
                .ok_or(FwaasError::RuleNotInPolicy {
                    rule_id,
                    firewall_policy_id: policy_id,
                })?;

            policy.firewall_rules.remove(position);
            policy.audited = false;
            rule.firewall_policy_id = None;
            txn.put_rule(rule)?;
            txn.put_policy(policy.clone())?;
            let payloads = Self::fanout_payloads(txn, &policy_id)?;
            Ok((policy, payloads))
        })?;

        self.dispatch_fanout(payloads).await;
        Ok(policy)
    }

    // -- internals --

    /// The fanout concurrency guard: fails if any firewall referencing the
    /// policy already has a mutation in flight, leaving all of them
    /// untouched.
    fn ensure_policy_not_pending(txn: &dyn StoreTxn, policy_id: &PolicyId) -> FwaasResult<()> {
        for firewall_id in txn.firewalls_for_policy(policy_id) {
            let firewall = txn.firewall(&firewall_id)?;
            if firewall.status.is_pending() {
                return Err(FwaasError::pending(firewall_id, firewall.status));
            }
        }
        Ok(())
    }

    /// Moves each firewall referencing the policy into `PENDING_UPDATE` and
    /// builds its refreshed payload with an empty attachment diff;
    /// attachments are unchanged by a policy or rule edit.
    ///
    /// Firewalls with no attached routers stay `INACTIVE` and get no
    /// payload; nothing is enforced anywhere for them.
    fn fanout_payloads(
        txn: &mut dyn StoreTxn,
        policy_id: &PolicyId,
    ) -> FwaasResult<Vec<FirewallWithRules>> {
        let mut payloads = Vec::new();
        for firewall_id in txn.firewalls_for_policy(policy_id) {
            if txn.firewall_routers(&firewall_id).is_empty() {
                continue;
            }
            let mut firewall = txn.firewall(&firewall_id)?;
            firewall.status = FirewallStatus::PendingUpdate;
            txn.put_firewall(firewall.clone())?;
            payloads.push(make_firewall_with_rules(&*txn, &firewall)?);
        }
        Ok(payloads)
    }

    async fn dispatch_fanout(&self, payloads: Vec<FirewallWithRules>) {
        for payload in payloads {
            self.agent_rpc.update_firewall(payload).await;
        }
    }

    /// Re-homes rule membership when a policy's rule list is replaced:
    /// rules leaving the list are released, rules entering it must not be
    /// held by another policy.
    fn claim_rules(
        txn: &mut dyn StoreTxn,
        policy_id: &PolicyId,
        old_rules: &[RuleId],
        new_rules: &[RuleId],
    ) -> FwaasResult<()> {
        for rule_id in old_rules {
            if !new_rules.contains(rule_id) {
                let mut rule = txn.rule(rule_id)?;
                rule.firewall_policy_id = None;
                txn.put_rule(rule)?;
            }
        }
        for rule_id in new_rules {
            let mut rule = txn.rule(rule_id)?;
            match rule.firewall_policy_id {
                Some(holder) if holder != *policy_id => {
                    return Err(FwaasError::RuleInUse {
                        rule_id: *rule_id,
                        firewall_policy_id: holder,
                    });
                }
                _ => {
                    rule.firewall_policy_id = Some(*policy_id);
                    txn.put_rule(rule)?;
                }
            }
        }
        Ok(())
    }

    /// Maps a placement request onto an index in the policy's rule list.
    /// `before` wins over `after`; neither appends at the end.
    fn placement_index(
        policy: &FirewallPolicy,
        placement: &RulePlacement,
        policy_id: &PolicyId,
    ) -> FwaasResult<usize> {
        let find = |anchor: &RuleId| {
            policy
                .firewall_rules
                .iter()
                .position(|id| id == anchor)
                .ok_or(FwaasError::RuleNotInPolicy {
                    rule_id: *anchor,
                    firewall_policy_id: *policy_id,
                })
        };
        if let Some(anchor) = &placement.before {
            return find(anchor);
        }
        if let Some(anchor) = &placement.after {
            return Ok(find(anchor)? + 1);
        }
        Ok(policy.firewall_rules.len())
    }
}
