//! Attachment resolver: router set resolution, claim validation, and diffing.

use fwaas_common::{FwaasError, FwaasResult, RouterLookup, StoreTxn};
use fwaas_types::{FirewallId, RouterId, RouterRequest, TenantId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Result of diffing a firewall's current attachment set against the
/// desired one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttachmentDiff {
    /// Routers the firewall must be attached to.
    pub added: Vec<RouterId>,
    /// Routers the firewall must be detached from.
    pub removed: Vec<RouterId>,
}

/// Computes the attachment diff: `removed = current − desired`,
/// `added = desired − current`. Pure set difference; input order only
/// affects the order of the output lists, never their membership.
pub fn diff(current: &[RouterId], desired: &[RouterId]) -> AttachmentDiff {
    let current_set: HashSet<&RouterId> = current.iter().collect();
    let desired_set: HashSet<&RouterId> = desired.iter().collect();
    AttachmentDiff {
        added: desired
            .iter()
            .filter(|router| !current_set.contains(router))
            .copied()
            .collect(),
        removed: current
            .iter()
            .filter(|router| !desired_set.contains(router))
            .copied()
            .collect(),
    }
}

/// Resolves requested attachment points for a new firewall.
///
/// The tenant-wide router lookup is the only async collaborator on the
/// mutation path, so it runs here, before the caller opens its store
/// transaction; claim validation runs inside that transaction via
/// [`validate_unclaimed`](AttachmentResolver::validate_unclaimed).
#[derive(Debug)]
pub struct AttachmentResolver<L> {
    lookup: Arc<L>,
}

impl<L: RouterLookup> AttachmentResolver<L> {
    /// Creates a resolver over the injected lookup collaborator.
    pub fn new(lookup: Arc<L>) -> Self {
        Self { lookup }
    }

    /// Resolves the candidate attachment set for `create`.
    ///
    /// An explicit list (including the empty one) is returned unchanged;
    /// an unspecified request resolves to every router the tenant owns.
    pub async fn resolve_for_create(
        &self,
        tenant: &TenantId,
        request: &RouterRequest,
    ) -> FwaasResult<Vec<RouterId>> {
        match request {
            RouterRequest::Routers(routers) => Ok(routers.clone()),
            RouterRequest::Unspecified => {
                let routers = self.lookup.routers_for_tenant(tenant).await?;
                debug!(
                    %tenant,
                    count = routers.len(),
                    "resolved unspecified router request to all tenant routers"
                );
                Ok(routers)
            }
        }
    }

    /// Fails with `RoutersInUse` if any of `routers` is already attached to
    /// a firewall other than `exclude`.
    ///
    /// Must run inside the caller's store transaction so the claim check
    /// commits together with the association write it protects.
    pub fn validate_unclaimed(
        txn: &dyn StoreTxn,
        routers: &[RouterId],
        exclude: Option<&FirewallId>,
    ) -> FwaasResult<()> {
        let conflicting = txn.routers_in_use(routers, exclude);
        if conflicting.is_empty() {
            Ok(())
        } else {
            Err(FwaasError::RoutersInUse {
                router_ids: conflicting,
            })
        }
    }
}
