//! Network-facing collaborator traits.
//!
//! Both collaborators live on the other side of a network boundary and are
//! injected into the orchestrator at construction time; nothing here is
//! located through a global registry.

use crate::error::FwaasResult;
use async_trait::async_trait;
use fwaas_types::{AgentMessage, RouterId, TenantId};

/// Attachment-point lookup collaborator.
///
/// Used only on firewall creation when the caller leaves the router list
/// unspecified, to resolve "all routers the tenant owns".
#[async_trait]
pub trait RouterLookup: Send + Sync {
    /// Returns every router owned by the tenant.
    async fn routers_for_tenant(&self, tenant: &TenantId) -> FwaasResult<Vec<RouterId>>;
}

/// Fire-and-forget fanout transport to enforcement agents.
///
/// A successful return means the transport accepted the message, not that
/// any agent received it. Delivery failures are invisible at this layer;
/// real-world outcome is learned later through the acknowledgment handler.
#[async_trait]
pub trait AgentBroadcast: Send + Sync {
    /// Broadcasts a message to every agent subscribed to the topic.
    async fn broadcast(&self, topic: &str, message: AgentMessage) -> FwaasResult<()>;
}
