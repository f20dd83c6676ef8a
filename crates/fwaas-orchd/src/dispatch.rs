//! Notification dispatcher: one-way fanout of firewall instructions.

use crate::topics::FIREWALL_AGENT_TOPIC;
use async_trait::async_trait;
use fwaas_common::AgentBroadcast;
use fwaas_types::{AgentMessage, AgentMethod, FirewallWithRules};
use std::sync::Arc;
use tracing::{debug, warn};

/// The three broadcast operations agents understand.
///
/// None of them await a reply. An unreachable agent is indistinguishable
/// from a slow one at this layer; the acknowledgment handler learns the
/// real-world outcome later through independent inbound calls.
#[async_trait]
pub trait FirewallAgentApi: Send + Sync {
    /// Instructs agents to apply a new firewall on the added routers.
    async fn create_firewall(&self, firewall: FirewallWithRules);

    /// Instructs agents to reconcile a firewall's rule set and attachment
    /// diff.
    async fn update_firewall(&self, firewall: FirewallWithRules);

    /// Instructs agents to tear a firewall down and report deletion.
    async fn delete_firewall(&self, firewall: FirewallWithRules);
}

/// Fanout dispatcher over an injected broadcast transport.
#[derive(Debug)]
pub struct FanoutDispatcher<T> {
    transport: Arc<T>,
    host: String,
}

impl<T: AgentBroadcast> FanoutDispatcher<T> {
    /// Creates a dispatcher identifying itself as `host` in every message.
    pub fn new(transport: Arc<T>, host: impl Into<String>) -> Self {
        Self {
            transport,
            host: host.into(),
        }
    }

    async fn cast(&self, method: AgentMethod, firewall: FirewallWithRules) {
        let firewall_id = firewall.firewall.id;
        let message = AgentMessage {
            method,
            host: self.host.clone(),
            firewall,
        };
        match self.transport.broadcast(FIREWALL_AGENT_TOPIC, message).await {
            Ok(()) => debug!(%method, %firewall_id, "dispatched to agents"),
            Err(err) => warn!(%method, %firewall_id, error = %err, "agent broadcast failed"),
        }
    }
}

#[async_trait]
impl<T: AgentBroadcast> FirewallAgentApi for FanoutDispatcher<T> {
    async fn create_firewall(&self, firewall: FirewallWithRules) {
        self.cast(AgentMethod::CreateFirewall, firewall).await;
    }

    async fn update_firewall(&self, firewall: FirewallWithRules) {
        self.cast(AgentMethod::UpdateFirewall, firewall).await;
    }

    async fn delete_firewall(&self, firewall: FirewallWithRules) {
        self.cast(AgentMethod::DeleteFirewall, firewall).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fwaas_common::{FwaasError, FwaasResult};
    use fwaas_types::{Firewall, FirewallSpec, FirewallStatus, TenantId};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<(String, AgentMessage)>>,
    }

    impl RecordingTransport {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl AgentBroadcast for RecordingTransport {
        async fn broadcast(&self, topic: &str, message: AgentMessage) -> FwaasResult<()> {
            self.sent.lock().unwrap().push((topic.to_string(), message));
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl AgentBroadcast for FailingTransport {
        async fn broadcast(&self, _topic: &str, _message: AgentMessage) -> FwaasResult<()> {
            Err(FwaasError::transport("bus unavailable"))
        }
    }

    fn payload() -> FirewallWithRules {
        let fw = Firewall::from_spec(
            TenantId::new("t1"),
            &FirewallSpec::default(),
            FirewallStatus::PendingCreate,
        );
        FirewallWithRules::new(fw, vec![])
    }

    #[tokio::test]
    async fn test_dispatch_wraps_method_and_host() {
        let transport = Arc::new(RecordingTransport::new());
        let dispatcher = FanoutDispatcher::new(transport.clone(), "orch-1");
        dispatcher.create_firewall(payload()).await;
        dispatcher.delete_firewall(payload()).await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, FIREWALL_AGENT_TOPIC);
        assert_eq!(sent[0].1.method, AgentMethod::CreateFirewall);
        assert_eq!(sent[0].1.host, "orch-1");
        assert_eq!(sent[1].1.method, AgentMethod::DeleteFirewall);
    }

    #[tokio::test]
    async fn test_transport_failure_not_surfaced() {
        let dispatcher = FanoutDispatcher::new(Arc::new(FailingTransport), "orch-1");
        // returns normally; failure is logged, not raised
        dispatcher.update_firewall(payload()).await;
    }
}
