//! fworchd - FWaaS Orchestrator Daemon
//!
//! Entry point for the fworchd daemon. Wires the orchestrator to an
//! in-memory store, a logging broadcast transport, and a statically
//! configured router lookup; a production deployment substitutes real
//! collaborators behind the same traits.

use async_trait::async_trait;
use clap::Parser;
use fwaas_common::{AgentBroadcast, FwaasResult, MemoryStore, RouterLookup};
use fwaas_orchd::{FanoutDispatcher, FirewallPlugin};
use fwaas_types::{AgentMessage, RouterId, TenantId};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

/// FWaaS control-plane orchestrator daemon
#[derive(Parser, Debug)]
#[command(name = "fworchd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host name carried in agent notifications
    #[arg(long, default_value = "fworchd")]
    host: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Routers available for tenant attachment (repeatable)
    #[arg(long = "router")]
    routers: Vec<Uuid>,
}

/// Lookup serving a fixed router set to every tenant.
struct StaticRouterLookup {
    routers: Vec<RouterId>,
}

#[async_trait]
impl RouterLookup for StaticRouterLookup {
    async fn routers_for_tenant(&self, _tenant: &TenantId) -> FwaasResult<Vec<RouterId>> {
        Ok(self.routers.clone())
    }
}

/// Transport that logs each broadcast instead of delivering it.
struct LoggingBroadcast;

#[async_trait]
impl AgentBroadcast for LoggingBroadcast {
    async fn broadcast(&self, topic: &str, message: AgentMessage) -> FwaasResult<()> {
        match serde_json::to_string(&message) {
            Ok(json) => info!(topic, message = %json, "broadcast"),
            Err(err) => warn!(topic, error = %err, "broadcast message not serializable"),
        }
        Ok(())
    }
}

/// Initializes tracing/logging subsystem
fn init_logging(level: &str) {
    let level: Level = level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting fworchd ---");
    info!("Host: {}", args.host);
    info!("Routers available: {}", args.routers.len());

    let store = Arc::new(MemoryStore::new());
    let lookup = Arc::new(StaticRouterLookup {
        routers: args.routers.into_iter().map(RouterId::from).collect(),
    });
    let dispatcher = FanoutDispatcher::new(Arc::new(LoggingBroadcast), args.host);
    let plugin = FirewallPlugin::new(store, lookup, dispatcher);
    let _callbacks = plugin.callbacks();

    info!("fworchd initialization complete");
    info!("Inbound agent call registration pending transport integration");

    ExitCode::SUCCESS
}
