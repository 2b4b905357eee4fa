//! Hexagonal ports onto the panel's own services.
//!
//! The bot never talks to the panel's storage or process machinery directly;
//! implementations live with the embedding application. All of them must be
//! safe for concurrent calls from independently spawned handlers.

use async_trait::async_trait;

use crate::{domain::InboundSummary, Result};

/// Traffic accounting per routed connection.
#[async_trait]
pub trait InboundService: Send + Sync {
    /// Every known inbound with its cumulative traffic. Failures surface as
    /// `Error::Service` carrying the literal message for the requesting chat.
    async fn all_inbounds(&self) -> Result<Vec<InboundSummary>>;

    /// Reset all traffic counters. Same failure contract.
    async fn clear_traffic(&self) -> Result<()>;
}

/// Lifecycle of the externally owned serving component. Stop and start are
/// independently reportable failure points.
#[async_trait]
pub trait ServerControl: Send + Sync {
    async fn stop(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
}

/// Host load readings for the status report.
#[async_trait]
pub trait SystemMonitor: Send + Sync {
    /// Current CPU usage in percent.
    async fn cpu_usage(&self) -> f64;
}
