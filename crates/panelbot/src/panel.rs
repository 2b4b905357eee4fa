//! Standalone-mode panel services.
//!
//! Outside the panel process the bot works from a JSON snapshot of the
//! inbound list and drives the serving component through configured shell
//! commands. Service failures carry the literal message shown to the
//! requesting chat.

use std::{env, fs, path::PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use panelbot_core::{
    domain::InboundSummary,
    ports::{InboundService, ServerControl, SystemMonitor},
    Error, Result,
};

pub struct StandalonePanel {
    snapshot: PathBuf,
    stop_cmd: Option<String>,
    start_cmd: Option<String>,
}

impl StandalonePanel {
    pub fn from_env() -> Self {
        Self {
            snapshot: env::var("PANEL_SNAPSHOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/etc/panelbot/inbounds.json")),
            stop_cmd: env::var("PANEL_STOP_CMD").ok(),
            start_cmd: env::var("PANEL_START_CMD").ok(),
        }
    }

    fn read_snapshot(&self) -> Result<Vec<InboundSummary>> {
        let raw = fs::read_to_string(&self.snapshot)
            .map_err(|e| Error::Service(format!("cannot read inbound snapshot: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Service(format!("invalid inbound snapshot: {e}")))
    }

    async fn run_shell(cmd: &str) -> Result<()> {
        let status = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .status()
            .await
            .map_err(|e| Error::Service(format!("failed to run `{cmd}`: {e}")))?;
        if !status.success() {
            return Err(Error::Service(format!("`{cmd}` exited with {status}")));
        }
        Ok(())
    }
}

#[async_trait]
impl InboundService for StandalonePanel {
    async fn all_inbounds(&self) -> Result<Vec<InboundSummary>> {
        self.read_snapshot()
    }

    async fn clear_traffic(&self) -> Result<()> {
        let mut inbounds = self.read_snapshot()?;
        for inbound in &mut inbounds {
            inbound.total = 0;
        }
        let raw = serde_json::to_string_pretty(&inbounds)
            .map_err(|e| Error::Service(e.to_string()))?;
        fs::write(&self.snapshot, raw)
            .map_err(|e| Error::Service(format!("cannot write inbound snapshot: {e}")))
    }
}

#[async_trait]
impl ServerControl for StandalonePanel {
    async fn stop(&self) -> Result<()> {
        match &self.stop_cmd {
            Some(cmd) => Self::run_shell(cmd).await,
            None => Err(Error::Service("no stop command configured".to_string())),
        }
    }

    async fn start(&self) -> Result<()> {
        match &self.start_cmd {
            Some(cmd) => Self::run_shell(cmd).await,
            None => Err(Error::Service("no start command configured".to_string())),
        }
    }
}

#[async_trait]
impl SystemMonitor for StandalonePanel {
    async fn cpu_usage(&self) -> f64 {
        read_load_percent().unwrap_or(0.0)
    }
}

/// One-minute load average scaled by core count; a rough stand-in for a
/// proper CPU sampler.
fn read_load_percent() -> Option<f64> {
    let raw = fs::read_to_string("/proc/loadavg").ok()?;
    let load1: f64 = raw.split_whitespace().next()?.parse().ok()?;
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1) as f64;
    Some((load1 / cores * 100.0).min(100.0))
}
