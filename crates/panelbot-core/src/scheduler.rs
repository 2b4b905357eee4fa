//! Cron scheduler for the recurring daily report.
//!
//! At most one job exists per bot session, keyed by a single identifier. The
//! schedule is a six-field cron expression (sec min hour dom mon dow);
//! an empty setting resolves to every day at 08:00. The job runs on its own
//! timer task, independent of the update ingestion loop.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, Timelike};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{notify::Notifier, Error, Result};

pub const DEFAULT_REPORT_SCHEDULE: &str = "0 0 8 * * *";

/// Resolve the configured schedule string; blank means the default.
pub fn effective_schedule(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_REPORT_SCHEDULE
    } else {
        trimmed
    }
}

/// Identifier of the registered report job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobId(pub u64);

pub struct ReportScheduler {
    state: tokio::sync::Mutex<Option<JobEntry>>,
    next_id: AtomicU64,
}

struct JobEntry {
    id: JobId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Default for ReportScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportScheduler {
    pub fn new() -> Self {
        Self {
            state: tokio::sync::Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    /// Register and launch the daily-report job. A previously registered job
    /// is torn down first; the session treats this as its single
    /// bot-lifetime job.
    pub async fn start(&self, schedule: &str, notifier: Arc<Notifier>) -> Result<JobId> {
        let schedule = effective_schedule(schedule);
        let expr = CronExpr::parse(schedule)?;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(job_loop(expr, notifier, cancel.clone()));
        let id = JobId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);

        let mut st = self.state.lock().await;
        if let Some(prev) = st.take() {
            prev.cancel.cancel();
            prev.handle.abort();
        }
        *st = Some(JobEntry { id, cancel, handle });
        info!("report scheduler started with schedule {schedule}");
        Ok(id)
    }

    /// Halt the timer. Safe to call when never started, and idempotent.
    pub async fn stop(&self) {
        if let Some(job) = self.state.lock().await.take() {
            job.cancel.cancel();
            job.handle.abort();
        }
    }

    pub async fn active_job(&self) -> Option<JobId> {
        self.state.lock().await.as_ref().map(|j| j.id)
    }
}

async fn job_loop(expr: CronExpr, notifier: Arc<Notifier>, cancel: CancellationToken) {
    loop {
        let Some(next) = expr.next_after(Local::now()) else {
            warn!("report schedule has no next run, stopping the job");
            break;
        };

        let wait = (next - Local::now())
            .to_std()
            .unwrap_or(Duration::from_secs(0));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(wait) => {
                notifier.send_daily_report().await;
            }
        }
    }
}

// === Cron expression engine ===

#[derive(Clone, Debug)]
struct CronExpr {
    sec: Field,
    min: Field,
    hour: Field,
    dom: Field,
    mon: Field,
    dow: Field,
}

#[derive(Clone, Debug)]
struct Field {
    min: u32,
    max: u32,
    any: bool,
    allowed: Vec<bool>, // index = value
}

impl CronExpr {
    fn parse(expr: &str) -> Result<Self> {
        let parts = expr
            .split_whitespace()
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>();
        if parts.len() != 6 {
            return Err(Error::Config(format!(
                "expected 6 cron fields, got {}",
                parts.len()
            )));
        }

        let sec = Field::parse(parts[0], 0, 59, false)?;
        let min = Field::parse(parts[1], 0, 59, false)?;
        let hour = Field::parse(parts[2], 0, 23, false)?;
        let dom = Field::parse(parts[3], 1, 31, false)?;
        let mon = Field::parse(parts[4], 1, 12, false)?;
        let dow = Field::parse(parts[5], 0, 6, true)?;

        Ok(Self {
            sec,
            min,
            hour,
            dom,
            mon,
            dow,
        })
    }

    fn matches(&self, dt: DateTime<Local>) -> bool {
        self.sec.contains(dt.second()) && self.minute_matches(dt)
    }

    /// Everything above second granularity.
    fn minute_matches(&self, dt: DateTime<Local>) -> bool {
        if !self.min.contains(dt.minute()) {
            return false;
        }
        if !self.hour.contains(dt.hour()) {
            return false;
        }
        if !self.mon.contains(dt.month()) {
            return false;
        }

        // Standard cron semantics: if both DOM and DOW are restricted, match
        // when EITHER matches.
        let dom_match = self.dom.contains(dt.day());
        let dow_match = self.dow.contains(dt.weekday().num_days_from_sunday());

        match (self.dom.any, self.dow.any) {
            (true, true) => true,
            (true, false) => dow_match,
            (false, true) => dom_match,
            (false, false) => dom_match || dow_match,
        }
    }

    fn next_after(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let mut t = (now + chrono::Duration::seconds(1)).with_nanosecond(0)?;

        // Scan minute by minute and resolve the seconds field within a
        // matching minute. Hard cap to avoid infinite loops for impossible
        // expressions.
        let max_iters = 366usize * 24 * 60;
        for _ in 0..max_iters {
            if self.minute_matches(t) {
                if let Some(s) = self.sec.first_at_or_after(t.second()) {
                    return t.with_second(s);
                }
            }
            t += chrono::Duration::seconds(60 - i64::from(t.second()));
        }
        None
    }
}

impl Field {
    fn parse(raw: &str, min: u32, max: u32, allow_7_as_0: bool) -> Result<Self> {
        let raw = raw.trim();
        if raw == "*" {
            return Ok(Self {
                min,
                max,
                any: true,
                allowed: vec![true; (max + 1) as usize],
            });
        }

        let mut allowed = vec![false; (max + 1) as usize];
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            if part == "*" {
                for v in min..=max {
                    allowed[v as usize] = true;
                }
                continue;
            }

            let (base, step) = if let Some((a, b)) = part.split_once('/') {
                let step: u32 = b
                    .trim()
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid step: {b}")))?;
                if step == 0 {
                    return Err(Error::Config("step must be > 0".to_string()));
                }
                (a.trim(), Some(step))
            } else {
                (part, None)
            };

            let (start, end) = if base == "*" {
                (min, max)
            } else if let Some((a, b)) = base.split_once('-') {
                let a = parse_u32(a.trim(), allow_7_as_0)?;
                let b = parse_u32(b.trim(), allow_7_as_0)?;
                (a, b)
            } else {
                let a = parse_u32(base.trim(), allow_7_as_0)?;
                if step.is_some() {
                    (a, max)
                } else {
                    (a, a)
                }
            };

            let start = start.max(min);
            let end = end.min(max);
            if start > end {
                return Err(Error::Config(format!("invalid range: {base}")));
            }

            let step = step.unwrap_or(1);
            let mut v = start;
            while v <= end {
                allowed[v as usize] = true;
                v = v.saturating_add(step);
            }
        }

        let mut any = true;
        for v in min..=max {
            if !allowed[v as usize] {
                any = false;
                break;
            }
        }

        Ok(Self {
            min,
            max,
            any,
            allowed,
        })
    }

    fn contains(&self, v: u32) -> bool {
        if v < self.min || v > self.max {
            return false;
        }
        self.allowed.get(v as usize).copied().unwrap_or(false)
    }

    /// Smallest allowed value >= `v`, if any.
    fn first_at_or_after(&self, v: u32) -> Option<u32> {
        (v.max(self.min)..=self.max).find(|&c| self.allowed[c as usize])
    }
}

fn parse_u32(s: &str, allow_7_as_0: bool) -> Result<u32> {
    let mut v: u32 = s
        .parse()
        .map_err(|_| Error::Config(format!("invalid number: {s}")))?;
    if allow_7_as_0 && v == 7 {
        v = 0;
    }
    Ok(v)
}
