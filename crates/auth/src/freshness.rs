//! Credential-freshness gate (step-up authentication).
//!
//! Each session records when its credentials were last verified, either at
//! login or by re-entering the current password. Sensitive operations require
//! that timestamp to be within a configured window. Records older than the
//! window are swept at most once per window, on the next verification.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;

use gatehouse_core::{AccessError, AccessResult, Clock, SessionId, SystemClock};

/// Default step-up window.
pub const DEFAULT_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Freshness {
    /// No verification recorded for the session.
    Unverified,
    Fresh,
    Stale,
}

/// Per-session verification timestamps.
///
/// State is sharded per session; sessions never contend on a global lock.
pub struct FreshnessGate {
    window: Duration,
    clock: Arc<dyn Clock>,
    verified: DashMap<SessionId, DateTime<Utc>>,
    /// Millisecond timestamp of the last sweep.
    last_sweep: AtomicI64,
}

impl FreshnessGate {
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        let last_sweep = AtomicI64::new(clock.now().timestamp_millis());
        Self {
            window,
            clock,
            verified: DashMap::new(),
            last_sweep,
        }
    }

    pub fn with_system_clock(window: Duration) -> Self {
        Self::new(window, Arc::new(SystemClock))
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a successful credential check (login or re-entry).
    pub fn mark_verified(&self, session: SessionId) {
        let now = self.clock.now();
        self.sweep_if_due(now);
        self.verified.insert(session, now);
        tracing::debug!(%session, "credentials verified");
    }

    pub fn verified_at(&self, session: SessionId) -> Option<DateTime<Utc>> {
        self.verified.get(&session).map(|entry| *entry.value())
    }

    pub fn state(&self, session: SessionId) -> Freshness {
        match self.verified_at(session) {
            None => Freshness::Unverified,
            Some(at) if self.clock.now() - at <= self.window => Freshness::Fresh,
            Some(_) => Freshness::Stale,
        }
    }

    pub fn is_fresh(&self, session: SessionId) -> bool {
        self.state(session) == Freshness::Fresh
    }

    /// Mandatory gate: fails with `StepUpRequired` unless fresh.
    pub fn require_fresh(&self, session: SessionId) -> AccessResult<()> {
        if self.is_fresh(session) {
            return Ok(());
        }
        tracing::warn!(%session, "step-up authentication required");
        Err(AccessError::StepUpRequired)
    }

    /// Forget a session (logout or expiry).
    pub fn discard(&self, session: SessionId) {
        self.verified.remove(&session);
    }

    /// Drop stale records; returns how many were removed.
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now();
        let before = self.verified.len();
        self.verified.retain(|_, at| now - *at <= self.window);
        before.saturating_sub(self.verified.len())
    }

    /// Number of sessions with a recorded verification.
    pub fn tracked(&self) -> usize {
        self.verified.len()
    }

    fn sweep_if_due(&self, now: DateTime<Utc>) {
        let now_ms = now.timestamp_millis();
        let last = self.last_sweep.load(Ordering::Relaxed);
        if now_ms - last <= self.window.num_milliseconds() {
            return;
        }
        // One caller wins the sweep; the others skip it.
        if self
            .last_sweep
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            let purged = self.purge_stale();
            if purged > 0 {
                tracing::debug!(purged, "swept stale session records");
            }
        }
    }
}

impl Default for FreshnessGate {
    fn default() -> Self {
        Self::with_system_clock(Duration::seconds(DEFAULT_WINDOW_SECS))
    }
}
