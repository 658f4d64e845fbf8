//! Cooldown/penalty clock for seat admission pacing.
//!
//! Pure function of timestamps — no system clock access, no I/O. Tracks:
//!
//! - **Cooldown gate**: minimum interval between recorded attempts.
//! - **Penalty window**: externally imposed absence period; while active it
//!   dominates the cooldown and blocks joins outright.
//! - **Boot grace**: one-time fast path open for a short window after
//!   construction, usable only before any permission signal has arrived.

use chrono::{DateTime, TimeDelta, Utc};

/// Default minimum interval between join attempts (seconds).
pub const DEFAULT_COOLDOWN_SECS: u64 = 120;

/// Default penalty applied after an external removal from a seat (seconds).
pub const DEFAULT_EJECTION_PENALTY_SECS: u64 = 2_160;

/// Default penalty applied on a must-wait directive (seconds).
pub const DEFAULT_MUST_WAIT_PENALTY_SECS: u64 = 600;

/// Default boot grace window after process start (seconds).
pub const DEFAULT_BOOT_GRACE_SECS: u64 = 30;

// ─── Config ─────────────────────────────────────────────────────────

/// Pacing durations, all in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub cooldown_secs: u64,
    pub ejection_penalty_secs: u64,
    pub must_wait_penalty_secs: u64,
    pub boot_grace_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
            ejection_penalty_secs: DEFAULT_EJECTION_PENALTY_SECS,
            must_wait_penalty_secs: DEFAULT_MUST_WAIT_PENALTY_SECS,
            boot_grace_secs: DEFAULT_BOOT_GRACE_SECS,
        }
    }
}

// ─── Clock ──────────────────────────────────────────────────────────

/// Pacing state for a single agent.
///
/// All mutators and predicates take `now` explicitly; the clock never reads
/// wall time itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacingClock {
    config: PacingConfig,
    started_at: DateTime<Utc>,
    last_attempt_at: Option<DateTime<Utc>>,
    penalty_until: Option<DateTime<Utc>>,
    boot_grace_consumed: bool,
    boot_grace_closed: bool,
}

impl PacingClock {
    pub fn new(config: PacingConfig, now: DateTime<Utc>) -> Self {
        Self {
            config,
            started_at: now,
            last_attempt_at: None,
            penalty_until: None,
            boot_grace_consumed: false,
            boot_grace_closed: false,
        }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    // ── Predicates ──────────────────────────────────────────────────

    /// True while a penalty window is set and in the future.
    pub fn is_penalty_active(&self, now: DateTime<Utc>) -> bool {
        self.penalty_until.is_some_and(|until| now < until)
    }

    /// Remaining penalty, when one is active.
    pub fn penalty_remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        self.penalty_until
            .filter(|until| now < *until)
            .map(|until| until - now)
    }

    /// True when no attempt has been recorded yet, or the minimum interval
    /// has elapsed since the last one.
    pub fn is_cooldown_satisfied(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempt_at {
            None => true,
            Some(last) => now - last >= TimeDelta::seconds(self.config.cooldown_secs as i64),
        }
    }

    /// Remaining cooldown, when the gate is still closed.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<TimeDelta> {
        let last = self.last_attempt_at?;
        let ready_at = last + TimeDelta::seconds(self.config.cooldown_secs as i64);
        if now < ready_at { Some(ready_at - now) } else { None }
    }

    /// True while the boot grace window is open, unconsumed, and not closed
    /// by a permission signal.
    pub fn is_boot_grace_available(&self, now: DateTime<Utc>) -> bool {
        if self.boot_grace_consumed || self.boot_grace_closed {
            return false;
        }
        now - self.started_at <= TimeDelta::seconds(self.config.boot_grace_secs as i64)
    }

    // ── Mutators ────────────────────────────────────────────────────

    /// Record a completed attempt, arming the cooldown gate.
    pub fn record_attempt(&mut self, now: DateTime<Utc>) {
        self.last_attempt_at = Some(now);
    }

    /// Impose a penalty window ending `duration_secs` from `now`. A longer
    /// window already in force is kept.
    pub fn apply_penalty(&mut self, now: DateTime<Utc>, duration_secs: u64) {
        let until = now + TimeDelta::seconds(duration_secs as i64);
        match self.penalty_until {
            Some(existing) if existing >= until => {}
            _ => self.penalty_until = Some(until),
        }
    }

    pub fn clear_penalty(&mut self) {
        self.penalty_until = None;
    }

    /// Spend the one-time boot grace.
    pub fn consume_boot_grace(&mut self) {
        self.boot_grace_consumed = true;
    }

    /// Close the boot grace permanently (a permission signal arrived).
    pub fn close_boot_grace(&mut self) {
        self.boot_grace_closed = true;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
