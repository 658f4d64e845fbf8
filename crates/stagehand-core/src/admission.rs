//! Join/departure decision predicates.
//!
//! Pure functions over the latest room snapshot, the pacing clock, and the
//! controller's own state. Each verdict carries a stable reason string so
//! the controller can log decisions and tests can assert on them.

use chrono::{DateTime, Utc};

use crate::pacing::PacingClock;
use crate::types::{PermissionGrant, RoomSnapshot, SeatIntent, SessionProgress};

/// Default total-occupancy level at which the agent yields its seat when no
/// peer agents remain (the agent plus the humans crowding it out).
pub const DEFAULT_DEPARTURE_THRESHOLD: u32 = 4;

// ─── Join ───────────────────────────────────────────────────────────

/// Which pacing bypass, if any, a positive join verdict relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacingBypass {
    /// An unconsumed permission grant (overrides penalty and cooldown).
    Grant,
    /// The one-time boot grace fast path.
    BootGrace,
}

/// Outcome of evaluating the join conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinVerdict {
    pub allow: bool,
    pub reason: &'static str,
    pub bypass: Option<PacingBypass>,
}

impl JoinVerdict {
    fn deny(reason: &'static str) -> Self {
        Self {
            allow: false,
            reason,
            bypass: None,
        }
    }

    fn allow(reason: &'static str, bypass: Option<PacingBypass>) -> Self {
        Self {
            allow: true,
            reason,
            bypass,
        }
    }
}

/// Everything the join decision reads.
#[derive(Debug, Clone, Copy)]
pub struct JoinContext<'a> {
    pub snapshot: &'a RoomSnapshot,
    pub intent: SeatIntent,
    pub in_flight: bool,
    pub hold: bool,
    pub grant: Option<&'a PermissionGrant>,
    pub clock: &'a PacingClock,
}

/// Evaluate the join conditions against the latest snapshot.
///
/// All of the following must hold: a peer agent is seated and self is not;
/// no attempt is in flight; no operator hold; the penalty window is
/// inactive or overridden by a grant; and the cooldown gate is open or
/// bypassed (grant, or the one-time boot grace).
pub fn evaluate_join(ctx: JoinContext<'_>, now: DateTime<Utc>) -> JoinVerdict {
    if ctx.in_flight {
        return JoinVerdict::deny("attempt_in_flight");
    }
    if ctx.intent != SeatIntent::Idle {
        return JoinVerdict::deny("intent_not_idle");
    }
    if ctx.hold {
        return JoinVerdict::deny("operator_hold");
    }
    if ctx.snapshot.self_seated() {
        return JoinVerdict::deny("already_seated");
    }
    if ctx.snapshot.peer_agents_seated() == 0 {
        return JoinVerdict::deny("no_peer_agents");
    }

    let grant_usable = ctx.grant.is_some_and(PermissionGrant::is_usable);

    // A grant is the strongest signal: it overrides an active penalty and
    // the cooldown gate, and is consumed by the attempt it justifies.
    if grant_usable {
        return JoinVerdict::allow("grant", Some(PacingBypass::Grant));
    }
    if ctx.clock.is_penalty_active(now) {
        return JoinVerdict::deny("penalty_active");
    }
    if ctx.clock.is_cooldown_satisfied(now) {
        return JoinVerdict::allow("cooldown_elapsed", None);
    }
    if ctx.clock.is_boot_grace_available(now) {
        return JoinVerdict::allow("boot_grace", Some(PacingBypass::BootGrace));
    }

    JoinVerdict::deny("cooldown_pending")
}

// ─── Departure ──────────────────────────────────────────────────────

/// Outcome of evaluating the departure conditions (only meaningful while
/// `Occupied`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartVerdict {
    pub depart: bool,
    pub reason: &'static str,
}

impl DepartVerdict {
    fn stay(reason: &'static str) -> Self {
        Self {
            depart: false,
            reason,
        }
    }

    fn depart(reason: &'static str) -> Self {
        Self {
            depart: true,
            reason,
        }
    }
}

/// Evaluate the departure conditions against the latest snapshot.
///
/// The agent must have contributed at least one track before yielding
/// (anti-flap). It then departs when humans crowd a peer-agent-free stage,
/// when a granted set has been fully played, or when an operator hold is
/// engaged.
pub fn evaluate_depart(
    snapshot: &RoomSnapshot,
    progress: &SessionProgress,
    hold: bool,
    departure_threshold: u32,
) -> DepartVerdict {
    if progress.songs_played < 1 {
        return DepartVerdict::stay("minimum_contribution_pending");
    }
    if hold {
        return DepartVerdict::depart("operator_hold");
    }
    if progress.allowance_exhausted() {
        return DepartVerdict::depart("allowance_exhausted");
    }
    if snapshot.peer_agents_seated() == 0 && snapshot.occupied_seats() >= departure_threshold {
        return DepartVerdict::depart("human_pressure");
    }
    DepartVerdict::stay("no_pressure")
}

// ─── Tests ──────────────────────────────────────────────────────────
