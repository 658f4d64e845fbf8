//! The seat admission controller.
//!
//! Single logical thread of control: the runtime's trigger loop calls into
//! `&mut self` methods sequentially, and every admission/departure attempt
//! fully resolves before the next evaluation starts. The in-flight guard is
//! set synchronously before the first awaited call of an attempt and
//! cleared symmetrically after the last — the check-then-act window this
//! closes is the critical correctness property of the whole component.

use chrono::{DateTime, Utc};
use tokio::time::{Duration, timeout};

use stagehand_core::admission::{
    DEFAULT_DEPARTURE_THRESHOLD, JoinContext, PacingBypass, evaluate_depart, evaluate_join,
};
use stagehand_core::pacing::{PacingClock, PacingConfig};
use stagehand_core::reconcile::{Reconciliation, reconcile};
use stagehand_core::types::{
    PermissionEvent, PermissionGrant, RoomSnapshot, SeatIntent, SessionProgress,
};

use crate::error::ControllerError;
use crate::status::{ControllerStatus, GrantStatus};
use crate::traits::{ContentProvider, SeatTransport};

// ─── Config ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    pub pacing: PacingConfig,
    /// Total-occupancy level triggering departure when no peers remain.
    pub departure_threshold: u32,
    pub content_timeout_secs: u64,
    pub join_timeout_secs: u64,
    pub leave_timeout_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pacing: PacingConfig::default(),
            departure_threshold: DEFAULT_DEPARTURE_THRESHOLD,
            content_timeout_secs: 10,
            join_timeout_secs: 10,
            leave_timeout_secs: 5,
        }
    }
}

/// Result of an administrative override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceOutcome {
    Joined,
    JoinFailed,
    Left,
    AlreadyOccupied,
    NotOccupied,
}

impl ForceOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Joined => "joined",
            Self::JoinFailed => "join_failed",
            Self::Left => "left",
            Self::AlreadyOccupied => "already_occupied",
            Self::NotOccupied => "not_occupied",
        }
    }
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct SeatController<C, T> {
    config: ControllerConfig,
    provider: C,
    transport: T,
    intent: SeatIntent,
    in_flight: bool,
    clock: PacingClock,
    grant: Option<PermissionGrant>,
    progress: SessionProgress,
    hold: bool,
}

impl<C: ContentProvider, T: SeatTransport> SeatController<C, T> {
    pub fn new(config: ControllerConfig, provider: C, transport: T, now: DateTime<Utc>) -> Self {
        Self {
            clock: PacingClock::new(config.pacing, now),
            config,
            provider,
            transport,
            intent: SeatIntent::Idle,
            in_flight: false,
            grant: None,
            progress: SessionProgress::default(),
            hold: false,
        }
    }

    pub fn intent(&self) -> SeatIntent {
        self.intent
    }

    // ── Trigger surface ─────────────────────────────────────────────

    /// A fresh authoritative snapshot arrived: reconcile belief against it,
    /// then evaluate join/departure.
    pub async fn handle_snapshot(&mut self, snapshot: &RoomSnapshot, now: DateTime<Utc>) {
        match reconcile(self.intent, snapshot) {
            Reconciliation::Consistent => {}
            Reconciliation::ExternallyRemoved => {
                tracing::warn!(
                    penalty_secs = self.config.pacing.ejection_penalty_secs,
                    "externally removed from seat; applying penalty window"
                );
                self.clock
                    .apply_penalty(now, self.config.pacing.ejection_penalty_secs);
                self.intent = SeatIntent::Idle;
            }
            Reconciliation::ExternallySeated => {
                tracing::warn!("snapshot shows self seated; adopting occupied state");
                self.intent = SeatIntent::Occupied;
                self.progress = SessionProgress::reset_for_join(None);
                self.clock.consume_boot_grace();
            }
            Reconciliation::LeaveConfirmed => {
                // Pending leave already reflected by the room: vacuously
                // satisfied, guard cleared without waiting on the transport.
                tracing::info!("pending leave confirmed by snapshot");
                self.intent = SeatIntent::Idle;
                self.in_flight = false;
            }
        }

        self.evaluate(snapshot, now).await;
    }

    /// Periodic re-evaluation against the latest known snapshot.
    pub async fn tick(&mut self, snapshot: Option<&RoomSnapshot>, now: DateTime<Utc>) {
        if let Some(snapshot) = snapshot {
            self.evaluate(snapshot, now).await;
        }
    }

    /// A semantic permission event arrived from the private channel.
    pub fn handle_permission(&mut self, event: PermissionEvent, now: DateTime<Utc>) {
        // Any explicit signal permanently closes the first-run fast path.
        self.clock.close_boot_grace();

        match event {
            PermissionEvent::Granted { allowance } => {
                tracing::info!(?allowance, "permission granted");
                self.grant = Some(PermissionGrant::new(allowance));
                self.clock.clear_penalty();
            }
            PermissionEvent::MustWait => {
                tracing::info!(
                    penalty_secs = self.config.pacing.must_wait_penalty_secs,
                    "must-wait directive received"
                );
                self.grant = None;
                self.clock
                    .apply_penalty(now, self.config.pacing.must_wait_penalty_secs);
            }
            PermissionEvent::Cleared => {
                tracing::info!("restrictions cleared");
                self.clock.clear_penalty();
            }
        }
    }

    /// A track started; `by_self` is true when the performer is this agent.
    pub async fn handle_track_played(
        &mut self,
        by_self: bool,
        snapshot: Option<&RoomSnapshot>,
        now: DateTime<Utc>,
    ) {
        if !by_self {
            return;
        }
        if self.intent != SeatIntent::Occupied {
            tracing::debug!("own track reported while not occupied; ignoring");
            return;
        }
        self.progress.note_own_track();
        tracing::debug!(
            songs_played = self.progress.songs_played,
            set_played = self.progress.set_played,
            "own track played"
        );
        if let Some(snapshot) = snapshot {
            self.evaluate(snapshot, now).await;
        }
    }

    // ── Administrative overrides ────────────────────────────────────

    /// Join immediately, bypassing predicate evaluation. Still respects the
    /// in-flight guard.
    pub async fn force_join(&mut self, now: DateTime<Utc>) -> Result<ForceOutcome, ControllerError> {
        if self.in_flight {
            tracing::error!("force-join rejected: attempt already in flight");
            return Err(ControllerError::AttemptInFlight);
        }
        if self.intent == SeatIntent::Occupied {
            return Ok(ForceOutcome::AlreadyOccupied);
        }
        tracing::info!("force-join requested");
        if self.attempt_join(None, now).await {
            Ok(ForceOutcome::Joined)
        } else {
            Ok(ForceOutcome::JoinFailed)
        }
    }

    /// Leave immediately, bypassing predicate evaluation. Still respects
    /// the in-flight guard.
    pub async fn force_leave(
        &mut self,
        now: DateTime<Utc>,
    ) -> Result<ForceOutcome, ControllerError> {
        if self.in_flight {
            tracing::error!("force-leave rejected: attempt already in flight");
            return Err(ControllerError::AttemptInFlight);
        }
        if self.intent != SeatIntent::Occupied {
            return Ok(ForceOutcome::NotOccupied);
        }
        tracing::info!("force-leave requested");
        self.perform_leave(now).await;
        Ok(ForceOutcome::Left)
    }

    /// Engage the operator hold: no automatic joins, and an occupied seat
    /// is yielded at the next evaluation (after the minimum contribution).
    pub fn hold(&mut self) {
        if !self.hold {
            tracing::info!("operator hold engaged");
        }
        self.hold = true;
    }

    /// Lift the operator hold.
    pub fn release(&mut self) {
        if self.hold {
            tracing::info!("operator hold released");
        }
        self.hold = false;
    }

    pub fn status(&self, now: DateTime<Utc>) -> ControllerStatus {
        ControllerStatus {
            intent: self.intent,
            in_flight: self.in_flight,
            hold: self.hold,
            penalty_remaining_secs: self.clock.penalty_remaining(now).map(|d| d.num_seconds()),
            cooldown_remaining_secs: self.clock.cooldown_remaining(now).map(|d| d.num_seconds()),
            boot_grace_available: self.clock.is_boot_grace_available(now),
            grant: self.grant.map(|g| GrantStatus {
                allowance: g.allowance,
                consumed: g.consumed,
            }),
            songs_played: self.progress.songs_played,
            set_allowance: self.progress.set_allowance,
            set_played: self.progress.set_played,
        }
    }

    // ── Evaluation ──────────────────────────────────────────────────

    async fn evaluate(&mut self, snapshot: &RoomSnapshot, now: DateTime<Utc>) {
        match self.intent {
            SeatIntent::Idle => {
                let verdict = evaluate_join(
                    JoinContext {
                        snapshot,
                        intent: self.intent,
                        in_flight: self.in_flight,
                        hold: self.hold,
                        grant: self.grant.as_ref(),
                        clock: &self.clock,
                    },
                    now,
                );
                if verdict.allow {
                    tracing::info!(reason = verdict.reason, "join conditions met");
                    self.attempt_join(verdict.bypass, now).await;
                } else {
                    tracing::debug!(reason = verdict.reason, "join withheld");
                }
            }
            SeatIntent::Occupied => {
                let verdict = evaluate_depart(
                    snapshot,
                    &self.progress,
                    self.hold,
                    self.config.departure_threshold,
                );
                if verdict.depart {
                    tracing::info!(reason = verdict.reason, "departure conditions met");
                    self.attempt_leave(snapshot, now).await;
                }
            }
            SeatIntent::AttemptingJoin | SeatIntent::AttemptingLeave => {
                // Attempts resolve inline; reaching an evaluation in one of
                // these states means a guard was leaked.
                tracing::error!(
                    intent = %self.intent,
                    "evaluation entered with an attempt state; skipping"
                );
            }
        }
    }

    // ── Attempts ────────────────────────────────────────────────────

    /// Run a single admission attempt. Returns true on success.
    ///
    /// The guard is set before the first await and cleared on every exit
    /// path; on failure nothing else is mutated, so the next trigger can
    /// retry safely.
    async fn attempt_join(&mut self, bypass: Option<PacingBypass>, now: DateTime<Utc>) -> bool {
        if self.in_flight {
            tracing::error!("join attempt rejected: attempt already in flight");
            return false;
        }
        self.in_flight = true;
        self.intent = SeatIntent::AttemptingJoin;

        let item = match timeout(
            Duration::from_secs(self.config.content_timeout_secs),
            self.provider.request_next(),
        )
        .await
        {
            Ok(Ok(item)) => item,
            Ok(Err(e)) => {
                tracing::warn!("content provider failed ({e}); proceeding with fallback item");
                self.provider.fallback_item()
            }
            Err(_) => {
                tracing::warn!("content request timed out; proceeding with fallback item");
                self.provider.fallback_item()
            }
        };

        let joined = match timeout(
            Duration::from_secs(self.config.join_timeout_secs),
            self.transport.join(&item),
        )
        .await
        {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::warn!("seat join failed: {e}");
                false
            }
            Err(_) => {
                tracing::warn!("seat join timed out");
                false
            }
        };

        if joined {
            let allowance = match bypass {
                Some(PacingBypass::Grant) => self.grant.and_then(|g| g.allowance),
                _ => None,
            };
            self.intent = SeatIntent::Occupied;
            self.progress = SessionProgress::reset_for_join(allowance);
            self.clock.record_attempt(now);
            self.clock.consume_boot_grace();
            if bypass == Some(PacingBypass::Grant) {
                if let Some(grant) = &mut self.grant {
                    grant.consumed = true;
                }
                self.clock.clear_penalty();
            }
            tracing::info!(item = %item, "seat joined");
        } else {
            self.intent = SeatIntent::Idle;
        }
        self.in_flight = false;
        joined
    }

    /// Run a departure, skipping the transport call when the snapshot
    /// already shows the self identity absent.
    async fn attempt_leave(&mut self, snapshot: &RoomSnapshot, now: DateTime<Utc>) {
        if self.in_flight {
            tracing::error!("leave attempt rejected: attempt already in flight");
            return;
        }
        if !snapshot.self_seated() {
            tracing::info!("departure vacuously satisfied: self already absent");
            self.intent = SeatIntent::Idle;
            return;
        }
        self.perform_leave(now).await;
    }

    /// Best-effort leave: the transport call is always treated as
    /// eventually successful, and the state transitions optimistically.
    async fn perform_leave(&mut self, now: DateTime<Utc>) {
        self.in_flight = true;
        self.intent = SeatIntent::AttemptingLeave;

        match timeout(
            Duration::from_secs(self.config.leave_timeout_secs),
            self.transport.leave(),
        )
        .await
        {
            Ok(Ok(())) => tracing::info!("seat left"),
            Ok(Err(e)) => tracing::warn!("seat leave reported failure ({e}); proceeding"),
            Err(_) => tracing::warn!("seat leave timed out; proceeding"),
        }

        self.intent = SeatIntent::Idle;
        // Pace the next join after yielding, same as after an admission.
        self.clock.record_attempt(now);
        self.in_flight = false;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
