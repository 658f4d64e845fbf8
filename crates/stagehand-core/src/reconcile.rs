//! Reconciliation of the controller's own-occupancy belief against the
//! authoritative room snapshot.
//!
//! The snapshot always wins; the classification tells the controller which
//! correction (if any) to apply. This is what keeps a missed event from
//! drifting into a double-join or a stuck `Occupied` state.

use crate::types::{RoomSnapshot, SeatIntent};

/// Result of comparing believed self-occupancy with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// Belief and snapshot agree (or an in-flight attempt explains the gap).
    Consistent,
    /// Believed `Occupied`, but the seat was vacated without a
    /// controller-initiated leave: an externally forced removal.
    ExternallyRemoved,
    /// Believed off-seat, but the snapshot shows the self identity seated
    /// (e.g. an operator placed the agent manually).
    ExternallySeated,
    /// A pending leave is already reflected in the snapshot; it is
    /// vacuously satisfied.
    LeaveConfirmed,
}

impl Reconciliation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consistent => "consistent",
            Self::ExternallyRemoved => "externally_removed",
            Self::ExternallySeated => "externally_seated",
            Self::LeaveConfirmed => "leave_confirmed",
        }
    }
}

/// Classify the correction implied by `snapshot` for the current belief.
pub fn reconcile(intent: SeatIntent, snapshot: &RoomSnapshot) -> Reconciliation {
    let seated = snapshot.self_seated();
    match (intent, seated) {
        (SeatIntent::Occupied, true) | (SeatIntent::Idle, false) => Reconciliation::Consistent,
        // An in-flight join is allowed to lag the snapshot in either
        // direction; the attempt's own resolution settles it.
        (SeatIntent::AttemptingJoin, _) => Reconciliation::Consistent,
        (SeatIntent::AttemptingLeave, true) => Reconciliation::Consistent,
        (SeatIntent::AttemptingLeave, false) => Reconciliation::LeaveConfirmed,
        (SeatIntent::Occupied, false) => Reconciliation::ExternallyRemoved,
        (SeatIntent::Idle, true) => Reconciliation::ExternallySeated,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OccupantKind, SeatOccupant};
    use chrono::{DateTime, Utc};

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid RFC3339 timestamp")
            .with_timezone(&Utc)
    }

    fn snap_with_self() -> RoomSnapshot {
        RoomSnapshot {
            seats: vec![SeatOccupant {
                identity: "me".to_owned(),
                name: None,
                kind: OccupantKind::SelfAgent,
            }],
            audience: 0,
            taken_at: ts("2026-03-10T20:00:00Z"),
        }
    }

    fn snap_without_self() -> RoomSnapshot {
        RoomSnapshot {
            seats: vec![SeatOccupant {
                identity: "alice".to_owned(),
                name: None,
                kind: OccupantKind::Human,
            }],
            audience: 0,
            taken_at: ts("2026-03-10T20:00:00Z"),
        }
    }

    #[test]
    fn occupied_and_seated_is_consistent() {
        assert_eq!(
            reconcile(SeatIntent::Occupied, &snap_with_self()),
            Reconciliation::Consistent
        );
    }

    #[test]
    fn idle_and_absent_is_consistent() {
        assert_eq!(
            reconcile(SeatIntent::Idle, &snap_without_self()),
            Reconciliation::Consistent
        );
    }

    #[test]
    fn occupied_but_absent_is_external_removal() {
        assert_eq!(
            reconcile(SeatIntent::Occupied, &snap_without_self()),
            Reconciliation::ExternallyRemoved
        );
    }

    #[test]
    fn idle_but_seated_is_external_seating() {
        assert_eq!(
            reconcile(SeatIntent::Idle, &snap_with_self()),
            Reconciliation::ExternallySeated
        );
    }

    #[test]
    fn pending_leave_vacuously_satisfied() {
        assert_eq!(
            reconcile(SeatIntent::AttemptingLeave, &snap_without_self()),
            Reconciliation::LeaveConfirmed
        );
    }

    #[test]
    fn in_flight_join_lag_is_consistent() {
        assert_eq!(
            reconcile(SeatIntent::AttemptingJoin, &snap_without_self()),
            Reconciliation::Consistent
        );
        assert_eq!(
            reconcile(SeatIntent::AttemptingJoin, &snap_with_self()),
            Reconciliation::Consistent
        );
    }
}
