use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Seat Intent ──────────────────────────────────────────────────

/// The controller's authoritative belief about its own seat occupancy.
///
/// Exactly one value at a time; transitions happen only inside the
/// controller. `AttemptingJoin`/`AttemptingLeave` are paired with the
/// in-flight guard — at most one attempt exists at any instant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatIntent {
    #[default]
    Idle,
    AttemptingJoin,
    Occupied,
    AttemptingLeave,
}

impl SeatIntent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AttemptingJoin => "attempting_join",
            Self::Occupied => "occupied",
            Self::AttemptingLeave => "attempting_leave",
        }
    }
}

impl fmt::Display for SeatIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Occupants & Snapshot ─────────────────────────────────────────

/// Classification of a seat occupant. The tagged enum (rather than a
/// trio of booleans) makes contradictory tag combinations unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupantKind {
    SelfAgent,
    PeerAgent,
    Human,
}

impl OccupantKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfAgent => "self_agent",
            Self::PeerAgent => "peer_agent",
            Self::Human => "human",
        }
    }
}

/// One occupied performer seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatOccupant {
    /// Service-level identity (stable user id).
    pub identity: String,
    /// Display name, when the service provided one.
    pub name: Option<String>,
    pub kind: OccupantKind,
}

/// Authoritative view of who holds each seat and who is in the room.
///
/// Produced externally and supplied per trigger; the controller reads the
/// latest value during an evaluation and never stores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Seat occupants in seat order. Empty seats are simply absent.
    pub seats: Vec<SeatOccupant>,
    /// Headcount of non-performing listeners.
    pub audience: u32,
    pub taken_at: DateTime<Utc>,
}

impl RoomSnapshot {
    /// Number of occupied seats.
    pub fn occupied_seats(&self) -> u32 {
        self.seats.len() as u32
    }

    /// Number of peer agents currently holding a seat.
    pub fn peer_agents_seated(&self) -> u32 {
        self.seats
            .iter()
            .filter(|o| o.kind == OccupantKind::PeerAgent)
            .count() as u32
    }

    /// Whether the self identity holds any seat.
    pub fn self_seated(&self) -> bool {
        self.seats.iter().any(|o| o.kind == OccupantKind::SelfAgent)
    }
}

// ─── Session Progress ─────────────────────────────────────────────

/// Progress within the current seated session.
///
/// `songs_played` is reset on every successful join. `set_allowance` is the
/// granted set size when the join consumed an allowance-bearing grant, and
/// `set_played` counts own tracks toward that allowance.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub songs_played: u32,
    pub set_allowance: Option<u32>,
    pub set_played: u32,
}

impl SessionProgress {
    /// Reset for a fresh session, carrying the allowance of the grant that
    /// justified the join (if any).
    pub fn reset_for_join(allowance: Option<u32>) -> Self {
        Self {
            songs_played: 0,
            set_allowance: allowance,
            set_played: 0,
        }
    }

    /// Record one own track played while seated.
    pub fn note_own_track(&mut self) {
        self.songs_played = self.songs_played.saturating_add(1);
        self.set_played = self.set_played.saturating_add(1);
    }

    /// True when a granted set has been fully played.
    pub fn allowance_exhausted(&self) -> bool {
        match self.set_allowance {
            Some(allowance) => allowance > 0 && self.set_played >= allowance,
            None => false,
        }
    }
}

// ─── Permission Signals ───────────────────────────────────────────

/// Semantic permission event, as translated from the private message
/// channel by `stagehand-source-chat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionEvent {
    /// Permission to join, optionally bounded to a set of `allowance` tracks.
    Granted { allowance: Option<u32> },
    /// Directive to stay off the seats for a while.
    MustWait,
    /// Prior restrictions lifted.
    Cleared,
}

/// A stored, single-use permission token.
///
/// Consuming it bypasses both the cooldown gate and the penalty window for
/// exactly one join attempt; it cannot be reused until re-granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub allowance: Option<u32>,
    pub consumed: bool,
}

impl PermissionGrant {
    pub fn new(allowance: Option<u32>) -> Self {
        Self {
            allowance,
            consumed: false,
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.consumed
    }
}

// ─── Playable Content ─────────────────────────────────────────────

/// A piece of content ready to perform. Seat admission requires one of
/// these before the join is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayableItem {
    pub artist: String,
    pub title: String,
    /// Service catalog id, when already resolved.
    pub catalog_id: Option<String>,
}

impl PlayableItem {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
            catalog_id: None,
        }
    }
}

impl fmt::Display for PlayableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} — {}", self.artist, self.title)
    }
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 20, 0, 0)
            .single()
            .expect("valid datetime")
    }

    fn occupant(identity: &str, kind: OccupantKind) -> SeatOccupant {
        SeatOccupant {
            identity: identity.to_owned(),
            name: None,
            kind,
        }
    }

    #[test]
    fn seat_intent_serde_roundtrip() {
        for intent in [
            SeatIntent::Idle,
            SeatIntent::AttemptingJoin,
            SeatIntent::Occupied,
            SeatIntent::AttemptingLeave,
        ] {
            let json = serde_json::to_string(&intent).expect("serialize");
            let back: SeatIntent = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(intent, back);
        }
    }

    #[test]
    fn seat_intent_default_is_idle() {
        assert_eq!(SeatIntent::default(), SeatIntent::Idle);
    }

    #[test]
    fn snapshot_counts() {
        let snap = RoomSnapshot {
            seats: vec![
                occupant("bot-1", OccupantKind::PeerAgent),
                occupant("me", OccupantKind::SelfAgent),
                occupant("alice", OccupantKind::Human),
            ],
            audience: 7,
            taken_at: t0(),
        };
        assert_eq!(snap.occupied_seats(), 3);
        assert_eq!(snap.peer_agents_seated(), 1);
        assert!(snap.self_seated());
    }

    #[test]
    fn snapshot_without_self() {
        let snap = RoomSnapshot {
            seats: vec![occupant("alice", OccupantKind::Human)],
            audience: 0,
            taken_at: t0(),
        };
        assert!(!snap.self_seated());
        assert_eq!(snap.peer_agents_seated(), 0);
    }

    #[test]
    fn session_progress_reset_and_track() {
        let mut progress = SessionProgress::reset_for_join(Some(2));
        assert_eq!(progress.songs_played, 0);
        assert_eq!(progress.set_allowance, Some(2));
        assert!(!progress.allowance_exhausted());

        progress.note_own_track();
        assert_eq!(progress.songs_played, 1);
        assert!(!progress.allowance_exhausted());

        progress.note_own_track();
        assert_eq!(progress.set_played, 2);
        assert!(progress.allowance_exhausted());
    }

    #[test]
    fn session_progress_without_allowance_never_exhausts() {
        let mut progress = SessionProgress::reset_for_join(None);
        for _ in 0..10 {
            progress.note_own_track();
        }
        assert!(!progress.allowance_exhausted());
        assert_eq!(progress.songs_played, 10);
    }

    #[test]
    fn permission_event_serde() {
        let ev = PermissionEvent::Granted { allowance: Some(3) };
        let json = serde_json::to_string(&ev).expect("serialize");
        assert!(json.contains("granted"));
        let back: PermissionEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(ev, back);
    }

    #[test]
    fn grant_usable_until_consumed() {
        let mut grant = PermissionGrant::new(Some(2));
        assert!(grant.is_usable());
        grant.consumed = true;
        assert!(!grant.is_usable());
    }
}
