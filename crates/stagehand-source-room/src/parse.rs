//! Raw room-state payload validation.
//!
//! The transport process pushes room state as loose JSON; a payload that
//! fails validation is rejected whole (the daemon skips the cycle and
//! mutates nothing).

use chrono::{DateTime, Utc};
use thiserror::Error;

use stagehand_core::types::{RoomSnapshot, SeatOccupant};

use crate::roster::RosterConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot missing required field: {0}")]
    MissingField(&'static str),

    #[error("seat entry {index} invalid: {detail}")]
    InvalidSeat { index: usize, detail: String },

    #[error("invalid audience count: {0}")]
    InvalidAudience(String),

    #[error("invalid taken_at timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Validate a raw payload and classify its occupants.
///
/// `now` is used when the payload carries no capture timestamp.
pub fn parse_snapshot(
    raw: &serde_json::Value,
    roster: &RosterConfig,
    now: DateTime<Utc>,
) -> Result<RoomSnapshot, SnapshotError> {
    let seats_raw = raw
        .get("seats")
        .and_then(|v| v.as_array())
        .ok_or(SnapshotError::MissingField("seats"))?;

    let mut seats = Vec::with_capacity(seats_raw.len());
    for (index, entry) in seats_raw.iter().enumerate() {
        let identity = entry
            .get("user_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SnapshotError::InvalidSeat {
                index,
                detail: "missing user_id".to_owned(),
            })?;
        if identity.is_empty() {
            return Err(SnapshotError::InvalidSeat {
                index,
                detail: "empty user_id".to_owned(),
            });
        }
        let name = entry
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_owned);

        let kind = roster.classify(identity, name.as_deref());
        seats.push(SeatOccupant {
            identity: identity.to_owned(),
            name,
            kind,
        });
    }

    let audience = match raw.get("audience") {
        None | Some(serde_json::Value::Null) => 0,
        Some(v) => v
            .as_u64()
            .map(|n| n.min(u32::MAX as u64) as u32)
            .ok_or_else(|| SnapshotError::InvalidAudience(v.to_string()))?,
    };

    let taken_at = match raw.get("taken_at") {
        None | Some(serde_json::Value::Null) => now,
        Some(v) => {
            let s = v
                .as_str()
                .ok_or_else(|| SnapshotError::InvalidTimestamp(v.to_string()))?;
            DateTime::parse_from_rfc3339(s)
                .map_err(|e| SnapshotError::InvalidTimestamp(format!("{s}: {e}")))?
                .with_timezone(&Utc)
        }
    };

    Ok(RoomSnapshot {
        seats,
        audience,
        taken_at,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_core::types::OccupantKind;

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid RFC3339 timestamp")
            .with_timezone(&Utc)
    }

    fn now() -> DateTime<Utc> {
        ts("2026-03-10T20:00:00Z")
    }

    fn roster() -> RosterConfig {
        RosterConfig::new("uid-self", vec!["uid-groove".to_owned()])
    }

    #[test]
    fn full_payload_parses_and_classifies() {
        let raw = serde_json::json!({
            "seats": [
                {"user_id": "uid-self", "name": "Stagehand"},
                {"user_id": "uid-groove", "name": "GrooveMachine"},
                {"user_id": "uid-42", "name": "alice"},
            ],
            "audience": 7,
            "taken_at": "2026-03-10T20:00:05Z",
        });

        let snap = parse_snapshot(&raw, &roster(), now()).expect("valid payload");
        assert_eq!(snap.seats.len(), 3);
        assert_eq!(snap.seats[0].kind, OccupantKind::SelfAgent);
        assert_eq!(snap.seats[1].kind, OccupantKind::PeerAgent);
        assert_eq!(snap.seats[2].kind, OccupantKind::Human);
        assert_eq!(snap.audience, 7);
        assert_eq!(snap.taken_at, ts("2026-03-10T20:00:05Z"));
    }

    #[test]
    fn empty_seats_is_valid() {
        let raw = serde_json::json!({"seats": []});
        let snap = parse_snapshot(&raw, &roster(), now()).expect("valid payload");
        assert!(snap.seats.is_empty());
        assert_eq!(snap.audience, 0);
        assert_eq!(snap.taken_at, now());
    }

    #[test]
    fn missing_seats_rejected() {
        let raw = serde_json::json!({"audience": 3});
        let err = parse_snapshot(&raw, &roster(), now()).expect_err("invalid payload");
        assert_eq!(err, SnapshotError::MissingField("seats"));
    }

    #[test]
    fn seat_without_user_id_rejected() {
        let raw = serde_json::json!({"seats": [{"name": "ghost"}]});
        let err = parse_snapshot(&raw, &roster(), now()).expect_err("invalid payload");
        assert!(matches!(err, SnapshotError::InvalidSeat { index: 0, .. }));
    }

    #[test]
    fn empty_user_id_rejected() {
        let raw = serde_json::json!({"seats": [{"user_id": ""}]});
        let err = parse_snapshot(&raw, &roster(), now()).expect_err("invalid payload");
        assert!(matches!(err, SnapshotError::InvalidSeat { index: 0, .. }));
    }

    #[test]
    fn bad_audience_rejected() {
        let raw = serde_json::json!({"seats": [], "audience": "many"});
        let err = parse_snapshot(&raw, &roster(), now()).expect_err("invalid payload");
        assert!(matches!(err, SnapshotError::InvalidAudience(_)));
    }

    #[test]
    fn bad_timestamp_rejected() {
        let raw = serde_json::json!({"seats": [], "taken_at": "yesterday"});
        let err = parse_snapshot(&raw, &roster(), now()).expect_err("invalid payload");
        assert!(matches!(err, SnapshotError::InvalidTimestamp(_)));
    }
}
