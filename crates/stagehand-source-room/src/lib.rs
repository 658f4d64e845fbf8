//! stagehand-source-room: room occupancy snapshot ingestion.
//!
//! Validates raw room-state payloads pushed by the external transport
//! process and classifies every seat occupant (self / peer agent / human)
//! against the configured roster.

pub mod parse;
pub mod roster;

pub use parse::{SnapshotError, parse_snapshot};
pub use roster::RosterConfig;
