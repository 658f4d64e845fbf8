//! Status view exposed to the administrative command layer.

use serde::{Deserialize, Serialize};

use stagehand_core::types::SeatIntent;

/// Client-visible view of a stored permission grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantStatus {
    pub allowance: Option<u32>,
    pub consumed: bool,
}

/// Snapshot of the controller's state for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub intent: SeatIntent,
    pub in_flight: bool,
    pub hold: bool,
    /// Seconds left on an active penalty window, if any.
    pub penalty_remaining_secs: Option<i64>,
    /// Seconds until the cooldown gate reopens, if it is closed.
    pub cooldown_remaining_secs: Option<i64>,
    pub boot_grace_available: bool,
    pub grant: Option<GrantStatus>,
    pub songs_played: u32,
    pub set_allowance: Option<u32>,
    pub set_played: u32,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            intent: SeatIntent::Idle,
            in_flight: false,
            hold: false,
            penalty_remaining_secs: None,
            cooldown_remaining_secs: None,
            boot_grace_available: true,
            grant: None,
            songs_played: 0,
            set_allowance: None,
            set_played: 0,
        }
    }
}
