//! stagehand-source-chat: permission signal translation.
//!
//! Turns free-text (private) chat messages from configured authority
//! identities into semantic permission events via keyword matching. The
//! matching is inherently unreliable, so it is deliberately conservative:
//! contradictory phrasing resolves to a must-wait directive.

pub mod translate;

pub use translate::{ChatMessage, SignalConfig, translate};
