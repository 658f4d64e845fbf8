//! Occupant classification against the known-agent roster.

use std::collections::HashSet;

use stagehand_core::types::OccupantKind;

/// Identities the classifier treats specially: the agent's own identity
/// and the registry of known peer agents.
#[derive(Debug, Clone)]
pub struct RosterConfig {
    self_identity: String,
    peer_agents: HashSet<String>,
}

impl RosterConfig {
    pub fn new(
        self_identity: impl Into<String>,
        peer_agents: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            self_identity: self_identity.into(),
            peer_agents: peer_agents.into_iter().collect(),
        }
    }

    pub fn self_identity(&self) -> &str {
        &self.self_identity
    }

    /// Classify a seat occupant.
    ///
    /// The self identity and roster entries match exactly (deterministic);
    /// beyond that a conservative name heuristic catches unregistered
    /// agents. Anything else is assumed human.
    pub fn classify(&self, identity: &str, name: Option<&str>) -> OccupantKind {
        if identity == self.self_identity {
            return OccupantKind::SelfAgent;
        }
        if self.peer_agents.contains(identity) {
            return OccupantKind::PeerAgent;
        }
        if name.is_some_and(looks_like_agent) || looks_like_agent(identity) {
            return OccupantKind::PeerAgent;
        }
        OccupantKind::Human
    }
}

/// Name heuristic for unregistered agents. Deliberately narrow: a false
/// "human" is cheaper than treating a person as a bot.
fn looks_like_agent(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with("bot") || lower.ends_with("-bot") || lower.ends_with("_bot")
}

// ─── Tests ──────────────────────────────────────────────────────────
