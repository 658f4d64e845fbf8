//! Keyword translation from chat text to [`PermissionEvent`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use stagehand_core::types::PermissionEvent;

/// Raw chat message as pushed by the transport process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Service-level identity of the sender.
    pub sender: String,
    pub text: String,
    /// True when the message arrived on the private channel.
    #[serde(default)]
    pub private: bool,
}

/// Which senders are allowed to issue permission signals, and whether the
/// signal must arrive privately.
#[derive(Debug, Clone)]
pub struct SignalConfig {
    authorities: HashSet<String>,
    require_private: bool,
}

impl SignalConfig {
    pub fn new(authorities: impl IntoIterator<Item = String>, require_private: bool) -> Self {
        Self {
            authorities: authorities.into_iter().collect(),
            require_private,
        }
    }

    fn is_authority(&self, sender: &str) -> bool {
        self.authorities.contains(sender)
    }
}

// ─── Phrase tables ──────────────────────────────────────────────────

const GRANT_PHRASES: &[&str] = &[
    "you can play",
    "go ahead",
    "hop up",
    "you're up",
    "youre up",
    "take a seat",
    "come on up",
];

const WAIT_PHRASES: &[&str] = &[
    "wait",
    "hold off",
    "not now",
    "not yet",
    "stand by",
    "stay down",
];

const CLEAR_PHRASES: &[&str] = &[
    "never mind",
    "nevermind",
    "you're good",
    "youre good",
    "all clear",
];

/// Allowance counts outside this range are ignored as noise.
const MAX_ALLOWANCE: u32 = 25;

// ─── Translation ────────────────────────────────────────────────────

/// Translate a chat message into a permission event.
///
/// Returns `None` for senders outside the authority set, non-private
/// messages (when required), and text matching no phrase table. A message
/// matching both a wait phrase and anything else is ambiguous and resolves
/// to `MustWait`.
pub fn translate(msg: &ChatMessage, cfg: &SignalConfig) -> Option<PermissionEvent> {
    if !cfg.is_authority(&msg.sender) {
        return None;
    }
    if cfg.require_private && !msg.private {
        return None;
    }

    let text = msg.text.to_lowercase();
    let grant_hit = GRANT_PHRASES.iter().any(|p| contains_phrase(&text, p));
    let wait_hit = WAIT_PHRASES.iter().any(|p| contains_phrase(&text, p));
    let clear_hit = CLEAR_PHRASES.iter().any(|p| contains_phrase(&text, p));

    // A wait phrase next to anything else is contradictory; resolve
    // conservatively.
    if wait_hit {
        return Some(PermissionEvent::MustWait);
    }
    if grant_hit {
        return Some(PermissionEvent::Granted {
            allowance: parse_allowance(&text),
        });
    }
    if clear_hit {
        return Some(PermissionEvent::Cleared);
    }
    None
}

/// Substring match on word boundaries, so "wait" does not fire on
/// "awaiting".
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(phrase) {
        let begin = start + pos;
        let end = begin + phrase.len();
        let left_ok = begin == 0
            || !text[..begin]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let right_ok = end == text.len()
            || !text[end..].chars().next().is_some_and(char::is_alphanumeric);
        if left_ok && right_ok {
            return true;
        }
        start = end;
    }
    false
}

/// Extract a set allowance from phrasing like "play 2 songs" or "2 tracks".
/// Bare numbers with no such anchor are ignored.
fn parse_allowance(text: &str) -> Option<u32> {
    let tokens: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    for (i, token) in tokens.iter().enumerate() {
        let Ok(n) = token.parse::<u32>() else {
            continue;
        };
        if n == 0 || n > MAX_ALLOWANCE {
            continue;
        }
        let anchored_before = i > 0 && tokens[i - 1] == "play";
        let anchored_after = tokens
            .get(i + 1)
            .is_some_and(|t| matches!(*t, "song" | "songs" | "track" | "tracks" | "tune" | "tunes"));
        if anchored_before || anchored_after {
            return Some(n);
        }
    }
    None
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> SignalConfig {
        SignalConfig::new(vec!["uid-owner".to_owned()], true)
    }

    fn private(text: &str) -> ChatMessage {
        ChatMessage {
            sender: "uid-owner".to_owned(),
            text: text.to_owned(),
            private: true,
        }
    }

    #[test]
    fn grant_with_allowance() {
        let ev = translate(&private("ok you can play 2 songs tonight"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Granted { allowance: Some(2) }));
    }

    #[test]
    fn grant_without_allowance() {
        let ev = translate(&private("go ahead and spin something"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Granted { allowance: None }));
    }

    #[test]
    fn allowance_needs_an_anchor() {
        // "8" is a time, not a set size.
        let ev = translate(&private("hop up around 8 if you want"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Granted { allowance: None }));
    }

    #[test]
    fn wait_directive() {
        let ev = translate(&private("please hold off for a bit"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::MustWait));
    }

    #[test]
    fn wait_wins_over_grant() {
        // Contradictory phrasing resolves conservatively.
        let ev = translate(&private("you can play later but wait for now"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::MustWait));
    }

    #[test]
    fn cleared() {
        let ev = translate(&private("never mind, all clear"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Cleared));
    }

    #[test]
    fn word_boundaries_respected() {
        // "awaiting" must not fire the "wait" phrase.
        let ev = translate(&private("awaiting the next set, hop up"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Granted { allowance: None }));
    }

    #[test]
    fn unknown_sender_ignored() {
        let msg = ChatMessage {
            sender: "uid-stranger".to_owned(),
            text: "hop up".to_owned(),
            private: true,
        };
        assert_eq!(translate(&msg, &cfg()), None);
    }

    #[test]
    fn public_message_ignored_when_private_required() {
        let msg = ChatMessage {
            sender: "uid-owner".to_owned(),
            text: "hop up".to_owned(),
            private: false,
        };
        assert_eq!(translate(&msg, &cfg()), None);

        let relaxed = SignalConfig::new(vec!["uid-owner".to_owned()], false);
        assert_eq!(
            translate(&msg, &relaxed),
            Some(PermissionEvent::Granted { allowance: None })
        );
    }

    #[test]
    fn unrelated_chatter_produces_nothing() {
        assert_eq!(translate(&private("great track!"), &cfg()), None);
    }

    #[test]
    fn oversized_allowance_ignored() {
        let ev = translate(&private("you can play 500 songs"), &cfg());
        assert_eq!(ev, Some(PermissionEvent::Granted { allowance: None }));
    }

    #[test]
    fn chat_message_deserializes_with_default_private() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"sender":"uid-owner","text":"hop up"}"#).expect("deserialize");
        assert!(!msg.private);
    }
}
