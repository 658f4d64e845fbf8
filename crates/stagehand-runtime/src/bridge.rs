//! Transport bridge: the external transport process (which owns the real
//! socket connection to the service) pulls queued seat commands over the
//! admin socket and posts their outcomes back.
//!
//! The pending table lives behind its own lock so results can be posted
//! while the trigger loop is awaiting the very command they resolve.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use stagehand_controller::{SeatTransport, TransportError};
use stagehand_core::types::PlayableItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatCommandKind {
    Join,
    Leave,
}

/// A queued seat operation for the transport process to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatCommand {
    pub id: u64,
    pub kind: SeatCommandKind,
    /// Present for joins: the item the agent will perform.
    pub item: Option<PlayableItem>,
}

#[derive(Default)]
struct BridgeInner {
    next_id: u64,
    queued: Vec<SeatCommand>,
    pending: HashMap<u64, oneshot::Sender<Result<(), String>>>,
}

/// Cloneable handle shared between the controller (as its `SeatTransport`)
/// and the admin socket handlers.
#[derive(Clone, Default)]
pub struct SeatBridge {
    inner: Arc<Mutex<BridgeInner>>,
}

impl SeatBridge {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BridgeInner> {
        // Recover from poisoning: the inner state stays usable.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn dispatch(
        &self,
        kind: SeatCommandKind,
        item: Option<PlayableItem>,
    ) -> Result<(), TransportError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.queued.push(SeatCommand { id, kind, item });
            inner.pending.insert(id, tx);
        }

        // The controller bounds this await with its own timeout; an expired
        // wait drops `rx` and the stale entry is pruned on the next pull.
        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(detail)) => Err(TransportError::Rejected(detail)),
            Err(_) => Err(TransportError::Unavailable("bridge closed".to_owned())),
        }
    }

    /// Drain queued commands for the transport process, dropping any whose
    /// initiator has already given up.
    pub fn take_queued(&self) -> Vec<SeatCommand> {
        let mut inner = self.lock();
        inner.pending.retain(|_, tx| !tx.is_closed());
        let live: HashSet<u64> = inner.pending.keys().copied().collect();
        inner
            .queued
            .drain(..)
            .filter(|c| live.contains(&c.id))
            .collect()
    }

    /// Resolve a pulled command with its outcome. Returns false for ids the
    /// bridge no longer tracks.
    pub fn resolve(&self, id: u64, ok: bool, detail: Option<String>) -> bool {
        let sender = self.lock().pending.remove(&id);
        match sender {
            Some(tx) => {
                let outcome = if ok {
                    Ok(())
                } else {
                    Err(detail.unwrap_or_else(|| "transport reported failure".to_owned()))
                };
                if tx.send(outcome).is_err() {
                    tracing::debug!(id, "seat command resolved after initiator timed out");
                }
                true
            }
            None => {
                tracing::debug!(id, "result for unknown seat command");
                false
            }
        }
    }
}

impl SeatTransport for SeatBridge {
    async fn join(&self, item: &PlayableItem) -> Result<(), TransportError> {
        self.dispatch(SeatCommandKind::Join, Some(item.clone())).await
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.dispatch(SeatCommandKind::Leave, None).await
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    async fn wait_for_queued(bridge: &SeatBridge) -> Vec<SeatCommand> {
        loop {
            let queued = bridge.take_queued();
            if !queued.is_empty() {
                return queued;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn join_round_trip() {
        let bridge = SeatBridge::new();
        let handle = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.join(&PlayableItem::new("A", "B")).await })
        };

        let queued = wait_for_queued(&bridge).await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].kind, SeatCommandKind::Join);
        assert_eq!(
            queued[0].item.as_ref().expect("join carries item").artist,
            "A"
        );

        assert!(bridge.resolve(queued[0].id, true, None));
        handle.await.expect("task").expect("join ok");
    }

    #[tokio::test]
    async fn rejection_propagates() {
        let bridge = SeatBridge::new();
        let handle = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.leave().await })
        };

        let queued = wait_for_queued(&bridge).await;
        assert_eq!(queued[0].kind, SeatCommandKind::Leave);
        assert!(queued[0].item.is_none());

        bridge.resolve(queued[0].id, false, Some("not seated".to_owned()));
        let err = handle.await.expect("task").expect_err("rejected");
        assert_eq!(err, TransportError::Rejected("not seated".to_owned()));
    }

    #[tokio::test]
    async fn unknown_id_not_resolved() {
        let bridge = SeatBridge::new();
        assert!(!bridge.resolve(99, true, None));
    }

    #[tokio::test]
    async fn abandoned_command_pruned() {
        let bridge = SeatBridge::new();
        let handle = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.join(&PlayableItem::new("A", "B")).await })
        };
        // Let the dispatch enqueue, then abandon the initiator.
        while bridge.lock().queued.is_empty() {
            tokio::task::yield_now().await;
        }
        handle.abort();
        let _ = handle.await;

        assert!(bridge.take_queued().is_empty(), "stale command pruned");
    }
}
