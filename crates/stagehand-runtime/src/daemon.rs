//! Trigger loop: wires sources → controller → bridge.
//!
//! The loop owns the controller (the single logical thread of control the
//! design requires) and multiplexes the periodic tick, pushed room
//! snapshots, chat messages, track notices, and admin commands. The admin
//! socket communicates with the loop exclusively through channels.

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

use stagehand_controller::{ControllerConfig, ControllerStatus, SeatController};
use stagehand_core::pacing::PacingConfig;
use stagehand_core::types::{PlayableItem, RoomSnapshot};
use stagehand_source_chat::{ChatMessage, SignalConfig, translate};
use stagehand_source_room::{RosterConfig, parse_snapshot};

use crate::bridge::SeatBridge;
use crate::cli::DaemonOpts;
use crate::playlist::PlaylistProvider;
use crate::server;

/// Administrative requests routed into the trigger loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminRequest {
    ForceJoin,
    ForceLeave,
    Hold,
    Release,
}

/// Everything the admin socket can push into the trigger loop.
pub enum Trigger {
    RoomSnapshot(serde_json::Value),
    Chat(ChatMessage),
    TrackPlayed { performer: String },
    Admin {
        request: AdminRequest,
        reply: oneshot::Sender<serde_json::Value>,
    },
}

/// Run the daemon: trigger loop plus UDS admin server, until shutdown.
pub async fn run_daemon(opts: DaemonOpts, socket_path: &str) -> anyhow::Result<()> {
    let roster = RosterConfig::new(opts.self_id.clone(), opts.peer_agents.iter().cloned());
    let signals = SignalConfig::new(opts.authorities.iter().cloned(), !opts.allow_public_signals);

    let fallback = PlayableItem::new(opts.fallback_artist.clone(), opts.fallback_title.clone());
    let provider = PlaylistProvider::load(opts.playlist.as_deref(), fallback);
    let bridge = SeatBridge::new();

    let config = ControllerConfig {
        pacing: PacingConfig {
            cooldown_secs: opts.cooldown_secs,
            ejection_penalty_secs: opts.ejection_penalty_secs,
            must_wait_penalty_secs: opts.must_wait_penalty_secs,
            boot_grace_secs: opts.boot_grace_secs,
        },
        departure_threshold: opts.departure_threshold,
        content_timeout_secs: opts.content_timeout_secs,
        join_timeout_secs: opts.join_timeout_secs,
        leave_timeout_secs: opts.leave_timeout_secs,
    };
    let mut controller = SeatController::new(config, provider, bridge.clone(), Utc::now());

    let (trigger_tx, mut trigger_rx) = mpsc::channel::<Trigger>(64);
    let (status_tx, status_rx) = watch::channel::<ControllerStatus>(controller.status(Utc::now()));

    // Admin server task.
    let server_socket = socket_path.to_string();
    let server_bridge = bridge.clone();
    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::run_server(&server_socket, trigger_tx, status_rx, server_bridge).await
        {
            tracing::error!("admin server error: {e}");
        }
    });

    let mut tick = interval(Duration::from_secs(opts.tick_interval_secs.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // Latest authoritative snapshot, re-fed into periodic evaluations.
    let mut latest_snapshot: Option<RoomSnapshot> = None;

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
            tracing::info!("received ctrl-c, shutting down");
        }
    };
    tokio::pin!(shutdown);

    tracing::info!(self_id = %opts.self_id, "stagehand daemon running");

    loop {
        tokio::select! {
            () = &mut shutdown => break,
            _ = tick.tick() => {
                controller.tick(latest_snapshot.as_ref(), Utc::now()).await;
            }
            trigger = trigger_rx.recv() => {
                let Some(trigger) = trigger else { break };
                let now = Utc::now();
                match trigger {
                    Trigger::RoomSnapshot(raw) => match parse_snapshot(&raw, &roster, now) {
                        Ok(snapshot) => {
                            controller.handle_snapshot(&snapshot, now).await;
                            latest_snapshot = Some(snapshot);
                        }
                        Err(e) => tracing::warn!("malformed room snapshot dropped: {e}"),
                    },
                    Trigger::Chat(msg) => {
                        if let Some(event) = translate(&msg, &signals) {
                            controller.handle_permission(event, now);
                            // Re-evaluate right away so a grant can act on
                            // the current room state.
                            controller.tick(latest_snapshot.as_ref(), now).await;
                        }
                    }
                    Trigger::TrackPlayed { performer } => {
                        let by_self = performer == opts.self_id;
                        controller
                            .handle_track_played(by_self, latest_snapshot.as_ref(), now)
                            .await;
                    }
                    Trigger::Admin { request, reply } => {
                        let value = handle_admin(&mut controller, request).await;
                        let _ = reply.send(value);
                    }
                }
            }
        }

        let _ = status_tx.send(controller.status(Utc::now()));
    }

    server_handle.abort();
    if std::path::Path::new(socket_path).exists() {
        std::fs::remove_file(socket_path).ok();
    }

    tracing::info!("stagehand daemon stopped");
    Ok(())
}

async fn handle_admin<C, T>(
    controller: &mut SeatController<C, T>,
    request: AdminRequest,
) -> serde_json::Value
where
    C: stagehand_controller::ContentProvider,
    T: stagehand_controller::SeatTransport,
{
    let now = Utc::now();
    match request {
        AdminRequest::ForceJoin => match controller.force_join(now).await {
            Ok(outcome) => serde_json::json!({"ok": true, "outcome": outcome}),
            Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
        },
        AdminRequest::ForceLeave => match controller.force_leave(now).await {
            Ok(outcome) => serde_json::json!({"ok": true, "outcome": outcome}),
            Err(e) => serde_json::json!({"ok": false, "error": e.to_string()}),
        },
        AdminRequest::Hold => {
            controller.hold();
            serde_json::json!({"ok": true})
        }
        AdminRequest::Release => {
            controller.release();
            serde_json::json!({"ok": true})
        }
    }
}
