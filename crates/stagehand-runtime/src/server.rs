//! UDS JSON-RPC admin socket: minimal hand-rolled implementation.
//! Connection-per-request, newline-delimited JSON.
//!
//! Three method families share the socket: admin queries/overrides, event
//! ingest pushed by the external transport process, and the seat-command
//! bridge that same process polls.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixListener;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Duration, timeout};

use stagehand_controller::ControllerStatus;
use stagehand_source_chat::ChatMessage;

use crate::bridge::SeatBridge;
use crate::daemon::{AdminRequest, Trigger};

/// How long an admin override may wait for the trigger loop (it can be
/// stuck behind an in-flight seat operation).
const ADMIN_REPLY_TIMEOUT_SECS: u64 = 30;

/// Run the UDS JSON-RPC server.
pub async fn run_server(
    socket_path: &str,
    triggers: mpsc::Sender<Trigger>,
    status: watch::Receiver<ControllerStatus>,
    bridge: SeatBridge,
) -> anyhow::Result<()> {
    // Create socket directory with mode 0700
    let socket_dir = std::path::Path::new(socket_path)
        .parent()
        .ok_or_else(|| anyhow::anyhow!("invalid socket path"))?;

    std::fs::create_dir_all(socket_dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_dir, std::fs::Permissions::from_mode(0o700))?;
    }

    // Check for stale socket
    if std::path::Path::new(socket_path).exists() {
        if tokio::net::UnixStream::connect(socket_path).await.is_err() {
            std::fs::remove_file(socket_path)?;
            tracing::info!("removed stale socket at {socket_path}");
        } else {
            anyhow::bail!("another daemon is already running at {socket_path}");
        }
    }

    let listener = UnixListener::bind(socket_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    tracing::info!("admin socket listening on {socket_path}");

    loop {
        let (stream, _) = listener.accept().await?;
        let triggers = triggers.clone();
        let status = status.clone();
        let bridge = bridge.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, triggers, status, bridge).await {
                tracing::debug!("connection error: {e}");
            }
        });
    }
}

async fn handle_connection(
    stream: tokio::net::UnixStream,
    triggers: mpsc::Sender<Trigger>,
    status: watch::Receiver<ControllerStatus>,
    bridge: SeatBridge,
) -> anyhow::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let request: serde_json::Value = serde_json::from_str(line.trim())?;
    let method = request["method"].as_str().unwrap_or("");
    let id = request["id"].clone();
    let params = request["params"].clone();

    let result = match method {
        // ── Admin ───────────────────────────────────────────────────
        "status" => {
            let view = status.borrow().clone();
            Ok(serde_json::to_value(view)?)
        }
        "force_join" => admin_round_trip(&triggers, AdminRequest::ForceJoin).await,
        "force_leave" => admin_round_trip(&triggers, AdminRequest::ForceLeave).await,
        "hold" => admin_round_trip(&triggers, AdminRequest::Hold).await,
        "release" => admin_round_trip(&triggers, AdminRequest::Release).await,

        // ── Event ingest ────────────────────────────────────────────
        "room_snapshot" => {
            if params.is_object() {
                triggers.send(Trigger::RoomSnapshot(params)).await.ok();
                Ok(serde_json::json!({"ok": true}))
            } else {
                Err("room_snapshot params must be an object".to_owned())
            }
        }
        "chat_message" => match serde_json::from_value::<ChatMessage>(params) {
            Ok(msg) => {
                triggers.send(Trigger::Chat(msg)).await.ok();
                Ok(serde_json::json!({"ok": true}))
            }
            Err(e) => Err(format!("invalid chat_message params: {e}")),
        },
        "track_played" => match params["performer"].as_str() {
            Some(performer) => {
                triggers
                    .send(Trigger::TrackPlayed {
                        performer: performer.to_owned(),
                    })
                    .await
                    .ok();
                Ok(serde_json::json!({"ok": true}))
            }
            None => Err("track_played params missing performer".to_owned()),
        },

        // ── Seat-command bridge ─────────────────────────────────────
        "pull_seat_commands" => Ok(serde_json::to_value(bridge.take_queued())?),
        "seat_command_result" => match params["id"].as_u64() {
            Some(id) => {
                let ok = params["ok"].as_bool().unwrap_or(false);
                let detail = params["error"].as_str().map(str::to_owned);
                let resolved = bridge.resolve(id, ok, detail);
                Ok(serde_json::json!({"ok": resolved}))
            }
            None => Err("seat_command_result params missing id".to_owned()),
        },

        _ => Err("method not found".to_owned()),
    };

    let response = match result {
        Ok(result) => serde_json::json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": id,
        }),
        Err(message) => serde_json::json!({
            "jsonrpc": "2.0",
            "error": {"code": -32600, "message": message},
            "id": id,
        }),
    };
    let mut resp = serde_json::to_string(&response)?;
    resp.push('\n');
    writer.write_all(resp.as_bytes()).await?;

    Ok(())
}

/// Route an admin request into the trigger loop and wait for its reply.
async fn admin_round_trip(
    triggers: &mpsc::Sender<Trigger>,
    request: AdminRequest,
) -> Result<serde_json::Value, String> {
    let (reply, rx) = oneshot::channel();
    triggers
        .send(Trigger::Admin { request, reply })
        .await
        .map_err(|_| "daemon shutting down".to_owned())?;

    match timeout(Duration::from_secs(ADMIN_REPLY_TIMEOUT_SECS), rx).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(_)) => Err("daemon dropped the request".to_owned()),
        Err(_) => Err("timed out waiting for the trigger loop".to_owned()),
    }
}
