//! UDS JSON-RPC client for CLI subcommands.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use stagehand_controller::ControllerStatus;

pub(crate) async fn rpc_call(
    socket_path: &str,
    method: &str,
    params: serde_json::Value,
) -> anyhow::Result<serde_json::Value> {
    let stream = UnixStream::connect(socket_path)
        .await
        .map_err(|e| anyhow::anyhow!("cannot connect to daemon at {socket_path}: {e}"))?;

    let (reader, mut writer) = stream.into_split();

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });
    let mut req = serde_json::to_string(&request)?;
    req.push('\n');
    writer.write_all(req.as_bytes()).await?;
    writer.shutdown().await?;

    let mut reader = BufReader::new(reader);
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    let response: serde_json::Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        anyhow::bail!("RPC error: {error}");
    }

    Ok(response["result"].clone())
}

/// `stagehand status` — human-readable or raw JSON controller status.
pub async fn cmd_status(socket_path: &str, json: bool) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, "status", serde_json::json!({})).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let status: ControllerStatus = serde_json::from_value(result)?;
    print!("{}", format_status(&status));
    Ok(())
}

/// Administrative overrides: `force-join`, `force-leave`, `hold`, `release`.
pub async fn cmd_admin(socket_path: &str, method: &str) -> anyhow::Result<()> {
    let result = rpc_call(socket_path, method, serde_json::json!({})).await?;

    if result["ok"].as_bool() == Some(true) {
        match result["outcome"].as_str() {
            Some(outcome) => println!("{method}: {outcome}"),
            None => println!("{method}: ok"),
        }
    } else {
        let detail = result["error"].as_str().unwrap_or("unknown error");
        anyhow::bail!("{method} failed: {detail}");
    }
    Ok(())
}

/// Pure formatting logic, separated for testability.
pub(crate) fn format_status(status: &ControllerStatus) -> String {
    let mut out = String::new();

    out.push_str(&format!("seat:      {}\n", status.intent));
    if status.in_flight {
        out.push_str("           (attempt in flight)\n");
    }
    out.push_str(&format!(
        "hold:      {}\n",
        if status.hold { "engaged" } else { "off" }
    ));

    match status.penalty_remaining_secs {
        Some(secs) => out.push_str(&format!("penalty:   {} remaining\n", fmt_duration(secs))),
        None => out.push_str("penalty:   none\n"),
    }
    match status.cooldown_remaining_secs {
        Some(secs) => out.push_str(&format!("cooldown:  {} remaining\n", fmt_duration(secs))),
        None => out.push_str("cooldown:  ready\n"),
    }

    match status.grant {
        Some(grant) => {
            let allowance = match grant.allowance {
                Some(n) => format!("{n} tracks"),
                None => "open-ended".to_owned(),
            };
            let state = if grant.consumed { "spent" } else { "unused" };
            out.push_str(&format!("grant:     {allowance} ({state})\n"));
        }
        None => out.push_str("grant:     none\n"),
    }

    match status.set_allowance {
        Some(allowance) => out.push_str(&format!(
            "session:   {} played, set {}/{}\n",
            status.songs_played, status.set_played, allowance
        )),
        None => out.push_str(&format!("session:   {} played\n", status.songs_played)),
    }

    if status.boot_grace_available {
        out.push_str("grace:     available\n");
    }

    out
}

fn fmt_duration(secs: i64) -> String {
    let s = secs.max(0);
    if s < 60 {
        format!("{s}s")
    } else if s < 3600 {
        format!("{}m{:02}s", s / 60, s % 60)
    } else {
        format!("{}h{:02}m", s / 3600, (s % 3600) / 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_controller::GrantStatus;
    use stagehand_core::types::SeatIntent;

    #[test]
    fn fmt_duration_ranges() {
        assert_eq!(fmt_duration(45), "45s");
        assert_eq!(fmt_duration(90), "1m30s");
        assert_eq!(fmt_duration(2_160), "36m00s");
        assert_eq!(fmt_duration(7_260), "2h01m");
        assert_eq!(fmt_duration(-5), "0s");
    }

    #[test]
    fn format_status_idle_defaults() {
        let out = format_status(&ControllerStatus::default());
        assert!(out.contains("seat:      idle"));
        assert!(out.contains("penalty:   none"));
        assert!(out.contains("cooldown:  ready"));
        assert!(out.contains("grant:     none"));
        assert!(out.contains("grace:     available"));
    }

    #[test]
    fn format_status_penalized_session() {
        let status = ControllerStatus {
            intent: SeatIntent::Occupied,
            in_flight: false,
            hold: true,
            penalty_remaining_secs: Some(2_160),
            cooldown_remaining_secs: Some(90),
            boot_grace_available: false,
            grant: Some(GrantStatus {
                allowance: Some(2),
                consumed: true,
            }),
            songs_played: 3,
            set_allowance: Some(2),
            set_played: 2,
        };
        let out = format_status(&status);
        assert!(out.contains("seat:      occupied"));
        assert!(out.contains("hold:      engaged"));
        assert!(out.contains("penalty:   36m00s remaining"));
        assert!(out.contains("cooldown:  1m30s remaining"));
        assert!(out.contains("grant:     2 tracks (spent)"));
        assert!(out.contains("session:   3 played, set 2/2"));
        assert!(!out.contains("grace:"));
    }
}
