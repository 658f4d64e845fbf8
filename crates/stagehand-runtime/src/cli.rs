//! CLI definition using clap derive.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "stagehand", about = "seat admission daemon for room music agents")]
pub struct Cli {
    /// UDS socket path (default: /tmp/stagehand-$USER/stagehandd.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the daemon (trigger loop + UDS admin socket)
    Daemon(DaemonOpts),
    /// Show controller status
    Status(StatusOpts),
    /// Join the seat now, bypassing predicate evaluation
    ForceJoin,
    /// Leave the seat now, bypassing predicate evaluation
    ForceLeave,
    /// Engage the operator hold (no automatic joins)
    Hold,
    /// Release the operator hold
    Release,
}

#[derive(clap::Args)]
pub struct StatusOpts {
    /// Raw JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Own service identity (user id) for self-recognition in snapshots
    #[arg(long)]
    pub self_id: String,

    /// Known peer agent identity (repeatable)
    #[arg(long = "peer-agent", value_name = "ID")]
    pub peer_agents: Vec<String>,

    /// Identity allowed to issue permission signals (repeatable)
    #[arg(long = "authority", value_name = "ID")]
    pub authorities: Vec<String>,

    /// Accept permission signals from public room chat as well
    #[arg(long)]
    pub allow_public_signals: bool,

    /// Trigger loop tick interval in seconds
    #[arg(long, default_value = "15")]
    pub tick_interval_secs: u64,

    /// Minimum interval between join attempts in seconds
    #[arg(long, default_value = "120")]
    pub cooldown_secs: u64,

    /// Penalty after an external removal in seconds
    #[arg(long, default_value = "2160")]
    pub ejection_penalty_secs: u64,

    /// Penalty applied on a must-wait directive in seconds
    #[arg(long, default_value = "600")]
    pub must_wait_penalty_secs: u64,

    /// First-run grace window in seconds
    #[arg(long, default_value = "30")]
    pub boot_grace_secs: u64,

    /// Total occupancy at which the agent yields when no peers remain
    #[arg(long, default_value = "4")]
    pub departure_threshold: u32,

    /// Playlist file (JSON array of {artist, title, catalog_id})
    #[arg(long)]
    pub playlist: Option<std::path::PathBuf>,

    /// Fallback item used when the playlist cannot serve a request
    #[arg(long, default_value = "Stagehand")]
    pub fallback_artist: String,

    #[arg(long, default_value = "House Set")]
    pub fallback_title: String,

    /// Content request timeout in seconds
    #[arg(long, default_value = "10")]
    pub content_timeout_secs: u64,

    /// Seat join timeout in seconds
    #[arg(long, default_value = "10")]
    pub join_timeout_secs: u64,

    /// Seat leave timeout in seconds
    #[arg(long, default_value = "5")]
    pub leave_timeout_secs: u64,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/stagehand/stagehandd.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/stagehand-{user}/stagehandd.sock")
}
