//! stagehand: seat admission daemon binary.
//! Single-process binary embedding the controller, sources, and admin
//! socket in-process.

use clap::Parser;

mod bridge;
mod cli;
mod client;
mod daemon;
mod playlist;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("STAGEHAND_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("stagehand daemon starting");
            daemon::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Status(opts) => {
            client::cmd_status(&socket_path, opts.json).await?;
        }
        cli::Command::ForceJoin => {
            client::cmd_admin(&socket_path, "force_join").await?;
        }
        cli::Command::ForceLeave => {
            client::cmd_admin(&socket_path, "force_leave").await?;
        }
        cli::Command::Hold => {
            client::cmd_admin(&socket_path, "hold").await?;
        }
        cli::Command::Release => {
            client::cmd_admin(&socket_path, "release").await?;
        }
    }

    Ok(())
}
