// Relay server: pairs clients into two-player sessions and forwards their messages
//
// Usage: bomberduel-server [--bind 0.0.0.0] [--port 3012] [--max-sessions 2]
// Operator commands on stdin: `status`, `stop` (EOF also stops).

use std::io::{self, BufRead};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use bomberduel::config::{load_config, load_config_from};
use bomberduel::logging;
use bomberduel::server::SessionManager;

#[derive(Parser, Debug)]
#[command(name = "bomberduel-server", about = "Session relay for bomberduel")]
struct Args {
    /// Address to listen on
    #[arg(long)]
    bind: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Sessions open at once, two players each
    #[arg(long)]
    max_sessions: Option<usize>,

    /// Config file (default: <config dir>/bomberduel/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_server().context("failed to initialise logging")?;

    let config = match args.config {
        Some(ref path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;

    let bind = args.bind.unwrap_or(config.server.bind_address);
    let port = args.port.unwrap_or(config.server.port);
    let max_sessions = args.max_sessions.unwrap_or(config.server.max_sessions);
    let addr: SocketAddr = (bind.as_str(), port)
        .to_socket_addrs()
        .with_context(|| format!("invalid bind address {}", bind))?
        .next()
        .with_context(|| format!("{} did not resolve", bind))?;

    let manager = SessionManager::new(addr, max_sessions);
    let local = manager
        .start()
        .with_context(|| format!("failed to listen on {}", addr))?;
    info!("Accepting players on {} ({} sessions max)", local, max_sessions);

    let acceptor = {
        let manager = manager.clone();
        thread::Builder::new()
            .name("acceptor".to_string())
            .spawn(move || manager.run())
            .context("failed to start acceptance loop")?
    };

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        match line.trim() {
            "" => {}
            "status" => print_status(&manager),
            "stop" | "quit" => break,
            other => println!("Unknown command '{}' (commands: status, stop)", other),
        }
        if !manager.is_running() {
            warn!("Acceptance loop is no longer running");
            break;
        }
    }

    manager.stop_server();
    // A failed loop has already logged why it stopped
    if acceptor.join().is_err() {
        error!("Acceptance loop panicked");
    }
    Ok(())
}

fn print_status(manager: &SessionManager) {
    let sessions = manager.status();
    println!(
        "{} of {} sessions open",
        sessions.len(),
        manager.max_sessions()
    );
    for session in sessions {
        let players: Vec<String> = session.players.iter().map(|p| p.to_string()).collect();
        println!(
            "  session {}: {}/2 players {}",
            session.id,
            players.len(),
            players.join(", ")
        );
    }
}
