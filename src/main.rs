use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use bomberduel::client::{
    spawn_engine, ChannelPresenter, DisconnectReason, EngineHandle, EngineSettings,
    ServerConnection, UiEvent,
};
use bomberduel::config::{load_config, load_config_from, Config};
use bomberduel::game::{poll_input, InputAction, KeyMap};
use bomberduel::logging;
use bomberduel::timing::limit_frame_rate;
use bomberduel::ui::{self, OverlayMessage, Status, ViewState};

const TARGET_FPS: u64 = 60;
const FRAME_DURATION: Duration = Duration::from_millis(1000 / TARGET_FPS);

#[derive(Parser, Debug)]
#[command(name = "bomberduel", about = "Two-player terminal bomb duel")]
struct Args {
    /// Server to connect to
    #[arg(long)]
    host: Option<String>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Config file (default: <config dir>/bomberduel/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log to /tmp/bomberduel-debug.log
    #[arg(long)]
    debug: bool,
}

/// How a connected session ended from the UI's side
enum SessionEnd {
    Quit,
    Dropped,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init_client(args.debug).context("failed to start debug logging")?;

    let config = match args.config {
        Some(ref path) => load_config_from(path),
        None => load_config(),
    }
    .context("failed to load configuration")?;
    let host = args
        .host
        .unwrap_or_else(|| config.client.server_host.clone());
    let port = args.port.unwrap_or(config.client.server_port);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let result = run_client(&mut terminal, &config, &host, port);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Connect, play until the connection ends, then offer to reconnect.
fn run_client<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    let keys = KeyMap::from_bindings(&config.keybindings);
    let settings = EngineSettings::from_config(config);

    loop {
        let mut view = ViewState::default();
        terminal.draw(|f| ui::render(f, &view, &config.keybindings))?;

        info!("Connecting to {}:{}", host, port);
        match ServerConnection::connect(host, port) {
            Ok(conn) => {
                let (tx, rx) = mpsc::channel();
                let handle = spawn_engine(conn, settings.clone(), ChannelPresenter::new(tx))?;
                match play_session(terminal, config, &keys, &mut view, &handle, &rx)? {
                    SessionEnd::Quit => {
                        handle.disconnect();
                        handle.join();
                        return Ok(());
                    }
                    SessionEnd::Dropped => {
                        let reason = handle.join();
                        info!("Session ended: {:?}", reason);
                        apply_events(&mut view, &rx);
                        if reason == DisconnectReason::LocalQuit {
                            return Ok(());
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Connection failed: {}", e);
                view.status = Status::Disconnected;
                view.show(
                    OverlayMessage::from(&e)
                        .with_line("")
                        .with_line("R: retry   Q: quit"),
                );
            }
        }

        if !choose_reconnect(terminal, config, &keys, &mut view)? {
            return Ok(());
        }
    }
}

fn play_session<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    keys: &KeyMap,
    view: &mut ViewState,
    handle: &EngineHandle,
    events: &Receiver<UiEvent>,
) -> anyhow::Result<SessionEnd> {
    loop {
        let frame_start = Instant::now();

        for action in poll_input(keys)? {
            match action {
                InputAction::Move(command) => {
                    handle.send_move(command);
                }
                InputAction::Quit => return Ok(SessionEnd::Quit),
                InputAction::Reconnect => {}
            }
        }

        apply_events(view, events);
        view.expire_overlay(Instant::now());
        terminal.draw(|f| ui::render(f, view, &config.keybindings))?;

        if handle.is_finished() {
            return Ok(SessionEnd::Dropped);
        }
        limit_frame_rate(frame_start, FRAME_DURATION);
    }
}

/// Wait for R (true) or Q (false) after a failed or lost connection
fn choose_reconnect<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    keys: &KeyMap,
    view: &mut ViewState,
) -> anyhow::Result<bool> {
    loop {
        let frame_start = Instant::now();
        for action in poll_input(keys)? {
            match action {
                InputAction::Reconnect => return Ok(true),
                InputAction::Quit => return Ok(false),
                InputAction::Move(_) => {}
            }
        }
        terminal.draw(|f| ui::render(f, view, &config.keybindings))?;
        limit_frame_rate(frame_start, FRAME_DURATION);
    }
}

fn apply_events(view: &mut ViewState, events: &Receiver<UiEvent>) {
    let now = Instant::now();
    for event in events.try_iter() {
        view.apply(event, now);
    }
}
