// Tracing subscriber setup for both binaries
//
// The server logs to stderr. The client owns the terminal, so it only logs when
// started with --debug, and then to a file (watch it with `tail -f`).

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

pub const CLIENT_LOG_PATH: &str = "/tmp/bomberduel-debug.log";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// RUST_LOG-filtered logging to stderr, `info` by default
pub fn init_server() -> io::Result<()> {
    fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(io::Error::other)
}

/// File logging for the terminal client; a no-op unless `enabled`.
///
/// The file is truncated on every start and begins with a short header.
pub fn init_client(enabled: bool) -> io::Result<()> {
    if !enabled {
        return Ok(());
    }
    init_file(Path::new(CLIENT_LOG_PATH))
}

fn init_file(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    writeln!(file, "=== bomberduel debug log ===")?;
    writeln!(file, "To monitor: tail -f {}", path.display())?;

    fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_client_logging_is_noop() {
        init_client(false).unwrap();
        assert!(init_client(false).is_ok());
    }
}
