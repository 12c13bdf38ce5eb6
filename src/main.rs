//! TERMTRIS - terminal Tetris sessions with persistent scores
//!
//! The session core is transport-agnostic: it consumes a byte-event
//! channel and emits rendered frames. This binary wires one session to
//! the local terminal in raw mode, which doubles as the reference
//! integration of the `SessionLoop` contract.

mod board;
mod config;
mod game;
mod keys;
mod persist;
mod render;
mod session;
mod session_loop;
mod store;
mod tetromino;

use anyhow::Result;
use config::Config;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use persist::{JsonLeaderboard, JsonPlayerStore};
use session::{PlayerIdentity, Session};
use session_loop::{SessionLoop, StreamEvent};
use std::io::stdout;
use std::sync::Arc;
use store::{LeaderboardStore, PlayerStore};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

fn main() -> Result<()> {
    let config = Config::load();

    // The terminal belongs to the game, so logs go to a file.
    let data_dir = config.data_dir()?;
    let file_appender = tracing_appender::rolling::never(&data_dir, "termtris.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(config.log_filter.parse()?),
        )
        .with_ansi(false)
        .init();
    tracing::info!(data_dir = %data_dir.display(), "termtris starting");

    let players: Arc<dyn PlayerStore> = Arc::new(JsonPlayerStore::open(config.players_path()?));
    let leaderboard: Arc<dyn LeaderboardStore> =
        Arc::new(JsonLeaderboard::open(config.leaderboard_path()?));
    let identity = local_identity();

    enable_raw_mode()?;
    execute!(stdout(), EnterAlternateScreen, Hide)?;

    let result = run_local_session(identity, players, leaderboard);

    execute!(stdout(), Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;

    if let Err(ref e) = result {
        eprintln!("termtris exited with an error: {e}");
    }
    result
}

/// Run one session over raw-mode stdin/stdout, through the same event
/// channels a remote transport would use.
fn run_local_session(
    identity: PlayerIdentity,
    players: Arc<dyn PlayerStore>,
    leaderboard: Arc<dyn LeaderboardStore>,
) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(async move {
        let (event_tx, event_rx) = mpsc::channel(64);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();

        let session = Session::new(identity, players, leaderboard);
        let driver = tokio::spawn(SessionLoop::new(session, event_rx, out_tx).run());

        // Reader: raw stdin bytes become stream events.
        tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let mut buf = [0u8; 256];
            loop {
                match stdin.read(&mut buf).await {
                    Ok(0) | Err(_) => {
                        let _ = event_tx.send(StreamEvent::Closed).await;
                        break;
                    }
                    Ok(n) => {
                        if event_tx.send(StreamEvent::Data(buf[..n].to_vec())).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Writer: rendered frames go back out, best-effort.
        let writer = tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(bytes) = out_rx.recv().await {
                if stdout.write_all(&bytes).await.is_err() {
                    break;
                }
                let _ = stdout.flush().await;
            }
        });

        let session = driver.await?;
        tracing::info!(player = %session.identity().id, "session ended");
        let _ = writer.await;
        anyhow::Ok(())
    });
    // The stdin read may still be parked in a blocking thread.
    runtime.shutdown_background();
    result
}

/// Stand-in for the transport's credential fingerprint: a stable FNV-1a
/// hash of user@host, hex-encoded.
fn local_identity() -> PlayerIdentity {
    let user = std::env::var("USER").unwrap_or_else(|_| "player".to_string());
    let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "local".to_string());
    let fingerprint = fnv1a(format!("{user}@{host}").as_bytes());
    PlayerIdentity {
        id: format!("{fingerprint:016x}"),
        display_name: user,
    }
}

/// Stable 64-bit FNV-1a; `DefaultHasher` is not guaranteed stable
/// across Rust versions, and the fingerprint must persist.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut state = OFFSET_BASIS;
    for &b in bytes {
        state ^= b as u64;
        state = state.wrapping_mul(PRIME);
    }
    state
}
