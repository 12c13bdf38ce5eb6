//! Per-connection driver
//!
//! Bridges a duplex byte stream to one session: inbound bytes and the
//! gravity timer are the only two mutation sources, serialized through
//! a single `select!` loop so they can never race against the same
//! engine. Rendered bytes leave through an unbounded outbound channel;
//! sends are best-effort.

use crate::keys::KeyDecoder;
use crate::render;
use crate::session::{Control, Screen, Session};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Events delivered by the transport collaborator
#[derive(Debug)]
pub enum StreamEvent {
    /// Raw bytes read from the client
    Data(Vec<u8>),
    /// The underlying stream went away
    Closed,
}

/// Cadence at which the gravity timer is polled; actual drops are gated
/// on the engine's current drop interval.
pub const GRAVITY_POLL: Duration = Duration::from_millis(50);

pub struct SessionLoop {
    session: Session,
    decoder: KeyDecoder,
    events: mpsc::Receiver<StreamEvent>,
    output: mpsc::UnboundedSender<Vec<u8>>,
}

impl SessionLoop {
    pub fn new(
        session: Session,
        events: mpsc::Receiver<StreamEvent>,
        output: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Self {
        Self {
            session,
            decoder: KeyDecoder::new(),
            events,
            output,
        }
    }

    /// Drive the session until the stream closes, the player quits, or
    /// the account-deletion grace delay elapses. Returns the session
    /// for the caller's teardown logging.
    pub async fn run(mut self) -> Session {
        self.render();

        let mut ticker = tokio::time::interval(GRAVITY_POLL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_drop = Instant::now();

        'outer: loop {
            tokio::select! {
                event = self.events.recv() => {
                    match event {
                        None | Some(StreamEvent::Closed) => {
                            info!(player = %self.session.identity().id, "stream closed");
                            break 'outer;
                        }
                        Some(StreamEvent::Data(bytes)) => {
                            let keys = self.decoder.feed(&bytes);
                            if keys.is_empty() {
                                // Malformed or partial input: no state
                                // change, no render.
                                continue;
                            }
                            for key in keys {
                                let was_playing = self.session.screen() == Screen::Playing;
                                match self.session.handle_key(key) {
                                    Control::Continue => {}
                                    Control::Quit => break 'outer,
                                    Control::CloseAfter(delay) => {
                                        self.render();
                                        tokio::time::sleep(delay).await;
                                        break 'outer;
                                    }
                                }
                                if !was_playing && self.session.screen() == Screen::Playing {
                                    last_drop = Instant::now();
                                }
                            }
                            self.render();
                        }
                    }
                }
                _ = ticker.tick() => {
                    if self.session.screen() != Screen::Playing {
                        last_drop = Instant::now();
                        continue;
                    }
                    let interval = self
                        .session
                        .game()
                        .map(|g| g.stats().drop_interval)
                        .unwrap_or(Duration::from_secs(1));
                    if last_drop.elapsed() >= interval {
                        self.session.gravity_tick();
                        last_drop = Instant::now();
                        self.render();
                    }
                }
            }
        }

        self.session
    }

    fn render(&mut self) {
        match render::render(&self.session) {
            Ok(bytes) => {
                if self.output.send(bytes).is_err() {
                    debug!("outbound channel closed, dropping frame");
                }
            }
            Err(e) => debug!(error = %e, "render failed"),
        }
    }
}
