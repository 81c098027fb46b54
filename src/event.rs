use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::warn;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized; redraw
  Resize,
  /// Periodic tick for query polling and toast expiry
  Tick,
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Terminal reads block, so they get their own thread
    tokio::task::spawn_blocking(move || {
      let mut last_tick = Instant::now();
      loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        let ready = match event::poll(timeout) {
          Ok(ready) => ready,
          Err(e) => {
            warn!("terminal poll failed: {}", e);
            break;
          }
        };

        if ready {
          let event = match event::read() {
            // Ignore key releases on terminals that report them
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => Some(Event::Key(key)),
            Ok(CrosstermEvent::Resize(_, _)) => Some(Event::Resize),
            Ok(_) => None,
            Err(e) => {
              warn!("terminal read failed: {}", e);
              None
            }
          };
          if let Some(event) = event {
            if tx.send(event).is_err() {
              break;
            }
          }
        }

        if last_tick.elapsed() >= tick_rate {
          if tx.send(Event::Tick).is_err() {
            break;
          }
          last_tick = Instant::now();
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
