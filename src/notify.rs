//! User-visible notifications (the console's toasts).

use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn success(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Success,
      message: message.into(),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: NoticeLevel::Error,
      message: message.into(),
    }
  }
}

/// Sink for messages the user should see.
pub trait Notifier: Send + Sync {
  fn deliver(&self, notice: Notice);

  fn success(&self, message: &str) {
    info!(notice = message, "success");
    self.deliver(Notice::success(message));
  }

  fn error(&self, message: &str) {
    warn!(notice = message, "error");
    self.deliver(Notice::error(message));
  }
}

/// Writes notices to stderr (CLI).
#[derive(Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
  fn deliver(&self, notice: Notice) {
    match notice.level {
      NoticeLevel::Success => eprintln!("{}", notice.message),
      NoticeLevel::Error => eprintln!("error: {}", notice.message),
    }
  }
}

/// Forwards notices to the TUI event loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  tx: mpsc::UnboundedSender<Notice>,
}

impl ChannelNotifier {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Notice>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Notifier for ChannelNotifier {
  fn deliver(&self, notice: Notice) {
    // Receiver is gone once the UI has shut down
    let _ = self.tx.send(notice);
  }
}

/// Keeps every notice in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
  notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn notices(&self) -> Vec<Notice> {
    self
      .notices
      .lock()
      .map(|n| n.clone())
      .unwrap_or_default()
  }

  pub fn errors(&self) -> Vec<String> {
    self
      .notices()
      .into_iter()
      .filter(|n| n.level == NoticeLevel::Error)
      .map(|n| n.message)
      .collect()
  }
}

impl Notifier for RecordingNotifier {
  fn deliver(&self, notice: Notice) {
    if let Ok(mut notices) = self.notices.lock() {
      notices.push(notice);
    }
  }
}
