use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search text submitted with Enter
  Submitted(String),
  /// Overlay closed without changing the search
  Cancelled,
}

/// Search box overlay. Opens with `/`, prefilled with the current search.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
  /// Shown under the input, e.g. the filter keys a collection accepts
  hint: String,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_hint(hint: impl Into<String>) -> Self {
    Self {
      hint: hint.into(),
      ..Self::default()
    }
  }

  /// Check if search is currently active
  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Get the current search text
  pub fn query(&self) -> &str {
    self.input.value()
  }

  /// Open the overlay with `current` as starting text
  pub fn activate(&mut self, current: &str) {
    self.active = true;
    self.input.set_value(current);
  }

  /// Handle a key event while active. `/` activation is left to the parent,
  /// which knows the current search text.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(text) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted(text.trim().to_string()))
      }
      InputResult::Cancelled => {
        self.active = false;
        KeyResult::Event(SearchEvent::Cancelled)
      }
      // Swallow everything else so list shortcuts don't fire while typing
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 70).min(area.width);
    let height = if self.hint.is_empty() { 3 } else { 4 };
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let mut lines = vec![Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ])];
    if !self.hint.is_empty() {
      lines.push(Line::from(Span::styled(
        self.hint.as_str(),
        Style::default().fg(Color::DarkGray),
      )));
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }
}
