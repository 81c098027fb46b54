use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::ui::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Events emitted by the option picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
  /// An option was chosen (its value)
  Selected(String),
  Cancelled,
}

/// Centered overlay for choosing one value from a list, e.g. a gender, an
/// education level or the teacher of a class. Typing narrows the list.
#[derive(Debug, Clone, Default)]
pub struct OptionPicker {
  active: bool,
  title: String,
  /// (value, label)
  options: Vec<(String, String)>,
  filter: TextInput,
  selected: usize,
}

impl OptionPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker, preselecting `current` if present
  pub fn show(&mut self, title: impl Into<String>, options: Vec<(String, String)>, current: &str) {
    self.active = true;
    self.title = title.into();
    self.filter.clear();
    self.selected = options.iter().position(|(v, _)| v == current).unwrap_or(0);
    self.options = options;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.filter.clear();
    self.selected = 0;
  }

  /// Options matching the typed filter, by label or value
  fn visible(&self) -> Vec<&(String, String)> {
    let needle = self.filter.value().to_lowercase();
    self
      .options
      .iter()
      .filter(|(value, label)| {
        needle.is_empty()
          || label.to_lowercase().contains(&needle)
          || value.to_lowercase().contains(&needle)
      })
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let chosen = self.visible().get(self.selected).map(|(v, _)| v.clone());
        self.hide();
        match chosen {
          Some(value) => KeyResult::Event(PickerEvent::Selected(value)),
          None => KeyResult::Event(PickerEvent::Cancelled),
        }
      }
      KeyCode::Down | KeyCode::Tab => {
        let len = self.visible().len();
        if len > 0 {
          self.selected = (self.selected + 1) % len;
        }
        KeyResult::Handled
      }
      KeyCode::Up | KeyCode::BackTab => {
        let len = self.visible().len();
        if len > 0 {
          self.selected = (self.selected + len - 1) % len;
        }
        KeyResult::Handled
      }
      _ => {
        if self.filter.handle_key(key) == InputResult::Consumed {
          self.selected = 0;
        }
        KeyResult::Handled
      }
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let visible = self.visible();
    let longest = self
      .options
      .iter()
      .map(|(_, label)| label.chars().count())
      .max()
      .unwrap_or(10) as u16;
    let width = (longest + 6)
      .max(self.title.chars().count() as u16 + 4)
      .clamp(24, area.width.saturating_sub(4).max(24))
      .min(area.width);
    let height = (visible.len() as u16 + 3)
      .clamp(4, area.height.saturating_sub(2).max(4))
      .min(area.height);

    let overlay_area = centered_rect(width, height, area);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));
    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let filter_line = Line::from(vec![
      Span::styled("> ", Style::default().fg(Color::Yellow)),
      Span::raw(self.filter.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(filter_line), chunks[0]);

    if visible.is_empty() {
      frame.render_widget(
        Paragraph::new("No matches").style(Style::default().fg(Color::DarkGray)),
        chunks[1],
      );
      return;
    }

    let items: Vec<ListItem> = visible
      .iter()
      .map(|(_, label)| ListItem::new(Span::styled(label.as_str(), Style::default().fg(Color::Cyan))))
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}
